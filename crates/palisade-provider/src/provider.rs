//! Provider instance: one shared device client (or inspection mode).

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use palisade_core::client::{DeviceClient, LocalConfig, PanClient};
use palisade_core::reconciler::ReconcilePolicy;

use crate::config::{ConfigError, ProviderConfig, ResolvedConfig};
use crate::resources::ResourceError;

/// Errors from provider construction.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ProviderError {
    /// Configuration resolution failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The device connection failed.
    #[error(transparent)]
    Device(#[from] palisade_core::client::DeviceError),

    /// The inspection-mode config file failed to load.
    #[error(transparent)]
    LocalConfig(#[from] palisade_core::client::LocalConfigError),
}

/// A configured provider: either connected to a device or in inspection
/// mode.
///
/// The client is shared by every resource handler; it multiplexes
/// concurrent requests and is treated as opaque and reentrant.
pub struct Provider {
    client: Option<Arc<dyn DeviceClient>>,
    local: Option<LocalConfig>,
    policy: ReconcilePolicy,
}

impl Provider {
    /// Resolves configuration and connects when a hostname is present.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on configuration, connection, or
    /// config-file failures.
    pub async fn configure(
        config: ProviderConfig,
        env: &HashMap<String, String>,
    ) -> Result<Self, ProviderError> {
        match config.resolve(env)? {
            ResolvedConfig::Inspection { config_file } => {
                info!("provider configured in inspection mode");
                let local = match config_file {
                    Some(path) => Some(LocalConfig::load(&path)?),
                    None => None,
                };
                Ok(Self {
                    client: None,
                    local,
                    policy: ReconcilePolicy::default(),
                })
            }
            ResolvedConfig::Device(device) => {
                let client = PanClient::connect(device).await?;
                info!(version = %client.version(), "provider connected");
                Ok(Self {
                    client: Some(Arc::new(client)),
                    local: None,
                    policy: ReconcilePolicy::default(),
                })
            }
        }
    }

    /// Wraps an existing client. Used by tests and embedders.
    #[must_use]
    pub fn with_client(client: Arc<dyn DeviceClient>) -> Self {
        Self {
            client: Some(client),
            local: None,
            policy: ReconcilePolicy::default(),
        }
    }

    /// Builds an inspection-mode provider over an optional local
    /// configuration document.
    #[must_use]
    pub fn inspection(local: Option<LocalConfig>) -> Self {
        Self {
            client: None,
            local,
            policy: ReconcilePolicy::default(),
        }
    }

    /// Overrides the group-reconciler policy.
    #[must_use]
    pub fn with_policy(mut self, policy: ReconcilePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The shared device client, or [`ResourceError::InvalidMode`] when
    /// the provider is not connected.
    ///
    /// # Errors
    ///
    /// Every mutating resource operation calls this first; in inspection
    /// mode it fails.
    pub fn connected(&self) -> Result<&Arc<dyn DeviceClient>, ResourceError> {
        self.client.as_ref().ok_or(ResourceError::InvalidMode)
    }

    /// The local configuration document, when inspection mode has one.
    #[must_use]
    pub fn local_config(&self) -> Option<&LocalConfig> {
        self.local.as_ref()
    }

    /// The group-reconciler policy.
    #[must_use]
    pub fn policy(&self) -> ReconcilePolicy {
        self.policy
    }
}
