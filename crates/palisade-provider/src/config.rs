//! Provider configuration.
//!
//! Options can come from three places, in precedence order: explicit
//! configuration, `PANOS_*` environment variables, and an optional JSON
//! auth file. Resolution takes the environment as a plain map so tests
//! never mutate process state.
//!
//! An empty hostname selects *inspection mode*: the provider refuses
//! every mutating operation and data sources answer from a local
//! configuration file instead of a device.

use std::collections::HashMap;
use std::path::PathBuf;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

use palisade_core::client::{Credentials, PanClientConfig};

/// Errors from configuration resolution.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// A value could not be parsed.
    #[error("invalid value for {field}: {reason}")]
    Invalid {
        /// The offending option or environment variable.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// The auth file could not be read.
    #[error("cannot read auth file: {0}")]
    AuthFileIo(#[from] std::io::Error),

    /// The auth file is not valid JSON.
    #[error("cannot parse auth file: {0}")]
    AuthFileJson(#[from] serde_json::Error),

    /// A hostname is set but no credentials are available.
    #[error("no credentials: set api_key, or username and password")]
    MissingCredentials,

    /// The protocol is neither `http` nor `https`.
    #[error("invalid protocol '{protocol}': expected 'http' or 'https'")]
    InvalidProtocol {
        /// The rejected value.
        protocol: String,
    },
}

/// Raw provider options, before environment and auth-file merging.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Device hostname. Empty or unset selects inspection mode.
    pub hostname: Option<String>,
    /// Administrator name, used with `password` when no API key is set.
    pub username: Option<String>,
    /// Administrator password.
    pub password: Option<SecretString>,
    /// Pre-provisioned API key; takes precedence over username/password.
    pub api_key: Option<SecretString>,
    /// `https` (default) or `http`.
    pub protocol: Option<String>,
    /// Non-standard port.
    pub port: Option<u16>,
    /// Pass-through device serial for Panorama-brokered connections.
    pub target: Option<String>,
    /// Send the API key as a request parameter instead of a header.
    pub api_key_in_request: Option<bool>,
    /// Extra headers sent with every request.
    pub additional_headers: Option<HashMap<String, String>>,
    /// Skip TLS certificate verification.
    pub skip_verify_certificate: Option<bool>,
    /// JSON file supplying any of the above.
    pub auth_file: Option<PathBuf>,
    /// Saved configuration document for inspection-mode data sources.
    pub config_file: Option<PathBuf>,
}

/// The outcome of configuration resolution.
#[derive(Debug)]
pub enum ResolvedConfig {
    /// No hostname: mutations are refused, data sources may read from a
    /// local configuration file.
    Inspection {
        /// Optional saved configuration document.
        config_file: Option<PathBuf>,
    },
    /// A device connection.
    Device(PanClientConfig),
}

impl ProviderConfig {
    /// Resolves the configuration against an environment map.
    ///
    /// Explicit options win over the environment; the auth file fills
    /// whatever is still missing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] on unparseable values, unreadable auth
    /// files, a bad protocol, or a hostname without credentials.
    pub fn resolve(mut self, env: &HashMap<String, String>) -> Result<ResolvedConfig, ConfigError> {
        self.merge_env(env)?;
        if let Some(path) = self.auth_file.take() {
            let content = std::fs::read_to_string(path)?;
            let file: ProviderConfig = serde_json::from_str(&content)?;
            self.merge_from(file);
        }

        let hostname = self.hostname.take().unwrap_or_default();
        if hostname.is_empty() {
            return Ok(ResolvedConfig::Inspection {
                config_file: self.config_file,
            });
        }

        let protocol = self.protocol.unwrap_or_else(|| "https".to_string());
        if protocol != "http" && protocol != "https" {
            return Err(ConfigError::InvalidProtocol { protocol });
        }

        let credentials = match (self.api_key, self.username, self.password) {
            (Some(key), _, _) if !key.expose_secret().is_empty() => Credentials::ApiKey(key),
            (_, Some(username), Some(password)) if !username.is_empty() => {
                Credentials::Password { username, password }
            }
            _ => return Err(ConfigError::MissingCredentials),
        };

        let mut headers: Vec<(String, String)> = self
            .additional_headers
            .unwrap_or_default()
            .into_iter()
            .collect();
        headers.sort();

        Ok(ResolvedConfig::Device(PanClientConfig {
            hostname,
            protocol,
            port: self.port,
            credentials,
            target: self.target,
            api_key_in_request: self.api_key_in_request.unwrap_or(false),
            additional_headers: headers,
            skip_verify_certificate: self.skip_verify_certificate.unwrap_or(false),
            filter_quote: '\'',
        }))
    }

    fn merge_env(&mut self, env: &HashMap<String, String>) -> Result<(), ConfigError> {
        let get = |key: &str| env.get(key).filter(|v| !v.is_empty()).cloned();

        if self.hostname.is_none() {
            self.hostname = get("PANOS_HOST");
        }
        if self.username.is_none() {
            self.username = get("PANOS_USERNAME");
        }
        if self.password.is_none() {
            self.password = get("PANOS_PASSWORD").map(SecretString::from);
        }
        if self.api_key.is_none() {
            self.api_key = get("PANOS_API_KEY")
                .or_else(|| get("PANOS_API"))
                .map(SecretString::from);
        }
        if self.protocol.is_none() {
            self.protocol = get("PANOS_PROTOCOL");
        }
        if self.port.is_none() {
            if let Some(raw) = get("PANOS_PORT") {
                let port = raw.parse().map_err(|_| ConfigError::Invalid {
                    field: "PANOS_PORT",
                    reason: format!("'{raw}' is not a port number"),
                })?;
                self.port = Some(port);
            }
        }
        if self.target.is_none() {
            self.target = get("PANOS_TARGET");
        }
        if self.api_key_in_request.is_none() {
            if let Some(raw) = get("PANOS_API_KEY_IN_REQUEST") {
                self.api_key_in_request = Some(parse_bool("PANOS_API_KEY_IN_REQUEST", &raw)?);
            }
        }
        if self.additional_headers.is_none() {
            if let Some(raw) = get("PANOS_HEADERS") {
                let headers: HashMap<String, String> =
                    serde_json::from_str(&raw).map_err(|e| ConfigError::Invalid {
                        field: "PANOS_HEADERS",
                        reason: format!("expected a JSON object: {e}"),
                    })?;
                self.additional_headers = Some(headers);
            }
        }
        if self.skip_verify_certificate.is_none() {
            if let Some(raw) = get("PANOS_SKIP_VERIFY_CERTIFICATE") {
                self.skip_verify_certificate =
                    Some(parse_bool("PANOS_SKIP_VERIFY_CERTIFICATE", &raw)?);
            }
        }
        Ok(())
    }

    fn merge_from(&mut self, other: ProviderConfig) {
        if self.hostname.is_none() {
            self.hostname = other.hostname;
        }
        if self.username.is_none() {
            self.username = other.username;
        }
        if self.password.is_none() {
            self.password = other.password;
        }
        if self.api_key.is_none() {
            self.api_key = other.api_key;
        }
        if self.protocol.is_none() {
            self.protocol = other.protocol;
        }
        if self.port.is_none() {
            self.port = other.port;
        }
        if self.target.is_none() {
            self.target = other.target;
        }
        if self.api_key_in_request.is_none() {
            self.api_key_in_request = other.api_key_in_request;
        }
        if self.additional_headers.is_none() {
            self.additional_headers = other.additional_headers;
        }
        if self.skip_verify_certificate.is_none() {
            self.skip_verify_certificate = other.skip_verify_certificate;
        }
        if self.config_file.is_none() {
            self.config_file = other.config_file;
        }
    }
}

fn parse_bool(field: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            field,
            reason: format!("'{raw}' is not a boolean"),
        }),
    }
}
