//! One-shot device actions.
//!
//! These are not managed resources: each call runs to completion (or
//! failure) and owns no state beyond what the device reports.

mod commit;
mod device_group;

use secrecy::SecretString;

use crate::provider::Provider;
use crate::resources::ResourceError;

pub use commit::{CommitAllRequest, JOB_POLL_INTERVAL, commit_all, wait_for_job};
pub use device_group::{device_group_hierarchy, move_device_group};

/// Obtains an API key for a username/password pair.
///
/// The key is ephemeral output: it is returned to the caller and never
/// persisted by the provider.
///
/// # Errors
///
/// Returns [`ResourceError::InvalidMode`] when unconnected; device
/// errors verbatim.
pub async fn generate_api_key(
    provider: &Provider,
    username: &str,
    password: &SecretString,
) -> Result<SecretString, ResourceError> {
    let client = provider.connected()?;
    Ok(client.generate_api_key(username, password).await?)
}
