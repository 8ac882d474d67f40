//! Commit-all and job polling.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use palisade_core::client::{DeviceClient, DeviceError};
use palisade_core::xmlapi::Element;

use crate::provider::Provider;
use crate::resources::ResourceError;

/// How often a pending job is polled.
pub const JOB_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// A commit-all request.
#[derive(Debug, Clone, Default)]
pub struct CommitAllRequest {
    /// Restrict the push to one device group.
    pub device_group: Option<String>,
    /// Commit description.
    pub description: Option<String>,
}

impl CommitAllRequest {
    fn to_element(&self) -> Element {
        let mut commit = Element::new("commit-all");
        if let Some(device_group) = &self.device_group {
            commit.push_child(
                Element::new("shared-policy").with_child(
                    Element::new("device-group")
                        .with_child(Element::new("entry").with_attr("name", device_group.clone())),
                ),
            );
        }
        if let Some(description) = &self.description {
            commit.push_child(Element::new("description").with_text(description.clone()));
        }
        commit
    }
}

/// Issues a commit-all and waits for the resulting job to finish.
///
/// Returns the job id, or `None` when the device reports there was
/// nothing to commit. The poll loop suspends for
/// [`JOB_POLL_INTERVAL`] between iterations and checks `deadline` on
/// each; dropping the future aborts the in-flight poll.
///
/// # Errors
///
/// [`ResourceError::InvalidMode`] when unconnected;
/// [`DeviceError::JobFailure`] with the device's result text when the
/// job does not end in `OK`; transport errors verbatim.
pub async fn commit_all(
    provider: &Provider,
    request: &CommitAllRequest,
    deadline: Option<Instant>,
) -> Result<Option<u64>, ResourceError> {
    let client = provider.connected()?;
    let result = client.op(&request.to_element()).await?;

    let Some(job) = result.child_text("job").and_then(|j| j.parse::<u64>().ok()) else {
        info!("commit-all: no pending changes");
        return Ok(None);
    };

    info!(job, "commit-all job enqueued");
    wait_for_job(client.as_ref(), job, deadline).await?;
    Ok(Some(job))
}

/// Polls a device job every [`JOB_POLL_INTERVAL`] until it finishes.
///
/// # Errors
///
/// [`DeviceError::JobFailure`] when the job result is not `OK`;
/// [`DeviceError::Transport`] when `deadline` passes first.
pub async fn wait_for_job(
    client: &dyn DeviceClient,
    job: u64,
    deadline: Option<Instant>,
) -> Result<(), DeviceError> {
    let command = Element::new("show").with_child(
        Element::new("jobs")
            .with_child(Element::new("id").with_text(job.to_string())),
    );

    loop {
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                return Err(DeviceError::Transport(format!(
                    "deadline exceeded while waiting for job {job}"
                )));
            }
        }

        let result = client.op(&command).await?;
        let Some(status) = result.child("job") else {
            return Err(DeviceError::Transport(format!(
                "device reports no job {job}"
            )));
        };

        match status.child_text("status").as_deref() {
            Some("FIN") => {
                let outcome = status.child_text("result").unwrap_or_default();
                if outcome == "OK" {
                    debug!(job, "job finished");
                    return Ok(());
                }
                let details = status
                    .child("details")
                    .map(|d| {
                        let lines: Vec<String> =
                            d.children_named("line").map(Element::text).collect();
                        if lines.is_empty() { d.text() } else { lines.join("; ") }
                    })
                    .unwrap_or_else(|| outcome.clone());
                return Err(DeviceError::JobFailure {
                    job,
                    message: details,
                });
            }
            _ => {
                debug!(job, "job still running");
                tokio::time::sleep(JOB_POLL_INTERVAL).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_all_element_plain() {
        let request = CommitAllRequest::default();
        assert_eq!(request.to_element().to_xml(), "<commit-all/>");
    }

    #[test]
    fn test_commit_all_element_scoped_to_device_group() {
        let request = CommitAllRequest {
            device_group: Some("branch-firewalls".to_string()),
            description: Some("rollout".to_string()),
        };
        assert_eq!(
            request.to_element().to_xml(),
            "<commit-all><shared-policy><device-group>\
             <entry name=\"branch-firewalls\"/>\
             </device-group></shared-policy>\
             <description>rollout</description></commit-all>"
        );
    }
}
