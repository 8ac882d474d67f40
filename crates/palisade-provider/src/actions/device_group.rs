//! Device-group hierarchy reads and parent moves.

use std::collections::HashMap;

use tracing::info;

use palisade_core::xmlapi::Element;

use crate::provider::Provider;
use crate::resources::ResourceError;

use super::commit::wait_for_job;

/// Reads the device-group hierarchy as a flat `child → parent` map.
///
/// Top-level groups map to `None`.
///
/// # Errors
///
/// [`ResourceError::InvalidMode`] when unconnected; device errors
/// verbatim.
pub async fn device_group_hierarchy(
    provider: &Provider,
) -> Result<HashMap<String, Option<String>>, ResourceError> {
    let client = provider.connected()?;
    let command = Element::new("show").with_child(Element::new("dg-hierarchy"));
    let result = client.op(&command).await?;

    let mut hierarchy = HashMap::new();
    if let Some(root) = result.child("dg-hierarchy") {
        for dg in root.children_named("dg") {
            collect(dg, None, &mut hierarchy);
        }
    }
    Ok(hierarchy)
}

fn collect(node: &Element, parent: Option<&str>, out: &mut HashMap<String, Option<String>>) {
    let Some(name) = node.attr("name") else {
        return;
    };
    out.insert(name.to_string(), parent.map(str::to_string));
    for child in node.children_named("dg") {
        collect(child, Some(name), out);
    }
}

/// Assigns a device group's parent. `None` moves it to the top level.
///
/// The device may run the move as an asynchronous job; when it does,
/// this waits for completion.
///
/// # Errors
///
/// [`ResourceError::InvalidMode`] when unconnected;
/// [`palisade_core::client::DeviceError::JobFailure`] when the move job
/// fails; device errors verbatim.
pub async fn move_device_group(
    provider: &Provider,
    device_group: &str,
    parent: Option<&str>,
) -> Result<(), ResourceError> {
    let client = provider.connected()?;

    let mut entry = Element::new("entry").with_attr("name", device_group);
    if let Some(parent) = parent {
        entry.push_child(Element::new("new-parent-dg").with_text(parent));
    }
    let command = Element::new("request")
        .with_child(Element::new("move-dg").with_child(entry));

    info!(device_group, parent = parent.unwrap_or("(top level)"), "moving device group");
    let result = client.op(&command).await?;
    if let Some(job) = result.child_text("job").and_then(|j| j.parse::<u64>().ok()) {
        wait_for_job(client.as_ref(), job, None).await?;
    }
    Ok(())
}
