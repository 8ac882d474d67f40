//! Multi-config batches.
//!
//! A batch is an ordered list of edit/rename/delete operations applied
//! atomically by the device in declared order. The group reconciler
//! produces batches; the client renders them into a single
//! `multi-config` request.

use super::element::Element;

/// One operation inside a multi-config batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    /// Upsert the element at the xpath.
    Edit {
        /// Fully qualified entry xpath.
        xpath: String,
        /// The serialized entry.
        element: Element,
    },
    /// Rename the entry at the xpath in place, preserving its UUID.
    Rename {
        /// Fully qualified entry xpath (old name).
        xpath: String,
        /// The new entry name.
        new_name: String,
    },
    /// Remove the entry at the xpath.
    Delete {
        /// Fully qualified entry xpath.
        xpath: String,
    },
}

impl BatchOp {
    /// Returns the operation verb used on the wire.
    #[must_use]
    pub const fn verb(&self) -> &'static str {
        match self {
            Self::Edit { .. } => "edit",
            Self::Rename { .. } => "rename",
            Self::Delete { .. } => "delete",
        }
    }
}

/// Renders a batch into a `multi-configure-request` element.
///
/// Operation ids are assigned sequentially from 1 so a failing response
/// can be correlated back to its operation.
#[must_use]
pub fn build_multi_config(ops: &[BatchOp]) -> Element {
    let mut request = Element::new("multi-configure-request");
    for (index, op) in ops.iter().enumerate() {
        let id = (index + 1).to_string();
        let action = match op {
            BatchOp::Edit { xpath, element } => Element::new("edit")
                .with_attr("id", id)
                .with_attr("xpath", xpath.clone())
                .with_child(element.clone()),
            BatchOp::Rename { xpath, new_name } => Element::new("rename")
                .with_attr("id", id)
                .with_attr("xpath", xpath.clone())
                .with_attr("newname", new_name.clone()),
            BatchOp::Delete { xpath } => Element::new("delete")
                .with_attr("id", id)
                .with_attr("xpath", xpath.clone()),
        };
        request.push_child(action);
    }
    request
}
