//! XML element tree, xpath helpers, and multi-config batches.
//!
//! The device protocol is XML over HTTP with element shapes that vary by
//! API version, so encode/decode works on a small owned element tree
//! rather than derived (de)serialization. Requests are rendered with
//! explicit escaping; responses are parsed with `quick-xml`.

mod batch;
mod element;
mod xpath;


pub use batch::{BatchOp, build_multi_config};
pub use element::{Element, Node, XmlError, member_list};
pub use xpath::{entry_xpath, entry_xpath_quoted, xpath_attr, xpath_attr_quoted};
