//! Inspection-mode reads from a saved device configuration file.
//!
//! When the provider has no hostname it refuses mutations, but data
//! sources can still answer listings and reads from an exported
//! configuration document (`save config` output or a state snapshot).

use std::path::Path;

use thiserror::Error;

use crate::location::Location;
use crate::xmlapi::{Element, XmlError, entry_xpath};

/// Errors from loading a local configuration document.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LocalConfigError {
    /// The file could not be read.
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not well-formed XML.
    #[error(transparent)]
    Xml(#[from] XmlError),

    /// The document root is not `<config>`.
    #[error("expected a <config> document, got <{root}>")]
    NotConfig {
        /// The actual root tag.
        root: String,
    },
}

/// A parsed device configuration document.
#[derive(Debug, Clone)]
pub struct LocalConfig {
    root: Element,
}

impl LocalConfig {
    /// Loads a configuration document from disk.
    ///
    /// # Errors
    ///
    /// Returns [`LocalConfigError`] on I/O failure, malformed XML, or a
    /// document whose root is not `<config>`.
    pub fn load(path: &Path) -> Result<Self, LocalConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_xml(&content)
    }

    /// Parses a configuration document from a string.
    ///
    /// # Errors
    ///
    /// Returns [`LocalConfigError::Xml`] or [`LocalConfigError::NotConfig`].
    pub fn from_xml(content: &str) -> Result<Self, LocalConfigError> {
        let root = Element::parse(content)?;
        if root.name != "config" {
            return Err(LocalConfigError::NotConfig { root: root.name });
        }
        Ok(Self { root })
    }

    /// Lists the entries of a collection at a location.
    ///
    /// Returns an empty vector when the collection (or any ancestor) is
    /// absent — a saved config omits empty sections.
    #[must_use]
    pub fn entries(&self, location: &Location, suffix: &[&str]) -> Vec<Element> {
        let xpath = entry_xpath(&location.xpath_prefix(), suffix, None);
        match self.node_at(&xpath) {
            Some(node) => node.children_named("entry").cloned().collect(),
            None => Vec::new(),
        }
    }

    /// Reads a single entry by name.
    #[must_use]
    pub fn entry(&self, location: &Location, suffix: &[&str], name: &str) -> Option<Element> {
        let xpath = entry_xpath(&location.xpath_prefix(), suffix, Some(name));
        self.node_at(&xpath).cloned()
    }

    /// Walks an xpath produced by this crate's own builders.
    ///
    /// Only the subset those builders emit is understood: `/tag` steps
    /// and `/entry[@name='…']` steps.
    fn node_at(&self, xpath: &str) -> Option<&Element> {
        let mut current = &self.root;
        for step in parse_steps(xpath)? {
            if step.tag == "config" && std::ptr::eq(current, &self.root) {
                continue;
            }
            current = match &step.name {
                Some(name) => current
                    .children_named(&step.tag)
                    .find(|el| el.attr("name") == Some(name))?,
                None => current.child(&step.tag)?,
            };
        }
        Some(current)
    }
}

struct Step {
    tag: String,
    name: Option<String>,
}

fn parse_steps(xpath: &str) -> Option<Vec<Step>> {
    let mut steps = Vec::new();
    for part in xpath.split('/').filter(|p| !p.is_empty()) {
        if let Some(open) = part.find('[') {
            let tag = &part[..open];
            let predicate = part[open + 1..].strip_suffix(']')?;
            let value = predicate
                .strip_prefix("@name='")
                .and_then(|p| p.strip_suffix('\''))
                .or_else(|| {
                    predicate
                        .strip_prefix("@name=\"")
                        .and_then(|p| p.strip_suffix('"'))
                })?;
            steps.push(Step {
                tag: tag.to_string(),
                name: Some(value.to_string()),
            });
        } else {
            steps.push(Step {
                tag: part.to_string(),
                name: None,
            });
        }
    }
    Some(steps)
}
