//! Administrative tags.

use palisade_core::client::DeviceError;
use palisade_core::ledger::EncryptedValues;
use palisade_core::location::{LocationKind, LocationModel};
use palisade_core::manager::EntryObject;
use palisade_core::version::ApiVersion;
use palisade_core::xmlapi::{Element, XmlError};

use super::{EntryModel, ResourceError, managed_entry_model};

/// Number of palette colors the device knows.
const COLOR_COUNT: u32 = 42;

/// Device-side tag entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagEntry {
    /// Primary key.
    pub name: String,
    /// Palette color id, `color1` through `color42`.
    pub color: Option<String>,
    /// Free-form comments.
    pub comments: Option<String>,
}

impl EntryObject for TagEntry {
    const SUFFIX: &'static [&'static str] = &["tag"];

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn to_element(&self, _version: &ApiVersion) -> Element {
        let mut entry = Element::new("entry").with_attr("name", self.name.clone());
        if let Some(color) = &self.color {
            entry.push_child(Element::new("color").with_text(color.clone()));
        }
        if let Some(comments) = &self.comments {
            entry.push_child(Element::new("comments").with_text(comments.clone()));
        }
        entry
    }

    fn from_element(element: &Element, _version: &ApiVersion) -> Result<Self, DeviceError> {
        let name = element
            .attr("name")
            .ok_or_else(|| {
                DeviceError::Xml(XmlError::Malformed {
                    reason: "tag entry without a name".to_string(),
                })
            })?
            .to_string();
        Ok(Self {
            name,
            color: element.child_text("color"),
            comments: element.child_text("comments"),
        })
    }

    fn specs_match(&self, other: &Self) -> bool {
        self.color == other.color && self.comments == other.comments
    }
}

/// Orchestrator-facing tag model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagModel {
    /// Placement.
    pub location: LocationModel,
    /// Entry name.
    pub name: String,
    /// Palette color id, `color1` through `color42`.
    pub color: Option<String>,
    /// Free-form comments.
    pub comments: Option<String>,
    /// Computed opaque identity.
    pub tfid: Option<String>,
}

fn valid_color(color: &str) -> bool {
    color
        .strip_prefix("color")
        .and_then(|n| n.parse::<u32>().ok())
        .is_some_and(|n| (1..=COLOR_COUNT).contains(&n))
}

impl EntryModel for TagModel {
    type Entry = TagEntry;

    const ALLOWED: &'static [LocationKind] = &[
        LocationKind::Shared,
        LocationKind::Vsys,
        LocationKind::DeviceGroup,
        LocationKind::Template,
        LocationKind::TemplateVsys,
        LocationKind::TemplateStack,
        LocationKind::TemplateStackVsys,
    ];

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn location_model(&self) -> &LocationModel {
        &self.location
    }

    fn set_location_model(&mut self, location: LocationModel) {
        self.location = location;
    }

    fn set_tfid(&mut self, tfid: String) {
        self.tfid = Some(tfid);
    }

    fn copy_to_entry(
        &self,
        entry: &mut TagEntry,
        _values: &mut EncryptedValues,
    ) -> Result<(), ResourceError> {
        if let Some(color) = &self.color {
            if !valid_color(color) {
                return Err(ResourceError::Validation(format!(
                    "invalid color '{color}': expected color1..color{COLOR_COUNT}"
                )));
            }
        }
        entry.name = self.name.clone();
        entry.color = self.color.clone();
        entry.comments = self.comments.clone();
        Ok(())
    }

    fn copy_from_entry(
        &mut self,
        entry: &TagEntry,
        _values: &EncryptedValues,
    ) -> Result<(), ResourceError> {
        self.name = entry.name.clone();
        self.color = entry.color.clone();
        self.comments = entry.comments.clone();
        Ok(())
    }
}

managed_entry_model!(TagModel);
