//! Address groups.
//!
//! A group is either *static* (an explicit member list) or *dynamic*
//! (a nested singleton holding a tag-match filter); the two are
//! mutually exclusive.

use palisade_core::client::DeviceError;
use palisade_core::ledger::EncryptedValues;
use palisade_core::location::{LocationKind, LocationModel};
use palisade_core::manager::EntryObject;
use palisade_core::version::ApiVersion;
use palisade_core::xmlapi::{Element, XmlError, member_list};

use super::{EntryModel, ResourceError, managed_entry_model};

/// The nested `dynamic` singleton.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DynamicFilter {
    /// Tag-match expression, e.g. `'prod' and 'web'`.
    pub filter: String,
}

/// Device-side address group entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressGroupEntry {
    /// Primary key.
    pub name: String,
    /// Free-form description.
    pub description: Option<String>,
    /// Static members, ordered. Empty when the group is dynamic.
    pub static_members: Vec<String>,
    /// Dynamic filter sub-object, when the group is dynamic.
    pub dynamic: Option<DynamicFilter>,
    /// Administrative tags.
    pub tags: Vec<String>,
}

impl EntryObject for AddressGroupEntry {
    const SUFFIX: &'static [&'static str] = &["address-group"];

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn to_element(&self, _version: &ApiVersion) -> Element {
        let mut entry = Element::new("entry").with_attr("name", self.name.clone());
        if !self.static_members.is_empty() {
            entry.push_child(member_list("static", &self.static_members));
        }
        if let Some(dynamic) = &self.dynamic {
            entry.push_child(
                Element::new("dynamic")
                    .with_child(Element::new("filter").with_text(dynamic.filter.clone())),
            );
        }
        if let Some(description) = &self.description {
            entry.push_child(Element::new("description").with_text(description.clone()));
        }
        if !self.tags.is_empty() {
            entry.push_child(member_list("tag", &self.tags));
        }
        entry
    }

    fn from_element(element: &Element, _version: &ApiVersion) -> Result<Self, DeviceError> {
        let name = element
            .attr("name")
            .ok_or_else(|| {
                DeviceError::Xml(XmlError::Malformed {
                    reason: "address-group entry without a name".to_string(),
                })
            })?
            .to_string();
        Ok(Self {
            name,
            description: element.child_text("description"),
            static_members: element.members("static").unwrap_or_default(),
            dynamic: element.child("dynamic").map(|d| DynamicFilter {
                filter: d.child_text("filter").unwrap_or_default(),
            }),
            tags: element.members("tag").unwrap_or_default(),
        })
    }

    fn specs_match(&self, other: &Self) -> bool {
        self.description == other.description
            && self.static_members == other.static_members
            && self.dynamic == other.dynamic
            && self.tags == other.tags
    }
}

/// Orchestrator-facing address group model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressGroupModel {
    /// Placement.
    pub location: LocationModel,
    /// Entry name.
    pub name: String,
    /// Free-form description.
    pub description: Option<String>,
    /// Static members; exclusive with `dynamic_filter`.
    pub static_members: Option<Vec<String>>,
    /// Dynamic tag-match filter; exclusive with `static_members`.
    pub dynamic_filter: Option<String>,
    /// Administrative tags.
    pub tags: Option<Vec<String>>,
    /// Computed opaque identity.
    pub tfid: Option<String>,
}

impl EntryModel for AddressGroupModel {
    type Entry = AddressGroupEntry;

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
        entry: &mut AddressGroupEntry,
        _values: &mut EncryptedValues,
    ) -> Result<(), ResourceError> {
        match (&self.static_members, &self.dynamic_filter) {
            (Some(_), Some(_)) | (None, None) => {
                return Err(ResourceError::Validation(
                    "address group requires exactly one of static_members, dynamic_filter"
                        .to_string(),
                ));
            }
            (Some(members), None) => {
                entry.static_members = members.clone();
                entry.dynamic = None;
            }
            (None, Some(filter)) => {
                entry.static_members = Vec::new();
                // Reuse an attached sub-object so fields this model does
                // not track survive the copy.
                match &mut entry.dynamic {
                    Some(dynamic) => dynamic.filter = filter.clone(),
                    None => {
                        entry.dynamic = Some(DynamicFilter {
                            filter: filter.clone(),
                        });
                    }
                }
            }
        }

        entry.name = self.name.clone();
        entry.description = self.description.clone();
        entry.tags = self.tags.clone().unwrap_or_default();
        Ok(())
    }

    fn copy_from_entry(
        &mut self,
        entry: &AddressGroupEntry,
        _values: &EncryptedValues,
    ) -> Result<(), ResourceError> {
        self.name = entry.name.clone();
        self.description = entry.description.clone();
        self.static_members = if entry.static_members.is_empty() {
            None
        } else {
            Some(entry.static_members.clone())
        };
        self.dynamic_filter = entry.dynamic.as_ref().map(|d| d.filter.clone());
        self.tags = if entry.tags.is_empty() {
            None
        } else {
            Some(entry.tags.clone())
        };
        Ok(())
    }
}

managed_entry_model!(AddressGroupModel);
