//! Service groups: a named, ordered member list.

use palisade_core::client::DeviceError;
use palisade_core::ledger::EncryptedValues;
use palisade_core::location::{LocationKind, LocationModel};
use palisade_core::manager::EntryObject;
use palisade_core::version::ApiVersion;
use palisade_core::xmlapi::{Element, XmlError, member_list};

use super::{EntryModel, ResourceError, managed_entry_model};

/// Device-side service group entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceGroupEntry {
    /// Primary key.
    pub name: String,
    /// Member services, ordered.
    pub members: Vec<String>,
    /// Administrative tags.
    pub tags: Vec<String>,
}

impl EntryObject for ServiceGroupEntry {
    const SUFFIX: &'static [&'static str] = &["service-group"];

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn to_element(&self, _version: &ApiVersion) -> Element {
        let mut entry = Element::new("entry").with_attr("name", self.name.clone());
        entry.push_child(member_list("members", &self.members));
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
                    reason: "service-group entry without a name".to_string(),
                })
            })?
            .to_string();
        Ok(Self {
            name,
            members: element.members("members").unwrap_or_default(),
            tags: element.members("tag").unwrap_or_default(),
        })
    }

    fn specs_match(&self, other: &Self) -> bool {
        self.members == other.members && self.tags == other.tags
    }
}

/// Orchestrator-facing service group model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceGroupModel {
    /// Placement.
    pub location: LocationModel,
    /// Entry name.
    pub name: String,
    /// Member services, ordered; must be non-empty.
    pub members: Option<Vec<String>>,
    /// Administrative tags.
    pub tags: Option<Vec<String>>,
    /// Computed opaque identity.
    pub tfid: Option<String>,
}

impl EntryModel for ServiceGroupModel {
    type Entry = ServiceGroupEntry;

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
        entry: &mut ServiceGroupEntry,
        _values: &mut EncryptedValues,
    ) -> Result<(), ResourceError> {
        let members = self.members.clone().unwrap_or_default();
        if members.is_empty() {
            return Err(ResourceError::Validation(
                "service group requires at least one member".to_string(),
            ));
        }
        entry.name = self.name.clone();
        entry.members = members;
        entry.tags = self.tags.clone().unwrap_or_default();
        Ok(())
    }

    fn copy_from_entry(
        &mut self,
        entry: &ServiceGroupEntry,
        _values: &EncryptedValues,
    ) -> Result<(), ResourceError> {
        self.name = entry.name.clone();
        self.members = if entry.members.is_empty() {
            None
        } else {
            Some(entry.members.clone())
        };
        self.tags = if entry.tags.is_empty() {
            None
        } else {
            Some(entry.tags.clone())
        };
        Ok(())
    }
}

managed_entry_model!(ServiceGroupModel);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_preserves_member_order() {
        let entry = ServiceGroupEntry {
            name: "web-stack".to_string(),
            members: vec!["http".to_string(), "https".to_string(), "http-alt".to_string()],
            tags: Vec::new(),
        };
        let version = ApiVersion::new(10, 1, 0);
        let element = entry.to_element(&version);
        assert_eq!(
            element.to_xml(),
            "<entry name=\"web-stack\"><members>\
             <member>http</member><member>https</member><member>http-alt</member>\
             </members></entry>"
        );
        assert_eq!(
            ServiceGroupEntry::from_element(&element, &version).expect("decode"),
            entry
        );
    }

    #[test]
    fn test_empty_member_list_rejected() {
        let model = ServiceGroupModel {
            name: "g".to_string(),
            ..ServiceGroupModel::default()
        };
        let mut entry = ServiceGroupEntry::default();
        assert!(model
            .copy_to_entry(&mut entry, &mut EncryptedValues::new())
            .is_err());
    }
}
