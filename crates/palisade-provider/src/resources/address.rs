//! Address objects.
//!
//! An address carries exactly one value variant (ip-netmask, ip-range,
//! ip-wildcard, or fqdn) plus an optional description and tag list.

use palisade_core::client::DeviceError;
use palisade_core::ledger::EncryptedValues;
use palisade_core::location::{LocationKind, LocationModel};
use palisade_core::manager::EntryObject;
use palisade_core::version::ApiVersion;
use palisade_core::xmlapi::{Element, XmlError, member_list};

use super::{EntryModel, ResourceError, managed_entry_model};

/// Device-side address entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressEntry {
    /// Primary key.
    pub name: String,
    /// IPv4/IPv6 network or host, e.g. `10.1.0.1/32`.
    pub ip_netmask: Option<String>,
    /// Inclusive range, e.g. `10.1.0.1-10.1.0.12`.
    pub ip_range: Option<String>,
    /// Wildcard mask form.
    pub ip_wildcard: Option<String>,
    /// DNS name resolved by the device.
    pub fqdn: Option<String>,
    /// Free-form description.
    pub description: Option<String>,
    /// Administrative tags, ordered.
    pub tags: Vec<String>,
}

impl EntryObject for AddressEntry {
    const SUFFIX: &'static [&'static str] = &["address"];

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn to_element(&self, _version: &ApiVersion) -> Element {
        let mut entry = Element::new("entry").with_attr("name", self.name.clone());
        if let Some(value) = &self.ip_netmask {
            entry.push_child(Element::new("ip-netmask").with_text(value.clone()));
        }
        if let Some(value) = &self.ip_range {
            entry.push_child(Element::new("ip-range").with_text(value.clone()));
        }
        if let Some(value) = &self.ip_wildcard {
            entry.push_child(Element::new("ip-wildcard").with_text(value.clone()));
        }
        if let Some(value) = &self.fqdn {
            entry.push_child(Element::new("fqdn").with_text(value.clone()));
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
                    reason: "address entry without a name".to_string(),
                })
            })?
            .to_string();
        Ok(Self {
            name,
            ip_netmask: element.child_text("ip-netmask"),
            ip_range: element.child_text("ip-range"),
            ip_wildcard: element.child_text("ip-wildcard"),
            fqdn: element.child_text("fqdn"),
            description: element.child_text("description"),
            tags: element.members("tag").unwrap_or_default(),
        })
    }

    fn specs_match(&self, other: &Self) -> bool {
        self.ip_netmask == other.ip_netmask
            && self.ip_range == other.ip_range
            && self.ip_wildcard == other.ip_wildcard
            && self.fqdn == other.fqdn
            && self.description == other.description
            && self.tags == other.tags
    }
}

/// Orchestrator-facing address model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressModel {
    /// Placement.
    pub location: LocationModel,
    /// Entry name.
    pub name: String,
    /// IPv4/IPv6 network or host.
    pub ip_netmask: Option<String>,
    /// Inclusive range.
    pub ip_range: Option<String>,
    /// Wildcard mask form.
    pub ip_wildcard: Option<String>,
    /// DNS name.
    pub fqdn: Option<String>,
    /// Free-form description.
    pub description: Option<String>,
    /// Administrative tags.
    pub tags: Option<Vec<String>>,
    /// Computed opaque identity.
    pub tfid: Option<String>,
}

impl EntryModel for AddressModel {
    type Entry = AddressEntry;

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
        entry: &mut AddressEntry,
        _values: &mut EncryptedValues,
    ) -> Result<(), ResourceError> {
        let set = [
            self.ip_netmask.is_some(),
            self.ip_range.is_some(),
            self.ip_wildcard.is_some(),
            self.fqdn.is_some(),
        ]
        .iter()
        .filter(|&&b| b)
        .count();
        if set != 1 {
            return Err(ResourceError::Validation(
                "address requires exactly one of ip_netmask, ip_range, ip_wildcard, fqdn"
                    .to_string(),
            ));
        }

        entry.name = self.name.clone();
        entry.ip_netmask = self.ip_netmask.clone();
        entry.ip_range = self.ip_range.clone();
        entry.ip_wildcard = self.ip_wildcard.clone();
        entry.fqdn = self.fqdn.clone();
        entry.description = self.description.clone();
        entry.tags = self.tags.clone().unwrap_or_default();
        Ok(())
    }

    fn copy_from_entry(
        &mut self,
        entry: &AddressEntry,
        _values: &EncryptedValues,
    ) -> Result<(), ResourceError> {
        self.name = entry.name.clone();
        self.ip_netmask = entry.ip_netmask.clone();
        self.ip_range = entry.ip_range.clone();
        self.ip_wildcard = entry.ip_wildcard.clone();
        self.fqdn = entry.fqdn.clone();
        self.description = entry.description.clone();
        self.tags = if entry.tags.is_empty() {
            None
        } else {
            Some(entry.tags.clone())
        };
        Ok(())
    }
}

managed_entry_model!(AddressModel);
