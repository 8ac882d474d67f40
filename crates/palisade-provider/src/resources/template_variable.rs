//! Template variables.
//!
//! Variables live only inside a Panorama template, are named with a
//! leading `$`, and carry exactly one typed value under `<type>`.

use palisade_core::client::DeviceError;
use palisade_core::ledger::EncryptedValues;
use palisade_core::location::{LocationKind, LocationModel};
use palisade_core::manager::EntryObject;
use palisade_core::version::ApiVersion;
use palisade_core::xmlapi::{Element, XmlError};

use super::{EntryModel, ResourceError, managed_entry_model, validate_entry_name};

/// Device-side template variable entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateVariableEntry {
    /// Primary key, `$`-prefixed.
    pub name: String,
    /// `ip-netmask` value.
    pub ip_netmask: Option<String>,
    /// `ip-range` value.
    pub ip_range: Option<String>,
    /// `fqdn` value.
    pub fqdn: Option<String>,
    /// `interface` value.
    pub interface: Option<String>,
    /// `group-id` value.
    pub group_id: Option<String>,
    /// Free-form description.
    pub description: Option<String>,
}

const TYPE_FIELDS: [&str; 5] = ["ip-netmask", "ip-range", "fqdn", "interface", "group-id"];

impl TemplateVariableEntry {
    fn type_value(&self, tag: &str) -> Option<&String> {
        match tag {
            "ip-netmask" => self.ip_netmask.as_ref(),
            "ip-range" => self.ip_range.as_ref(),
            "fqdn" => self.fqdn.as_ref(),
            "interface" => self.interface.as_ref(),
            "group-id" => self.group_id.as_ref(),
            _ => None,
        }
    }
}

impl EntryObject for TemplateVariableEntry {
    const SUFFIX: &'static [&'static str] = &["variable"];

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn to_element(&self, _version: &ApiVersion) -> Element {
        let mut entry = Element::new("entry").with_attr("name", self.name.clone());
        let mut type_el = Element::new("type");
        for tag in TYPE_FIELDS {
            if let Some(value) = self.type_value(tag) {
                type_el.push_child(Element::new(tag).with_text(value.clone()));
            }
        }
        entry.push_child(type_el);
        if let Some(description) = &self.description {
            entry.push_child(Element::new("description").with_text(description.clone()));
        }
        entry
    }

    fn from_element(element: &Element, _version: &ApiVersion) -> Result<Self, DeviceError> {
        let name = element
            .attr("name")
            .ok_or_else(|| {
                DeviceError::Xml(XmlError::Malformed {
                    reason: "variable entry without a name".to_string(),
                })
            })?
            .to_string();
        let type_el = element.child("type");
        let get = |tag: &str| type_el.and_then(|t| t.child_text(tag));
        Ok(Self {
            name,
            ip_netmask: get("ip-netmask"),
            ip_range: get("ip-range"),
            fqdn: get("fqdn"),
            interface: get("interface"),
            group_id: get("group-id"),
            description: element.child_text("description"),
        })
    }

    fn specs_match(&self, other: &Self) -> bool {
        self.ip_netmask == other.ip_netmask
            && self.ip_range == other.ip_range
            && self.fqdn == other.fqdn
            && self.interface == other.interface
            && self.group_id == other.group_id
            && self.description == other.description
    }
}

/// Orchestrator-facing template variable model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateVariableModel {
    /// Placement; only the template variant is accepted.
    pub location: LocationModel,
    /// Entry name, `$`-prefixed.
    pub name: String,
    /// `ip-netmask` value.
    pub ip_netmask: Option<String>,
    /// `ip-range` value.
    pub ip_range: Option<String>,
    /// `fqdn` value.
    pub fqdn: Option<String>,
    /// `interface` value.
    pub interface: Option<String>,
    /// `group-id` value.
    pub group_id: Option<String>,
    /// Free-form description.
    pub description: Option<String>,
    /// Computed opaque identity.
    pub tfid: Option<String>,
}

impl EntryModel for TemplateVariableModel {
    type Entry = TemplateVariableEntry;

    const ALLOWED: &'static [LocationKind] = &[LocationKind::Template];

    fn validate_name(name: &str) -> Result<(), ResourceError> {
        let Some(rest) = name.strip_prefix('$') else {
            return Err(ResourceError::InvalidName {
                name: name.to_string(),
                reason: "template variable names start with '$'".to_string(),
            });
        };
        validate_entry_name(rest).map_err(|_| ResourceError::InvalidName {
            name: name.to_string(),
            reason: "after '$': alphanumeric plus '._-' only".to_string(),
        })
    }

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
        entry: &mut TemplateVariableEntry,
        _values: &mut EncryptedValues,
    ) -> Result<(), ResourceError> {
        let set = [
            self.ip_netmask.is_some(),
            self.ip_range.is_some(),
            self.fqdn.is_some(),
            self.interface.is_some(),
            self.group_id.is_some(),
        ]
        .iter()
        .filter(|&&b| b)
        .count();
        if set != 1 {
            return Err(ResourceError::Validation(
                "template variable requires exactly one of \
                 ip_netmask, ip_range, fqdn, interface, group_id"
                    .to_string(),
            ));
        }
        entry.name = self.name.clone();
        entry.ip_netmask = self.ip_netmask.clone();
        entry.ip_range = self.ip_range.clone();
        entry.fqdn = self.fqdn.clone();
        entry.interface = self.interface.clone();
        entry.group_id = self.group_id.clone();
        entry.description = self.description.clone();
        Ok(())
    }

    fn copy_from_entry(
        &mut self,
        entry: &TemplateVariableEntry,
        _values: &EncryptedValues,
    ) -> Result<(), ResourceError> {
        self.name = entry.name.clone();
        self.ip_netmask = entry.ip_netmask.clone();
        self.ip_range = entry.ip_range.clone();
        self.fqdn = entry.fqdn.clone();
        self.interface = entry.interface.clone();
        self.group_id = entry.group_id.clone();
        self.description = entry.description.clone();
        Ok(())
    }
}

managed_entry_model!(TemplateVariableModel);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_round_trip() {
        let entry = TemplateVariableEntry {
            name: "$mgmt-ip".to_string(),
            ip_netmask: Some("10.0.0.5/32".to_string()),
            ..TemplateVariableEntry::default()
        };
        let version = ApiVersion::new(10, 1, 0);
        let element = entry.to_element(&version);
        assert_eq!(
            element.to_xml(),
            "<entry name=\"$mgmt-ip\"><type><ip-netmask>10.0.0.5/32</ip-netmask></type></entry>"
        );
        assert_eq!(
            TemplateVariableEntry::from_element(&element, &version).expect("decode"),
            entry
        );
    }

    #[test]
    fn test_name_requires_dollar_prefix() {
        assert!(TemplateVariableModel::validate_name("$var1").is_ok());
        assert!(TemplateVariableModel::validate_name("var1").is_err());
        assert!(TemplateVariableModel::validate_name("$").is_err());
        assert!(TemplateVariableModel::validate_name("$bad key").is_err());
    }

    #[test]
    fn test_exactly_one_type_required() {
        let mut entry = TemplateVariableEntry::default();
        let none = TemplateVariableModel {
            name: "$v".to_string(),
            ..TemplateVariableModel::default()
        };
        assert!(none
            .copy_to_entry(&mut entry, &mut EncryptedValues::new())
            .is_err());

        let two = TemplateVariableModel {
            name: "$v".to_string(),
            fqdn: Some("a.example.com".to_string()),
            interface: Some("ethernet1/1".to_string()),
            ..TemplateVariableModel::default()
        };
        assert!(two
            .copy_to_entry(&mut entry, &mut EncryptedValues::new())
            .is_err());
    }

    #[test]
    fn test_only_template_location_allowed() {
        use palisade_core::location::{Location, VsysLocation};
        let loc = Location::Vsys(VsysLocation {
            ngfw_device: "localhost.localdomain".to_string(),
            vsys: "vsys1".to_string(),
        });
        assert!(loc.check_allowed(TemplateVariableModel::ALLOWED).is_err());
    }
}
