//! Security zones.
//!
//! A zone groups interfaces under one of the device's forwarding modes
//! (layer3, layer2, virtual-wire, tap, external); the mode tags under
//! `<network>` are mutually exclusive. Zones are vsys-scoped objects,
//! so only the vsys-family locations are accepted.

use palisade_core::client::DeviceError;
use palisade_core::ledger::EncryptedValues;
use palisade_core::location::{LocationKind, LocationModel};
use palisade_core::manager::EntryObject;
use palisade_core::version::ApiVersion;
use palisade_core::xmlapi::{Element, XmlError, member_list};

use super::{EntryModel, ResourceError, managed_entry_model};

/// The forwarding mode whose member list holds the zone's interfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneMode {
    /// Routed interfaces.
    Layer3,
    /// Switched interfaces.
    Layer2,
    /// Virtual-wire pairs.
    VirtualWire,
    /// Passive tap interfaces.
    Tap,
    /// External (inter-vsys) zone.
    External,
}

impl ZoneMode {
    /// The element tag under `<network>`.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Layer3 => "layer3",
            Self::Layer2 => "layer2",
            Self::VirtualWire => "virtual-wire",
            Self::Tap => "tap",
            Self::External => "external",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "layer3" => Some(Self::Layer3),
            "layer2" => Some(Self::Layer2),
            "virtual-wire" => Some(Self::VirtualWire),
            "tap" => Some(Self::Tap),
            "external" => Some(Self::External),
            _ => None,
        }
    }
}

/// Device-side zone entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZoneEntry {
    /// Primary key.
    pub name: String,
    /// Forwarding mode; absent on a zone created with no network block.
    pub mode: Option<ZoneMode>,
    /// Member interfaces, ordered.
    pub interfaces: Vec<String>,
    /// User-ID enablement flag.
    pub enable_user_identification: bool,
}

impl EntryObject for ZoneEntry {
    const SUFFIX: &'static [&'static str] = &["zone"];

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn to_element(&self, _version: &ApiVersion) -> Element {
        let mut entry = Element::new("entry").with_attr("name", self.name.clone());
        if let Some(mode) = self.mode {
            entry.push_child(
                Element::new("network").with_child(member_list(mode.tag(), &self.interfaces)),
            );
        }
        if self.enable_user_identification {
            entry.push_child(Element::new("enable-user-identification").with_text("yes"));
        }
        entry
    }

    fn from_element(element: &Element, _version: &ApiVersion) -> Result<Self, DeviceError> {
        let name = element
            .attr("name")
            .ok_or_else(|| {
                DeviceError::Xml(XmlError::Malformed {
                    reason: "zone entry without a name".to_string(),
                })
            })?
            .to_string();
        let mode_el = element.child("network").and_then(|network| {
            network
                .child_elements()
                .find(|el| ZoneMode::from_tag(&el.name).is_some())
        });
        let mode = mode_el.and_then(|el| ZoneMode::from_tag(&el.name));
        let interfaces = mode_el
            .map(|el| el.children_named("member").map(Element::text).collect())
            .unwrap_or_default();
        Ok(Self {
            name,
            mode,
            interfaces,
            enable_user_identification: element
                .child_text("enable-user-identification")
                .as_deref()
                == Some("yes"),
        })
    }

    fn specs_match(&self, other: &Self) -> bool {
        self.mode == other.mode
            && self.interfaces == other.interfaces
            && self.enable_user_identification == other.enable_user_identification
    }
}

/// Orchestrator-facing zone model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZoneModel {
    /// Placement; zones are vsys-scoped.
    pub location: LocationModel,
    /// Entry name.
    pub name: String,
    /// Forwarding mode; required.
    pub mode: Option<ZoneMode>,
    /// Member interfaces, ordered. A zone may hold none yet.
    pub interfaces: Option<Vec<String>>,
    /// User-ID enablement flag.
    pub enable_user_identification: Option<bool>,
    /// Computed opaque identity.
    pub tfid: Option<String>,
}

impl EntryModel for ZoneModel {
    type Entry = ZoneEntry;

    const ALLOWED: &'static [LocationKind] = &[
        LocationKind::Vsys,
        LocationKind::TemplateVsys,
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
        entry: &mut ZoneEntry,
        _values: &mut EncryptedValues,
    ) -> Result<(), ResourceError> {
        let Some(mode) = self.mode else {
            return Err(ResourceError::Validation(
                "zone requires a mode (layer3, layer2, virtual_wire, tap, external)".to_string(),
            ));
        };
        entry.name = self.name.clone();
        entry.mode = Some(mode);
        entry.interfaces = self.interfaces.clone().unwrap_or_default();
        entry.enable_user_identification = self.enable_user_identification.unwrap_or(false);
        Ok(())
    }

    fn copy_from_entry(
        &mut self,
        entry: &ZoneEntry,
        _values: &EncryptedValues,
    ) -> Result<(), ResourceError> {
        self.name = entry.name.clone();
        self.mode = entry.mode;
        self.interfaces = if entry.interfaces.is_empty() {
            None
        } else {
            Some(entry.interfaces.clone())
        };
        self.enable_user_identification = Some(entry.enable_user_identification);
        Ok(())
    }
}

managed_entry_model!(ZoneModel);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_round_trip_layer3() {
        let entry = ZoneEntry {
            name: "trust".to_string(),
            mode: Some(ZoneMode::Layer3),
            interfaces: vec!["ethernet1/1".to_string(), "ethernet1/2".to_string()],
            enable_user_identification: true,
        };
        let version = ApiVersion::new(10, 1, 0);
        let element = entry.to_element(&version);
        assert_eq!(
            element.to_xml(),
            "<entry name=\"trust\"><network><layer3>\
             <member>ethernet1/1</member><member>ethernet1/2</member>\
             </layer3></network>\
             <enable-user-identification>yes</enable-user-identification></entry>"
        );
        assert_eq!(
            ZoneEntry::from_element(&element, &version).expect("decode"),
            entry
        );
    }

    #[test]
    fn test_empty_zone_keeps_mode_tag() {
        // A mode with no interfaces still emits its (empty) member list
        // so the device records the zone's type.
        let entry = ZoneEntry {
            name: "dmz".to_string(),
            mode: Some(ZoneMode::Tap),
            ..ZoneEntry::default()
        };
        let version = ApiVersion::new(10, 1, 0);
        let element = entry.to_element(&version);
        assert_eq!(
            element.to_xml(),
            "<entry name=\"dmz\"><network><tap/></network></entry>"
        );
        let back = ZoneEntry::from_element(&element, &version).expect("decode");
        assert_eq!(back.mode, Some(ZoneMode::Tap));
        assert!(back.interfaces.is_empty());
    }

    #[test]
    fn test_mode_is_required() {
        let model = ZoneModel {
            name: "z".to_string(),
            ..ZoneModel::default()
        };
        let mut entry = ZoneEntry::default();
        assert!(model
            .copy_to_entry(&mut entry, &mut EncryptedValues::new())
            .is_err());
    }

    #[test]
    fn test_only_vsys_family_locations_allowed() {
        use palisade_core::location::Location;
        assert!(Location::Shared(true).check_allowed(ZoneModel::ALLOWED).is_err());
        let vsys = Location::Vsys(palisade_core::location::VsysLocation {
            ngfw_device: "localhost.localdomain".to_string(),
            vsys: "vsys1".to_string(),
        });
        assert!(vsys.check_allowed(ZoneModel::ALLOWED).is_ok());
    }

    #[test]
    fn test_translator_round_trip() {
        let model = ZoneModel {
            name: "untrust".to_string(),
            mode: Some(ZoneMode::Layer3),
            interfaces: Some(vec!["ethernet1/3".to_string()]),
            ..ZoneModel::default()
        };
        let mut entry = ZoneEntry::default();
        model
            .copy_to_entry(&mut entry, &mut EncryptedValues::new())
            .expect("to entry");
        let mut back = ZoneModel::default();
        back.copy_from_entry(&entry, &EncryptedValues::new())
            .expect("from entry");
        assert_eq!(back.mode, model.mode);
        assert_eq!(back.interfaces, model.interfaces);
        assert_eq!(back.enable_user_identification, Some(false));
    }
}
