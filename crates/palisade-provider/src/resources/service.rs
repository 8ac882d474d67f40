//! Service objects.
//!
//! A service is a TCP or UDP port specification (mutually exclusive)
//! with optional session-timeout overrides. Timeout overrides are a
//! versioned encoding: devices before 8.1 have no `<override>` block,
//! so the codec only emits or reads it on 8.1 and later.

use palisade_core::client::DeviceError;
use palisade_core::ledger::EncryptedValues;
use palisade_core::location::{LocationKind, LocationModel};
use palisade_core::manager::EntryObject;
use palisade_core::version::ApiVersion;
use palisade_core::xmlapi::{Element, XmlError, member_list};

use super::{EntryModel, ResourceError, managed_entry_model};

/// Port specification for one protocol.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtocolSpec {
    /// Destination ports, e.g. `80` or `80,8080` or `1024-2048`.
    pub port: String,
    /// Source ports.
    pub source_port: Option<String>,
    /// Session timeout override, seconds. Encoded on 8.1+ only.
    pub override_timeout: Option<u32>,
    /// Half-closed timeout override, seconds (TCP only). 8.1+ only.
    pub override_halfclose_timeout: Option<u32>,
}

impl ProtocolSpec {
    fn to_element(&self, tag: &str, version: &ApiVersion) -> Element {
        let mut proto = Element::new(tag)
            .with_child(Element::new("port").with_text(self.port.clone()));
        if let Some(source_port) = &self.source_port {
            proto.push_child(Element::new("source-port").with_text(source_port.clone()));
        }
        if version.supports(8, 1) {
            if let Some(timeout) = self.override_timeout {
                let mut yes = Element::new("yes")
                    .with_child(Element::new("timeout").with_text(timeout.to_string()));
                if tag == "tcp" {
                    if let Some(halfclose) = self.override_halfclose_timeout {
                        yes.push_child(
                            Element::new("halfclose-timeout").with_text(halfclose.to_string()),
                        );
                    }
                }
                proto.push_child(Element::new("override").with_child(yes));
            }
        }
        proto
    }

    fn from_element(element: &Element, version: &ApiVersion) -> Self {
        let mut spec = Self {
            port: element.child_text("port").unwrap_or_default(),
            source_port: element.child_text("source-port"),
            override_timeout: None,
            override_halfclose_timeout: None,
        };
        if version.supports(8, 1) {
            if let Some(yes) = element.child("override").and_then(|o| o.child("yes")) {
                spec.override_timeout =
                    yes.child_text("timeout").and_then(|t| t.parse().ok());
                spec.override_halfclose_timeout = yes
                    .child_text("halfclose-timeout")
                    .and_then(|t| t.parse().ok());
            }
        }
        spec
    }
}

/// Device-side service entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceEntry {
    /// Primary key.
    pub name: String,
    /// Free-form description.
    pub description: Option<String>,
    /// TCP specification; exclusive with `udp`.
    pub tcp: Option<ProtocolSpec>,
    /// UDP specification; exclusive with `tcp`.
    pub udp: Option<ProtocolSpec>,
    /// Administrative tags.
    pub tags: Vec<String>,
}

impl EntryObject for ServiceEntry {
    const SUFFIX: &'static [&'static str] = &["service"];

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn to_element(&self, version: &ApiVersion) -> Element {
        let mut entry = Element::new("entry").with_attr("name", self.name.clone());
        let mut protocol = Element::new("protocol");
        if let Some(tcp) = &self.tcp {
            protocol.push_child(tcp.to_element("tcp", version));
        }
        if let Some(udp) = &self.udp {
            protocol.push_child(udp.to_element("udp", version));
        }
        entry.push_child(protocol);
        if let Some(description) = &self.description {
            entry.push_child(Element::new("description").with_text(description.clone()));
        }
        if !self.tags.is_empty() {
            entry.push_child(member_list("tag", &self.tags));
        }
        entry
    }

    fn from_element(element: &Element, version: &ApiVersion) -> Result<Self, DeviceError> {
        let name = element
            .attr("name")
            .ok_or_else(|| {
                DeviceError::Xml(XmlError::Malformed {
                    reason: "service entry without a name".to_string(),
                })
            })?
            .to_string();
        let protocol = element.child("protocol");
        Ok(Self {
            name,
            description: element.child_text("description"),
            tcp: protocol
                .and_then(|p| p.child("tcp"))
                .map(|t| ProtocolSpec::from_element(t, version)),
            udp: protocol
                .and_then(|p| p.child("udp"))
                .map(|u| ProtocolSpec::from_element(u, version)),
            tags: element.members("tag").unwrap_or_default(),
        })
    }

    fn specs_match(&self, other: &Self) -> bool {
        self.description == other.description
            && self.tcp == other.tcp
            && self.udp == other.udp
            && self.tags == other.tags
    }
}

/// Orchestrator-facing service model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceModel {
    /// Placement.
    pub location: LocationModel,
    /// Entry name.
    pub name: String,
    /// Free-form description.
    pub description: Option<String>,
    /// TCP specification; exclusive with `udp`.
    pub tcp: Option<ProtocolSpec>,
    /// UDP specification; exclusive with `tcp`.
    pub udp: Option<ProtocolSpec>,
    /// Administrative tags.
    pub tags: Option<Vec<String>>,
    /// Computed opaque identity.
    pub tfid: Option<String>,
}

impl EntryModel for ServiceModel {
    type Entry = ServiceEntry;

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
        entry: &mut ServiceEntry,
        _values: &mut EncryptedValues,
    ) -> Result<(), ResourceError> {
        match (&self.tcp, &self.udp) {
            (Some(_), Some(_)) | (None, None) => {
                return Err(ResourceError::Validation(
                    "service requires exactly one of tcp, udp".to_string(),
                ));
            }
            (Some(tcp), None) => {
                if tcp.port.is_empty() {
                    return Err(ResourceError::Validation(
                        "tcp.port must not be empty".to_string(),
                    ));
                }
                entry.tcp = Some(tcp.clone());
                entry.udp = None;
            }
            (None, Some(udp)) => {
                if udp.port.is_empty() {
                    return Err(ResourceError::Validation(
                        "udp.port must not be empty".to_string(),
                    ));
                }
                if udp.override_halfclose_timeout.is_some() {
                    return Err(ResourceError::Validation(
                        "udp has no halfclose timeout".to_string(),
                    ));
                }
                entry.udp = Some(udp.clone());
                entry.tcp = None;
            }
        }
        entry.name = self.name.clone();
        entry.description = self.description.clone();
        entry.tags = self.tags.clone().unwrap_or_default();
        Ok(())
    }

    fn copy_from_entry(
        &mut self,
        entry: &ServiceEntry,
        _values: &EncryptedValues,
    ) -> Result<(), ResourceError> {
        self.name = entry.name.clone();
        self.description = entry.description.clone();
        self.tcp = entry.tcp.clone();
        self.udp = entry.udp.clone();
        self.tags = if entry.tags.is_empty() {
            None
        } else {
            Some(entry.tags.clone())
        };
        Ok(())
    }
}

managed_entry_model!(ServiceModel);
