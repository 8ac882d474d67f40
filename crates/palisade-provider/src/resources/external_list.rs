//! External dynamic lists.
//!
//! An EDL points the device at an externally hosted list of IPs,
//! domains, or URLs and refreshes it on a schedule. The list kind and
//! the refresh schedule are both exactly-one-of groups nested under the
//! entry's `<type>` element.

use palisade_core::client::DeviceError;
use palisade_core::ledger::EncryptedValues;
use palisade_core::location::{LocationKind, LocationModel};
use palisade_core::manager::EntryObject;
use palisade_core::version::ApiVersion;
use palisade_core::xmlapi::{Element, XmlError, member_list};

use super::{EntryModel, ResourceError, managed_entry_model};

/// What the external source lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdlKind {
    /// IP addresses and ranges.
    Ip,
    /// Domain names.
    Domain,
    /// URLs.
    Url,
}

impl EdlKind {
    /// The element tag under `<type>`.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Ip => "ip",
            Self::Domain => "domain",
            Self::Url => "url",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "ip" => Some(Self::Ip),
            "domain" => Some(Self::Domain),
            "url" => Some(Self::Url),
            _ => None,
        }
    }
}

/// Refresh schedule; the device accepts exactly one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recurring {
    /// Every five minutes.
    FiveMinute,
    /// Every hour.
    Hourly,
    /// Once a day at the given hour (`00`–`23`).
    Daily {
        /// Hour of day.
        at: String,
    },
    /// Once a week.
    Weekly {
        /// `sunday` … `saturday`.
        day_of_week: String,
        /// Hour of day.
        at: String,
    },
    /// Once a month.
    Monthly {
        /// Day of month, 1–31.
        day_of_month: u32,
        /// Hour of day.
        at: String,
    },
}

impl Recurring {
    fn to_element(&self) -> Element {
        let mut recurring = Element::new("recurring");
        match self {
            Self::FiveMinute => recurring.push_child(Element::new("five-minute")),
            Self::Hourly => recurring.push_child(Element::new("hourly")),
            Self::Daily { at } => {
                recurring.push_child(
                    Element::new("daily").with_child(Element::new("at").with_text(at.clone())),
                );
            }
            Self::Weekly { day_of_week, at } => {
                recurring.push_child(
                    Element::new("weekly")
                        .with_child(
                            Element::new("day-of-week").with_text(day_of_week.clone()),
                        )
                        .with_child(Element::new("at").with_text(at.clone())),
                );
            }
            Self::Monthly { day_of_month, at } => {
                recurring.push_child(
                    Element::new("monthly")
                        .with_child(
                            Element::new("day-of-month").with_text(day_of_month.to_string()),
                        )
                        .with_child(Element::new("at").with_text(at.clone())),
                );
            }
        }
        recurring
    }

    fn from_element(recurring: &Element) -> Option<Self> {
        if recurring.child("five-minute").is_some() {
            return Some(Self::FiveMinute);
        }
        if recurring.child("hourly").is_some() {
            return Some(Self::Hourly);
        }
        if let Some(daily) = recurring.child("daily") {
            return Some(Self::Daily {
                at: daily.child_text("at").unwrap_or_default(),
            });
        }
        if let Some(weekly) = recurring.child("weekly") {
            return Some(Self::Weekly {
                day_of_week: weekly.child_text("day-of-week").unwrap_or_default(),
                at: weekly.child_text("at").unwrap_or_default(),
            });
        }
        if let Some(monthly) = recurring.child("monthly") {
            return Some(Self::Monthly {
                day_of_month: monthly
                    .child_text("day-of-month")
                    .and_then(|d| d.parse().ok())
                    .unwrap_or(1),
                at: monthly.child_text("at").unwrap_or_default(),
            });
        }
        None
    }
}

/// Device-side external dynamic list entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdlEntry {
    /// Primary key.
    pub name: String,
    /// What the source lists.
    pub kind: EdlKind,
    /// Source URL.
    pub url: String,
    /// Free-form description.
    pub description: Option<String>,
    /// Certificate profile used to authenticate the source.
    pub certificate_profile: Option<String>,
    /// Refresh schedule.
    pub recurring: Option<Recurring>,
    /// Entries excluded from the fetched list, ordered.
    pub exceptions: Vec<String>,
}

impl Default for EdlEntry {
    fn default() -> Self {
        Self {
            name: String::new(),
            kind: EdlKind::Ip,
            url: String::new(),
            description: None,
            certificate_profile: None,
            recurring: None,
            exceptions: Vec::new(),
        }
    }
}

impl EntryObject for EdlEntry {
    const SUFFIX: &'static [&'static str] = &["external-list"];

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn to_element(&self, _version: &ApiVersion) -> Element {
        let mut body = Element::new(self.kind.tag())
            .with_child(Element::new("url").with_text(self.url.clone()));
        if let Some(description) = &self.description {
            body.push_child(Element::new("description").with_text(description.clone()));
        }
        if let Some(profile) = &self.certificate_profile {
            body.push_child(Element::new("certificate-profile").with_text(profile.clone()));
        }
        if let Some(recurring) = &self.recurring {
            body.push_child(recurring.to_element());
        }
        if !self.exceptions.is_empty() {
            body.push_child(member_list("exception-list", &self.exceptions));
        }
        Element::new("entry")
            .with_attr("name", self.name.clone())
            .with_child(Element::new("type").with_child(body))
    }

    fn from_element(element: &Element, _version: &ApiVersion) -> Result<Self, DeviceError> {
        let name = element
            .attr("name")
            .ok_or_else(|| {
                DeviceError::Xml(XmlError::Malformed {
                    reason: "external-list entry without a name".to_string(),
                })
            })?
            .to_string();
        let type_el = element.child("type").ok_or_else(|| {
            DeviceError::Xml(XmlError::Malformed {
                reason: format!("external-list '{name}' has no <type>"),
            })
        })?;
        let (kind, body) = type_el
            .child_elements()
            .find_map(|el| EdlKind::from_tag(&el.name).map(|kind| (kind, el)))
            .ok_or_else(|| {
                DeviceError::Xml(XmlError::Malformed {
                    reason: format!("external-list '{name}' has an unknown type"),
                })
            })?;
        Ok(Self {
            name,
            kind,
            url: body.child_text("url").unwrap_or_default(),
            description: body.child_text("description"),
            certificate_profile: body.child_text("certificate-profile"),
            recurring: body.child("recurring").and_then(Recurring::from_element),
            exceptions: body.members("exception-list").unwrap_or_default(),
        })
    }

    fn specs_match(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.url == other.url
            && self.description == other.description
            && self.certificate_profile == other.certificate_profile
            && self.recurring == other.recurring
            && self.exceptions == other.exceptions
    }
}

/// Orchestrator-facing external dynamic list model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdlModel {
    /// Placement.
    pub location: LocationModel,
    /// Entry name.
    pub name: String,
    /// What the source lists; required.
    pub kind: Option<EdlKind>,
    /// Source URL; required, non-empty.
    pub url: Option<String>,
    /// Free-form description.
    pub description: Option<String>,
    /// Certificate profile used to authenticate the source.
    pub certificate_profile: Option<String>,
    /// Refresh schedule.
    pub recurring: Option<Recurring>,
    /// Entries excluded from the fetched list.
    pub exceptions: Option<Vec<String>>,
    /// Computed opaque identity.
    pub tfid: Option<String>,
}

impl EntryModel for EdlModel {
    type Entry = EdlEntry;

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
        entry: &mut EdlEntry,
        _values: &mut EncryptedValues,
    ) -> Result<(), ResourceError> {
        let Some(kind) = self.kind else {
            return Err(ResourceError::Validation(
                "external list requires a kind (ip, domain, url)".to_string(),
            ));
        };
        let url = self.url.clone().unwrap_or_default();
        if url.is_empty() {
            return Err(ResourceError::Validation(
                "external list requires a non-empty url".to_string(),
            ));
        }
        if let Some(Recurring::Monthly { day_of_month, .. }) = &self.recurring {
            if !(1..=31).contains(day_of_month) {
                return Err(ResourceError::Validation(format!(
                    "day_of_month {day_of_month} is out of range 1..=31"
                )));
            }
        }
        entry.name = self.name.clone();
        entry.kind = kind;
        entry.url = url;
        entry.description = self.description.clone();
        entry.certificate_profile = self.certificate_profile.clone();
        entry.recurring = self.recurring.clone();
        entry.exceptions = self.exceptions.clone().unwrap_or_default();
        Ok(())
    }

    fn copy_from_entry(
        &mut self,
        entry: &EdlEntry,
        _values: &EncryptedValues,
    ) -> Result<(), ResourceError> {
        self.name = entry.name.clone();
        self.kind = Some(entry.kind);
        self.url = Some(entry.url.clone());
        self.description = entry.description.clone();
        self.certificate_profile = entry.certificate_profile.clone();
        self.recurring = entry.recurring.clone();
        self.exceptions = if entry.exceptions.is_empty() {
            None
        } else {
            Some(entry.exceptions.clone())
        };
        Ok(())
    }
}

managed_entry_model!(EdlModel);
