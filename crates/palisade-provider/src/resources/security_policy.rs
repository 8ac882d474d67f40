//! Security policy: an ordered rule set managed as one resource.
//!
//! The whole rulebase section owned by this resource is reconciled as a
//! group: the desired ordered rules are diffed against the live listing
//! and applied as a single multi-config batch, preferring renames so
//! rule UUIDs (which other objects and logs refer to) survive
//! reordering and renaming.
//!
//! Rule UUIDs exist on 9.0 and later; the codec carries them as an
//! entry attribute there and drops them on older devices.

use async_trait::async_trait;
use tracing::debug;

use palisade_core::client::DeviceError;
use palisade_core::location::{Location, LocationKind, LocationModel};
use palisade_core::manager::{DeviceEntryService, EntryManager, EntryObject, EntryService};
use palisade_core::reconciler::Reconciler;
use palisade_core::tfid::{self, ResourceIdentity, TfidError};
use palisade_core::version::ApiVersion;
use palisade_core::xmlapi::{Element, XmlError, member_list};

use super::{ManagedResource, ResourceError, validate_entry_name};
use crate::provider::Provider;

/// Location variants a security policy accepts.
const ALLOWED: &[LocationKind] = &[LocationKind::Shared, LocationKind::Vsys];

/// Device default for the match lists.
const ANY: &str = "any";

/// Device-side security rule entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecurityRuleEntry {
    /// Primary key.
    pub name: String,
    /// Device-assigned rule UUID; opaque, preserved across renames.
    pub uuid: Option<String>,
    /// Source zones (unordered match set).
    pub from_zones: Vec<String>,
    /// Destination zones (unordered match set).
    pub to_zones: Vec<String>,
    /// Source addresses (unordered match set).
    pub sources: Vec<String>,
    /// Destination addresses (unordered match set).
    pub destinations: Vec<String>,
    /// Applications (unordered match set).
    pub applications: Vec<String>,
    /// Services (unordered match set).
    pub services: Vec<String>,
    /// `allow`, `deny`, `drop`, …
    pub action: String,
    /// Rule disabled flag.
    pub disabled: bool,
    /// Free-form description.
    pub description: Option<String>,
    /// Administrative tags, ordered.
    pub tags: Vec<String>,
}

fn set_eq(a: &[String], b: &[String]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut a: Vec<&String> = a.iter().collect();
    let mut b: Vec<&String> = b.iter().collect();
    a.sort();
    b.sort();
    a == b
}

fn read_members_or_any(element: &Element, name: &str) -> Vec<String> {
    element
        .members(name)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| vec![ANY.to_string()])
}

impl EntryObject for SecurityRuleEntry {
    const SUFFIX: &'static [&'static str] = &["rulebase", "security", "rules"];

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn to_element(&self, version: &ApiVersion) -> Element {
        let mut entry = Element::new("entry").with_attr("name", self.name.clone());
        if version.supports(9, 0) {
            if let Some(uuid) = &self.uuid {
                entry.attrs.push(("uuid".to_string(), uuid.clone()));
            }
        }
        entry.push_child(member_list("from", &self.from_zones));
        entry.push_child(member_list("to", &self.to_zones));
        entry.push_child(member_list("source", &self.sources));
        entry.push_child(member_list("destination", &self.destinations));
        entry.push_child(member_list("application", &self.applications));
        entry.push_child(member_list("service", &self.services));
        entry.push_child(Element::new("action").with_text(self.action.clone()));
        if self.disabled {
            entry.push_child(Element::new("disabled").with_text("yes"));
        }
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
                    reason: "security rule without a name".to_string(),
                })
            })?
            .to_string();
        let uuid = if version.supports(9, 0) {
            element.attr("uuid").map(str::to_string)
        } else {
            None
        };
        Ok(Self {
            name,
            uuid,
            from_zones: read_members_or_any(element, "from"),
            to_zones: read_members_or_any(element, "to"),
            sources: read_members_or_any(element, "source"),
            destinations: read_members_or_any(element, "destination"),
            applications: read_members_or_any(element, "application"),
            services: read_members_or_any(element, "service"),
            action: element.child_text("action").unwrap_or_default(),
            disabled: element.child_text("disabled").as_deref() == Some("yes"),
            description: element.child_text("description"),
            tags: element.members("tag").unwrap_or_default(),
        })
    }

    fn specs_match(&self, other: &Self) -> bool {
        set_eq(&self.from_zones, &other.from_zones)
            && set_eq(&self.to_zones, &other.to_zones)
            && set_eq(&self.sources, &other.sources)
            && set_eq(&self.destinations, &other.destinations)
            && set_eq(&self.applications, &other.applications)
            && set_eq(&self.services, &other.services)
            && self.action == other.action
            && self.disabled == other.disabled
            && self.description == other.description
            && self.tags == other.tags
    }

    fn copy_opaque_from(&mut self, live: &Self) {
        if self.uuid.is_none() {
            self.uuid = live.uuid.clone();
        }
    }
}

/// One rule's model cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecurityRuleModel {
    /// Rule name.
    pub name: String,
    /// Source zones; defaults to `any`.
    pub from_zones: Option<Vec<String>>,
    /// Destination zones; defaults to `any`.
    pub to_zones: Option<Vec<String>>,
    /// Source addresses; defaults to `any`.
    pub sources: Option<Vec<String>>,
    /// Destination addresses; defaults to `any`.
    pub destinations: Option<Vec<String>>,
    /// Applications; defaults to `any`.
    pub applications: Option<Vec<String>>,
    /// Services; defaults to `any`.
    pub services: Option<Vec<String>>,
    /// Rule action; defaults to `allow`.
    pub action: Option<String>,
    /// Disabled flag; defaults to false.
    pub disabled: Option<bool>,
    /// Free-form description.
    pub description: Option<String>,
    /// Administrative tags.
    pub tags: Option<Vec<String>>,
    /// Device-assigned rule UUID (computed).
    pub uuid: Option<String>,
}

fn members_or_any(cell: &Option<Vec<String>>) -> Vec<String> {
    match cell {
        Some(values) if !values.is_empty() => values.clone(),
        _ => vec![ANY.to_string()],
    }
}

impl SecurityRuleModel {
    fn to_entry(&self) -> SecurityRuleEntry {
        SecurityRuleEntry {
            name: self.name.clone(),
            uuid: self.uuid.clone(),
            from_zones: members_or_any(&self.from_zones),
            to_zones: members_or_any(&self.to_zones),
            sources: members_or_any(&self.sources),
            destinations: members_or_any(&self.destinations),
            applications: members_or_any(&self.applications),
            services: members_or_any(&self.services),
            action: self
                .action
                .clone()
                .unwrap_or_else(|| "allow".to_string()),
            disabled: self.disabled.unwrap_or(false),
            description: self.description.clone(),
            tags: self.tags.clone().unwrap_or_default(),
        }
    }

    fn refresh_from(&mut self, entry: &SecurityRuleEntry) {
        self.name = entry.name.clone();
        self.uuid = entry.uuid.clone();
        self.from_zones = Some(entry.from_zones.clone());
        self.to_zones = Some(entry.to_zones.clone());
        self.sources = Some(entry.sources.clone());
        self.destinations = Some(entry.destinations.clone());
        self.applications = Some(entry.applications.clone());
        self.services = Some(entry.services.clone());
        self.action = Some(entry.action.clone());
        self.disabled = Some(entry.disabled);
        self.description = entry.description.clone();
        self.tags = if entry.tags.is_empty() {
            None
        } else {
            Some(entry.tags.clone())
        };
    }
}

/// Orchestrator-facing security policy model: an ordered rule list.
#[derive(Debug, Clone, Default)]
pub struct SecurityPolicyModel {
    /// Placement.
    pub location: LocationModel,
    /// The desired ordered rules.
    pub rules: Vec<SecurityRuleModel>,
    /// Computed opaque identity (carries the owned name list).
    pub tfid: Option<String>,
}

impl SecurityPolicyModel {
    fn resolve_location(&self) -> Result<Location, ResourceError> {
        let location = self.location.resolve()?;
        location.check_allowed(ALLOWED)?;
        Ok(location)
    }

    fn desired_entries(&self) -> Result<Vec<SecurityRuleEntry>, ResourceError> {
        let mut seen = std::collections::HashSet::new();
        for rule in &self.rules {
            validate_entry_name(&rule.name)?;
            if !seen.insert(rule.name.as_str()) {
                return Err(ResourceError::Validation(format!(
                    "duplicate rule name '{}'",
                    rule.name
                )));
            }
        }
        Ok(self.rules.iter().map(SecurityRuleModel::to_entry).collect())
    }

    /// Names this resource owned before the current operation, from the
    /// stored tfid when one exists (it survives renames), else from the
    /// stored rule list.
    fn owned_names(&self) -> Result<Vec<String>, ResourceError> {
        if let Some(raw) = &self.tfid {
            let identity = tfid::decode(raw)?;
            if let Some(names) = identity.names {
                return Ok(names);
            }
        }
        Ok(self.rules.iter().map(|r| r.name.clone()).collect())
    }

    /// Refreshes rule cells from a device listing; rules whose name is
    /// no longer present are dropped. Returns how many survived.
    fn refresh_from_listing(&mut self, listing: &[SecurityRuleEntry]) -> usize {
        self.rules.retain_mut(|rule| {
            match listing.iter().find(|e| e.name == rule.name) {
                Some(entry) => {
                    rule.refresh_from(entry);
                    true
                }
                None => false,
            }
        });
        self.rules.len()
    }

    fn stamp_tfid(&mut self, location: Location) -> Result<(), TfidError> {
        let names: Vec<String> = self.rules.iter().map(|r| r.name.clone()).collect();
        self.tfid = Some(tfid::encode(&ResourceIdentity::group(names, location))?);
        Ok(())
    }
}

fn service_for(
    provider: &Provider,
) -> Result<DeviceEntryService<SecurityRuleEntry>, ResourceError> {
    Ok(DeviceEntryService::new(provider.connected()?.clone()))
}

#[async_trait]
impl ManagedResource for SecurityPolicyModel {
    async fn create(provider: &Provider, mut planned: Self) -> Result<Self, ResourceError> {
        let location = planned.resolve_location()?;
        let desired = planned.desired_entries()?;
        let service = service_for(provider)?;
        let reconciler = Reconciler::new(&service, provider.policy());

        let fresh = reconciler.apply(&location, desired, &[]).await?;
        planned.refresh_from_listing(&fresh);
        planned.stamp_tfid(location)?;
        Ok(planned)
    }

    async fn read(provider: &Provider, mut state: Self) -> Result<Option<Self>, ResourceError> {
        let location = state.resolve_location()?;
        let service = service_for(provider)?;
        let manager = EntryManager::new(service);

        let listing = manager.service().list(&location).await?;
        if state.refresh_from_listing(&listing) == 0 {
            debug!("no owned rules remain on the device, removing from state");
            return Ok(None);
        }
        state.stamp_tfid(location)?;
        Ok(Some(state))
    }

    async fn update(
        provider: &Provider,
        state: Self,
        mut planned: Self,
    ) -> Result<Self, ResourceError> {
        let location = planned.resolve_location()?;
        let desired = planned.desired_entries()?;
        let owned = state.owned_names()?;
        let service = service_for(provider)?;
        let reconciler = Reconciler::new(&service, provider.policy());

        let fresh = reconciler.apply(&location, desired, &owned).await?;
        planned.refresh_from_listing(&fresh);
        planned.stamp_tfid(location)?;
        Ok(planned)
    }

    async fn delete(provider: &Provider, state: Self) -> Result<(), ResourceError> {
        let location = state.resolve_location()?;
        let owned = state.owned_names()?;
        let manager = EntryManager::new(service_for(provider)?);
        manager.delete(&location, &owned).await?;
        Ok(())
    }

    async fn import(_provider: &Provider, id: &str) -> Result<Self, ResourceError> {
        let identity = tfid::decode(id)?;
        let names = identity.names.clone().ok_or_else(|| {
            TfidError::Invalid("a security policy imports ordered 'names'".to_string())
        })?;
        identity.location.check_allowed(ALLOWED)?;

        let rules = names
            .into_iter()
            .map(|name| SecurityRuleModel {
                name,
                ..SecurityRuleModel::default()
            })
            .collect();
        Ok(Self {
            location: LocationModel::from(&identity.location),
            rules,
            tfid: Some(id.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(name: &str) -> SecurityRuleModel {
        SecurityRuleModel {
            name: name.to_string(),
            sources: Some(vec!["10.0.0.0/8".to_string()]),
            action: Some("allow".to_string()),
            ..SecurityRuleModel::default()
        }
    }

    #[test]
    fn test_rule_codec_with_uuid_on_modern_device() {
        let version = ApiVersion::new(10, 1, 0);
        let entry = SecurityRuleEntry {
            name: "allow-web".to_string(),
            uuid: Some("123e4567-e89b-12d3-a456-426614174000".to_string()),
            from_zones: vec!["trust".to_string()],
            to_zones: vec!["untrust".to_string()],
            sources: vec![ANY.to_string()],
            destinations: vec![ANY.to_string()],
            applications: vec!["web-browsing".to_string()],
            services: vec!["application-default".to_string()],
            action: "allow".to_string(),
            ..SecurityRuleEntry::default()
        };
        let element = entry.to_element(&version);
        assert_eq!(
            element.attr("uuid"),
            Some("123e4567-e89b-12d3-a456-426614174000")
        );
        assert_eq!(
            SecurityRuleEntry::from_element(&element, &version).expect("decode"),
            entry
        );
    }

    #[test]
    fn test_uuid_dropped_before_9_0() {
        let old = ApiVersion::new(8, 1, 0);
        let entry = SecurityRuleEntry {
            name: "r".to_string(),
            uuid: Some("u-1".to_string()),
            action: "allow".to_string(),
            ..SecurityRuleEntry::default()
        };
        let element = entry.to_element(&old);
        assert_eq!(element.attr("uuid"), None);
    }

    #[test]
    fn test_specs_match_is_set_based_for_peers() {
        let mut a = SecurityRuleEntry {
            name: "r".to_string(),
            sources: vec!["b".to_string(), "a".to_string()],
            action: "allow".to_string(),
            ..SecurityRuleEntry::default()
        };
        let b = SecurityRuleEntry {
            name: "r2".to_string(),
            sources: vec!["a".to_string(), "b".to_string()],
            action: "allow".to_string(),
            ..SecurityRuleEntry::default()
        };
        assert!(a.specs_match(&b), "peer sets compare unordered");

        // Tags are ordered.
        a.tags = vec!["x".to_string(), "y".to_string()];
        let mut c = b.clone();
        c.tags = vec!["y".to_string(), "x".to_string()];
        assert!(!a.specs_match(&c));
    }

    #[test]
    fn test_model_defaults_to_any_and_allow() {
        let entry = rule("r1").to_entry();
        assert_eq!(entry.from_zones, vec![ANY.to_string()]);
        assert_eq!(entry.to_zones, vec![ANY.to_string()]);
        assert_eq!(entry.sources, vec!["10.0.0.0/8".to_string()]);
        assert_eq!(entry.applications, vec![ANY.to_string()]);
        assert_eq!(entry.action, "allow");
        assert!(!entry.disabled);
    }

    #[test]
    fn test_duplicate_rule_names_rejected() {
        let model = SecurityPolicyModel {
            rules: vec![rule("r1"), rule("r1")],
            ..SecurityPolicyModel::default()
        };
        assert!(model.desired_entries().is_err());
    }

    #[test]
    fn test_owned_names_come_from_tfid_when_present() {
        use palisade_core::location::Location;

        let location = Location::Shared(true);
        let identity = ResourceIdentity::group(
            vec!["old-1".to_string(), "old-2".to_string()],
            location,
        );
        let model = SecurityPolicyModel {
            rules: vec![rule("renamed-1")],
            tfid: Some(tfid::encode(&identity).expect("encode")),
            ..SecurityPolicyModel::default()
        };
        assert_eq!(
            model.owned_names().expect("owned"),
            vec!["old-1".to_string(), "old-2".to_string()]
        );
    }

    #[test]
    fn test_refresh_drops_vanished_rules() {
        let mut model = SecurityPolicyModel {
            rules: vec![rule("keep"), rule("gone")],
            ..SecurityPolicyModel::default()
        };
        let listing = vec![SecurityRuleEntry {
            name: "keep".to_string(),
            uuid: Some("u-keep".to_string()),
            action: "allow".to_string(),
            from_zones: vec![ANY.to_string()],
            to_zones: vec![ANY.to_string()],
            sources: vec![ANY.to_string()],
            destinations: vec![ANY.to_string()],
            applications: vec![ANY.to_string()],
            services: vec![ANY.to_string()],
            ..SecurityRuleEntry::default()
        }];
        assert_eq!(model.refresh_from_listing(&listing), 1);
        assert_eq!(model.rules.len(), 1);
        assert_eq!(model.rules[0].uuid.as_deref(), Some("u-keep"));
    }
}
