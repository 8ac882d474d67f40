//! Device-group parent assignment.
//!
//! Backed by operational commands rather than config entries: Read
//! parses `show dg-hierarchy`, Create/Update issue `request move-dg`,
//! and Delete re-assigns the group to the top level when it currently
//! has a parent.

use async_trait::async_trait;

use palisade_core::location::{Location, PanoramaLocation, DEFAULT_DEVICE};
use palisade_core::tfid::{self, ResourceIdentity, TfidError};

use super::{ManagedResource, ResourceError, validate_entry_name};
use crate::actions::{device_group_hierarchy, move_device_group};
use crate::provider::Provider;

/// Orchestrator-facing device-group parent model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceGroupParentModel {
    /// The Panorama device; defaults to `localhost.localdomain`.
    pub panorama_device: Option<String>,
    /// The device group whose parent is managed.
    pub device_group: String,
    /// The parent device group; `None` means top level.
    pub parent: Option<String>,
    /// Computed opaque identity.
    pub tfid: Option<String>,
}

impl DeviceGroupParentModel {
    fn location(&self) -> Location {
        Location::Panorama(PanoramaLocation {
            panorama_device: self
                .panorama_device
                .clone()
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| DEFAULT_DEVICE.to_string()),
        })
    }

    fn stamp_tfid(&mut self) -> Result<(), TfidError> {
        self.tfid = Some(tfid::encode(&ResourceIdentity::singleton(
            self.device_group.as_str(),
            self.location(),
        ))?);
        Ok(())
    }

    fn desired_parent(&self) -> Option<&str> {
        self.parent.as_deref().filter(|p| !p.is_empty())
    }
}

#[async_trait]
impl ManagedResource for DeviceGroupParentModel {
    async fn create(provider: &Provider, mut planned: Self) -> Result<Self, ResourceError> {
        validate_entry_name(&planned.device_group)?;
        move_device_group(provider, &planned.device_group, planned.desired_parent()).await?;
        planned.stamp_tfid()?;
        Ok(planned)
    }

    async fn read(provider: &Provider, mut state: Self) -> Result<Option<Self>, ResourceError> {
        let hierarchy = device_group_hierarchy(provider).await?;
        let Some(parent) = hierarchy.get(&state.device_group) else {
            // The device group itself is gone.
            return Ok(None);
        };
        state.parent = parent.clone();
        state.stamp_tfid()?;
        Ok(Some(state))
    }

    async fn update(
        provider: &Provider,
        _state: Self,
        mut planned: Self,
    ) -> Result<Self, ResourceError> {
        validate_entry_name(&planned.device_group)?;
        move_device_group(provider, &planned.device_group, planned.desired_parent()).await?;
        planned.stamp_tfid()?;
        Ok(planned)
    }

    async fn delete(provider: &Provider, state: Self) -> Result<(), ResourceError> {
        let hierarchy = device_group_hierarchy(provider).await?;
        match hierarchy.get(&state.device_group) {
            Some(Some(_)) => {
                // Currently parented: re-assign to the top level.
                move_device_group(provider, &state.device_group, None).await?;
            }
            // Already top-level or the group is gone.
            Some(None) | None => {}
        }
        Ok(())
    }

    async fn import(_provider: &Provider, id: &str) -> Result<Self, ResourceError> {
        let identity = tfid::decode(id)?;
        let name = identity.name.clone().ok_or_else(|| {
            TfidError::Invalid("device-group parent imports a single 'name'".to_string())
        })?;
        let panorama_device = match &identity.location {
            Location::Panorama(loc) => Some(loc.panorama_device.clone()),
            _ => {
                return Err(ResourceError::Validation(
                    "device-group parent ids carry a panorama location".to_string(),
                ));
            }
        };
        Ok(Self {
            panorama_device,
            device_group: name,
            parent: None,
            tfid: Some(id.to_string()),
        })
    }
}
