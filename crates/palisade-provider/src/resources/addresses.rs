//! Bulk address management: many address objects as one resource.
//!
//! Where [`address`](super::address) manages a single entry, this
//! resource owns an ordered set and reconciles it through the group
//! engine: one multi-config batch per apply, renames preferred over
//! delete-plus-create so references to the objects stay intact.

use async_trait::async_trait;
use tracing::debug;

use palisade_core::ledger::EncryptedValues;
use palisade_core::location::{Location, LocationModel};
use palisade_core::manager::{DeviceEntryService, EntryManager, EntryService};
use palisade_core::reconciler::Reconciler;
use palisade_core::tfid::{self, ResourceIdentity, TfidError};

use super::address::{AddressEntry, AddressModel};
use super::{EntryModel, ManagedResource, ResourceError, validate_entry_name};
use crate::provider::Provider;

/// One address inside the bulk resource: the singleton model minus
/// location and tfid (those belong to the whole set).
pub type BulkAddress = AddressModel;

/// Orchestrator-facing bulk address model.
#[derive(Debug, Clone, Default)]
pub struct AddressesModel {
    /// Placement shared by every entry.
    pub location: LocationModel,
    /// The desired ordered address set.
    pub addresses: Vec<BulkAddress>,
    /// Computed opaque identity (carries the owned name list).
    pub tfid: Option<String>,
}

impl AddressesModel {
    fn resolve_location(&self) -> Result<Location, ResourceError> {
        let location = self.location.resolve()?;
        location.check_allowed(AddressModel::ALLOWED)?;
        Ok(location)
    }

    fn desired_entries(&self) -> Result<Vec<AddressEntry>, ResourceError> {
        let mut seen = std::collections::HashSet::new();
        let mut entries = Vec::with_capacity(self.addresses.len());
        let mut values = EncryptedValues::new();
        for model in &self.addresses {
            validate_entry_name(&model.name)?;
            if !seen.insert(model.name.as_str()) {
                return Err(ResourceError::Validation(format!(
                    "duplicate address name '{}'",
                    model.name
                )));
            }
            let mut entry = AddressEntry::default();
            model.copy_to_entry(&mut entry, &mut values)?;
            entries.push(entry);
        }
        Ok(entries)
    }

    fn owned_names(&self) -> Result<Vec<String>, ResourceError> {
        if let Some(raw) = &self.tfid {
            let identity = tfid::decode(raw)?;
            if let Some(names) = identity.names {
                return Ok(names);
            }
        }
        Ok(self.addresses.iter().map(|a| a.name.clone()).collect())
    }

    fn refresh_from_listing(&mut self, listing: &[AddressEntry]) -> Result<usize, ResourceError> {
        let values = EncryptedValues::new();
        let mut kept = Vec::with_capacity(self.addresses.len());
        for mut model in self.addresses.drain(..) {
            if let Some(entry) = listing.iter().find(|e| e.name == model.name) {
                model.copy_from_entry(entry, &values)?;
                kept.push(model);
            }
        }
        self.addresses = kept;
        Ok(self.addresses.len())
    }

    fn stamp_tfid(&mut self, location: Location) -> Result<(), TfidError> {
        let names: Vec<String> = self.addresses.iter().map(|a| a.name.clone()).collect();
        self.tfid = Some(tfid::encode(&ResourceIdentity::group(names, location))?);
        Ok(())
    }
}

fn service_for(provider: &Provider) -> Result<DeviceEntryService<AddressEntry>, ResourceError> {
    Ok(DeviceEntryService::new(provider.connected()?.clone()))
}

#[async_trait]
impl ManagedResource for AddressesModel {
    async fn create(provider: &Provider, mut planned: Self) -> Result<Self, ResourceError> {
        let location = planned.resolve_location()?;
        let desired = planned.desired_entries()?;
        let service = service_for(provider)?;
        let reconciler = Reconciler::new(&service, provider.policy());

        let fresh = reconciler.apply(&location, desired, &[]).await?;
        planned.refresh_from_listing(&fresh)?;
        planned.stamp_tfid(location)?;
        Ok(planned)
    }

    async fn read(provider: &Provider, mut state: Self) -> Result<Option<Self>, ResourceError> {
        let location = state.resolve_location()?;
        let service = service_for(provider)?;
        let manager = EntryManager::new(service);

        let listing = manager.service().list(&location).await?;
        if state.refresh_from_listing(&listing)? == 0 {
            debug!("no owned addresses remain on the device, removing from state");
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
        planned.refresh_from_listing(&fresh)?;
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
            TfidError::Invalid("bulk addresses import ordered 'names'".to_string())
        })?;
        identity.location.check_allowed(AddressModel::ALLOWED)?;

        let addresses = names
            .into_iter()
            .map(|name| BulkAddress {
                name,
                ..BulkAddress::default()
            })
            .collect();
        Ok(Self {
            location: LocationModel::from(&identity.location),
            addresses,
            tfid: Some(id.to_string()),
        })
    }
}
