//! Per-resource models, translators, and the universal CRUD shell.
//!
//! Each resource supplies a model (optional attribute cells, the
//! orchestrator-facing mirror) and an entry (the device shape), plus
//! the bidirectional copy between them. The shell here wires those
//! into the five handlers every singleton resource exposes:
//!
//! 1. extract the plan/state into the model,
//! 2. resolve the [`Location`](palisade_core::location::Location),
//! 3. require device-connected mode,
//! 4. run the [`EntryManager`],
//! 5. copy the device result back and stamp a fresh tfid.
//!
//! Grouping resources (the security policy, bulk addresses) and the
//! certificate importer implement [`ManagedResource`] directly;
//! everything else implements [`EntryModel`] and derives the handlers
//! with `managed_entry_model!`.

pub mod address;
pub mod address_group;
pub mod addresses;
pub mod certificate;
pub mod device_group_parent;
pub mod external_list;
pub mod security_policy;
pub mod service;
pub mod service_group;
pub mod tag;
pub mod template_variable;
pub mod zone;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use palisade_core::client::DeviceError;
use palisade_core::ledger::{EncryptedValues, LedgerError};
use palisade_core::location::{LocationError, LocationKind, LocationModel};
use palisade_core::manager::{DeviceEntryService, EntryManager, EntryObject};
use palisade_core::reconciler::ReconcileError;
use palisade_core::tfid::{self, ResourceIdentity, TfidError};

use crate::provider::Provider;

/// Maximum entry name length for most resources.
pub const MAX_NAME_LEN: usize = 63;

/// Errors surfaced by resource handlers.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ResourceError {
    /// A mutation was attempted while the provider is unconnected.
    /// Set a hostname (or `PANOS_HOST`) to leave inspection mode.
    #[error("invalid mode: operation requires a device connection")]
    InvalidMode,

    /// The location cell is invalid for this resource.
    #[error(transparent)]
    Location(#[from] LocationError),

    /// The tfid or import id could not be decoded.
    #[error(transparent)]
    Tfid(#[from] TfidError),

    /// The encrypted-value ledger rejected a store.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// A device or transport failure.
    #[error(transparent)]
    Device(#[from] DeviceError),

    /// Group reconciliation failed.
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    /// The entry name violates the device's naming rules.
    #[error("invalid entry name '{name}': {reason}")]
    InvalidName {
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A schema-level constraint failed (exactly-one-of groups, value
    /// bounds).
    #[error("{0}")]
    Validation(String),
}

/// Validates an entry name: alphanumeric plus `._-`, at most
/// [`MAX_NAME_LEN`] characters, non-empty.
///
/// # Errors
///
/// Returns [`ResourceError::InvalidName`].
pub fn validate_entry_name(name: &str) -> Result<(), ResourceError> {
    if name.is_empty() {
        return Err(ResourceError::InvalidName {
            name: name.to_string(),
            reason: "must not be empty".to_string(),
        });
    }
    if name.len() > MAX_NAME_LEN {
        return Err(ResourceError::InvalidName {
            name: name.to_string(),
            reason: format!("must be at most {MAX_NAME_LEN} characters"),
        });
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && !matches!(c, '.' | '_' | '-'))
    {
        return Err(ResourceError::InvalidName {
            name: name.to_string(),
            reason: format!("character '{bad}' is not allowed"),
        });
    }
    Ok(())
}

/// A singleton resource model wired into the generic shell.
///
/// The translator pair is the heart of the contract: `copy_to_entry`
/// allocates nested sub-objects only for non-null cells and reuses
/// attached instances so device-opaque fields survive; `copy_from_entry`
/// mirrors optional cells back (absent scalar becomes a null cell, a
/// device-side default becomes a populated cell — Read is
/// authoritative).
pub trait EntryModel: Default + Clone + Send + Sync {
    /// The device-side entry type.
    type Entry: EntryObject + Default;

    /// Location variants this resource accepts.
    const ALLOWED: &'static [LocationKind];

    /// Name discipline for this resource. The default is the common
    /// rule (alphanumeric plus `._-`, at most [`MAX_NAME_LEN`]
    /// characters); resources with special keys (template variables'
    /// `$` prefix) override it.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::InvalidName`].
    fn validate_name(name: &str) -> Result<(), ResourceError> {
        validate_entry_name(name)
    }

    /// The entry name cell.
    fn name(&self) -> &str;

    /// Replaces the entry name cell.
    fn set_name(&mut self, name: String);

    /// The location cell.
    fn location_model(&self) -> &LocationModel;

    /// Replaces the location cell (import seeding).
    fn set_location_model(&mut self, location: LocationModel);

    /// Stamps the computed tfid.
    fn set_tfid(&mut self, tfid: String);

    /// Copies model cells into the entry.
    ///
    /// # Errors
    ///
    /// Returns validation errors for unsatisfiable cell combinations.
    fn copy_to_entry(
        &self,
        entry: &mut Self::Entry,
        values: &mut EncryptedValues,
    ) -> Result<(), ResourceError>;

    /// Mirrors the entry back into model cells.
    ///
    /// # Errors
    ///
    /// Returns validation errors when the entry cannot be represented.
    fn copy_from_entry(
        &mut self,
        entry: &Self::Entry,
        values: &EncryptedValues,
    ) -> Result<(), ResourceError>;
}

/// The five handlers the orchestrator calls on a managed resource.
#[async_trait]
pub trait ManagedResource: Sized + Send + Sync {
    /// Creates the object and returns the state to store.
    async fn create(provider: &Provider, planned: Self) -> Result<Self, ResourceError>;

    /// Refreshes state from the device. `Ok(None)` means the object is
    /// gone and must be removed from state.
    async fn read(provider: &Provider, state: Self) -> Result<Option<Self>, ResourceError>;

    /// Applies the planned change on top of the stored state.
    async fn update(provider: &Provider, state: Self, planned: Self)
        -> Result<Self, ResourceError>;

    /// Deletes the object. Absence is tolerated.
    async fn delete(provider: &Provider, state: Self) -> Result<(), ResourceError>;

    /// Seeds state from an orchestrator-supplied opaque id; a
    /// subsequent Read reconciles the rest.
    async fn import(provider: &Provider, id: &str) -> Result<Self, ResourceError>;
}

fn manager_for<M: EntryModel>(
    provider: &Provider,
) -> Result<EntryManager<DeviceEntryService<M::Entry>>, ResourceError> {
    let client = provider.connected()?;
    Ok(EntryManager::new(DeviceEntryService::new(client.clone())))
}

/// Shared Create shell for [`EntryModel`] resources.
///
/// # Errors
///
/// Name/location validation errors, [`ResourceError::InvalidMode`], and
/// manager errors ([`DeviceError::Conflict`] when the name is taken).
pub async fn create_entry<M: EntryModel>(
    provider: &Provider,
    mut planned: M,
) -> Result<M, ResourceError> {
    M::validate_name(planned.name())?;
    let location = planned.location_model().resolve()?;
    location.check_allowed(M::ALLOWED)?;
    let manager = manager_for::<M>(provider)?;

    let mut values = EncryptedValues::new();
    let mut entry = M::Entry::default();
    entry.set_name(planned.name().to_string());
    planned.copy_to_entry(&mut entry, &mut values)?;

    let created = manager.create(&location, &entry).await?;
    planned.copy_from_entry(&created, &values)?;
    planned.set_tfid(tfid::encode(&ResourceIdentity::singleton(
        created.name(),
        location,
    ))?);
    Ok(planned)
}

/// Shared Read shell. `Ok(None)` means the object is gone.
///
/// # Errors
///
/// See [`create_entry`]; absence is not an error here.
pub async fn read_entry<M: EntryModel>(
    provider: &Provider,
    mut state: M,
) -> Result<Option<M>, ResourceError> {
    let location = state.location_model().resolve()?;
    location.check_allowed(M::ALLOWED)?;
    let manager = manager_for::<M>(provider)?;

    let entry = match manager.read(&location, state.name()).await {
        Ok(entry) => entry,
        Err(DeviceError::ObjectNotFound) => {
            debug!(name = state.name(), "object vanished, removing from state");
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    let values = EncryptedValues::new();
    state.copy_from_entry(&entry, &values)?;
    state.set_tfid(tfid::encode(&ResourceIdentity::singleton(
        entry.name(),
        location,
    ))?);
    Ok(Some(state))
}

/// Shared Update shell; renames implicitly when the planned name
/// differs from the stored one.
///
/// # Errors
///
/// See [`create_entry`]; [`DeviceError::ObjectNotFound`] when the
/// stored entry vanished.
pub async fn update_entry<M: EntryModel>(
    provider: &Provider,
    state: M,
    mut planned: M,
) -> Result<M, ResourceError> {
    M::validate_name(planned.name())?;
    let location = planned.location_model().resolve()?;
    location.check_allowed(M::ALLOWED)?;
    let manager = manager_for::<M>(provider)?;

    let mut values = EncryptedValues::new();
    let mut entry = M::Entry::default();
    entry.set_name(planned.name().to_string());
    planned.copy_to_entry(&mut entry, &mut values)?;

    let updated = manager.update(&location, &entry, state.name()).await?;
    planned.copy_from_entry(&updated, &values)?;
    planned.set_tfid(tfid::encode(&ResourceIdentity::singleton(
        updated.name(),
        location,
    ))?);
    Ok(planned)
}

/// Shared Delete shell; absence is tolerated.
///
/// # Errors
///
/// Location errors, [`ResourceError::InvalidMode`], and transport
/// errors.
pub async fn delete_entry<M: EntryModel>(
    provider: &Provider,
    state: M,
) -> Result<(), ResourceError> {
    let location = state.location_model().resolve()?;
    let manager = manager_for::<M>(provider)?;
    manager
        .delete(&location, &[state.name().to_string()])
        .await?;
    Ok(())
}

/// Shared Import shell: seeds a model from a decoded identity.
///
/// # Errors
///
/// [`ResourceError::Tfid`] on undecodable or invalid ids.
pub async fn import_entry<M: EntryModel>(id: &str) -> Result<M, ResourceError> {
    let identity = tfid::decode(id)?;
    let name = identity.name.clone().ok_or_else(|| {
        TfidError::Invalid("this resource imports a single 'name'".to_string())
    })?;
    identity.location.check_allowed(M::ALLOWED)?;

    let mut model = M::default();
    model.set_name(name);
    model.set_location_model(LocationModel::from(&identity.location));
    model.set_tfid(id.to_string());
    Ok(model)
}

/// Implements [`ManagedResource`] for an [`EntryModel`] by delegating
/// to the shared shell functions.
macro_rules! managed_entry_model {
    ($model:ty) => {
        #[async_trait::async_trait]
        impl crate::resources::ManagedResource for $model {
            async fn create(
                provider: &crate::provider::Provider,
                planned: Self,
            ) -> Result<Self, crate::resources::ResourceError> {
                crate::resources::create_entry(provider, planned).await
            }

            async fn read(
                provider: &crate::provider::Provider,
                state: Self,
            ) -> Result<Option<Self>, crate::resources::ResourceError> {
                crate::resources::read_entry(provider, state).await
            }

            async fn update(
                provider: &crate::provider::Provider,
                state: Self,
                planned: Self,
            ) -> Result<Self, crate::resources::ResourceError> {
                crate::resources::update_entry(provider, state, planned).await
            }

            async fn delete(
                provider: &crate::provider::Provider,
                state: Self,
            ) -> Result<(), crate::resources::ResourceError> {
                crate::resources::delete_entry(provider, state).await
            }

            async fn import(
                _provider: &crate::provider::Provider,
                id: &str,
            ) -> Result<Self, crate::resources::ResourceError> {
                crate::resources::import_entry(id).await
            }
        }
    };
}
pub(crate) use managed_entry_model;
