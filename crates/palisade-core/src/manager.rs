//! Generic CRUD for a single named entry.
//!
//! [`EntryObject`] is the device-side object contract: a primary-key
//! name, a versioned element codec, and an equality that ignores
//! device-opaque fields. [`EntryService`] is the transport-facing
//! surface — [`DeviceEntryService`] is the production implementation
//! over a [`DeviceClient`], and tests substitute in-memory fakes.
//! [`EntryManager`] layers the CRUD discipline on top: existence
//! conflicts on create, opaque-field preservation and implicit rename
//! on update, tolerated absence on delete.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::client::{DeviceClient, DeviceError};
use crate::location::Location;
use crate::version::ApiVersion;
use crate::xmlapi::{BatchOp, Element, entry_xpath_quoted};

/// A device-side configuration entry.
pub trait EntryObject: Clone + Send + Sync + 'static {
    /// Path of the entry collection under a location's xpath prefix,
    /// e.g. `["address"]` or `["rulebase", "security", "rules"]`.
    const SUFFIX: &'static [&'static str];

    /// The primary key.
    fn name(&self) -> &str;

    /// Replaces the primary key.
    fn set_name(&mut self, name: String);

    /// Serializes the entry for the device. All wire encoding goes
    /// through the version specifier.
    fn to_element(&self, version: &ApiVersion) -> Element;

    /// Parses a device `<entry>` element, normalizing version-specific
    /// encodings.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::Xml`] family errors on malformed entries.
    fn from_element(element: &Element, version: &ApiVersion) -> Result<Self, DeviceError>;

    /// Equality that ignores the primary key and device-opaque fields
    /// (UUIDs, timestamps). The name is excluded so a renamed entry with
    /// unchanged content compares equal to its live predecessor.
    fn specs_match(&self, other: &Self) -> bool;

    /// Copies device-opaque fields from a live entry so an edit does not
    /// clobber them. The default is a no-op for resources without opaque
    /// fields.
    fn copy_opaque_from(&mut self, _live: &Self) {}
}

/// Transport-facing operations on one entry collection.
#[async_trait]
pub trait EntryService: Send + Sync {
    /// The entry type this service manages.
    type Entry: EntryObject;

    /// Lists all entries at a location, in device order.
    async fn list(&self, location: &Location) -> Result<Vec<Self::Entry>, DeviceError>;

    /// Reads one entry by name.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::ObjectNotFound`] when absent.
    async fn read(&self, location: &Location, name: &str) -> Result<Self::Entry, DeviceError>;

    /// Upserts one entry at its own name's xpath.
    async fn edit(&self, location: &Location, entry: &Self::Entry) -> Result<(), DeviceError>;

    /// Renames an entry in place.
    async fn rename(
        &self,
        location: &Location,
        old_name: &str,
        new_name: &str,
    ) -> Result<(), DeviceError>;

    /// Deletes one entry. Absence is not an error.
    async fn delete(&self, location: &Location, name: &str) -> Result<(), DeviceError>;

    /// Applies an ordered operation batch atomically.
    async fn apply_batch(
        &self,
        location: &Location,
        ops: Vec<BatchOp>,
    ) -> Result<(), DeviceError>;

    /// The fully qualified xpath of the collection or one entry.
    fn xpath(&self, location: &Location, name: Option<&str>) -> String;

    /// Serializes an entry with this service's version specifier.
    fn serialize(&self, entry: &Self::Entry) -> Element;

    /// Equality ignoring device-opaque fields.
    fn specs_match(&self, a: &Self::Entry, b: &Self::Entry) -> bool {
        a.specs_match(b)
    }
}

/// Production [`EntryService`] over a shared [`DeviceClient`].
pub struct DeviceEntryService<E> {
    client: Arc<dyn DeviceClient>,
    _entry: PhantomData<fn() -> E>,
}

impl<E> DeviceEntryService<E> {
    /// Wraps a device client.
    #[must_use]
    pub fn new(client: Arc<dyn DeviceClient>) -> Self {
        Self {
            client,
            _entry: PhantomData,
        }
    }
}

impl<E: EntryObject> DeviceEntryService<E> {
    fn collection_tag() -> &'static str {
        E::SUFFIX
            .last()
            .copied()
            .expect("entry suffix paths are never empty")
    }
}

#[async_trait]
impl<E: EntryObject> EntryService for DeviceEntryService<E> {
    type Entry = E;

    async fn list(&self, location: &Location) -> Result<Vec<E>, DeviceError> {
        let xpath = self.xpath(location, None);
        let result = match self.client.get_config(&xpath).await {
            Ok(result) => result,
            // An ancestor that does not exist yet means an empty listing.
            Err(DeviceError::ObjectNotFound) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        // The device echoes the collection tag around the entries.
        let container = result
            .child(Self::collection_tag())
            .unwrap_or(&result);
        let version = self.client.version();
        container
            .children_named("entry")
            .map(|el| E::from_element(el, &version))
            .collect()
    }

    async fn read(&self, location: &Location, name: &str) -> Result<E, DeviceError> {
        let xpath = self.xpath(location, Some(name));
        let result = self.client.get_config(&xpath).await?;
        let entry = result
            .child("entry")
            .ok_or(DeviceError::ObjectNotFound)?;
        E::from_element(entry, &self.client.version())
    }

    async fn edit(&self, location: &Location, entry: &E) -> Result<(), DeviceError> {
        let xpath = self.xpath(location, Some(entry.name()));
        let element = self.serialize(entry);
        self.client.edit_config(&xpath, &element).await
    }

    async fn rename(
        &self,
        location: &Location,
        old_name: &str,
        new_name: &str,
    ) -> Result<(), DeviceError> {
        let xpath = self.xpath(location, Some(old_name));
        self.client.rename(&xpath, new_name).await
    }

    async fn delete(&self, location: &Location, name: &str) -> Result<(), DeviceError> {
        let xpath = self.xpath(location, Some(name));
        self.client.delete(&xpath).await
    }

    async fn apply_batch(
        &self,
        _location: &Location,
        ops: Vec<BatchOp>,
    ) -> Result<(), DeviceError> {
        self.client.multi_config(&ops).await
    }

    fn xpath(&self, location: &Location, name: Option<&str>) -> String {
        let quote = self.client.filter_quote();
        entry_xpath_quoted(
            &location.xpath_prefix_with(quote),
            E::SUFFIX,
            name,
            quote,
        )
    }

    fn serialize(&self, entry: &E) -> Element {
        entry.to_element(&self.client.version())
    }
}

/// CRUD discipline over an [`EntryService`].
pub struct EntryManager<S: EntryService> {
    service: S,
}

impl<S: EntryService> EntryManager<S> {
    /// Wraps a service.
    #[must_use]
    pub fn new(service: S) -> Self {
        Self { service }
    }

    /// The underlying service.
    #[must_use]
    pub fn service(&self) -> &S {
        &self.service
    }

    /// Creates an entry, failing when the name is already taken.
    ///
    /// Returns the device's canonical form of the entry (Read after
    /// write), so device-side defaulting is visible to the caller.
    ///
    /// # Errors
    ///
    /// [`DeviceError::Conflict`] when an entry of the same name exists
    /// at the location; transport and device errors verbatim.
    #[instrument(skip(self, entry), fields(name = entry.name()))]
    pub async fn create(
        &self,
        location: &Location,
        entry: &S::Entry,
    ) -> Result<S::Entry, DeviceError> {
        match self.service.read(location, entry.name()).await {
            Ok(_) => {
                return Err(DeviceError::Conflict {
                    name: entry.name().to_string(),
                });
            }
            Err(DeviceError::ObjectNotFound) => {}
            Err(e) => return Err(e),
        }
        self.service.edit(location, entry).await?;
        self.service.read(location, entry.name()).await
    }

    /// Reads an entry in its canonical, version-normalized form.
    ///
    /// # Errors
    ///
    /// [`DeviceError::ObjectNotFound`] when absent — the caller removes
    /// the resource from state.
    pub async fn read(&self, location: &Location, name: &str) -> Result<S::Entry, DeviceError> {
        self.service.read(location, name).await
    }

    /// Updates an entry, renaming it implicitly when `entry.name()`
    /// differs from `old_name`.
    ///
    /// Device-opaque fields are preserved by starting from the latest
    /// device read of the old entry.
    ///
    /// # Errors
    ///
    /// [`DeviceError::ObjectNotFound`] when the old entry is gone
    /// (surfaced, not recovered); [`DeviceError::Conflict`] when the new
    /// name is taken.
    #[instrument(skip(self, entry), fields(name = entry.name(), old_name))]
    pub async fn update(
        &self,
        location: &Location,
        entry: &S::Entry,
        old_name: &str,
    ) -> Result<S::Entry, DeviceError> {
        let live = self.service.read(location, old_name).await?;
        let mut merged = entry.clone();
        merged.copy_opaque_from(&live);

        if entry.name() != old_name {
            match self.service.read(location, entry.name()).await {
                Ok(_) => {
                    return Err(DeviceError::Conflict {
                        name: entry.name().to_string(),
                    });
                }
                Err(DeviceError::ObjectNotFound) => {}
                Err(e) => return Err(e),
            }
            debug!(old_name, new_name = entry.name(), "renaming entry");
            self.service.rename(location, old_name, entry.name()).await?;
        }

        self.service.edit(location, &merged).await?;
        self.service.read(location, merged.name()).await
    }

    /// Deletes entries by name. Absence of any of them is tolerated.
    ///
    /// # Errors
    ///
    /// Transport and device errors other than absence, verbatim.
    #[instrument(skip(self, names), fields(count = names.len()))]
    pub async fn delete(&self, location: &Location, names: &[String]) -> Result<(), DeviceError> {
        for name in names {
            match self.service.delete(location, name).await {
                Ok(()) | Err(DeviceError::ObjectNotFound) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}
