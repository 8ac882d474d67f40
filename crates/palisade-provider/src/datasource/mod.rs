//! Data sources: read-only listings and lookups.
//!
//! Data sources work in both provider modes. Connected, they read the
//! device's candidate config; in inspection mode they answer from the
//! configured local document (`ListFromConfig` / `ReadFromConfig`
//! semantics). Unlike resources, data sources accept the read-only
//! `from_panorama_*` location variants.

use palisade_core::client::DeviceError;
use palisade_core::ledger::EncryptedValues;
use palisade_core::location::{Location, LocationModel};
use palisade_core::manager::{DeviceEntryService, EntryObject, EntryService};
use palisade_core::version::ApiVersion;

use crate::provider::Provider;
use crate::resources::address::{AddressEntry, AddressModel};
use crate::resources::{EntryModel, ResourceError};

fn entries_from_source<E: EntryObject>(
    provider: &Provider,
    location: &Location,
) -> Option<Result<Vec<E>, ResourceError>> {
    let local = provider.local_config()?;
    let version = ApiVersion::default();
    let parsed: Result<Vec<E>, DeviceError> = local
        .entries(location, E::SUFFIX)
        .iter()
        .map(|el| E::from_element(el, &version))
        .collect();
    Some(parsed.map_err(ResourceError::from))
}

async fn list_entries<E: EntryObject>(
    provider: &Provider,
    location: &Location,
) -> Result<Vec<E>, ResourceError> {
    if let Ok(client) = provider.connected() {
        let service = DeviceEntryService::<E>::new(client.clone());
        return Ok(service.list(location).await?);
    }
    entries_from_source(provider, location).ok_or(ResourceError::InvalidMode)?
}

/// Lists all addresses at a location.
///
/// # Errors
///
/// [`ResourceError::InvalidMode`] when neither a device nor a local
/// config document is available; location and device errors verbatim.
pub async fn list_addresses(
    provider: &Provider,
    location: &LocationModel,
) -> Result<Vec<AddressModel>, ResourceError> {
    let location = location.resolve()?;
    let entries: Vec<AddressEntry> = list_entries(provider, &location).await?;

    let values = EncryptedValues::new();
    let mut models = Vec::with_capacity(entries.len());
    for entry in &entries {
        let mut model = AddressModel::default();
        model.copy_from_entry(entry, &values)?;
        model.location = LocationModel::from(&location);
        models.push(model);
    }
    Ok(models)
}

/// Reads one address by name. `Ok(None)` when absent.
///
/// # Errors
///
/// See [`list_addresses`].
pub async fn read_address(
    provider: &Provider,
    location: &LocationModel,
    name: &str,
) -> Result<Option<AddressModel>, ResourceError> {
    let location = location.resolve()?;

    let entry: Option<AddressEntry> = if let Ok(client) = provider.connected() {
        let service = DeviceEntryService::<AddressEntry>::new(client.clone());
        match service.read(&location, name).await {
            Ok(entry) => Some(entry),
            Err(DeviceError::ObjectNotFound) => None,
            Err(e) => return Err(e.into()),
        }
    } else {
        let local = provider.local_config().ok_or(ResourceError::InvalidMode)?;
        match local.entry(&location, AddressEntry::SUFFIX, name) {
            Some(el) => Some(AddressEntry::from_element(&el, &ApiVersion::default())?),
            None => None,
        }
    };

    let Some(entry) = entry else {
        return Ok(None);
    };
    let mut model = AddressModel::default();
    model.copy_from_entry(&entry, &EncryptedValues::new())?;
    model.location = LocationModel::from(&location);
    Ok(Some(model))
}

#[cfg(test)]
mod tests {
    use palisade_core::client::LocalConfig;
    use palisade_core::location::{FromPanoramaVsysModel, VsysModel};

    use super::*;

    const SAVED: &str = "\
<config>\
  <devices><entry name=\"localhost.localdomain\"><vsys><entry name=\"vsys1\">\
    <address>\
      <entry name=\"web-1\"><ip-netmask>10.1.0.1/32</ip-netmask></entry>\
      <entry name=\"db-1\"><fqdn>db.example.com</fqdn></entry>\
    </address>\
  </entry></vsys></entry></devices>\
  <panorama><vsys><entry name=\"vsys1\">\
    <address><entry name=\"pushed\"><ip-netmask>10.9.0.0/24</ip-netmask></entry></address>\
  </entry></vsys></panorama>\
</config>";

    fn inspection_provider() -> Provider {
        Provider::inspection(Some(LocalConfig::from_xml(SAVED).expect("config")))
    }

    fn vsys_location() -> LocationModel {
        LocationModel {
            vsys: Some(VsysModel::default()),
            ..LocationModel::default()
        }
    }

    #[tokio::test]
    async fn test_list_from_config() {
        let provider = inspection_provider();
        let models = list_addresses(&provider, &vsys_location())
            .await
            .expect("list");
        let names: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["web-1", "db-1"]);
        assert_eq!(models[0].ip_netmask.as_deref(), Some("10.1.0.1/32"));
    }

    #[tokio::test]
    async fn test_read_from_config() {
        let provider = inspection_provider();
        let model = read_address(&provider, &vsys_location(), "db-1")
            .await
            .expect("read")
            .expect("present");
        assert_eq!(model.fqdn.as_deref(), Some("db.example.com"));

        let absent = read_address(&provider, &vsys_location(), "nope")
            .await
            .expect("read");
        assert!(absent.is_none());
    }

    #[tokio::test]
    async fn test_from_panorama_location_is_readable() {
        let provider = inspection_provider();
        let location = LocationModel {
            from_panorama_vsys: Some(FromPanoramaVsysModel::default()),
            ..LocationModel::default()
        };
        let models = list_addresses(&provider, &location).await.expect("list");
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].name, "pushed");
    }

    #[tokio::test]
    async fn test_inspection_without_config_is_invalid_mode() {
        let provider = Provider::inspection(None);
        let err = list_addresses(&provider, &vsys_location())
            .await
            .unwrap_err();
        assert!(matches!(err, ResourceError::InvalidMode));
    }
}
