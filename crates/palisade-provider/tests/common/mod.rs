//! In-memory device client for resource shell tests.
//!
//! Entries live in per-collection vectors keyed by collection xpath;
//! imports, operational commands, and batches are recorded so tests can
//! assert exact request sequences.

// Each integration test binary compiles this module separately and
// uses a different subset of it.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use palisade_core::client::{DeviceClient, DeviceError, ImportRequest};
use palisade_core::version::ApiVersion;
use palisade_core::xmlapi::{BatchOp, Element};

/// One recorded import upload.
#[derive(Debug, Clone)]
pub struct RecordedImport {
    pub category: String,
    pub format: Option<String>,
    pub certificate_name: String,
    pub passphrase: Option<String>,
    pub target_tpl: Option<String>,
    pub target_tpl_vsys: Option<String>,
    pub file_name: String,
    pub content: Vec<u8>,
}

#[derive(Default)]
pub struct FakeDeviceClient {
    version: ApiVersion,
    /// collection xpath → entries in device order.
    store: Mutex<HashMap<String, Vec<Element>>>,
    pub imports: Mutex<Vec<RecordedImport>>,
    pub ops: Mutex<Vec<String>>,
    pub op_responses: Mutex<VecDeque<Element>>,
    pub batches: Mutex<Vec<Vec<BatchOp>>>,
}

impl FakeDeviceClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            version: ApiVersion::new(10, 1, 3),
            ..Self::default()
        })
    }

    /// Queues a canned `op` response.
    pub fn push_op_response(&self, element: Element) {
        self.op_responses.lock().unwrap().push_back(element);
    }

    pub fn entry_names(&self, collection: &str) -> Vec<String> {
        self.store
            .lock()
            .unwrap()
            .get(collection)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|e| e.attr("name").map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn split_entry_xpath(xpath: &str) -> Option<(String, String)> {
        let marker = "/entry[@name='";
        let at = xpath.rfind(marker)?;
        let name = xpath[at + marker.len()..].strip_suffix("']")?;
        Some((xpath[..at].to_string(), name.to_string()))
    }

    fn upsert(entries: &mut Vec<Element>, element: Element) {
        let name = element.attr("name").unwrap_or_default().to_string();
        match entries
            .iter_mut()
            .find(|e| e.attr("name") == Some(name.as_str()))
        {
            Some(existing) => *existing = element,
            None => entries.push(element),
        }
    }
}

#[async_trait]
impl DeviceClient for FakeDeviceClient {
    fn version(&self) -> ApiVersion {
        self.version
    }

    async fn get_config(&self, xpath: &str) -> Result<Element, DeviceError> {
        let store = self.store.lock().unwrap();
        if let Some((collection, name)) = Self::split_entry_xpath(xpath) {
            let entry = store
                .get(&collection)
                .and_then(|entries| {
                    entries
                        .iter()
                        .find(|e| e.attr("name") == Some(name.as_str()))
                })
                .cloned();
            let mut result = Element::new("result");
            if let Some(entry) = entry {
                result.push_child(entry);
            }
            return Ok(result);
        }

        let tag = xpath.rsplit('/').next().unwrap_or_default().to_string();
        let mut container = Element::new(tag);
        if let Some(entries) = store.get(xpath) {
            for entry in entries {
                container.push_child(entry.clone());
            }
        }
        Ok(Element::new("result").with_child(container))
    }

    async fn show_config(&self, xpath: &str) -> Result<Element, DeviceError> {
        self.get_config(xpath).await
    }

    async fn edit_config(&self, xpath: &str, element: &Element) -> Result<(), DeviceError> {
        let (collection, _name) =
            Self::split_entry_xpath(xpath).ok_or_else(|| DeviceError::Api {
                code: None,
                message: format!("edit requires an entry xpath, got {xpath}"),
            })?;
        let mut store = self.store.lock().unwrap();
        Self::upsert(store.entry(collection).or_default(), element.clone());
        Ok(())
    }

    async fn rename(&self, xpath: &str, new_name: &str) -> Result<(), DeviceError> {
        let (collection, old_name) =
            Self::split_entry_xpath(xpath).ok_or_else(|| DeviceError::Api {
                code: None,
                message: format!("rename requires an entry xpath, got {xpath}"),
            })?;
        let mut store = self.store.lock().unwrap();
        let entries = store.entry(collection).or_default();
        if entries.iter().any(|e| e.attr("name") == Some(new_name)) {
            return Err(DeviceError::Conflict {
                name: new_name.to_string(),
            });
        }
        let entry = entries
            .iter_mut()
            .find(|e| e.attr("name") == Some(old_name.as_str()))
            .ok_or(DeviceError::ObjectNotFound)?;
        for (key, value) in &mut entry.attrs {
            if key == "name" {
                *value = new_name.to_string();
            }
        }
        Ok(())
    }

    async fn delete(&self, xpath: &str) -> Result<(), DeviceError> {
        let Some((collection, name)) = Self::split_entry_xpath(xpath) else {
            self.store.lock().unwrap().remove(xpath);
            return Ok(());
        };
        if let Some(entries) = self.store.lock().unwrap().get_mut(&collection) {
            entries.retain(|e| e.attr("name") != Some(name.as_str()));
        }
        Ok(())
    }

    async fn multi_config(&self, ops: &[BatchOp]) -> Result<(), DeviceError> {
        for op in ops {
            match op {
                BatchOp::Edit { xpath, element } => self.edit_config(xpath, element).await?,
                BatchOp::Rename { xpath, new_name } => self.rename(xpath, new_name).await?,
                BatchOp::Delete { xpath } => self.delete(xpath).await?,
            }
        }
        self.batches.lock().unwrap().push(ops.to_vec());
        Ok(())
    }

    async fn import_file(&self, request: &ImportRequest) -> Result<(), DeviceError> {
        self.imports.lock().unwrap().push(RecordedImport {
            category: request.category.as_str().to_string(),
            format: request.format.clone(),
            certificate_name: request.certificate_name.clone(),
            passphrase: request
                .passphrase
                .as_ref()
                .map(|p| p.expose_secret().to_string()),
            target_tpl: request.target_tpl.clone(),
            target_tpl_vsys: request.target_tpl_vsys.clone(),
            file_name: request.file_name.clone(),
            content: request.content.clone(),
        });

        // Materialize what a later `get` would expose about the
        // certificate, so read-back in the shell works.
        if request.category.as_str() == "certificate" {
            let public_key = match request.format.as_deref() {
                Some("pkcs12") => "(pkcs12 material)".to_string(),
                _ => String::from_utf8_lossy(&request.content).into_owned(),
            };
            let entry = Element::new("entry")
                .with_attr("name", request.certificate_name.clone())
                .with_child(Element::new("public-key").with_text(public_key))
                .with_child(Element::new("algorithm").with_text("RSA"))
                .with_child(Element::new("common-name").with_text("example.com"));
            let mut store = self.store.lock().unwrap();
            // Imports land wherever the matching location's certificate
            // collection lives; the tests always use one location, so a
            // single well-known key keeps the fake simple.
            Self::upsert(store.entry(certificate_collection()).or_default(), entry);
        }
        Ok(())
    }

    async fn op(&self, command: &Element) -> Result<Element, DeviceError> {
        self.ops.lock().unwrap().push(command.to_xml());
        Ok(self
            .op_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Element::new("result")))
    }

    async fn generate_api_key(
        &self,
        _username: &str,
        _password: &SecretString,
    ) -> Result<SecretString, DeviceError> {
        Ok(SecretString::from("fake-api-key".to_string()))
    }
}

/// Where certificate imports land in the fake store. The certificate
/// tests use the template location `edge`.
pub fn certificate_collection() -> String {
    "/config/devices/entry[@name='localhost.localdomain']/template/entry[@name='edge']\
     /config/shared/certificate"
        .to_string()
}
