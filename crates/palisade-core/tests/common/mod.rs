//! In-memory entry service used by the manager and reconciler
//! integration tests.
//!
//! The store behaves like a device collection: ordered entries, UUIDs
//! assigned at creation and preserved across rename, batches applied
//! in declared order.

// Each integration test binary compiles this module separately and
// uses a different subset of it.
#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use palisade_core::client::DeviceError;
use palisade_core::location::Location;
use palisade_core::manager::{EntryObject, EntryService};
use palisade_core::version::ApiVersion;
use palisade_core::xmlapi::{BatchOp, Element, entry_xpath};

/// A minimal device entry: name, one comparable field, a device-opaque
/// UUID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestEntry {
    pub name: String,
    pub value: String,
    pub uuid: Option<String>,
}

impl TestEntry {
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            uuid: None,
        }
    }
}

impl EntryObject for TestEntry {
    const SUFFIX: &'static [&'static str] = &["test"];

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn to_element(&self, _version: &ApiVersion) -> Element {
        let mut el = Element::new("entry").with_attr("name", self.name.clone());
        if let Some(uuid) = &self.uuid {
            el = el.with_attr("uuid", uuid.clone());
        }
        el.with_child(Element::new("value").with_text(self.value.clone()))
    }

    fn from_element(element: &Element, _version: &ApiVersion) -> Result<Self, DeviceError> {
        Ok(Self {
            name: element.attr("name").unwrap_or_default().to_string(),
            value: element.child_text("value").unwrap_or_default(),
            uuid: element.attr("uuid").map(str::to_string),
        })
    }

    fn specs_match(&self, other: &Self) -> bool {
        self.value == other.value
    }

    fn copy_opaque_from(&mut self, live: &Self) {
        if self.uuid.is_none() {
            self.uuid = live.uuid.clone();
        }
    }
}

/// Ordered in-memory store with batch recording.
#[derive(Default)]
pub struct MemoryService {
    entries: Mutex<Vec<TestEntry>>,
    uuid_counter: AtomicU64,
    /// Every batch passed to `apply_batch`, in order.
    pub batches: Mutex<Vec<Vec<BatchOp>>>,
}

impl MemoryService {
    pub fn with_entries(seed: &[(&str, &str)]) -> Self {
        let service = Self::default();
        {
            let mut entries = service.entries.lock().unwrap();
            for (name, value) in seed {
                let mut entry = TestEntry::new(name, value);
                entry.uuid = Some(service.next_uuid());
                entries.push(entry);
            }
        }
        service
    }

    fn next_uuid(&self) -> String {
        format!("uuid-{}", self.uuid_counter.fetch_add(1, Ordering::Relaxed))
    }

    pub fn names(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.name.clone())
            .collect()
    }

    pub fn batch_count(&self) -> usize {
        self.batches.lock().unwrap().len()
    }

    fn upsert(entries: &mut Vec<TestEntry>, mut entry: TestEntry, fresh_uuid: String) {
        if let Some(existing) = entries.iter_mut().find(|e| e.name == entry.name) {
            if entry.uuid.is_none() {
                entry.uuid = existing.uuid.clone();
            }
            *existing = entry;
        } else {
            if entry.uuid.is_none() {
                entry.uuid = Some(fresh_uuid);
            }
            entries.push(entry);
        }
    }

    fn name_from_xpath(xpath: &str) -> String {
        // Xpaths here come from `EntryService::xpath`, always ending in
        // entry[@name='…'].
        let start = xpath.rfind("@name='").expect("entry xpath") + "@name='".len();
        let end = xpath[start..].find('\'').expect("closing quote") + start;
        xpath[start..end].to_string()
    }
}

#[async_trait]
impl EntryService for MemoryService {
    type Entry = TestEntry;

    async fn list(&self, _location: &Location) -> Result<Vec<TestEntry>, DeviceError> {
        Ok(self.entries.lock().unwrap().clone())
    }

    async fn read(&self, _location: &Location, name: &str) -> Result<TestEntry, DeviceError> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.name == name)
            .cloned()
            .ok_or(DeviceError::ObjectNotFound)
    }

    async fn edit(&self, _location: &Location, entry: &TestEntry) -> Result<(), DeviceError> {
        let uuid = self.next_uuid();
        let mut entries = self.entries.lock().unwrap();
        Self::upsert(&mut entries, entry.clone(), uuid);
        Ok(())
    }

    async fn rename(
        &self,
        _location: &Location,
        old_name: &str,
        new_name: &str,
    ) -> Result<(), DeviceError> {
        let mut entries = self.entries.lock().unwrap();
        if entries.iter().any(|e| e.name == new_name) {
            return Err(DeviceError::Conflict {
                name: new_name.to_string(),
            });
        }
        let entry = entries
            .iter_mut()
            .find(|e| e.name == old_name)
            .ok_or(DeviceError::ObjectNotFound)?;
        entry.name = new_name.to_string();
        Ok(())
    }

    async fn delete(&self, _location: &Location, name: &str) -> Result<(), DeviceError> {
        self.entries.lock().unwrap().retain(|e| e.name != name);
        Ok(())
    }

    async fn apply_batch(
        &self,
        _location: &Location,
        ops: Vec<BatchOp>,
    ) -> Result<(), DeviceError> {
        {
            let mut entries = self.entries.lock().unwrap();
            for op in &ops {
                match op {
                    BatchOp::Edit { element, .. } => {
                        let entry = TestEntry::from_element(element, &ApiVersion::default())?;
                        let uuid = self.next_uuid();
                        Self::upsert(&mut entries, entry, uuid);
                    }
                    BatchOp::Rename { xpath, new_name } => {
                        let old_name = Self::name_from_xpath(xpath);
                        if entries.iter().any(|e| e.name == *new_name) {
                            return Err(DeviceError::Conflict {
                                name: new_name.clone(),
                            });
                        }
                        let entry = entries
                            .iter_mut()
                            .find(|e| e.name == old_name)
                            .ok_or(DeviceError::ObjectNotFound)?;
                        entry.name = new_name.clone();
                    }
                    BatchOp::Delete { xpath } => {
                        let name = Self::name_from_xpath(xpath);
                        entries.retain(|e| e.name != name);
                    }
                }
            }
        }
        self.batches.lock().unwrap().push(ops);
        Ok(())
    }

    fn xpath(&self, location: &Location, name: Option<&str>) -> String {
        entry_xpath(&location.xpath_prefix(), TestEntry::SUFFIX, name)
    }

    fn serialize(&self, entry: &TestEntry) -> Element {
        entry.to_element(&ApiVersion::default())
    }
}

/// The location shared by all integration tests.
pub fn shared() -> Location {
    Location::Shared(true)
}
