use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use serde_json::Value;

use crate::{Collection, RecordStore, StoreError};

/// In-process store for tests.
///
/// `fail_writes_to` makes every later write to one collection fail with an IO
/// error, which is how tests simulate a crash between two writes.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<Collection, Vec<Value>>>,
    failing: Mutex<Option<Collection>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes_to(&self, collection: Collection) {
        *self.failing.lock().unwrap_or_else(|p| p.into_inner()) = Some(collection);
    }

    pub fn heal(&self) {
        *self.failing.lock().unwrap_or_else(|p| p.into_inner()) = None;
    }

    fn check_writable(&self, collection: Collection) -> Result<(), StoreError> {
        let failing = *self.failing.lock().unwrap_or_else(|p| p.into_inner());
        if failing == Some(collection) {
            return Err(StoreError::Io {
                path: PathBuf::from(collection.file_name()),
                source: std::io::Error::new(std::io::ErrorKind::Other, "injected write failure"),
            });
        }
        Ok(())
    }
}

impl RecordStore for MemoryStore {
    fn read_all(&self, collection: Collection) -> Result<Vec<Value>, StoreError> {
        let map = self.collections.lock().unwrap_or_else(|p| p.into_inner());
        Ok(map.get(&collection).cloned().unwrap_or_default())
    }

    fn replace_all(&self, collection: Collection, records: Vec<Value>) -> Result<(), StoreError> {
        self.check_writable(collection)?;
        let mut map = self.collections.lock().unwrap_or_else(|p| p.into_inner());
        map.insert(collection, records);
        Ok(())
    }
}
