use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use serde_json::Value;
use tracing::{debug, error};

use crate::{Collection, RecordStore, StoreError};

/// One JSON array file per collection under `dir`.
///
/// All file access goes through one mutex, and every write lands in a sibling
/// temp file that is renamed over the target, so a reader never sees a torn
/// collection.
#[derive(Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
    io: Mutex<()>,
}

impl JsonFileStore {
    /// Open (creating if needed) the data directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self {
            dir,
            io: Mutex::new(()),
        })
    }

    pub fn path_of(&self, collection: Collection) -> PathBuf {
        self.dir.join(collection.file_name())
    }

    fn read_locked(&self, collection: Collection) -> Result<Vec<Value>, StoreError> {
        let path = self.path_of(collection);
        if !path.exists() {
            debug!(collection = %collection, "initialising missing collection");
            self.write_locked(collection, &[])?;
            return Ok(Vec::new());
        }

        let bytes = fs::read(&path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        let parsed: Value = serde_json::from_slice(&bytes).map_err(|e| {
            error!(collection = %collection, path = %path.display(), "collection does not parse");
            StoreError::corrupt(collection, e.to_string())
        })?;
        match parsed {
            Value::Array(records) => Ok(records),
            _ => {
                error!(collection = %collection, path = %path.display(), "collection is not an array");
                Err(StoreError::corrupt(collection, "expected a JSON array"))
            }
        }
    }

    fn write_locked(&self, collection: Collection, records: &[Value]) -> Result<(), StoreError> {
        let path = self.path_of(collection);
        let tmp = path.with_extension("json.tmp");

        let body = serde_json::to_vec_pretty(records).map_err(|e| StoreError::Encode {
            collection,
            detail: e.to_string(),
        })?;

        let io_err = |source| StoreError::Io {
            path: tmp.clone(),
            source,
        };
        let mut f = fs::File::create(&tmp).map_err(io_err)?;
        f.write_all(&body).map_err(io_err)?;
        f.sync_all().map_err(io_err)?;
        drop(f);

        fs::rename(&tmp, &path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })
    }
}

impl RecordStore for JsonFileStore {
    fn read_all(&self, collection: Collection) -> Result<Vec<Value>, StoreError> {
        let _guard = self.io.lock().unwrap_or_else(|p| p.into_inner());
        self.read_locked(collection)
    }

    fn replace_all(&self, collection: Collection, records: Vec<Value>) -> Result<(), StoreError> {
        let _guard = self.io.lock().unwrap_or_else(|p| p.into_inner());
        self.write_locked(collection, &records)
    }

    fn append(&self, collection: Collection, records: Vec<Value>) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }
        let _guard = self.io.lock().unwrap_or_else(|p| p.into_inner());
        let mut all = self.read_locked(collection)?;
        all.extend(records);
        self.write_locked(collection, &all)
    }

    fn delete_where(
        &self,
        collection: Collection,
        pred: &dyn Fn(&Value) -> bool,
    ) -> Result<usize, StoreError> {
        let _guard = self.io.lock().unwrap_or_else(|p| p.into_inner());
        let all = self.read_locked(collection)?;
        let before = all.len();
        let kept: Vec<Value> = all.into_iter().filter(|v| !pred(v)).collect();
        let removed = before - kept.len();
        if removed > 0 {
            self.write_locked(collection, &kept)?;
        }
        Ok(removed)
    }
}
