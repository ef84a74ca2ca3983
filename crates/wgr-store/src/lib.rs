//! wgr-store
//!
//! Record store seam for the three ledger collections.
//!
//! - `RecordStore` is untyped (`serde_json::Value` records) and object-safe so
//!   a transactional backend can replace the file store without touching the
//!   engine.
//! - `JsonFileStore` keeps one pretty-printed JSON array per collection.
//! - `MemoryStore` backs tests.
//! - `LedgerStore` decodes records into `wgr-schemas` types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

mod file;
mod ledger;
mod memory;

pub use file::JsonFileStore;
pub use ledger::LedgerStore;
pub use memory::MemoryStore;

// ---------------------------------------------------------------------------
// Collections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Collection {
    PendingWagers,
    SettledEntries,
    Deficits,
}

impl Collection {
    /// File name under the data directory. Names match the files written by
    /// earlier versions of the ledger.
    pub fn file_name(&self) -> &'static str {
        match self {
            Collection::PendingWagers => "pendingWagers.json",
            Collection::SettledEntries => "settledWagers.json",
            Collection::Deficits => "deficits.json",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::PendingWagers => "PendingWagers",
            Collection::SettledEntries => "SettledEntries",
            Collection::Deficits => "Deficits",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum StoreError {
    /// A collection exists but does not parse (or a record does not decode).
    /// Never repaired automatically.
    Corrupt { collection: Collection, detail: String },
    /// Records could not be encoded for writing.
    Encode { collection: Collection, detail: String },
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl StoreError {
    pub fn corrupt(collection: Collection, detail: impl Into<String>) -> Self {
        Self::Corrupt {
            collection,
            detail: detail.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Corrupt { .. } => "store_corrupt",
            Self::Encode { .. } => "store_encode",
            Self::Io { .. } => "store_io",
        }
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Corrupt { collection, detail } => {
                write!(f, "collection {collection} is corrupt: {detail}")
            }
            Self::Encode { collection, detail } => {
                write!(f, "cannot encode {collection} records: {detail}")
            }
            Self::Io { path, source } => write!(f, "store io on {}: {source}", path.display()),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// RecordStore
// ---------------------------------------------------------------------------

/// Durable named collections of flat JSON records.
///
/// Each call is individually consistent; nothing spans calls. Callers that
/// read-modify-write must serialize themselves.
pub trait RecordStore: Send + Sync {
    /// Every record in collection order. A collection that was never written
    /// reads as empty.
    fn read_all(&self, collection: Collection) -> Result<Vec<Value>, StoreError>;

    fn replace_all(&self, collection: Collection, records: Vec<Value>) -> Result<(), StoreError>;

    fn append(&self, collection: Collection, records: Vec<Value>) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }
        let mut all = self.read_all(collection)?;
        all.extend(records);
        self.replace_all(collection, all)
    }

    /// Remove matching records; returns how many were removed.
    fn delete_where(
        &self,
        collection: Collection,
        pred: &dyn Fn(&Value) -> bool,
    ) -> Result<usize, StoreError> {
        let all = self.read_all(collection)?;
        let before = all.len();
        let kept: Vec<Value> = all.into_iter().filter(|v| !pred(v)).collect();
        let removed = before - kept.len();
        if removed > 0 {
            self.replace_all(collection, kept)?;
        }
        Ok(removed)
    }
}
