use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use wgr_schemas::{DeficitRecord, SettledEntry, Wager};

use crate::{Collection, RecordStore, StoreError};

/// Typed view of the three ledger collections over any [`RecordStore`].
#[derive(Clone)]
pub struct LedgerStore {
    inner: Arc<dyn RecordStore>,
}

impl LedgerStore {
    pub fn new(inner: Arc<dyn RecordStore>) -> Self {
        Self { inner }
    }

    pub fn pending(&self) -> Result<Vec<Wager>, StoreError> {
        self.load(Collection::PendingWagers)
    }

    pub fn settled(&self) -> Result<Vec<SettledEntry>, StoreError> {
        self.load(Collection::SettledEntries)
    }

    pub fn deficits(&self) -> Result<Vec<DeficitRecord>, StoreError> {
        self.load(Collection::Deficits)
    }

    pub fn replace_pending(&self, records: &[Wager]) -> Result<(), StoreError> {
        self.inner
            .replace_all(Collection::PendingWagers, encode(Collection::PendingWagers, records)?)
    }

    pub fn append_pending(&self, records: &[Wager]) -> Result<(), StoreError> {
        self.inner
            .append(Collection::PendingWagers, encode(Collection::PendingWagers, records)?)
    }

    pub fn append_settled(&self, records: &[SettledEntry]) -> Result<(), StoreError> {
        self.inner
            .append(Collection::SettledEntries, encode(Collection::SettledEntries, records)?)
    }

    pub fn replace_settled(&self, records: &[SettledEntry]) -> Result<(), StoreError> {
        self.inner.replace_all(
            Collection::SettledEntries,
            encode(Collection::SettledEntries, records)?,
        )
    }

    pub fn append_deficits(&self, records: &[DeficitRecord]) -> Result<(), StoreError> {
        self.inner
            .append(Collection::Deficits, encode(Collection::Deficits, records)?)
    }

    pub fn replace_deficits(&self, records: &[DeficitRecord]) -> Result<(), StoreError> {
        self.inner
            .replace_all(Collection::Deficits, encode(Collection::Deficits, records)?)
    }

    fn load<T: DeserializeOwned>(&self, collection: Collection) -> Result<Vec<T>, StoreError> {
        self.inner
            .read_all(collection)?
            .into_iter()
            .enumerate()
            .map(|(i, v)| {
                serde_json::from_value(v)
                    .map_err(|e| StoreError::corrupt(collection, format!("record {i}: {e}")))
            })
            .collect()
    }
}

fn encode<T: Serialize>(collection: Collection, records: &[T]) -> Result<Vec<Value>, StoreError> {
    records
        .iter()
        .map(|r| {
            serde_json::to_value(r).map_err(|e| StoreError::Encode {
                collection,
                detail: e.to_string(),
            })
        })
        .collect()
}
