//! Record stores - where experiment records live once written
//!
//! The [`RecordStore`] trait is the seam between the runner and storage.
//! [`MemoryStore`] keeps records in process; the file-backed
//! [`ResultsContainer`](crate::container::ResultsContainer) persists them.

use rustc_hash::FxHashMap;
use uuid::Uuid;

use super::ExperimentRecord;
use crate::{Error, Result};

/// Append-only storage for experiment records.
///
/// Implementations must never overwrite an existing record: inserting an id
/// that is already present fails with [`Error::DuplicateRecord`], and a
/// failed insert leaves the store unchanged.
pub trait RecordStore {
    /// Persist a record and return its identifier.
    ///
    /// # Errors
    ///
    /// `DuplicateRecord` if the id exists, or a storage error.
    fn insert(&mut self, record: ExperimentRecord) -> Result<Uuid>;

    /// Load a record by identifier.
    ///
    /// # Errors
    ///
    /// `NotFound` if no record has this id.
    fn get(&self, record_id: Uuid) -> Result<ExperimentRecord>;

    /// Identifiers of all records, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    fn ids(&self) -> Result<Vec<Uuid>>;

    /// Check whether a record exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    fn contains(&self, record_id: Uuid) -> Result<bool> {
        match self.get(record_id) {
            Ok(_) => Ok(true),
            Err(Error::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Number of records.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    fn len(&self) -> Result<usize> {
        Ok(self.ids()?.len())
    }

    /// Check if the store holds no records.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

/// In-memory record store.
///
/// Uses a hash map for O(1) lookups by id, plus an insertion-ordered id list.
/// Data is lost when the store is dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: FxHashMap<Uuid, ExperimentRecord>,
    order: Vec<Uuid>,
}

impl MemoryStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Borrow a record without cloning it.
    #[must_use]
    pub fn record(&self, record_id: Uuid) -> Option<&ExperimentRecord> {
        self.records.get(&record_id)
    }

    /// Get all records with the given experiment name, in insertion order.
    #[must_use]
    pub fn records_named(&self, name: &str) -> Vec<&ExperimentRecord> {
        self.order
            .iter()
            .filter_map(|id| self.records.get(id))
            .filter(|record| record.name() == name)
            .collect()
    }
}

impl RecordStore for MemoryStore {
    fn insert(&mut self, record: ExperimentRecord) -> Result<Uuid> {
        let record_id = record.record_id();
        if self.records.contains_key(&record_id) {
            return Err(Error::DuplicateRecord(record_id.to_string()));
        }
        self.records.insert(record_id, record);
        self.order.push(record_id);
        Ok(record_id)
    }

    fn get(&self, record_id: Uuid) -> Result<ExperimentRecord> {
        self.records
            .get(&record_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("record {record_id}")))
    }

    fn ids(&self) -> Result<Vec<Uuid>> {
        Ok(self.order.clone())
    }

    fn contains(&self, record_id: Uuid) -> Result<bool> {
        Ok(self.records.contains_key(&record_id))
    }

    fn len(&self) -> Result<usize> {
        Ok(self.order.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiment::{RunRecord, RunStatus};

    fn record(name: &str) -> ExperimentRecord {
        let mut run = RunRecord::new();
        run.start();
        run.complete(RunStatus::Success);
        ExperimentRecord::builder(name, serde_json::json!({"n": 1}))
            .run(run)
            .build()
            .unwrap()
    }

    #[test]
    fn test_store_default() {
        let store = MemoryStore::new();
        assert!(store.is_empty().unwrap());
        assert_eq!(store.len().unwrap(), 0);
    }

    #[test]
    fn test_store_insert_and_get() {
        let mut store = MemoryStore::new();
        let original = record("exp");
        let id = store.insert(original.clone()).unwrap();

        assert!(store.contains(id).unwrap());
        assert_eq!(store.get(id).unwrap(), original);
        assert_eq!(store.ids().unwrap(), vec![id]);
    }

    #[test]
    fn test_store_rejects_duplicate() {
        let mut store = MemoryStore::new();
        let original = record("exp");
        store.insert(original.clone()).unwrap();

        let result = store.insert(original);
        assert!(matches!(result, Err(Error::DuplicateRecord(_))));
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_store_get_missing() {
        let store = MemoryStore::new();
        let result = store.get(Uuid::new_v4());
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_records_named_preserves_order() {
        let mut store = MemoryStore::new();
        let a = store.insert(record("a")).unwrap();
        store.insert(record("b")).unwrap();
        let c = store.insert(record("a")).unwrap();

        let named: Vec<Uuid> = store
            .records_named("a")
            .iter()
            .map(|r| r.record_id())
            .collect();
        assert_eq!(named, vec![a, c]);
    }
}
