//! In-memory keyed store

use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::errors::StorageError;
use super::filters::RecordFilter;
use super::traits::{KeyedStore, Record, validate_key};

/// Keyed store backed by an ordered map.
///
/// Every operation holds the map lock for its whole duration, which makes
/// single-key operations atomic. Records are matched against filters through
/// their JSON form, the same shape database backends see.
#[derive(Debug)]
pub struct InMemoryStore<R: Record> {
    records: RwLock<BTreeMap<String, R>>,
}

impl<R: Record> InMemoryStore<R> {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of records currently held
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

impl<R: Record> Default for InMemoryStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

fn matches<R: Record>(filter: &RecordFilter, record: &R) -> Result<bool, StorageError> {
    if matches!(filter, RecordFilter::All) {
        return Ok(true);
    }
    let doc = serde_json::to_value(record)?;
    Ok(filter.matches(&doc))
}

#[async_trait]
impl<R: Record> KeyedStore<R> for InMemoryStore<R> {
    async fn insert(&self, key: &str, record: R) -> Result<R, StorageError> {
        validate_key(key)?;
        let mut records = self.records.write().await;
        if records.contains_key(key) {
            return Err(StorageError::AlreadyExists(format!(
                "{} with key {} already exists",
                R::COLLECTION,
                key
            )));
        }
        records.insert(key.to_string(), record.clone());
        Ok(record)
    }

    async fn get(&self, key: &str) -> Result<Option<R>, StorageError> {
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn upsert(&self, key: &str, record: R) -> Result<Option<R>, StorageError> {
        validate_key(key)?;
        Ok(self.records.write().await.insert(key.to_string(), record))
    }

    async fn remove(&self, key: &str) -> Result<Option<R>, StorageError> {
        Ok(self.records.write().await.remove(key))
    }

    async fn list(&self, filter: &RecordFilter) -> Result<Vec<R>, StorageError> {
        filter.validate()?;
        let records = self.records.read().await;
        let mut result = Vec::new();
        for record in records.values() {
            if matches(filter, record)? {
                result.push(record.clone());
            }
        }
        Ok(result)
    }

    async fn remove_where(&self, filter: &RecordFilter) -> Result<usize, StorageError> {
        filter.validate()?;
        let mut records = self.records.write().await;
        let mut doomed = Vec::new();
        for (key, record) in records.iter() {
            if matches(filter, record)? {
                doomed.push(key.clone());
            }
        }
        for key in &doomed {
            records.remove(key);
        }
        Ok(doomed.len())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.records.write().await.clear();
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, StorageError> {
        Ok(true)
    }
}
