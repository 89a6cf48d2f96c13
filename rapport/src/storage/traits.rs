//! Trait definitions for keyed state stores

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::Debug;

use crate::storage::errors::StorageError;
use crate::storage::filters::RecordFilter;

/// A value that can live in a keyed store.
///
/// The collection name doubles as the table name for database backends, so
/// it must be a plain identifier.
pub trait Record: Serialize + DeserializeOwned + Clone + Debug + Send + Sync + 'static {
    /// Name of the collection records of this type are stored in
    const COLLECTION: &'static str;
}

/// Durable mapping from a key to a small record.
///
/// Every concept owns one store per record type. Implementations must make
/// each single-key operation atomic; in particular among concurrent `remove`
/// calls on the same key exactly one observes the removed record, which
/// callers use as a compare-and-delete primitive.
#[async_trait]
pub trait KeyedStore<R: Record>: Send + Sync + Debug + 'static {
    /// Create a record; fails with `AlreadyExists` if the key is live
    async fn insert(&self, key: &str, record: R) -> Result<R, StorageError>;

    /// Get a record by key
    async fn get(&self, key: &str) -> Result<Option<R>, StorageError>;

    /// Create or replace a record, returning the previous value
    async fn upsert(&self, key: &str, record: R) -> Result<Option<R>, StorageError>;

    /// Remove a record, returning it if it was present
    async fn remove(&self, key: &str) -> Result<Option<R>, StorageError>;

    /// Snapshot of every record matching the filter
    async fn list(&self, filter: &RecordFilter) -> Result<Vec<R>, StorageError>;

    /// Remove every record matching the filter, returning how many were removed
    async fn remove_where(&self, filter: &RecordFilter) -> Result<usize, StorageError>;

    /// Count records matching the filter
    async fn count(&self, filter: &RecordFilter) -> Result<usize, StorageError> {
        Ok(self.list(filter).await?.len())
    }

    /// Check whether a key is live
    async fn contains(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.get(key).await?.is_some())
    }

    /// Remove every record in the collection
    async fn clear(&self) -> Result<(), StorageError> {
        self.remove_where(&RecordFilter::All).await.map(|_| ())
    }

    /// Check if the store is healthy and available
    async fn health_check(&self) -> Result<bool, StorageError>;
}

/// Build a composite key from its parts.
///
/// Parts are joined with `:`. Only the last part may itself contain `:`,
/// otherwise two different part lists can produce the same key.
pub fn store_key<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    parts
        .into_iter()
        .map(|p| p.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(":")
}

/// Reject empty keys
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    if key.trim().is_empty() {
        return Err(StorageError::Validation("Key cannot be empty".to_string()));
    }
    Ok(())
}
