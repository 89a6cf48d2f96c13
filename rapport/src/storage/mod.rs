//! Storage abstractions and implementations
//!
//! Every concept keeps its state in one or more [`KeyedStore`]s, a small
//! async key/record interface with create-if-absent, compare-and-delete and
//! filtered listing.
//!
//! ## Storage Implementations
//!
//! - **Memory**: ordered in-memory map, used for tests and ephemeral servers
//! - **SurrealDB**: embedded SurrealDB (in-memory or RocksDB on disk), one
//!   table per record type

pub mod config;
pub mod errors;
pub mod filters;
pub mod locks;
pub mod memory;
#[cfg(feature = "surrealdb-embedded")]
pub mod surreal;
pub mod traits;

use std::sync::Arc;

pub use errors::{StorageError, StorageResult};
pub use filters::RecordFilter;
pub use locks::KeyLocks;
pub use memory::InMemoryStore;
#[cfg(feature = "surrealdb-embedded")]
pub use surreal::SurrealStore;
pub use traits::{KeyedStore, Record, store_key, validate_key};

use crate::config::{StorageBackend, StorageConfig};

/// Builds one store per record type over the configured backend.
///
/// Database backends share a single client, so every store created by one
/// factory lives in the same database.
#[derive(Debug, Clone)]
pub enum StoreFactory {
    /// Fresh in-memory map per store
    Memory,

    /// Tables in one embedded SurrealDB database
    #[cfg(feature = "surrealdb-embedded")]
    SurrealDB(surrealdb::Surreal<surrealdb::engine::local::Db>),
}

impl StoreFactory {
    /// Open the backend described by `config`
    pub async fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        match config.backend {
            StorageBackend::Memory => {
                tracing::info!("Using in-memory storage");
                Ok(StoreFactory::Memory)
            }
            #[cfg(feature = "surrealdb-embedded")]
            StorageBackend::SurrealDB => {
                let client = surreal::connect(&config.surrealdb, &config.data_dir).await?;
                Ok(StoreFactory::SurrealDB(client))
            }
            #[cfg(not(feature = "surrealdb-embedded"))]
            StorageBackend::SurrealDB => Err(StorageError::UnsupportedStorageType(
                "surrealdb backend requires the 'surrealdb-embedded' feature".to_string(),
            )),
        }
    }

    /// Create the store for records of type `R`
    pub fn store<R: Record>(&self) -> Arc<dyn KeyedStore<R>> {
        match self {
            StoreFactory::Memory => Arc::new(InMemoryStore::<R>::new()),
            #[cfg(feature = "surrealdb-embedded")]
            StoreFactory::SurrealDB(client) => Arc::new(SurrealStore::<R>::new(client.clone())),
        }
    }

    /// Short name of the backend, reported by health checks
    pub fn backend_name(&self) -> &'static str {
        match self {
            StoreFactory::Memory => "memory",
            #[cfg(feature = "surrealdb-embedded")]
            StoreFactory::SurrealDB(_) => "surrealdb",
        }
    }
}
