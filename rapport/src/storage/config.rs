//! Configuration structures for storage backends

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::storage::errors::StorageError;

/// SurrealDB configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SurrealDBConfig {
    /// SurrealDB engine type
    pub engine: SurrealDBEngine,

    /// On-disk location for embedded engines, relative paths resolve
    /// against the storage data directory
    pub connection: String,

    /// Namespace
    pub namespace: String,

    /// Database name
    pub database: String,
}

/// SurrealDB engine types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SurrealDBEngine {
    /// In-memory storage (for testing)
    Memory,
    /// RocksDB on-disk storage (embedded)
    RocksDB,
}

impl Default for SurrealDBConfig {
    fn default() -> Self {
        Self {
            engine: SurrealDBEngine::Memory,
            connection: "rapport.db".to_string(),
            namespace: "rapport".to_string(),
            database: "main".to_string(),
        }
    }
}

impl SurrealDBConfig {
    /// Resolve the on-disk path for embedded engines
    pub fn resolve_path(&self, data_dir: &Path) -> PathBuf {
        let connection = PathBuf::from(&self.connection);
        if connection.is_absolute() {
            connection
        } else {
            data_dir.join(connection)
        }
    }

    pub fn validate(&self) -> Result<(), StorageError> {
        if self.namespace.trim().is_empty() {
            return Err(StorageError::Configuration(
                "SurrealDB namespace cannot be empty".to_string(),
            ));
        }
        if self.database.trim().is_empty() {
            return Err(StorageError::Configuration(
                "SurrealDB database cannot be empty".to_string(),
            ));
        }
        if self.engine == SurrealDBEngine::RocksDB && self.connection.trim().is_empty() {
            return Err(StorageError::Configuration(
                "RocksDB engine requires a connection path".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_paths_resolve_against_data_dir() {
        let config = SurrealDBConfig::default();
        assert_eq!(
            config.resolve_path(Path::new("/var/lib/rapport")),
            PathBuf::from("/var/lib/rapport/rapport.db")
        );
    }

    #[test]
    fn test_validate_requires_namespace() {
        let config = SurrealDBConfig {
            namespace: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(SurrealDBConfig::default().validate().is_ok());
    }
}
