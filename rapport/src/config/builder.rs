//! Configuration builder.
//!
//! This module provides a builder pattern API for creating configurations.

use super::{Result, models::*, validation};
use crate::storage::config::SurrealDBEngine;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Builder for creating RapportConfig instances.
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config: RapportConfig,
}

impl ConfigBuilder {
    /// Create a new configuration builder with default values.
    pub fn new() -> Self {
        Self {
            config: RapportConfig::default(),
        }
    }

    /// Start from an existing configuration.
    pub fn from_config(config: RapportConfig) -> Self {
        Self { config }
    }

    /// Set the base data directory.
    pub fn with_data_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config.storage.data_dir = path.as_ref().to_path_buf();
        self
    }

    /// Keep every store in process memory.
    pub fn with_memory_storage(mut self) -> Self {
        self.config.storage.backend = StorageBackend::Memory;
        self
    }

    /// Use embedded SurrealDB without touching disk.
    pub fn with_surrealdb_memory(mut self) -> Self {
        self.config.storage.backend = StorageBackend::SurrealDB;
        self.config.storage.surrealdb.engine = SurrealDBEngine::Memory;
        self
    }

    /// Use embedded SurrealDB persisted with RocksDB under the data directory.
    pub fn with_persistent_storage(mut self) -> Self {
        self.config.storage.backend = StorageBackend::SurrealDB;
        self.config.storage.surrealdb.engine = SurrealDBEngine::RocksDB;
        self
    }

    /// Set the SurrealDB namespace and database.
    pub fn with_surrealdb_database(
        mut self,
        namespace: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        self.config.storage.surrealdb.namespace = namespace.into();
        self.config.storage.surrealdb.database = database.into();
        self
    }

    /// Choose how a request answering a pending reverse request is handled.
    pub fn with_reverse_request_policy(mut self, policy: ReverseRequestPolicy) -> Self {
        self.config.friendship.reverse_request_policy = policy;
        self
    }

    /// Cap the duration of a single allocation.
    pub fn with_max_allocation(mut self, max: Duration) -> Self {
        self.config.allocator.max_duration = max;
        if self.config.allocator.default_duration > max {
            self.config.allocator.default_duration = max;
        }
        self
    }

    /// Set the log level.
    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.config.logging.level = level;
        self
    }

    /// Set the log format.
    pub fn with_log_format(mut self, format: LogFormat) -> Self {
        self.config.logging.format = format;
        self
    }

    /// Configure logging to a file.
    pub fn with_log_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config.logging.file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Use default logging configuration (console output at Info level)
    pub fn with_default_logging(mut self) -> Self {
        self.config.logging.level = LogLevel::Info;
        self.config.logging.format = LogFormat::Json;
        self.config.logging.file = None;
        self
    }

    /// Create a configuration for development.
    ///
    /// In-memory stores and debug-level logging.
    pub fn development() -> Self {
        Self::new()
            .with_memory_storage()
            .with_log_level(LogLevel::Debug)
    }

    /// Create a configuration for testing.
    pub fn testing() -> Self {
        Self::development().with_data_dir(PathBuf::from("./test_data"))
    }

    /// Create a production-ready configuration with persistent storage.
    ///
    /// This creates a configuration suitable for production use with:
    /// - RocksDB-backed SurrealDB under the platform data directory
    /// - JSON logging at Info level
    pub fn production() -> Self {
        Self::new()
            .with_persistent_storage()
            .with_surrealdb_database("rapport", "main")
            .with_default_logging()
    }

    /// Production settings overlaid with configuration files and
    /// `RAPPORT_` environment variables.
    pub fn defaults() -> Self {
        let base = Self::production().config;
        let mut loader = super::ConfigLoader::from_config(&base);
        loader.load_default_files().load_env();
        match loader.extract() {
            Ok(config) => Self { config },
            Err(e) => {
                tracing::warn!("Ignoring invalid configuration overrides: {}", e);
                Self { config: base }
            }
        }
    }

    /// Build the configuration, validating it in the process.
    pub fn build(self) -> Result<RapportConfig> {
        validation::validate_config(&self.config)?;
        Ok(self.config)
    }
}
