//! Configuration model definitions.
//!
//! This module contains the configuration structures for all Rapport components.

use crate::storage::config::SurrealDBConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Main configuration structure for Rapport.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct RapportConfig {
    /// Storage configuration
    pub storage: StorageConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Friendship workflow configuration
    pub friendship: FriendshipConfig,

    /// Resource allocation configuration
    pub allocator: AllocatorConfig,
}

/// Configuration for storage components.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Which backend holds the concept stores
    pub backend: StorageBackend,

    /// Base directory for on-disk data
    pub data_dir: PathBuf,

    /// SurrealDB-specific configuration
    pub surrealdb: SurrealDBConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let data_dir = directories::ProjectDirs::from("org", "rapport", "rapport")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("./data"));

        Self {
            backend: StorageBackend::Memory,
            data_dir,
            surrealdb: SurrealDBConfig::default(),
        }
    }
}

/// Storage backend type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-local maps, nothing survives a restart
    Memory,

    /// Embedded SurrealDB
    SurrealDB,
}

/// What `send_request` does when the recipient already has a pending
/// request to the sender.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReverseRequestPolicy {
    /// Fail with `RequestExists`
    #[default]
    Reject,

    /// Accept the pending request instead
    AutoAccept,
}

/// Friendship workflow configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct FriendshipConfig {
    pub reverse_request_policy: ReverseRequestPolicy,
}

/// Resource allocation configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AllocatorConfig {
    /// Longest allocation a caller may request
    #[serde(with = "humantime_serde")]
    pub max_duration: Duration,

    /// Allocation used when a caller does not name a duration
    #[serde(with = "humantime_serde")]
    pub default_duration: Duration,

    /// Number of lock stripes serializing work per resource
    pub lock_stripes: usize,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            max_duration: Duration::from_secs(24 * 60 * 60),
            default_duration: Duration::from_secs(15 * 60),
            lock_stripes: 64,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: LogLevel,

    /// Log format
    pub format: LogFormat,

    /// File to log to (if any)
    pub file: Option<PathBuf>,

    /// Whether to log to stdout
    pub stdout: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Default,
            file: None,
            stdout: true,
        }
    }
}

/// Log level.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level
    Trace,

    /// Debug level
    Debug,

    /// Info level
    Info,

    /// Warn level
    Warn,

    /// Error level
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(format!("Invalid log level: {}", s)),
        }
    }
}

/// Log format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Default format
    Default,

    /// JSON format
    Json,

    /// Compact format
    Compact,

    /// Pretty format
    Pretty,
}
