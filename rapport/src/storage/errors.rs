//! Error types for storage operations

use std::error::Error;
use std::fmt;

/// Error type for storage operations
#[derive(Debug, Clone, PartialEq)]
pub enum StorageError {
    /// Configuration error
    Configuration(String),

    /// Connection error
    Connection(String),

    /// Query error
    Query(String),

    /// Internal error
    Internal(String),

    /// Validation error (malformed keys or filters)
    Validation(String),

    /// Data not found
    NotFound(String),

    /// Item already exists
    AlreadyExists(String),

    /// Serialization/deserialization error
    Serialization(String),

    /// Unsupported storage type (backend feature not compiled in)
    UnsupportedStorageType(String),

    /// Other error
    Other(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

impl StorageError {
    /// Returns `true` if the error reports a key that is already live.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, StorageError::AlreadyExists(_))
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            StorageError::Connection(msg) => write!(f, "Connection error: {}", msg),
            StorageError::Query(msg) => write!(f, "Query error: {}", msg),
            StorageError::Internal(msg) => write!(f, "Internal error: {}", msg),
            StorageError::Validation(msg) => write!(f, "Validation error: {}", msg),
            StorageError::NotFound(msg) => write!(f, "Not found: {}", msg),
            StorageError::AlreadyExists(msg) => write!(f, "Already exists: {}", msg),
            StorageError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            StorageError::UnsupportedStorageType(msg) => {
                write!(f, "Unsupported storage type: {}", msg)
            }
            StorageError::Other(msg) => write!(f, "Other error: {}", msg),
        }
    }
}

impl Error for StorageError {}

/// Convert a JSON error to a storage error
impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

/// Convert a standard IO error to a storage error
impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Connection(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_context() {
        let err = StorageError::AlreadyExists("friend_request:a:b".to_string());
        assert!(err.is_already_exists());
        assert_eq!(err.to_string(), "Already exists: friend_request:a:b");

        let err = StorageError::UnsupportedStorageType("surrealdb".to_string());
        assert!(!err.is_already_exists());
        assert!(err.to_string().contains("surrealdb"));
    }

    #[test]
    fn test_json_errors_become_serialization_errors() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(matches!(
            StorageError::from(json_err),
            StorageError::Serialization(_)
        ));
    }
}
