//! Error types for resource allocation.

use std::time::Duration;
use thiserror::Error;

use crate::models::{SubjectId, UserId};
use crate::storage::StorageError;

/// Errors that can occur while allocating or releasing a resource.
#[derive(Error, Debug)]
pub enum AllocationError {
    /// The resource is held by someone else.
    #[error("Resource '{resource}' is already held by {holder}")]
    AlreadyHeld {
        /// The contested resource.
        resource: SubjectId,
        /// The current holder.
        holder: UserId,
    },

    /// The requested duration is zero or above the configured maximum.
    #[error("Invalid allocation duration {duration:?}: {reason}")]
    InvalidDuration { duration: Duration, reason: String },

    /// The backing store failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl AllocationError {
    /// Creates an `AlreadyHeld` error.
    pub fn already_held(resource: SubjectId, holder: UserId) -> Self {
        Self::AlreadyHeld { resource, holder }
    }

    /// Creates an `InvalidDuration` error.
    pub fn invalid_duration(duration: Duration, reason: impl Into<String>) -> Self {
        Self::InvalidDuration {
            duration,
            reason: reason.into(),
        }
    }

    /// Returns `true` if another holder owns the resource.
    pub fn is_already_held(&self) -> bool {
        matches!(self, Self::AlreadyHeld { .. })
    }

    /// Returns `true` if the duration was rejected.
    pub fn is_invalid_duration(&self) -> bool {
        matches!(self, Self::InvalidDuration { .. })
    }
}
