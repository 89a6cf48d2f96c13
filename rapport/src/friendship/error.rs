//! Error types for the friendship workflow.

use thiserror::Error;

use crate::models::UserId;
use crate::storage::StorageError;

/// Errors that can occur while sending, answering or removing friend
/// requests. Every error leaves the friendship state untouched.
#[derive(Error, Debug)]
pub enum FriendshipError {
    /// The request is malformed, for example a user befriending themselves.
    #[error("Invalid friend request: {reason}")]
    InvalidRequest {
        /// Why the request was rejected.
        reason: String,
    },

    /// The same directed request is already pending.
    #[error("Friend request from {from} to {to} is already pending")]
    DuplicateRequest { from: UserId, to: UserId },

    /// The recipient already sent a request in the opposite direction.
    #[error("A friend request from {to} to {from} is already pending")]
    RequestExists { from: UserId, to: UserId },

    /// The two users are already friends.
    #[error("{user_a} and {user_b} are already friends")]
    AlreadyFriends { user_a: UserId, user_b: UserId },

    /// No pending request exists for the pair.
    #[error("No pending friend request from {from} to {to}")]
    RequestNotFound { from: UserId, to: UserId },

    /// The backing store failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl FriendshipError {
    /// Creates an `InvalidRequest` error.
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }

    /// Creates a `DuplicateRequest` error.
    pub fn duplicate_request(from: UserId, to: UserId) -> Self {
        Self::DuplicateRequest { from, to }
    }

    /// Creates a `RequestExists` error.
    pub fn request_exists(from: UserId, to: UserId) -> Self {
        Self::RequestExists { from, to }
    }

    /// Creates an `AlreadyFriends` error.
    pub fn already_friends(user_a: UserId, user_b: UserId) -> Self {
        Self::AlreadyFriends { user_a, user_b }
    }

    /// Creates a `RequestNotFound` error.
    pub fn request_not_found(from: UserId, to: UserId) -> Self {
        Self::RequestNotFound { from, to }
    }

    /// Returns `true` if the request itself was malformed.
    pub fn is_invalid_request(&self) -> bool {
        matches!(self, Self::InvalidRequest { .. })
    }

    /// Returns `true` if the same request is already pending.
    pub fn is_duplicate_request(&self) -> bool {
        matches!(self, Self::DuplicateRequest { .. })
    }

    /// Returns `true` if the opposite request is already pending.
    pub fn is_request_exists(&self) -> bool {
        matches!(self, Self::RequestExists { .. })
    }

    /// Returns `true` if the users are already friends.
    pub fn is_already_friends(&self) -> bool {
        matches!(self, Self::AlreadyFriends { .. })
    }

    /// Returns `true` if no matching request was pending.
    pub fn is_request_not_found(&self) -> bool {
        matches!(self, Self::RequestNotFound { .. })
    }

    /// Returns `true` if the operation conflicts with existing state.
    pub fn is_conflict(&self) -> bool {
        self.is_duplicate_request() || self.is_request_exists() || self.is_already_friends()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicates() {
        let (a, b) = (UserId::new(), UserId::new());

        assert!(FriendshipError::invalid_request("self").is_invalid_request());
        assert!(FriendshipError::duplicate_request(a, b).is_conflict());
        assert!(FriendshipError::request_exists(a, b).is_conflict());
        assert!(FriendshipError::already_friends(a, b).is_conflict());

        let not_found = FriendshipError::request_not_found(a, b);
        assert!(not_found.is_request_not_found());
        assert!(!not_found.is_conflict());
    }

    #[test]
    fn test_display_names_both_users() {
        let (a, b) = (UserId::new(), UserId::new());
        let message = FriendshipError::request_exists(a, b).to_string();
        assert!(message.starts_with(&format!("A friend request from {} to {}", b, a)));
    }

    #[test]
    fn test_storage_errors_convert() {
        let err: FriendshipError = StorageError::Internal("boom".to_string()).into();
        assert!(matches!(err, FriendshipError::Storage(_)));
    }
}
