//! Error handling for the Rapport server

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rapport::allocator::AllocationError;
use rapport::directory::DirectoryError;
use rapport::friendship::FriendshipError;
use rapport::storage::StorageError;
use rapport::threads::ThreadError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// API error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Machine readable error kind
    pub error: String,
    /// Human readable description
    pub message: String,
}

/// Server error types
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Friendship(#[from] FriendshipError),

    #[error(transparent)]
    Allocation(#[from] AllocationError),

    #[error(transparent)]
    Thread(#[from] ThreadError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The request carries no known caller
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request error
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Not found error
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Internal server error
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::Friendship(e) => match e {
                FriendshipError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
                FriendshipError::RequestNotFound { .. } => StatusCode::NOT_FOUND,
                FriendshipError::DuplicateRequest { .. }
                | FriendshipError::RequestExists { .. }
                | FriendshipError::AlreadyFriends { .. } => StatusCode::CONFLICT,
                FriendshipError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ServerError::Allocation(e) => match e {
                AllocationError::AlreadyHeld { .. } => StatusCode::CONFLICT,
                AllocationError::InvalidDuration { .. } => StatusCode::BAD_REQUEST,
                AllocationError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ServerError::Thread(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            ServerError::Directory(e) => match e {
                DirectoryError::NotFound(_) => StatusCode::NOT_FOUND,
                DirectoryError::UsernameTaken(_) => StatusCode::CONFLICT,
                DirectoryError::InvalidUsername(_) => StatusCode::BAD_REQUEST,
                DirectoryError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ServerError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error type string
    pub fn error_type(&self) -> &'static str {
        match self {
            ServerError::Friendship(e) => match e {
                FriendshipError::InvalidRequest { .. } => "invalid_request",
                FriendshipError::DuplicateRequest { .. } => "duplicate_request",
                FriendshipError::RequestExists { .. } => "request_exists",
                FriendshipError::AlreadyFriends { .. } => "already_friends",
                FriendshipError::RequestNotFound { .. } => "request_not_found",
                FriendshipError::Storage(_) => "storage_error",
            },
            ServerError::Allocation(e) => match e {
                AllocationError::AlreadyHeld { .. } => "already_held",
                AllocationError::InvalidDuration { .. } => "invalid_duration",
                AllocationError::Storage(_) => "storage_error",
            },
            ServerError::Thread(e) if e.is_not_found() => "not_found",
            ServerError::Thread(_) => "storage_error",
            ServerError::Directory(e) => match e {
                DirectoryError::NotFound(_) => "not_found",
                DirectoryError::UsernameTaken(_) => "username_taken",
                DirectoryError::InvalidUsername(_) => "invalid_username",
                DirectoryError::Storage(_) => "storage_error",
            },
            ServerError::Storage(_) => "storage_error",
            ServerError::Unauthorized(_) => "unauthorized",
            ServerError::BadRequest(_) => "bad_request",
            ServerError::NotFound(_) => "not_found",
            ServerError::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("{}", self);
        }
        let error_response = ErrorResponse {
            error: self.error_type().to_string(),
            message: self.to_string(),
        };

        (status, Json(error_response)).into_response()
    }
}

/// Result type for server operations
pub type ServerResult<T> = Result<T, ServerError>;

/// Helper function to create a not found error
pub fn not_found(resource: &str, id: &str) -> ServerError {
    ServerError::NotFound(format!("{} '{}' not found", resource, id))
}

/// Helper function to create a bad request error
pub fn bad_request(message: &str) -> ServerError {
    ServerError::BadRequest(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rapport::models::UserId;

    #[test]
    fn test_friendship_errors_map_to_status() {
        let (a, b) = (UserId::new(), UserId::new());
        let cases = [
            (FriendshipError::invalid_request("self"), StatusCode::BAD_REQUEST),
            (FriendshipError::duplicate_request(a, b), StatusCode::CONFLICT),
            (FriendshipError::request_exists(a, b), StatusCode::CONFLICT),
            (FriendshipError::already_friends(a, b), StatusCode::CONFLICT),
            (FriendshipError::request_not_found(a, b), StatusCode::NOT_FOUND),
        ];
        for (error, status) in cases {
            assert_eq!(ServerError::from(error).status_code(), status);
        }
    }

    #[test]
    fn test_directory_and_storage_errors_map_to_status() {
        assert_eq!(
            ServerError::from(DirectoryError::UsernameTaken("alice".into())).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServerError::from(DirectoryError::NotFound("ghost".into())).status_code(),
            StatusCode::NOT_FOUND
        );
        let storage = ServerError::from(StorageError::Connection("down".into()));
        assert_eq!(storage.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(storage.error_type(), "storage_error");
    }
}
