//! Caller identification for the Rapport API
//!
//! The server performs no authentication. Every non-public request names its
//! caller in the `x-rapport-user` header; the middleware resolves that
//! username through the user directory and stores a [`Caller`] in the
//! request extensions.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, Method},
    middleware::Next,
    response::Response,
};
use rapport::directory::{DirectoryError, UserDirectory};
use rapport::models::UserId;

use crate::{config::CALLER_HEADER, error::ServerError, state::AppState};

/// The user a request acts for
#[derive(Debug, Clone)]
pub struct Caller {
    pub id: UserId,
    pub username: String,
}

/// Resolve the caller of every non-public request
pub async fn caller_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    if is_public_endpoint(request.method(), request.uri().path()) {
        return Ok(next.run(request).await);
    }

    let username = headers
        .get(CALLER_HEADER)
        .ok_or_else(|| ServerError::Unauthorized(format!("missing {} header", CALLER_HEADER)))?
        .to_str()
        .map_err(|_| ServerError::Unauthorized(format!("malformed {} header", CALLER_HEADER)))?
        .trim()
        .to_string();

    let id = match state.rapport.directory().resolve_username(&username).await {
        Ok(id) => id,
        Err(DirectoryError::NotFound(_)) => {
            return Err(ServerError::Unauthorized(format!(
                "unknown user '{}'",
                username
            )));
        }
        Err(e) => return Err(e.into()),
    };

    tracing::debug!("Request from {} ({})", username, id);
    request.extensions_mut().insert(Caller { id, username });

    Ok(next.run(request).await)
}

/// Check if an endpoint is public (doesn't require a caller)
fn is_public_endpoint(method: &Method, path: &str) -> bool {
    match path {
        "/health" => true,
        "/users" => method == Method::POST,
        _ => false,
    }
}
