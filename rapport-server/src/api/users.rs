//! User registration and lookup endpoints

use std::sync::Arc;

use axum::{
    Extension, Json as JsonExtractor,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use rapport::directory::UserDirectory;

use crate::{
    api::{
        caller::Caller,
        dto::{RegisterUserRequest, UserDto},
    },
    error::{ServerResult, not_found},
    state::AppState,
};

/// Register a username
#[utoipa::path(
    post,
    path = "/api/users",
    tag = "users",
    request_body = RegisterUserRequest,
    responses(
        (status = 201, description = "User registered", body = UserDto),
        (status = 400, description = "Invalid username", body = crate::error::ErrorResponse),
        (status = 409, description = "Username taken", body = crate::error::ErrorResponse),
    )
)]
pub async fn register_user(
    State(state): State<Arc<AppState>>,
    JsonExtractor(request): JsonExtractor<RegisterUserRequest>,
) -> ServerResult<(StatusCode, Json<UserDto>)> {
    let profile = state.rapport.directory().register(&request.username).await?;
    tracing::info!("Registered user '{}'", profile.username);
    Ok((StatusCode::CREATED, Json(UserDto::from(profile))))
}

/// List registered users
#[utoipa::path(
    get,
    path = "/api/users",
    tag = "users",
    responses(
        (status = 200, description = "Registered users ordered by username", body = Vec<UserDto>),
    )
)]
pub async fn list_users(State(state): State<Arc<AppState>>) -> ServerResult<Json<Vec<UserDto>>> {
    let users = state.rapport.directory().list_users().await?;
    Ok(Json(users.into_iter().map(UserDto::from).collect()))
}

/// Resolve a username
#[utoipa::path(
    get,
    path = "/api/users/{username}",
    tag = "users",
    params(
        ("username" = String, Path, description = "Username")
    ),
    responses(
        (status = 200, description = "User details", body = UserDto),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse),
    )
)]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> ServerResult<Json<UserDto>> {
    let directory = state.rapport.directory();
    let id = directory.resolve_username(&username).await?;
    let profile = directory
        .get_profile(id)
        .await?
        .ok_or_else(|| not_found("User", &username))?;
    Ok(Json(UserDto::from(profile)))
}

/// The caller's own profile
#[utoipa::path(
    get,
    path = "/api/session",
    tag = "users",
    responses(
        (status = 200, description = "Caller profile", body = UserDto),
        (status = 401, description = "No known caller", body = crate::error::ErrorResponse),
    )
)]
pub async fn session(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> ServerResult<Json<UserDto>> {
    let profile = state
        .rapport
        .directory()
        .get_profile(caller.id)
        .await?
        .ok_or_else(|| not_found("User", &caller.username))?;
    Ok(Json(UserDto::from(profile)))
}
