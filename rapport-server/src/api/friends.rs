//! Friendship endpoints
//!
//! The caller is always one side of the pair: the sender for requests and
//! withdrawals, the recipient for accept and reject.

use std::sync::Arc;

use axum::{
    Extension,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use rapport::directory::UserDirectory;

use crate::{
    api::{
        caller::Caller,
        dto::{FriendRequestDto, SendRequestResponse},
        resolve_user,
    },
    error::ServerResult,
    state::AppState,
};

/// The caller's friends
#[utoipa::path(
    get,
    path = "/api/friends",
    tag = "friends",
    responses(
        (status = 200, description = "Usernames of the caller's friends", body = Vec<String>),
    )
)]
pub async fn list_friends(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> ServerResult<Json<Vec<String>>> {
    let friends = state.rapport.friendships().get_friends(caller.id).await?;
    let mut names = state.rapport.directory().usernames_for(&friends).await?;
    names.sort();
    Ok(Json(names))
}

/// Remove a friend
#[utoipa::path(
    delete,
    path = "/api/friends/{friend}",
    tag = "friends",
    params(
        ("friend" = String, Path, description = "Username of the friend")
    ),
    responses(
        (status = 204, description = "Friendship removed, or there was none"),
        (status = 404, description = "Unknown user", body = crate::error::ErrorResponse),
    )
)]
pub async fn remove_friend(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(friend): Path<String>,
) -> ServerResult<StatusCode> {
    let friend = resolve_user(&state, &friend).await?;
    state
        .rapport
        .friendships()
        .remove_friend(caller.id, friend)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Requests waiting for the caller's answer
#[utoipa::path(
    get,
    path = "/api/friend/requests",
    tag = "friends",
    responses(
        (status = 200, description = "Pending requests addressed to the caller", body = Vec<FriendRequestDto>),
    )
)]
pub async fn list_requests(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> ServerResult<Json<Vec<FriendRequestDto>>> {
    let directory = state.rapport.directory();
    let requests = state.rapport.friendships().get_requests(caller.id).await?;

    let mut inbox = Vec::with_capacity(requests.len());
    for request in &requests {
        let from = directory.username_of(request.from).await?;
        inbox.push(FriendRequestDto::new(request, from, caller.username.clone()));
    }
    Ok(Json(inbox))
}

/// Send a friend request
#[utoipa::path(
    post,
    path = "/api/friend/requests/{to}",
    tag = "friends",
    params(
        ("to" = String, Path, description = "Username of the recipient")
    ),
    responses(
        (status = 201, description = "Request sent, or the opposite request accepted", body = SendRequestResponse),
        (status = 400, description = "Request to self", body = crate::error::ErrorResponse),
        (status = 404, description = "Unknown user", body = crate::error::ErrorResponse),
        (status = 409, description = "Already pending or already friends", body = crate::error::ErrorResponse),
    )
)]
pub async fn send_request(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(to): Path<String>,
) -> ServerResult<(StatusCode, Json<SendRequestResponse>)> {
    let recipient = resolve_user(&state, &to).await?;
    let outcome = state
        .rapport
        .friendships()
        .send_request(caller.id, recipient)
        .await?;
    Ok((StatusCode::CREATED, Json(SendRequestResponse::from(&outcome))))
}

/// Withdraw a friend request the caller sent
#[utoipa::path(
    delete,
    path = "/api/friend/requests/{to}",
    tag = "friends",
    params(
        ("to" = String, Path, description = "Username of the recipient")
    ),
    responses(
        (status = 204, description = "Request withdrawn, or there was none"),
        (status = 404, description = "Unknown user", body = crate::error::ErrorResponse),
    )
)]
pub async fn withdraw_request(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(to): Path<String>,
) -> ServerResult<StatusCode> {
    let recipient = resolve_user(&state, &to).await?;
    state
        .rapport
        .friendships()
        .remove_request(caller.id, recipient)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Accept a request sent to the caller
#[utoipa::path(
    put,
    path = "/api/friend/accept/{from}",
    tag = "friends",
    params(
        ("from" = String, Path, description = "Username of the sender")
    ),
    responses(
        (status = 204, description = "Request accepted"),
        (status = 404, description = "No such request", body = crate::error::ErrorResponse),
    )
)]
pub async fn accept_request(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(from): Path<String>,
) -> ServerResult<StatusCode> {
    let sender = resolve_user(&state, &from).await?;
    state
        .rapport
        .friendships()
        .accept_request(sender, caller.id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Reject a request sent to the caller
#[utoipa::path(
    put,
    path = "/api/friend/reject/{from}",
    tag = "friends",
    params(
        ("from" = String, Path, description = "Username of the sender")
    ),
    responses(
        (status = 204, description = "Request rejected"),
        (status = 404, description = "No such request", body = crate::error::ErrorResponse),
    )
)]
pub async fn reject_request(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(from): Path<String>,
) -> ServerResult<StatusCode> {
    let sender = resolve_user(&state, &from).await?;
    state
        .rapport
        .friendships()
        .reject_request(sender, caller.id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
