//! API implementation for the Rapport HTTP server

use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    middleware,
    response::Json,
    routing::{delete, get, post, put},
};
use rapport::directory::UserDirectory;
use rapport::models::UserId;
use utoipa::OpenApi;

use crate::{error::ServerResult, state::AppState};

pub mod allocations;
pub mod caller;
pub mod deadlines;
pub mod dto;
pub mod friends;
pub mod threads;
pub mod users;
pub mod votes;

use caller::caller_middleware;

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        users::register_user,
        users::list_users,
        users::get_user,
        users::session,
        friends::list_friends,
        friends::remove_friend,
        friends::list_requests,
        friends::send_request,
        friends::withdraw_request,
        friends::accept_request,
        friends::reject_request,
        votes::vote_status,
        votes::upvote,
        votes::downvote,
        votes::unvote,
        votes::tally,
        deadlines::get_deadline,
        deadlines::set_deadline,
        deadlines::clear_deadline,
        threads::list_threads,
        threads::create_thread,
        threads::list_thread,
        threads::delete_thread,
        threads::link_post,
        threads::unlink_post,
        allocations::list_allocations,
        allocations::allocate,
        allocations::release,
    ),
    components(
        schemas(
            dto::UserDto,
            dto::RegisterUserRequest,
            dto::FriendRequestDto,
            dto::SendRequestResponse,
            dto::VoteStatusDto,
            dto::VoteTallyDto,
            dto::DeadlineDto,
            dto::SetDeadlineRequest,
            dto::CreateThreadRequest,
            dto::ThreadDto,
            dto::ThreadLinkDto,
            dto::LinkResponse,
            dto::AllocateRequest,
            dto::AllocationDto,
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Service health"),
        (name = "users", description = "User registration and lookup"),
        (name = "friends", description = "Friend requests and friendships"),
        (name = "votes", description = "Up and down votes on posts"),
        (name = "deadlines", description = "Subject deadlines"),
        (name = "threads", description = "Threads of linked posts"),
        (name = "allocations", description = "Time-boxed resource allocations"),
    ),
    info(
        title = "Rapport API",
        version = "1.0.0",
        description = "Friendships, votes, deadlines, threads and time-boxed allocations. Callers identify themselves with the x-rapport-user header.",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
pub struct ApiDoc;

/// Create the main router with all API endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .route("/health", get(health_check))
        // Users
        .route("/users", post(users::register_user).get(users::list_users))
        .route("/users/{username}", get(users::get_user))
        .route("/session", get(users::session))
        // Friendships
        .route("/friends", get(friends::list_friends))
        .route("/friends/{friend}", delete(friends::remove_friend))
        .route("/friend/requests", get(friends::list_requests))
        .route(
            "/friend/requests/{to}",
            post(friends::send_request).delete(friends::withdraw_request),
        )
        .route("/friend/accept/{from}", put(friends::accept_request))
        .route("/friend/reject/{from}", put(friends::reject_request))
        // Votes
        .route("/vote/status/{post}", get(votes::vote_status))
        .route("/vote/upvote/{post}", put(votes::upvote))
        .route("/vote/downvote/{post}", put(votes::downvote))
        .route("/vote/unvote/{post}", put(votes::unvote))
        .route("/vote/tally/{post}", get(votes::tally))
        // Deadlines
        .route(
            "/deadlines/{subject}",
            get(deadlines::get_deadline)
                .put(deadlines::set_deadline)
                .delete(deadlines::clear_deadline),
        )
        // Threads
        .route(
            "/thread",
            get(threads::list_threads).post(threads::create_thread),
        )
        .route(
            "/thread/{thread}",
            get(threads::list_thread).delete(threads::delete_thread),
        )
        .route(
            "/thread/{thread}/{post}",
            put(threads::link_post).delete(threads::unlink_post),
        )
        // Allocations
        .route("/allocations", get(allocations::list_allocations))
        .route(
            "/allocations/{resource}",
            put(allocations::allocate).delete(allocations::release),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            caller_middleware,
        ))
        .with_state(state);

    Router::new()
        .nest("/api", api_router)
        .route("/api-docs/openapi.json", get(openapi_json))
}

/// Health check endpoint with storage status
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses(
        (status = 200, description = "Service health and storage status", body = serde_json::Value)
    )
)]
async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let storage_healthy = match state.rapport.health_check().await {
        Ok(healthy) => healthy,
        Err(e) => {
            tracing::warn!("Storage health check failed: {}", e);
            false
        }
    };

    Json(serde_json::json!({
        "status": if storage_healthy { "OK" } else { "DEGRADED" },
        "version": rapport::VERSION,
        "storage": {
            "backend": state.rapport.backend_name(),
            "healthy": storage_healthy,
        },
        "allocations": {
            "pending_timers": state.rapport.allocator().pending_timers().await,
        }
    }))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Resolve a username taken from a path
pub(crate) async fn resolve_user(state: &AppState, username: &str) -> ServerResult<UserId> {
    Ok(state.rapport.directory().resolve_username(username).await?)
}
