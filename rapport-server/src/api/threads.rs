//! Thread endpoints

use std::sync::Arc;

use axum::{
    Extension, Json as JsonExtractor,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use rapport::directory::UserDirectory;
use rapport::models::{SubjectId, ThreadId};
use rapport::threads::ThreadHead;

use crate::{
    api::{
        caller::Caller,
        dto::{CreateThreadRequest, LinkResponse, ThreadDto, ThreadLinkDto},
    },
    error::{ServerResult, bad_request, not_found},
    state::AppState,
};

fn parse_thread(thread: &str) -> ServerResult<ThreadId> {
    thread
        .parse()
        .map_err(|_| bad_request(&format!("'{}' is not a thread id", thread)))
}

async fn to_dto(state: &AppState, head: ThreadHead) -> ServerResult<ThreadDto> {
    let creator = state.rapport.directory().username_of(head.creator).await?;
    Ok(ThreadDto::new(head, creator))
}

/// List threads
#[utoipa::path(
    get,
    path = "/api/thread",
    tag = "threads",
    responses(
        (status = 200, description = "Every thread, oldest first", body = Vec<ThreadDto>),
    )
)]
pub async fn list_threads(State(state): State<Arc<AppState>>) -> ServerResult<Json<Vec<ThreadDto>>> {
    let heads = state.rapport.threads().list_threads().await?;
    let mut threads = Vec::with_capacity(heads.len());
    for head in heads {
        threads.push(to_dto(&state, head).await?);
    }
    Ok(Json(threads))
}

/// Start a thread
#[utoipa::path(
    post,
    path = "/api/thread",
    tag = "threads",
    request_body = CreateThreadRequest,
    responses(
        (status = 201, description = "Thread created", body = ThreadDto),
        (status = 400, description = "Blank content", body = crate::error::ErrorResponse),
    )
)]
pub async fn create_thread(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    JsonExtractor(request): JsonExtractor<CreateThreadRequest>,
) -> ServerResult<(StatusCode, Json<ThreadDto>)> {
    let content = request.content.trim();
    if content.is_empty() {
        return Err(bad_request("thread content cannot be blank"));
    }

    let head = state
        .rapport
        .threads()
        .create_thread(&SubjectId::from(content), caller.id)
        .await?;
    Ok((StatusCode::CREATED, Json(ThreadDto::new(head, caller.username))))
}

/// Content linked into a thread
#[utoipa::path(
    get,
    path = "/api/thread/{thread}",
    tag = "threads",
    params(("thread" = String, Path, description = "Thread identifier")),
    responses(
        (status = 200, description = "Linked content, oldest first", body = Vec<ThreadLinkDto>),
        (status = 404, description = "Thread not found", body = crate::error::ErrorResponse),
    )
)]
pub async fn list_thread(
    State(state): State<Arc<AppState>>,
    Path(thread): Path<String>,
) -> ServerResult<Json<Vec<ThreadLinkDto>>> {
    let id = parse_thread(&thread)?;
    let threads = state.rapport.threads();
    if threads.get_thread(id).await?.is_none() {
        return Err(not_found("Thread", &thread));
    }
    let links = threads.list_thread(id).await?;
    Ok(Json(links.into_iter().map(ThreadLinkDto::from).collect()))
}

/// Delete a thread and its links
#[utoipa::path(
    delete,
    path = "/api/thread/{thread}",
    tag = "threads",
    params(("thread" = String, Path, description = "Thread identifier")),
    responses(
        (status = 204, description = "Thread deleted, or there was none"),
    )
)]
pub async fn delete_thread(
    State(state): State<Arc<AppState>>,
    Path(thread): Path<String>,
) -> ServerResult<StatusCode> {
    let id = parse_thread(&thread)?;
    state.rapport.threads().delete_thread(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Link a post into a thread
#[utoipa::path(
    put,
    path = "/api/thread/{thread}/{post}",
    tag = "threads",
    params(
        ("thread" = String, Path, description = "Thread identifier"),
        ("post" = String, Path, description = "Post identifier"),
    ),
    responses(
        (status = 200, description = "Post linked", body = LinkResponse),
        (status = 404, description = "Thread not found", body = crate::error::ErrorResponse),
    )
)]
pub async fn link_post(
    State(state): State<Arc<AppState>>,
    Path((thread, post)): Path<(String, String)>,
) -> ServerResult<Json<LinkResponse>> {
    let id = parse_thread(&thread)?;
    let outcome = state
        .rapport
        .threads()
        .link_to_thread(&SubjectId::from(post), id)
        .await?;
    Ok(Json(LinkResponse::from(outcome)))
}

/// Unlink a post from a thread
#[utoipa::path(
    delete,
    path = "/api/thread/{thread}/{post}",
    tag = "threads",
    params(
        ("thread" = String, Path, description = "Thread identifier"),
        ("post" = String, Path, description = "Post identifier"),
    ),
    responses(
        (status = 204, description = "Post unlinked, or it was not linked"),
    )
)]
pub async fn unlink_post(
    State(state): State<Arc<AppState>>,
    Path((thread, post)): Path<(String, String)>,
) -> ServerResult<StatusCode> {
    let id = parse_thread(&thread)?;
    state
        .rapport
        .threads()
        .remove_from_thread(&SubjectId::from(post), id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
