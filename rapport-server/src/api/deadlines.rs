//! Deadline endpoints

use std::sync::Arc;

use axum::{
    Json as JsonExtractor,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use rapport::models::SubjectId;

use crate::{
    api::dto::{DeadlineDto, SetDeadlineRequest},
    error::ServerResult,
    state::AppState,
};

/// Deadline status of a subject
#[utoipa::path(
    get,
    path = "/api/deadlines/{subject}",
    tag = "deadlines",
    params(("subject" = String, Path, description = "Subject identifier")),
    responses(
        (status = 200, description = "Deadline and its status", body = DeadlineDto),
    )
)]
pub async fn get_deadline(
    State(state): State<Arc<AppState>>,
    Path(subject): Path<String>,
) -> ServerResult<Json<DeadlineDto>> {
    let id = SubjectId::from(subject.as_str());
    let deadlines = state.rapport.deadlines();
    let deadline = deadlines.get_deadline(&id).await?;
    let status = deadlines.status(&id).await?;
    Ok(Json(DeadlineDto::new(&subject, deadline, status)))
}

/// Set or replace the deadline of a subject
#[utoipa::path(
    put,
    path = "/api/deadlines/{subject}",
    tag = "deadlines",
    params(("subject" = String, Path, description = "Subject identifier")),
    request_body = SetDeadlineRequest,
    responses(
        (status = 200, description = "Deadline set", body = DeadlineDto),
    )
)]
pub async fn set_deadline(
    State(state): State<Arc<AppState>>,
    Path(subject): Path<String>,
    JsonExtractor(request): JsonExtractor<SetDeadlineRequest>,
) -> ServerResult<Json<DeadlineDto>> {
    let id = SubjectId::from(subject.as_str());
    let deadlines = state.rapport.deadlines();
    deadlines.set_deadline(&id, request.deadline).await?;
    let status = deadlines.status(&id).await?;
    Ok(Json(DeadlineDto::new(&subject, Some(request.deadline), status)))
}

/// Clear the deadline of a subject
#[utoipa::path(
    delete,
    path = "/api/deadlines/{subject}",
    tag = "deadlines",
    params(("subject" = String, Path, description = "Subject identifier")),
    responses(
        (status = 204, description = "Deadline cleared, or there was none"),
    )
)]
pub async fn clear_deadline(
    State(state): State<Arc<AppState>>,
    Path(subject): Path<String>,
) -> ServerResult<StatusCode> {
    state
        .rapport
        .deadlines()
        .clear_deadline(&SubjectId::from(subject))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
