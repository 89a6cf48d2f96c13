//! Time-boxed allocation endpoints

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Extension, Json as JsonExtractor,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use rapport::directory::UserDirectory;
use rapport::models::SubjectId;

use crate::{
    api::{
        caller::Caller,
        dto::{AllocateRequest, AllocationDto},
    },
    error::ServerResult,
    state::AppState,
};

/// Active allocations
#[utoipa::path(
    get,
    path = "/api/allocations",
    tag = "allocations",
    responses(
        (status = 200, description = "Live allocations, soonest expiry first", body = Vec<AllocationDto>),
    )
)]
pub async fn list_allocations(
    State(state): State<Arc<AppState>>,
) -> ServerResult<Json<Vec<AllocationDto>>> {
    let directory = state.rapport.directory();
    let active = state.rapport.allocator().list_active().await?;

    let mut allocations = Vec::with_capacity(active.len());
    for allocation in active {
        let holder = directory.username_of(allocation.holder).await?;
        allocations.push(AllocationDto::new(allocation, holder));
    }
    Ok(Json(allocations))
}

/// Allocate a resource to the caller
#[utoipa::path(
    put,
    path = "/api/allocations/{resource}",
    tag = "allocations",
    params(("resource" = String, Path, description = "Resource identifier")),
    request_body = AllocateRequest,
    responses(
        (status = 200, description = "Resource allocated or extended", body = AllocationDto),
        (status = 400, description = "Invalid duration", body = crate::error::ErrorResponse),
        (status = 409, description = "Held by another user", body = crate::error::ErrorResponse),
    )
)]
pub async fn allocate(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(resource): Path<String>,
    request: Option<JsonExtractor<AllocateRequest>>,
) -> ServerResult<Json<AllocationDto>> {
    let JsonExtractor(request) = request.unwrap_or_default();
    let duration = request
        .duration_secs
        .map(Duration::from_secs)
        .unwrap_or(state.rapport.config().allocator.default_duration);

    let allocation = state
        .rapport
        .allocator()
        .allocate(&SubjectId::from(resource), caller.id, duration)
        .await?;
    Ok(Json(AllocationDto::new(allocation, caller.username)))
}

/// Release a resource the caller holds
#[utoipa::path(
    delete,
    path = "/api/allocations/{resource}",
    tag = "allocations",
    params(("resource" = String, Path, description = "Resource identifier")),
    responses(
        (status = 204, description = "Resource released, or it was free"),
        (status = 409, description = "Held by another user", body = crate::error::ErrorResponse),
    )
)]
pub async fn release(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(resource): Path<String>,
) -> ServerResult<StatusCode> {
    state
        .rapport
        .allocator()
        .deallocate_if_held(&SubjectId::from(resource), caller.id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
