//! Vote endpoints

use std::sync::Arc;

use axum::{
    Extension,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use rapport::models::SubjectId;
use rapport::votes::VoteChoice;

use crate::{
    api::{
        caller::Caller,
        dto::{VoteStatusDto, VoteTallyDto},
    },
    error::ServerResult,
    state::AppState,
};

/// The caller's vote on a post
#[utoipa::path(
    get,
    path = "/api/vote/status/{post}",
    tag = "votes",
    params(("post" = String, Path, description = "Post identifier")),
    responses(
        (status = 200, description = "The caller's vote, if any", body = VoteStatusDto),
    )
)]
pub async fn vote_status(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(post): Path<String>,
) -> ServerResult<Json<VoteStatusDto>> {
    let vote = state
        .rapport
        .votes()
        .get_vote(&SubjectId::from(post.as_str()), caller.id)
        .await?;
    Ok(Json(VoteStatusDto::new(&post, vote)))
}

/// Upvote a post
#[utoipa::path(
    put,
    path = "/api/vote/upvote/{post}",
    tag = "votes",
    params(("post" = String, Path, description = "Post identifier")),
    responses(
        (status = 200, description = "Vote recorded", body = VoteStatusDto),
    )
)]
pub async fn upvote(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(post): Path<String>,
) -> ServerResult<Json<VoteStatusDto>> {
    cast(&state, &caller, &post, VoteChoice::Upvote).await
}

/// Downvote a post
#[utoipa::path(
    put,
    path = "/api/vote/downvote/{post}",
    tag = "votes",
    params(("post" = String, Path, description = "Post identifier")),
    responses(
        (status = 200, description = "Vote recorded", body = VoteStatusDto),
    )
)]
pub async fn downvote(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(post): Path<String>,
) -> ServerResult<Json<VoteStatusDto>> {
    cast(&state, &caller, &post, VoteChoice::Downvote).await
}

/// Remove the caller's vote
#[utoipa::path(
    put,
    path = "/api/vote/unvote/{post}",
    tag = "votes",
    params(("post" = String, Path, description = "Post identifier")),
    responses(
        (status = 204, description = "Vote removed, or there was none"),
    )
)]
pub async fn unvote(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(post): Path<String>,
) -> ServerResult<StatusCode> {
    state
        .rapport
        .votes()
        .remove_vote(&SubjectId::from(post), caller.id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Vote tally of a post
#[utoipa::path(
    get,
    path = "/api/vote/tally/{post}",
    tag = "votes",
    params(("post" = String, Path, description = "Post identifier")),
    responses(
        (status = 200, description = "Vote tally", body = VoteTallyDto),
    )
)]
pub async fn tally(
    State(state): State<Arc<AppState>>,
    Path(post): Path<String>,
) -> ServerResult<Json<VoteTallyDto>> {
    let tally = state
        .rapport
        .votes()
        .tally(&SubjectId::from(post.as_str()))
        .await?;
    Ok(Json(VoteTallyDto::new(&post, tally)))
}

async fn cast(
    state: &AppState,
    caller: &Caller,
    post: &str,
    choice: VoteChoice,
) -> ServerResult<Json<VoteStatusDto>> {
    state
        .rapport
        .votes()
        .set_vote(choice, &SubjectId::from(post), caller.id)
        .await?;
    Ok(Json(VoteStatusDto::new(post, Some(choice))))
}
