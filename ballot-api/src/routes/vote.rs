use crate::extract::RequireVoter;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use ballot_app::application::VoteStatus;
use ballot_app::AppContext;
use ballot_errors::AppError;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Deserialize)]
pub struct SubmitRequest {
    choices: Vec<String>,
}

pub async fn current_vote(State(ctx): State<AppContext>) -> Result<Json<Value>, AppError> {
    let vote = ctx.lifecycle.current_poll().await?;
    Ok(Json(json!({ "vote": vote })))
}

pub async fn submit_vote(
    State(ctx): State<AppContext>,
    voter: RequireVoter,
    payload: Result<Json<SubmitRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(request) = payload?;

    let submission = ctx
        .lifecycle
        .submit(voter.user_id, &voter.username, request.choices)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Vote submitted successfully",
        "submission": submission,
    })))
}

pub async fn user_vote_status(
    State(ctx): State<AppContext>,
    voter: RequireVoter,
) -> Result<Json<VoteStatus>, AppError> {
    Ok(Json(ctx.lifecycle.vote_status(voter.user_id).await?))
}
