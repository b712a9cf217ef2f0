use crate::extract::RequireAdmin;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ballot_app::application::{
    Dashboard, DeletedUser, ExportFormat, PollResults, PollSummary, VoteDetails,
};
use ballot_app::domain::{NewPoll, NewUser, User};
use ballot_app::AppContext;
use ballot_errors::AppError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutUserRequest {
    user_id: i32,
}

#[derive(Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    format: ExportFormat,
}

#[derive(Serialize)]
pub struct UsersResponse {
    users: Vec<User>,
}

#[derive(Serialize)]
pub struct VotesResponse {
    votes: Vec<PollSummary>,
}

pub async fn start_vote(
    State(ctx): State<AppContext>,
    _admin: RequireAdmin,
    payload: Result<Json<NewPoll>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(new_poll) = payload?;
    let vote = ctx.lifecycle.start_poll(new_poll).await?;

    Ok(Json(json!({
        "success": true,
        "vote": vote,
        "message": "Vote started successfully",
    })))
}

pub async fn end_vote(
    State(ctx): State<AppContext>,
    _admin: RequireAdmin,
) -> Result<Json<Value>, AppError> {
    ctx.lifecycle.end_poll().await?;
    Ok(Json(json!({ "success": true, "message": "Vote ended successfully" })))
}

pub async fn users(
    State(ctx): State<AppContext>,
    _admin: RequireAdmin,
) -> Result<Json<UsersResponse>, AppError> {
    Ok(Json(UsersResponse {
        users: ctx.users.list().await?,
    }))
}

pub async fn logout_user(
    State(ctx): State<AppContext>,
    admin: RequireAdmin,
    payload: Result<Json<LogoutUserRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(request) = payload?;
    let user = ctx.sessions.force_logout(request.user_id).await?;
    tracing::debug!(
        "{} forced logout of {}",
        admin.identity.username().unwrap_or_default(),
        user.username
    );

    Ok(Json(json!({
        "success": true,
        "message": format!("User {} logged out successfully", user.username),
    })))
}

pub async fn all_votes(
    State(ctx): State<AppContext>,
    _admin: RequireAdmin,
) -> Result<Json<VotesResponse>, AppError> {
    Ok(Json(VotesResponse {
        votes: ctx.reports.all_votes().await?,
    }))
}

pub async fn vote_details(
    State(ctx): State<AppContext>,
    _admin: RequireAdmin,
    id: Result<Path<i32>, PathRejection>,
) -> Result<Json<VoteDetails>, AppError> {
    let Path(id) = id?;
    Ok(Json(ctx.reports.vote_details(id).await?))
}

pub async fn results(
    State(ctx): State<AppContext>,
    _admin: RequireAdmin,
) -> Result<Json<PollResults>, AppError> {
    Ok(Json(ctx.reports.results().await?))
}

pub async fn export(
    State(ctx): State<AppContext>,
    _admin: RequireAdmin,
    query: Result<Query<ExportQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(query) = query?;
    let export = ctx.reports.export(query.format).await?;

    let disposition = format!("attachment; filename=\"{}\"", export.filename);
    Ok((
        [
            (header::CONTENT_TYPE, export.content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        export.body,
    )
        .into_response())
}

pub async fn add_user(
    State(ctx): State<AppContext>,
    _admin: RequireAdmin,
    payload: Result<Json<NewUser>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(new_user) = payload?;
    let user = ctx.users.add(new_user).await?;

    Ok(Json(json!({
        "success": true,
        "userId": user.id,
        "user": user,
        "message": "User created successfully",
    })))
}

pub async fn delete_user(
    State(ctx): State<AppContext>,
    _admin: RequireAdmin,
    id: Result<Path<i32>, PathRejection>,
) -> Result<Json<Value>, AppError> {
    let Path(id) = id?;
    let DeletedUser {
        username,
        submissions_removed,
        ..
    } = ctx.users.delete(id).await?;

    Ok(Json(json!({
        "success": true,
        "submissionsRemoved": submissions_removed,
        "message": format!(
            "User \"{username}\" deleted successfully ({submissions_removed} vote records removed)"
        ),
    })))
}

pub async fn dashboard(
    State(ctx): State<AppContext>,
    _admin: RequireAdmin,
) -> Result<Json<Dashboard>, AppError> {
    Ok(Json(ctx.reports.dashboard().await?))
}
