use crate::extract::{CurrentIdentity, SESSION_USER_KEY};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use ballot_app::application::SessionStatus;
use ballot_app::domain::Identity;
use ballot_app::AppContext;
use ballot_errors::AppError;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    username: String,
    password: String,
    #[serde(default)]
    is_admin: bool,
}

pub async fn login(
    State(ctx): State<AppContext>,
    CurrentIdentity { identity, session }: CurrentIdentity,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(request) = payload?;

    // A browser switching accounts releases the one it was holding.
    if identity != Identity::Anonymous {
        ctx.sessions.deauthenticate(&identity).await?;
    }

    let user = ctx
        .sessions
        .authenticate(&request.username, &request.password, request.is_admin)
        .await?;

    session.cycle_id().await.map_err(AppError::internal)?;
    session
        .insert(SESSION_USER_KEY, &user)
        .await
        .map_err(AppError::internal)?;

    let status = ctx.sessions.status(&Identity::from(user)).await?;
    Ok(Json(json!({
        "success": true,
        "user": status.user,
        "message": "Login successful",
    })))
}

pub async fn logout(
    State(ctx): State<AppContext>,
    CurrentIdentity { identity, session }: CurrentIdentity,
) -> Result<Json<Value>, AppError> {
    if identity == Identity::Anonymous {
        return Err(AppError::Unauthenticated);
    }

    ctx.sessions.deauthenticate(&identity).await?;
    session.flush().await.map_err(AppError::internal)?;

    Ok(Json(json!({ "success": true, "message": "Logout successful" })))
}

pub async fn session_status(
    State(ctx): State<AppContext>,
    CurrentIdentity { identity, .. }: CurrentIdentity,
) -> Result<Json<SessionStatus>, AppError> {
    Ok(Json(ctx.sessions.status(&identity).await?))
}
