use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use ballot_app::domain::{Identity, SessionUser};
use ballot_app::AppContext;
use ballot_errors::AppError;
use tower_sessions::Session;

pub const SESSION_USER_KEY: &str = "user";

/// The caller's identity, re-checked against the database. Never rejects.
pub struct CurrentIdentity {
    pub identity: Identity,
    pub session: Session,
}

/// A caller bound to a user row: a voter, or an admin account that has one.
pub struct RequireVoter {
    pub user_id: i32,
    pub username: String,
}

pub struct RequireAdmin {
    pub identity: Identity,
}

impl<S> FromRequestParts<S> for CurrentIdentity
where
    AppContext: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ctx = AppContext::from_ref(state);
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, message)| AppError::internal(message))?;

        let stored: Option<SessionUser> = session
            .get(SESSION_USER_KEY)
            .await
            .map_err(AppError::internal)?;
        let had_session = stored.is_some();

        let identity = ctx.sessions.resolve(stored).await?;
        if had_session && identity == Identity::Anonymous {
            session.flush().await.map_err(AppError::internal)?;
        }

        Ok(Self { identity, session })
    }
}

impl<S> FromRequestParts<S> for RequireVoter
where
    AppContext: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let current = CurrentIdentity::from_request_parts(parts, state).await?;
        let (user_id, username) = current.identity.require_voter()?;
        Ok(Self {
            user_id,
            username: username.to_string(),
        })
    }
}

impl<S> FromRequestParts<S> for RequireAdmin
where
    AppContext: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let current = CurrentIdentity::from_request_parts(parts, state).await?;
        current.identity.require_admin()?;
        Ok(Self {
            identity: current.identity,
        })
    }
}
