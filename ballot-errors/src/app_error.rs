use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Maximum {max} selections allowed")]
    TooManyChoices { max: u32 },

    #[error("Invalid vote option selected: {0}")]
    InvalidChoice(String),

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Admin privileges required")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(String),

    #[error("No active vote")]
    NoActivePoll,

    #[error("You have already voted")]
    AlreadySubmitted,

    #[error("This account is already logged in from another device")]
    AlreadyLoggedIn,

    #[error("Username already exists")]
    UsernameTaken,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn internal(detail: impl std::fmt::Display) -> Self {
        Self::Internal(detail.to_string())
    }

    /// The text that is safe to show to a client.
    pub fn user_message(&self) -> String {
        match self {
            Self::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

#[cfg(feature = "db")]
impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        AppError::Internal(err.to_string())
    }
}

#[cfg(feature = "http")]
mod http_impl {
    use super::AppError;
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};
    use axum::Json;

    #[derive(serde::Serialize)]
    struct ErrorResponse {
        error: String,
    }

    impl AppError {
        pub fn status_code(&self) -> StatusCode {
            match self {
                AppError::Validation(_)
                | AppError::TooManyChoices { .. }
                | AppError::InvalidChoice(_) => StatusCode::BAD_REQUEST,
                AppError::Unauthenticated | AppError::InvalidCredentials => {
                    StatusCode::UNAUTHORIZED
                }
                AppError::Forbidden => StatusCode::FORBIDDEN,
                AppError::NotFound(_) => StatusCode::NOT_FOUND,
                AppError::NoActivePoll
                | AppError::AlreadySubmitted
                | AppError::AlreadyLoggedIn
                | AppError::UsernameTaken => StatusCode::CONFLICT,
                AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            }
        }
    }

    impl IntoResponse for AppError {
        fn into_response(self) -> Response {
            let status = self.status_code();
            if let AppError::Internal(detail) = &self {
                tracing::error!("Request failed: {}", detail);
            }
            (status, Json(ErrorResponse { error: self.user_message() })).into_response()
        }
    }

    impl From<axum::extract::rejection::JsonRejection> for AppError {
        fn from(rejection: axum::extract::rejection::JsonRejection) -> Self {
            AppError::Validation(rejection.body_text())
        }
    }

    impl From<axum::extract::rejection::PathRejection> for AppError {
        fn from(rejection: axum::extract::rejection::PathRejection) -> Self {
            AppError::Validation(rejection.body_text())
        }
    }

    impl From<axum::extract::rejection::QueryRejection> for AppError {
        fn from(rejection: axum::extract::rejection::QueryRejection) -> Self {
            AppError::Validation(rejection.body_text())
        }
    }
}
