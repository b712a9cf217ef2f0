use ballot_errors::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(AppError::validation(format!("Invalid role: {other}"))),
        }
    }
}

/// What gets persisted in the cookie session after a successful login.
///
/// `user_id` is `None` only for the configured superuser, which has no row in `users`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub user_id: Option<i32>,
    pub username: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Anonymous,
    Voter { user_id: i32, username: String },
    Admin { user_id: Option<i32>, username: String },
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        matches!(self, Identity::Admin { .. })
    }

    pub fn user_id(&self) -> Option<i32> {
        match self {
            Identity::Anonymous => None,
            Identity::Voter { user_id, .. } => Some(*user_id),
            Identity::Admin { user_id, .. } => *user_id,
        }
    }

    pub fn username(&self) -> Option<&str> {
        match self {
            Identity::Anonymous => None,
            Identity::Voter { username, .. } | Identity::Admin { username, .. } => Some(username),
        }
    }

    /// Voter routes need a user row to attach submissions to. An admin row qualifies,
    /// the configured superuser does not.
    pub fn require_voter(&self) -> Result<(i32, &str), AppError> {
        match self {
            Identity::Anonymous => Err(AppError::Unauthenticated),
            Identity::Voter { user_id, username } => Ok((*user_id, username)),
            Identity::Admin {
                user_id: Some(user_id),
                username,
            } => Ok((*user_id, username)),
            Identity::Admin { user_id: None, .. } => Err(AppError::Forbidden),
        }
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        match self {
            Identity::Anonymous => Err(AppError::Unauthenticated),
            Identity::Voter { .. } => Err(AppError::Forbidden),
            Identity::Admin { .. } => Ok(()),
        }
    }
}

impl From<SessionUser> for Identity {
    fn from(session: SessionUser) -> Self {
        match (session.role, session.user_id) {
            (Role::Admin, user_id) => Identity::Admin {
                user_id,
                username: session.username,
            },
            (Role::User, Some(user_id)) => Identity::Voter {
                user_id,
                username: session.username,
            },
            (Role::User, None) => Identity::Anonymous,
        }
    }
}

impl From<Option<SessionUser>> for Identity {
    fn from(session: Option<SessionUser>) -> Self {
        session.map(Identity::from).unwrap_or(Identity::Anonymous)
    }
}
