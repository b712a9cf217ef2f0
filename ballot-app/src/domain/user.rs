use super::Role;
use ballot_errors::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const MIN_USERNAME_LEN: usize = 3;
const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i32,
    pub username: String,
    pub role: Role,
    pub logged_in: bool,
    pub voted: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    #[serde(default = "default_role")]
    pub role: Role,
}

fn default_role() -> Role {
    Role::User
}

impl NewUser {
    pub fn validate(self) -> Result<Self, AppError> {
        let username = self.username.trim().to_string();
        if username.is_empty() || self.password.is_empty() {
            return Err(AppError::validation("Username and password are required"));
        }
        if username.chars().count() < MIN_USERNAME_LEN {
            return Err(AppError::validation(format!(
                "Username must be at least {MIN_USERNAME_LEN} characters long"
            )));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters long"
            )));
        }
        Ok(Self { username, ..self })
    }
}
