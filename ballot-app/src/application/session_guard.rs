use crate::config::AdminCredentials;
use crate::domain::{Identity, LiveEvent, Role, SessionUser, User};
use crate::infrastructure::db::UserRepository;
use crate::infrastructure::live::{Notifier, PresenceRegistry};
use crate::infrastructure::security::{secrets_match, verify_password};
use ballot_errors::AppError;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i32>,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voted: Option<bool>,
    pub is_admin: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<SessionInfo>,
}

/// Logins, logouts and the mapping from a stored session to a live [`Identity`].
///
/// A session bound to a user row is honoured only while that row exists with `logged_in`
/// set, so force-logout and deletion take effect on the holder's next request.
pub struct SessionGuard {
    users: UserRepository,
    admin: AdminCredentials,
    notifier: Notifier,
    presence: PresenceRegistry,
}

impl SessionGuard {
    pub fn new(
        users: UserRepository,
        admin: AdminCredentials,
        notifier: Notifier,
        presence: PresenceRegistry,
    ) -> Self {
        Self {
            users,
            admin,
            notifier,
            presence,
        }
    }

    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
        wants_admin: bool,
    ) -> Result<SessionUser, AppError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(AppError::validation("Username and password are required"));
        }

        if wants_admin {
            return self.authenticate_admin(username, password).await;
        }

        let user = self.verified_user(username, password).await?;
        if user.logged_in && user.role == Role::User {
            tracing::warn!("Refused second login for {}", user.username);
            return Err(AppError::AlreadyLoggedIn);
        }

        self.users.set_logged_in(user.id, true).await?;
        tracing::info!("User {} logged in", user.username);
        self.notifier.publish(LiveEvent::UserLoggedIn {
            username: user.username.clone(),
        });

        Ok(SessionUser {
            user_id: Some(user.id),
            username: user.username,
            role: user.role,
        })
    }

    /// The configured superuser first, then any row with the admin role.
    ///
    /// Admin rows skip the single-session check so one account can watch from several screens,
    /// and logging out of one screen leaves the row's `logged_in` flag set for the others.
    async fn authenticate_admin(
        &self,
        username: &str,
        password: &str,
    ) -> Result<SessionUser, AppError> {
        let username_ok = secrets_match(username, &self.admin.username);
        let password_ok = secrets_match(password, &self.admin.password);
        if username_ok && password_ok {
            tracing::info!("Admin {} logged in", username);
            return Ok(SessionUser {
                user_id: None,
                username: username.to_string(),
                role: Role::Admin,
            });
        }

        let user = self.verified_user(username, password).await?;
        if user.role != Role::Admin {
            tracing::warn!("Admin login refused for non-admin {}", user.username);
            return Err(AppError::InvalidCredentials);
        }

        self.users.set_logged_in(user.id, true).await?;
        tracing::info!("Admin {} logged in", user.username);

        Ok(SessionUser {
            user_id: Some(user.id),
            username: user.username,
            role: Role::Admin,
        })
    }

    async fn verified_user(&self, username: &str, password: &str) -> Result<User, AppError> {
        let Some(row) = self.users.find_by_username(username).await? else {
            tracing::debug!("Login attempt for unknown user {}", username);
            return Err(AppError::InvalidCredentials);
        };

        if !verify_password(password.to_string(), row.password_hash.clone()).await? {
            tracing::debug!("Wrong password for {}", username);
            return Err(AppError::InvalidCredentials);
        }

        Ok(User::from(row))
    }

    /// Clears the voter's `logged_in` flag. Admin sessions only end the calling screen;
    /// `force_logout` is what ends every screen of an admin row.
    pub async fn deauthenticate(&self, identity: &Identity) -> Result<(), AppError> {
        let username = identity.username().unwrap_or_default().to_string();
        let Some(user_id) = identity.user_id() else {
            return Ok(());
        };

        if identity.is_admin() {
            tracing::info!("Admin {} closed a session", username);
            return Ok(());
        }

        self.users.set_logged_in(user_id, false).await?;
        tracing::info!("User {} logged out", username);
        self.notifier.publish(LiveEvent::UserLoggedOut { username });
        Ok(())
    }

    pub async fn force_logout(&self, user_id: i32) -> Result<User, AppError> {
        let row = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User".into()))?;

        self.users.set_logged_in(user_id, false).await?;
        tracing::info!(
            "Forced logout of {} ({} live connections)",
            row.username,
            self.presence.connections_for(user_id)
        );
        self.notifier.publish(LiveEvent::ForceLogout {
            user_id,
            username: row.username.clone(),
        });

        Ok(User {
            logged_in: false,
            ..User::from(row)
        })
    }

    /// Re-checks a stored session against the database.
    pub async fn resolve(&self, session: Option<SessionUser>) -> Result<Identity, AppError> {
        let Some(session) = session else {
            return Ok(Identity::Anonymous);
        };

        let Some(user_id) = session.user_id else {
            return Ok(Identity::from(session));
        };

        let identity = match self.users.find_by_id(user_id).await? {
            Some(row) if row.logged_in => {
                let user = User::from(row);
                Identity::from(SessionUser {
                    user_id: Some(user.id),
                    username: user.username,
                    role: user.role,
                })
            }
            Some(_) => {
                tracing::debug!("Session for {} outlived its login", session.username);
                Identity::Anonymous
            }
            None => {
                tracing::debug!("Session for deleted user {}", session.username);
                Identity::Anonymous
            }
        };
        Ok(identity)
    }

    pub async fn status(&self, identity: &Identity) -> Result<SessionStatus, AppError> {
        let user = match identity {
            Identity::Anonymous => None,
            Identity::Admin {
                user_id: None,
                username,
            } => Some(SessionInfo {
                id: None,
                username: username.clone(),
                voted: None,
                is_admin: true,
            }),
            Identity::Voter { user_id, .. }
            | Identity::Admin {
                user_id: Some(user_id),
                ..
            } => self.users.find_by_id(*user_id).await?.map(|row| SessionInfo {
                id: Some(row.id),
                username: row.username,
                voted: Some(row.voted),
                is_admin: identity.is_admin(),
            }),
        };

        Ok(SessionStatus {
            authenticated: user.is_some(),
            user,
        })
    }
}
