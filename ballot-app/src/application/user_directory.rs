use crate::domain::{LiveEvent, NewUser, User};
use crate::infrastructure::db::{CreateOutcome, UserRepository};
use crate::infrastructure::live::Notifier;
use crate::infrastructure::security::hash_password;
use ballot_errors::AppError;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedUser {
    pub id: i32,
    pub username: String,
    pub submissions_removed: u64,
}

pub struct UserDirectory {
    users: UserRepository,
    notifier: Notifier,
}

impl UserDirectory {
    pub fn new(users: UserRepository, notifier: Notifier) -> Self {
        Self { users, notifier }
    }

    pub async fn list(&self) -> Result<Vec<User>, AppError> {
        Ok(self
            .users
            .list()
            .await?
            .into_iter()
            .map(User::from)
            .collect())
    }

    pub async fn add(&self, new_user: NewUser) -> Result<User, AppError> {
        let new_user = new_user.validate()?;
        let hash = hash_password(new_user.password).await?;

        match self.users.create(&new_user.username, hash, new_user.role).await? {
            CreateOutcome::Created(model) => {
                tracing::info!("Created {} account {}", new_user.role, model.username);
                Ok(User::from(model))
            }
            CreateOutcome::UsernameTaken => {
                tracing::debug!("Username {} already exists", new_user.username);
                Err(AppError::UsernameTaken)
            }
        }
    }

    /// Removes the user together with every ballot they cast.
    ///
    /// Tallies of past polls shrink accordingly.
    pub async fn delete(&self, id: i32) -> Result<DeletedUser, AppError> {
        let row = self
            .users
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("User".into()))?;

        let submissions_removed = self
            .users
            .delete_with_submissions(id)
            .await?
            .ok_or_else(|| AppError::NotFound("User".into()))?;

        tracing::info!(
            "Deleted user {} ({} vote records removed)",
            row.username,
            submissions_removed
        );
        if row.logged_in {
            self.notifier.publish(LiveEvent::ForceLogout {
                user_id: id,
                username: row.username.clone(),
            });
        }

        Ok(DeletedUser {
            id,
            username: row.username,
            submissions_removed,
        })
    }
}
