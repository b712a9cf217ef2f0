use super::entities::{submission, user, Submission, User};
use super::is_unique_violation;
use crate::domain::Role;
use sea_orm::sea_query::Expr;
use sea_orm::{
    entity::*, query::*, DatabaseConnection, DbErr, PaginatorTrait, TransactionTrait,
};

#[derive(Debug)]
pub enum CreateOutcome {
    Created(user::Model),
    UsernameTaken,
}

#[derive(Clone)]
pub struct UserRepository {
    db: DatabaseConnection,
}

impl UserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<user::Model>, DbErr> {
        User::find_by_id(id).one(&self.db).await
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<user::Model>, DbErr> {
        User::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await
    }

    pub async fn list(&self) -> Result<Vec<user::Model>, DbErr> {
        User::find()
            .order_by_asc(user::Column::Username)
            .all(&self.db)
            .await
    }

    pub async fn create(
        &self,
        username: &str,
        password_hash: String,
        role: Role,
    ) -> Result<CreateOutcome, DbErr> {
        let inserted = user::ActiveModel {
            username: Set(username.to_string()),
            password_hash: Set(password_hash),
            role: Set(role.as_str().to_string()),
            logged_in: Set(false),
            voted: Set(false),
            created_at: Set(chrono::Utc::now()),
            ..Default::default()
        }
        .insert(&self.db)
        .await;

        match inserted {
            Ok(model) => Ok(CreateOutcome::Created(model)),
            Err(err) if is_unique_violation(&err) => Ok(CreateOutcome::UsernameTaken),
            Err(err) => Err(err),
        }
    }

    pub async fn set_logged_in(&self, id: i32, logged_in: bool) -> Result<bool, DbErr> {
        let result = User::update_many()
            .col_expr(user::Column::LoggedIn, Expr::value(logged_in))
            .filter(user::Column::Id.eq(id))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    /// Deletes the user's submissions, then the user, in one transaction.
    ///
    /// Returns the number of submissions removed, or `None` when the user does not exist.
    pub async fn delete_with_submissions(&self, id: i32) -> Result<Option<u64>, DbErr> {
        let txn = self.db.begin().await?;

        let removed = Submission::delete_many()
            .filter(submission::Column::UserId.eq(id))
            .exec(&txn)
            .await?
            .rows_affected;

        let deleted = User::delete_by_id(id).exec(&txn).await?.rows_affected;
        if deleted == 0 {
            txn.rollback().await?;
            return Ok(None);
        }

        txn.commit().await?;
        Ok(Some(removed))
    }

    pub async fn count(&self) -> Result<u64, DbErr> {
        User::find().count(&self.db).await
    }

    pub async fn count_logged_in(&self) -> Result<u64, DbErr> {
        User::find()
            .filter(user::Column::LoggedIn.eq(true))
            .count(&self.db)
            .await
    }

    pub async fn count_voted(&self) -> Result<u64, DbErr> {
        User::find()
            .filter(user::Column::Voted.eq(true))
            .count(&self.db)
            .await
    }
}
