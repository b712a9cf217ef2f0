use super::entities::{submission, user, vote, Submission, User, Vote};
use crate::domain::NewPoll;
use sea_orm::sea_query::Expr;
use sea_orm::{entity::*, query::*, DatabaseConnection, DbErr, TransactionTrait};
use std::collections::HashMap;

#[derive(Clone)]
pub struct PollRepository {
    db: DatabaseConnection,
}

impl PollRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Ends any active vote, clears every user's `voted` flag and inserts the new vote as the
    /// active one, all in one transaction.
    pub async fn start(&self, new_poll: &NewPoll) -> Result<vote::Model, DbErr> {
        let options_json = serde_json::to_string(&new_poll.options)
            .map_err(|e| DbErr::Json(e.to_string()))?;
        let now = chrono::Utc::now();

        let txn = self.db.begin().await?;

        let superseded = Vote::update_many()
            .col_expr(vote::Column::Active, Expr::value(false))
            .col_expr(vote::Column::EndedAt, Expr::value(Some(now)))
            .filter(vote::Column::Active.eq(true))
            .exec(&txn)
            .await?
            .rows_affected;

        User::update_many()
            .col_expr(user::Column::Voted, Expr::value(false))
            .exec(&txn)
            .await?;

        let created = vote::ActiveModel {
            title: Set(new_poll.title.clone()),
            description: Set(new_poll.description.clone()),
            options_json: Set(options_json),
            max_selections: Set(new_poll.max_selections as i32),
            active: Set(true),
            anonymous: Set(new_poll.anonymous),
            created_at: Set(now),
            ended_at: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        if superseded > 0 {
            tracing::info!("Vote {} superseded the previously active vote", created.id);
        }
        Ok(created)
    }

    /// Marks the active vote as ended. Returns `false` when nothing was active.
    pub async fn end_active(&self) -> Result<bool, DbErr> {
        let result = Vote::update_many()
            .col_expr(vote::Column::Active, Expr::value(false))
            .col_expr(vote::Column::EndedAt, Expr::value(Some(chrono::Utc::now())))
            .filter(vote::Column::Active.eq(true))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn find_active(&self) -> Result<Option<vote::Model>, DbErr> {
        Vote::find()
            .filter(vote::Column::Active.eq(true))
            .order_by_desc(vote::Column::CreatedAt)
            .order_by_desc(vote::Column::Id)
            .one(&self.db)
            .await
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<vote::Model>, DbErr> {
        Vote::find_by_id(id).one(&self.db).await
    }

    /// The most recently created vote. Whenever a vote is active, this is it.
    pub async fn latest(&self) -> Result<Option<vote::Model>, DbErr> {
        Vote::find()
            .order_by_desc(vote::Column::CreatedAt)
            .order_by_desc(vote::Column::Id)
            .one(&self.db)
            .await
    }

    /// Votes newest first, optionally capped, each paired with its submission count.
    pub async fn list_with_counts(
        &self,
        limit: Option<u64>,
    ) -> Result<Vec<(vote::Model, u64)>, DbErr> {
        let votes = Vote::find()
            .order_by_desc(vote::Column::CreatedAt)
            .order_by_desc(vote::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await?;

        let counts: HashMap<i32, i64> = Submission::find()
            .select_only()
            .column(submission::Column::VoteId)
            .column_as(Expr::col(submission::Column::Id).count(), "submissions")
            .group_by(submission::Column::VoteId)
            .into_tuple::<(i32, i64)>()
            .all(&self.db)
            .await?
            .into_iter()
            .collect();

        Ok(votes
            .into_iter()
            .map(|v| {
                let count = counts.get(&v.id).copied().unwrap_or(0).max(0) as u64;
                (v, count)
            })
            .collect())
    }
}
