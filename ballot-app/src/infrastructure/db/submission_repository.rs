use super::entities::{submission, user, vote, Submission, User, Vote};
use super::is_unique_violation;
use sea_orm::sea_query::Expr;
use sea_orm::{
    entity::*, query::*, DatabaseConnection, DbErr, TransactionTrait,
};

#[derive(Debug)]
pub enum RecordOutcome {
    Recorded(submission::Model),
    /// The `(user_id, vote_id)` unique index rejected the insert.
    Duplicate,
    /// The vote stopped being active before the ballot could be recorded.
    PollClosed,
}

#[derive(Clone)]
pub struct SubmissionRepository {
    db: DatabaseConnection,
}

impl SubmissionRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find(
        &self,
        user_id: i32,
        vote_id: i32,
    ) -> Result<Option<submission::Model>, DbErr> {
        Submission::find()
            .filter(submission::Column::UserId.eq(user_id))
            .filter(submission::Column::VoteId.eq(vote_id))
            .one(&self.db)
            .await
    }

    /// Inserts the ballot and flips the user's `voted` flag in one transaction.
    ///
    /// The insert is the transaction's first statement, so SQLite takes the write lock before
    /// reading anything and concurrent callers queue on the busy timeout. The unique index
    /// decides duplicates, so two racing calls for the same user and vote yield exactly one
    /// `Recorded`.
    pub async fn record(
        &self,
        user_id: i32,
        vote_id: i32,
        choices: &[String],
    ) -> Result<RecordOutcome, DbErr> {
        let choices_json =
            serde_json::to_string(choices).map_err(|e| DbErr::Json(e.to_string()))?;

        let txn = self.db.begin().await?;

        let inserted = submission::ActiveModel {
            user_id: Set(user_id),
            vote_id: Set(vote_id),
            choices_json: Set(choices_json),
            submitted_at: Set(chrono::Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await;

        let model = match inserted {
            Ok(model) => model,
            Err(err) if is_unique_violation(&err) => {
                txn.rollback().await?;
                return Ok(RecordOutcome::Duplicate);
            }
            Err(err) => return Err(err),
        };

        let still_active = Vote::find_by_id(vote_id)
            .filter(vote::Column::Active.eq(true))
            .one(&txn)
            .await?
            .is_some();
        if !still_active {
            txn.rollback().await?;
            return Ok(RecordOutcome::PollClosed);
        }

        User::update_many()
            .col_expr(user::Column::Voted, Expr::value(true))
            .filter(user::Column::Id.eq(user_id))
            .exec(&txn)
            .await?;

        txn.commit().await?;
        Ok(RecordOutcome::Recorded(model))
    }

    pub async fn for_vote(&self, vote_id: i32) -> Result<Vec<submission::Model>, DbErr> {
        Submission::find()
            .filter(submission::Column::VoteId.eq(vote_id))
            .order_by_asc(submission::Column::SubmittedAt)
            .order_by_asc(submission::Column::Id)
            .all(&self.db)
            .await
    }

    /// Submissions in recording order, each joined with its voter row.
    pub async fn for_vote_with_voters(
        &self,
        vote_id: i32,
    ) -> Result<Vec<(submission::Model, Option<user::Model>)>, DbErr> {
        Submission::find()
            .filter(submission::Column::VoteId.eq(vote_id))
            .find_also_related(User)
            .order_by_asc(submission::Column::SubmittedAt)
            .order_by_asc(submission::Column::Id)
            .all(&self.db)
            .await
    }
}
