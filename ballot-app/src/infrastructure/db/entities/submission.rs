use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// `(user_id, vote_id)` carries a unique index, created by the initial migration.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "submissions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub vote_id: i32,
    #[sea_orm(column_type = "Text")]
    pub choices_json: String,
    pub submitted_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::vote::Entity",
        from = "Column::VoteId",
        to = "super::vote::Column::Id",
        on_delete = "Cascade"
    )]
    Vote,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::vote::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vote.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn choices(&self) -> Result<Vec<String>, ballot_errors::AppError> {
        serde_json::from_str(&self.choices_json).map_err(|e| {
            ballot_errors::AppError::internal(format!("corrupt choices in submission {}: {e}", self.id))
        })
    }
}

impl TryFrom<Model> for crate::domain::Submission {
    type Error = ballot_errors::AppError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            choices: model.choices()?,
            user_id: model.user_id,
            poll_id: model.vote_id,
            submitted_at: model.submitted_at,
        })
    }
}
