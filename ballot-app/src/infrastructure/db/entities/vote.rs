use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One poll round. `options_json` holds the ordered option labels as a JSON array.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "votes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    #[sea_orm(column_type = "Text")]
    pub options_json: String,
    pub max_selections: i32,
    pub active: bool,
    pub anonymous: bool,
    pub created_at: DateTimeUtc,
    pub ended_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::submission::Entity")]
    Submissions,
}

impl Related<super::submission::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Submissions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for crate::domain::Poll {
    type Error = ballot_errors::AppError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let options = serde_json::from_str(&model.options_json).map_err(|e| {
            ballot_errors::AppError::internal(format!("corrupt options for vote {}: {e}", model.id))
        })?;
        Ok(Self {
            id: model.id,
            title: model.title,
            description: model.description,
            options,
            max_selections: u32::try_from(model.max_selections).unwrap_or(1),
            anonymous: model.anonymous,
            active: model.active,
            created_at: model.created_at,
            ended_at: model.ended_at,
        })
    }
}
