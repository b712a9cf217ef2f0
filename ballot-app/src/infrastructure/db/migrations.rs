use super::entities::{submission, Submission, User, Vote};
use sea_orm::sea_query::{Alias, ColumnDef, Index, Query, Table};
use sea_orm::{
    ConnectionTrait, DatabaseConnection, DbErr, Schema, Statement, TransactionTrait,
};
use std::collections::HashSet;

/// Highest migration version this build knows about.
pub const SCHEMA_VERSION: i32 = 2;

const MIGRATIONS_TABLE: &str = "schema_migrations";

const MIGRATIONS: &[(i32, &str)] = &[(1, "initial_schema"), (2, "single_active_vote")];

/// Applies every migration not yet recorded in `schema_migrations`, each in its own transaction.
pub async fn run_migrations(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();

    let bookkeeping = Table::create()
        .table(Alias::new(MIGRATIONS_TABLE))
        .if_not_exists()
        .col(
            ColumnDef::new(Alias::new("version"))
                .integer()
                .not_null()
                .primary_key(),
        )
        .col(ColumnDef::new(Alias::new("name")).string().not_null())
        .col(ColumnDef::new(Alias::new("applied_at")).string().not_null())
        .to_owned();
    db.execute(backend.build(&bookkeeping)).await?;

    let applied = applied_versions(db).await?;

    for &(version, name) in MIGRATIONS {
        if applied.contains(&version) {
            continue;
        }

        let txn = db.begin().await?;
        apply(&txn, version).await?;

        let record = Query::insert()
            .into_table(Alias::new(MIGRATIONS_TABLE))
            .columns([Alias::new("version"), Alias::new("name"), Alias::new("applied_at")])
            .values([
                version.into(),
                name.into(),
                chrono::Utc::now().to_rfc3339().into(),
            ])
            .map_err(|e| DbErr::Custom(e.to_string()))?
            .to_owned();
        txn.execute(backend.build(&record)).await?;
        txn.commit().await?;

        tracing::info!("Applied migration {:03}_{}", version, name);
    }

    Ok(())
}

async fn applied_versions(db: &DatabaseConnection) -> Result<HashSet<i32>, DbErr> {
    let backend = db.get_database_backend();
    let query = Query::select()
        .column(Alias::new("version"))
        .from(Alias::new(MIGRATIONS_TABLE))
        .to_owned();

    db.query_all(backend.build(&query))
        .await?
        .iter()
        .map(|row| row.try_get::<i32>("", "version"))
        .collect()
}

async fn apply<C: ConnectionTrait>(conn: &C, version: i32) -> Result<(), DbErr> {
    let backend = conn.get_database_backend();
    let schema = Schema::new(backend);

    match version {
        1 => {
            conn.execute(backend.build(&schema.create_table_from_entity(User)))
                .await?;
            conn.execute(backend.build(&schema.create_table_from_entity(Vote)))
                .await?;
            conn.execute(backend.build(&schema.create_table_from_entity(Submission)))
                .await?;

            let one_ballot_per_poll = Index::create()
                .name("idx_submissions_user_vote")
                .table(Submission)
                .col(submission::Column::UserId)
                .col(submission::Column::VoteId)
                .unique()
                .to_owned();
            conn.execute(backend.build(&one_ballot_per_poll)).await?;
        }
        2 => {
            // Partial unique index: the store itself refuses a second active vote.
            conn.execute(Statement::from_string(
                backend,
                "CREATE UNIQUE INDEX idx_votes_single_active ON votes (active) WHERE active",
            ))
            .await?;
        }
        other => return Err(DbErr::Migration(format!("unknown migration version {other}"))),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::db::connect_in_memory;

    #[tokio::test]
    async fn test_migrations_are_recorded_once() {
        let db = connect_in_memory().await.unwrap();

        run_migrations(&db).await.unwrap();

        let applied = applied_versions(&db).await.unwrap();
        assert_eq!(applied.len(), MIGRATIONS.len());
        assert!(applied.contains(&SCHEMA_VERSION));
    }
}
