pub mod entities;
mod migrations;
mod poll_repository;
mod seed;
mod submission_repository;
mod user_repository;

pub use migrations::{run_migrations, SCHEMA_VERSION};
pub use poll_repository::PollRepository;
pub use seed::{seed_initial_data, SeedOptions};
pub use submission_repository::{RecordOutcome, SubmissionRepository};
pub use user_repository::{CreateOutcome, UserRepository};

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr, SqlErr};
use std::path::Path;
use std::time::Duration;

pub async fn create_connection(
    database_url: &str,
    max_connections: u32,
) -> Result<DatabaseConnection, DbErr> {
    ensure_sqlite_dir(database_url)?;

    let mut opt = ConnectOptions::new(database_url);
    opt.max_connections(max_connections)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(10))
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(600))
        .sqlx_logging(false);

    Database::connect(opt).await
}

/// A private in-memory SQLite database with the schema applied.
///
/// Pinned to one pooled connection: every SQLite memory connection is its own database.
pub async fn connect_in_memory() -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);

    let db = Database::connect(opt).await?;
    run_migrations(&db).await?;
    Ok(db)
}

/// SQLite creates the database file on demand but not its parent directory.
fn ensure_sqlite_dir(database_url: &str) -> Result<(), DbErr> {
    let Some(path) = database_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let path = path.split('?').next().unwrap_or_default();
    if path.is_empty() || path.starts_with(':') {
        return Ok(());
    }

    match Path::new(path).parent() {
        Some(dir) if !dir.as_os_str().is_empty() => std::fs::create_dir_all(dir)
            .map_err(|e| DbErr::Custom(format!("cannot create {}: {e}", dir.display()))),
        _ => Ok(()),
    }
}

pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}
