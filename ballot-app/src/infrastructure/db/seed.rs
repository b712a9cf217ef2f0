use super::entities::{vote, Vote};
use super::{CreateOutcome, UserRepository};
use crate::config::AdminCredentials;
use crate::domain::Role;
use crate::infrastructure::security::hash_password;
use ballot_errors::AppError;
use sea_orm::{entity::*, DatabaseConnection, PaginatorTrait};

const DEMO_VOTERS: &[(&str, &str)] = &[
    ("student1", "password1"),
    ("student2", "password2"),
    ("student3", "password3"),
    ("student4", "password4"),
    ("student5", "password5"),
    ("teacher1", "teacher123"),
    ("teacher2", "teacher456"),
    ("alice", "alice123"),
    ("bob", "bob123"),
    ("charlie", "charlie123"),
];

const SAMPLE_OPTIONS: &[&str] = &["Alice Johnson", "Bob Smith", "Charlie Davis", "Diana Wilson"];

pub struct SeedOptions<'a> {
    pub admin: &'a AdminCredentials,
    pub demo_data: bool,
}

/// First-run data. Only touches an empty `users` table, so restarts are no-ops.
pub async fn seed_initial_data(
    db: &DatabaseConnection,
    options: SeedOptions<'_>,
) -> Result<(), AppError> {
    let users = UserRepository::new(db.clone());
    if users.count().await? > 0 {
        return Ok(());
    }

    tracing::info!("Empty database, seeding admin account {}", options.admin.username);
    let hash = hash_password(options.admin.password.clone()).await?;
    users.create(&options.admin.username, hash, Role::Admin).await?;

    if !options.demo_data {
        return Ok(());
    }

    for (username, password) in DEMO_VOTERS {
        let hash = hash_password(password.to_string()).await?;
        if let CreateOutcome::UsernameTaken = users.create(username, hash, Role::User).await? {
            tracing::warn!("Demo user {} already exists, skipping", username);
        }
    }
    tracing::info!("Created {} demo users", DEMO_VOTERS.len());

    if Vote::find().count(db).await? == 0 {
        let options_json = serde_json::to_string(SAMPLE_OPTIONS).map_err(AppError::internal)?;
        vote::ActiveModel {
            title: Set("Class President Election".to_string()),
            description: Set(Some(
                "Vote for your preferred candidate for class president".to_string(),
            )),
            options_json: Set(options_json),
            max_selections: Set(1),
            active: Set(false),
            anonymous: Set(false),
            created_at: Set(chrono::Utc::now()),
            ended_at: Set(None),
            ..Default::default()
        }
        .insert(db)
        .await?;
        tracing::info!("Created sample vote");
    }

    Ok(())
}
