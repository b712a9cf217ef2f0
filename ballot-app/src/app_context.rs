use crate::application::{PollLifecycle, Reports, SessionGuard, UserDirectory};
use crate::config::AppConfig;
use crate::infrastructure::db::{
    self, PollRepository, SeedOptions, SubmissionRepository, UserRepository,
};
use crate::infrastructure::live::{Notifier, PresenceRegistry};
use ballot_errors::AppError;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppContext {
    pub sessions: Arc<SessionGuard>,
    pub lifecycle: Arc<PollLifecycle>,
    pub users: Arc<UserDirectory>,
    pub reports: Arc<Reports>,
    pub notifier: Notifier,
    pub presence: PresenceRegistry,
    pub config: Arc<AppConfig>,
}

impl AppContext {
    pub fn new(db: DatabaseConnection, config: AppConfig) -> Self {
        let notifier = Notifier::new();
        let presence = PresenceRegistry::new();
        let polls = PollRepository::new(db.clone());
        let users = UserRepository::new(db.clone());
        let submissions = SubmissionRepository::new(db);

        let lifecycle = Arc::new(PollLifecycle::new(
            polls.clone(),
            submissions,
            users.clone(),
            notifier.clone(),
        ));

        Self {
            sessions: Arc::new(SessionGuard::new(
                users.clone(),
                config.admin.clone(),
                notifier.clone(),
                presence.clone(),
            )),
            users: Arc::new(UserDirectory::new(users.clone(), notifier.clone())),
            reports: Arc::new(Reports::new(
                lifecycle.clone(),
                polls,
                users,
                presence.clone(),
            )),
            lifecycle,
            notifier,
            presence,
            config: Arc::new(config),
        }
    }

    /// Connects, migrates and seeds the configured database.
    pub async fn initialize(config: AppConfig) -> Result<Self, AppError> {
        let conn = db::create_connection(&config.database_url, config.database_max_connections)
            .await?;
        tracing::info!("Database connected");

        db::run_migrations(&conn).await?;
        db::seed_initial_data(
            &conn,
            SeedOptions {
                admin: &config.admin,
                demo_data: config.seed_demo_data,
            },
        )
        .await?;

        Ok(Self::new(conn, config))
    }

    /// A fresh in-memory database, migrated and seeded with the configured admin only.
    pub async fn in_memory(config: AppConfig) -> Result<Self, AppError> {
        let conn = db::connect_in_memory().await?;
        db::seed_initial_data(
            &conn,
            SeedOptions {
                admin: &config.admin,
                demo_data: config.seed_demo_data,
            },
        )
        .await?;

        Ok(Self::new(conn, config))
    }
}
