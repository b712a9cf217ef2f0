use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid {key} value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub database_max_connections: u32,
    pub admin: AdminCredentials,
    pub session_ttl_hours: i64,
    pub cookie_secure: bool,
    pub seed_demo_data: bool,
    pub static_dir: Option<PathBuf>,
    /// Browser origin allowed to call the API with credentials, for a separately served frontend.
    pub cors_origin: Option<String>,
}

impl AppConfig {
    /// Reads the process environment. The binary loads `.env` into it before calling this.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let admin = AdminCredentials {
            username: load_secret(&lookup, "ADMIN_USER", "admin"),
            password: load_secret(&lookup, "ADMIN_PASS", "admin123"),
        };

        Ok(Self {
            host: try_load(&lookup, "HOST", "0.0.0.0")?,
            port: try_load(&lookup, "PORT", "3000")?,
            database_url: try_load(&lookup, "DATABASE_URL", "sqlite://data/votes.db?mode=rwc")?,
            database_max_connections: try_load(&lookup, "DATABASE_MAX_CONNECTIONS", "10")?,
            admin,
            session_ttl_hours: try_load(&lookup, "SESSION_TTL_HOURS", "24")?,
            cookie_secure: try_load(&lookup, "COOKIE_SECURE", "false")?,
            seed_demo_data: try_load(&lookup, "SEED_DEMO_DATA", "false")?,
            static_dir: lookup("STATIC_DIR")
                .filter(|dir| !dir.trim().is_empty())
                .map(PathBuf::from),
            cors_origin: lookup("CORS_ORIGIN").filter(|origin| !origin.trim().is_empty()),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn try_load<T, F>(lookup: &F, key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(key).unwrap_or_else(|| {
        tracing::info!("{key} not set, using default: {default}");
        default.to_string()
    });

    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        value: value.clone(),
        reason: e.to_string(),
    })
}

fn load_secret<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).unwrap_or_else(|| {
        tracing::warn!("{key} not set, falling back to the built-in default. Change it before deploying");
        default.to_string()
    })
}
