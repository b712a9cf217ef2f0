use axum::http::{header::CONTENT_TYPE, HeaderValue, Method};
use axum::routing::{delete, get, post};
use axum::Router;
use ballot_app::AppContext;
use std::time::Duration;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tower_sessions::cookie::SameSite;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

pub mod extract;
pub mod routes;

use routes::{admin, auth, health, live, vote};

pub const SESSION_COOKIE: &str = "ballot.sid";

pub fn router(ctx: AppContext) -> Router {
    let config = ctx.config.clone();

    let sessions = SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE)
        .with_http_only(true)
        .with_same_site(SameSite::Lax)
        .with_secure(config.cookie_secure)
        .with_expiry(Expiry::OnInactivity(time::Duration::hours(
            config.session_ttl_hours,
        )));

    let admin_routes = Router::new()
        .route("/start-vote", post(admin::start_vote))
        .route("/end-vote", post(admin::end_vote))
        .route("/users", get(admin::users))
        .route("/logout-user", post(admin::logout_user))
        .route("/all-votes", get(admin::all_votes))
        .route("/vote-details/{id}", get(admin::vote_details))
        .route("/results", get(admin::results))
        .route("/export", get(admin::export))
        .route("/add-user", post(admin::add_user))
        .route("/delete-user/{id}", delete(admin::delete_user))
        .route("/dashboard", get(admin::dashboard));

    let api = Router::new()
        .route("/health", get(health::health))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/session", get(auth::session_status))
        .route("/current-vote", get(vote::current_vote))
        .route("/submit-vote", post(vote::submit_vote))
        .route("/user-vote-status", get(vote::user_vote_status))
        .route("/live", get(live::live_socket))
        .nest("/admin", admin_routes);

    let mut app = Router::new().nest("/api", api);

    if let Some(dir) = &config.static_dir {
        tracing::info!("Serving frontend from {}", dir.display());
        let index = ServeFile::new(dir.join("index.html"));
        app = app.fallback_service(ServeDir::new(dir).fallback(index));
    }

    if let Some(origin) = &config.cors_origin {
        match origin.parse::<HeaderValue>() {
            Ok(origin) => {
                let cors = CorsLayer::new()
                    .allow_origin(origin)
                    .allow_methods([Method::GET, Method::POST, Method::DELETE])
                    .allow_headers([CONTENT_TYPE])
                    .allow_credentials(true)
                    .max_age(Duration::from_secs(60 * 60));
                app = app.layer(cors);
            }
            Err(_) => tracing::warn!("Ignoring invalid CORS_ORIGIN {:?}", origin),
        }
    }

    app.layer(sessions)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}
