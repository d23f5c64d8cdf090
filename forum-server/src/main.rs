use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Duration;
use tracing::info;

mod application;
mod data;
mod domain;
mod infrastructure;
mod presentation;
mod server;

use application::auth_service::AuthService;
use application::post_service::PostService;
use application::session_manager::SessionManager;
use application::verification_manager::VerificationManager;
use data::repositories::postgres::post_repository::PostgresPostRepository;
use data::repositories::postgres::user_repository::PostgresUserRepository;
use infrastructure::code_dispatch::LogCodeDispatcher;
use infrastructure::database::{create_pool, run_migrations};
use infrastructure::ephemeral_store::{EphemeralStore, spawn_sweeper};
use infrastructure::logging::init_logging;
use infrastructure::settings::Settings;
use presentation::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let settings = Settings::from_env()?;

    init_logging(&settings.log_level)?;

    let pool = create_pool(&settings.database_url, settings.database_max_connections).await?;
    run_migrations(&pool).await?;

    let sessions = Arc::new(SessionManager::new(
        Arc::new(EphemeralStore::new()),
        ttl("SESSION_TTL_SECS", settings.session_ttl_secs)?,
        ttl("SESSION_REMEMBER_TTL_SECS", settings.session_remember_ttl_secs)?,
    ));
    let codes = Arc::new(VerificationManager::new(
        Arc::new(EphemeralStore::new()),
        ttl("VERIFICATION_CODE_TTL_SECS", settings.verification_code_ttl_secs)?,
    ));

    let sweep_every = std::time::Duration::from_secs(settings.store_sweep_interval_secs);
    let sweepers = [
        spawn_sweeper("sessions", sessions.store(), sweep_every),
        spawn_sweeper("verification_codes", codes.store(), sweep_every),
    ];

    let auth_service = Arc::new(AuthService::new(
        PostgresUserRepository::new(pool.clone()),
        sessions.clone(),
        codes,
        Arc::new(LogCodeDispatcher),
    ));
    let post_service = Arc::new(PostService::new(
        PostgresPostRepository::new(pool.clone()),
        PostgresUserRepository::new(pool.clone()),
    ));

    let state = AppState::new(pool.clone(), auth_service, post_service);

    info!("forum server starting");
    let result = server::run_http(&settings, state).await;

    for sweeper in sweepers {
        sweeper.abort();
    }
    pool.close().await;

    result
}

fn ttl(key: &str, secs: i64) -> Result<Duration> {
    Duration::try_seconds(secs).with_context(|| format!("{key} is out of range"))
}
