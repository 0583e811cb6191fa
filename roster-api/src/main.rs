//! # Roster API Server
//!
//! Account registration and multi-scheme authentication over HTTP.
//!
//! ## Usage
//!
//! ```bash
//! JWT_SECRET=... DATABASE_URL=postgres://... cargo run -p roster-api
//! STORAGE_BACKEND=memory JWT_SECRET=... cargo run -p roster-api
//! ```

use std::sync::Arc;
use std::time::Duration;

use roster_api::{
    app::{build_router, AppState},
    config::{Config, LogFormat, StorageBackend},
};
use roster_shared::{
    auth::service::AuthService,
    db::{
        migrations::{ensure_database_exists, get_migration_status, run_migrations},
        pool::{close_pool, create_pool},
    },
    store::Stores,
};
use sqlx::PgPool;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "roster_api=debug,roster_shared=info,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
    }
}

/// Opens the configured backend; the pool is returned for shutdown
async fn open_stores(config: &Config) -> anyhow::Result<(Stores, Option<PgPool>)> {
    match config.storage.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; accounts are lost on restart");
            Ok((Stores::memory(), None))
        }
        StorageBackend::Postgres => {
            let db_config = config
                .database_config()
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is required for Postgres storage"))?;

            ensure_database_exists(&db_config.url).await?;
            let pool = create_pool(db_config).await?;
            run_migrations(&pool).await?;

            let status = get_migration_status(&pool).await?;
            tracing::info!(
                applied = status.applied_migrations,
                latest = ?status.latest_version,
                up_to_date = status.is_up_to_date,
                "Database schema ready"
            );

            Ok((Stores::postgres(pool.clone()), Some(pool)))
        }
    }
}

/// Periodically drops expired sessions and long-inactive API keys
fn spawn_session_purge(auth: Arc<AuthService>, every: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if let Err(e) = auth.purge_expired_sessions().await {
                tracing::warn!(error = %e, "Session purge failed");
            }
            if let Err(e) = auth.purge_inactive_api_keys().await {
                tracing::warn!(error = %e, "API key purge failed");
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing(config.log.format);

    tracing::info!("Roster API Server v{} starting...", env!("CARGO_PKG_VERSION"));
    tracing::info!(providers = ?config.auth.providers, "Enabled auth providers");

    let (stores, pool) = open_stores(&config).await?;
    let purge_every = Duration::from_secs(config.auth.session_purge_interval_secs);
    let address = config.bind_address();

    let state = AppState::build(config, stores)?;
    spawn_session_purge(state.auth.clone(), purge_every);

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!("Server listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(pool) = pool {
        close_pool(pool).await;
    }

    tracing::info!("Server stopped");
    Ok(())
}
