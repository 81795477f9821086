//! Mission API server entry point.

use std::sync::{Arc, Mutex};

use mission_core::clock::SystemClock;
use mission_core::platform::MessagingPlatform;
use mission_core::repository::ResourceRepository;
use mission_core::rng::{DeterministicRng, OsSeededRng};
use mission_discord::DiscordPlatform;
use mission_orchestrator::coordinator::MissionCoordinator;
use mission_store::fs_resource_repository::FsResourceRepository;
use mission_store::pg_resource_repository::PgResourceRepository;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use mission_api::config::AppConfig;
use mission_api::error::AppError;
use mission_api::state::AppState;
use mission_api::telemetry;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let otlp_endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok();
    let provider = telemetry::init(otlp_endpoint.as_deref())?;

    let result = run().await;
    if let Err(e) = &result {
        tracing::error!(error = %e, "server stopped with an error");
    }

    telemetry::shutdown(provider);
    result
}

async fn run() -> Result<(), AppError> {
    info!("Starting mission API server");

    let config = AppConfig::from_env()?;
    info!(config = ?config, "configuration loaded");

    let repo: Arc<dyn ResourceRepository> = match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(url)
                .await?;
            let repo = PgResourceRepository::new(pool);
            repo.ensure_schema().await?;
            info!("using PostgreSQL resource store");
            Arc::new(repo)
        }
        None => {
            info!(data_dir = %config.data_dir.display(), "using filesystem resource store");
            Arc::new(FsResourceRepository::new(&config.data_dir))
        }
    };
    let platform: Arc<dyn MessagingPlatform> = Arc::new(DiscordPlatform::new(
        &config.discord_token,
        &config.discord_api_base,
    )?);
    let rng: Arc<Mutex<dyn DeterministicRng + Send>> = Arc::new(Mutex::new(OsSeededRng::new()));

    let coordinator = Arc::new(MissionCoordinator::new(
        repo,
        platform,
        Arc::new(SystemClock),
        rng,
        config.topology.clone(),
    ));
    if let Err(e) = coordinator.load_topologies().await {
        warn!(error = %e, "channel groups not preloaded; they load on first use");
    }

    // TODO: Replace CorsLayer::permissive() with restricted origins for production.
    let app = mission_api::app(AppState::new(coordinator))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = config.socket_addr()?;
    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "could not listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
