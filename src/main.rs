//! Turf backend service
//!
//! Entry point for the horse-race prediction backend. Starts the REST API,
//! runs database migrations, and launches the background loops (odds sync,
//! notification dispatch, cleanup, training checks).

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info};
use turf_backend::config::AppConfig;
use turf_backend::database::{create_pool, run_migrations};
use turf_backend::error::{AppError, AppResult};
use turf_backend::routes::build_router;
use turf_backend::tasks::{CleanupTask, NotificationDispatchTask, OddsSyncTask, TrainingTask};
use turf_backend::AppState;

#[tokio::main]
async fn main() -> AppResult<()> {
    // Load environment variables first
    dotenv::dotenv().ok();

    // Load configuration
    let config = AppConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        AppError::Config(e)
    })?;

    // Initialize tracing/logging with config
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "turf_backend={},sqlx=warn,tower_http=info",
                    config.log_level
                )
                .into()
            }),
        )
        .init();

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║            Turf Backend Service Starting                  ║");
    info!("╚══════════════════════════════════════════════════════════╝");
    info!("Environment: {}", config.environment);
    info!("Log level: {}", config.log_level);
    info!("HTTP port: {}", config.http_port);

    // =========================================================================
    // DATABASE SETUP
    // =========================================================================
    info!("Connecting to database...");

    let pool = create_pool(&config.database).await.map_err(|e| {
        error!("Failed to create database pool: {}", e);
        AppError::Database(e)
    })?;

    info!("Database connection pool created");
    info!("Max connections: {}", config.database.max_connections);

    info!("Running database migrations...");
    run_migrations(&pool, None).await.map_err(|e| {
        error!("Database migration failed: {}", e);
        AppError::Database(e)
    })?;
    info!("Database migrations completed");

    // =========================================================================
    // APPLICATION STATE
    // =========================================================================
    let state = Arc::new(AppState::new(pool, config));
    info!("✓ Application state initialized");

    // =========================================================================
    // BACKGROUND TASKS
    // =========================================================================
    info!("Starting background tasks...");

    let sync_interval = state.config.tasks.odds_sync_interval_secs;
    let sync_task = OddsSyncTask::new(
        Arc::clone(&state.course_repo),
        Arc::clone(&state.simulation_repo),
        Arc::clone(&state.notification_repo),
        Arc::clone(&state.feed_client),
        Arc::clone(&state.registry),
        Duration::from_secs(sync_interval),
    );
    tokio::spawn(sync_task.start());
    info!("✓ Odds sync task started ({}s interval)", sync_interval);

    let dispatch_interval = state.config.tasks.notification_dispatch_interval_secs;
    let dispatch_task = NotificationDispatchTask::new(
        Arc::clone(&state.notification_service),
        Arc::clone(&state.registry),
        Duration::from_secs(dispatch_interval),
    );
    tokio::spawn(dispatch_task.start());
    info!(
        "✓ Notification dispatch task started ({}s interval)",
        dispatch_interval
    );

    let cleanup_interval = state.config.tasks.cleanup_interval_secs;
    let cleanup_task = CleanupTask::new(
        Arc::clone(&state.token_repo),
        Arc::clone(&state.notification_repo),
        Arc::clone(&state.simulation_repo),
        Arc::clone(&state.subscription_repo),
        Arc::clone(&state.user_repo),
        Arc::clone(&state.registry),
        Duration::from_secs(cleanup_interval),
    );
    tokio::spawn(cleanup_task.start());
    info!("✓ Cleanup task started ({}s interval)", cleanup_interval);

    let training_interval = state.config.tasks.training_check_interval_secs;
    let training_task = TrainingTask::new(
        Arc::clone(&state.prediction_service),
        Arc::clone(&state.model_client),
        Arc::clone(&state.registry),
        Duration::from_secs(training_interval),
    );
    tokio::spawn(training_task.start());
    info!(
        "✓ Training check task started ({}s interval)",
        training_interval
    );

    // =========================================================================
    // HTTP SERVER
    // =========================================================================
    let router = build_router(Arc::clone(&state));
    let addr: SocketAddr = format!("0.0.0.0:{}", state.config.http_port)
        .parse()
        .map_err(|e| AppError::Config(format!("Invalid HTTP address: {}", e)))?;

    info!("Starting HTTP server on {}...", addr);
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Message(format!("Failed to bind HTTP server: {}", e)))?;

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| AppError::Message(format!("HTTP server error: {}", e)))?;

    info!("Server stopped");
    Ok(())
}

/// Wait for ctrl-c or SIGTERM so in-flight requests can drain
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                futures::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = futures::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("Shutdown signal received");
}
