//! Movie Stock Engine Service
//!
//! Main entry point for the movie stock price engine.
//! This service provides:
//! - HTTP API for price refresh, listings, charts and retention
//! - Background tasks for history pruning and batch price refresh

use movie_stock_engine::database::{create_pool, run_migrations};
use movie_stock_engine::http_service::MarketHttpService;
use movie_stock_engine::models::StockFilter;
use movie_stock_engine::repositories::StockStore;
use movie_stock_engine::services::{BatchRefresher, RetentionSweeper};
use movie_stock_engine::{AppConfig, AppError, AppResult, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

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
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("movie_stock_engine={},sqlx=warn", config.log_level).into()
    });
    if config.json_logs() {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║           Movie Stock Engine Starting                     ║");
    info!("╚══════════════════════════════════════════════════════════╝");
    info!("Environment: {}", config.environment);
    info!("Log level: {}", config.log_level);
    info!("HTTP port: {}", config.http_port);
    info!(
        "Staleness threshold: {}s",
        config.market.staleness_threshold_secs
    );

    // =========================================================================
    // DATABASE SETUP
    // =========================================================================
    info!("Connecting to database...");

    let pool = create_pool(&config.database).await.map_err(|e| {
        error!("Failed to create database pool: {}", e);
        AppError::Database(e)
    })?;

    info!("Database connection pool created successfully");
    info!("Max connections: {}", config.database.max_connections);

    // Run migrations
    info!("Running database migrations...");
    run_migrations(&pool, None).await.map_err(|e| {
        error!("Database migration failed: {}", e);
        AppError::Database(e)
    })?;

    info!("Database migrations completed successfully");

    // =========================================================================
    // CORE SERVICES INITIALIZATION
    // =========================================================================
    info!("Initializing core services...");

    let app_state = Arc::new(AppState::new(pool, config.market.clone())?);
    info!("✓ Application state initialized with repositories");

    if config.market.tmdb_api_key.is_none() {
        warn!("TMDB_API_KEY not set - hype index will stay neutral");
    }
    if config.market.cron_secret.is_none() {
        warn!("CRON_SECRET not set - prune endpoint is unauthenticated");
    }

    if config.market.backfill_history_on_start {
        let stocks = app_state.stocks.list(&StockFilter::default()).await?;
        let report = app_state.ledger.backfill_initial(&stocks).await?;
        info!(
            "✓ History backfill: {} inserted, {} already tracked",
            report.inserted, report.skipped
        );
    }

    // =========================================================================
    // BACKGROUND TASKS
    // =========================================================================
    info!("Starting background tasks...");

    let retention_handle = match config.market.prune_interval() {
        Some(interval) => {
            let sweeper = RetentionSweeper::new(app_state.ledger.clone())
                .with_retention(config.market.history_retention())
                .with_interval(interval);
            info!("✓ Retention sweeper started ({:?} interval)", interval);
            Some(tokio::spawn(async move {
                sweeper.start().await;
            }))
        }
        None => {
            warn!("PRUNE_INTERVAL_SECS is 0 - relying on the prune endpoint");
            None
        }
    };

    let refresher_handle = match config.market.batch_refresh_interval() {
        Some(interval) => {
            let refresher = BatchRefresher::new(app_state.stocks.clone(), app_state.gate.clone())
                .with_batch_size(config.market.batch_refresh_size)
                .with_interval(interval);
            info!("✓ Batch refresher started ({:?} interval)", interval);
            Some(tokio::spawn(async move {
                refresher.start().await;
            }))
        }
        None => {
            warn!("BATCH_REFRESH_INTERVAL_SECS is 0 - prices refresh on read only");
            None
        }
    };

    // =========================================================================
    // START SERVER
    // =========================================================================
    let http_addr: SocketAddr = format!("0.0.0.0:{}", config.http_port)
        .parse()
        .map_err(|e| AppError::Config(format!("Invalid HTTP address: {}", e)))?;

    info!("Starting HTTP server on {}...", http_addr);

    let listener = TcpListener::bind(http_addr)
        .await
        .map_err(|e| AppError::Message(format!("Failed to bind HTTP server: {}", e)))?;
    let router = MarketHttpService::new(app_state.clone()).into_router();

    let http_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            error!("HTTP server error: {}", e);
        }
    });

    // =========================================================================
    // READY
    // =========================================================================
    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║           Movie Stock Engine Ready!                       ║");
    info!("╠══════════════════════════════════════════════════════════╣");
    info!("║  HTTP API:     0.0.0.0:{}                              ║", config.http_port);
    info!("║  Environment:  {}                                    ║", config.environment);
    info!("╚══════════════════════════════════════════════════════════╝");
    info!("Press Ctrl+C to shutdown gracefully");

    // =========================================================================
    // SHUTDOWN HANDLING
    // =========================================================================
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received, shutting down gracefully...");
        }
        _ = http_handle => {
            error!("HTTP server exited unexpectedly");
        }
        _ = async {
            match retention_handle {
                Some(handle) => { handle.await.ok(); }
                None => futures::future::pending::<()>().await,
            }
        } => {
            error!("Retention sweeper exited unexpectedly");
        }
        _ = async {
            match refresher_handle {
                Some(handle) => { handle.await.ok(); }
                None => futures::future::pending::<()>().await,
            }
        } => {
            error!("Batch refresher exited unexpectedly");
        }
    }

    info!("Movie stock engine shutdown complete");
    Ok(())
}
