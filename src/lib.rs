//! Movie Stock Engine Library
//!
//! Prices catalogued movies from weighted external signals, refreshes them
//! lazily behind a staleness gate and keeps an append-only price history.
//! This module exposes the engine components for the binary and the tests.

pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod http_service;
pub mod models;
pub mod pricing;
pub mod repositories;
pub mod services;
pub mod signals;

// Re-export commonly used types
pub use config::{AppConfig, MarketConfig};
pub use error::{AppError, AppResult};

use repositories::{HistoryRepository, HistoryStore, ReviewRepository, StockRepository, StockStore};
use services::{HistoryLedger, IndexAggregator, MarketService, StalenessGate};
use signals::{BoxOfficeSource, NeutralBoxOffice, PopularitySource, RatingSource, TmdbClient};
use std::sync::Arc;

/// Application state shared by the HTTP handlers and background tasks
pub struct AppState {
    pub market_config: MarketConfig,
    pub stocks: Arc<dyn StockStore>,
    pub ledger: Arc<HistoryLedger>,
    pub gate: Arc<StalenessGate>,
    pub market: Arc<MarketService>,
    /// Present when backed by Postgres; used by the health check
    pub database: Option<database::Database>,
}

impl AppState {
    /// Wire the engine over arbitrary stores and signal sources
    pub fn from_parts(
        market_config: MarketConfig,
        stocks: Arc<dyn StockStore>,
        history: Arc<dyn HistoryStore>,
        popularity: Arc<dyn PopularitySource>,
        ratings: Arc<dyn RatingSource>,
        box_office: Arc<dyn BoxOfficeSource>,
    ) -> Self {
        let aggregator = Arc::new(
            IndexAggregator::new(popularity, ratings, box_office)
                .with_timeout(market_config.signal_timeout()),
        );
        let ledger = Arc::new(HistoryLedger::new(history));
        let gate = Arc::new(
            StalenessGate::new(stocks.clone(), aggregator, ledger.clone())
                .with_threshold(market_config.staleness_threshold())
                .with_recompute_statuses(market_config.recompute_statuses.clone()),
        );
        let market = Arc::new(MarketService::new(stocks.clone(), ledger.clone()));

        Self {
            market_config,
            stocks,
            ledger,
            gate,
            market,
            database: None,
        }
    }

    /// Production wiring: Postgres stores, TMDB popularity, review ratings
    /// and the neutral box-office strategy
    pub fn new(pool: sqlx::PgPool, market_config: MarketConfig) -> AppResult<Self> {
        let tmdb = TmdbClient::new(
            market_config.tmdb_base_url.clone(),
            market_config.tmdb_api_key.clone(),
            market_config.signal_timeout(),
        )
        .map_err(|e| AppError::Config(format!("Failed to build TMDB client: {}", e)))?;

        let mut state = Self::from_parts(
            market_config,
            Arc::new(StockRepository::new(pool.clone())),
            Arc::new(HistoryRepository::new(pool.clone())),
            Arc::new(tmdb),
            Arc::new(ReviewRepository::new(pool.clone())),
            Arc::new(NeutralBoxOffice),
        );
        state.database = Some(database::Database::new(pool));

        Ok(state)
    }
}
