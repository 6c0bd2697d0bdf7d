//! Persistence for snapshots, history and review ratings.
//!
//! The services only see the `StockStore` and `HistoryStore` traits. The
//! Postgres repositories back production; the in-memory stores back
//! embedded use and the test suite.

pub mod history_repository;
pub mod memory;
pub mod review_repository;
pub mod stock_repository;

// Re-export all repositories for convenient access
pub use history_repository::HistoryRepository;
pub use memory::{InMemoryHistoryStore, InMemoryReviews, InMemoryStockStore};
pub use review_repository::ReviewRepository;
pub use stock_repository::StockRepository;

use crate::error::RepositoryError;
use crate::models::{HistoryPoint, MovieStock, PriceUpdate, StockFilter, StockStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Current snapshot per stock
#[async_trait]
pub trait StockStore: Send + Sync {
    /// Admit a new stock (seeding and imports)
    async fn insert(&self, stock: &MovieStock) -> Result<MovieStock, RepositoryError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<MovieStock>, RepositoryError>;

    async fn list(&self, filter: &StockFilter) -> Result<Vec<MovieStock>, RepositoryError>;

    /// Stocks with `status`, oldest `last_updated` first
    async fn find_stalest(
        &self,
        status: StockStatus,
        limit: i64,
    ) -> Result<Vec<MovieStock>, RepositoryError>;

    /// Write `update` only if the stored `last_updated` still equals
    /// `expected_last_updated`.
    ///
    /// Returns `Ok(None)` when another writer got there first. The stored
    /// `last_updated` never moves backwards.
    async fn compare_and_update(
        &self,
        id: &str,
        expected_last_updated: DateTime<Utc>,
        update: &PriceUpdate,
    ) -> Result<Option<MovieStock>, RepositoryError>;
}

/// Append-only price trail
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn append(
        &self,
        movie_id: &str,
        price: Decimal,
        recorded_at: DateTime<Utc>,
    ) -> Result<HistoryPoint, RepositoryError>;

    /// Delete points with `recorded_at` strictly before `cutoff`
    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, RepositoryError>;

    async fn count(&self) -> Result<i64, RepositoryError>;

    async fn count_older_than(&self, cutoff: DateTime<Utc>) -> Result<i64, RepositoryError>;

    /// Oldest and newest `recorded_at`
    async fn time_range(
        &self,
    ) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>), RepositoryError>;

    /// Points for one stock in ascending `recorded_at` order
    async fn find_by_movie(
        &self,
        movie_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<HistoryPoint>, RepositoryError>;

    /// Distinct stock ids that have at least one point
    async fn movie_ids_with_history(&self) -> Result<Vec<String>, RepositoryError>;
}
