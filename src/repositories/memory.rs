//! Embedded stores keeping everything in process memory.
//!
//! The compare-and-swap of `InMemoryStockStore` runs entirely under one
//! write guard, which gives the same one-winner guarantee as the
//! conditional `UPDATE` in Postgres.

use super::{HistoryStore, StockStore};
use crate::error::RepositoryError;
use crate::models::{HistoryPoint, MovieStock, PriceUpdate, StockFilter, StockStatus};
use crate::signals::{RatingSource, SignalError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;

/// Snapshot store keyed by stock id
#[derive(Default)]
pub struct InMemoryStockStore {
    stocks: RwLock<HashMap<String, MovieStock>>,
}

impl InMemoryStockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.stocks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.stocks.read().await.is_empty()
    }
}

#[async_trait]
impl StockStore for InMemoryStockStore {
    async fn insert(&self, stock: &MovieStock) -> Result<MovieStock, RepositoryError> {
        let mut stocks = self.stocks.write().await;
        if stocks.contains_key(&stock.id) {
            return Err(RepositoryError::Duplicate(format!("stock {}", stock.id)));
        }
        stocks.insert(stock.id.clone(), stock.clone());
        Ok(stock.clone())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<MovieStock>, RepositoryError> {
        Ok(self.stocks.read().await.get(id).cloned())
    }

    async fn list(&self, filter: &StockFilter) -> Result<Vec<MovieStock>, RepositoryError> {
        let mut matching: Vec<MovieStock> = self
            .stocks
            .read()
            .await
            .values()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect();
        filter.sort(&mut matching);
        Ok(matching)
    }

    async fn find_stalest(
        &self,
        status: StockStatus,
        limit: i64,
    ) -> Result<Vec<MovieStock>, RepositoryError> {
        let mut matching: Vec<MovieStock> = self
            .stocks
            .read()
            .await
            .values()
            .filter(|s| s.status_enum() == status)
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            a.last_updated
                .cmp(&b.last_updated)
                .then_with(|| a.id.cmp(&b.id))
        });
        matching.truncate(limit.max(0) as usize);
        Ok(matching)
    }

    async fn compare_and_update(
        &self,
        id: &str,
        expected_last_updated: DateTime<Utc>,
        update: &PriceUpdate,
    ) -> Result<Option<MovieStock>, RepositoryError> {
        let mut stocks = self.stocks.write().await;
        let current = match stocks.get_mut(id) {
            Some(stock) => stock,
            None => return Ok(None),
        };

        if current.last_updated != expected_last_updated {
            return Ok(None);
        }

        let mut next = current.with_update(update);
        next.last_updated = update.last_updated.max(current.last_updated);
        *current = next.clone();
        Ok(Some(next))
    }
}

/// Price trail kept in insertion order
pub struct InMemoryHistoryStore {
    points: RwLock<Vec<HistoryPoint>>,
    next_id: AtomicI64,
}

impl Default for InMemoryHistoryStore {
    fn default() -> Self {
        Self {
            points: RwLock::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored point, in insertion order
    pub async fn all(&self) -> Vec<HistoryPoint> {
        self.points.read().await.clone()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn append(
        &self,
        movie_id: &str,
        price: Decimal,
        recorded_at: DateTime<Utc>,
    ) -> Result<HistoryPoint, RepositoryError> {
        let point = HistoryPoint {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            movie_id: movie_id.to_string(),
            price,
            recorded_at,
        };
        self.points.write().await.push(point.clone());
        Ok(point)
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let mut points = self.points.write().await;
        let before = points.len();
        points.retain(|p| p.recorded_at >= cutoff);
        Ok((before - points.len()) as u64)
    }

    async fn count(&self) -> Result<i64, RepositoryError> {
        Ok(self.points.read().await.len() as i64)
    }

    async fn count_older_than(&self, cutoff: DateTime<Utc>) -> Result<i64, RepositoryError> {
        let points = self.points.read().await;
        Ok(points.iter().filter(|p| p.recorded_at < cutoff).count() as i64)
    }

    async fn time_range(
        &self,
    ) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>), RepositoryError> {
        let points = self.points.read().await;
        let oldest = points.iter().map(|p| p.recorded_at).min();
        let newest = points.iter().map(|p| p.recorded_at).max();
        Ok((oldest, newest))
    }

    async fn find_by_movie(
        &self,
        movie_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<HistoryPoint>, RepositoryError> {
        let mut matching: Vec<HistoryPoint> = self
            .points
            .read()
            .await
            .iter()
            .filter(|p| p.movie_id == movie_id)
            .filter(|p| since.map_or(true, |s| p.recorded_at >= s))
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.recorded_at.cmp(&b.recorded_at).then_with(|| a.id.cmp(&b.id)));
        Ok(matching)
    }

    async fn movie_ids_with_history(&self) -> Result<Vec<String>, RepositoryError> {
        let ids: BTreeSet<String> = self
            .points
            .read()
            .await
            .iter()
            .map(|p| p.movie_id.clone())
            .collect();
        Ok(ids.into_iter().collect())
    }
}

/// Review ratings keyed by movie id
#[derive(Default)]
pub struct InMemoryReviews {
    ratings: RwLock<HashMap<String, Vec<Option<Decimal>>>>,
}

impl InMemoryReviews {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_rating(&self, movie_id: &str, rating: Option<Decimal>) {
        self.ratings
            .write()
            .await
            .entry(movie_id.to_string())
            .or_default()
            .push(rating);
    }
}

#[async_trait]
impl RatingSource for InMemoryReviews {
    async fn ratings(&self, movie_id: &str) -> Result<Vec<Option<Decimal>>, SignalError> {
        Ok(self
            .ratings
            .read()
            .await
            .get(movie_id)
            .cloned()
            .unwrap_or_default())
    }
}
