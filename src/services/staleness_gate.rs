use crate::error::{AppError, AppResult};
use crate::models::{MovieStock, PriceChange, PriceUpdate, StockStatus};
use crate::pricing;
use crate::repositories::StockStore;
use crate::services::{HistoryLedger, IndexAggregator};
use chrono::{SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Why a refresh did or did not commit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshReason {
    /// Snapshot younger than the threshold
    Fresh,
    /// Status excluded from recomputation
    StatusSkipped,
    /// Another caller committed first
    LostRace,
    Committed,
}

/// Result of one refresh attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshOutcome {
    pub updated: bool,
    pub reason: RefreshReason,
    pub stock: MovieStock,
    #[serde(rename = "priceChange", skip_serializing_if = "Option::is_none")]
    pub price_change: Option<PriceChange>,
}

impl RefreshOutcome {
    fn unchanged(reason: RefreshReason, stock: MovieStock) -> Self {
        Self {
            updated: false,
            reason,
            stock,
            price_change: None,
        }
    }
}

/// Lazy, race-safe price refresh.
///
/// Reads the snapshot, recomputes only when it is older than the threshold,
/// and commits with a compare-and-swap on `last_updated`. Of several callers
/// that read the same stale snapshot exactly one commits; the rest get the
/// winner's snapshot back with `updated: false`.
pub struct StalenessGate {
    stocks: Arc<dyn StockStore>,
    aggregator: Arc<IndexAggregator>,
    ledger: Arc<HistoryLedger>,
    threshold: chrono::Duration,
    recompute_statuses: Vec<StockStatus>,
}

impl StalenessGate {
    /// Create a gate with a one hour threshold that recomputes every status
    pub fn new(
        stocks: Arc<dyn StockStore>,
        aggregator: Arc<IndexAggregator>,
        ledger: Arc<HistoryLedger>,
    ) -> Self {
        Self {
            stocks,
            aggregator,
            ledger,
            threshold: chrono::Duration::hours(1),
            recompute_statuses: StockStatus::ALL.to_vec(),
        }
    }

    /// Set the staleness threshold
    pub fn with_threshold(mut self, threshold: chrono::Duration) -> Self {
        self.threshold = threshold;
        self
    }

    /// Restrict which statuses may be recomputed
    pub fn with_recompute_statuses(mut self, statuses: Vec<StockStatus>) -> Self {
        self.recompute_statuses = statuses;
        self
    }

    pub fn threshold(&self) -> chrono::Duration {
        self.threshold
    }

    /// Refresh with the configured threshold
    pub async fn refresh(&self, movie_id: &str) -> AppResult<RefreshOutcome> {
        self.refresh_with_threshold(movie_id, self.threshold).await
    }

    /// Recompute regardless of age; still subject to the optimistic commit
    pub async fn force_refresh(&self, movie_id: &str) -> AppResult<RefreshOutcome> {
        self.run(movie_id, None).await
    }

    /// Refresh a stock if its snapshot is at least `threshold` old
    pub async fn refresh_with_threshold(
        &self,
        movie_id: &str,
        threshold: chrono::Duration,
    ) -> AppResult<RefreshOutcome> {
        self.run(movie_id, Some(threshold)).await
    }

    /// `None` skips the age check entirely, which also covers snapshots
    /// stamped ahead of the local clock
    async fn run(
        &self,
        movie_id: &str,
        threshold: Option<chrono::Duration>,
    ) -> AppResult<RefreshOutcome> {
        let stock = self
            .stocks
            .find_by_id(movie_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Stock {} not found", movie_id)))?;

        let now = Utc::now().trunc_subsecs(6);
        if threshold.is_some_and(|threshold| !stock.is_stale(now, threshold)) {
            debug!("Stock {} is fresh, skipping recompute", movie_id);
            return Ok(RefreshOutcome::unchanged(RefreshReason::Fresh, stock));
        }

        if !self.recompute_statuses.contains(&stock.status_enum()) {
            debug!("Stock {} has status {}, skipping recompute", movie_id, stock.status);
            return Ok(RefreshOutcome::unchanged(RefreshReason::StatusSkipped, stock));
        }

        let indices = self.aggregator.aggregate(&stock).await;
        let blended = pricing::blend(stock.current_price, &indices);

        let candidate = PriceUpdate {
            current_price: blended.new_price,
            price_change_24h: blended.price_change_24h,
            hype_index: indices.hype,
            box_office_index: indices.box_office,
            wom_index: indices.wom,
            // Every commit moves the stamp strictly forward
            last_updated: now.max(stock.last_updated + chrono::Duration::microseconds(1)),
        };

        let committed = self
            .stocks
            .compare_and_update(&stock.id, stock.last_updated, &candidate)
            .await?;

        let committed = match committed {
            Some(committed) => committed,
            None => {
                debug!("Lost refresh race for {}, discarding candidate", movie_id);
                let current = self
                    .stocks
                    .find_by_id(movie_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("Stock {} not found", movie_id)))?;
                return Ok(RefreshOutcome::unchanged(RefreshReason::LostRace, current));
            }
        };

        // The snapshot is committed; a failed append only costs a chart point
        if let Err(e) = self
            .ledger
            .append(&committed.id, committed.current_price, committed.last_updated)
            .await
        {
            error!("Failed to append history point for {}: {}", committed.id, e);
        }

        info!(
            movie_id = %committed.id,
            old_price = %stock.current_price,
            new_price = %committed.current_price,
            change_24h = %committed.price_change_24h,
            "Stock price updated"
        );

        Ok(RefreshOutcome {
            updated: true,
            reason: RefreshReason::Committed,
            price_change: Some(PriceChange {
                old: stock.current_price,
                new: committed.current_price,
                change_24h: committed.price_change_24h,
            }),
            stock: committed,
        })
    }
}
