use crate::error::AppResult;
use crate::models::{BackfillReport, HistoryPoint, HistoryStats, MovieStock, PruneReport};
use crate::repositories::HistoryStore;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Append-only price trail with time-bounded retention
pub struct HistoryLedger {
    store: Arc<dyn HistoryStore>,
}

impl HistoryLedger {
    pub fn new(store: Arc<dyn HistoryStore>) -> Self {
        Self { store }
    }

    /// Record one point. Never rejected because of existing content.
    pub async fn append(
        &self,
        movie_id: &str,
        price: Decimal,
        recorded_at: DateTime<Utc>,
    ) -> AppResult<HistoryPoint> {
        Ok(self.store.append(movie_id, price, recorded_at).await?)
    }

    /// Delete every point older than `older_than` before now
    pub async fn prune(&self, older_than: chrono::Duration) -> AppResult<PruneReport> {
        self.prune_before(Utc::now() - older_than).await
    }

    /// Delete every point with `recorded_at` strictly before `cutoff`
    pub async fn prune_before(&self, cutoff: DateTime<Utc>) -> AppResult<PruneReport> {
        let deleted = self.store.delete_older_than(cutoff).await?;
        let remaining = self.store.count().await?;

        info!(
            deleted = deleted,
            remaining = remaining,
            "Pruned market history older than {}",
            cutoff
        );

        Ok(PruneReport {
            deleted,
            remaining,
            cutoff,
        })
    }

    /// Table statistics for a prune with the given window
    pub async fn stats(&self, window: chrono::Duration) -> AppResult<HistoryStats> {
        let cutoff = Utc::now() - window;
        let total_records = self.store.count().await?;
        let records_to_prune = self.store.count_older_than(cutoff).await?;
        let (oldest_record, newest_record) = self.store.time_range().await?;

        Ok(HistoryStats {
            total_records,
            records_to_prune,
            oldest_record,
            newest_record,
        })
    }

    /// Chart points for one stock, oldest first
    pub async fn chart(
        &self,
        movie_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> AppResult<Vec<HistoryPoint>> {
        Ok(self.store.find_by_movie(movie_id, since).await?)
    }

    /// Give every stock without history one point at its current price
    pub async fn backfill_initial(&self, stocks: &[MovieStock]) -> AppResult<BackfillReport> {
        let existing: HashSet<String> = self
            .store
            .movie_ids_with_history()
            .await?
            .into_iter()
            .collect();

        let mut report = BackfillReport::default();
        for stock in stocks {
            if existing.contains(&stock.id) {
                report.skipped += 1;
                continue;
            }

            match self
                .store
                .append(&stock.id, stock.current_price, stock.last_updated)
                .await
            {
                Ok(_) => report.inserted += 1,
                Err(e) => warn!("Failed to backfill history for {}: {}", stock.id, e),
            }
        }

        info!(
            inserted = report.inserted,
            skipped = report.skipped,
            "History backfill complete"
        );
        Ok(report)
    }
}
