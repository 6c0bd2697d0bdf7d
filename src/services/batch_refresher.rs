use crate::error::AppResult;
use crate::models::StockStatus;
use crate::repositories::StockStore;
use crate::services::{RefreshReason, StalenessGate};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tracing::{error, info, warn};

/// Tally of one batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub refreshed: u32,
    pub skipped: u32,
    pub failed: u32,
}

/// Background task that walks ACTIVE stocks round-robin, stalest first
pub struct BatchRefresher {
    stocks: Arc<dyn StockStore>,
    gate: Arc<StalenessGate>,
    batch_size: u32,
    interval: Duration,
}

impl BatchRefresher {
    /// Create a refresher handling 5 stocks every 5 minutes
    pub fn new(stocks: Arc<dyn StockStore>, gate: Arc<StalenessGate>) -> Self {
        Self {
            stocks,
            gate,
            batch_size: 5,
            interval: Duration::from_secs(300),
        }
    }

    /// Set batch size
    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set refresh interval
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Push the stalest ACTIVE stocks through the gate.
    ///
    /// Stocks are refreshed concurrently; one failing stock does not stop
    /// the others.
    pub async fn refresh_batch(&self) -> AppResult<BatchReport> {
        let batch = self
            .stocks
            .find_stalest(StockStatus::Active, self.batch_size as i64)
            .await?;

        let mut report = BatchReport::default();
        if batch.is_empty() {
            return Ok(report);
        }

        let results = join_all(batch.iter().map(|stock| self.gate.refresh(&stock.id))).await;

        for (stock, result) in batch.iter().zip(results) {
            match result {
                Ok(outcome) if outcome.reason == RefreshReason::Committed => report.refreshed += 1,
                Ok(_) => report.skipped += 1,
                Err(e) => {
                    warn!("Batch refresh failed for {}: {}", stock.id, e);
                    report.failed += 1;
                }
            }
        }

        info!(
            refreshed = report.refreshed,
            skipped = report.skipped,
            failed = report.failed,
            "Batch refresh complete"
        );
        Ok(report)
    }

    /// Start the refresh loop
    pub async fn start(self) {
        let mut interval = time::interval(self.interval);
        info!(
            "Batch refresher started, {} stocks every {:?}",
            self.batch_size, self.interval
        );

        loop {
            interval.tick().await;

            if let Err(e) = self.refresh_batch().await {
                error!("Error in batch refresher: {}", e);
            }
        }
    }
}
