use crate::error::AppResult;
use crate::models::PruneReport;
use crate::services::HistoryLedger;
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tracing::{error, info};

/// Background task that prunes old history on a fixed interval
pub struct RetentionSweeper {
    ledger: Arc<HistoryLedger>,
    retention: chrono::Duration,
    interval: Duration,
}

impl RetentionSweeper {
    /// Create a sweeper keeping 7 days of history, running daily
    pub fn new(ledger: Arc<HistoryLedger>) -> Self {
        Self {
            ledger,
            retention: chrono::Duration::days(7),
            interval: Duration::from_secs(86_400),
        }
    }

    /// Set how much history to keep
    pub fn with_retention(mut self, retention: chrono::Duration) -> Self {
        self.retention = retention;
        self
    }

    /// Set sweep interval
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run a single sweep
    pub async fn sweep_once(&self) -> AppResult<PruneReport> {
        self.ledger.prune(self.retention).await
    }

    /// Start the sweep loop
    pub async fn start(self) {
        let mut interval = time::interval(self.interval);
        info!(
            "Retention sweeper started, pruning history older than {} days every {:?}",
            self.retention.num_days(),
            self.interval
        );

        loop {
            interval.tick().await;

            if let Err(e) = self.sweep_once().await {
                error!("Error pruning market history: {}", e);
            }
        }
    }
}
