use crate::error::{AppError, AppResult};
use crate::models::{HistoryPoint, MovieStock, StockFilter};
use crate::repositories::StockStore;
use crate::services::HistoryLedger;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Start of a chart covering the last `hours`; rejects windows that are not
/// positive or that reach past the representable time range
fn chart_window_start(hours: i64) -> AppResult<DateTime<Utc>> {
    if hours <= 0 {
        return Err(AppError::Validation("hours must be positive".to_string()));
    }

    chrono::Duration::try_hours(hours)
        .and_then(|window| Utc::now().checked_sub_signed(window))
        .ok_or_else(|| AppError::Validation(format!("hours {} is out of range", hours)))
}

/// Read side of the market: single stocks, listings and charts
pub struct MarketService {
    stocks: Arc<dyn StockStore>,
    ledger: Arc<HistoryLedger>,
}

impl MarketService {
    pub fn new(stocks: Arc<dyn StockStore>, ledger: Arc<HistoryLedger>) -> Self {
        Self { stocks, ledger }
    }

    /// Get one stock without touching its price
    pub async fn get_stock(&self, movie_id: &str) -> AppResult<MovieStock> {
        self.stocks
            .find_by_id(movie_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Stock {} not found", movie_id)))
    }

    /// Filtered, ordered listing
    pub async fn list_stocks(&self, filter: &StockFilter) -> AppResult<Vec<MovieStock>> {
        Ok(self.stocks.list(filter).await?)
    }

    /// Price history of one stock, optionally limited to the last `hours`
    pub async fn price_history(
        &self,
        movie_id: &str,
        hours: Option<i64>,
    ) -> AppResult<Vec<HistoryPoint>> {
        let since = hours.map(chart_window_start).transpose()?;

        // 404 for unknown stocks rather than an empty chart
        self.get_stock(movie_id).await?;

        self.ledger.chart(movie_id, since).await
    }
}
