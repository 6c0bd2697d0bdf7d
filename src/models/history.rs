use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One immutable point of a stock's price trail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct HistoryPoint {
    pub id: i64,
    pub movie_id: String,
    pub price: Decimal,
    pub recorded_at: DateTime<Utc>,
}

/// Result of a retention sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PruneReport {
    pub deleted: u64,
    pub remaining: i64,
    pub cutoff: DateTime<Utc>,
}

/// Monitoring view of the history table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryStats {
    pub total_records: i64,
    /// Points a prune with the same window would delete
    pub records_to_prune: i64,
    pub oldest_record: Option<DateTime<Utc>>,
    pub newest_record: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackfillReport {
    pub inserted: u32,
    pub skipped: u32,
}
