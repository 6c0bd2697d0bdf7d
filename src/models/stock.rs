use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Listing status of a movie stock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StockStatus {
    Active,
    Upcoming,
    Delisted,
}

impl StockStatus {
    pub const ALL: [StockStatus; 3] = [
        StockStatus::Active,
        StockStatus::Upcoming,
        StockStatus::Delisted,
    ];

    /// Convert from database string
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.trim().to_uppercase().as_str() {
            "ACTIVE" => Ok(StockStatus::Active),
            "UPCOMING" => Ok(StockStatus::Upcoming),
            "DELISTED" => Ok(StockStatus::Delisted),
            _ => Err(format!("Invalid status: {}", s)),
        }
    }

    /// Convert to database string
    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::Active => "ACTIVE",
            StockStatus::Upcoming => "UPCOMING",
            StockStatus::Delisted => "DELISTED",
        }
    }
}

impl From<StockStatus> for String {
    fn from(status: StockStatus) -> Self {
        status.as_str().to_string()
    }
}

/// Current price snapshot of one catalogued movie
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct MovieStock {
    pub id: String,
    pub tmdb_id: Option<i64>,
    pub title: String,
    pub poster_path: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub status: String, // Stored as TEXT, use StockStatus enum for type safety
    pub current_price: Decimal,
    pub price_change_24h: Decimal,
    pub hype_index: Decimal,
    pub box_office_index: Decimal,
    pub wom_index: Decimal,
    pub last_updated: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl MovieStock {
    /// Create a freshly admitted stock with neutral indices
    pub fn new(id: &str, title: &str, initial_price: Decimal, status: StockStatus) -> Self {
        let now = Utc::now().trunc_subsecs(6);
        let neutral = crate::pricing::NEUTRAL_INDEX;

        Self {
            id: id.to_string(),
            tmdb_id: id.parse::<i64>().ok(),
            title: title.to_string(),
            poster_path: None,
            release_date: None,
            status: status.as_str().to_string(),
            current_price: crate::pricing::clamp_price(initial_price),
            price_change_24h: Decimal::ZERO,
            hype_index: neutral,
            box_office_index: neutral,
            wom_index: neutral,
            last_updated: now,
            created_at: now,
        }
    }

    /// Get status as an enum
    pub fn status_enum(&self) -> StockStatus {
        StockStatus::from_str(&self.status).unwrap_or(StockStatus::Active)
    }

    /// Key used against the metadata provider
    pub fn provider_id(&self) -> Option<i64> {
        self.tmdb_id.or_else(|| self.id.parse::<i64>().ok())
    }

    /// Check whether the snapshot is older than `threshold` at `now`
    pub fn is_stale(&self, now: DateTime<Utc>, threshold: chrono::Duration) -> bool {
        now.signed_duration_since(self.last_updated) >= threshold
    }

    /// Snapshot with a committed update applied
    pub fn with_update(&self, update: &PriceUpdate) -> Self {
        Self {
            current_price: update.current_price,
            price_change_24h: update.price_change_24h,
            hype_index: update.hype_index,
            box_office_index: update.box_office_index,
            wom_index: update.wom_index,
            last_updated: update.last_updated,
            ..self.clone()
        }
    }
}

/// Candidate values produced by one recompute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceUpdate {
    pub current_price: Decimal,
    pub price_change_24h: Decimal,
    pub hype_index: Decimal,
    pub box_office_index: Decimal,
    pub wom_index: Decimal,
    pub last_updated: DateTime<Utc>,
}

/// Price movement reported by a committed refresh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceChange {
    pub old: Decimal,
    pub new: Decimal,
    #[serde(rename = "change24h")]
    pub change_24h: Decimal,
}

/// Column a listing is ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    Price,
    Change24h,
    Title,
}

impl SortField {
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.trim().to_lowercase().as_str() {
            "price" | "current_price" => Ok(SortField::Price),
            "change" | "change24h" | "change_24h" | "price_change_24h" => Ok(SortField::Change24h),
            "title" => Ok(SortField::Title),
            _ => Err(format!("Invalid sort field: {}", s)),
        }
    }

    /// `ORDER BY` expression over `movie_stocks`
    pub fn sql_expr(&self) -> &'static str {
        match self {
            SortField::Price => "current_price",
            SortField::Change24h => "price_change_24h",
            SortField::Title => "LOWER(title)",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.trim().to_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortOrder::Asc),
            "desc" | "descending" => Ok(SortOrder::Desc),
            _ => Err(format!("Invalid sort order: {}", s)),
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Listing query: status filter, title search and ordering
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StockFilter {
    pub status: Option<StockStatus>,
    /// Case-insensitive substring of the title
    pub search: Option<String>,
    pub sort: SortField,
    pub order: SortOrder,
}

impl StockFilter {
    /// In-memory equivalent of the SQL `WHERE` clause
    pub fn matches(&self, stock: &MovieStock) -> bool {
        if let Some(status) = self.status {
            if stock.status_enum() != status {
                return false;
            }
        }

        match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => stock
                .title
                .to_lowercase()
                .contains(&term.to_lowercase()),
            _ => true,
        }
    }

    /// Sort stocks in place the way the SQL `ORDER BY` would
    pub fn sort(&self, stocks: &mut [MovieStock]) {
        stocks.sort_by(|a, b| {
            let ordering = match self.sort {
                SortField::Price => a.current_price.cmp(&b.current_price),
                SortField::Change24h => a.price_change_24h.cmp(&b.price_change_24h),
                SortField::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
            };
            let ordering = ordering.then_with(|| a.id.cmp(&b.id));
            match self.order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });
    }
}
