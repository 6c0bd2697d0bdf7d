use super::StockStore;
use crate::error::RepositoryError;
use crate::models::{MovieStock, PriceUpdate, StockFilter, StockStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

const STOCK_COLUMNS: &str = r#"
    id,
    tmdb_id,
    title,
    poster_path,
    release_date,
    status,
    current_price,
    price_change_24h,
    hype_index,
    box_office_index,
    wom_index,
    last_updated,
    created_at
"#;

/// Escape `%`, `_` and `\` so a search term matches literally inside ILIKE
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Repository for movie stock snapshots
pub struct StockRepository {
    pool: PgPool,
}

impl StockRepository {
    /// Create a new StockRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StockStore for StockRepository {
    async fn insert(&self, stock: &MovieStock) -> Result<MovieStock, RepositoryError> {
        let query = format!(
            r#"
            INSERT INTO movie_stocks (
                id, tmdb_id, title, poster_path, release_date, status,
                current_price, price_change_24h, hype_index, box_office_index, wom_index,
                last_updated, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {}
            "#,
            STOCK_COLUMNS
        );

        let inserted = sqlx::query_as::<_, MovieStock>(&query)
            .bind(&stock.id)
            .bind(stock.tmdb_id)
            .bind(&stock.title)
            .bind(&stock.poster_path)
            .bind(stock.release_date)
            .bind(&stock.status)
            .bind(stock.current_price)
            .bind(stock.price_change_24h)
            .bind(stock.hype_index)
            .bind(stock.box_office_index)
            .bind(stock.wom_index)
            .bind(stock.last_updated)
            .bind(stock.created_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(inserted)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<MovieStock>, RepositoryError> {
        let query = format!("SELECT {} FROM movie_stocks WHERE id = $1", STOCK_COLUMNS);

        let stock = sqlx::query_as::<_, MovieStock>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(stock)
    }

    async fn list(&self, filter: &StockFilter) -> Result<Vec<MovieStock>, RepositoryError> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM movie_stocks WHERE TRUE", STOCK_COLUMNS));

        if let Some(status) = filter.status {
            builder.push(" AND status = ").push_bind(status.as_str());
        }

        if let Some(term) = filter.search.as_deref().map(str::trim) {
            if !term.is_empty() {
                builder
                    .push(" AND title ILIKE ")
                    .push_bind(format!("%{}%", escape_like(term)));
            }
        }

        // Sort expression and direction come from closed enums, never from input
        let direction = filter.order.as_sql();
        builder.push(format!(
            " ORDER BY {} {}, id {}",
            filter.sort.sql_expr(),
            direction,
            direction
        ));

        let stocks = builder
            .build_query_as::<MovieStock>()
            .fetch_all(&self.pool)
            .await?;

        Ok(stocks)
    }

    async fn find_stalest(
        &self,
        status: StockStatus,
        limit: i64,
    ) -> Result<Vec<MovieStock>, RepositoryError> {
        let query = format!(
            r#"
            SELECT {}
            FROM movie_stocks
            WHERE status = $1
            ORDER BY last_updated ASC, id ASC
            LIMIT $2
            "#,
            STOCK_COLUMNS
        );

        let stocks = sqlx::query_as::<_, MovieStock>(&query)
            .bind(status.as_str())
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(stocks)
    }

    async fn compare_and_update(
        &self,
        id: &str,
        expected_last_updated: DateTime<Utc>,
        update: &PriceUpdate,
    ) -> Result<Option<MovieStock>, RepositoryError> {
        // Single statement: either the whole snapshot moves or nothing does
        let query = format!(
            r#"
            UPDATE movie_stocks
            SET current_price = $3,
                price_change_24h = $4,
                hype_index = $5,
                box_office_index = $6,
                wom_index = $7,
                last_updated = GREATEST($8, last_updated)
            WHERE id = $1 AND last_updated = $2
            RETURNING {}
            "#,
            STOCK_COLUMNS
        );

        let committed = sqlx::query_as::<_, MovieStock>(&query)
            .bind(id)
            .bind(expected_last_updated)
            .bind(update.current_price)
            .bind(update.price_change_24h)
            .bind(update.hype_index)
            .bind(update.box_office_index)
            .bind(update.wom_index)
            .bind(update.last_updated)
            .fetch_optional(&self.pool)
            .await?;

        Ok(committed)
    }
}
