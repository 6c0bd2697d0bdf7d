use super::HistoryStore;
use crate::error::RepositoryError;
use crate::models::HistoryPoint;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

/// Repository for the `market_history` price trail
pub struct HistoryRepository {
    pool: PgPool,
}

impl HistoryRepository {
    /// Create a new HistoryRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HistoryStore for HistoryRepository {
    async fn append(
        &self,
        movie_id: &str,
        price: Decimal,
        recorded_at: DateTime<Utc>,
    ) -> Result<HistoryPoint, RepositoryError> {
        let point = sqlx::query_as::<_, HistoryPoint>(
            r#"
            INSERT INTO market_history (movie_id, price, recorded_at)
            VALUES ($1, $2, $3)
            RETURNING id, movie_id, price, recorded_at
            "#,
        )
        .bind(movie_id)
        .bind(price)
        .bind(recorded_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(point)
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM market_history WHERE recorded_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn count(&self) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM market_history")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn count_older_than(&self, cutoff: DateTime<Utc>) -> Result<i64, RepositoryError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM market_history WHERE recorded_at < $1")
                .bind(cutoff)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    async fn time_range(
        &self,
    ) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>), RepositoryError> {
        let range: (Option<DateTime<Utc>>, Option<DateTime<Utc>>) =
            sqlx::query_as("SELECT MIN(recorded_at), MAX(recorded_at) FROM market_history")
                .fetch_one(&self.pool)
                .await?;

        Ok(range)
    }

    async fn find_by_movie(
        &self,
        movie_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<HistoryPoint>, RepositoryError> {
        let points = sqlx::query_as::<_, HistoryPoint>(
            r#"
            SELECT id, movie_id, price, recorded_at
            FROM market_history
            WHERE movie_id = $1
                AND ($2::timestamptz IS NULL OR recorded_at >= $2)
            ORDER BY recorded_at ASC, id ASC
            "#,
        )
        .bind(movie_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(points)
    }

    async fn movie_ids_with_history(&self) -> Result<Vec<String>, RepositoryError> {
        let ids: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT movie_id FROM market_history ORDER BY movie_id")
                .fetch_all(&self.pool)
                .await?;

        Ok(ids)
    }
}
