use crate::signals::{RatingSource, SignalError};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;

/// Read-only access to review ratings for the word-of-mouth index
pub struct ReviewRepository {
    pool: PgPool,
}

impl ReviewRepository {
    /// Create a new ReviewRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// All ratings recorded for a movie, nulls included
    pub async fn find_ratings(&self, movie_id: &str) -> Result<Vec<Option<Decimal>>, sqlx::Error> {
        sqlx::query_scalar("SELECT rating FROM reviews WHERE movie_id = $1")
            .bind(movie_id)
            .fetch_all(&self.pool)
            .await
    }
}

#[async_trait]
impl RatingSource for ReviewRepository {
    async fn ratings(&self, movie_id: &str) -> Result<Vec<Option<Decimal>>, SignalError> {
        self.find_ratings(movie_id)
            .await
            .map_err(|e| SignalError::Unavailable(format!("reviews query failed: {}", e)))
    }
}
