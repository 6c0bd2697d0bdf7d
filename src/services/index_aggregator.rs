use crate::models::MovieStock;
use crate::pricing::{
    hype_index_from_popularity, wom_index_from_ratings, SubIndices, MAX_INDEX, NEUTRAL_INDEX,
};
use crate::signals::{BoxOfficeSource, PopularitySource, RatingSource, SignalError};
use rust_decimal::Decimal;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Gathers the three sub-indices for a stock.
///
/// A source that errors or exceeds the timeout contributes the neutral
/// index instead; the aggregate itself never fails.
pub struct IndexAggregator {
    popularity: Arc<dyn PopularitySource>,
    ratings: Arc<dyn RatingSource>,
    box_office: Arc<dyn BoxOfficeSource>,
    timeout: Duration,
}

impl IndexAggregator {
    /// Create an aggregator with the default 5 second signal timeout
    pub fn new(
        popularity: Arc<dyn PopularitySource>,
        ratings: Arc<dyn RatingSource>,
        box_office: Arc<dyn BoxOfficeSource>,
    ) -> Self {
        Self {
            popularity,
            ratings,
            box_office,
            timeout: Duration::from_secs(5),
        }
    }

    /// Set the per-source timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run one source call under the timeout, falling back to neutral
    async fn bounded<F>(&self, signal: &str, movie_id: &str, call: F) -> Option<Decimal>
    where
        F: Future<Output = Result<Decimal, SignalError>>,
    {
        let outcome = match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(SignalError::Timeout(self.timeout)),
        };

        match outcome {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(
                    movie_id = movie_id,
                    signal = signal,
                    "Signal unavailable, using neutral index: {}",
                    e
                );
                None
            }
        }
    }

    /// Hype index from the provider popularity
    pub async fn hype_index(&self, stock: &MovieStock) -> Decimal {
        self.bounded("hype", &stock.id, self.popularity.popularity(stock))
            .await
            .map(hype_index_from_popularity)
            .unwrap_or(NEUTRAL_INDEX)
    }

    /// Word-of-mouth index from review ratings
    pub async fn wom_index(&self, movie_id: &str) -> Decimal {
        let call = async {
            let ratings = self.ratings.ratings(movie_id).await?;
            Ok::<_, SignalError>(wom_index_from_ratings(&ratings))
        };
        self.bounded("wom", movie_id, call)
            .await
            .unwrap_or(NEUTRAL_INDEX)
    }

    /// Box-office index from the configured strategy
    pub async fn box_office_index(&self, stock: &MovieStock) -> Decimal {
        self.bounded("box_office", &stock.id, self.box_office.box_office_index(stock))
            .await
            .map(|index| index.max(Decimal::ZERO).min(MAX_INDEX))
            .unwrap_or(NEUTRAL_INDEX)
    }

    /// Query all sources concurrently
    pub async fn aggregate(&self, stock: &MovieStock) -> SubIndices {
        let (hype, box_office, wom) = tokio::join!(
            self.hype_index(stock),
            self.box_office_index(stock),
            self.wom_index(&stock.id),
        );

        SubIndices {
            hype,
            box_office,
            wom,
        }
    }

    /// Aggregate using a popularity value the caller already has
    pub async fn aggregate_with_popularity(
        &self,
        stock: &MovieStock,
        popularity: Option<Decimal>,
    ) -> SubIndices {
        match popularity {
            Some(popularity) => {
                let (box_office, wom) =
                    tokio::join!(self.box_office_index(stock), self.wom_index(&stock.id));
                SubIndices {
                    hype: hype_index_from_popularity(popularity),
                    box_office,
                    wom,
                }
            }
            None => self.aggregate(stock).await,
        }
    }
}
