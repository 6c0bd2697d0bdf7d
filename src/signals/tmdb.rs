use super::{PopularitySource, SignalError};
use crate::models::MovieStock;
use crate::pricing::POPULARITY_SATURATION;
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Subset of the TMDB `/movie/{id}` payload we read
#[derive(Debug, Deserialize)]
struct TmdbMovie {
    popularity: Option<f64>,
}

/// TMDB client that reads a movie's popularity score
pub struct TmdbClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl TmdbClient {
    /// Create a client whose every request is bounded by `timeout`
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, SignalError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn movie_url(&self, tmdb_id: i64) -> String {
        format!("{}/movie/{}", self.base_url, tmdb_id)
    }
}

/// Extract the popularity from a TMDB movie body; a missing field reads as 0
fn parse_popularity(body: TmdbMovie) -> Result<Decimal, SignalError> {
    let raw = body.popularity.unwrap_or(0.0);
    if !raw.is_finite() {
        return Err(SignalError::InvalidPayload(format!(
            "popularity {} is not a finite number",
            raw
        )));
    }

    // Finite but outside the decimal range: anything that large is full hype
    Ok(Decimal::from_f64(raw).unwrap_or(if raw > 0.0 {
        POPULARITY_SATURATION
    } else {
        Decimal::ZERO
    }))
}

#[async_trait]
impl PopularitySource for TmdbClient {
    async fn popularity(&self, stock: &MovieStock) -> Result<Decimal, SignalError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(SignalError::NotConfigured("TMDB_API_KEY"))?;

        let tmdb_id = stock.provider_id().ok_or_else(|| {
            SignalError::Unavailable(format!("stock {} has no TMDB id", stock.id))
        })?;

        let response = self
            .client
            .get(self.movie_url(tmdb_id))
            .query(&[("api_key", api_key)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SignalError::Unavailable(format!(
                "TMDB returned {} for movie {}",
                response.status(),
                tmdb_id
            )));
        }

        let body = response.json::<TmdbMovie>().await?;
        let popularity = parse_popularity(body)?;
        debug!("TMDB popularity for {}: {}", stock.id, popularity);

        Ok(popularity)
    }
}
