//! External signal sources feeding the sub-indices.
//!
//! Every source sits behind a trait so the aggregator can swap providers
//! and tests can substitute fixed values. Failures are reported as
//! `SignalError` and never leave the aggregator.

pub mod box_office;
pub mod tmdb;

pub use box_office::NeutralBoxOffice;
pub use tmdb::TmdbClient;

use crate::models::MovieStock;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::time::Duration;
use thiserror::Error;

/// Why a signal could not be read
#[derive(Error, Debug)]
pub enum SignalError {
    #[error("Signal source timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Signal unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Signal source not configured: {0}")]
    NotConfigured(&'static str),
}

/// Raw, unbounded popularity score from the metadata provider
#[async_trait]
pub trait PopularitySource: Send + Sync {
    async fn popularity(&self, stock: &MovieStock) -> Result<Decimal, SignalError>;
}

/// Review ratings (1-10 scale, nullable) recorded for a movie
#[async_trait]
pub trait RatingSource: Send + Sync {
    async fn ratings(&self, movie_id: &str) -> Result<Vec<Option<Decimal>>, SignalError>;
}

/// Box-office index (0-100) for a movie
#[async_trait]
pub trait BoxOfficeSource: Send + Sync {
    async fn box_office_index(&self, stock: &MovieStock) -> Result<Decimal, SignalError>;
}
