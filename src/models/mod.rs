//! Domain models for the movie stock engine.
//!
//! `MovieStock` is the persisted snapshot per catalogued movie and
//! `HistoryPoint` is one entry of the append-only price trail.

pub mod history;
pub mod stock;

// Re-export all models for convenient access
pub use history::{BackfillReport, HistoryPoint, HistoryStats, PruneReport};
pub use stock::{MovieStock, PriceChange, PriceUpdate, SortField, SortOrder, StockFilter, StockStatus};
