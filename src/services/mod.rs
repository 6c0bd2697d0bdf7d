pub mod batch_refresher;
pub mod history_ledger;
pub mod index_aggregator;
pub mod market_service;
pub mod retention;
pub mod staleness_gate;

pub use batch_refresher::{BatchRefresher, BatchReport};
pub use history_ledger::HistoryLedger;
pub use index_aggregator::IndexAggregator;
pub use market_service::MarketService;
pub use retention::RetentionSweeper;
pub use staleness_gate::{RefreshOutcome, RefreshReason, StalenessGate};
