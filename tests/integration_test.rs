mod helpers;

use chrono::{Duration, SubsecRound, Utc};
use helpers::*;
use movie_stock_engine::config::MarketConfig;
use movie_stock_engine::models::*;
use movie_stock_engine::pricing::{SubIndices, NEUTRAL_INDEX};
use movie_stock_engine::repositories::*;
use movie_stock_engine::services::*;
use movie_stock_engine::signals::NeutralBoxOffice;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Instant;
use tokio_test::{assert_err, assert_ok};

fn ledger_over(history: &Arc<InMemoryHistoryStore>) -> HistoryLedger {
    HistoryLedger::new(history.clone())
}

// ============================================================================
// Index aggregation
// ============================================================================

#[tokio::test]
async fn test_aggregator_uses_every_source() {
    let reviews = Arc::new(InMemoryReviews::new());
    for _ in 0..10 {
        reviews.add_rating("550", Some(Decimal::new(8, 0))).await;
    }
    let aggregator = IndexAggregator::new(
        Arc::new(FixedPopularity::new(300)),
        reviews,
        Arc::new(NeutralBoxOffice),
    );
    let stock = MovieStock::new("550", "Fight Club", Decimal::new(100, 0), StockStatus::Active);

    let indices = aggregator.aggregate(&stock).await;
    assert_eq!(
        indices,
        SubIndices {
            hype: Decimal::new(60, 0),
            box_office: NEUTRAL_INDEX,
            wom: Decimal::new(85, 0),
        }
    );
}

#[tokio::test]
async fn test_aggregator_falls_back_on_failure() {
    let aggregator = IndexAggregator::new(
        Arc::new(FailingPopularity),
        Arc::new(InMemoryReviews::new()),
        Arc::new(NeutralBoxOffice),
    );
    let stock = MovieStock::new("550", "Fight Club", Decimal::new(100, 0), StockStatus::Active);

    let indices = aggregator.aggregate(&stock).await;
    assert_eq!(indices.hype, NEUTRAL_INDEX);
    assert_eq!(indices.box_office, NEUTRAL_INDEX);
    assert_eq!(indices.wom, NEUTRAL_INDEX);
}

#[tokio::test]
async fn test_aggregator_times_out_slow_source() {
    let aggregator = IndexAggregator::new(
        Arc::new(SlowPopularity {
            delay: std::time::Duration::from_secs(5),
            value: Decimal::new(500, 0),
        }),
        Arc::new(InMemoryReviews::new()),
        Arc::new(NeutralBoxOffice),
    )
    .with_timeout(std::time::Duration::from_millis(50));
    let stock = MovieStock::new("550", "Fight Club", Decimal::new(100, 0), StockStatus::Active);

    let started = Instant::now();
    let hype = aggregator.hype_index(&stock).await;

    assert_eq!(hype, NEUTRAL_INDEX);
    assert!(started.elapsed() < std::time::Duration::from_secs(2));
}

#[tokio::test]
async fn test_aggregate_with_known_popularity_skips_provider() {
    let popularity = Arc::new(FixedPopularity::new(300));
    let aggregator = IndexAggregator::new(
        popularity.clone(),
        Arc::new(InMemoryReviews::new()),
        Arc::new(NeutralBoxOffice),
    );
    let stock = MovieStock::new("550", "Fight Club", Decimal::new(100, 0), StockStatus::Active);

    let indices = aggregator
        .aggregate_with_popularity(&stock, Some(Decimal::new(150, 0)))
        .await;
    assert_eq!(indices.hype, Decimal::new(30, 0));
    assert_eq!(popularity.calls(), 0);
}

// ============================================================================
// Staleness gate
// ============================================================================

#[tokio::test]
async fn test_fresh_stock_is_returned_untouched() {
    let popularity = Arc::new(FixedPopularity::new(300));
    let market = TestMarket::new(popularity.clone());
    let seeded = seed_stock(
        market.stocks.as_ref(),
        "550",
        "Fight Club",
        100,
        StockStatus::Active,
        Duration::minutes(10),
    )
    .await;

    let outcome = market.state.gate.refresh("550").await.unwrap();

    assert!(!outcome.updated);
    assert_eq!(outcome.reason, RefreshReason::Fresh);
    assert_eq!(outcome.stock, seeded);
    assert!(outcome.price_change.is_none());
    assert_eq!(popularity.calls(), 0);
    assert!(market.history.all().await.is_empty());
}

#[tokio::test]
async fn test_stale_stock_is_recomputed_and_recorded() {
    let market = TestMarket::new(Arc::new(FixedPopularity::new(300)));
    let seeded = seed_stale_stock(market.stocks.as_ref(), "550", 100).await;

    let outcome = market.state.gate.refresh("550").await.unwrap();

    // hype 60, box office 50, wom 50 -> trend 54 -> 80 + 27
    assert!(outcome.updated);
    assert_eq!(outcome.reason, RefreshReason::Committed);
    assert_eq!(outcome.stock.current_price, Decimal::new(107, 0));
    assert_eq!(outcome.stock.price_change_24h, Decimal::new(7, 0));
    assert_eq!(outcome.stock.hype_index, Decimal::new(60, 0));
    assert!(outcome.stock.last_updated > seeded.last_updated);
    assert_eq!(
        outcome.price_change,
        Some(PriceChange {
            old: Decimal::new(100, 0),
            new: Decimal::new(107, 0),
            change_24h: Decimal::new(7, 0),
        })
    );

    let stored = market.state.market.get_stock("550").await.unwrap();
    assert_eq!(stored, outcome.stock);

    let history = market.history.all().await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].movie_id, "550");
    assert_eq!(history[0].price, Decimal::new(107, 0));
    assert_eq!(history[0].recorded_at, outcome.stock.last_updated);
}

#[tokio::test]
async fn test_second_refresh_after_commit_is_fresh() {
    let market = TestMarket::new(Arc::new(FixedPopularity::new(300)));
    seed_stale_stock(market.stocks.as_ref(), "550", 100).await;

    let first = market.state.gate.refresh("550").await.unwrap();
    let second = market.state.gate.refresh("550").await.unwrap();

    assert_eq!(first.reason, RefreshReason::Committed);
    assert_eq!(second.reason, RefreshReason::Fresh);
    assert_eq!(second.stock, first.stock);
    assert_eq!(market.history.all().await.len(), 1);
}

#[tokio::test]
async fn test_concurrent_refreshes_commit_once() {
    let market = TestMarket::new(Arc::new(BarrierPopularity::new(2, 300)));
    seed_stale_stock(market.stocks.as_ref(), "550", 100).await;

    let gate = market.state.gate.clone();
    let (a, b) = tokio::join!(gate.refresh("550"), gate.refresh("550"));
    let (a, b) = (a.unwrap(), b.unwrap());

    let committed = [&a, &b]
        .iter()
        .filter(|o| o.reason == RefreshReason::Committed)
        .count();
    let lost = [&a, &b]
        .iter()
        .filter(|o| o.reason == RefreshReason::LostRace)
        .count();
    assert_eq!(committed, 1);
    assert_eq!(lost, 1);

    // The loser reports the winner's snapshot
    assert_eq!(a.stock, b.stock);
    assert_eq!(a.stock.current_price, Decimal::new(107, 0));
    assert_eq!(market.history.all().await.len(), 1);
}

#[tokio::test]
async fn test_unavailable_signals_price_neutrally() {
    let market = TestMarket::new(Arc::new(FailingPopularity));
    seed_stale_stock(market.stocks.as_ref(), "550", 100).await;

    let outcome = market.state.gate.refresh("550").await.unwrap();

    // All neutral -> trend 50 -> 80 + 25
    assert_eq!(outcome.reason, RefreshReason::Committed);
    assert_eq!(outcome.stock.current_price, Decimal::new(105, 0));
    assert_eq!(outcome.stock.hype_index, NEUTRAL_INDEX);
}

#[tokio::test]
async fn test_reviews_feed_word_of_mouth() {
    let market = TestMarket::new(Arc::new(FixedPopularity::new(300)));
    seed_stale_stock(market.stocks.as_ref(), "550", 100).await;
    for _ in 0..10 {
        market.reviews.add_rating("550", Some(Decimal::new(8, 0))).await;
    }

    let outcome = market.state.gate.refresh("550").await.unwrap();

    // trend 24 + 20 + 17 = 61 -> 80 + 30.5
    assert_eq!(outcome.stock.wom_index, Decimal::new(85, 0));
    assert_eq!(outcome.stock.current_price, Decimal::new(1105, 1));
}

#[tokio::test]
async fn test_excluded_status_is_not_recomputed() {
    let config = MarketConfig {
        recompute_statuses: vec![StockStatus::Active],
        ..Default::default()
    };
    let market = TestMarket::with_config(Arc::new(FixedPopularity::new(300)), config);
    let seeded = seed_stock(
        market.stocks.as_ref(),
        "42",
        "Pulled Film",
        80,
        StockStatus::Delisted,
        Duration::hours(5),
    )
    .await;

    let outcome = market.state.gate.refresh("42").await.unwrap();

    assert!(!outcome.updated);
    assert_eq!(outcome.reason, RefreshReason::StatusSkipped);
    assert_eq!(outcome.stock, seeded);
    assert!(market.history.all().await.is_empty());
}

#[tokio::test]
async fn test_unknown_stock_is_not_found() {
    let market = TestMarket::new(Arc::new(FixedPopularity::new(300)));

    let err = market.state.gate.refresh("missing").await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.status_code(), 404);
}

#[tokio::test]
async fn test_force_refresh_ignores_age() {
    let market = TestMarket::new(Arc::new(FixedPopularity::new(300)));
    seed_stock(
        market.stocks.as_ref(),
        "550",
        "Fight Club",
        100,
        StockStatus::Active,
        Duration::zero(),
    )
    .await;

    let outcome = market.state.gate.force_refresh("550").await.unwrap();
    assert_eq!(outcome.reason, RefreshReason::Committed);
    assert_eq!(market.history.all().await.len(), 1);
}

#[tokio::test]
async fn test_last_updated_never_moves_backwards() {
    let market = TestMarket::new(Arc::new(FixedPopularity::new(300)));
    let mut stock = MovieStock::new("550", "Fight Club", Decimal::new(100, 0), StockStatus::Active);
    // Snapshot stamped ahead of the local clock
    stock.last_updated = Utc::now().trunc_subsecs(6) + Duration::minutes(5);
    market.stocks.insert(&stock).await.unwrap();

    let outcome = assert_ok!(market.state.gate.force_refresh("550").await);

    assert_eq!(outcome.reason, RefreshReason::Committed);
    assert!(outcome.stock.last_updated > stock.last_updated);
    assert_eq!(outcome.stock.current_price, Decimal::new(107, 0));
    assert_eq!(market.history.all().await.len(), 1);
}

#[tokio::test]
async fn test_concurrent_forced_refreshes_commit_once() {
    let market = TestMarket::new(Arc::new(BarrierPopularity::new(2, 300)));
    let mut stock = MovieStock::new("550", "Fight Club", Decimal::new(100, 0), StockStatus::Active);
    stock.last_updated = Utc::now().trunc_subsecs(6) + Duration::minutes(5);
    market.stocks.insert(&stock).await.unwrap();

    // Both readers see the same stamp and both compute from it
    let gate = market.state.gate.clone();
    let (a, b) = tokio::join!(gate.force_refresh("550"), gate.force_refresh("550"));
    let (a, b) = (assert_ok!(a), assert_ok!(b));

    let mut reasons = [a.reason, b.reason];
    reasons.sort_by_key(|reason| *reason == RefreshReason::LostRace);
    assert_eq!(reasons, [RefreshReason::Committed, RefreshReason::LostRace]);

    let stored = assert_ok!(market.stocks.find_by_id("550").await).unwrap();
    assert!(stored.last_updated > stock.last_updated);
    assert_eq!(stored.current_price, Decimal::new(107, 0));
    assert_eq!(market.history.all().await.len(), 1);
}

// ============================================================================
// History ledger
// ============================================================================

#[tokio::test]
async fn test_prune_respects_retention_window() {
    let history = Arc::new(InMemoryHistoryStore::new());
    let ledger = ledger_over(&history);
    let now = Utc::now();
    let price = Decimal::new(100, 0);

    ledger.append("550", price, now - Duration::days(8)).await.unwrap();
    ledger.append("550", price, now - Duration::days(7) + Duration::hours(1)).await.unwrap();
    ledger.append("550", price, now - Duration::hours(1)).await.unwrap();
    ledger.append("278", price, now - Duration::days(30)).await.unwrap();

    let stats = ledger.stats(Duration::days(7)).await.unwrap();
    assert_eq!(stats.total_records, 4);
    assert_eq!(stats.records_to_prune, 2);
    assert_eq!(stats.oldest_record, Some(now - Duration::days(30)));
    assert_eq!(stats.newest_record, Some(now - Duration::hours(1)));

    let report = ledger.prune(Duration::days(7)).await.unwrap();
    assert_eq!(report.deleted, 2);
    assert_eq!(report.remaining, 2);

    let remaining = history.all().await;
    assert!(remaining.iter().all(|p| p.recorded_at >= report.cutoff));

    // Nothing left to prune
    let again = ledger.prune(Duration::days(7)).await.unwrap();
    assert_eq!(again.deleted, 0);
    assert_eq!(again.remaining, 2);
}

#[tokio::test]
async fn test_prune_before_is_strict() {
    let history = Arc::new(InMemoryHistoryStore::new());
    let ledger = ledger_over(&history);
    let cutoff = Utc::now() - Duration::days(7);

    ledger.append("550", Decimal::new(100, 0), cutoff).await.unwrap();
    ledger
        .append("550", Decimal::new(101, 0), cutoff - Duration::microseconds(1))
        .await
        .unwrap();

    let report = ledger.prune_before(cutoff).await.unwrap();
    assert_eq!(report.deleted, 1);
    assert_eq!(history.all().await[0].recorded_at, cutoff);
}

#[tokio::test]
async fn test_chart_is_ordered_and_windowed() {
    let history = Arc::new(InMemoryHistoryStore::new());
    let ledger = ledger_over(&history);
    let now = Utc::now();

    ledger.append("550", Decimal::new(103, 0), now - Duration::hours(1)).await.unwrap();
    ledger.append("550", Decimal::new(101, 0), now - Duration::hours(30)).await.unwrap();
    ledger.append("550", Decimal::new(102, 0), now - Duration::hours(5)).await.unwrap();
    ledger.append("278", Decimal::new(99, 0), now - Duration::hours(2)).await.unwrap();

    let all = ledger.chart("550", None).await.unwrap();
    let prices: Vec<Decimal> = all.iter().map(|p| p.price).collect();
    assert_eq!(
        prices,
        vec![Decimal::new(101, 0), Decimal::new(102, 0), Decimal::new(103, 0)]
    );

    let recent = ledger
        .chart("550", Some(now - Duration::hours(24)))
        .await
        .unwrap();
    assert_eq!(recent.len(), 2);
}

#[tokio::test]
async fn test_backfill_only_fills_untracked_stocks() {
    let history = Arc::new(InMemoryHistoryStore::new());
    let ledger = ledger_over(&history);
    let tracked = MovieStock::new("550", "Fight Club", Decimal::new(120, 0), StockStatus::Active);
    let untracked = MovieStock::new("278", "Shawshank", Decimal::new(90, 0), StockStatus::Active);

    ledger
        .append("550", Decimal::new(110, 0), Utc::now() - Duration::hours(3))
        .await
        .unwrap();

    let report = ledger
        .backfill_initial(&[tracked, untracked.clone()])
        .await
        .unwrap();
    assert_eq!(report, BackfillReport { inserted: 1, skipped: 1 });

    let points = ledger.chart("278", None).await.unwrap();
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].price, untracked.current_price);
    assert_eq!(points[0].recorded_at, untracked.last_updated);
}

#[tokio::test]
async fn test_retention_sweeper_single_pass() {
    let history = Arc::new(InMemoryHistoryStore::new());
    let ledger = Arc::new(ledger_over(&history));
    let now = Utc::now();

    ledger.append("550", Decimal::new(100, 0), now - Duration::days(3)).await.unwrap();
    ledger.append("550", Decimal::new(100, 0), now - Duration::hours(2)).await.unwrap();

    let sweeper = RetentionSweeper::new(ledger).with_retention(Duration::days(1));
    let report = sweeper.sweep_once().await.unwrap();

    assert_eq!(report.deleted, 1);
    assert_eq!(report.remaining, 1);
}

// ============================================================================
// Read side and batch refresh
// ============================================================================

#[tokio::test]
async fn test_listing_filters_and_orders() {
    let market = TestMarket::new(Arc::new(FixedPopularity::new(300)));
    let stocks = market.stocks.as_ref();
    let fresh = Duration::minutes(1);
    seed_stock(stocks, "1", "Dune: Part Two", 240, StockStatus::Active, fresh).await;
    seed_stock(stocks, "2", "Dune", 180, StockStatus::Active, fresh).await;
    seed_stock(stocks, "3", "Arrival", 150, StockStatus::Active, fresh).await;
    seed_stock(stocks, "4", "Dune Messiah", 100, StockStatus::Upcoming, fresh).await;

    let all = market
        .state
        .market
        .list_stocks(&StockFilter::default())
        .await
        .unwrap();
    let ids: Vec<&str> = all.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "3", "4"]);

    let filter = StockFilter {
        status: Some(StockStatus::Active),
        search: Some("dune".to_string()),
        sort: SortField::Title,
        order: SortOrder::Asc,
    };
    let dunes = market.state.market.list_stocks(&filter).await.unwrap();
    let titles: Vec<&str> = dunes.iter().map(|s| s.title.as_str()).collect();
    assert_eq!(titles, vec!["Dune", "Dune: Part Two"]);
}

#[tokio::test]
async fn test_price_history_validation() {
    let market = TestMarket::new(Arc::new(FixedPopularity::new(300)));
    seed_stale_stock(market.stocks.as_ref(), "550", 100).await;

    let err = market
        .state
        .market
        .price_history("550", Some(0))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 400);

    // Windows past the representable time range are rejected, not computed
    let err = assert_err!(
        market
            .state
            .market
            .price_history("550", Some(100_000_000_000))
            .await
    );
    assert_eq!(err.status_code(), 400);
    let err = assert_err!(market.state.market.price_history("550", Some(i64::MAX)).await);
    assert_eq!(err.status_code(), 400);

    let err = market
        .state
        .market
        .price_history("missing", None)
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    market.state.gate.refresh("550").await.unwrap();
    let history = market
        .state
        .market
        .price_history("550", Some(24))
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn test_batch_refresh_handles_stalest_active() {
    let market = TestMarket::new(Arc::new(FixedPopularity::new(300)));
    let stocks = market.stocks.as_ref();
    seed_stock(stocks, "1", "Old", 100, StockStatus::Active, Duration::hours(6)).await;
    seed_stock(stocks, "2", "Older", 100, StockStatus::Active, Duration::hours(9)).await;
    seed_stock(stocks, "3", "Fresh", 100, StockStatus::Active, Duration::minutes(5)).await;
    seed_stock(stocks, "4", "Soon", 100, StockStatus::Upcoming, Duration::hours(9)).await;

    let refresher = BatchRefresher::new(market.stocks.clone(), market.state.gate.clone())
        .with_batch_size(10);
    let report = refresher.refresh_batch().await.unwrap();

    assert_eq!(
        report,
        BatchReport {
            refreshed: 2,
            skipped: 1,
            failed: 0,
        }
    );

    let upcoming = market.state.market.get_stock("4").await.unwrap();
    assert_eq!(upcoming.current_price, Decimal::new(100, 0));
    assert_eq!(market.history.all().await.len(), 2);
}

#[tokio::test]
async fn test_batch_refresh_takes_stalest_first() {
    let market = TestMarket::new(Arc::new(FixedPopularity::new(300)));
    let stocks = market.stocks.as_ref();
    seed_stock(stocks, "1", "Old", 100, StockStatus::Active, Duration::hours(2)).await;
    seed_stock(stocks, "2", "Oldest", 100, StockStatus::Active, Duration::hours(9)).await;

    let refresher = BatchRefresher::new(market.stocks.clone(), market.state.gate.clone())
        .with_batch_size(1);
    let report = refresher.refresh_batch().await.unwrap();
    assert_eq!(report.refreshed, 1);

    let history = market.history.all().await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].movie_id, "2");
}
