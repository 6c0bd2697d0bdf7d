//! HTTP API for the movie stock engine
//!
//! Thin `axum` handlers over the services in `AppState`. Errors become
//! `{ "error": message }` bodies through `AppError`'s `IntoResponse`.

use crate::auth;
use crate::error::{AppError, AppResult};
use crate::models::{HistoryPoint, MovieStock, SortField, SortOrder, StockFilter, StockStatus};
use crate::services::RefreshOutcome;
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

/// HTTP service wrapper
pub struct MarketHttpService {
    app_state: Arc<AppState>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RefreshParams {
    pub force: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StockParams {
    pub refresh: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub status: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryParams {
    pub hours: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct StockResponse {
    pub stock: MovieStock,
}

#[derive(Debug, Serialize)]
pub struct StocksResponse {
    pub stocks: Vec<MovieStock>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub movie_id: String,
    pub history: Vec<HistoryPoint>,
}

impl ListParams {
    /// Validate the query string into a listing filter
    pub fn into_filter(self) -> AppResult<StockFilter> {
        let status = self
            .status
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(StockStatus::from_str)
            .transpose()
            .map_err(AppError::Validation)?;

        let sort = self
            .sort
            .as_deref()
            .map(SortField::from_str)
            .transpose()
            .map_err(AppError::Validation)?
            .unwrap_or_default();

        let order = self
            .order
            .as_deref()
            .map(SortOrder::from_str)
            .transpose()
            .map_err(AppError::Validation)?
            .unwrap_or_default();

        Ok(StockFilter {
            status,
            search: self.search,
            sort,
            order,
        })
    }
}

impl MarketHttpService {
    /// Create a new HTTP service
    pub fn new(app_state: Arc<AppState>) -> Self {
        Self { app_state }
    }

    /// Build the router for this service
    pub fn into_router(self) -> Router {
        Router::new()
            .route("/health", get(health))
            .route("/api/market/stocks", get(list_stocks))
            .route("/api/market/stocks/{movie_id}", get(get_stock))
            .route("/api/market/stocks/{movie_id}/history", get(price_history))
            .route("/api/market/update-price/{movie_id}", post(update_price))
            .route(
                "/api/market/prune-history",
                post(prune_history).get(history_stats),
            )
            .with_state(self.app_state)
    }
}

async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let database = match &state.database {
        Some(db) => match db.ping().await {
            Ok(()) => "up",
            Err(_) => "down",
        },
        None => "embedded",
    };

    Json(json!({
        "status": "healthy",
        "service": "movie-stock-engine",
        "database": database,
    }))
}

/// Run the staleness gate for one stock
async fn update_price(
    State(state): State<Arc<AppState>>,
    Path(movie_id): Path<String>,
    Query(params): Query<RefreshParams>,
) -> AppResult<Json<RefreshOutcome>> {
    let outcome = if params.force.unwrap_or(false) {
        state.gate.force_refresh(&movie_id).await?
    } else {
        state.gate.refresh(&movie_id).await?
    };

    Ok(Json(outcome))
}

/// Read one stock, optionally running a freshness check first
async fn get_stock(
    State(state): State<Arc<AppState>>,
    Path(movie_id): Path<String>,
    Query(params): Query<StockParams>,
) -> AppResult<Json<StockResponse>> {
    let stock = if params.refresh.unwrap_or(false) {
        state.gate.refresh(&movie_id).await?.stock
    } else {
        state.market.get_stock(&movie_id).await?
    };

    Ok(Json(StockResponse { stock }))
}

async fn list_stocks(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> AppResult<Json<StocksResponse>> {
    let filter = params.into_filter()?;
    let stocks = state.market.list_stocks(&filter).await?;

    Ok(Json(StocksResponse { stocks }))
}

async fn price_history(
    State(state): State<Arc<AppState>>,
    Path(movie_id): Path<String>,
    Query(params): Query<HistoryParams>,
) -> AppResult<Json<HistoryResponse>> {
    let history = state.market.price_history(&movie_id, params.hours).await?;

    Ok(Json(HistoryResponse { movie_id, history }))
}

/// Retention trigger for the scheduled job
async fn prune_history(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    auth::verify_cron_secret(state.market_config.cron_secret.as_deref(), authorization)?;

    let report = state
        .ledger
        .prune(state.market_config.history_retention())
        .await?;
    info!("Prune triggered over HTTP: {} deleted", report.deleted);

    Ok(Json(json!({
        "success": true,
        "message": "Market history pruned successfully",
        "deleted": report.deleted,
        "remainingRecords": report.remaining,
        "cutoff": report.cutoff,
        "timestamp": Utc::now(),
    })))
}

/// Monitoring view of the history table
async fn history_stats(State(state): State<Arc<AppState>>) -> AppResult<Json<Value>> {
    let stats = state
        .ledger
        .stats(state.market_config.history_retention())
        .await?;

    Ok(Json(json!({
        "totalRecords": stats.total_records,
        "recordsToPrune": stats.records_to_prune,
        "oldestRecord": stats.oldest_record,
        "newestRecord": stats.newest_record,
        "timestamp": Utc::now(),
    })))
}
