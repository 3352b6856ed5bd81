//! Read-side HTTP surface consumed by the wallet service and the UI gateway.

use crate::{
    candles::{sync_daily_candles, SyncDailyOutcome, SyncDailyRequest},
    db::{
        enums::Currency,
        models::{instrument::Instrument, quote_latest::QuoteLatest},
    },
    error::ApiError,
};
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use db_common::ArcDbPool;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub pool: ArcDbPool,
    pub http: reqwest::Client,
    pub historical_base_url: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/stock/quotes/latest", get(latest_quote))
        .route("/stock/quotes/latest/bulk", get(latest_bulk))
        .route("/stock/quotes/latest/symbols", post(latest_for_symbols))
        .route("/stock/instruments/options", get(instrument_options))
        .route("/stock/instruments/search", get(instrument_search))
        .route(
            "/stock/instruments/:symbol/candles/daily/sync",
            post(candles_daily_sync),
        )
        .with_state(state)
}

pub async fn serve(state: AppState, listen_address: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(listen_address).await?;
    info!(address = listen_address, "Market-data API listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

#[derive(Clone, Debug, Serialize)]
pub struct QuotePayload {
    pub name: Option<String>,
    pub last_price: BigDecimal,
    pub change_pct: BigDecimal,
    pub volume: Option<i64>,
    pub last_trade_at: DateTime<Utc>,
}

impl QuotePayload {
    fn from_row(quote: &QuoteLatest, instrument: &Instrument) -> Self {
        Self {
            name: Some(instrument.shortname.clone()),
            last_price: quote.last_price.clone(),
            change_pct: quote.change_pct.clone(),
            volume: quote.volume,
            last_trade_at: quote.last_trade_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LatestQuoteParams {
    mic: String,
    symbol: String,
}

async fn latest_quote(
    State(state): State<AppState>,
    Query(params): Query<LatestQuoteParams>,
) -> Result<Json<QuotePayload>, ApiError> {
    let mut conn = state.pool.get().await.map_err(ApiError::pool)?;
    let row = QuoteLatest::fetch_for_symbol(&mut conn, &params.mic, &params.symbol)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(format!(
                "No latest quote for {} on {}",
                params.symbol, params.mic
            ))
        })?;
    Ok(Json(QuotePayload::from_row(&row.0, &row.1)))
}

#[derive(Debug, Deserialize)]
struct BulkParams {
    mic: String,
}

async fn latest_bulk(
    State(state): State<AppState>,
    Query(params): Query<BulkParams>,
) -> Result<Json<HashMap<String, QuotePayload>>, ApiError> {
    let mut conn = state.pool.get().await.map_err(ApiError::pool)?;
    let rows = QuoteLatest::fetch_for_mic(&mut conn, &params.mic).await?;
    if rows.is_empty() {
        return Err(ApiError::NotFound(format!(
            "No latest quotes for {}",
            params.mic
        )));
    }
    Ok(Json(
        rows.iter()
            .map(|(q, i)| (i.symbol.clone(), QuotePayload::from_row(q, i)))
            .collect(),
    ))
}

#[derive(Debug, Deserialize)]
struct SymbolsRequest {
    symbols: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct LatestQuoteBySymbol {
    pub symbol: String,
    pub price: BigDecimal,
    pub currency: Currency,
}

async fn latest_for_symbols(
    State(state): State<AppState>,
    Json(req): Json<SymbolsRequest>,
) -> Result<Json<Vec<LatestQuoteBySymbol>>, ApiError> {
    if req.symbols.is_empty() {
        return Ok(Json(vec![]));
    }
    let mut conn = state.pool.get().await.map_err(ApiError::pool)?;
    let rows = QuoteLatest::fetch_for_symbols(&mut conn, &req.symbols).await?;
    Ok(Json(
        rows.into_iter()
            .map(|(symbol, quote, currency)| LatestQuoteBySymbol {
                symbol,
                price: quote.last_price,
                currency,
            })
            .collect(),
    ))
}

#[derive(Debug, Deserialize)]
struct OptionsParams {
    mic: String,
    #[serde(default = "default_options_limit")]
    limit: i64,
    #[serde(default)]
    offset: i64,
}

fn default_options_limit() -> i64 {
    1200
}

#[derive(Clone, Debug, Serialize)]
struct InstrumentOption {
    symbol: String,
    shortname: String,
    name: Option<String>,
    currency: Currency,
}

async fn instrument_options(
    State(state): State<AppState>,
    Query(params): Query<OptionsParams>,
) -> Result<Json<Vec<InstrumentOption>>, ApiError> {
    let mut conn = state.pool.get().await.map_err(ApiError::pool)?;
    let rows = Instrument::list_for_mic(&mut conn, &params.mic, params.limit, params.offset).await?;
    Ok(Json(
        rows.into_iter()
            .map(|i| InstrumentOption {
                symbol: i.symbol,
                shortname: i.shortname,
                name: i.name,
                currency: i.currency,
            })
            .collect(),
    ))
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    q: String,
    #[serde(default = "default_search_limit")]
    limit: i64,
}

fn default_search_limit() -> i64 {
    20
}

#[derive(Clone, Debug, Serialize)]
struct InstrumentSearchHit {
    symbol: String,
    shortname: String,
    name: Option<String>,
    mic: String,
    currency: Currency,
}

async fn instrument_search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<InstrumentSearchHit>>, ApiError> {
    let mut conn = state.pool.get().await.map_err(ApiError::pool)?;
    let rows = Instrument::search(&mut conn, &params.q, params.limit.clamp(1, 100)).await?;
    Ok(Json(
        rows.into_iter()
            .map(|(i, mic)| InstrumentSearchHit {
                symbol: i.symbol,
                shortname: i.shortname,
                name: i.name,
                mic,
                currency: i.currency,
            })
            .collect(),
    ))
}

async fn candles_daily_sync(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Json(req): Json<SyncDailyRequest>,
) -> Result<Json<SyncDailyOutcome>, ApiError> {
    let outcome = sync_daily_candles(
        state.pool.clone(),
        &state.http,
        &state.historical_base_url,
        &symbol,
        &req,
    )
    .await?;
    Ok(Json(outcome))
}
