use super::{accounts::require_user, AppState, AuthUser};
use crate::{
    db::{
        enums::{BrokerageEventKind, Currency},
        models::{
            brokerage::BrokerageAccount,
            events::{self, EventFilters},
            holdings::Holding,
        },
    },
    error::WalletError,
    services::events::{
        batch_patch_events, create_event_and_update_holding, delete_event_and_rebuild,
        import_events as import_events_service, BrokerageEventPayload, EventPatch, ImportEventRow,
        ImportSummary,
    },
};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use diesel_async::{scoped_futures::ScopedFutureExt, AsyncConnection};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

pub async fn list_brokerage_accounts(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<BrokerageAccount>>, WalletError> {
    let mut conn = state.pool.get().await.map_err(WalletError::pool)?;
    let rows = BrokerageAccount::list_for_user(&mut conn, user_id).await?;
    Ok(Json(rows))
}

#[derive(Debug, Serialize)]
pub struct EventWithHolding {
    pub id: Uuid,
    pub brokerage_account_id: Uuid,
    pub instrument_id: Uuid,
    pub kind: BrokerageEventKind,
    pub quantity: BigDecimal,
    pub price: BigDecimal,
    pub currency: Currency,
    pub split_ratio: BigDecimal,
    pub trade_at: chrono::DateTime<chrono::Utc>,
    pub holding: Option<Holding>,
}

pub async fn create_event(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<BrokerageEventPayload>,
) -> Result<Json<EventWithHolding>, WalletError> {
    let mut conn = state.pool.get().await.map_err(WalletError::pool)?;
    require_user(&mut conn, user_id).await?;

    let (event, holding) = conn
        .transaction::<_, WalletError, _>(|conn| {
            async move { create_event_and_update_holding(conn, &payload, true).await }
                .scope_boxed()
        })
        .await?;

    Ok(Json(EventWithHolding {
        id: event.id,
        brokerage_account_id: event.brokerage_account_id,
        instrument_id: event.instrument_id,
        kind: event.kind,
        quantity: event.quantity,
        price: event.price,
        currency: event.currency,
        split_ratio: event.split_ratio,
        trade_at: event.trade_at,
        holding,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub brokerage_account_id: Uuid,
    pub events: Vec<ImportEventRow>,
}

pub async fn import_events(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<ImportRequest>,
) -> Result<Json<ImportSummary>, WalletError> {
    let mut conn = state.pool.get().await.map_err(WalletError::pool)?;
    require_user(&mut conn, user_id).await?;
    let summary =
        import_events_service(&mut conn, body.brokerage_account_id, &body.events).await?;
    Ok(Json(summary))
}

/// Multi-value filters arrive as comma-separated lists
/// (`kind=BUY,SELL&currency=PLN`).
#[derive(Debug, Deserialize)]
pub struct EventPageParams {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_size")]
    pub size: i64,
    #[serde(default)]
    pub brokerage_account_id: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub date_from: Option<NaiveDate>,
    #[serde(default)]
    pub date_to: Option<NaiveDate>,
    #[serde(default)]
    pub q: Option<String>,
}

fn default_page() -> i64 {
    1
}

fn default_size() -> i64 {
    40
}

fn parse_list<T>(
    raw: &Option<String>,
    what: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<Option<Vec<T>>, WalletError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let mut out = vec![];
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let parsed = parse(part)
            .ok_or_else(|| WalletError::Validation(format!("Invalid {what}: {part:?}")))?;
        out.push(parsed);
    }
    Ok((!out.is_empty()).then_some(out))
}

#[derive(Debug, Serialize)]
pub struct EventRowOut {
    pub id: Uuid,
    pub brokerage_account_id: Uuid,
    pub brokerage_account_name: String,
    pub instrument_id: Uuid,
    pub instrument_symbol: String,
    pub instrument_name: Option<String>,
    pub kind: BrokerageEventKind,
    pub quantity: BigDecimal,
    pub price: BigDecimal,
    pub currency: Currency,
    pub split_ratio: BigDecimal,
    pub trade_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
pub struct EventPageOut {
    pub items: Vec<EventRowOut>,
    pub total: i64,
    pub page: i64,
    pub size: i64,
    pub sum_by_ccy: HashMap<String, BigDecimal>,
}

pub async fn list_events(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(params): Query<EventPageParams>,
) -> Result<Json<EventPageOut>, WalletError> {
    let mut conn = state.pool.get().await.map_err(WalletError::pool)?;
    let filters = EventFilters {
        brokerage_account_ids: parse_list(&params.brokerage_account_id, "account id", |s| {
            Uuid::parse_str(s).ok()
        })?,
        kinds: parse_list(&params.kind, "event kind", BrokerageEventKind::from_code)?,
        currencies: parse_list(&params.currency, "currency", Currency::from_code)?,
        date_from: params.date_from,
        date_to: params.date_to,
        q: params.q,
    };
    let page = events::list_events_page(&mut conn, user_id, params.page, params.size, &filters)
        .await?;
    Ok(Json(EventPageOut {
        items: page
            .rows
            .into_iter()
            .map(|(event, account, instrument)| EventRowOut {
                id: event.id,
                brokerage_account_id: event.brokerage_account_id,
                brokerage_account_name: account.name,
                instrument_id: event.instrument_id,
                instrument_symbol: instrument.symbol,
                instrument_name: instrument.name,
                kind: event.kind,
                quantity: event.quantity,
                price: event.price,
                currency: event.currency,
                split_ratio: event.split_ratio,
                trade_at: event.trade_at,
            })
            .collect(),
        total: page.total,
        page: page.page,
        size: page.size,
        sum_by_ccy: page.sum_by_ccy,
    }))
}

#[derive(Debug, Deserialize)]
pub struct BatchPatchRequest {
    pub items: Vec<EventPatch>,
}

#[derive(Debug, Serialize)]
pub struct BatchPatchOut {
    pub updated: usize,
}

pub async fn patch_events_batch(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<BatchPatchRequest>,
) -> Result<Json<BatchPatchOut>, WalletError> {
    let mut conn = state.pool.get().await.map_err(WalletError::pool)?;
    let updated = conn
        .transaction::<_, WalletError, _>(|conn| {
            async move { batch_patch_events(conn, user_id, &body.items).await }.scope_boxed()
        })
        .await?;
    Ok(Json(BatchPatchOut { updated }))
}

#[derive(Debug, Serialize)]
pub struct DeleteOut {
    pub ok: bool,
}

pub async fn delete_event(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(event_id): Path<Uuid>,
) -> Result<Json<DeleteOut>, WalletError> {
    let mut conn = state.pool.get().await.map_err(WalletError::pool)?;
    let deleted = conn
        .transaction::<_, WalletError, _>(|conn| {
            async move { delete_event_and_rebuild(conn, user_id, event_id).await }.scope_boxed()
        })
        .await?;
    if !deleted {
        return Err(WalletError::NotFound("Event not found".to_string()));
    }
    Ok(Json(DeleteOut { ok: true }))
}
