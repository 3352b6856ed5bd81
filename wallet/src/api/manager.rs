use super::{AppState, AuthUser};
use crate::{
    error::WalletError,
    money::FxTable,
    services::{
        assets::{sell_metal_holding, sell_real_estate as sell_real_estate_service,
            SellMetalRequest, SellRealEstateRequest},
        reporting::{build_wallet_manager_tree, WalletManagerWalletOut},
        snapshots::{create_monthly_snapshot as create_monthly_snapshot_service, SnapshotOutcome},
    },
};
use axum::{
    extract::{Path, State},
    Json,
};
use bigdecimal::BigDecimal;
use diesel_async::{scoped_futures::ScopedFutureExt, AsyncConnection};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, str::FromStr};
use uuid::Uuid;

/// FX maps arrive as `pair -> rate` with rates as JSON numbers or strings.
fn parse_fx_map(raw: &HashMap<String, serde_json::Value>) -> Result<FxTable, WalletError> {
    let mut table = FxTable::new();
    for (pair, value) in raw {
        let rate = match value {
            serde_json::Value::String(s) => BigDecimal::from_str(s).ok(),
            serde_json::Value::Number(n) => BigDecimal::from_str(&n.to_string()).ok(),
            _ => None,
        }
        .ok_or_else(|| {
            WalletError::Validation(format!("Invalid FX rate for pair {pair:?}"))
        })?;
        table.insert(pair.clone(), rate);
    }
    Ok(table)
}

#[derive(Debug, Deserialize)]
pub struct CreateMonthlySnapshotIn {
    pub month_key: String,
    pub currency_rate: HashMap<String, serde_json::Value>,
}

pub async fn create_monthly_snapshot(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<CreateMonthlySnapshotIn>,
) -> Result<Json<SnapshotOutcome>, WalletError> {
    let fx_map = parse_fx_map(&body.currency_rate)?;
    let mut conn = state.pool.get().await.map_err(WalletError::pool)?;
    let stock = state.stock.clone();
    let month_key = body.month_key.clone();
    let outcome = conn
        .transaction::<_, WalletError, _>(|conn| {
            async move {
                create_monthly_snapshot_service(conn, &stock, user_id, &month_key, &fx_map).await
            }
            .scope_boxed()
        })
        .await?;
    Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
pub struct WalletManagerTreeIn {
    #[serde(default = "default_months")]
    pub months: u32,
    #[serde(default)]
    pub currency_rate: HashMap<String, serde_json::Value>,
}

fn default_months() -> u32 {
    12
}

pub async fn wallet_manager_tree(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<WalletManagerTreeIn>,
) -> Result<Json<Vec<WalletManagerWalletOut>>, WalletError> {
    let fx_map = parse_fx_map(&body.currency_rate)?;
    let mut conn = state.pool.get().await.map_err(WalletError::pool)?;
    let tree =
        build_wallet_manager_tree(&mut conn, &state.stock, user_id, body.months, &fx_map).await?;
    Ok(Json(tree))
}

#[derive(Debug, Serialize)]
pub struct SellOut {
    pub ok: bool,
}

pub async fn sell_metal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(metal_holding_id): Path<Uuid>,
    Json(body): Json<SellMetalRequest>,
) -> Result<Json<SellOut>, WalletError> {
    let mut conn = state.pool.get().await.map_err(WalletError::pool)?;
    conn.transaction::<_, WalletError, _>(|conn| {
        async move { sell_metal_holding(conn, user_id, metal_holding_id, &body).await }
            .scope_boxed()
    })
    .await?;
    Ok(Json(SellOut { ok: true }))
}

pub async fn sell_real_estate(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(real_estate_id): Path<Uuid>,
    Json(body): Json<SellRealEstateRequest>,
) -> Result<Json<SellOut>, WalletError> {
    let mut conn = state.pool.get().await.map_err(WalletError::pool)?;
    conn.transaction::<_, WalletError, _>(|conn| {
        async move { sell_real_estate_service(conn, user_id, real_estate_id, &body).await }
            .scope_boxed()
    })
    .await?;
    Ok(Json(SellOut { ok: true }))
}
