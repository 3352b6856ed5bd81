//! HTTP surface of the wallet domain. All routes authenticate via the
//! `X-User-Id` header set by the UI gateway after session validation.

pub mod accounts;
pub mod brokerage;
pub mod manager;
pub mod transactions;

use crate::{clients::StockClient, error::WalletError, services::secure::SecretBox};
use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    routing::{delete, get, patch, post},
    Router,
};
use db_common::ArcDbPool;
use tracing::info;
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub pool: ArcDbPool,
    pub stock: StockClient,
    pub secrets: SecretBox,
}

/// Authenticated internal user, extracted from the `X-User-Id` header.
pub struct AuthUser(pub Uuid);

#[async_trait::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = WalletError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get("X-User-Id")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| WalletError::Unauthorized("Missing X-User-Id header".to_string()))?;
        let user_id = Uuid::parse_str(raw)
            .map_err(|_| WalletError::Unauthorized("Invalid X-User-Id header".to_string()))?;
        Ok(AuthUser(user_id))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/wallet/sync/user", post(accounts::sync_user))
        .route("/wallet/create/wallet", post(accounts::create_wallet))
        .route("/wallet/delete/:wallet_id", delete(accounts::delete_wallet))
        .route("/wallet/accounts", get(accounts::list_accounts))
        .route(
            "/wallet/:wallet_id/account/create",
            post(accounts::create_account),
        )
        .route(
            "/wallet/brokerage/accounts",
            get(brokerage::list_brokerage_accounts),
        )
        .route("/wallet/brokerage/event", post(brokerage::create_event))
        .route(
            "/wallet/brokerage/events/import",
            post(brokerage::import_events),
        )
        .route("/wallet/brokerage/events", get(brokerage::list_events))
        .route(
            "/wallet/brokerage/events/batch",
            patch(brokerage::patch_events_batch),
        )
        .route(
            "/wallet/brokerage/events/:event_id",
            delete(brokerage::delete_event),
        )
        .route(
            "/wallet/transactions/create",
            post(transactions::create_transactions),
        )
        .route(
            "/wallet/snapshots/monthly",
            post(manager::create_monthly_snapshot),
        )
        .route("/wallet/manager/tree", post(manager::wallet_manager_tree))
        .route("/wallet/metals/:id/sell", post(manager::sell_metal))
        .route(
            "/wallet/real-estate/:id/sell",
            post(manager::sell_real_estate),
        )
        .with_state(state)
}

pub async fn serve(state: AppState, listen_address: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(listen_address).await?;
    info!(address = listen_address, "Wallet API listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}
