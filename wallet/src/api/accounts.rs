use super::{AppState, AuthUser};
use crate::{
    db::models::{
        users::User,
        wallets::{Wallet, WalletCreateOutcome},
    },
    error::WalletError,
    services::accounts::{
        self, AccountListItem, CreateAccountOut, CreateAccountRequest, UserSyncOut,
    },
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use diesel_async::{scoped_futures::ScopedFutureExt, AsyncConnection};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct SyncUserBody {
    #[serde(default)]
    pub email: Option<String>,
}

pub async fn sync_user(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<SyncUserBody>,
) -> Result<Json<UserSyncOut>, WalletError> {
    let mut conn = state.pool.get().await.map_err(WalletError::pool)?;
    let out = conn
        .transaction::<_, WalletError, _>(|conn| {
            async move { accounts::sync_user(conn, user_id, body.email.as_deref()).await }
                .scope_boxed()
        })
        .await?;
    Ok(Json(out))
}

#[derive(Debug, Deserialize)]
pub struct CreateWalletBody {
    pub name: String,
}

pub async fn create_wallet(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<CreateWalletBody>,
) -> Result<(StatusCode, Json<Wallet>), WalletError> {
    if body.name.trim().is_empty() {
        return Err(WalletError::Validation(
            "Wallet name must not be empty".to_string(),
        ));
    }
    let mut conn = state.pool.get().await.map_err(WalletError::pool)?;
    require_user(&mut conn, user_id).await?;
    match Wallet::create(&mut conn, user_id, &body.name).await? {
        WalletCreateOutcome::Created(wallet) => Ok((StatusCode::CREATED, Json(wallet))),
        WalletCreateOutcome::DuplicateName => Err(WalletError::Validation(
            "A wallet with this name already exists".to_string(),
        )),
    }
}

pub async fn delete_wallet(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(wallet_id): Path<Uuid>,
) -> Result<StatusCode, WalletError> {
    let mut conn = state.pool.get().await.map_err(WalletError::pool)?;
    if Wallet::delete_owned(&mut conn, user_id, wallet_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(WalletError::NotFound("Wallet not found".to_string()))
    }
}

pub async fn create_account(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(wallet_id): Path<Uuid>,
    Json(body): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<CreateAccountOut>), WalletError> {
    let mut conn = state.pool.get().await.map_err(WalletError::pool)?;
    let secrets = state.secrets.clone();
    // The deposit account, the paired brokerage account and the link commit
    // or roll back together.
    let out = conn
        .transaction::<_, WalletError, _>(|conn| {
            async move {
                accounts::create_account(conn, &secrets, user_id, wallet_id, &body).await
            }
            .scope_boxed()
        })
        .await?;
    Ok((StatusCode::CREATED, Json(out)))
}

#[derive(Debug, Deserialize)]
pub struct ListAccountsParams {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub bank_id: Option<Uuid>,
}

pub async fn list_accounts(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(params): Query<ListAccountsParams>,
) -> Result<Json<Vec<AccountListItem>>, WalletError> {
    let mut conn = state.pool.get().await.map_err(WalletError::pool)?;
    let out =
        accounts::list_accounts(&mut conn, user_id, params.q.as_deref(), params.bank_id).await?;
    Ok(Json(out))
}

pub(super) async fn require_user(
    conn: &mut diesel_async::AsyncPgConnection,
    user_id: Uuid,
) -> Result<(), WalletError> {
    match User::find(conn, user_id).await? {
        Some(_) => Ok(()),
        None => Err(WalletError::Validation("Unknown user_id".to_string())),
    }
}
