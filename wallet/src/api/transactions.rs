use super::{AppState, AuthUser};
use crate::{
    db::{
        enums::CapitalGainKind,
        models::{deposits::DepositAccount, wallets::Wallet},
    },
    error::WalletError,
    services::ledger::{append_transactions, LedgerRow},
};
use axum::{extract::State, Json};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel_async::{scoped_futures::ScopedFutureExt, AsyncConnection};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct TransactionIn {
    pub date: DateTime<Utc>,
    pub amount: BigDecimal,
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub amount_after: Option<BigDecimal>,
    #[serde(default)]
    pub capital_gain_kind: Option<CapitalGainKind>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTransactionsRequest {
    pub account_id: Uuid,
    pub transactions: Vec<TransactionIn>,
    #[serde(default)]
    pub verify_amount_after: bool,
}

#[derive(Debug, Serialize)]
pub struct CreateTransactionsOut {
    pub created: usize,
    pub final_balance: BigDecimal,
    pub account_id: Uuid,
}

pub async fn create_transactions(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<CreateTransactionsRequest>,
) -> Result<Json<CreateTransactionsOut>, WalletError> {
    let mut conn = state.pool.get().await.map_err(WalletError::pool)?;

    let account = DepositAccount::find(&mut conn, body.account_id)
        .await?
        .ok_or_else(|| WalletError::Validation("Unknown account_id".to_string()))?;
    Wallet::find_owned(&mut conn, user_id, account.wallet_id)
        .await?
        .ok_or_else(|| WalletError::NotFound("Account not found".to_string()))?;

    let rows: Vec<LedgerRow> = body
        .transactions
        .iter()
        .map(|t| LedgerRow {
            date: t.date,
            amount: t.amount.clone(),
            description: t.description.clone(),
            category: t.category.clone(),
            amount_after: t.amount_after.clone(),
            capital_gain_kind: t.capital_gain_kind,
        })
        .collect();

    let verify = body.verify_amount_after;
    let summary = conn
        .transaction::<_, WalletError, _>(|conn| {
            async move { append_transactions(conn, &account, rows, verify).await }.scope_boxed()
        })
        .await?;

    Ok(Json(CreateTransactionsOut {
        created: summary.created,
        final_balance: summary.final_balance,
        account_id: body.account_id,
    }))
}
