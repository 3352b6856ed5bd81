//! Disposal of non-brokerage assets. A sale records the realized gain against
//! the proceeds account and optionally books the proceeds as an INCOME
//! transaction; metals support partial sales with proportional cost
//! allocation, real estate sells whole.

use crate::{
    db::{
        enums::{CapitalGainKind, Currency},
        models::{
            assets::{MetalHolding, RealEstate},
            capital_gains::{CapitalGain, NewCapitalGain},
            deposits::DepositAccount,
            wallets::Wallet,
        },
    },
    error::WalletError,
    money::q2,
    services::ledger::{append_transactions, LedgerRow},
};
use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use diesel_async::AsyncPgConnection;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Clone, Debug, Deserialize)]
pub struct SellMetalRequest {
    pub deposit_account_id: Uuid,
    pub grams_sold: BigDecimal,
    pub proceeds_amount: BigDecimal,
    pub proceeds_currency: Currency,
    #[serde(default)]
    pub occurred_at: Option<DateTime<Utc>>,
    #[serde(default = "default_create_transaction")]
    pub create_transaction: bool,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SellRealEstateRequest {
    pub deposit_account_id: Uuid,
    pub proceeds_amount: BigDecimal,
    pub proceeds_currency: Currency,
    #[serde(default)]
    pub occurred_at: Option<DateTime<Utc>>,
    #[serde(default = "default_create_transaction")]
    pub create_transaction: bool,
}

fn default_create_transaction() -> bool {
    true
}

async fn proceeds_account(
    conn: &mut AsyncPgConnection,
    deposit_account_id: Uuid,
    wallet_id: Uuid,
    proceeds_currency: Currency,
) -> Result<DepositAccount, WalletError> {
    let account = DepositAccount::find(conn, deposit_account_id)
        .await?
        .ok_or_else(|| WalletError::NotFound("Deposit account not found".to_string()))?;
    if account.wallet_id != wallet_id {
        return Err(WalletError::Validation(
            "Deposit account belongs to a different wallet than the asset".to_string(),
        ));
    }
    if account.currency != proceeds_currency {
        return Err(WalletError::Validation(format!(
            "Deposit account currency is {}, but proceeds currency is {}",
            account.currency.as_str(),
            proceeds_currency.as_str()
        )));
    }
    Ok(account)
}

async fn book_proceeds(
    conn: &mut AsyncPgConnection,
    account: &DepositAccount,
    amount: &BigDecimal,
    description: String,
    occurred_at: DateTime<Utc>,
) -> Result<Option<Uuid>, WalletError> {
    let summary = append_transactions(
        conn,
        account,
        vec![LedgerRow {
            date: occurred_at,
            amount: amount.clone(),
            description,
            category: Some("INVESTMENTS".to_string()),
            amount_after: None,
            capital_gain_kind: None,
        }],
        false,
    )
    .await?;
    Ok(summary.transaction_ids.last().copied())
}

/// Sells part (or all) of a metal holding. Runs inside the caller's
/// transaction.
pub async fn sell_metal_holding(
    conn: &mut AsyncPgConnection,
    user_id: Uuid,
    metal_holding_id: Uuid,
    req: &SellMetalRequest,
) -> Result<(), WalletError> {
    let holding = MetalHolding::find(conn, metal_holding_id)
        .await?
        .ok_or_else(|| WalletError::NotFound("Metal holding not found".to_string()))?;
    Wallet::find_owned(conn, user_id, holding.wallet_id)
        .await?
        .ok_or_else(|| WalletError::NotFound("Wallet not found".to_string()))?;
    let account =
        proceeds_account(conn, req.deposit_account_id, holding.wallet_id, req.proceeds_currency)
            .await?;
    if holding.cost_currency != req.proceeds_currency {
        return Err(WalletError::Validation(format!(
            "Holding cost currency is {}, but proceeds currency is {}",
            holding.cost_currency.as_str(),
            req.proceeds_currency.as_str()
        )));
    }

    if req.grams_sold <= BigDecimal::zero() || req.grams_sold > holding.grams {
        return Err(WalletError::Validation(
            "The quantity for sale cannot exceed the quantity held".to_string(),
        ));
    }

    // Cost allocated to the sold grams, proportional to the position.
    let allocated_cost = if holding.cost_basis > BigDecimal::zero() {
        q2(&(&holding.cost_basis * &req.grams_sold / &holding.grams))
    } else {
        BigDecimal::zero()
    };
    let pnl = q2(&(&req.proceeds_amount - &allocated_cost));
    let occurred_at = req.occurred_at.unwrap_or_else(Utc::now);

    let transaction_id = if req.create_transaction {
        book_proceeds(
            conn,
            &account,
            &q2(&req.proceeds_amount),
            format!("Metal sale: {}", holding.metal.as_str()),
            occurred_at,
        )
        .await?
    } else {
        None
    };

    CapitalGain::insert(
        conn,
        &NewCapitalGain::new(
            CapitalGainKind::MetalRealizedPnl,
            pnl,
            req.proceeds_currency,
            occurred_at,
            account.id,
            transaction_id,
        ),
    )
    .await?;

    let remaining_grams = &holding.grams - &req.grams_sold;
    if remaining_grams <= BigDecimal::zero() {
        MetalHolding::delete(conn, holding.id).await?;
    } else {
        let remaining_cost = q2(&(&holding.cost_basis - &allocated_cost));
        MetalHolding::update_position(conn, holding.id, &remaining_grams, &remaining_cost).await?;
    }
    Ok(())
}

/// Sells a real-estate asset whole and deletes its row. Runs inside the
/// caller's transaction.
pub async fn sell_real_estate(
    conn: &mut AsyncPgConnection,
    user_id: Uuid,
    real_estate_id: Uuid,
    req: &SellRealEstateRequest,
) -> Result<(), WalletError> {
    let estate = RealEstate::find(conn, real_estate_id)
        .await?
        .ok_or_else(|| WalletError::NotFound("Real estate not found".to_string()))?;
    Wallet::find_owned(conn, user_id, estate.wallet_id)
        .await?
        .ok_or_else(|| WalletError::NotFound("Wallet not found".to_string()))?;
    let account =
        proceeds_account(conn, req.deposit_account_id, estate.wallet_id, req.proceeds_currency)
            .await?;
    if estate.purchase_currency != req.proceeds_currency {
        return Err(WalletError::Validation(format!(
            "Purchase currency is {}, but proceeds currency is {}",
            estate.purchase_currency.as_str(),
            req.proceeds_currency.as_str()
        )));
    }

    let pnl = q2(&(&req.proceeds_amount - &estate.purchase_price));
    let occurred_at = req.occurred_at.unwrap_or_else(Utc::now);

    let transaction_id = if req.create_transaction {
        let description = if estate.name.trim().is_empty() {
            "Property sale".to_string()
        } else {
            format!("Property sale: {}", estate.name.trim())
        };
        book_proceeds(conn, &account, &q2(&req.proceeds_amount), description, occurred_at).await?
    } else {
        None
    };

    CapitalGain::insert(
        conn,
        &NewCapitalGain::new(
            CapitalGainKind::RealEstateRealizedPnl,
            pnl,
            req.proceeds_currency,
            occurred_at,
            account.id,
            transaction_id,
        ),
    )
    .await?;

    RealEstate::delete(conn, estate.id).await?;
    Ok(())
}
