//! Monthly point-in-time snapshots. One run freezes the FX map for the month
//! and captures per-entity values across deposits, brokerage cash and
//! positions, metals and real estate. All writers are upserts, so a re-run
//! for the same month converges to identical rows.

use crate::{
    clients::StockClient,
    db::{
        enums::Currency,
        models::{
            assets::{MetalHolding, RealEstate, RealEstatePrice},
            brokerage::BrokerageAccount,
            deposits::{BrokerageDepositLink, DepositAccount, DepositAccountBalance},
            holdings::Holding,
            snapshots,
            wallets::Wallet,
        },
    },
    error::WalletError,
    money::{q2, troy_ounce_grams, FxTable},
};
use bigdecimal::BigDecimal;
use diesel_async::AsyncPgConnection;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize)]
pub struct SnapshotOutcome {
    pub ok: bool,
    pub month_key: String,
    pub fx_saved: bool,
    pub dep_upserted: usize,
    pub bro_upserted: usize,
    pub metal_upserted: usize,
    pub re_upserted: usize,
}

/// `YYYY-MM` with a real month number.
pub fn validate_month_key(month_key: &str) -> bool {
    let Some((year, month)) = month_key.split_once('-') else {
        return false;
    };
    year.len() == 4
        && month.len() == 2
        && year.chars().all(|c| c.is_ascii_digit())
        && matches!(month.parse::<u8>(), Ok(1..=12))
}

pub async fn create_monthly_snapshot(
    conn: &mut AsyncPgConnection,
    stock: &StockClient,
    user_id: Uuid,
    month_key: &str,
    fx_map: &FxTable,
) -> Result<SnapshotOutcome, WalletError> {
    if !validate_month_key(month_key) {
        return Err(WalletError::Validation(format!(
            "Invalid month key {month_key:?}, expected YYYY-MM"
        )));
    }

    let wallets = Wallet::list_for_user(conn, user_id).await?;
    let wallet_ids: Vec<Uuid> = wallets.iter().map(|w| w.id).collect();

    // 1. Freeze the FX map used for this month.
    let rates_json = serde_json::to_value(
        fx_map
            .iter()
            .map(|(pair, rate)| (pair.clone(), rate.to_string()))
            .collect::<HashMap<String, String>>(),
    )
    .map_err(|e| WalletError::Internal(e.into()))?;
    snapshots::upsert_fx_snapshot(conn, month_key, &rates_json).await?;

    // 2. Deposit accounts: current available balance.
    let mut dep_upserted = 0usize;
    let deposit_accounts = DepositAccount::list_for_wallets(conn, &wallet_ids).await?;
    for account in &deposit_accounts {
        let available = DepositAccountBalance::get(conn, account.id)
            .await?
            .map(|b| b.available)
            .unwrap_or_default();
        snapshots::upsert_deposit_snapshot(
            conn,
            account.id,
            account.wallet_id,
            month_key,
            account.currency,
            &available,
        )
        .await?;
        dep_upserted += 1;
    }

    // One bulk quote call covers every held symbol plus the metal futures.
    let brokerage_accounts = BrokerageAccount::list_for_wallets(conn, &wallet_ids).await?;
    let metals = MetalHolding::list_for_wallets(conn, &wallet_ids).await?;
    let mut symbols: Vec<String> = vec![];
    let mut holdings_by_account: HashMap<Uuid, Vec<_>> = HashMap::new();
    for account in &brokerage_accounts {
        let rows = Holding::list_for_account(conn, account.id).await?;
        symbols.extend(rows.iter().map(|(_, i)| i.symbol.clone()));
        holdings_by_account.insert(account.id, rows);
    }
    symbols.extend(metals.iter().map(|m| m.metal.futures_symbol().to_string()));
    symbols.sort();
    symbols.dedup();
    let quotes = stock.latest_for_symbols(&symbols).await;
    if quotes.is_empty() && !symbols.is_empty() {
        warn!(
            month_key = month_key,
            "No live quotes available, position values will be zero"
        );
    }

    // 3. Brokerage accounts: cash per linked currency plus positions valued
    //    at the live quote, grouped by quote currency.
    let mut bro_upserted = 0usize;
    for account in &brokerage_accounts {
        let mut cash_by_ccy: HashMap<Currency, BigDecimal> = HashMap::new();
        for link in BrokerageDepositLink::list_for_brokerage(conn, account.id).await? {
            let available = DepositAccountBalance::get(conn, link.deposit_account_id)
                .await?
                .map(|b| b.available)
                .unwrap_or_default();
            *cash_by_ccy.entry(link.currency).or_default() += available;
        }

        let mut stocks_by_ccy: HashMap<Currency, BigDecimal> = HashMap::new();
        for (holding, instrument) in holdings_by_account.get(&account.id).into_iter().flatten() {
            let Some(quote) = quotes.get(&instrument.symbol) else {
                warn!(symbol = instrument.symbol, "No quote for held symbol");
                continue;
            };
            let Some(currency) = Currency::from_code(&quote.currency) else {
                warn!(
                    symbol = instrument.symbol,
                    currency = quote.currency,
                    "Unsupported quote currency"
                );
                continue;
            };
            *stocks_by_ccy.entry(currency).or_default() +=
                q2(&(&holding.quantity * &quote.price));
        }

        let mut currencies: Vec<Currency> = cash_by_ccy
            .keys()
            .chain(stocks_by_ccy.keys())
            .copied()
            .collect();
        currencies.sort_by_key(|c| c.as_str());
        currencies.dedup();
        for currency in currencies {
            let cash = cash_by_ccy.get(&currency).cloned().unwrap_or_default();
            let stocks = stocks_by_ccy.get(&currency).cloned().unwrap_or_default();
            snapshots::upsert_brokerage_snapshot(
                conn,
                account.id,
                account.wallet_id,
                month_key,
                currency,
                &q2(&cash),
                &stocks,
            )
            .await?;
            bro_upserted += 1;
        }
    }

    // 4. Metals: futures quote times troy ounces held.
    let mut metal_upserted = 0usize;
    for metal in &metals {
        let Some(quote) = quotes.get(metal.metal.futures_symbol()) else {
            warn!(metal = metal.metal.as_str(), "No futures quote for metal");
            continue;
        };
        let Some(currency) = Currency::from_code(&quote.currency) else {
            continue;
        };
        let ounces = &metal.grams / troy_ounce_grams();
        let value = q2(&(ounces * &quote.price));
        snapshots::upsert_metal_snapshot(
            conn,
            metal.id,
            metal.wallet_id,
            month_key,
            currency,
            &value,
        )
        .await?;
        metal_upserted += 1;
    }

    // 5. Real estate: latest price-per-m² with location fallback.
    let mut re_upserted = 0usize;
    for estate in &RealEstate::list_for_wallets(conn, &wallet_ids).await? {
        let price = RealEstatePrice::latest_with_fallback(
            conn,
            estate.property_type,
            estate.purchase_currency,
            &estate.country,
            estate.city.as_deref(),
        )
        .await?;
        let value = match price {
            Some(price) => q2(&(&price.price_m2 * &estate.area_m2)),
            None => {
                // No observation anywhere; fall back to cost.
                warn!(real_estate_id = %estate.id, "No price-per-m2 observation, using purchase price");
                q2(&estate.purchase_price)
            },
        };
        snapshots::upsert_real_estate_snapshot(
            conn,
            estate.id,
            estate.wallet_id,
            month_key,
            estate.purchase_currency,
            &value,
        )
        .await?;
        re_upserted += 1;
    }

    info!(
        month_key = month_key,
        dep = dep_upserted,
        bro = bro_upserted,
        metal = metal_upserted,
        re = re_upserted,
        "Monthly snapshot created"
    );
    Ok(SnapshotOutcome {
        ok: true,
        month_key: month_key.to_string(),
        fx_saved: true,
        dep_upserted,
        bro_upserted,
        metal_upserted,
        re_upserted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_month_key() {
        assert!(validate_month_key("2026-01"));
        assert!(validate_month_key("1999-12"));
        assert!(!validate_month_key("2026-13"));
        assert!(!validate_month_key("2026-00"));
        assert!(!validate_month_key("2026-1"));
        assert!(!validate_month_key("26-01"));
        assert!(!validate_month_key("garbage"));
    }
}
