//! Wallet-manager aggregation: the per-wallet tree of deposits, brokerage
//! positions, metals and real estate, valued with live quotes and converted
//! into a viewing currency, plus YTD income/expense and snapshot history.

use crate::{
    clients::{QuoteBySymbol, StockClient},
    db::{
        enums::TransactionStatus,
        models::{
            assets::{MetalHolding, RealEstate, RealEstatePrice},
            brokerage::BrokerageAccount,
            deposits::{BrokerageDepositLink, DepositAccount, DepositAccountBalance},
            holdings::Holding,
            instruments::Instrument,
            snapshots,
            wallets::Wallet,
        },
    },
    error::WalletError,
    money::{fx_convert, q2, troy_ounce_grams, FxTable, ANCHOR_CURRENCY},
};
use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use diesel_async::AsyncPgConnection;
use serde::Serialize;
use std::collections::HashMap;
use std::str::FromStr;
use tracing::warn;
use uuid::Uuid;

const TOP_N: usize = 5;

#[derive(Clone, Debug, Serialize)]
pub struct PositionPerformance {
    pub symbol: String,
    pub quantity: BigDecimal,
    pub avg_cost: BigDecimal,
    pub price: BigDecimal,
    pub currency: String,
    pub value: BigDecimal,
    pub cost: BigDecimal,
    pub pnl_amount: BigDecimal,
    pub pnl_pct: BigDecimal,
}

#[derive(Clone, Debug, Serialize)]
pub struct DepositNode {
    pub account_id: Uuid,
    pub name: String,
    pub currency: String,
    pub available: BigDecimal,
}

#[derive(Clone, Debug, Serialize)]
pub struct BrokerageNode {
    pub account_id: Uuid,
    pub name: String,
    pub cash_by_ccy: HashMap<String, BigDecimal>,
    pub positions: Vec<PositionPerformance>,
}

#[derive(Clone, Debug, Serialize)]
pub struct MetalNode {
    pub id: Uuid,
    pub metal: String,
    pub grams: BigDecimal,
    pub value: Option<BigDecimal>,
    pub currency: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct RealEstateNode {
    pub id: Uuid,
    pub name: String,
    pub value: BigDecimal,
    pub currency: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct MonthTotal {
    pub month_key: String,
    pub total: BigDecimal,
}

#[derive(Clone, Debug, Serialize)]
pub struct WalletManagerWalletOut {
    pub id: Uuid,
    pub name: String,
    pub deposits: Vec<DepositNode>,
    pub deposit_total_by_ccy: HashMap<String, BigDecimal>,
    pub brokerage: Vec<BrokerageNode>,
    pub top_gainers: Vec<PositionPerformance>,
    pub top_losers: Vec<PositionPerformance>,
    pub metals: Vec<MetalNode>,
    pub real_estates: Vec<RealEstateNode>,
    pub ytd_income_by_ccy: HashMap<String, BigDecimal>,
    pub ytd_expense_by_ccy: HashMap<String, BigDecimal>,
    pub view_currency: String,
    pub net_worth: BigDecimal,
    pub history: Vec<MonthTotal>,
}

/// Values holdings against live quotes. Positions without a quote are left
/// out rather than valued at zero.
pub fn position_performance(
    rows: &[(Holding, Instrument)],
    quotes: &HashMap<String, QuoteBySymbol>,
) -> Vec<PositionPerformance> {
    let mut out = vec![];
    for (holding, instrument) in rows {
        let Some(quote) = quotes.get(&instrument.symbol) else {
            warn!(symbol = instrument.symbol, "No quote for position");
            continue;
        };
        let value = q2(&(&holding.quantity * &quote.price));
        let cost = q2(&(&holding.quantity * &holding.avg_cost));
        let pnl_amount = q2(&(&value - &cost));
        let pnl_pct = if cost > BigDecimal::zero() {
            (&pnl_amount / &cost).with_scale_round(4, bigdecimal::RoundingMode::HalfUp)
        } else {
            BigDecimal::zero()
        };
        out.push(PositionPerformance {
            symbol: instrument.symbol.clone(),
            quantity: holding.quantity.clone(),
            avg_cost: holding.avg_cost.clone(),
            price: quote.price.clone(),
            currency: quote.currency.clone(),
            value,
            cost,
            pnl_amount,
            pnl_pct,
        });
    }
    out
}

/// Top gainers and losers by P&L percent.
pub fn top_performance(
    mut perf: Vec<PositionPerformance>,
    n: usize,
) -> (Vec<PositionPerformance>, Vec<PositionPerformance>) {
    perf.sort_by(|a, b| b.pnl_pct.cmp(&a.pnl_pct));
    let gainers = perf.iter().take(n).cloned().collect();
    perf.reverse();
    let losers = perf.into_iter().take(n).collect();
    (gainers, losers)
}

/// The last `n` month keys ending with the current month, oldest first.
pub fn last_n_month_keys(n: u32, now: DateTime<Utc>) -> Vec<String> {
    let mut year = now.year();
    let mut month = now.month() as i32;
    let mut keys = vec![];
    for _ in 0..n {
        keys.push(format!("{year:04}-{month:02}"));
        month -= 1;
        if month == 0 {
            month = 12;
            year -= 1;
        }
    }
    keys.reverse();
    keys
}

/// Decodes a stored FX snapshot (pair -> stringified rate) back into a table.
pub fn fx_table_from_json(rates: &serde_json::Value) -> FxTable {
    let mut table = FxTable::new();
    if let Some(map) = rates.as_object() {
        for (pair, rate) in map {
            let parsed = match rate {
                serde_json::Value::String(s) => BigDecimal::from_str(s).ok(),
                serde_json::Value::Number(n) => BigDecimal::from_str(&n.to_string()).ok(),
                _ => None,
            };
            if let Some(rate) = parsed {
                table.insert(pair.clone(), rate);
            }
        }
    }
    table
}

struct SnapshotAmount {
    wallet_id: Uuid,
    month_key: String,
    currency: String,
    amount: BigDecimal,
}

/// Folds snapshot rows into per-wallet monthly totals in the target
/// currency, each month converted with its own frozen FX table. Amounts with
/// no conversion path are skipped.
fn sum_monthly_totals(
    fx_by_month: &HashMap<String, FxTable>,
    target_ccy: &str,
    rows: Vec<SnapshotAmount>,
) -> HashMap<Uuid, HashMap<String, BigDecimal>> {
    let mut totals: HashMap<Uuid, HashMap<String, BigDecimal>> = HashMap::new();
    let empty = FxTable::new();
    for row in rows {
        let fx = fx_by_month.get(&row.month_key).unwrap_or(&empty);
        let Some(converted) = fx_convert(&row.amount, &row.currency, target_ccy, fx) else {
            warn!(
                month_key = row.month_key,
                currency = row.currency,
                "No FX path for snapshot amount"
            );
            continue;
        };
        *totals
            .entry(row.wallet_id)
            .or_default()
            .entry(row.month_key)
            .or_default() += converted;
    }
    totals
}

pub async fn build_wallet_manager_tree(
    conn: &mut AsyncPgConnection,
    stock: &StockClient,
    user_id: Uuid,
    months: u32,
    currency_rate: &FxTable,
) -> Result<Vec<WalletManagerWalletOut>, WalletError> {
    let view_ccy = ANCHOR_CURRENCY;
    let wallets = Wallet::list_for_user(conn, user_id).await?;
    let wallet_ids: Vec<Uuid> = wallets.iter().map(|w| w.id).collect();

    // Every symbol the tree needs, one quote call.
    let all_holdings = Holding::list_for_user(conn, user_id).await?;
    let metals = MetalHolding::list_for_wallets(conn, &wallet_ids).await?;
    let mut symbols: Vec<String> = all_holdings
        .iter()
        .map(|(_, i)| i.symbol.clone())
        .collect();
    symbols.extend(metals.iter().map(|m| m.metal.futures_symbol().to_string()));
    symbols.sort();
    symbols.dedup();
    let quotes = stock.latest_for_symbols(&symbols).await;

    // Snapshot history inputs.
    let month_keys = last_n_month_keys(months.min(60), Utc::now());
    let fx_by_month: HashMap<String, FxTable> =
        snapshots::fx_snapshots_for_months(conn, &month_keys)
            .await?
            .into_iter()
            .map(|snap| (snap.month_key.clone(), fx_table_from_json(&snap.rates)))
            .collect();
    let mut history_rows: Vec<SnapshotAmount> = vec![];
    for snap in snapshots::deposit_snapshots_for_months(conn, &wallet_ids, &month_keys).await? {
        history_rows.push(SnapshotAmount {
            wallet_id: snap.wallet_id,
            month_key: snap.month_key,
            currency: snap.currency.as_str().to_string(),
            amount: snap.available,
        });
    }
    for snap in snapshots::brokerage_snapshots_for_months(conn, &wallet_ids, &month_keys).await? {
        history_rows.push(SnapshotAmount {
            wallet_id: snap.wallet_id,
            month_key: snap.month_key,
            currency: snap.currency.as_str().to_string(),
            amount: &snap.cash + &snap.stocks,
        });
    }
    for snap in snapshots::metal_snapshots_for_months(conn, &wallet_ids, &month_keys).await? {
        history_rows.push(SnapshotAmount {
            wallet_id: snap.wallet_id,
            month_key: snap.month_key,
            currency: snap.currency.as_str().to_string(),
            amount: snap.value,
        });
    }
    for snap in snapshots::real_estate_snapshots_for_months(conn, &wallet_ids, &month_keys).await? {
        history_rows.push(SnapshotAmount {
            wallet_id: snap.wallet_id,
            month_key: snap.month_key,
            currency: snap.currency.as_str().to_string(),
            amount: snap.value,
        });
    }
    let mut monthly_totals = sum_monthly_totals(&fx_by_month, view_ccy, history_rows);

    // YTD ledger totals.
    let year_start = NaiveDate::from_ymd_opt(Utc::now().year(), 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc();
    let ytd_rows = crate::db::models::transactions::Transaction::ytd_for_wallets(
        conn,
        &wallet_ids,
        year_start,
    )
    .await?;
    let deposit_wallet: HashMap<Uuid, Uuid> = DepositAccount::list_for_wallets(conn, &wallet_ids)
        .await?
        .iter()
        .map(|a| (a.id, a.wallet_id))
        .collect();

    let mut out = vec![];
    for wallet in wallets {
        let deposit_accounts: Vec<DepositAccount> =
            DepositAccount::list_for_wallets(conn, &[wallet.id]).await?;
        let mut deposits = vec![];
        let mut deposit_total_by_ccy: HashMap<String, BigDecimal> = HashMap::new();
        for account in &deposit_accounts {
            let available = DepositAccountBalance::get(conn, account.id)
                .await?
                .map(|b| b.available)
                .unwrap_or_default();
            *deposit_total_by_ccy
                .entry(account.currency.as_str().to_string())
                .or_default() += &available;
            deposits.push(DepositNode {
                account_id: account.id,
                name: account.name.clone(),
                currency: account.currency.as_str().to_string(),
                available,
            });
        }

        let mut brokerage = vec![];
        let mut wallet_positions: Vec<PositionPerformance> = vec![];
        for account in BrokerageAccount::list_for_wallets(conn, &[wallet.id]).await? {
            let rows = Holding::list_for_account(conn, account.id).await?;
            let positions = position_performance(&rows, &quotes);
            wallet_positions.extend(positions.iter().cloned());

            let mut cash_by_ccy: HashMap<String, BigDecimal> = HashMap::new();
            for link in BrokerageDepositLink::list_for_brokerage(conn, account.id).await? {
                let available = DepositAccountBalance::get(conn, link.deposit_account_id)
                    .await?
                    .map(|b| b.available)
                    .unwrap_or_default();
                *cash_by_ccy
                    .entry(link.currency.as_str().to_string())
                    .or_default() += available;
            }
            brokerage.push(BrokerageNode {
                account_id: account.id,
                name: account.name.clone(),
                cash_by_ccy,
                positions,
            });
        }
        let (top_gainers, top_losers) = top_performance(wallet_positions, TOP_N);

        let mut metal_nodes = vec![];
        for metal in metals.iter().filter(|m| m.wallet_id == wallet.id) {
            let valued = quotes.get(metal.metal.futures_symbol()).map(|quote| {
                let ounces = &metal.grams / troy_ounce_grams();
                (q2(&(ounces * &quote.price)), quote.currency.clone())
            });
            metal_nodes.push(MetalNode {
                id: metal.id,
                metal: metal.metal.as_str().to_string(),
                grams: metal.grams.clone(),
                value: valued.as_ref().map(|(v, _)| v.clone()),
                currency: valued.map(|(_, c)| c),
            });
        }

        let mut estate_nodes = vec![];
        for estate in RealEstate::list_for_wallets(conn, &[wallet.id]).await? {
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
                None => q2(&estate.purchase_price),
            };
            estate_nodes.push(RealEstateNode {
                id: estate.id,
                name: estate.name.clone(),
                value,
                currency: estate.purchase_currency.as_str().to_string(),
            });
        }

        // YTD income/expense by account currency for this wallet.
        let mut ytd_income_by_ccy: HashMap<String, BigDecimal> = HashMap::new();
        let mut ytd_expense_by_ccy: HashMap<String, BigDecimal> = HashMap::new();
        for (tx, currency) in &ytd_rows {
            if deposit_wallet.get(&tx.account_id) != Some(&wallet.id) {
                continue;
            }
            let bucket = match tx.status {
                TransactionStatus::Income => &mut ytd_income_by_ccy,
                TransactionStatus::Expense => &mut ytd_expense_by_ccy,
            };
            *bucket.entry(currency.as_str().to_string()).or_default() += &tx.amount;
        }

        // Net worth in the viewing currency.
        let mut net_worth = BigDecimal::zero();
        let mut add = |amount: &BigDecimal, ccy: &str| {
            match fx_convert(amount, ccy, view_ccy, currency_rate) {
                Some(converted) => net_worth += converted,
                None => warn!(currency = ccy, "No FX path into the viewing currency"),
            }
        };
        for (ccy, amount) in &deposit_total_by_ccy {
            add(amount, ccy);
        }
        for node in &brokerage {
            for (ccy, amount) in &node.cash_by_ccy {
                add(amount, ccy);
            }
            for p in &node.positions {
                add(&p.value, &p.currency);
            }
        }
        for node in &metal_nodes {
            if let (Some(value), Some(ccy)) = (&node.value, &node.currency) {
                add(value, ccy);
            }
        }
        for node in &estate_nodes {
            add(&node.value, &node.currency);
        }

        let wallet_history = monthly_totals.remove(&wallet.id).unwrap_or_default();
        let history = month_keys
            .iter()
            .filter_map(|mk| {
                wallet_history.get(mk).map(|total| MonthTotal {
                    month_key: mk.clone(),
                    total: q2(total),
                })
            })
            .collect();

        out.push(WalletManagerWalletOut {
            id: wallet.id,
            name: wallet.name.clone(),
            deposits,
            deposit_total_by_ccy,
            brokerage,
            top_gainers,
            top_losers,
            metals: metal_nodes,
            real_estates: estate_nodes,
            ytd_income_by_ccy,
            ytd_expense_by_ccy,
            view_currency: view_ccy.to_string(),
            net_worth: q2(&net_worth),
            history,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::FromPrimitive;

    fn dec(v: f64) -> BigDecimal {
        q2(&BigDecimal::from_f64(v).unwrap())
    }

    fn perf(symbol: &str, pnl_pct: f64) -> PositionPerformance {
        PositionPerformance {
            symbol: symbol.to_string(),
            quantity: dec(1.0),
            avg_cost: dec(1.0),
            price: dec(1.0),
            currency: "PLN".to_string(),
            value: dec(1.0),
            cost: dec(1.0),
            pnl_amount: dec(pnl_pct),
            pnl_pct: dec(pnl_pct),
        }
    }

    #[test]
    fn test_top_performance_orders_both_ways() {
        let perf = vec![
            perf("A", 0.10),
            perf("B", -0.20),
            perf("C", 0.50),
            perf("D", 0.00),
        ];
        let (gainers, losers) = top_performance(perf, 2);
        assert_eq!(
            gainers.iter().map(|p| p.symbol.as_str()).collect::<Vec<_>>(),
            vec!["C", "A"]
        );
        assert_eq!(
            losers.iter().map(|p| p.symbol.as_str()).collect::<Vec<_>>(),
            vec!["B", "D"]
        );
    }

    #[test]
    fn test_last_n_month_keys_crosses_year() {
        let now = chrono::NaiveDate::from_ymd_opt(2026, 2, 15)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            .and_utc();
        assert_eq!(
            last_n_month_keys(4, now),
            vec!["2025-11", "2025-12", "2026-01", "2026-02"]
        );
    }

    #[test]
    fn test_fx_table_from_json() {
        let json = serde_json::json!({"USD/PLN": "4.05", "EUR/PLN": 4.5, "bad": []});
        let table = fx_table_from_json(&json);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("USD/PLN"), Some(&BigDecimal::from_str("4.05").unwrap()));
    }

    #[test]
    fn test_sum_monthly_totals_uses_each_months_fx() {
        let wallet = Uuid::new_v4();
        let jan: FxTable = FxTable::from([("USD/PLN".to_string(), dec(4.0))]);
        let feb: FxTable = FxTable::from([("USD/PLN".to_string(), dec(5.0))]);
        let fx_by_month =
            HashMap::from([("2026-01".to_string(), jan), ("2026-02".to_string(), feb)]);
        let rows = vec![
            SnapshotAmount {
                wallet_id: wallet,
                month_key: "2026-01".to_string(),
                currency: "USD".to_string(),
                amount: dec(10.0),
            },
            SnapshotAmount {
                wallet_id: wallet,
                month_key: "2026-02".to_string(),
                currency: "USD".to_string(),
                amount: dec(10.0),
            },
        ];
        let totals = sum_monthly_totals(&fx_by_month, "PLN", rows);
        let by_month = totals.get(&wallet).unwrap();
        assert_eq!(q2(by_month.get("2026-01").unwrap()), dec(40.0));
        assert_eq!(q2(by_month.get("2026-02").unwrap()), dec(50.0));
    }
}
