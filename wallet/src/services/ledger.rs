//! Append-only per-account ledger. Every row records the balance before and
//! after itself; consecutive rows chain (`before[i] = after[i-1]` in date
//! order) and the account balance row always mirrors the newest `after`.

use crate::{
    db::{
        enums::{CapitalGainKind, TransactionStatus},
        models::{
            capital_gains::{CapitalGain, NewCapitalGain},
            deposits::{DepositAccount, DepositAccountBalance},
            transactions::{NewTransaction, Transaction},
        },
    },
    error::WalletError,
    metrics::LEDGER_ROWS_APPENDED_COUNT,
    money::q2,
};
use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Duration, Utc};
use diesel_async::AsyncPgConnection;
use tracing::info;
use uuid::Uuid;

/// One incoming ledger row. `amount_after` is the bank-statement balance when
/// the caller imports statements; `capital_gain_kind` tags interest and
/// dividend credits.
#[derive(Clone, Debug)]
pub struct LedgerRow {
    pub date: DateTime<Utc>,
    pub amount: BigDecimal,
    pub description: String,
    pub category: Option<String>,
    pub amount_after: Option<BigDecimal>,
    pub capital_gain_kind: Option<CapitalGainKind>,
}

#[derive(Clone, Debug)]
pub struct LedgerSummary {
    pub created: usize,
    pub final_balance: BigDecimal,
    pub transaction_ids: Vec<Uuid>,
}

/// Ledger rows come from statements newest-first as often as oldest-first;
/// normalize to ascending date order before appending.
fn order_rows(mut rows: Vec<LedgerRow>) -> Vec<LedgerRow> {
    if rows.len() > 1 && rows.first().unwrap().date > rows.last().unwrap().date {
        rows.reverse();
    }
    rows
}

/// Appends a batch of rows to the account ledger inside the caller's
/// transaction.
///
/// Balance seeding: an empty ledger adopts `amount_after - amount` of the
/// first row when the statement provides it, otherwise the balance row's
/// `available`. With `verify_amount_after` set, every provided `amount_after`
/// must equal the computed balance or the whole batch fails with the 1-based
/// row index.
pub async fn append_transactions(
    conn: &mut AsyncPgConnection,
    account: &DepositAccount,
    rows: Vec<LedgerRow>,
    verify_amount_after: bool,
) -> Result<LedgerSummary, WalletError> {
    if rows.is_empty() {
        return Err(WalletError::Validation(
            "No transactions provided".to_string(),
        ));
    }
    let rows = order_rows(rows);

    let balance = DepositAccountBalance::get(conn, account.id)
        .await?
        .ok_or_else(|| {
            WalletError::Internal(anyhow::anyhow!(
                "Balance row missing for account {}",
                account.id
            ))
        })?;
    let has_rows = Transaction::account_has_any(conn, account.id).await?;

    let mut last_balance = if !has_rows {
        let first = &rows[0];
        match &first.amount_after {
            Some(after) => q2(&(after - &first.amount)),
            None => balance.available.clone(),
        }
    } else {
        balance.available.clone()
    };

    let mut created = 0usize;
    let mut transaction_ids = vec![];
    for (i, row) in rows.iter().enumerate() {
        let amount = q2(&row.amount);
        let before = last_balance.clone();
        let computed_after = q2(&(&before + &amount));

        let after = match &row.amount_after {
            Some(provided) => {
                let provided = q2(provided);
                if verify_amount_after && provided != computed_after {
                    return Err(WalletError::BalanceMismatch {
                        index: i + 1,
                        provided: provided.to_string(),
                        computed: computed_after.to_string(),
                    });
                }
                provided
            },
            None => computed_after,
        };

        let status = if amount >= BigDecimal::zero() {
            TransactionStatus::Income
        } else {
            TransactionStatus::Expense
        };
        let new_row = NewTransaction {
            account_id: account.id,
            amount: amount.clone(),
            description: row.description.clone(),
            category: row.category.clone(),
            status,
            balance_before: before,
            balance_after: after.clone(),
            // Sub-second offsets keep same-dated rows in insertion order.
            date_transaction: row.date + Duration::milliseconds(i as i64),
        };

        if Transaction::find_duplicate(conn, &new_row).await?.is_some() {
            return Err(WalletError::Conflict(format!(
                "Duplicate transaction detected for account={}, date={}, amount={}, description={:?}",
                account.id, new_row.date_transaction, new_row.amount, new_row.description
            )));
        }

        let tx = Transaction::insert(conn, &new_row).await?;
        LEDGER_ROWS_APPENDED_COUNT
            .with_label_values(&[if row.amount_after.is_some() {
                "statement"
            } else {
                "append"
            }])
            .inc();
        transaction_ids.push(tx.id);
        created += 1;
        last_balance = after.clone();
        DepositAccountBalance::set_available(conn, account.id, &after).await?;

        if let Some(kind) = row.capital_gain_kind {
            let taggable = matches!(
                kind,
                CapitalGainKind::DepositInterest | CapitalGainKind::BrokerDividend
            );
            if taggable && !amount.is_zero() {
                CapitalGain::insert(
                    conn,
                    &NewCapitalGain::new(
                        kind,
                        amount.clone(),
                        account.currency,
                        tx.date_transaction,
                        account.id,
                        Some(tx.id),
                    ),
                )
                .await?;
            }
        }
    }

    info!(
        account_id = %account.id,
        created = created,
        "Transactions appended"
    );
    Ok(LedgerSummary {
        created,
        final_balance: last_balance,
        transaction_ids,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::FromPrimitive;

    fn dec(v: f64) -> BigDecimal {
        q2(&BigDecimal::from_f64(v).unwrap())
    }

    fn row(day: u32, amount: f64) -> LedgerRow {
        LedgerRow {
            date: chrono::NaiveDate::from_ymd_opt(2026, 3, day)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap()
                .and_utc(),
            amount: dec(amount),
            description: format!("row {day}"),
            category: None,
            amount_after: None,
            capital_gain_kind: None,
        }
    }

    #[test]
    fn test_order_rows_reverses_descending_input() {
        let ordered = order_rows(vec![row(3, 1.0), row(2, 1.0), row(1, 1.0)]);
        assert!(ordered[0].date < ordered[1].date);
        assert!(ordered[1].date < ordered[2].date);
    }

    #[test]
    fn test_order_rows_keeps_ascending_input() {
        let ordered = order_rows(vec![row(1, 1.0), row(2, 1.0)]);
        assert!(ordered[0].date < ordered[1].date);
    }
}
