//! Brokerage event processing. One event mutates the holding, appends a cash
//! transaction on the linked deposit account and records the realized gain,
//! all inside a single database transaction with the holding row locked.

use crate::{
    db::{
        enums::{BrokerageEventKind, CapitalGainKind, Currency},
        models::{
            brokerage::BrokerageAccount,
            capital_gains::{CapitalGain, NewCapitalGain},
            deposits::BrokerageDepositLink,
            events::{BrokerageEvent, NewBrokerageEvent},
            holdings::Holding,
            instruments::Instrument,
        },
    },
    error::WalletError,
    metrics::{EVENTS_PROCESSED_COUNT, IMPORT_ROWS_FAILED_COUNT},
    money::{cash_effect, q2},
    position::{apply_event, realized_pnl, replay, EventInput, PositionState},
    services::ledger::{append_transactions, LedgerRow},
};
use bigdecimal::{BigDecimal, One, Zero};
use chrono::{DateTime, Utc};
use diesel_async::{scoped_futures::ScopedFutureExt, AsyncConnection, AsyncPgConnection};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Clone, Debug, Deserialize)]
pub struct BrokerageEventPayload {
    pub brokerage_account_id: Uuid,
    pub instrument_symbol: String,
    pub instrument_mic: String,
    #[serde(default)]
    pub instrument_name: Option<String>,
    pub kind: BrokerageEventKind,
    pub quantity: BigDecimal,
    pub price: BigDecimal,
    pub currency: Currency,
    #[serde(default = "default_split_ratio")]
    pub split_ratio: BigDecimal,
    pub trade_at: DateTime<Utc>,
}

fn default_split_ratio() -> BigDecimal {
    BigDecimal::one()
}

impl BrokerageEventPayload {
    fn as_input(&self) -> EventInput {
        EventInput {
            kind: self.kind,
            quantity: q2(&self.quantity),
            price: q2(&self.price),
            split_ratio: self.split_ratio.clone(),
        }
    }
}

/// Creates the event and updates the holding; must run inside a transaction.
/// Returns the persisted event and the holding, or `None` when the position
/// closed to zero and its row was deleted.
pub async fn create_event_and_update_holding(
    conn: &mut AsyncPgConnection,
    payload: &BrokerageEventPayload,
    create_transaction: bool,
) -> Result<(BrokerageEvent, Option<Holding>), WalletError> {
    let account = BrokerageAccount::find(conn, payload.brokerage_account_id)
        .await?
        .ok_or_else(|| WalletError::NotFound("Brokerage account not found".to_string()))?;

    let instrument = Instrument::get_or_create(
        conn,
        &payload.instrument_mic,
        &payload.instrument_symbol,
        payload.instrument_name.as_deref(),
        payload.currency,
    )
    .await?;

    let input = payload.as_input();
    let new_event = NewBrokerageEvent {
        brokerage_account_id: account.id,
        instrument_id: instrument.id,
        kind: payload.kind,
        quantity: input.quantity.clone(),
        price: input.price.clone(),
        currency: payload.currency,
        split_ratio: input.split_ratio.clone(),
        trade_at: payload.trade_at,
    };
    if BrokerageEvent::find_duplicate(conn, &new_event).await?.is_some() {
        return Err(WalletError::Conflict(
            "Brokerage event already exists for this account, instrument and parameters"
                .to_string(),
        ));
    }

    let holding = Holding::lock_or_create(conn, account.id, instrument.id).await?;
    let mut state = holding.state();

    // Realized P&L uses the average cost held before the event mutates it.
    let pnl = match payload.kind {
        BrokerageEventKind::Sell => realized_pnl(&state.avg_cost, &input.quantity, &input.price),
        _ => BigDecimal::zero(),
    };

    apply_event(&mut state, &input)?;
    let holding_after = if state.quantity.is_zero() {
        info!(holding_id = %holding.id, "Position closed, deleting holding");
        Holding::delete(conn, holding.id).await?;
        None
    } else {
        Some(Holding::save_state(conn, holding.id, &state).await?)
    };

    let event = BrokerageEvent::insert(conn, &new_event).await?;

    let cash = cash_effect(payload.kind, &input.quantity, &input.price);
    if !cash.is_zero() {
        let deposit =
            BrokerageDepositLink::resolve_deposit(conn, account.id, payload.currency)
                .await?
                .ok_or_else(|| {
                    warn!(
                        brokerage_account_id = %account.id,
                        currency = payload.currency.as_str(),
                        "No deposit link for cash effect"
                    );
                    WalletError::NotFound(
                        "Cannot find a deposit account for this brokerage account".to_string(),
                    )
                })?;

        let mut transaction_id = None;
        if create_transaction {
            let summary = append_transactions(
                conn,
                &deposit,
                vec![LedgerRow {
                    date: payload.trade_at,
                    amount: cash.clone(),
                    description: format!(
                        "{} {} {} @ {}",
                        payload.kind.as_str(),
                        payload.instrument_symbol,
                        input.quantity,
                        input.price
                    ),
                    category: Some("INVESTMENTS".to_string()),
                    amount_after: None,
                    capital_gain_kind: None,
                }],
                false,
            )
            .await?;
            transaction_id = summary.transaction_ids.last().copied();
        }

        if !pnl.is_zero() {
            CapitalGain::insert(
                conn,
                &NewCapitalGain::new(
                    CapitalGainKind::BrokerRealizedPnl,
                    pnl.clone(),
                    payload.currency,
                    payload.trade_at,
                    deposit.id,
                    transaction_id,
                ),
            )
            .await?;
        }
    }

    EVENTS_PROCESSED_COUNT
        .with_label_values(&[payload.kind.as_str()])
        .inc();
    Ok((event, holding_after))
}

#[derive(Clone, Debug, Serialize)]
pub struct ImportError {
    pub index: usize,
    pub detail: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct ImportSummary {
    pub created: usize,
    pub failed: usize,
    pub errors: Vec<ImportError>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ImportEventRow {
    pub instrument_symbol: String,
    pub instrument_mic: String,
    #[serde(default)]
    pub instrument_name: Option<String>,
    pub kind: BrokerageEventKind,
    pub quantity: BigDecimal,
    pub price: BigDecimal,
    pub currency: Currency,
    #[serde(default = "default_split_ratio")]
    pub split_ratio: BigDecimal,
    pub trade_at: DateTime<Utc>,
}

/// Bulk import. Each row runs in its own transaction so one bad row cannot
/// poison the rest; failures are reported with their 1-based index. Cash
/// transactions are not generated for imported history.
pub async fn import_events(
    conn: &mut AsyncPgConnection,
    brokerage_account_id: Uuid,
    rows: &[ImportEventRow],
) -> Result<ImportSummary, WalletError> {
    let mut created = 0usize;
    let mut errors: Vec<ImportError> = vec![];

    for (i, row) in rows.iter().enumerate() {
        let index = i + 1;
        let payload = BrokerageEventPayload {
            brokerage_account_id,
            instrument_symbol: row.instrument_symbol.clone(),
            instrument_mic: row.instrument_mic.clone(),
            instrument_name: row.instrument_name.clone(),
            kind: row.kind,
            quantity: row.quantity.clone(),
            price: row.price.clone(),
            currency: row.currency,
            split_ratio: row.split_ratio.clone(),
            trade_at: row.trade_at,
        };

        let outcome = conn
            .transaction::<_, WalletError, _>(|conn| {
                async move { create_event_and_update_holding(conn, &payload, false).await }
                    .scope_boxed()
            })
            .await;

        match outcome {
            Ok(_) => created += 1,
            Err(e) => {
                warn!(index = index, error = %e, "Import row failed");
                let class = match &e {
                    WalletError::Conflict(_) => "conflict",
                    WalletError::Validation(_) => "validation",
                    WalletError::NotFound(_) => "not_found",
                    _ => "other",
                };
                IMPORT_ROWS_FAILED_COUNT.with_label_values(&[class]).inc();
                errors.push(ImportError {
                    index,
                    detail: e.to_string(),
                });
            },
        }
    }

    Ok(ImportSummary {
        created,
        failed: errors.len(),
        errors,
    })
}

/// Rebuilds the holding for (account, instrument) by replaying its events in
/// `(trade_at, id)` order; a zero result deletes the row.
pub async fn rebuild_holding(
    conn: &mut AsyncPgConnection,
    account_id: Uuid,
    instrument_id: Uuid,
) -> Result<Option<PositionState>, WalletError> {
    let events = BrokerageEvent::list_for_pair(conn, account_id, instrument_id).await?;
    let inputs: Vec<EventInput> = events.iter().map(|e| e.as_input()).collect();
    let state = replay(inputs.iter())?;

    let holding = Holding::lock_or_create(conn, account_id, instrument_id).await?;
    if state.quantity.is_zero() {
        Holding::delete(conn, holding.id).await?;
        Ok(None)
    } else {
        Holding::save_state(conn, holding.id, &state).await?;
        Ok(Some(state))
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct EventPatch {
    pub id: Uuid,
    #[serde(default)]
    pub quantity: Option<BigDecimal>,
    #[serde(default)]
    pub price: Option<BigDecimal>,
    #[serde(default)]
    pub split_ratio: Option<BigDecimal>,
}

/// Applies field patches to the user's events, then rebuilds every affected
/// (account, instrument) pair. Unknown or foreign ids are skipped.
pub async fn batch_patch_events(
    conn: &mut AsyncPgConnection,
    user_id: Uuid,
    patches: &[EventPatch],
) -> Result<usize, WalletError> {
    use crate::schema::brokerage_events;
    use diesel::prelude::*;
    use diesel_async::RunQueryDsl;

    let mut updated = 0usize;
    let mut affected: std::collections::HashSet<(Uuid, Uuid)> = Default::default();

    for patch in patches {
        let Some(event) = BrokerageEvent::find_owned(conn, user_id, patch.id).await? else {
            continue;
        };

        let quantity = patch.quantity.as_ref().map(q2).unwrap_or(event.quantity);
        let price = patch.price.as_ref().map(q2).unwrap_or(event.price);
        let split_ratio = patch.split_ratio.clone().unwrap_or(event.split_ratio);
        diesel::update(brokerage_events::table.find(event.id))
            .set((
                brokerage_events::quantity.eq(quantity),
                brokerage_events::price.eq(price),
                brokerage_events::split_ratio.eq(split_ratio),
            ))
            .execute(conn)
            .await?;

        updated += 1;
        affected.insert((event.brokerage_account_id, event.instrument_id));
    }

    for (account_id, instrument_id) in affected {
        rebuild_holding(conn, account_id, instrument_id).await?;
    }
    Ok(updated)
}

/// Deletes one owned event and rebuilds the pair it belonged to.
pub async fn delete_event_and_rebuild(
    conn: &mut AsyncPgConnection,
    user_id: Uuid,
    event_id: Uuid,
) -> Result<bool, WalletError> {
    let Some(event) = BrokerageEvent::find_owned(conn, user_id, event_id).await? else {
        return Ok(false);
    };
    BrokerageEvent::delete(conn, event.id).await?;
    rebuild_holding(conn, event.brokerage_account_id, event.instrument_id).await?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::PositionState;
    use bigdecimal::FromPrimitive;

    fn dec(v: f64) -> BigDecimal {
        q2(&BigDecimal::from_f64(v).unwrap())
    }

    fn event(kind: BrokerageEventKind, q: f64, p: f64) -> EventInput {
        EventInput {
            kind,
            quantity: dec(q),
            price: dec(p),
            split_ratio: BigDecimal::one(),
        }
    }

    /// BUY 10 @ 100 then SELL 4 @ 120: the position ends at (6, 100), the
    /// cash leg is -1000 then +480 and the sale realizes +80.
    #[test]
    fn test_buy_then_sell_flow() {
        let mut state = PositionState::default();

        let buy = event(BrokerageEventKind::Buy, 10.0, 100.0);
        apply_event(&mut state, &buy).unwrap();
        assert_eq!(state.quantity, dec(10.0));
        assert_eq!(state.avg_cost, dec(100.0));
        assert_eq!(
            cash_effect(buy.kind, &buy.quantity, &buy.price),
            dec(-1000.0)
        );

        let sell = event(BrokerageEventKind::Sell, 4.0, 120.0);
        let pnl = realized_pnl(&state.avg_cost, &sell.quantity, &sell.price);
        apply_event(&mut state, &sell).unwrap();
        assert_eq!(state.quantity, dec(6.0));
        assert_eq!(state.avg_cost, dec(100.0));
        assert_eq!(
            cash_effect(sell.kind, &sell.quantity, &sell.price),
            dec(480.0)
        );
        assert_eq!(pnl, dec(80.0));
    }

    /// SPLIT 2:1 on (10, 100): position becomes (20, 50), no cash moves.
    #[test]
    fn test_split_flow() {
        let mut state = PositionState {
            quantity: dec(10.0),
            avg_cost: dec(100.0),
        };
        let split = EventInput {
            kind: BrokerageEventKind::Split,
            quantity: BigDecimal::zero(),
            price: BigDecimal::zero(),
            split_ratio: dec(2.0),
        };
        apply_event(&mut state, &split).unwrap();
        assert_eq!(state.quantity, dec(20.0));
        assert_eq!(state.avg_cost, dec(50.0));
        assert!(cash_effect(split.kind, &split.quantity, &split.price).is_zero());
    }

    /// DIV 10 @ 1 on (10, 100): position untouched, +10 cash, no realized
    /// gain from the position engine.
    #[test]
    fn test_dividend_flow() {
        let mut state = PositionState {
            quantity: dec(10.0),
            avg_cost: dec(100.0),
        };
        let div = event(BrokerageEventKind::Div, 10.0, 1.0);
        apply_event(&mut state, &div).unwrap();
        assert_eq!(state.quantity, dec(10.0));
        assert_eq!(state.avg_cost, dec(100.0));
        assert_eq!(cash_effect(div.kind, &div.quantity, &div.price), dec(10.0));
    }

    #[test]
    fn test_payload_input_is_quantized() {
        let payload = BrokerageEventPayload {
            brokerage_account_id: Uuid::new_v4(),
            instrument_symbol: "PKN".to_string(),
            instrument_mic: "XWAR".to_string(),
            instrument_name: None,
            kind: BrokerageEventKind::Buy,
            quantity: "10.005".parse().unwrap(),
            price: "99.999".parse().unwrap(),
            currency: Currency::Pln,
            split_ratio: BigDecimal::one(),
            trade_at: chrono::Utc::now(),
        };
        let input = payload.as_input();
        assert_eq!(input.quantity, dec(10.01));
        assert_eq!(input.price, dec(100.0));
    }
}
