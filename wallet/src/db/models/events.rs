use crate::{
    db::{
        enums::{BrokerageEventKind, Currency},
        models::{brokerage::BrokerageAccount, instruments::Instrument},
    },
    position::EventInput,
    schema::{brokerage_accounts, brokerage_events, instruments, wallets},
};
use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use field_count::FieldCount;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Clone, Debug, Deserialize, Identifiable, Queryable, Selectable, Serialize)]
#[diesel(table_name = brokerage_events)]
pub struct BrokerageEvent {
    pub id: Uuid,
    pub brokerage_account_id: Uuid,
    pub instrument_id: Uuid,
    pub kind: BrokerageEventKind,
    pub quantity: BigDecimal,
    pub price: BigDecimal,
    pub currency: Currency,
    pub split_ratio: BigDecimal,
    pub trade_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, FieldCount, Insertable)]
#[diesel(table_name = brokerage_events)]
pub struct NewBrokerageEvent {
    pub brokerage_account_id: Uuid,
    pub instrument_id: Uuid,
    pub kind: BrokerageEventKind,
    pub quantity: BigDecimal,
    pub price: BigDecimal,
    pub currency: Currency,
    pub split_ratio: BigDecimal,
    pub trade_at: DateTime<Utc>,
}

/// Optional filters for the event page listing.
#[derive(Clone, Debug, Default)]
pub struct EventFilters {
    pub brokerage_account_ids: Option<Vec<Uuid>>,
    pub kinds: Option<Vec<BrokerageEventKind>>,
    pub currencies: Option<Vec<Currency>>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub q: Option<String>,
}

impl BrokerageEvent {
    pub fn as_input(&self) -> EventInput {
        EventInput {
            kind: self.kind,
            quantity: self.quantity.clone(),
            price: self.price.clone(),
            split_ratio: self.split_ratio.clone(),
        }
    }

    /// Duplicate detection over the full identifying tuple.
    pub async fn find_duplicate(
        conn: &mut AsyncPgConnection,
        row: &NewBrokerageEvent,
    ) -> QueryResult<Option<BrokerageEvent>> {
        brokerage_events::table
            .filter(brokerage_events::brokerage_account_id.eq(row.brokerage_account_id))
            .filter(brokerage_events::instrument_id.eq(row.instrument_id))
            .filter(brokerage_events::kind.eq(row.kind))
            .filter(brokerage_events::trade_at.eq(row.trade_at))
            .filter(brokerage_events::quantity.eq(&row.quantity))
            .filter(brokerage_events::price.eq(&row.price))
            .filter(brokerage_events::currency.eq(row.currency))
            .select(BrokerageEvent::as_select())
            .first(conn)
            .await
            .optional()
    }

    pub async fn insert(
        conn: &mut AsyncPgConnection,
        row: &NewBrokerageEvent,
    ) -> QueryResult<BrokerageEvent> {
        diesel::insert_into(brokerage_events::table)
            .values(row)
            .returning(BrokerageEvent::as_returning())
            .get_result(conn)
            .await
    }

    pub async fn find_owned(
        conn: &mut AsyncPgConnection,
        user_id: Uuid,
        event_id: Uuid,
    ) -> QueryResult<Option<BrokerageEvent>> {
        brokerage_events::table
            .inner_join(brokerage_accounts::table.inner_join(wallets::table))
            .filter(brokerage_events::id.eq(event_id))
            .filter(wallets::user_id.eq(user_id))
            .select(BrokerageEvent::as_select())
            .first(conn)
            .await
            .optional()
    }

    /// Replay source: all events of the pair in deterministic order.
    pub async fn list_for_pair(
        conn: &mut AsyncPgConnection,
        account_id: Uuid,
        instrument_id: Uuid,
    ) -> QueryResult<Vec<BrokerageEvent>> {
        brokerage_events::table
            .filter(brokerage_events::brokerage_account_id.eq(account_id))
            .filter(brokerage_events::instrument_id.eq(instrument_id))
            .order_by((brokerage_events::trade_at.asc(), brokerage_events::id.asc()))
            .select(BrokerageEvent::as_select())
            .load(conn)
            .await
    }

    pub async fn delete(conn: &mut AsyncPgConnection, event_id: Uuid) -> QueryResult<()> {
        diesel::delete(brokerage_events::table.find(event_id))
            .execute(conn)
            .await?;
        Ok(())
    }
}

fn apply_filters<'a>(
    mut query: brokerage_events::BoxedQuery<'a, diesel::pg::Pg>,
    filters: &'a EventFilters,
) -> brokerage_events::BoxedQuery<'a, diesel::pg::Pg> {
    if let Some(account_ids) = &filters.brokerage_account_ids {
        query = query.filter(brokerage_events::brokerage_account_id.eq_any(account_ids));
    }
    if let Some(kinds) = &filters.kinds {
        query = query.filter(brokerage_events::kind.eq_any(kinds.clone()));
    }
    if let Some(currencies) = &filters.currencies {
        query = query.filter(brokerage_events::currency.eq_any(currencies.clone()));
    }
    if let Some(from) = filters.date_from {
        let from = from.and_hms_opt(0, 0, 0).unwrap().and_utc();
        query = query.filter(brokerage_events::trade_at.ge(from));
    }
    if let Some(to) = filters.date_to {
        let to = to.and_hms_milli_opt(23, 59, 59, 999).unwrap().and_utc();
        query = query.filter(brokerage_events::trade_at.le(to));
    }
    query
}

/// One page of the user's events, joined with account and instrument info,
/// plus per-currency gross sums over the filtered set.
pub struct EventPage {
    pub rows: Vec<(BrokerageEvent, BrokerageAccount, Instrument)>,
    pub total: i64,
    pub page: i64,
    pub size: i64,
    pub sum_by_ccy: HashMap<String, BigDecimal>,
}

pub async fn list_events_page(
    conn: &mut AsyncPgConnection,
    user_id: Uuid,
    page: i64,
    size: i64,
    filters: &EventFilters,
) -> QueryResult<EventPage> {
    let page = page.max(1);
    let size = size.clamp(1, 200);
    let offset = (page - 1) * size;

    // Pre-resolve the user's accounts (and the optional symbol/name search)
    // into id sets so the paged query stays a single boxable select.
    let mut account_ids: Vec<Uuid> = brokerage_accounts::table
        .inner_join(wallets::table)
        .filter(wallets::user_id.eq(user_id))
        .select(brokerage_accounts::id)
        .load(conn)
        .await?;
    if let Some(filter_ids) = &filters.brokerage_account_ids {
        account_ids.retain(|id| filter_ids.contains(id));
    }

    let instrument_ids: Option<Vec<Uuid>> = match &filters.q {
        Some(q) if !q.trim().is_empty() => {
            let like = format!("%{}%", q.trim());
            Some(
                instruments::table
                    .filter(
                        instruments::symbol
                            .ilike(like.clone())
                            .or(instruments::name.ilike(like)),
                    )
                    .select(instruments::id)
                    .load(conn)
                    .await?,
            )
        },
        _ => None,
    };

    let scoped = EventFilters {
        brokerage_account_ids: Some(account_ids),
        kinds: filters.kinds.clone(),
        currencies: filters.currencies.clone(),
        date_from: filters.date_from,
        date_to: filters.date_to,
        q: None,
    };

    let base = || {
        let mut q = apply_filters(brokerage_events::table.into_boxed(), &scoped);
        if let Some(ids) = &instrument_ids {
            q = q.filter(brokerage_events::instrument_id.eq_any(ids.clone()));
        }
        q
    };

    let total: i64 = base().count().get_result(conn).await?;

    let events: Vec<BrokerageEvent> = base()
        .order_by(brokerage_events::trade_at.desc())
        .offset(offset)
        .limit(size)
        .select(BrokerageEvent::as_select())
        .load(conn)
        .await?;

    // Per-currency sum of quantity * price over the whole filtered set.
    let sum_rows: Vec<BrokerageEvent> = base().select(BrokerageEvent::as_select()).load(conn).await?;
    let mut sum_by_ccy: HashMap<String, BigDecimal> = HashMap::new();
    for ev in &sum_rows {
        let gross = &ev.quantity * &ev.price;
        *sum_by_ccy
            .entry(ev.currency.as_str().to_string())
            .or_default() += gross;
    }

    // Join the page rows with their account and instrument records.
    let mut rows = Vec::with_capacity(events.len());
    for event in events {
        let account = brokerage_accounts::table
            .find(event.brokerage_account_id)
            .select(BrokerageAccount::as_select())
            .first(conn)
            .await?;
        let instrument = instruments::table
            .find(event.instrument_id)
            .select(Instrument::as_select())
            .first(conn)
            .await?;
        rows.push((event, account, instrument));
    }

    Ok(EventPage {
        rows,
        total,
        page,
        size,
        sum_by_ccy,
    })
}
