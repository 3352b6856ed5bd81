use crate::{
    db::models::instrument::Instrument,
    schema::{instruments, markets, quote_latest},
};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use field_count::FieldCount;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, Deserialize, Identifiable, Queryable, Selectable, Serialize)]
#[diesel(primary_key(instrument_id))]
#[diesel(table_name = quote_latest)]
pub struct QuoteLatest {
    pub instrument_id: Uuid,
    pub last_price: BigDecimal,
    pub change_pct: BigDecimal,
    pub volume: Option<i64>,
    pub last_trade_at: DateTime<Utc>,
    pub provider: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Parsed quote fields as produced by a provider row.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct QuoteLatestInput {
    pub last_price: BigDecimal,
    pub change_pct: BigDecimal,
    pub volume: Option<i64>,
    pub last_trade_at: DateTime<Utc>,
    pub provider: Option<String>,
}

#[derive(Clone, Debug, FieldCount, Insertable)]
#[diesel(table_name = quote_latest)]
struct NewQuoteLatest {
    instrument_id: Uuid,
    last_price: BigDecimal,
    change_pct: BigDecimal,
    volume: Option<i64>,
    last_trade_at: DateTime<Utc>,
    provider: Option<String>,
}

impl QuoteLatest {
    /// Upserts the one-per-instrument latest quote. The existing row is taken
    /// `FOR UPDATE` so concurrent writers for the same instrument serialize on
    /// the row lock instead of clobbering each other.
    pub async fn upsert(
        conn: &mut AsyncPgConnection,
        instrument_id: Uuid,
        input: &QuoteLatestInput,
    ) -> QueryResult<QuoteLatest> {
        let locked: Option<QuoteLatest> = quote_latest::table
            .filter(quote_latest::instrument_id.eq(instrument_id))
            .for_update()
            .select(QuoteLatest::as_select())
            .first(conn)
            .await
            .optional()?;

        match locked {
            Some(_) => {
                diesel::update(quote_latest::table.find(instrument_id))
                    .set((
                        quote_latest::last_price.eq(&input.last_price),
                        quote_latest::change_pct.eq(&input.change_pct),
                        quote_latest::volume.eq(input.volume),
                        quote_latest::last_trade_at.eq(input.last_trade_at),
                        quote_latest::provider.eq(&input.provider),
                        quote_latest::updated_at.eq(diesel::dsl::now),
                    ))
                    .returning(QuoteLatest::as_returning())
                    .get_result(conn)
                    .await
            },
            None => {
                diesel::insert_into(quote_latest::table)
                    .values(NewQuoteLatest {
                        instrument_id,
                        last_price: input.last_price.clone(),
                        change_pct: input.change_pct.clone(),
                        volume: input.volume,
                        last_trade_at: input.last_trade_at,
                        provider: input.provider.clone(),
                    })
                    .returning(QuoteLatest::as_returning())
                    .get_result(conn)
                    .await
            },
        }
    }

    pub async fn fetch_for_symbol(
        conn: &mut AsyncPgConnection,
        mic: &str,
        symbol: &str,
    ) -> QueryResult<Option<(QuoteLatest, Instrument)>> {
        quote_latest::table
            .inner_join(instruments::table.inner_join(markets::table))
            .filter(markets::mic.eq(mic))
            .filter(instruments::symbol.eq(symbol))
            .select((QuoteLatest::as_select(), Instrument::as_select()))
            .first(conn)
            .await
            .optional()
    }

    pub async fn fetch_for_mic(
        conn: &mut AsyncPgConnection,
        mic: &str,
    ) -> QueryResult<Vec<(QuoteLatest, Instrument)>> {
        quote_latest::table
            .inner_join(instruments::table.inner_join(markets::table))
            .filter(markets::mic.eq(mic))
            .order_by(instruments::symbol.asc())
            .select((QuoteLatest::as_select(), Instrument::as_select()))
            .load(conn)
            .await
    }

    /// Latest (price, market currency) per symbol, market-independent. Used by
    /// the wallet service to value holdings.
    pub async fn fetch_for_symbols(
        conn: &mut AsyncPgConnection,
        symbols: &[String],
    ) -> QueryResult<Vec<(String, QuoteLatest, crate::db::enums::Currency)>> {
        quote_latest::table
            .inner_join(instruments::table.inner_join(markets::table))
            .filter(instruments::symbol.eq_any(symbols))
            .select((
                instruments::symbol,
                QuoteLatest::as_select(),
                markets::currency,
            ))
            .load(conn)
            .await
    }
}
