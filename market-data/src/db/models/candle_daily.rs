use crate::schema::candle_daily;
use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::{pg::Pg, prelude::*, query_builder::QueryFragment, upsert::excluded};
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use field_count::FieldCount;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, Deserialize, FieldCount, Identifiable, Insertable, Queryable, Selectable, Serialize)]
#[diesel(primary_key(instrument_id, date_quote))]
#[diesel(table_name = candle_daily)]
pub struct CandleDaily {
    pub instrument_id: Uuid,
    pub date_quote: NaiveDate,
    pub open: BigDecimal,
    pub high: BigDecimal,
    pub low: BigDecimal,
    pub close: BigDecimal,
    pub volume: Option<i64>,
    pub traded_at: Option<DateTime<Utc>>,
}

pub fn upsert_candles_query(
    items_to_insert: Vec<CandleDaily>,
) -> impl QueryFragment<Pg> + diesel::query_builder::QueryId + Send {
    use crate::schema::candle_daily::dsl::*;
    diesel::insert_into(candle_daily)
        .values(items_to_insert)
        .on_conflict((instrument_id, date_quote))
        .do_update()
        .set((
            open.eq(excluded(open)),
            high.eq(excluded(high)),
            low.eq(excluded(low)),
            close.eq(excluded(close)),
            volume.eq(excluded(volume)),
            traded_at.eq(excluded(traded_at)),
        ))
}

impl CandleDaily {
    pub async fn fetch_range(
        conn: &mut AsyncPgConnection,
        instrument: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> QueryResult<Vec<CandleDaily>> {
        candle_daily::table
            .filter(candle_daily::instrument_id.eq(instrument))
            .filter(candle_daily::date_quote.ge(from))
            .filter(candle_daily::date_quote.le(to))
            .order_by(candle_daily::date_quote.asc())
            .select(CandleDaily::as_select())
            .load(conn)
            .await
    }
}
