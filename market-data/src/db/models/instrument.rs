use crate::{
    db::enums::{Currency, InstrumentStatus, InstrumentType},
    normalize::{normalize_symbol, strip_accents, validate_isin},
    schema::{instruments, markets},
};
use chrono::{DateTime, Utc};
use diesel::{prelude::*, result::DatabaseErrorKind, result::Error as DieselError};
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use field_count::FieldCount;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Clone, Debug, Deserialize, Identifiable, Queryable, Selectable, Serialize)]
#[diesel(table_name = instruments)]
pub struct Instrument {
    pub id: Uuid,
    pub market_id: Uuid,
    pub symbol: String,
    pub isin: Option<String>,
    pub shortname: String,
    pub name: Option<String>,
    pub kind: InstrumentType,
    pub status: InstrumentStatus,
    pub currency: Currency,
    pub historical_source: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize, FieldCount, Insertable, Serialize)]
#[diesel(table_name = instruments)]
pub struct NewInstrument {
    pub market_id: Uuid,
    pub symbol: String,
    pub isin: Option<String>,
    pub shortname: String,
    pub name: Option<String>,
    pub kind: InstrumentType,
    pub status: InstrumentStatus,
    pub currency: Currency,
    pub historical_source: Option<String>,
}

/// Instrument attributes proposed by an ingestion source before the registry
/// has resolved them against the database.
#[derive(Clone, Debug)]
pub struct InstrumentProposal {
    pub symbol: String,
    pub isin: Option<String>,
    pub shortname: String,
    pub name: Option<String>,
    pub kind: InstrumentType,
    pub currency: Option<Currency>,
}

impl InstrumentProposal {
    /// Normalizes the raw source symbol; rows without a usable symbol are
    /// skipped by the pipeline.
    pub fn from_source(symbol: &str, name: Option<String>, kind: InstrumentType) -> Option<Self> {
        let symbol = normalize_symbol(symbol)?;
        Some(Self {
            shortname: symbol.clone(),
            symbol,
            isin: None,
            name,
            kind,
            currency: None,
        })
    }

    /// Fills the ISO-6166 code from the vendor symbol-map when the proposal
    /// lacks one. Placeholder values and malformed codes are ignored.
    pub fn enrich_isin(&mut self, isin: &str) {
        if self.isin.is_some() {
            return;
        }
        if isin == "nan" || !validate_isin(isin) {
            debug!(symbol = self.symbol, isin = isin, "Ignoring unusable ISIN");
            return;
        }
        self.isin = Some(isin.to_string());
    }
}

impl Instrument {
    pub async fn find_in_market(
        conn: &mut AsyncPgConnection,
        market_id: Uuid,
        symbol: &str,
    ) -> QueryResult<Option<Instrument>> {
        instruments::table
            .filter(instruments::market_id.eq(market_id))
            .filter(instruments::symbol.eq(symbol))
            .select(Instrument::as_select())
            .first(conn)
            .await
            .optional()
    }

    pub async fn find_by_symbol(
        conn: &mut AsyncPgConnection,
        symbol: &str,
    ) -> QueryResult<Option<Instrument>> {
        instruments::table
            .filter(instruments::symbol.eq(symbol))
            .select(Instrument::as_select())
            .first(conn)
            .await
            .optional()
    }

    pub async fn count_in_market(conn: &mut AsyncPgConnection, market_id: Uuid) -> QueryResult<i64> {
        instruments::table
            .filter(instruments::market_id.eq(market_id))
            .count()
            .get_result(conn)
            .await
    }

    /// Looks the proposal up by symbol within the market and inserts it on a
    /// miss, defaulting the currency to the market currency. A losing racer
    /// on the symbol unique constraint re-reads and returns the winner.
    pub async fn resolve_or_create(
        conn: &mut AsyncPgConnection,
        market_id: Uuid,
        market_currency: Currency,
        proposal: &InstrumentProposal,
    ) -> QueryResult<Instrument> {
        if let Some(existing) = Self::find_in_market(conn, market_id, &proposal.symbol).await? {
            return Ok(existing);
        }

        let row = NewInstrument {
            market_id,
            symbol: proposal.symbol.clone(),
            isin: proposal.isin.clone(),
            shortname: proposal.shortname.clone(),
            name: proposal.name.clone(),
            kind: proposal.kind,
            status: InstrumentStatus::Active,
            currency: proposal.currency.unwrap_or(market_currency),
            historical_source: None,
        };

        let inserted = diesel::insert_into(instruments::table)
            .values(&row)
            .returning(Instrument::as_returning())
            .get_result(conn)
            .await;

        match inserted {
            Ok(instrument) => Ok(instrument),
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info)) => {
                warn!(
                    symbol = proposal.symbol,
                    details = info.message(),
                    "Lost instrument insert race, re-reading"
                );
                Self::find_in_market(conn, market_id, &proposal.symbol)
                    .await?
                    .ok_or(DieselError::NotFound)
            },
            Err(e) => Err(e),
        }
    }

    /// Instruments for one MIC, ordered by symbol (the dropdown options list).
    pub async fn list_for_mic(
        conn: &mut AsyncPgConnection,
        mic: &str,
        limit: i64,
        offset: i64,
    ) -> QueryResult<Vec<Instrument>> {
        instruments::table
            .inner_join(markets::table)
            .filter(markets::mic.eq(mic))
            .order_by(instruments::symbol.asc())
            .offset(offset)
            .limit(limit)
            .select(Instrument::as_select())
            .load(conn)
            .await
    }

    /// Case-insensitive partial match on shortname or full name. Diacritics
    /// are dropped from the needle; vendor listings publish ASCII names.
    pub async fn search(
        conn: &mut AsyncPgConnection,
        query: &str,
        limit: i64,
    ) -> QueryResult<Vec<(Instrument, String)>> {
        let q = strip_accents(query.trim());
        if q.is_empty() {
            return Ok(vec![]);
        }
        let like = format!("%{}%", q);
        instruments::table
            .inner_join(markets::table)
            .filter(
                instruments::shortname
                    .ilike(like.clone())
                    .or(instruments::name.ilike(like)),
            )
            .order_by(instruments::shortname.asc())
            .limit(limit)
            .select((Instrument::as_select(), markets::mic))
            .load(conn)
            .await
    }
}
