use crate::{db::enums::Currency, schema::instruments};
use chrono::{DateTime, Utc};
use diesel::{prelude::*, result::DatabaseErrorKind, result::Error as DieselError};
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

/// Wallet-side mirror of an instrument: just enough identity to key holdings
/// and events. The market-data service owns the full record.
#[derive(Clone, Debug, Deserialize, Identifiable, Queryable, Selectable, Serialize)]
#[diesel(table_name = instruments)]
pub struct Instrument {
    pub id: Uuid,
    pub symbol: String,
    pub mic: String,
    pub name: Option<String>,
    pub currency: Currency,
    pub created_at: DateTime<Utc>,
}

impl Instrument {
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

    /// Symbols are globally unique; on a lost insert race the winner is
    /// re-read and returned.
    pub async fn get_or_create(
        conn: &mut AsyncPgConnection,
        mic: &str,
        symbol: &str,
        name: Option<&str>,
        currency: Currency,
    ) -> QueryResult<Instrument> {
        let symbol = symbol.trim().to_uppercase();
        if let Some(existing) = Self::find_by_symbol(conn, &symbol).await? {
            return Ok(existing);
        }
        let inserted = diesel::insert_into(instruments::table)
            .values((
                instruments::symbol.eq(&symbol),
                instruments::mic.eq(mic),
                instruments::name.eq(name),
                instruments::currency.eq(currency),
            ))
            .returning(Instrument::as_returning())
            .get_result(conn)
            .await;
        match inserted {
            Ok(instrument) => Ok(instrument),
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                warn!(symbol = symbol, "Lost instrument insert race, re-reading");
                Self::find_by_symbol(conn, &symbol)
                    .await?
                    .ok_or(DieselError::NotFound)
            },
            Err(e) => Err(e),
        }
    }
}
