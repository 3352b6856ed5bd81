use crate::{db::enums::Currency, schema::markets};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Trading venues are seeded by migration and immutable in practice.
#[derive(Clone, Debug, Deserialize, Identifiable, Queryable, Selectable, Serialize)]
#[diesel(table_name = markets)]
pub struct Market {
    pub id: Uuid,
    pub mic: String,
    pub name: String,
    pub country: String,
    pub timezone: String,
    pub active: bool,
    pub currency: Currency,
}

impl Market {
    pub async fn find_by_mic(
        conn: &mut AsyncPgConnection,
        mic: &str,
    ) -> QueryResult<Option<Market>> {
        markets::table
            .filter(markets::mic.eq(mic))
            .select(Market::as_select())
            .first(conn)
            .await
            .optional()
    }

    pub async fn id_by_mic(conn: &mut AsyncPgConnection, mic: &str) -> QueryResult<Option<Uuid>> {
        markets::table
            .filter(markets::mic.eq(mic))
            .select(markets::id)
            .first(conn)
            .await
            .optional()
    }
}
