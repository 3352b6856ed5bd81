use crate::{
    db::models::instruments::Instrument,
    position::PositionState,
    schema::{brokerage_accounts, holdings, instruments, wallets},
};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, Deserialize, Identifiable, Queryable, Selectable, Serialize)]
#[diesel(table_name = holdings)]
pub struct Holding {
    pub id: Uuid,
    pub account_id: Uuid,
    pub instrument_id: Uuid,
    pub quantity: BigDecimal,
    pub avg_cost: BigDecimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Holding {
    pub fn state(&self) -> PositionState {
        PositionState {
            quantity: self.quantity.clone(),
            avg_cost: self.avg_cost.clone(),
        }
    }

    /// Locks the holding row for the surrounding transaction, creating a
    /// zeroed row first when the pair has no position yet. The `FOR UPDATE`
    /// serializes concurrent event processing for one (account, instrument).
    pub async fn lock_or_create(
        conn: &mut AsyncPgConnection,
        account_id: Uuid,
        instrument_id: Uuid,
    ) -> QueryResult<Holding> {
        let locked: Option<Holding> = holdings::table
            .filter(holdings::account_id.eq(account_id))
            .filter(holdings::instrument_id.eq(instrument_id))
            .for_update()
            .select(Holding::as_select())
            .first(conn)
            .await
            .optional()?;
        if let Some(holding) = locked {
            return Ok(holding);
        }
        diesel::insert_into(holdings::table)
            .values((
                holdings::account_id.eq(account_id),
                holdings::instrument_id.eq(instrument_id),
            ))
            .returning(Holding::as_returning())
            .get_result(conn)
            .await
    }

    pub async fn save_state(
        conn: &mut AsyncPgConnection,
        holding_id: Uuid,
        state: &PositionState,
    ) -> QueryResult<Holding> {
        diesel::update(holdings::table.find(holding_id))
            .set((
                holdings::quantity.eq(&state.quantity),
                holdings::avg_cost.eq(&state.avg_cost),
                holdings::updated_at.eq(diesel::dsl::now),
            ))
            .returning(Holding::as_returning())
            .get_result(conn)
            .await
    }

    pub async fn delete(conn: &mut AsyncPgConnection, holding_id: Uuid) -> QueryResult<()> {
        diesel::delete(holdings::table.find(holding_id))
            .execute(conn)
            .await?;
        Ok(())
    }

    pub async fn list_for_account(
        conn: &mut AsyncPgConnection,
        account_id: Uuid,
    ) -> QueryResult<Vec<(Holding, Instrument)>> {
        holdings::table
            .inner_join(instruments::table)
            .filter(holdings::account_id.eq(account_id))
            .order_by(instruments::symbol.asc())
            .select((Holding::as_select(), Instrument::as_select()))
            .load(conn)
            .await
    }

    pub async fn list_for_user(
        conn: &mut AsyncPgConnection,
        user_id: Uuid,
    ) -> QueryResult<Vec<(Holding, Instrument)>> {
        holdings::table
            .inner_join(instruments::table)
            .inner_join(brokerage_accounts::table.inner_join(wallets::table))
            .filter(wallets::user_id.eq(user_id))
            .order_by(instruments::symbol.asc())
            .select((Holding::as_select(), Instrument::as_select()))
            .load(conn)
            .await
    }
}
