use crate::{
    db::enums::{CapitalGainKind, Currency},
    schema::capital_gains,
};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Datelike, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Realized monetary gain or loss tied to a cash event on a deposit account.
#[derive(Clone, Debug, Deserialize, Identifiable, Queryable, Selectable, Serialize)]
#[diesel(table_name = capital_gains)]
pub struct CapitalGain {
    pub id: Uuid,
    pub kind: CapitalGainKind,
    pub amount: BigDecimal,
    pub currency: Currency,
    pub occurred_at: DateTime<Utc>,
    pub deposit_account_id: Uuid,
    pub transaction_id: Option<Uuid>,
    pub tax_year: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Insertable)]
#[diesel(table_name = capital_gains)]
pub struct NewCapitalGain {
    pub kind: CapitalGainKind,
    pub amount: BigDecimal,
    pub currency: Currency,
    pub occurred_at: DateTime<Utc>,
    pub deposit_account_id: Uuid,
    pub transaction_id: Option<Uuid>,
    pub tax_year: i32,
}

impl NewCapitalGain {
    pub fn new(
        kind: CapitalGainKind,
        amount: BigDecimal,
        currency: Currency,
        occurred_at: DateTime<Utc>,
        deposit_account_id: Uuid,
        transaction_id: Option<Uuid>,
    ) -> Self {
        Self {
            kind,
            amount,
            currency,
            occurred_at,
            deposit_account_id,
            transaction_id,
            tax_year: occurred_at.year(),
        }
    }
}

impl CapitalGain {
    pub async fn insert(
        conn: &mut AsyncPgConnection,
        row: &NewCapitalGain,
    ) -> QueryResult<CapitalGain> {
        diesel::insert_into(capital_gains::table)
            .values(row)
            .returning(CapitalGain::as_returning())
            .get_result(conn)
            .await
    }
}
