use crate::{
    db::enums::Currency,
    schema::{
        brokerage_account_monthly_snapshots, deposit_account_monthly_snapshots,
        fx_monthly_snapshots, metal_holding_monthly_snapshots, real_estate_monthly_snapshots,
    },
};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::{prelude::*, upsert::excluded};
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, Deserialize, Identifiable, Queryable, Selectable, Serialize)]
#[diesel(table_name = fx_monthly_snapshots)]
pub struct FxMonthlySnapshot {
    pub id: Uuid,
    pub month_key: String,
    pub rates: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize, Identifiable, Queryable, Selectable, Serialize)]
#[diesel(table_name = deposit_account_monthly_snapshots)]
pub struct DepositAccountMonthlySnapshot {
    pub id: Uuid,
    pub account_id: Uuid,
    pub wallet_id: Uuid,
    pub month_key: String,
    pub currency: Currency,
    pub available: BigDecimal,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize, Identifiable, Queryable, Selectable, Serialize)]
#[diesel(table_name = brokerage_account_monthly_snapshots)]
pub struct BrokerageAccountMonthlySnapshot {
    pub id: Uuid,
    pub brokerage_account_id: Uuid,
    pub wallet_id: Uuid,
    pub month_key: String,
    pub currency: Currency,
    pub cash: BigDecimal,
    pub stocks: BigDecimal,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize, Identifiable, Queryable, Selectable, Serialize)]
#[diesel(table_name = metal_holding_monthly_snapshots)]
pub struct MetalHoldingMonthlySnapshot {
    pub id: Uuid,
    pub metal_holding_id: Uuid,
    pub wallet_id: Uuid,
    pub month_key: String,
    pub currency: Currency,
    pub value: BigDecimal,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize, Identifiable, Queryable, Selectable, Serialize)]
#[diesel(table_name = real_estate_monthly_snapshots)]
pub struct RealEstateMonthlySnapshot {
    pub id: Uuid,
    pub real_estate_id: Uuid,
    pub wallet_id: Uuid,
    pub month_key: String,
    pub currency: Currency,
    pub value: BigDecimal,
    pub updated_at: DateTime<Utc>,
}

/// Re-running a snapshot for the same month must end in the same rows, so
/// every writer here is an upsert on the (entity, month-key) constraint.
pub async fn upsert_fx_snapshot(
    conn: &mut AsyncPgConnection,
    month_key: &str,
    rates: &serde_json::Value,
) -> QueryResult<()> {
    diesel::insert_into(fx_monthly_snapshots::table)
        .values((
            fx_monthly_snapshots::month_key.eq(month_key),
            fx_monthly_snapshots::rates.eq(rates),
        ))
        .on_conflict(fx_monthly_snapshots::month_key)
        .do_update()
        .set((
            fx_monthly_snapshots::rates.eq(excluded(fx_monthly_snapshots::rates)),
            fx_monthly_snapshots::updated_at.eq(diesel::dsl::now),
        ))
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn upsert_deposit_snapshot(
    conn: &mut AsyncPgConnection,
    account_id: Uuid,
    wallet_id: Uuid,
    month_key: &str,
    currency: Currency,
    available: &BigDecimal,
) -> QueryResult<()> {
    use deposit_account_monthly_snapshots as t;
    diesel::insert_into(t::table)
        .values((
            t::account_id.eq(account_id),
            t::wallet_id.eq(wallet_id),
            t::month_key.eq(month_key),
            t::currency.eq(currency),
            t::available.eq(available),
        ))
        .on_conflict((t::account_id, t::month_key))
        .do_update()
        .set((
            t::currency.eq(excluded(t::currency)),
            t::available.eq(excluded(t::available)),
            t::updated_at.eq(diesel::dsl::now),
        ))
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn upsert_brokerage_snapshot(
    conn: &mut AsyncPgConnection,
    brokerage_account_id: Uuid,
    wallet_id: Uuid,
    month_key: &str,
    currency: Currency,
    cash: &BigDecimal,
    stocks: &BigDecimal,
) -> QueryResult<()> {
    use brokerage_account_monthly_snapshots as t;
    diesel::insert_into(t::table)
        .values((
            t::brokerage_account_id.eq(brokerage_account_id),
            t::wallet_id.eq(wallet_id),
            t::month_key.eq(month_key),
            t::currency.eq(currency),
            t::cash.eq(cash),
            t::stocks.eq(stocks),
        ))
        .on_conflict((t::brokerage_account_id, t::month_key, t::currency))
        .do_update()
        .set((
            t::cash.eq(excluded(t::cash)),
            t::stocks.eq(excluded(t::stocks)),
            t::updated_at.eq(diesel::dsl::now),
        ))
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn upsert_metal_snapshot(
    conn: &mut AsyncPgConnection,
    metal_holding_id: Uuid,
    wallet_id: Uuid,
    month_key: &str,
    currency: Currency,
    value: &BigDecimal,
) -> QueryResult<()> {
    use metal_holding_monthly_snapshots as t;
    diesel::insert_into(t::table)
        .values((
            t::metal_holding_id.eq(metal_holding_id),
            t::wallet_id.eq(wallet_id),
            t::month_key.eq(month_key),
            t::currency.eq(currency),
            t::value.eq(value),
        ))
        .on_conflict((t::metal_holding_id, t::month_key))
        .do_update()
        .set((
            t::currency.eq(excluded(t::currency)),
            t::value.eq(excluded(t::value)),
            t::updated_at.eq(diesel::dsl::now),
        ))
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn upsert_real_estate_snapshot(
    conn: &mut AsyncPgConnection,
    real_estate_id: Uuid,
    wallet_id: Uuid,
    month_key: &str,
    currency: Currency,
    value: &BigDecimal,
) -> QueryResult<()> {
    use real_estate_monthly_snapshots as t;
    diesel::insert_into(t::table)
        .values((
            t::real_estate_id.eq(real_estate_id),
            t::wallet_id.eq(wallet_id),
            t::month_key.eq(month_key),
            t::currency.eq(currency),
            t::value.eq(value),
        ))
        .on_conflict((t::real_estate_id, t::month_key))
        .do_update()
        .set((
            t::currency.eq(excluded(t::currency)),
            t::value.eq(excluded(t::value)),
            t::updated_at.eq(diesel::dsl::now),
        ))
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn fx_snapshots_for_months(
    conn: &mut AsyncPgConnection,
    month_keys: &[String],
) -> QueryResult<Vec<FxMonthlySnapshot>> {
    if month_keys.is_empty() {
        return Ok(vec![]);
    }
    fx_monthly_snapshots::table
        .filter(fx_monthly_snapshots::month_key.eq_any(month_keys))
        .select(FxMonthlySnapshot::as_select())
        .load(conn)
        .await
}

macro_rules! monthly_rows_for_wallets {
    ($fn_name:ident, $table:ident, $model:ident) => {
        pub async fn $fn_name(
            conn: &mut AsyncPgConnection,
            wallet_ids: &[Uuid],
            month_keys: &[String],
        ) -> QueryResult<Vec<$model>> {
            if wallet_ids.is_empty() || month_keys.is_empty() {
                return Ok(vec![]);
            }
            $table::table
                .filter($table::wallet_id.eq_any(wallet_ids))
                .filter($table::month_key.eq_any(month_keys))
                .select($model::as_select())
                .load(conn)
                .await
        }
    };
}

monthly_rows_for_wallets!(
    deposit_snapshots_for_months,
    deposit_account_monthly_snapshots,
    DepositAccountMonthlySnapshot
);
monthly_rows_for_wallets!(
    brokerage_snapshots_for_months,
    brokerage_account_monthly_snapshots,
    BrokerageAccountMonthlySnapshot
);
monthly_rows_for_wallets!(
    metal_snapshots_for_months,
    metal_holding_monthly_snapshots,
    MetalHoldingMonthlySnapshot
);
monthly_rows_for_wallets!(
    real_estate_snapshots_for_months,
    real_estate_monthly_snapshots,
    RealEstateMonthlySnapshot
);
