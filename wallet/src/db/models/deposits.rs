use crate::{
    db::enums::{AccountType, Currency},
    schema::{brokerage_deposit_links, deposit_account_balances, deposit_accounts},
};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::{prelude::*, result::DatabaseErrorKind, result::Error as DieselError};
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, Deserialize, Identifiable, Queryable, Selectable, Serialize)]
#[diesel(table_name = deposit_accounts)]
pub struct DepositAccount {
    pub id: Uuid,
    pub wallet_id: Uuid,
    pub bank_id: Uuid,
    pub name: String,
    pub account_type: AccountType,
    pub currency: Currency,
    #[serde(skip_serializing)]
    pub account_number_enc: Vec<u8>,
    #[serde(skip_serializing)]
    pub account_number_fp: String,
    #[serde(skip_serializing)]
    pub iban_enc: Option<Vec<u8>>,
    #[serde(skip_serializing)]
    pub iban_fp: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Insertable)]
#[diesel(table_name = deposit_accounts)]
pub struct NewDepositAccount {
    pub wallet_id: Uuid,
    pub bank_id: Uuid,
    pub name: String,
    pub account_type: AccountType,
    pub currency: Currency,
    pub account_number_enc: Vec<u8>,
    pub account_number_fp: String,
    pub iban_enc: Option<Vec<u8>>,
    pub iban_fp: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Identifiable, Queryable, Selectable, Serialize)]
#[diesel(primary_key(account_id))]
#[diesel(table_name = deposit_account_balances)]
pub struct DepositAccountBalance {
    pub account_id: Uuid,
    pub available: BigDecimal,
    pub blocked: BigDecimal,
    pub updated_at: DateTime<Utc>,
}

/// Association row pairing a brokerage account with the deposit account that
/// settles its cash, one per currency.
#[derive(Clone, Debug, Deserialize, Identifiable, Queryable, Selectable, Serialize)]
#[diesel(table_name = brokerage_deposit_links)]
pub struct BrokerageDepositLink {
    pub id: Uuid,
    pub brokerage_account_id: Uuid,
    pub deposit_account_id: Uuid,
    pub currency: Currency,
}

pub enum DepositCreateOutcome {
    Created(DepositAccount),
    Duplicate,
}

impl DepositAccount {
    pub async fn find(conn: &mut AsyncPgConnection, id: Uuid) -> QueryResult<Option<DepositAccount>> {
        deposit_accounts::table
            .find(id)
            .select(DepositAccount::as_select())
            .first(conn)
            .await
            .optional()
    }

    pub async fn list_for_wallets(
        conn: &mut AsyncPgConnection,
        wallet_ids: &[Uuid],
    ) -> QueryResult<Vec<DepositAccount>> {
        deposit_accounts::table
            .filter(deposit_accounts::wallet_id.eq_any(wallet_ids))
            .order_by(deposit_accounts::created_at.asc())
            .select(DepositAccount::as_select())
            .load(conn)
            .await
    }

    /// Creates the account and its zeroed balance row. The fingerprint
    /// uniqueness catches re-imports of the same bank account.
    pub async fn create(
        conn: &mut AsyncPgConnection,
        row: NewDepositAccount,
    ) -> QueryResult<DepositCreateOutcome> {
        let inserted = diesel::insert_into(deposit_accounts::table)
            .values(&row)
            .returning(DepositAccount::as_returning())
            .get_result(conn)
            .await;
        let account = match inserted {
            Ok(account) => account,
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                return Ok(DepositCreateOutcome::Duplicate)
            },
            Err(e) => return Err(e),
        };
        diesel::insert_into(deposit_account_balances::table)
            .values(deposit_account_balances::account_id.eq(account.id))
            .execute(conn)
            .await?;
        Ok(DepositCreateOutcome::Created(account))
    }

    pub async fn delete(conn: &mut AsyncPgConnection, id: Uuid) -> QueryResult<bool> {
        let deleted = diesel::delete(deposit_accounts::table.find(id))
            .execute(conn)
            .await?;
        Ok(deleted > 0)
    }
}

impl DepositAccountBalance {
    pub async fn get(
        conn: &mut AsyncPgConnection,
        account_id: Uuid,
    ) -> QueryResult<Option<DepositAccountBalance>> {
        deposit_account_balances::table
            .find(account_id)
            .select(DepositAccountBalance::as_select())
            .first(conn)
            .await
            .optional()
    }

    pub async fn set_available(
        conn: &mut AsyncPgConnection,
        account_id: Uuid,
        available: &BigDecimal,
    ) -> QueryResult<()> {
        diesel::update(deposit_account_balances::table.find(account_id))
            .set((
                deposit_account_balances::available.eq(available),
                deposit_account_balances::updated_at.eq(diesel::dsl::now),
            ))
            .execute(conn)
            .await?;
        Ok(())
    }
}

impl BrokerageDepositLink {
    pub async fn create(
        conn: &mut AsyncPgConnection,
        brokerage_account_id: Uuid,
        deposit_account_id: Uuid,
        currency: Currency,
    ) -> QueryResult<BrokerageDepositLink> {
        diesel::insert_into(brokerage_deposit_links::table)
            .values((
                brokerage_deposit_links::brokerage_account_id.eq(brokerage_account_id),
                brokerage_deposit_links::deposit_account_id.eq(deposit_account_id),
                brokerage_deposit_links::currency.eq(currency),
            ))
            .returning(BrokerageDepositLink::as_returning())
            .get_result(conn)
            .await
    }

    /// Resolves where a brokerage event's cash settles.
    pub async fn resolve_deposit(
        conn: &mut AsyncPgConnection,
        brokerage_account_id: Uuid,
        currency: Currency,
    ) -> QueryResult<Option<DepositAccount>> {
        brokerage_deposit_links::table
            .inner_join(deposit_accounts::table)
            .filter(brokerage_deposit_links::brokerage_account_id.eq(brokerage_account_id))
            .filter(brokerage_deposit_links::currency.eq(currency))
            .select(DepositAccount::as_select())
            .first(conn)
            .await
            .optional()
    }

    pub async fn list_for_brokerage(
        conn: &mut AsyncPgConnection,
        brokerage_account_id: Uuid,
    ) -> QueryResult<Vec<BrokerageDepositLink>> {
        brokerage_deposit_links::table
            .filter(brokerage_deposit_links::brokerage_account_id.eq(brokerage_account_id))
            .select(BrokerageDepositLink::as_select())
            .load(conn)
            .await
    }
}
