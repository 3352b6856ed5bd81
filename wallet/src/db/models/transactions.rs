use crate::{
    db::enums::TransactionStatus,
    schema::{deposit_accounts, transactions},
};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, Deserialize, Identifiable, Queryable, Selectable, Serialize)]
#[diesel(table_name = transactions)]
pub struct Transaction {
    pub id: Uuid,
    pub account_id: Uuid,
    pub amount: BigDecimal,
    pub description: String,
    pub category: Option<String>,
    pub status: TransactionStatus,
    pub balance_before: BigDecimal,
    pub balance_after: BigDecimal,
    pub date_transaction: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Insertable)]
#[diesel(table_name = transactions)]
pub struct NewTransaction {
    pub account_id: Uuid,
    pub amount: BigDecimal,
    pub description: String,
    pub category: Option<String>,
    pub status: TransactionStatus,
    pub balance_before: BigDecimal,
    pub balance_after: BigDecimal,
    pub date_transaction: DateTime<Utc>,
}

impl Transaction {
    pub async fn account_has_any(
        conn: &mut AsyncPgConnection,
        account_id: Uuid,
    ) -> QueryResult<bool> {
        let count: i64 = transactions::table
            .filter(transactions::account_id.eq(account_id))
            .count()
            .get_result(conn)
            .await?;
        Ok(count > 0)
    }

    /// `after` of the ledger's newest row, zero on an empty ledger. The next
    /// appended row continues from this value.
    pub async fn last_balance_after(
        conn: &mut AsyncPgConnection,
        account_id: Uuid,
    ) -> QueryResult<BigDecimal> {
        let last: Option<BigDecimal> = transactions::table
            .filter(transactions::account_id.eq(account_id))
            .order_by((
                transactions::date_transaction.desc(),
                transactions::id.desc(),
            ))
            .select(transactions::balance_after)
            .first(conn)
            .await
            .optional()?;
        Ok(last.unwrap_or_default())
    }

    /// Duplicate key for idempotent imports: same account, timestamp, amount
    /// and description.
    pub async fn find_duplicate(
        conn: &mut AsyncPgConnection,
        row: &NewTransaction,
    ) -> QueryResult<Option<Transaction>> {
        transactions::table
            .filter(transactions::account_id.eq(row.account_id))
            .filter(transactions::date_transaction.eq(row.date_transaction))
            .filter(transactions::amount.eq(&row.amount))
            .filter(transactions::description.eq(&row.description))
            .select(Transaction::as_select())
            .first(conn)
            .await
            .optional()
    }

    pub async fn insert(
        conn: &mut AsyncPgConnection,
        row: &NewTransaction,
    ) -> QueryResult<Transaction> {
        diesel::insert_into(transactions::table)
            .values(row)
            .returning(Transaction::as_returning())
            .get_result(conn)
            .await
    }

    pub async fn last_for_account(
        conn: &mut AsyncPgConnection,
        account_id: Uuid,
        limit: i64,
    ) -> QueryResult<Vec<Transaction>> {
        transactions::table
            .filter(transactions::account_id.eq(account_id))
            .order_by((
                transactions::date_transaction.desc(),
                transactions::id.desc(),
            ))
            .limit(limit)
            .select(Transaction::as_select())
            .load(conn)
            .await
    }

    /// Year-to-date rows for a set of wallets, joined to the account currency.
    pub async fn ytd_for_wallets(
        conn: &mut AsyncPgConnection,
        wallet_ids: &[Uuid],
        year_start: DateTime<Utc>,
    ) -> QueryResult<Vec<(Transaction, crate::db::enums::Currency)>> {
        transactions::table
            .inner_join(deposit_accounts::table)
            .filter(deposit_accounts::wallet_id.eq_any(wallet_ids))
            .filter(transactions::date_transaction.ge(year_start))
            .select((Transaction::as_select(), deposit_accounts::currency))
            .load(conn)
            .await
    }
}
