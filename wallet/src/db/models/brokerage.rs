use crate::schema::{brokerage_accounts, wallets};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, Deserialize, Identifiable, Queryable, Selectable, Serialize)]
#[diesel(table_name = brokerage_accounts)]
pub struct BrokerageAccount {
    pub id: Uuid,
    pub wallet_id: Uuid,
    pub bank_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl BrokerageAccount {
    pub async fn find(
        conn: &mut AsyncPgConnection,
        id: Uuid,
    ) -> QueryResult<Option<BrokerageAccount>> {
        brokerage_accounts::table
            .find(id)
            .select(BrokerageAccount::as_select())
            .first(conn)
            .await
            .optional()
    }

    /// The account, only when it belongs to one of the user's wallets.
    pub async fn find_owned(
        conn: &mut AsyncPgConnection,
        user_id: Uuid,
        id: Uuid,
    ) -> QueryResult<Option<BrokerageAccount>> {
        brokerage_accounts::table
            .inner_join(wallets::table)
            .filter(brokerage_accounts::id.eq(id))
            .filter(wallets::user_id.eq(user_id))
            .select(BrokerageAccount::as_select())
            .first(conn)
            .await
            .optional()
    }

    pub async fn create(
        conn: &mut AsyncPgConnection,
        wallet_id: Uuid,
        bank_id: Uuid,
        name: &str,
    ) -> QueryResult<BrokerageAccount> {
        diesel::insert_into(brokerage_accounts::table)
            .values((
                brokerage_accounts::wallet_id.eq(wallet_id),
                brokerage_accounts::bank_id.eq(bank_id),
                brokerage_accounts::name.eq(name),
            ))
            .returning(BrokerageAccount::as_returning())
            .get_result(conn)
            .await
    }

    pub async fn list_for_user(
        conn: &mut AsyncPgConnection,
        user_id: Uuid,
    ) -> QueryResult<Vec<BrokerageAccount>> {
        brokerage_accounts::table
            .inner_join(wallets::table)
            .filter(wallets::user_id.eq(user_id))
            .order_by(brokerage_accounts::name.asc())
            .select(BrokerageAccount::as_select())
            .load(conn)
            .await
    }

    pub async fn list_for_wallets(
        conn: &mut AsyncPgConnection,
        wallet_ids: &[Uuid],
    ) -> QueryResult<Vec<BrokerageAccount>> {
        brokerage_accounts::table
            .filter(brokerage_accounts::wallet_id.eq_any(wallet_ids))
            .order_by(brokerage_accounts::created_at.asc())
            .select(BrokerageAccount::as_select())
            .load(conn)
            .await
    }
}
