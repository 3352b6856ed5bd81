use crate::schema::wallets;
use chrono::{DateTime, Utc};
use diesel::{prelude::*, result::DatabaseErrorKind, result::Error as DieselError};
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, Deserialize, Identifiable, Queryable, Selectable, Serialize)]
#[diesel(table_name = wallets)]
pub struct Wallet {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Trim and collapse internal whitespace so uniqueness checks compare what a
/// user would consider the same name.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub enum WalletCreateOutcome {
    Created(Wallet),
    DuplicateName,
}

impl Wallet {
    pub async fn find_owned(
        conn: &mut AsyncPgConnection,
        user_id: Uuid,
        wallet_id: Uuid,
    ) -> QueryResult<Option<Wallet>> {
        wallets::table
            .filter(wallets::id.eq(wallet_id))
            .filter(wallets::user_id.eq(user_id))
            .select(Wallet::as_select())
            .first(conn)
            .await
            .optional()
    }

    pub async fn list_for_user(
        conn: &mut AsyncPgConnection,
        user_id: Uuid,
    ) -> QueryResult<Vec<Wallet>> {
        wallets::table
            .filter(wallets::user_id.eq(user_id))
            .order_by(wallets::created_at.asc())
            .select(Wallet::as_select())
            .load(conn)
            .await
    }

    pub async fn create(
        conn: &mut AsyncPgConnection,
        user_id: Uuid,
        name: &str,
    ) -> QueryResult<WalletCreateOutcome> {
        let name = normalize_name(name);
        let inserted = diesel::insert_into(wallets::table)
            .values((wallets::user_id.eq(user_id), wallets::name.eq(&name)))
            .returning(Wallet::as_returning())
            .get_result(conn)
            .await;
        match inserted {
            Ok(wallet) => Ok(WalletCreateOutcome::Created(wallet)),
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                Ok(WalletCreateOutcome::DuplicateName)
            },
            Err(e) => Err(e),
        }
    }

    /// Deletes a wallet owned by the user; cascades take the accounts and
    /// asset rows with it. Returns false when the wallet is not theirs.
    pub async fn delete_owned(
        conn: &mut AsyncPgConnection,
        user_id: Uuid,
        wallet_id: Uuid,
    ) -> QueryResult<bool> {
        let deleted = diesel::delete(
            wallets::table
                .filter(wallets::id.eq(wallet_id))
                .filter(wallets::user_id.eq(user_id)),
        )
        .execute(conn)
        .await?;
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  My   Wallet "), "My Wallet");
        assert_eq!(normalize_name("plain"), "plain");
        assert_eq!(normalize_name(""), "");
    }
}
