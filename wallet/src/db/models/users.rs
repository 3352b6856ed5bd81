use crate::schema::users;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Users are owned by the auth service; this table mirrors the ids we have
/// seen so wallet rows have something to hang off.
#[derive(Clone, Debug, Deserialize, Identifiable, Queryable, Selectable, Serialize)]
#[diesel(table_name = users)]
pub struct User {
    pub id: Uuid,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub async fn find(conn: &mut AsyncPgConnection, id: Uuid) -> QueryResult<Option<User>> {
        users::table
            .find(id)
            .select(User::as_select())
            .first(conn)
            .await
            .optional()
    }

    pub async fn upsert(
        conn: &mut AsyncPgConnection,
        id: Uuid,
        email: Option<&str>,
    ) -> QueryResult<User> {
        diesel::insert_into(users::table)
            .values((users::id.eq(id), users::email.eq(email)))
            .on_conflict(users::id)
            .do_update()
            .set(users::email.eq(email))
            .returning(User::as_returning())
            .get_result(conn)
            .await
    }
}
