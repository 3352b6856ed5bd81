use anyhow::{Context, Result};
use diesel::{
    pg::Pg,
    query_builder::{QueryFragment, QueryId},
    ConnectionResult, QueryResult,
};
use diesel_async::{
    pooled_connection::{
        bb8::{Pool, PooledConnection},
        AsyncDieselConnectionManager, ManagerConfig,
    },
    AsyncPgConnection, RunQueryDsl,
};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness};
use futures_util::{future::BoxFuture, FutureExt};
use tracing::{info, warn};

pub type DbPool = Pool<AsyncPgConnection>;
pub type ArcDbPool = std::sync::Arc<DbPool>;
pub type DbPoolConnection<'a> = PooledConnection<'a, AsyncPgConnection>;

/// Postgres bind parameters are a u16 internally, so a single insert statement
/// can never carry more than this many values.
pub const MAX_DIESEL_PARAM_SIZE: usize = u16::MAX as usize;

const DEFAULT_POOL_SIZE: u32 = 30;

/// Establishes a TLS postgres connection by hand so that managed databases
/// requiring `sslmode=require` work with diesel-async.
fn establish_connection(database_url: &str) -> BoxFuture<ConnectionResult<AsyncPgConnection>> {
    use native_tls::TlsConnector;
    use postgres_native_tls::MakeTlsConnector;

    let url = database_url.to_string();
    async move {
        let connector = TlsConnector::builder()
            .danger_accept_invalid_certs(true)
            .build()
            .expect("Could not build TLS connector");
        let connector = MakeTlsConnector::new(connector);
        let (client, connection) = tokio_postgres::connect(&url, connector)
            .await
            .expect("Could not connect to database");
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                warn!(error = ?e, "Postgres connection error");
            }
        });
        AsyncPgConnection::try_from(client).await
    }
    .boxed()
}

pub async fn new_db_pool(database_url: &str, pool_size: Option<u32>) -> Result<ArcDbPool> {
    let pool_size = pool_size.unwrap_or(DEFAULT_POOL_SIZE);
    let manager = if database_url.contains("sslmode=require") {
        info!("Creating connection pool with TLS");
        let mut config = ManagerConfig::<AsyncPgConnection>::default();
        config.custom_setup = Box::new(establish_connection);
        AsyncDieselConnectionManager::<AsyncPgConnection>::new_with_config(database_url, config)
    } else {
        AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url)
    };
    let pool = Pool::builder()
        .max_size(pool_size)
        .build(manager)
        .await
        .context("Failed to build the connection pool")?;
    Ok(std::sync::Arc::new(pool))
}

/// Runs embedded migrations on a blocking thread; diesel-migrations only
/// speaks sync connections.
pub async fn run_pending_migrations(
    database_url: &str,
    migrations: EmbeddedMigrations,
) -> Result<()> {
    let url = database_url.to_string();
    tokio::task::spawn_blocking(move || {
        use diesel::Connection;
        let mut conn = diesel::PgConnection::establish(&url)
            .context("Failed to establish migration connection")?;
        conn.run_pending_migrations(migrations)
            .map_err(|e| anyhow::anyhow!("Failed to run migrations: {e}"))?;
        anyhow::Ok(())
    })
    .await
    .context("Migration task panicked")??;
    Ok(())
}

/// Given the number of items to insert and how many bind parameters one row
/// consumes, returns the (start, end) windows that keep each statement under
/// the postgres parameter limit.
pub fn get_chunks(num_items_to_insert: usize, column_count: usize) -> Vec<(usize, usize)> {
    let max_item_size = MAX_DIESEL_PARAM_SIZE / column_count;
    let mut chunk: (usize, usize) = (0, std::cmp::min(num_items_to_insert, max_item_size));
    let mut chunks = vec![chunk];
    while chunk.1 != num_items_to_insert {
        chunk = (
            chunk.0 + max_item_size,
            std::cmp::min(num_items_to_insert, chunk.1 + max_item_size),
        );
        chunks.push(chunk);
    }
    chunks
}

pub async fn execute_with_better_error<U>(pool: ArcDbPool, query: U) -> QueryResult<usize>
where
    U: QueryFragment<Pg> + QueryId + Send,
{
    let debug_string = diesel::debug_query::<Pg, _>(&query).to_string();
    let mut conn = pool.get().await.map_err(|e| {
        warn!(error = ?e, "Error getting connection from pool");
        diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UnableToSendCommand,
            Box::new(e.to_string()),
        )
    })?;
    let res = query.execute(&mut conn).await;
    if let Err(ref e) = res {
        warn!(error = ?e, query = debug_string, "Error running query");
    }
    res
}

/// Builds `build_query` over chunks of `items_to_insert` and executes the
/// chunks concurrently.
pub async fn execute_in_chunks<U, T>(
    pool: ArcDbPool,
    build_query: fn(Vec<T>) -> U,
    items_to_insert: &[T],
    chunk_size: usize,
) -> Result<(), diesel::result::Error>
where
    U: QueryFragment<Pg> + QueryId + Send + 'static,
    T: Clone + Send + 'static,
{
    let tasks = get_chunks(items_to_insert.len(), chunk_size)
        .into_iter()
        .map(|(start_ind, end_ind)| {
            let items = items_to_insert[start_ind..end_ind].to_vec();
            let pool = pool.clone();
            tokio::spawn(async move {
                let query = build_query(items);
                execute_with_better_error(pool, query).await
            })
        })
        .collect::<Vec<_>>();

    let results = futures_util::future::try_join_all(tasks)
        .await
        .expect("Chunked insert task panicked");
    for res in results {
        res?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_chunks_logic() {
        assert_eq!(get_chunks(10, 5), vec![(0, 10)]);
        // The max chunk size is (u16::MAX / column_count); 65_535 / 2 = 32_767.
        assert_eq!(
            get_chunks(65_535, 2),
            vec![(0, 32_767), (32_767, 65_534), (65_534, 65_535)]
        );
        assert_eq!(get_chunks(0, 5), vec![(0, 0)]);
    }
}
