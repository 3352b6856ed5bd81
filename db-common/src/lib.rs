pub mod pool;

pub use pool::{
    execute_in_chunks, execute_with_better_error, get_chunks, new_db_pool, run_pending_migrations,
    ArcDbPool, DbPool, DbPoolConnection, MAX_DIESEL_PARAM_SIZE,
};
