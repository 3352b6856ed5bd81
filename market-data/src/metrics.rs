use lazy_static::lazy_static;
use prometheus::{register_int_counter_vec, IntCounterVec};

lazy_static! {
    /// Rows upserted per market during ingestion.
    pub static ref INGESTED_ROWS_COUNT: IntCounterVec = register_int_counter_vec!(
        "market_data_ingested_rows_count",
        "Number of source rows successfully upserted, by market",
        &["mic"]
    )
    .unwrap();

    /// Rows that failed to parse or persist per market.
    pub static ref FAILED_ROWS_COUNT: IntCounterVec = register_int_counter_vec!(
        "market_data_failed_rows_count",
        "Number of source rows that failed, by market",
        &["mic"]
    )
    .unwrap();

    /// Ingestion cycles skipped because another worker held the lock.
    pub static ref LOCK_CONTENTION_COUNT: IntCounterVec = register_int_counter_vec!(
        "market_data_lock_contention_count",
        "Number of ingestion invocations that found the lock taken, by market key",
        &["market_key"]
    )
    .unwrap();

    /// Scheduled task retries, by task name.
    pub static ref TASK_RETRY_COUNT: IntCounterVec = register_int_counter_vec!(
        "market_data_task_retry_count",
        "Number of scheduled task retries, by task",
        &["task"]
    )
    .unwrap();
}
