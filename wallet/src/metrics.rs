use lazy_static::lazy_static;
use prometheus::{register_int_counter_vec, IntCounterVec};

lazy_static! {
    /// Brokerage events committed, by kind.
    pub static ref EVENTS_PROCESSED_COUNT: IntCounterVec = register_int_counter_vec!(
        "wallet_brokerage_events_processed_count",
        "Number of brokerage events committed, by kind",
        &["kind"]
    )
    .unwrap();

    /// Bulk-import rows that failed, by error class.
    pub static ref IMPORT_ROWS_FAILED_COUNT: IntCounterVec = register_int_counter_vec!(
        "wallet_import_rows_failed_count",
        "Number of bulk-import rows rejected, by error class",
        &["class"]
    )
    .unwrap();

    /// Ledger rows appended per outcome.
    pub static ref LEDGER_ROWS_APPENDED_COUNT: IntCounterVec = register_int_counter_vec!(
        "wallet_ledger_rows_appended_count",
        "Number of ledger rows appended, by source",
        &["source"]
    )
    .unwrap();
}
