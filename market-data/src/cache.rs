//! Redis write-through for latest quotes plus the cross-worker ingestion
//! lock. The cache is strictly a second copy of `quote_latest`: every error
//! here is logged and swallowed so a cache outage never aborts ingestion.

use chrono::Utc;
use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

pub const QUOTE_TTL_SECS: u64 = 3600;
pub const LOCK_TTL_SECS: u64 = 13 * 60;

const KEY_PREFIX: &str = ":1:stock:";

/// Field value stored under `latest_quote:<MIC>` hashes, one field per symbol.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CachedQuote {
    pub name: Option<String>,
    pub last_price: String,
    pub change_pct: String,
    pub volume: Option<i64>,
    pub last_trade_at: String,
}

#[derive(Clone)]
pub struct QuoteCache {
    conn: ConnectionManager,
}

impl QuoteCache {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    fn make_key(key: &str) -> String {
        format!("{KEY_PREFIX}{key}")
    }

    /// Stores one symbol field in the market hash and refreshes the TTL on
    /// the whole hash key. Best effort.
    pub async fn hset(&self, key: &str, field: &str, value: &CachedQuote, ttl_secs: u64) {
        let full_key = Self::make_key(key);
        let payload = match serde_json::to_string(value) {
            Ok(p) => p,
            Err(e) => {
                warn!(key = full_key, field = field, error = ?e, "Failed to serialize cached quote");
                return;
            },
        };
        let mut conn = self.conn.clone();
        let res: redis::RedisResult<()> = redis::pipe()
            .cmd("HSET")
            .arg(&full_key)
            .arg(field)
            .arg(payload)
            .ignore()
            .cmd("EXPIRE")
            .arg(&full_key)
            .arg(ttl_secs)
            .ignore()
            .query_async(&mut conn)
            .await;
        if let Err(e) = res {
            warn!(key = full_key, field = field, error = ?e, "Quote cache write failed");
        }
    }

    /// All fields of a market hash, decoded. Missing key or any cache error
    /// yields an empty map.
    pub async fn hgetall(&self, key: &str) -> HashMap<String, CachedQuote> {
        let full_key = Self::make_key(key);
        let mut conn = self.conn.clone();
        let raw: redis::RedisResult<HashMap<String, String>> = redis::cmd("HGETALL")
            .arg(&full_key)
            .query_async(&mut conn)
            .await;
        match raw {
            Ok(raw) => raw
                .into_iter()
                .filter_map(|(field, payload)| {
                    match serde_json::from_str::<CachedQuote>(&payload) {
                        Ok(value) => Some((field, value)),
                        Err(e) => {
                            debug!(key = full_key, field = field, error = ?e, "Skipping undecodable cache field");
                            None
                        },
                    }
                })
                .collect(),
            Err(e) => {
                warn!(key = full_key, error = ?e, "Quote cache read failed");
                HashMap::new()
            },
        }
    }
}

/// Cross-worker mutual exclusion for per-market ingestion. Acquisition is a
/// single atomic `SET NX EX`; the TTL covers a crashed holder.
pub struct IngestLock {
    conn: ConnectionManager,
    key: String,
}

impl IngestLock {
    pub async fn acquire(
        conn: ConnectionManager,
        market_key: &str,
        ttl_secs: u64,
    ) -> anyhow::Result<Option<IngestLock>> {
        let key = format!("{KEY_PREFIX}lock:ingest:{market_key}");
        let mut c = conn.clone();
        let acquired: Option<String> = redis::cmd("SET")
            .arg(&key)
            .arg(Utc::now().timestamp().to_string())
            .arg("NX")
            .arg("EX")
            .arg(ttl_secs)
            .query_async(&mut c)
            .await?;
        if acquired.is_none() {
            warn!(key = key, "Ingest lock already held");
            return Ok(None);
        }
        Ok(Some(IngestLock { conn, key }))
    }

    /// Explicit release; if the worker dies first the TTL expires the key.
    pub async fn release(self) {
        let mut conn = self.conn.clone();
        let res: redis::RedisResult<()> = redis::cmd("DEL")
            .arg(&self.key)
            .query_async(&mut conn)
            .await;
        if let Err(e) = res {
            warn!(key = self.key, error = ?e, "Failed to release ingest lock, waiting for TTL");
        }
    }
}
