//! Daily OHLC synchronization from the historical CSV source. The sync window
//! is extended backwards by an overlap so late corrections from the vendor
//! overwrite previously stored candles (the upsert makes this idempotent).

use crate::{
    db::models::{
        candle_daily::{upsert_candles_query, CandleDaily},
        instrument::Instrument,
    },
    error::ApiError,
    normalize::q2,
};
use anyhow::Context;
use bigdecimal::BigDecimal;
use chrono::{Duration, NaiveDate};
use db_common::{execute_in_chunks, ArcDbPool, MAX_DIESEL_PARAM_SIZE};
use field_count::FieldCount;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Clone, Debug, Deserialize)]
pub struct SyncDailyRequest {
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    #[serde(default = "default_overlap_days")]
    pub overlap_days: i64,
    #[serde(default)]
    pub include_items: bool,
    #[serde(default)]
    pub return_all: bool,
}

fn default_overlap_days() -> i64 {
    5
}

#[derive(Clone, Debug, Serialize)]
pub struct SyncDailyOutcome {
    pub symbol: String,
    pub fetched: usize,
    pub upserted: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<CandleDaily>>,
}

/// Parses the vendor CSV (`Date,Open,High,Low,Close,Volume`), dropping rows
/// that fail to parse rather than aborting a whole sync on one bad line.
fn parse_candles_csv(instrument_id: Uuid, body: &str) -> Vec<CandleDaily> {
    let mut out = vec![];
    for line in body.lines().skip(1) {
        let fields: Vec<&str> = line.trim().split(',').collect();
        if fields.len() < 5 {
            continue;
        }
        let Ok(date_quote) = NaiveDate::parse_from_str(fields[0], "%Y-%m-%d") else {
            debug!(line = line, "Skipping candle row with bad date");
            continue;
        };
        let price = |i: usize| fields.get(i).and_then(|f| f.parse::<BigDecimal>().ok());
        let (Some(open), Some(high), Some(low), Some(close)) =
            (price(1), price(2), price(3), price(4))
        else {
            debug!(line = line, "Skipping candle row with bad prices");
            continue;
        };
        let volume = fields.get(5).and_then(|f| f.parse::<i64>().ok());
        out.push(CandleDaily {
            instrument_id,
            date_quote,
            open: q2(open),
            high: q2(high),
            low: q2(low),
            close: q2(close),
            volume,
            traded_at: None,
        });
    }
    out
}

pub async fn sync_daily_candles(
    pool: ArcDbPool,
    http: &reqwest::Client,
    historical_base_url: &str,
    symbol: &str,
    req: &SyncDailyRequest,
) -> Result<SyncDailyOutcome, ApiError> {
    if req.date_from > req.date_to {
        return Err(ApiError::Validation(
            "date_from must not be after date_to".to_string(),
        ));
    }
    let overlap = req.overlap_days.clamp(0, 60);

    let instrument = {
        let mut conn = pool.get().await.map_err(ApiError::pool)?;
        Instrument::find_by_symbol(&mut conn, symbol)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Instrument {symbol} not found")))?
    };

    let from = req.date_from - Duration::days(overlap);
    let url = format!(
        "{}/q/d/l/?s={}&d1={}&d2={}&i=d",
        historical_base_url.trim_end_matches('/'),
        instrument
            .historical_source
            .as_deref()
            .unwrap_or(instrument.symbol.as_str())
            .to_lowercase(),
        from.format("%Y%m%d"),
        req.date_to.format("%Y%m%d"),
    );
    info!(symbol = symbol, url = url, "Syncing daily candles");

    let body = http
        .get(&url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| {
            warn!(symbol = symbol, error = ?e, "Historical source unavailable");
            ApiError::Upstream(format!("historical source failed for {symbol}"))
        })?
        .text()
        .await
        .map_err(|e| ApiError::Upstream(format!("historical source body unreadable: {e}")))?;

    let items = parse_candles_csv(instrument.id, &body);
    let fetched = items.len();

    execute_in_chunks(
        pool.clone(),
        upsert_candles_query,
        &items,
        MAX_DIESEL_PARAM_SIZE / CandleDaily::field_count(),
    )
    .await?;

    let returned_items = if req.include_items || req.return_all {
        let mut conn = pool.get().await.map_err(ApiError::pool)?;
        let range_from = if req.return_all { from } else { req.date_from };
        Some(
            CandleDaily::fetch_range(&mut conn, instrument.id, range_from, req.date_to)
                .await
                .context("Failed to read back synced candles")?,
        )
    } else {
        None
    };

    Ok(SyncDailyOutcome {
        symbol: instrument.symbol,
        fetched,
        upserted: fetched,
        items: returned_items,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::q2_from;

    #[test]
    fn test_parse_candles_csv() {
        let id = Uuid::new_v4();
        let body = "Date,Open,High,Low,Close,Volume\n\
                    2026-01-02,10.5,11.0,10.1,10.9,120000\n\
                    2026-01-03,10.9,11.2,10.8,11.1,98000\n\
                    garbage line\n\
                    2026-01-04,bad,11.2,10.8,11.1,98000\n";
        let candles = parse_candles_csv(id, body);
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].date_quote, NaiveDate::from_ymd_opt(2026, 1, 2).unwrap());
        assert_eq!(candles[0].open, q2_from(1050, 2));
        assert_eq!(candles[0].close, q2_from(1090, 2));
        assert_eq!(candles[1].volume, Some(98000));
    }

    #[test]
    fn test_parse_candles_csv_empty() {
        assert!(parse_candles_csv(Uuid::new_v4(), "Date,Open,High,Low,Close,Volume\n").is_empty());
    }
}
