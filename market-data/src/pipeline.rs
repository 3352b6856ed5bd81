//! Per-market ingestion. One invocation holds the distributed lock for its
//! market key, walks the source rows, upserts instruments and latest quotes
//! row-by-row (each in its own transaction) and write-through caches the
//! result. The cache is advisory; only database failures count as row
//! failures.

use crate::{
    cache::{CachedQuote, IngestLock, QuoteCache, LOCK_TTL_SECS, QUOTE_TTL_SECS},
    db::{
        enums::InstrumentType,
        models::{
            instrument::{Instrument, InstrumentProposal},
            market::Market,
            quote_latest::{QuoteLatest, QuoteLatestInput},
        },
    },
    metrics::{FAILED_ROWS_COUNT, INGESTED_ROWS_COUNT, LOCK_CONTENTION_COUNT},
    normalize::{parse_decimal_locale, parse_int_locale, parse_last_trade_at},
    providers::{ListingRecord, MarketSource, Providers},
};
use anyhow::{bail, Context, Result};
use db_common::ArcDbPool;
use diesel_async::{scoped_futures::ScopedFutureExt, AsyncConnection};
use redis::aio::ConnectionManager;
use std::collections::HashMap;
use tracing::{debug, error, info, warn};

/// Markets whose vendor publishes a symbol map with ISO-6166 codes.
const SYMBOL_MAP_MICS: [&str; 2] = ["XWAR", "XNCO"];

/// Row count guard: a cycle that processes nothing while many rows fail is a
/// source outage, not an empty market.
const MAX_SILENT_FAILURES: u64 = 10;

pub struct IngestContext {
    pub pool: ArcDbPool,
    pub cache: QuoteCache,
    pub redis: ConnectionManager,
    pub providers: Providers,
    pub sources: Vec<MarketSource>,
}

/// Maps a canonical listing row into registry/quote inputs. Rows without a
/// usable symbol or price are skipped by the caller.
fn row_to_inputs(
    record: &ListingRecord,
    provider_tag: &str,
) -> Option<(InstrumentProposal, QuoteLatestInput)> {
    let mut proposal = InstrumentProposal::from_source(
        &record.shortcut,
        record.name.clone(),
        InstrumentType::Equity,
    )?;
    if let Some(isin) = record.isin.as_deref() {
        proposal.enrich_isin(isin);
    }

    let last_price = parse_decimal_locale(record.last.as_deref()?)?;
    let change_pct = parse_decimal_locale(record.change_pct.as_deref().unwrap_or_default())?;
    let volume = record.volume.as_deref().and_then(parse_int_locale);
    let last_trade_at = parse_last_trade_at(record.last_trade_time.as_deref().unwrap_or_default());

    Some((
        proposal,
        QuoteLatestInput {
            last_price,
            change_pct,
            volume,
            last_trade_at,
            provider: Some(provider_tag.to_string()),
        },
    ))
}

/// Ingest the latest quotes for one market key. Returns the number of rows
/// processed; zero when another worker already holds the lock.
pub async fn ingest_market(ctx: &IngestContext, market_key: &str) -> Result<u64> {
    let source = ctx.providers.resolve(&ctx.sources, market_key)?;
    info!(
        market_key = market_key,
        mic = source.mic,
        "Starting market ingestion"
    );

    let market = {
        let mut conn = ctx.pool.get().await.context("Failed to get connection")?;
        match Market::find_by_mic(&mut conn, &source.mic).await? {
            Some(market) => market,
            None => bail!(
                "Market with MIC {} not found; seed markets first",
                source.mic
            ),
        }
    };

    let lock = match IngestLock::acquire(ctx.redis.clone(), market_key, LOCK_TTL_SECS).await? {
        Some(lock) => lock,
        None => {
            LOCK_CONTENTION_COUNT
                .with_label_values(&[market_key])
                .inc();
            return Ok(0);
        },
    };

    let result = ingest_market_locked(ctx, source, &market).await;
    lock.release().await;

    let processed = result?;
    info!(
        market_key = market_key,
        mic = source.mic,
        processed = processed,
        "Market ingestion finished"
    );
    Ok(processed)
}

async fn ingest_market_locked(
    ctx: &IngestContext,
    source: &MarketSource,
    market: &Market,
) -> Result<u64> {
    // ISO-6166 enrichment map, only published for the two vendor venues.
    let symbol_map: HashMap<String, ListingRecord> =
        if SYMBOL_MAP_MICS.contains(&source.mic.as_str()) {
            match ctx.providers.listing().symbol_map(Some(&source.mic)).await {
                Ok(map) => map,
                Err(e) => {
                    warn!(mic = source.mic, error = ?e, "Symbol map unavailable, continuing without ISIN enrichment");
                    HashMap::new()
                },
            }
        } else {
            HashMap::new()
        };

    let rows = ctx.providers.rows(source).await?;

    let mut processed: u64 = 0;
    let mut failed: u64 = 0;
    for record in &rows {
        let Some((mut proposal, quote)) = row_to_inputs(record, &source.market_key) else {
            debug!(symbol = record.shortcut, "Skipping unparseable listing row");
            continue;
        };
        if let Some(map_isin) = symbol_map.get(&proposal.symbol).and_then(|r| r.isin.as_deref()) {
            proposal.enrich_isin(map_isin);
        }

        match upsert_row(ctx, market, &proposal, &quote).await {
            Ok(()) => {
                processed += 1;
                INGESTED_ROWS_COUNT.with_label_values(&[&market.mic]).inc();
            },
            Err(e) => {
                failed += 1;
                FAILED_ROWS_COUNT.with_label_values(&[&market.mic]).inc();
                error!(symbol = proposal.symbol, error = ?e, "Listing row failed");
            },
        }
    }

    if processed == 0 && failed > MAX_SILENT_FAILURES {
        bail!("The update of the quotations failed");
    }
    Ok(processed)
}

/// One source row: resolve the instrument and upsert its quote inside a
/// transaction, then write the cache best-effort.
async fn upsert_row(
    ctx: &IngestContext,
    market: &Market,
    proposal: &InstrumentProposal,
    quote: &QuoteLatestInput,
) -> Result<()> {
    let mut conn = ctx.pool.get().await.context("Failed to get connection")?;
    let (instrument, latest) = conn
        .transaction::<(Instrument, QuoteLatest), diesel::result::Error, _>(|conn| {
            async move {
                let instrument =
                    Instrument::resolve_or_create(conn, market.id, market.currency, proposal)
                        .await?;
                let latest = QuoteLatest::upsert(conn, instrument.id, quote).await?;
                Ok((instrument, latest))
            }
            .scope_boxed()
        })
        .await?;

    ctx.cache
        .hset(
            &format!("latest_quote:{}", market.mic),
            &instrument.symbol,
            &CachedQuote {
                name: Some(instrument.shortname.clone()),
                last_price: latest.last_price.to_string(),
                change_pct: latest.change_pct.to_string(),
                volume: latest.volume,
                last_trade_at: latest.last_trade_at.to_rfc3339(),
            },
            QUOTE_TTL_SECS,
        )
        .await;
    Ok(())
}

/// Alternate table-only path: feed quotes straight from the vendor symbol
/// map. Instruments are not created here; unknown symbols count as failures.
pub async fn ingest_listing_quotes(ctx: &IngestContext, mic: &str) -> Result<u64> {
    if !SYMBOL_MAP_MICS.contains(&mic) {
        bail!("Listing-quote ingestion only supports XWAR and XNCO");
    }

    let market = {
        let mut conn = ctx.pool.get().await.context("Failed to get connection")?;
        match Market::find_by_mic(&mut conn, mic).await? {
            Some(market) => market,
            None => bail!("Market with MIC {mic} not found; seed markets first"),
        }
    };

    let lock = match IngestLock::acquire(ctx.redis.clone(), mic, LOCK_TTL_SECS).await? {
        Some(lock) => lock,
        None => {
            LOCK_CONTENTION_COUNT.with_label_values(&[mic]).inc();
            return Ok(0);
        },
    };

    let result = ingest_listing_quotes_locked(ctx, &market).await;
    lock.release().await;
    result
}

async fn ingest_listing_quotes_locked(ctx: &IngestContext, market: &Market) -> Result<u64> {
    let symbol_map = ctx.providers.listing().symbol_map(Some(&market.mic)).await?;
    info!(
        mic = market.mic,
        entries = symbol_map.len(),
        "Fetched symbol map"
    );

    let mut processed: u64 = 0;
    let mut failed: u64 = 0;
    for (symbol, record) in &symbol_map {
        let Some((_, quote)) = row_to_inputs(record, "listing-table") else {
            debug!(symbol = symbol, "Skipping symbol-map row without a price");
            continue;
        };

        let outcome = async {
            let mut conn = ctx.pool.get().await.context("Failed to get connection")?;
            let existing = conn
                .transaction::<Option<(Instrument, QuoteLatest)>, diesel::result::Error, _>(
                    |conn| {
                        async move {
                            let Some(instrument) =
                                Instrument::find_in_market(conn, market.id, symbol).await?
                            else {
                                return Ok(None);
                            };
                            let latest = QuoteLatest::upsert(conn, instrument.id, &quote).await?;
                            Ok(Some((instrument, latest)))
                        }
                        .scope_boxed()
                    },
                )
                .await?;
            anyhow::Ok(existing)
        }
        .await;

        match outcome {
            Ok(Some((instrument, latest))) => {
                ctx.cache
                    .hset(
                        &format!("latest_quote:{}", market.mic),
                        &instrument.symbol,
                        &CachedQuote {
                            name: Some(instrument.shortname.clone()),
                            last_price: latest.last_price.to_string(),
                            change_pct: latest.change_pct.to_string(),
                            volume: latest.volume,
                            last_trade_at: latest.last_trade_at.to_rfc3339(),
                        },
                        QUOTE_TTL_SECS,
                    )
                    .await;
                processed += 1;
                INGESTED_ROWS_COUNT.with_label_values(&[&market.mic]).inc();
            },
            Ok(None) => {
                warn!(
                    symbol = symbol,
                    mic = market.mic,
                    "Instrument not found, skipping quote"
                );
                failed += 1;
                FAILED_ROWS_COUNT.with_label_values(&[&market.mic]).inc();
            },
            Err(e) => {
                failed += 1;
                FAILED_ROWS_COUNT.with_label_values(&[&market.mic]).inc();
                error!(symbol = symbol, error = ?e, "Symbol-map row failed");
            },
        }
    }

    if processed == 0 && failed > MAX_SILENT_FAILURES {
        bail!("The update of the quotations failed (symbol map)");
    }
    Ok(processed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::q2_from;

    fn record() -> ListingRecord {
        ListingRecord {
            name: Some("ORLEN".to_string()),
            shortcut: "pkn".to_string(),
            isin: Some("PLPKN0000018".to_string()),
            last: Some("64,52".to_string()),
            change_pct: Some("-1,15".to_string()),
            volume: Some("1 204 511".to_string()),
            last_trade_time: Some("16:45:12".to_string()),
        }
    }

    #[test]
    fn test_row_to_inputs_maps_and_normalizes() {
        let (proposal, quote) = row_to_inputs(&record(), "pl-wse").unwrap();
        assert_eq!(proposal.symbol, "PKN");
        assert_eq!(proposal.isin.as_deref(), Some("PLPKN0000018"));
        assert_eq!(quote.last_price, q2_from(6452, 2));
        assert_eq!(quote.change_pct, q2_from(-115, 2));
        assert_eq!(quote.volume, Some(1_204_511));
        assert_eq!(quote.provider.as_deref(), Some("pl-wse"));
    }

    #[test]
    fn test_row_to_inputs_rejects_missing_price() {
        let mut rec = record();
        rec.last = None;
        assert!(row_to_inputs(&rec, "pl-wse").is_none());
        let mut rec = record();
        rec.last = Some("b/d".to_string());
        assert!(row_to_inputs(&rec, "pl-wse").is_none());
    }

    #[test]
    fn test_row_to_inputs_ignores_bad_isin() {
        let mut rec = record();
        rec.isin = Some("nan".to_string());
        let (proposal, _) = row_to_inputs(&rec, "pl-wse").unwrap();
        assert_eq!(proposal.isin, None);
    }
}
