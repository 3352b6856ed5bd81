//! Scheduled ingestion. Cron expressions fire the two pipelines; each run is
//! bounded by a hard timeout, warned at a soft limit, and retried with capped
//! exponential backoff plus jitter so a flaky vendor does not synchronize
//! worker retries.

use crate::{metrics::TASK_RETRY_COUNT, pipeline, pipeline::IngestContext};
use anyhow::{Context, Result};
use rand::Rng;
use std::{future::Future, sync::Arc, time::Duration};
use tokio::time::timeout;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

pub const HARD_TIME_LIMIT: Duration = Duration::from_secs(60 * 10);
pub const SOFT_TIME_LIMIT: Duration = Duration::from_secs(60 * 9);
const MAX_RETRIES: u32 = 3;
const BACKOFF_CAP_SECS: u64 = 600;

/// Markets served by the browser-rendered provider.
const MAIN_MARKET_KEYS: [&str; 2] = ["pl-wse", "pl-newconnect"];
/// MICs served by the listing-table provider.
const ALT_MICS: [&str; 2] = ["XWAR", "XNCO"];

/// Runs `task` under the time limits, retrying on any error. Backoff after
/// attempt `n` is `min(2^n, cap)` seconds plus up to one second of jitter.
pub async fn run_with_retry<F, Fut>(name: &str, task: F)
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<u64>>,
{
    for attempt in 0..=MAX_RETRIES {
        let soft_warning = tokio::spawn({
            let name = name.to_string();
            async move {
                tokio::time::sleep(SOFT_TIME_LIMIT).await;
                warn!(task = name, "Task exceeded the soft time limit");
            }
        });

        let outcome = timeout(HARD_TIME_LIMIT, task()).await;
        soft_warning.abort();

        match outcome {
            Ok(Ok(processed)) => {
                info!(task = name, attempt = attempt, processed = processed, "Task finished");
                return;
            },
            Ok(Err(e)) => {
                error!(task = name, attempt = attempt, error = ?e, "Task failed");
            },
            Err(_) => {
                error!(task = name, attempt = attempt, "Task hit the hard time limit");
            },
        }

        if attempt == MAX_RETRIES {
            error!(task = name, "Task exhausted retries");
            return;
        }
        TASK_RETRY_COUNT.with_label_values(&[name]).inc();
        let backoff = (1u64 << attempt).min(BACKOFF_CAP_SECS);
        let jitter_ms = rand::thread_rng().gen_range(0..1000);
        tokio::time::sleep(Duration::from_secs(backoff) + Duration::from_millis(jitter_ms)).await;
    }
}

async fn ingest_main(ctx: Arc<IngestContext>) -> Result<u64> {
    let mut total = 0;
    for market_key in MAIN_MARKET_KEYS {
        total += pipeline::ingest_market(&ctx, market_key).await?;
    }
    Ok(total)
}

async fn ingest_alt(ctx: Arc<IngestContext>) -> Result<u64> {
    let mut total = 0;
    for mic in ALT_MICS {
        total += pipeline::ingest_listing_quotes(&ctx, mic).await?;
    }
    Ok(total)
}

/// Registers both ingestion schedules and starts the scheduler.
pub async fn start_scheduler(
    ctx: Arc<IngestContext>,
    main_schedule: &str,
    alt_schedule: &str,
) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new()
        .await
        .context("Failed to create the job scheduler")?;

    let main_ctx = ctx.clone();
    let main_job = Job::new_async(main_schedule, move |_uuid, _lock| {
        let ctx = main_ctx.clone();
        Box::pin(async move {
            run_with_retry("ingest_quarter_main", || ingest_main(ctx.clone())).await;
        })
    })
    .context("Invalid main ingestion schedule")?;
    scheduler.add(main_job).await?;

    let alt_ctx = ctx.clone();
    let alt_job = Job::new_async(alt_schedule, move |_uuid, _lock| {
        let ctx = alt_ctx.clone();
        Box::pin(async move {
            run_with_retry("ingest_quarter_alt", || ingest_alt(ctx.clone())).await;
        })
    })
    .context("Invalid alt ingestion schedule")?;
    scheduler.add(alt_job).await?;

    scheduler
        .start()
        .await
        .context("Failed to start the job scheduler")?;
    info!(
        main_schedule = main_schedule,
        alt_schedule = alt_schedule,
        "Ingestion scheduler started"
    );
    Ok(scheduler)
}
