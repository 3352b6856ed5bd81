use super::{listing::parse_listing_table, ListingRecord};
use anyhow::{Context, Result};
use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use std::time::Duration;
use tracing::{info, warn};

const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Renders the listing page in a headless browser and extracts the quote
/// table. The vendor page builds its table client-side, so a plain HTTP fetch
/// returns an empty shell; once rendered, the table parses with the same
/// canonicalization as the static listing.
pub async fn fetch_rows(url: &str) -> Result<Vec<ListingRecord>> {
    info!(url = url, "Launching headless browser for listing page");
    let config = BrowserConfig::builder()
        .args(vec![
            "--no-sandbox",
            "--disable-dev-shm-usage",
            "--disable-gpu",
            "--disable-setuid-sandbox",
            "--lang=pl-PL",
        ])
        .request_timeout(NAVIGATION_TIMEOUT)
        .build()
        .map_err(anyhow::Error::msg)?;

    let (mut browser, mut handler) = Browser::launch(config)
        .await
        .context("Failed to launch headless browser")?;
    let handler_task = tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if event.is_err() {
                break;
            }
        }
    });

    let result = scrape_table(&browser, url).await;

    // Cleanup runs on every exit path; a failed scrape must not leak the
    // browser process.
    if let Err(e) = browser.close().await {
        warn!(error = ?e, "Failed to close headless browser");
    }
    if let Err(e) = browser.wait().await {
        warn!(error = ?e, "Headless browser did not exit cleanly");
    }
    handler_task.abort();

    result
}

async fn scrape_table(browser: &Browser, url: &str) -> Result<Vec<ListingRecord>> {
    let page = browser
        .new_page(url)
        .await
        .context("Failed to open listing page")?;
    page.wait_for_navigation()
        .await
        .context("Listing page navigation failed")?;

    let table_html: String = page
        .evaluate("document.querySelector('table') ? document.querySelector('table').outerHTML : ''")
        .await
        .context("Failed to evaluate table extraction script")?
        .into_value()
        .context("Table extraction returned a non-string value")?;

    let result = if table_html.is_empty() {
        Err(anyhow::anyhow!("Listing page rendered without a table"))
    } else {
        parse_listing_table(&table_html)
    };

    if let Err(e) = page.close().await {
        warn!(error = ?e, "Failed to close listing page");
    }
    result
}
