//! Quote sources. Two variants share one capability set: resolve a source by
//! market key and yield canonical listing rows. The vendor serves the same
//! logical table both as plain HTML and as a browser-rendered page, so both
//! variants normalize into [`ListingRecord`].

pub mod browser;
pub mod listing;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub use listing::ListingClient;

/// One row of a vendor listing after header canonicalization. Values are kept
/// as raw strings; the pipeline owns locale parsing.
#[derive(Clone, Debug, Default)]
pub struct ListingRecord {
    pub name: Option<String>,
    pub shortcut: String,
    pub isin: Option<String>,
    pub last: Option<String>,
    pub change_pct: Option<String>,
    pub volume: Option<String>,
    pub last_trade_time: Option<String>,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Plain HTML table fetched over HTTP.
    ListingTable,
    /// Page that only materializes its table after client-side rendering.
    BrowserPage,
}

/// Static per-market source configuration.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MarketSource {
    pub market_key: String,
    pub mic: String,
    pub url: String,
    pub kind: SourceKind,
}

#[derive(Clone)]
pub struct Providers {
    listing: ListingClient,
}

impl Providers {
    pub fn new(listing: ListingClient) -> Self {
        Self { listing }
    }

    pub fn listing(&self) -> &ListingClient {
        &self.listing
    }

    pub fn resolve<'a>(
        &self,
        sources: &'a [MarketSource],
        market_key: &str,
    ) -> Result<&'a MarketSource> {
        sources
            .iter()
            .find(|s| s.market_key == market_key)
            .with_context(|| format!("No source configured for market key {market_key}"))
    }

    /// Fetches all rows for the source with the variant it is configured for.
    pub async fn rows(&self, source: &MarketSource) -> Result<Vec<ListingRecord>> {
        match source.kind {
            SourceKind::ListingTable => self.listing.fetch_records(&source.url).await,
            SourceKind::BrowserPage => browser::fetch_rows(&source.url).await,
        }
    }
}
