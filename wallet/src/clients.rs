//! Outbound client for the market-data service. Quote lookups fail soft: any
//! transport error, non-200 or undecodable body yields an empty map so the
//! aggregator can degrade instead of erroring.

use anyhow::{Context, Result};
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, time::Duration};
use tracing::{error, warn};

#[derive(Clone, Debug, Deserialize)]
pub struct QuoteBySymbol {
    pub symbol: String,
    pub price: BigDecimal,
    pub currency: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct SyncDailyRequest {
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub overlap_days: i64,
    pub include_items: bool,
    pub return_all: bool,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SyncDailyOutcome {
    pub symbol: String,
    pub fetched: usize,
    pub upserted: usize,
    #[serde(default)]
    pub items: Option<serde_json::Value>,
}

#[derive(Clone)]
pub struct StockClient {
    http: reqwest::Client,
    base_url: String,
}

impl StockClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(3))
            .timeout(Duration::from_secs(5))
            .pool_max_idle_per_host(10)
            .user_agent("wallet/1.0")
            .build()
            .context("Failed to build the stock HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// symbol -> (price, currency) for the requested symbols. Symbols the
    /// market-data service does not know are simply absent.
    pub async fn latest_for_symbols(&self, symbols: &[String]) -> HashMap<String, QuoteBySymbol> {
        if symbols.is_empty() {
            return HashMap::new();
        }
        let url = format!("{}/stock/quotes/latest/symbols", self.base_url);
        let response = match self
            .http
            .post(&url)
            .json(&serde_json::json!({ "symbols": symbols }))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(url = url, error = %e, "Stock service unreachable");
                return HashMap::new();
            },
        };
        if !response.status().is_success() {
            error!(url = url, status = %response.status(), "Stock service returned an error");
            return HashMap::new();
        }
        match response.json::<Vec<QuoteBySymbol>>().await {
            Ok(quotes) => quotes.into_iter().map(|q| (q.symbol.clone(), q)).collect(),
            Err(e) => {
                error!(url = url, error = %e, "Failed to parse stock service response");
                HashMap::new()
            },
        }
    }

    /// Triggers a server-side daily-candle sync; hard errors surface to the
    /// caller since this is an explicit user action.
    pub async fn sync_daily_candles(
        &self,
        symbol: &str,
        req: &SyncDailyRequest,
    ) -> Result<SyncDailyOutcome> {
        let url = format!(
            "{}/stock/instruments/{}/candles/daily/sync",
            self.base_url, symbol
        );
        let response = self
            .http
            .post(&url)
            .json(req)
            .send()
            .await
            .context("Stock service unreachable")?
            .error_for_status()
            .context("Candle sync failed")?;
        response
            .json::<SyncDailyOutcome>()
            .await
            .context("Failed to parse candle sync response")
    }
}
