use crate::{
    api::{self, AppState},
    cache::QuoteCache,
    pipeline::IngestContext,
    providers::{ListingClient, MarketSource, Providers},
    tasks,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use db_common::{new_db_pool, run_pending_migrations};
use diesel_migrations::{embed_migrations, EmbeddedMigrations};
use serde::{Deserialize, Serialize};
use server_framework::RunnableConfig;
use std::{sync::Arc, time::Duration};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MarketDataConfig {
    pub database_url: String,
    #[serde(default)]
    pub db_pool_size: Option<u32>,
    pub redis_url: String,
    #[serde(default = "default_listen_address")]
    pub api_listen_address: String,
    pub main_listing_url: String,
    pub alt_listing_url: String,
    pub historical_base_url: String,
    pub sources: Vec<MarketSource>,
    /// Quarter-hourly during business hours, every day.
    #[serde(default = "default_main_schedule")]
    pub main_schedule: String,
    /// :00, :15, :45 during business hours, weekdays.
    #[serde(default = "default_alt_schedule")]
    pub alt_schedule: String,
}

fn default_listen_address() -> String {
    "0.0.0.0:8081".to_string()
}

fn default_main_schedule() -> String {
    "0 0,15,30,45 9-17 * * *".to_string()
}

fn default_alt_schedule() -> String {
    "0 0,15,45 9-17 * * Mon-Fri".to_string()
}

#[async_trait]
impl RunnableConfig for MarketDataConfig {
    async fn run(&self) -> Result<()> {
        let pool = new_db_pool(&self.database_url, self.db_pool_size).await?;
        run_pending_migrations(&self.database_url, MIGRATIONS).await?;

        let redis_client =
            redis::Client::open(self.redis_url.as_str()).context("Invalid redis url")?;
        let redis_conn = redis_client
            .get_connection_manager()
            .await
            .context("Failed to connect to redis")?;

        let listing = ListingClient::new(self.main_listing_url.clone(), self.alt_listing_url.clone())?;
        let ctx = Arc::new(IngestContext {
            pool: pool.clone(),
            cache: QuoteCache::new(redis_conn.clone()),
            redis: redis_conn,
            providers: Providers::new(listing),
            sources: self.sources.clone(),
        });

        let _scheduler =
            tasks::start_scheduler(ctx, &self.main_schedule, &self.alt_schedule).await?;

        let state = AppState {
            pool,
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .connect_timeout(Duration::from_secs(10))
                .build()
                .context("Failed to build the historical HTTP client")?,
            historical_base_url: self.historical_base_url.clone(),
        };
        api::serve(state, &self.api_listen_address).await
    }

    fn get_server_name(&self) -> String {
        "market_data".to_string()
    }
}
