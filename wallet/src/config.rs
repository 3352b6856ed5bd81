use crate::{
    api::{self, AppState},
    clients::StockClient,
    services::secure::SecretBox,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use db_common::{new_db_pool, run_pending_migrations};
use diesel_migrations::{embed_migrations, EmbeddedMigrations};
use serde::{Deserialize, Serialize};
use server_framework::RunnableConfig;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WalletConfig {
    pub database_url: String,
    #[serde(default)]
    pub db_pool_size: Option<u32>,
    pub stock_api_url: String,
    /// Base64-encoded 32-byte key protecting account numbers at rest.
    pub secret_key: String,
    #[serde(default = "default_listen_address")]
    pub api_listen_address: String,
}

fn default_listen_address() -> String {
    "0.0.0.0:8082".to_string()
}

#[async_trait]
impl RunnableConfig for WalletConfig {
    async fn run(&self) -> Result<()> {
        let pool = new_db_pool(&self.database_url, self.db_pool_size).await?;
        run_pending_migrations(&self.database_url, MIGRATIONS).await?;

        let state = AppState {
            pool,
            stock: StockClient::new(&self.stock_api_url)?,
            secrets: SecretBox::new(&self.secret_key).context("Invalid secret_key")?,
        };
        api::serve(state, &self.api_listen_address).await
    }

    fn get_server_name(&self) -> String {
        "wallet".to_string()
    }
}
