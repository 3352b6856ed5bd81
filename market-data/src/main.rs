use anyhow::Result;
use clap::Parser;
use market_data::config::MarketDataConfig;
use server_framework::ServerArgs;

#[tokio::main]
async fn main() -> Result<()> {
    let args = ServerArgs::parse();
    args.run::<MarketDataConfig>().await
}
