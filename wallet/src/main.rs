use anyhow::Result;
use clap::Parser;
use server_framework::ServerArgs;
use wallet::config::WalletConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let args = ServerArgs::parse();
    args.run::<WalletConfig>().await
}
