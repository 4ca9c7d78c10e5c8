//! Wallet service binary

use anyhow::Result;
use wallet_core::{Config, WalletService};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting wallet service");

    // Load configuration
    let config = Config::from_env()?;

    // Open service
    let service = WalletService::open(config).await?;

    let stats = service.stats()?;
    tracing::info!(
        wallets = stats.total_wallets,
        transactions = stats.total_transactions,
        referrals = stats.total_referrals,
        "Wallet service opened"
    );

    // The API layer mounts on top of this core in the embedding service;
    // standalone, just run until interrupted
    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down wallet service");
    service.shutdown().await?;

    Ok(())
}
