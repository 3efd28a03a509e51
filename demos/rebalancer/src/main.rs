//! Runs the rebalancing controller until the process is stopped.
//!
//! Usage: rebalancer <config.toml>
//!
//! PRIVATE_KEY, BINANCE_API_KEY and BINANCE_API_SECRET are read from the environment.

use std::path::PathBuf;

use rebalancer::app::{init_logging, signing_provider, AppConfig, Secrets};
use rebalancer::{BinanceHedgeVenue, RebalancingController, UniswapV3Venue};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!(
            "Usage: {} <config.toml>",
            args.first().map(|s| s.as_str()).unwrap_or("rebalancer")
        );
        std::process::exit(1);
    }
    init_logging();

    let config = AppConfig::from_file(&PathBuf::from(args[1].trim()))?;
    let secrets = Secrets::from_env()?;
    let (provider, owner) = signing_provider(config.rpc_url()?, &secrets.private_key)?;
    let pool = config.strategy.pool.to_pool()?;
    info!(%owner, pool = %pool.pair_name(), fee = pool.fee(), "configuration loaded");

    let chain = UniswapV3Venue::new(&config.uniswap, &pool, provider, owner);
    chain.verify_tokens(&pool).await?;
    let hedge = BinanceHedgeVenue::new(
        config.binance_client(&secrets)?,
        config.strategy.hedge.size_step,
    );
    let mut controller = RebalancingController::new(config.strategy, chain, hedge)?;
    controller.run().await;
    Ok(())
}
