//! Closes and burns every position the signing account owns.
//!
//! Usage: close-all <config.toml>
//!
//! Only PRIVATE_KEY is needed; the hedge is left untouched.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use rebalancer::app::{init_logging, signing_provider, AppConfig, Secrets};
use rebalancer::{close_all, UniswapV3Venue};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!(
            "Usage: {} <config.toml>",
            args.first().map(|s| s.as_str()).unwrap_or("close-all")
        );
        std::process::exit(1);
    }
    init_logging();

    let config = AppConfig::from_file(&PathBuf::from(args[1].trim()))?;
    let private_key = Secrets::private_key_from_env()?;
    let (provider, owner) = signing_provider(config.rpc_url()?, &private_key)?;
    let pool = config.strategy.pool.to_pool()?;
    let venue = UniswapV3Venue::new(&config.uniswap, &pool, provider, owner);

    let deadline = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs()
        + config.strategy.tx_deadline_secs;
    let closed = close_all(&venue, owner, deadline).await?;

    println!("Owner: {} | Closed: {}", owner, closed.len());
    for (position_id, outcome) in &closed {
        println!(
            "  {}: decreased={} collected={} burned={}",
            position_id, outcome.decreased, outcome.collected, outcome.burned
        );
    }
    info!(count = closed.len(), "close-all finished");
    Ok(())
}
