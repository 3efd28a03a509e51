//! Records the pool's global fee growth and reports the annualized fee per unit of
//! liquidity.
//!
//! Usage: fee-recorder <config.toml> [interval_secs] [window_hours]
//!
//! Appends one snapshot every `interval_secs` (default 3600) to the pool's JSONL log and,
//! once the log covers `window_hours` (default 24), logs the annualized estimate.

use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use clients_uniswapv3::UniswapV3Pool;
use rebalancer::app::{init_logging, read_only_provider, AppConfig};
use rebalancer::fee_growth::{
    append_record, estimate_annualized_fee, log_path, read_records, FeeGrowthRecord,
};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!(
            "Usage: {} <config.toml> [interval_secs] [window_hours]",
            args.first().map(|s| s.as_str()).unwrap_or("fee-recorder")
        );
        std::process::exit(1);
    }
    init_logging();

    let config = AppConfig::from_file(&PathBuf::from(args[1].trim()))?;
    let interval = Duration::from_secs(match args.get(2) {
        Some(secs) => secs.trim().parse()?,
        None => 3600,
    });
    let window = Duration::from_secs(
        3600 * match args.get(3) {
            Some(hours) => hours.trim().parse::<u64>()?,
            None => 24,
        },
    );

    let pool = config.strategy.pool.to_pool()?;
    let path = log_path(&config.fee_log_dir, &pool);
    let pool_contract = UniswapV3Pool::new(config.uniswap.pool, read_only_provider(config.rpc_url()?));
    info!(pool = %pool.pair_name(), path = %path.display(), "recording fee growth");

    loop {
        match pool_contract.fee_growth_global().await {
            Ok(growth) => {
                let record = FeeGrowthRecord::new(Utc::now(), &growth);
                if let Err(err) = append_record(&path, &record) {
                    error!(%err, "could not append fee growth record");
                }
            }
            Err(err) => error!(%err, "could not read fee growth"),
        }

        match read_records(&path).map(|records| estimate_annualized_fee(&records, window)) {
            Ok(Ok(estimate)) => info!(
                from = %estimate.from,
                to = %estimate.to,
                fee0_annualized = estimate.fee0,
                fee1_annualized = estimate.fee1,
                "annualized fee per unit of liquidity"
            ),
            Ok(Err(err)) => warn!(%err, "no estimate yet"),
            Err(err) => error!(%err, "could not read fee growth log"),
        }

        tokio::time::sleep(interval).await;
    }
}
