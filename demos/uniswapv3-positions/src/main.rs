//! Prints every position an owner holds, with what closing it now would release.
//!
//! Usage: uniswapv3-positions <config.toml> <owner_address>

use std::path::PathBuf;
use std::str::FromStr;

use alloy::primitives::Address;
use clients_uniswapv3::{UniswapV3Pool, UniswapV3PositionManager};
use rebalancer::app::{read_only_provider, AppConfig};
use utils::format_units;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        eprintln!(
            "Usage: {} <config.toml> <owner_address>",
            args.first()
                .map(|s| s.as_str())
                .unwrap_or("uniswapv3-positions")
        );
        std::process::exit(1);
    }

    let config = AppConfig::from_file(&PathBuf::from(args[1].trim()))?;
    let owner = Address::from_str(args[2].trim())?;
    let pool = config.strategy.pool.to_pool()?;
    let provider = read_only_provider(config.rpc_url()?);

    let pool_contract = UniswapV3Pool::new(config.uniswap.pool, provider.clone());
    let manager = UniswapV3PositionManager::new(config.uniswap.position_manager, provider, owner);
    let tick = pool_contract.current_tick().await?;
    let ids = manager.position_ids().await?;

    println!(
        "Owner: {} | Pool: {} tick {} price {:.6} | Positions: {}",
        owner,
        pool.pair_name(),
        tick,
        pool.price_at(tick),
        ids.len()
    );
    for token_id in ids {
        let position = manager.position(token_id).await?;
        let in_pool = position.token0 == pool.token0().address
            && position.token1 == pool.token1().address
            && position.fee == pool.fee();
        println!("---");
        println!("  token_id:  {}", token_id);
        println!("  token0:    {}", position.token0);
        println!("  token1:    {}", position.token1);
        println!("  fee:       {}", position.fee);
        println!(
            "  range:     [{}, {}] {}",
            position.tick_lower,
            position.tick_upper,
            if tick >= position.tick_lower && tick <= position.tick_upper {
                "in range"
            } else {
                "out of range"
            }
        );
        println!("  liquidity: {}", position.liquidity);
        let amounts = manager.position_amounts(token_id).await?;
        let (label0, label1, decimals0, decimals1) = if in_pool {
            (
                pool.token0().symbol.as_str(),
                pool.token1().symbol.as_str(),
                pool.token0().decimals,
                pool.token1().decimals,
            )
        } else {
            ("(raw token0)", "(raw token1)", 0, 0)
        };
        println!(
            "  withdrawable: {} {} / {} {}",
            format_units(amounts.withdrawable_amount0, decimals0),
            label0,
            format_units(amounts.withdrawable_amount1, decimals1),
            label1
        );
        println!(
            "  collectable:  {} {} / {} {}",
            format_units(amounts.collectable_amount0, decimals0),
            label0,
            format_units(amounts.collectable_amount1, decimals1),
            label1
        );
    }

    Ok(())
}
