//! Read-only access to a Uniswap V3 pool's price and fee accumulators.

use alloy::primitives::{Address, U256};
use alloy::providers::DynProvider;

use crate::contracts::IUniswapV3Pool;
use crate::error::Result;

/// Global fee growth accumulators of a pool, per unit of liquidity, Q128.128
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeGrowthGlobal {
    pub fee_growth_global0_x128: U256,
    pub fee_growth_global1_x128: U256,
}

pub struct UniswapV3Pool {
    pool: IUniswapV3Pool::IUniswapV3PoolInstance<DynProvider>,
}

impl UniswapV3Pool {
    pub fn new(address: Address, provider: DynProvider) -> Self {
        Self {
            pool: IUniswapV3Pool::new(address, provider),
        }
    }

    pub fn address(&self) -> Address {
        *self.pool.address()
    }

    /// Current tick from `slot0`.
    pub async fn current_tick(&self) -> Result<i32> {
        let slot0 = self.pool.slot0().call().await?;
        Ok(slot0.tick.as_i32())
    }

    pub async fn fee_growth_global(&self) -> Result<FeeGrowthGlobal> {
        let fee_growth_global0_x128 = self.pool.feeGrowthGlobal0X128().call().await?;
        let fee_growth_global1_x128 = self.pool.feeGrowthGlobal1X128().call().await?;
        Ok(FeeGrowthGlobal {
            fee_growth_global0_x128,
            fee_growth_global1_x128,
        })
    }
}
