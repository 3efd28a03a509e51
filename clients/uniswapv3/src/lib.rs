mod config;
mod contracts;
mod erc20;
mod error;
mod pool;
mod position_manager;
mod swap_router;
mod tx;

pub use config::UniswapV3Config;
pub use erc20::{allowance_high_water_mark, Erc20Token};
pub use error::{Result, UniswapV3Error};
pub use pool::{FeeGrowthGlobal, UniswapV3Pool};
pub use position_manager::{
    MintRequest, MintedPosition, PositionAmounts, PositionData, UniswapV3PositionManager,
};
pub use swap_router::{ExactInputSingle, UniswapV3SwapRouter};
