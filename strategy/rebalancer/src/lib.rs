//! Delta-neutral concentrated-liquidity rebalancer.
//!
//! Keeps one Uniswap V3 position centred on the pool price and offsets its token0
//! exposure with a short perpetual position.

pub mod app;
pub mod config;
pub mod controller;
pub mod error;
pub mod fee_growth;
pub mod hedge;
pub mod lifecycle;
pub mod onchain;
pub mod swap_sizing;
pub mod tick_math;
pub mod types;
pub mod venues;

#[cfg(test)]
mod testing;

pub use config::{HedgeConfig, PoolConfig, RebalancerConfig, SwapConfig};
pub use controller::{plan_rebalance, RebalancingController};
pub use error::{RebalanceError, Result};
pub use lifecycle::{close_all, close_position, CloseOutcome};
pub use onchain::{BinanceHedgeVenue, UniswapV3Venue};
pub use types::{
    ControllerState, HedgePosition, HedgeSide, Pool, RebalanceDecision, SwapDirection,
    SwapPlan, Token, WalletHoldings,
};
pub use venues::{HedgeVenue, LiquidityVenue, SwapVenue, TokenWallet};
