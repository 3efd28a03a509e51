//! Configuration types for Uniswap V3 clients.

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

/// Contract addresses the Uniswap V3 clients talk to.
///
/// Address resolution happens outside this crate; every address here is taken as given.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniswapV3Config {
    /// The NonfungiblePositionManager contract (position registry)
    pub position_manager: Address,
    /// The SwapRouter02 contract used for exact-input swaps
    pub swap_router: Address,
    /// The pool the managed position lives in
    pub pool: Address,
}
