//! The seams between the controller and the outside world.
//!
//! The controller only talks to these traits; `onchain` implements them for the real
//! Uniswap V3 and Binance clients.

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use clients_binance::{MarginMode, OrderSide};
use clients_uniswapv3::{ExactInputSingle, MintRequest, PositionAmounts, PositionData};

use crate::error::Result;
use crate::types::{HedgePosition, WalletHoldings};

/// Position registry plus the pool the managed position lives in
#[async_trait]
pub trait LiquidityVenue: Send + Sync {
    /// Registry address; the spender that needs token approval before a mint.
    fn registry_address(&self) -> Address;

    async fn current_tick(&self) -> Result<i32>;

    /// Fresh read of the registry record.
    async fn position(&self, position_id: U256) -> Result<PositionData>;

    /// Whether the pool tick is within the position's inclusive range, read in one step.
    async fn check_active(&self, position_id: U256) -> Result<(bool, PositionData)> {
        let position = self.position(position_id).await?;
        let tick = self.current_tick().await?;
        let active = tick >= position.tick_lower && tick <= position.tick_upper;
        Ok((active, position))
    }

    /// Token amounts the position would release if fully closed now.
    async fn position_amounts(&self, position_id: U256) -> Result<PositionAmounts>;

    /// Every position owned by the controlling account.
    async fn position_ids(&self) -> Result<Vec<U256>>;

    /// Mints and returns the id emitted by the confirmed mint itself.
    async fn mint(&self, request: &MintRequest) -> Result<U256>;

    async fn decrease_liquidity(
        &self,
        position_id: U256,
        liquidity: u128,
        amount0_min: U256,
        amount1_min: U256,
        deadline: u64,
    ) -> Result<()>;

    async fn collect(
        &self,
        position_id: U256,
        recipient: Address,
        amount0_max: u128,
        amount1_max: u128,
    ) -> Result<()>;

    async fn burn(&self, position_id: U256) -> Result<()>;
}

/// AMM router executing single-hop exact-input swaps
#[async_trait]
pub trait SwapVenue: Send + Sync {
    fn router_address(&self) -> Address;

    async fn exact_input_single(&self, swap: &ExactInputSingle) -> Result<()>;
}

/// The signing account's token balances and approvals
#[async_trait]
pub trait TokenWallet: Send + Sync {
    fn wallet_address(&self) -> Address;

    async fn balances(&self) -> Result<WalletHoldings>;

    /// Makes sure `spender` may move `token`; returns whether an approval was sent.
    async fn ensure_allowance(&self, token: Address, spender: Address) -> Result<bool>;
}

/// Derivatives venue holding the hedge
#[async_trait]
pub trait HedgeVenue: Send + Sync {
    async fn set_leverage(
        &self,
        instrument: &str,
        leverage: u32,
        margin_mode: MarginMode,
    ) -> Result<()>;

    async fn get_position(&self, instrument: &str) -> Result<HedgePosition>;

    async fn submit_market_order(
        &self,
        instrument: &str,
        side: OrderSide,
        size: f64,
        margin_mode: MarginMode,
    ) -> Result<()>;
}
