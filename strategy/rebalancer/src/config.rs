//! Configuration types for the rebalancing controller.
//!
//! Every threshold the controller uses lives here and is injected at construction, so
//! tests can run the controller with deterministic values.

use alloy::primitives::U256;
use clients_binance::MarginMode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{RebalanceError, Result};
use crate::types::{Pool, Token};

/// Pool identity. Tokens may be listed in any order; [`PoolConfig::to_pool`] canonicalizes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    pub token_a: Token,
    pub token_b: Token,
    /// Fee tier in hundredths of a bip (500 = 0.05%)
    pub fee: u32,
    /// Overrides the standard spacing of the fee tier
    #[serde(default)]
    pub tick_spacing: Option<i32>,
}

impl PoolConfig {
    pub fn to_pool(&self) -> Result<Pool> {
        Pool::new(
            self.token_a.clone(),
            self.token_b.clone(),
            self.fee,
            self.tick_spacing,
        )
    }
}

/// Swap sizing and execution parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SwapConfig {
    /// Target value of token0 per 1.0 of token1 value. Slightly below 1 leaves no
    /// unhedged token0 dust behind.
    pub token0_value_ratio: f64,
    /// Smallest token0 input worth swapping, native units
    pub min_amount_in0: u128,
    /// Smallest token1 input worth swapping, native units
    pub min_amount_in1: u128,
    /// Slippage tolerance for `amountOutMinimum`; `None` submits with no output bound
    pub max_slippage_bps: Option<u32>,
    /// Required to run with `max_slippage_bps = None`
    pub allow_unbounded_slippage: bool,
}

impl Default for SwapConfig {
    fn default() -> Self {
        Self {
            token0_value_ratio: 0.98,
            min_amount_in0: 100_000_000_000_000,
            min_amount_in1: 10_000,
            max_slippage_bps: Some(50),
            allow_unbounded_slippage: false,
        }
    }
}

/// Derivatives-venue hedge parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HedgeConfig {
    /// Venue instrument, e.g. "ETHUSDT"
    pub instrument: String,
    /// Fraction of the token0 exposure to hedge
    #[serde(default = "default_hedge_ratio")]
    pub hedge_ratio: f64,
    /// Venue size units per one token0 (contract multiplier)
    #[serde(default = "default_units_per_token0")]
    pub units_per_token0: f64,
    /// Minimum size increment of the instrument
    #[serde(default = "default_size_step")]
    pub size_step: f64,
    #[serde(default = "default_leverage")]
    pub leverage: u32,
    #[serde(default = "default_margin_mode")]
    pub margin_mode: MarginMode,
}

/// Configuration for RebalancingController
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebalancerConfig {
    pub pool: PoolConfig,
    /// Ticks on each side of the current tick covered by a new position
    #[serde(default = "default_range_half_width")]
    pub range_half_width: i32,
    /// Idle delay after every iteration, in seconds
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Deadline offset for position transactions, in seconds
    #[serde(default = "default_tx_deadline_secs")]
    pub tx_deadline_secs: u64,
    /// Burn emptied position NFTs after closing them
    #[serde(default = "default_true")]
    pub burn_closed_positions: bool,
    /// Existing position to manage from the first iteration
    #[serde(default)]
    pub initial_position_id: Option<U256>,
    #[serde(default)]
    pub swap: SwapConfig,
    pub hedge: HedgeConfig,
}

impl RebalancerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Checks the values the controller relies on; called before the controller starts.
    pub fn validate(&self) -> Result<()> {
        let pool = self.pool.to_pool()?;
        let spacing = pool.tick_spacing();
        if self.range_half_width < spacing {
            return Err(RebalanceError::Config(format!(
                "range_half_width {} must be at least the tick spacing {}",
                self.range_half_width, spacing
            )));
        }
        if !(self.swap.token0_value_ratio.is_finite() && self.swap.token0_value_ratio >= 0.0) {
            return Err(RebalanceError::Config(format!(
                "token0_value_ratio must be a non-negative number, got {}",
                self.swap.token0_value_ratio
            )));
        }
        match self.swap.max_slippage_bps {
            Some(0) => {
                return Err(RebalanceError::Config(
                    "max_slippage_bps of 0 can only be met by a swap with no price impact"
                        .to_string(),
                ))
            }
            Some(bps) if bps >= 10_000 => {
                return Err(RebalanceError::Config(format!(
                    "max_slippage_bps must be below 10000, got {bps}"
                )))
            }
            None if !self.swap.allow_unbounded_slippage => {
                return Err(RebalanceError::Config(
                    "max_slippage_bps is unset; set allow_unbounded_slippage to swap without an output bound"
                        .to_string(),
                ))
            }
            _ => {}
        }
        if self.hedge.instrument.is_empty() {
            return Err(RebalanceError::Config("hedge instrument is empty".to_string()));
        }
        if !(self.hedge.hedge_ratio.is_finite() && self.hedge.hedge_ratio >= 0.0) {
            return Err(RebalanceError::Config(format!(
                "hedge_ratio must be a non-negative number, got {}",
                self.hedge.hedge_ratio
            )));
        }
        if !(self.hedge.units_per_token0.is_finite() && self.hedge.units_per_token0 > 0.0) {
            return Err(RebalanceError::Config(format!(
                "units_per_token0 must be positive, got {}",
                self.hedge.units_per_token0
            )));
        }
        if !(self.hedge.size_step.is_finite() && self.hedge.size_step > 0.0) {
            return Err(RebalanceError::Config(format!(
                "size_step must be positive, got {}",
                self.hedge.size_step
            )));
        }
        if self.hedge.leverage == 0 {
            return Err(RebalanceError::Config("leverage must be at least 1".to_string()));
        }
        Ok(())
    }
}

fn default_hedge_ratio() -> f64 {
    1.0
}

fn default_units_per_token0() -> f64 {
    1.0
}

fn default_size_step() -> f64 {
    0.001
}

fn default_leverage() -> u32 {
    3
}

fn default_margin_mode() -> MarginMode {
    MarginMode::Cross
}

fn default_range_half_width() -> i32 {
    250
}

fn default_poll_interval_secs() -> u64 {
    30
}

fn default_tx_deadline_secs() -> u64 {
    1200
}

fn default_true() -> bool {
    true
}
