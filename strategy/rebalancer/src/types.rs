//! Domain types shared by the sizing functions, the venues and the controller.

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::error::{RebalanceError, Result};
use crate::tick_math;

/// An ERC-20 token as the strategy sees it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub address: Address,
    pub symbol: String,
    pub decimals: u8,
}

/// The pool the strategy provides liquidity to.
///
/// Token order is canonical: the lexicographically smaller address is always token0,
/// matching the ordering the AMM itself enforces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pool {
    token0: Token,
    token1: Token,
    fee: u32,
    tick_spacing: i32,
}

impl Pool {
    /// Builds a pool from two tokens in any order. `tick_spacing` falls back to the
    /// standard spacing of the fee tier.
    pub fn new(token_a: Token, token_b: Token, fee: u32, tick_spacing: Option<i32>) -> Result<Self> {
        if token_a.address == token_b.address {
            return Err(RebalanceError::Config(format!(
                "pool tokens must differ, got {} twice",
                token_a.address
            )));
        }
        let tick_spacing = match tick_spacing.or_else(|| tick_math::tick_spacing_for_fee(fee)) {
            Some(spacing) if spacing > 0 => spacing,
            Some(spacing) => {
                return Err(RebalanceError::Config(format!(
                    "tick spacing must be positive, got {spacing}"
                )))
            }
            None => {
                return Err(RebalanceError::Config(format!(
                    "no tick spacing configured and fee tier {fee} is not a standard tier"
                )))
            }
        };
        let (token0, token1) = if token_a.address < token_b.address {
            (token_a, token_b)
        } else {
            (token_b, token_a)
        };
        Ok(Self {
            token0,
            token1,
            fee,
            tick_spacing,
        })
    }

    pub fn token0(&self) -> &Token {
        &self.token0
    }

    pub fn token1(&self) -> &Token {
        &self.token1
    }

    pub fn fee(&self) -> u32 {
        self.fee
    }

    pub fn tick_spacing(&self) -> i32 {
        self.tick_spacing
    }

    /// Price of token0 in token1 human units at `tick`.
    pub fn price_at(&self, tick: i32) -> f64 {
        tick_math::price_from_tick(tick, self.token0.decimals, self.token1.decimals)
    }

    pub fn pair_name(&self) -> String {
        format!("{}/{}", self.token0.symbol, self.token1.symbol)
    }
}

/// Wallet balances in native units, read fresh for every decision
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalletHoldings {
    pub balance0: U256,
    pub balance1: U256,
}

impl WalletHoldings {
    pub fn balance_of(&self, pool: &Pool, token: Address) -> U256 {
        if token == pool.token0().address {
            self.balance0
        } else if token == pool.token1().address {
            self.balance1
        } else {
            U256::ZERO
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HedgeSide {
    Long,
    Short,
    Flat,
}

/// Position on the derivatives venue
#[derive(Debug, Clone, PartialEq)]
pub struct HedgePosition {
    pub instrument: String,
    pub side: HedgeSide,
    /// Absolute size in hedge units
    pub size: f64,
    pub leverage: Option<u32>,
}

impl HedgePosition {
    pub fn flat(instrument: &str) -> Self {
        Self {
            instrument: instrument.to_string(),
            side: HedgeSide::Flat,
            size: 0.0,
            leverage: None,
        }
    }

    /// Builds a position from a signed size: positive is long, negative short.
    pub fn from_signed(instrument: &str, signed_size: f64, leverage: Option<u32>) -> Self {
        let side = if signed_size > 0.0 {
            HedgeSide::Long
        } else if signed_size < 0.0 {
            HedgeSide::Short
        } else {
            HedgeSide::Flat
        };
        Self {
            instrument: instrument.to_string(),
            side,
            size: signed_size.abs(),
            leverage,
        }
    }

    pub fn signed_size(&self) -> f64 {
        match self.side {
            HedgeSide::Long => self.size,
            HedgeSide::Short => -self.size,
            HedgeSide::Flat => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapDirection {
    Token0ToToken1,
    Token1ToToken0,
}

/// A single exact-input swap that moves the wallet toward its target allocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapPlan {
    pub direction: SwapDirection,
    pub token_in: Address,
    pub token_out: Address,
    /// Native units of `token_in`, never more than the wallet held when planned
    pub amount_in: U256,
    /// Output expected at the planning price, before slippage
    pub expected_amount_out: U256,
}

/// Outcome of one planning step; derived on the fly and never persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebalanceDecision {
    pub needs_exit: bool,
    pub new_tick_lower: i32,
    pub new_tick_upper: i32,
    pub swap_plan: Option<SwapPlan>,
}

/// Where the controller stands between iterations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    NoPosition,
    PositionActive { position_id: U256 },
    PositionInactiveClosing { position_id: U256 },
    Reopening,
}

impl ControllerState {
    pub fn position_id(&self) -> Option<U256> {
        match self {
            Self::PositionActive { position_id } | Self::PositionInactiveClosing { position_id } => {
                Some(*position_id)
            }
            Self::NoPosition | Self::Reopening => None,
        }
    }
}
