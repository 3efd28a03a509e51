//! Error taxonomy of the rebalancing controller.

use alloy::primitives::U256;
use clients_binance::BinanceError;
use clients_uniswapv3::UniswapV3Error;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RebalanceError {
    /// RPC or REST call failed or timed out; the next iteration re-reads everything.
    #[error("transient network error: {0}")]
    TransientNetwork(String),

    /// The call was confirmed on-chain but did not succeed.
    #[error("transaction reverted: {0}")]
    TransactionReverted(String),

    #[error("mint failed: {0}")]
    MintFailed(String),

    #[error("position {id} is not empty (liquidity {liquidity}, owed {owed0}/{owed1})")]
    BurnNotEmpty {
        id: U256,
        liquidity: u128,
        owed0: u128,
        owed1: u128,
    },

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// A venue refused the request (rejected order, reverted simulation, bad response).
    #[error("venue rejected request: {0}")]
    VenueRejected(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<UniswapV3Error> for RebalanceError {
    fn from(err: UniswapV3Error) -> Self {
        if err.is_transient() {
            return Self::TransientNetwork(err.to_string());
        }
        match err {
            UniswapV3Error::MintFailed(_) | UniswapV3Error::MissingMintEvent(_) => {
                Self::MintFailed(err.to_string())
            }
            UniswapV3Error::BurnNotEmpty {
                id,
                liquidity,
                owed0,
                owed1,
            } => Self::BurnNotEmpty {
                id,
                liquidity,
                owed0,
                owed1,
            },
            UniswapV3Error::Reverted { .. } => Self::TransactionReverted(err.to_string()),
            UniswapV3Error::InvalidTick(_) => Self::InvariantViolation(err.to_string()),
            other => Self::VenueRejected(other.to_string()),
        }
    }
}

impl From<BinanceError> for RebalanceError {
    fn from(err: BinanceError) -> Self {
        if err.is_transient() {
            Self::TransientNetwork(err.to_string())
        } else {
            Self::VenueRejected(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, RebalanceError>;
