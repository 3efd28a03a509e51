//! Error type shared by the Uniswap V3 clients.

use alloy::primitives::{TxHash, U256};
use alloy::providers::PendingTransactionError;
use alloy::transports::TransportError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UniswapV3Error {
    #[error("contract call failed: {0}")]
    Contract(#[from] alloy::contract::Error),

    #[error("waiting for confirmation failed: {0}")]
    Pending(#[from] PendingTransactionError),

    #[error("rpc error: {0}")]
    Transport(#[from] TransportError),

    #[error("mint transaction {0} did not succeed")]
    MintFailed(TxHash),

    #[error("mint transaction {0} emitted no IncreaseLiquidity event")]
    MissingMintEvent(TxHash),

    #[error("{action} transaction {tx} reverted")]
    Reverted { action: &'static str, tx: TxHash },

    #[error("position {id} is not empty (liquidity {liquidity}, owed {owed0}/{owed1})")]
    BurnNotEmpty {
        id: U256,
        liquidity: u128,
        owed0: u128,
        owed1: u128,
    },

    #[error("tick {0} does not fit in int24")]
    InvalidTick(i32),
}

impl UniswapV3Error {
    /// True when the failure happened on the way to the node rather than on-chain, so a
    /// later attempt against fresh state may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(err) => err.as_error_resp().is_none(),
            Self::Pending(_) => true,
            Self::Contract(alloy::contract::Error::TransportError(err)) => {
                err.as_error_resp().is_none()
            }
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, UniswapV3Error>;
