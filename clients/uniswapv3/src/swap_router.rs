//! SwapRouter02 client for single-hop exact-input swaps.

use alloy::primitives::aliases::{U160, U24};
use alloy::primitives::{Address, TxHash, U256};
use alloy::providers::DynProvider;
use tracing::info;

use crate::contracts::{ExactInputSingleParams, ISwapRouter};
use crate::error::Result;
use crate::tx::confirm;

/// Parameters of an `exactInputSingle` call
#[derive(Debug, Clone)]
pub struct ExactInputSingle {
    pub token_in: Address,
    pub token_out: Address,
    pub fee: u32,
    pub recipient: Address,
    pub amount_in: U256,
    /// Zero disables the output bound
    pub amount_out_minimum: U256,
    /// Zero disables the price limit
    pub sqrt_price_limit_x96: U256,
}

pub struct UniswapV3SwapRouter {
    router: ISwapRouter::ISwapRouterInstance<DynProvider>,
}

impl UniswapV3SwapRouter {
    pub fn new(address: Address, provider: DynProvider) -> Self {
        Self {
            router: ISwapRouter::new(address, provider),
        }
    }

    pub fn address(&self) -> Address {
        *self.router.address()
    }

    /// Submits the swap and waits for a successful receipt.
    ///
    /// The router must already be allowed to move at least `amount_in` of `token_in`.
    pub async fn exact_input_single(&self, swap: &ExactInputSingle) -> Result<TxHash> {
        let params = ExactInputSingleParams {
            tokenIn: swap.token_in,
            tokenOut: swap.token_out,
            fee: U24::from(swap.fee),
            recipient: swap.recipient,
            amountIn: swap.amount_in,
            amountOutMinimum: swap.amount_out_minimum,
            sqrtPriceLimitX96: U160::saturating_from(swap.sqrt_price_limit_x96),
        };
        let pending = self.router.exactInputSingle(params).send().await?;
        let receipt = confirm("exactInputSingle", pending).await?;
        info!(
            token_in = %swap.token_in,
            token_out = %swap.token_out,
            amount_in = %swap.amount_in,
            min_out = %swap.amount_out_minimum,
            tx = %receipt.transaction_hash,
            "swap executed"
        );
        Ok(receipt.transaction_hash)
    }
}
