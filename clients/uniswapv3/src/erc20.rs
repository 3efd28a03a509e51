//! Minimal ERC-20 helper: balances and router/registry approvals.

use alloy::primitives::{Address, U256};
use alloy::providers::DynProvider;
use tracing::{debug, info};

use crate::contracts::IERC20;
use crate::error::Result;
use crate::tx::confirm;

pub struct Erc20Token {
    token: IERC20::IERC20Instance<DynProvider>,
}

impl Erc20Token {
    pub fn new(address: Address, provider: DynProvider) -> Self {
        Self {
            token: IERC20::new(address, provider),
        }
    }

    pub fn address(&self) -> Address {
        *self.token.address()
    }

    pub async fn balance_of(&self, account: Address) -> Result<U256> {
        Ok(self.token.balanceOf(account).call().await?)
    }

    pub async fn allowance(&self, owner: Address, spender: Address) -> Result<U256> {
        Ok(self.token.allowance(owner, spender).call().await?)
    }

    pub async fn decimals(&self) -> Result<u8> {
        Ok(self.token.decimals().call().await?)
    }

    pub async fn symbol(&self) -> Result<String> {
        Ok(self.token.symbol().call().await?)
    }

    pub async fn approve(&self, spender: Address, amount: U256) -> Result<()> {
        let pending = self.token.approve(spender, amount).send().await?;
        confirm("approve", pending).await?;
        Ok(())
    }

    /// Approves `U256::MAX` for `spender` unless the current allowance is still above 90% of
    /// the maximum. Returns whether an approval was sent.
    pub async fn ensure_allowance(&self, owner: Address, spender: Address) -> Result<bool> {
        let allowance = self.allowance(owner, spender).await?;
        if allowance >= allowance_high_water_mark() {
            debug!(token = %self.address(), %spender, "allowance sufficient");
            return Ok(false);
        }
        info!(token = %self.address(), %spender, %allowance, "approving spender");
        self.approve(spender, U256::MAX).await?;
        Ok(true)
    }
}

/// Allowance below which a fresh max approval is sent.
pub fn allowance_high_water_mark() -> U256 {
    U256::MAX / U256::from(10u8) * U256::from(9u8)
}
