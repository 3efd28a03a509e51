//! Venue implementations backed by the real Uniswap V3 contracts and Binance futures.

use alloy::primitives::{Address, U256};
use alloy::providers::DynProvider;
use async_trait::async_trait;
use clients_binance::{BinancePerpsClient, MarginMode, OrderSide};
use clients_uniswapv3::{
    Erc20Token, ExactInputSingle, MintRequest, PositionAmounts, PositionData, UniswapV3Config,
    UniswapV3Pool, UniswapV3PositionManager, UniswapV3SwapRouter,
};
use tracing::{debug, warn};

use crate::error::{RebalanceError, Result};
use crate::hedge::format_quantity;
use crate::types::{HedgePosition, Pool, WalletHoldings};
use crate::venues::{HedgeVenue, LiquidityVenue, SwapVenue, TokenWallet};

/// Pool, position manager, router and the two pool tokens, all seen from `owner`.
pub struct UniswapV3Venue {
    pool: UniswapV3Pool,
    position_manager: UniswapV3PositionManager,
    router: UniswapV3SwapRouter,
    token0: Erc20Token,
    token1: Erc20Token,
    owner: Address,
}

impl UniswapV3Venue {
    /// `provider` must sign for `owner`.
    pub fn new(config: &UniswapV3Config, pool: &Pool, provider: DynProvider, owner: Address) -> Self {
        Self {
            pool: UniswapV3Pool::new(config.pool, provider.clone()),
            position_manager: UniswapV3PositionManager::new(
                config.position_manager,
                provider.clone(),
                owner,
            ),
            router: UniswapV3SwapRouter::new(config.swap_router, provider.clone()),
            token0: Erc20Token::new(pool.token0().address, provider.clone()),
            token1: Erc20Token::new(pool.token1().address, provider),
            owner,
        }
    }

    /// Checks configured token metadata against the chain. Decimals must match; a
    /// differing symbol only warns.
    pub async fn verify_tokens(&self, pool: &Pool) -> Result<()> {
        for (token, expected) in [(&self.token0, pool.token0()), (&self.token1, pool.token1())] {
            let decimals = token.decimals().await?;
            if decimals != expected.decimals {
                return Err(RebalanceError::Config(format!(
                    "{} has {} decimals on chain, configured {}",
                    expected.address, decimals, expected.decimals
                )));
            }
            let symbol = token.symbol().await?;
            if symbol != expected.symbol {
                warn!(token = %expected.address, on_chain = %symbol, configured = %expected.symbol, "token symbol differs");
            }
        }
        Ok(())
    }

    fn token(&self, address: Address) -> Result<&Erc20Token> {
        if address == self.token0.address() {
            Ok(&self.token0)
        } else if address == self.token1.address() {
            Ok(&self.token1)
        } else {
            Err(RebalanceError::InvariantViolation(format!(
                "{address} is not a token of the managed pool"
            )))
        }
    }
}

#[async_trait]
impl LiquidityVenue for UniswapV3Venue {
    fn registry_address(&self) -> Address {
        self.position_manager.address()
    }

    async fn current_tick(&self) -> Result<i32> {
        Ok(self.pool.current_tick().await?)
    }

    async fn position(&self, position_id: U256) -> Result<PositionData> {
        Ok(self.position_manager.position(position_id).await?)
    }

    async fn check_active(&self, position_id: U256) -> Result<(bool, PositionData)> {
        Ok(self
            .position_manager
            .check_active(position_id, &self.pool)
            .await?)
    }

    async fn position_amounts(&self, position_id: U256) -> Result<PositionAmounts> {
        Ok(self.position_manager.position_amounts(position_id).await?)
    }

    async fn position_ids(&self) -> Result<Vec<U256>> {
        Ok(self.position_manager.position_ids().await?)
    }

    async fn mint(&self, request: &MintRequest) -> Result<U256> {
        let minted = self.position_manager.mint(request).await?;
        Ok(minted.token_id)
    }

    async fn decrease_liquidity(
        &self,
        position_id: U256,
        liquidity: u128,
        amount0_min: U256,
        amount1_min: U256,
        deadline: u64,
    ) -> Result<()> {
        let tx = self
            .position_manager
            .decrease_liquidity(position_id, liquidity, amount0_min, amount1_min, deadline)
            .await?;
        debug!(%position_id, %tx, "decreaseLiquidity confirmed");
        Ok(())
    }

    async fn collect(
        &self,
        position_id: U256,
        recipient: Address,
        amount0_max: u128,
        amount1_max: u128,
    ) -> Result<()> {
        let tx = self
            .position_manager
            .collect(position_id, recipient, amount0_max, amount1_max)
            .await?;
        debug!(%position_id, %tx, "collect confirmed");
        Ok(())
    }

    async fn burn(&self, position_id: U256) -> Result<()> {
        let tx = self.position_manager.burn(position_id).await?;
        debug!(%position_id, %tx, "burn confirmed");
        Ok(())
    }
}

#[async_trait]
impl SwapVenue for UniswapV3Venue {
    fn router_address(&self) -> Address {
        self.router.address()
    }

    async fn exact_input_single(&self, swap: &ExactInputSingle) -> Result<()> {
        let tx = self.router.exact_input_single(swap).await?;
        debug!(%tx, "swap confirmed");
        Ok(())
    }
}

#[async_trait]
impl TokenWallet for UniswapV3Venue {
    fn wallet_address(&self) -> Address {
        self.owner
    }

    async fn balances(&self) -> Result<WalletHoldings> {
        Ok(WalletHoldings {
            balance0: self.token0.balance_of(self.owner).await?,
            balance1: self.token1.balance_of(self.owner).await?,
        })
    }

    async fn ensure_allowance(&self, token: Address, spender: Address) -> Result<bool> {
        Ok(self.token(token)?.ensure_allowance(self.owner, spender).await?)
    }
}

/// USDⓈ-M perpetuals in one-way mode; the position amount is already signed.
pub struct BinanceHedgeVenue {
    client: BinancePerpsClient,
    size_step: f64,
}

impl BinanceHedgeVenue {
    pub fn new(client: BinancePerpsClient, size_step: f64) -> Self {
        Self { client, size_step }
    }
}

#[async_trait]
impl HedgeVenue for BinanceHedgeVenue {
    async fn set_leverage(
        &self,
        instrument: &str,
        leverage: u32,
        margin_mode: MarginMode,
    ) -> Result<()> {
        self.client.set_margin_mode(instrument, margin_mode).await?;
        self.client.set_leverage(instrument, leverage).await?;
        Ok(())
    }

    async fn get_position(&self, instrument: &str) -> Result<HedgePosition> {
        let Some(position) = self.client.get_position(instrument).await? else {
            return Ok(HedgePosition::flat(instrument));
        };
        let amount: f64 = position.position_amt.parse().map_err(|_| {
            RebalanceError::VenueRejected(format!(
                "unparseable position amount {:?} for {instrument}",
                position.position_amt
            ))
        })?;
        Ok(HedgePosition::from_signed(instrument, amount, None))
    }

    async fn submit_market_order(
        &self,
        instrument: &str,
        side: OrderSide,
        size: f64,
        _margin_mode: MarginMode,
    ) -> Result<()> {
        let quantity = format_quantity(size, self.size_step);
        self.client
            .submit_market_order(instrument, side, &quantity)
            .await?;
        Ok(())
    }
}
