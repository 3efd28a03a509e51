//! Uniswap V3 NonfungiblePositionManager client and position data types.

use alloy::eips::BlockId;
use alloy::network::ReceiptResponse;
use alloy::primitives::aliases::{I24, U24};
use alloy::primitives::{Address, TxHash, U256};
use alloy::providers::{DynProvider, Provider};
use tracing::{debug, info};

use crate::contracts::{
    CollectParams, DecreaseLiquidityParams, INonfungiblePositionManager, MintParams,
};
use crate::error::{Result, UniswapV3Error};
use crate::pool::UniswapV3Pool;
use crate::tx::confirm;

/// On-chain record of a single liquidity position, as returned by `positions(tokenId)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionData {
    /// The position NFT token ID
    pub token_id: U256,
    /// Address of token0 in the pair
    pub token0: Address,
    /// Address of token1 in the pair
    pub token1: Address,
    /// Pool fee tier in hundredths of a bip
    pub fee: u32,
    /// Lower tick boundary (inclusive)
    pub tick_lower: i32,
    /// Upper tick boundary (inclusive)
    pub tick_upper: i32,
    /// Current liquidity amount in the position
    pub liquidity: u128,
    pub fee_growth_inside0_last_x128: U256,
    pub fee_growth_inside1_last_x128: U256,
    /// Token0 owed to the owner and not yet collected
    pub tokens_owed0: u128,
    /// Token1 owed to the owner and not yet collected
    pub tokens_owed1: u128,
}

impl PositionData {
    /// No liquidity left and nothing owed; the only state in which `burn` succeeds.
    pub fn is_empty(&self) -> bool {
        self.liquidity == 0 && self.tokens_owed0 == 0 && self.tokens_owed1 == 0
    }
}

/// Token amounts a position would release, obtained by simulating the calls at one block
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionAmounts {
    /// Amount of token0 that would be withdrawn if all liquidity is removed
    pub withdrawable_amount0: U256,
    /// Amount of token1 that would be withdrawn if all liquidity is removed
    pub withdrawable_amount1: U256,
    /// Amount of token0 fees that can be collected
    pub collectable_amount0: U256,
    /// Amount of token1 fees that can be collected
    pub collectable_amount1: U256,
}

/// Parameters for minting a new position
#[derive(Debug, Clone)]
pub struct MintRequest {
    pub token0: Address,
    pub token1: Address,
    pub fee: u32,
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub amount0_desired: U256,
    pub amount1_desired: U256,
    pub amount0_min: U256,
    pub amount1_min: U256,
    pub recipient: Address,
    /// Unix timestamp in seconds after which the transaction reverts
    pub deadline: u64,
}

/// Outcome of a confirmed mint, decoded from the mint transaction's own event
#[derive(Debug, Clone)]
pub struct MintedPosition {
    pub token_id: U256,
    pub liquidity: u128,
    pub amount0: U256,
    pub amount1: U256,
    pub tx: TxHash,
}

/// UniswapV3PositionManager drives the lifecycle of positions owned by one account
pub struct UniswapV3PositionManager {
    /// PositionManager contract instance for making RPC calls
    position_manager: INonfungiblePositionManager::INonfungiblePositionManagerInstance<DynProvider>,
    /// Account that owns the positions and signs transactions
    owner: Address,
}

impl UniswapV3PositionManager {
    /// Creates a new `UniswapV3PositionManager`
    ///
    /// # Arguments
    /// * `address` - The NonfungiblePositionManager contract address
    /// * `provider` - Provider used for reads; it must carry a wallet for `owner` to send transactions
    /// * `owner` - Account that owns the managed positions
    pub fn new(address: Address, provider: DynProvider, owner: Address) -> Self {
        Self {
            position_manager: INonfungiblePositionManager::new(address, provider),
            owner,
        }
    }

    /// The position manager contract address
    pub fn address(&self) -> Address {
        *self.position_manager.address()
    }

    /// Reads a position; always a fresh call, never cached.
    pub async fn position(&self, token_id: U256) -> Result<PositionData> {
        let info = self.position_manager.positions(token_id).call().await?;
        Ok(PositionData {
            token_id,
            token0: info.token0,
            token1: info.token1,
            fee: info.fee.to::<u32>(),
            tick_lower: info.tickLower.as_i32(),
            tick_upper: info.tickUpper.as_i32(),
            liquidity: info.liquidity,
            fee_growth_inside0_last_x128: info.feeGrowthInside0LastX128,
            fee_growth_inside1_last_x128: info.feeGrowthInside1LastX128,
            tokens_owed0: info.tokensOwed0,
            tokens_owed1: info.tokensOwed1,
        })
    }

    /// Reads the position and the pool tick in the same step and reports whether the tick
    /// sits inside `[tick_lower, tick_upper]`.
    pub async fn check_active(
        &self,
        token_id: U256,
        pool: &UniswapV3Pool,
    ) -> Result<(bool, PositionData)> {
        let position = self.position(token_id).await?;
        let tick = pool.current_tick().await?;
        let active = tick >= position.tick_lower && tick <= position.tick_upper;
        debug!(
            %token_id,
            tick,
            tick_lower = position.tick_lower,
            tick_upper = position.tick_upper,
            active,
            "position range check"
        );
        Ok((active, position))
    }

    /// Enumerates every position NFT held by the owner via `tokenOfOwnerByIndex`.
    pub async fn position_ids(&self) -> Result<Vec<U256>> {
        let block_id = self.latest_block_id().await?;
        let balance = self
            .position_manager
            .balanceOf(self.owner)
            .block(block_id)
            .call()
            .await?;

        let mut ids = Vec::with_capacity(balance.saturating_to::<usize>());
        for index in 0..balance.saturating_to::<u64>() {
            let token_id = self
                .position_manager
                .tokenOfOwnerByIndex(self.owner, U256::from(index))
                .block(block_id)
                .call()
                .await?;
            ids.push(token_id);
        }
        Ok(ids)
    }

    /// Simulates a full withdrawal and a fee collection at the latest block.
    ///
    /// Both calls are executed with `eth_call` from the owner, so nothing is mutated. If a
    /// simulation reverts the corresponding amounts are left at zero.
    pub async fn position_amounts(&self, token_id: U256) -> Result<PositionAmounts> {
        let block_id = self.latest_block_id().await?;
        let info = self
            .position_manager
            .positions(token_id)
            .block(block_id)
            .call()
            .await?;

        let mut amounts = PositionAmounts::default();

        if info.liquidity > 0 {
            let decrease_params = DecreaseLiquidityParams {
                tokenId: token_id,
                liquidity: info.liquidity,
                amount0Min: U256::ZERO,
                amount1Min: U256::ZERO,
                deadline: U256::from(u64::MAX),
            };
            match self
                .position_manager
                .decreaseLiquidity(decrease_params)
                .from(self.owner)
                .block(block_id)
                .call()
                .await
            {
                Ok(result) => {
                    amounts.withdrawable_amount0 = result.amount0;
                    amounts.withdrawable_amount1 = result.amount1;
                }
                Err(err) => debug!(%token_id, %err, "decreaseLiquidity simulation failed"),
            }
        }

        let collect_params = CollectParams {
            tokenId: token_id,
            recipient: self.owner,
            amount0Max: u128::MAX,
            amount1Max: u128::MAX,
        };
        match self
            .position_manager
            .collect(collect_params)
            .from(self.owner)
            .block(block_id)
            .call()
            .await
        {
            Ok(result) => {
                amounts.collectable_amount0 = result.amount0;
                amounts.collectable_amount1 = result.amount1;
            }
            Err(err) => debug!(%token_id, %err, "collect simulation failed"),
        }

        Ok(amounts)
    }

    /// Mints a new position and returns the token ID emitted by that very transaction.
    pub async fn mint(&self, request: &MintRequest) -> Result<MintedPosition> {
        let params = MintParams {
            token0: request.token0,
            token1: request.token1,
            fee: U24::from(request.fee),
            tickLower: to_i24(request.tick_lower)?,
            tickUpper: to_i24(request.tick_upper)?,
            amount0Desired: request.amount0_desired,
            amount1Desired: request.amount1_desired,
            amount0Min: request.amount0_min,
            amount1Min: request.amount1_min,
            recipient: request.recipient,
            deadline: U256::from(request.deadline),
        };

        let receipt = self
            .position_manager
            .mint(params)
            .send()
            .await?
            .get_receipt()
            .await?;
        let tx = receipt.transaction_hash;
        if !ReceiptResponse::status(&receipt) {
            return Err(UniswapV3Error::MintFailed(tx));
        }

        let manager = self.address();
        let event = receipt
            .inner
            .logs()
            .iter()
            .filter(|log| log.address() == manager)
            .find_map(|log| {
                log.log_decode::<INonfungiblePositionManager::IncreaseLiquidity>()
                    .ok()
            })
            .ok_or(UniswapV3Error::MissingMintEvent(tx))?;
        let data = event.inner.data;

        info!(
            token_id = %data.tokenId,
            liquidity = data.liquidity,
            amount0 = %data.amount0,
            amount1 = %data.amount1,
            %tx,
            "position minted"
        );
        Ok(MintedPosition {
            token_id: data.tokenId,
            liquidity: data.liquidity,
            amount0: data.amount0,
            amount1: data.amount1,
            tx,
        })
    }

    /// Removes `liquidity` from the position; the released tokens become owed.
    pub async fn decrease_liquidity(
        &self,
        token_id: U256,
        liquidity: u128,
        amount0_min: U256,
        amount1_min: U256,
        deadline: u64,
    ) -> Result<TxHash> {
        let params = DecreaseLiquidityParams {
            tokenId: token_id,
            liquidity,
            amount0Min: amount0_min,
            amount1Min: amount1_min,
            deadline: U256::from(deadline),
        };
        let pending = self.position_manager.decreaseLiquidity(params).send().await?;
        let receipt = confirm("decreaseLiquidity", pending).await?;
        Ok(receipt.transaction_hash)
    }

    /// Withdraws owed tokens up to the given caps; pass `u128::MAX` to collect everything.
    pub async fn collect(
        &self,
        token_id: U256,
        recipient: Address,
        amount0_max: u128,
        amount1_max: u128,
    ) -> Result<TxHash> {
        let params = CollectParams {
            tokenId: token_id,
            recipient,
            amount0Max: amount0_max,
            amount1Max: amount1_max,
        };
        let pending = self.position_manager.collect(params).send().await?;
        let receipt = confirm("collect", pending).await?;
        Ok(receipt.transaction_hash)
    }

    /// Burns the position NFT. Refuses to submit when the position still holds liquidity
    /// or owed tokens, since the contract would revert anyway.
    pub async fn burn(&self, token_id: U256) -> Result<TxHash> {
        let position = self.position(token_id).await?;
        if !position.is_empty() {
            return Err(UniswapV3Error::BurnNotEmpty {
                id: token_id,
                liquidity: position.liquidity,
                owed0: position.tokens_owed0,
                owed1: position.tokens_owed1,
            });
        }
        let pending = self.position_manager.burn(token_id).send().await?;
        let receipt = confirm("burn", pending).await?;
        Ok(receipt.transaction_hash)
    }

    async fn latest_block_id(&self) -> Result<BlockId> {
        let block_number = self.position_manager.provider().get_block_number().await?;
        Ok(BlockId::number(block_number))
    }
}

fn to_i24(tick: i32) -> Result<I24> {
    I24::try_from(tick).map_err(|_| UniswapV3Error::InvalidTick(tick))
}
