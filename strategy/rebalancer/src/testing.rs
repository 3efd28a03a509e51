//! In-memory venues for controller and lifecycle tests.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use clients_binance::{MarginMode, OrderSide};
use clients_uniswapv3::{ExactInputSingle, MintRequest, PositionAmounts, PositionData};
use utils::{f64_to_u256, u256_to_f64};

use crate::config::{HedgeConfig, PoolConfig, RebalancerConfig, SwapConfig};
use crate::error::{RebalanceError, Result};
use crate::types::{HedgePosition, Pool, Token, WalletHoldings};
use crate::venues::{HedgeVenue, LiquidityVenue, SwapVenue, TokenWallet};

pub const OWNER: Address = Address::repeat_byte(0x0a);
pub const REGISTRY: Address = Address::repeat_byte(0x0b);
pub const ROUTER: Address = Address::repeat_byte(0x0c);

pub fn weth() -> Token {
    Token {
        address: Address::repeat_byte(0x42),
        symbol: "WETH".to_string(),
        decimals: 18,
    }
}

pub fn usdc() -> Token {
    Token {
        address: Address::repeat_byte(0x83),
        symbol: "USDC".to_string(),
        decimals: 6,
    }
}

pub fn weth_usdc_pool() -> Pool {
    Pool::new(weth(), usdc(), 500, None).expect("valid pool")
}

pub fn test_config() -> RebalancerConfig {
    RebalancerConfig {
        pool: PoolConfig {
            token_a: usdc(),
            token_b: weth(),
            fee: 500,
            tick_spacing: None,
        },
        range_half_width: 250,
        poll_interval_secs: 0,
        tx_deadline_secs: 1200,
        burn_closed_positions: true,
        initial_position_id: None,
        swap: SwapConfig::default(),
        hedge: HedgeConfig {
            instrument: "ETHUSDT".to_string(),
            hedge_ratio: 1.0,
            units_per_token0: 1.0,
            size_step: 0.001,
            leverage: 3,
            margin_mode: MarginMode::Cross,
        },
    }
}

pub fn eth(amount: f64) -> U256 {
    f64_to_u256(amount, 18)
}

pub fn usd(amount: f64) -> U256 {
    f64_to_u256(amount, 6)
}

#[derive(Default)]
struct ChainState {
    tick: i32,
    positions: BTreeMap<U256, PositionData>,
    deposits: BTreeMap<U256, (U256, U256)>,
    next_id: u64,
    wallet: WalletHoldings,
    approvals: BTreeSet<(Address, Address)>,
    calls: Vec<&'static str>,
    fail_next: Option<&'static str>,
    partial_collect: bool,
}

/// Pool, registry, router and wallet of one account, all in memory.
///
/// Only mutating calls are recorded in `calls`.
pub struct FakeChain {
    pool: Pool,
    state: Mutex<ChainState>,
}

impl FakeChain {
    pub fn new(tick: i32) -> Self {
        Self {
            pool: weth_usdc_pool(),
            state: Mutex::new(ChainState {
                tick,
                next_id: 1000,
                ..ChainState::default()
            }),
        }
    }

    fn with<T>(&self, f: impl FnOnce(&mut ChainState) -> T) -> T {
        let mut state = self.state.lock().expect("fake chain lock");
        f(&mut state)
    }

    pub fn set_wallet(&self, balance0: U256, balance1: U256) {
        self.with(|s| s.wallet = WalletHoldings { balance0, balance1 });
    }

    pub fn set_partial_collect(&self, partial: bool) {
        self.with(|s| s.partial_collect = partial);
    }

    /// Makes the next call named `operation` fail with a network error.
    pub fn fail_next(&self, operation: &'static str) {
        self.with(|s| s.fail_next = Some(operation));
    }

    pub fn insert_position(
        &self,
        tick_lower: i32,
        tick_upper: i32,
        liquidity: u128,
        owed0: u128,
        owed1: u128,
    ) -> U256 {
        let (token0, token1, fee) = (
            self.pool.token0().address,
            self.pool.token1().address,
            self.pool.fee(),
        );
        self.with(|s| {
            s.next_id += 1;
            let id = U256::from(s.next_id);
            s.positions.insert(
                id,
                PositionData {
                    token_id: id,
                    token0,
                    token1,
                    fee,
                    tick_lower,
                    tick_upper,
                    liquidity,
                    fee_growth_inside0_last_x128: U256::ZERO,
                    fee_growth_inside1_last_x128: U256::ZERO,
                    tokens_owed0: owed0,
                    tokens_owed1: owed1,
                },
            );
            id
        })
    }

    /// Moves a stored position into a different pool.
    pub fn set_position_pool(&self, id: U256, token1: Address, fee: u32) {
        self.with(|s| {
            if let Some(position) = s.positions.get_mut(&id) {
                position.token1 = token1;
                position.fee = fee;
            }
        });
    }

    /// Sets what closing the position would release.
    pub fn set_deposit(&self, id: U256, amount0: U256, amount1: U256) {
        self.with(|s| {
            s.deposits.insert(id, (amount0, amount1));
        });
    }

    pub fn stored_position(&self, id: U256) -> Option<PositionData> {
        self.with(|s| s.positions.get(&id).cloned())
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.with(|s| s.calls.clone())
    }

    pub fn clear_calls(&self) {
        self.with(|s| s.calls.clear());
    }

    pub fn mutation_count(&self) -> usize {
        self.with(|s| s.calls.len())
    }

    fn check_failure(state: &mut ChainState, operation: &'static str) -> Result<()> {
        if state.fail_next == Some(operation) {
            state.fail_next = None;
            return Err(RebalanceError::TransientNetwork(format!(
                "{operation}: connection reset"
            )));
        }
        Ok(())
    }

    fn missing(id: U256) -> RebalanceError {
        RebalanceError::VenueRejected(format!("invalid token id {id}"))
    }
}

#[async_trait]
impl LiquidityVenue for FakeChain {
    fn registry_address(&self) -> Address {
        REGISTRY
    }

    async fn current_tick(&self) -> Result<i32> {
        self.with(|s| {
            Self::check_failure(s, "current_tick")?;
            Ok(s.tick)
        })
    }

    async fn position(&self, position_id: U256) -> Result<PositionData> {
        self.with(|s| {
            Self::check_failure(s, "position")?;
            s.positions
                .get(&position_id)
                .cloned()
                .ok_or_else(|| Self::missing(position_id))
        })
    }

    async fn position_amounts(&self, position_id: U256) -> Result<PositionAmounts> {
        self.with(|s| {
            let position = s
                .positions
                .get(&position_id)
                .ok_or_else(|| Self::missing(position_id))?;
            let (deposit0, deposit1) = if position.liquidity > 0 {
                s.deposits.get(&position_id).copied().unwrap_or_default()
            } else {
                (U256::ZERO, U256::ZERO)
            };
            Ok(PositionAmounts {
                withdrawable_amount0: deposit0,
                withdrawable_amount1: deposit1,
                collectable_amount0: U256::from(position.tokens_owed0),
                collectable_amount1: U256::from(position.tokens_owed1),
            })
        })
    }

    async fn position_ids(&self) -> Result<Vec<U256>> {
        self.with(|s| Ok(s.positions.keys().copied().collect()))
    }

    async fn mint(&self, request: &MintRequest) -> Result<U256> {
        let spacing = self.pool.tick_spacing();
        let id = self.with(|s| {
            Self::check_failure(s, "mint")?;
            if request.tick_lower >= request.tick_upper
                || request.tick_lower % spacing != 0
                || request.tick_upper % spacing != 0
            {
                return Err(RebalanceError::MintFailed(format!(
                    "bad range [{}, {}]",
                    request.tick_lower, request.tick_upper
                )));
            }
            if request.amount0_desired > s.wallet.balance0
                || request.amount1_desired > s.wallet.balance1
            {
                return Err(RebalanceError::MintFailed("insufficient balance".to_string()));
            }
            s.calls.push("mint");
            s.wallet.balance0 -= request.amount0_desired;
            s.wallet.balance1 -= request.amount1_desired;
            s.next_id += 1;
            Ok(U256::from(s.next_id))
        })?;
        Ok(self.insert_position_with_id(id, request))
    }

    async fn decrease_liquidity(
        &self,
        position_id: U256,
        liquidity: u128,
        _amount0_min: U256,
        _amount1_min: U256,
        _deadline: u64,
    ) -> Result<()> {
        self.with(|s| {
            Self::check_failure(s, "decrease_liquidity")?;
            let (deposit0, deposit1) = s.deposits.remove(&position_id).unwrap_or_default();
            let position = s
                .positions
                .get_mut(&position_id)
                .ok_or_else(|| Self::missing(position_id))?;
            position.liquidity = position.liquidity.saturating_sub(liquidity);
            position.tokens_owed0 += deposit0.saturating_to::<u128>();
            position.tokens_owed1 += deposit1.saturating_to::<u128>();
            s.calls.push("decrease_liquidity");
            Ok(())
        })
    }

    async fn collect(
        &self,
        position_id: U256,
        _recipient: Address,
        amount0_max: u128,
        amount1_max: u128,
    ) -> Result<()> {
        self.with(|s| {
            Self::check_failure(s, "collect")?;
            let partial = s.partial_collect;
            let position = s
                .positions
                .get_mut(&position_id)
                .ok_or_else(|| Self::missing(position_id))?;
            let mut take0 = position.tokens_owed0.min(amount0_max);
            let mut take1 = position.tokens_owed1.min(amount1_max);
            if partial {
                take0 = take0.saturating_sub(1);
                take1 = take1.saturating_sub(1);
            }
            position.tokens_owed0 -= take0;
            position.tokens_owed1 -= take1;
            s.wallet.balance0 += U256::from(take0);
            s.wallet.balance1 += U256::from(take1);
            s.calls.push("collect");
            Ok(())
        })
    }

    async fn burn(&self, position_id: U256) -> Result<()> {
        self.with(|s| {
            Self::check_failure(s, "burn")?;
            let position = s
                .positions
                .get(&position_id)
                .ok_or_else(|| Self::missing(position_id))?;
            if !position.is_empty() {
                return Err(RebalanceError::BurnNotEmpty {
                    id: position_id,
                    liquidity: position.liquidity,
                    owed0: position.tokens_owed0,
                    owed1: position.tokens_owed1,
                });
            }
            s.positions.remove(&position_id);
            s.calls.push("burn");
            Ok(())
        })
    }
}

impl FakeChain {
    fn insert_position_with_id(&self, id: U256, request: &MintRequest) -> U256 {
        self.with(|s| {
            s.positions.insert(
                id,
                PositionData {
                    token_id: id,
                    token0: request.token0,
                    token1: request.token1,
                    fee: request.fee,
                    tick_lower: request.tick_lower,
                    tick_upper: request.tick_upper,
                    liquidity: 1_000_000,
                    fee_growth_inside0_last_x128: U256::ZERO,
                    fee_growth_inside1_last_x128: U256::ZERO,
                    tokens_owed0: 0,
                    tokens_owed1: 0,
                },
            );
            s.deposits
                .insert(id, (request.amount0_desired, request.amount1_desired));
            id
        })
    }
}

#[async_trait]
impl SwapVenue for FakeChain {
    fn router_address(&self) -> Address {
        ROUTER
    }

    async fn exact_input_single(&self, swap: &ExactInputSingle) -> Result<()> {
        let token0 = self.pool.token0().clone();
        let token1 = self.pool.token1().clone();
        self.with(|s| {
            Self::check_failure(s, "swap")?;
            // output net of the pool fee, no price impact
            let price = self.pool.price_at(s.tick);
            let net = 1.0 - self.pool.fee() as f64 / 1_000_000.0;
            let (amount_out, balance_in) = if swap.token_in == token0.address {
                let out = u256_to_f64(swap.amount_in, token0.decimals) * price * net;
                (f64_to_u256(out, token1.decimals), s.wallet.balance0)
            } else {
                let out = u256_to_f64(swap.amount_in, token1.decimals) / price * net;
                (f64_to_u256(out, token0.decimals), s.wallet.balance1)
            };
            if swap.amount_in > balance_in {
                return Err(RebalanceError::TransactionReverted("STF".to_string()));
            }
            if amount_out < swap.amount_out_minimum {
                return Err(RebalanceError::TransactionReverted("Too little received".to_string()));
            }
            if swap.token_in == token0.address {
                s.wallet.balance0 -= swap.amount_in;
                s.wallet.balance1 += amount_out;
            } else {
                s.wallet.balance1 -= swap.amount_in;
                s.wallet.balance0 += amount_out;
            }
            s.calls.push("swap");
            Ok(())
        })
    }
}

#[async_trait]
impl TokenWallet for FakeChain {
    fn wallet_address(&self) -> Address {
        OWNER
    }

    async fn balances(&self) -> Result<WalletHoldings> {
        self.with(|s| {
            Self::check_failure(s, "balances")?;
            Ok(s.wallet)
        })
    }

    async fn ensure_allowance(&self, token: Address, spender: Address) -> Result<bool> {
        self.with(|s| {
            if s.approvals.insert((token, spender)) {
                s.calls.push("approve");
                Ok(true)
            } else {
                Ok(false)
            }
        })
    }
}

#[derive(Default)]
struct HedgeState {
    position: f64,
    leverage: Option<u32>,
    leverage_calls: usize,
    orders: Vec<(OrderSide, f64)>,
}

pub struct FakeHedge {
    state: Mutex<HedgeState>,
}

impl FakeHedge {
    pub fn new(position: f64) -> Self {
        Self {
            state: Mutex::new(HedgeState {
                position,
                ..HedgeState::default()
            }),
        }
    }

    pub fn position(&self) -> f64 {
        self.state.lock().expect("fake hedge lock").position
    }

    pub fn orders(&self) -> Vec<(OrderSide, f64)> {
        self.state.lock().expect("fake hedge lock").orders.clone()
    }

    pub fn leverage_calls(&self) -> usize {
        self.state.lock().expect("fake hedge lock").leverage_calls
    }
}

#[async_trait]
impl HedgeVenue for FakeHedge {
    async fn set_leverage(
        &self,
        _instrument: &str,
        leverage: u32,
        _margin_mode: MarginMode,
    ) -> Result<()> {
        let mut state = self.state.lock().expect("fake hedge lock");
        state.leverage = Some(leverage);
        state.leverage_calls += 1;
        Ok(())
    }

    async fn get_position(&self, instrument: &str) -> Result<HedgePosition> {
        let state = self.state.lock().expect("fake hedge lock");
        Ok(HedgePosition::from_signed(
            instrument,
            state.position,
            state.leverage,
        ))
    }

    async fn submit_market_order(
        &self,
        _instrument: &str,
        side: OrderSide,
        size: f64,
        _margin_mode: MarginMode,
    ) -> Result<()> {
        let mut state = self.state.lock().expect("fake hedge lock");
        state.position += match side {
            OrderSide::Buy => size,
            OrderSide::Sell => -size,
        };
        state.orders.push((side, size));
        Ok(())
    }
}
