//! The rebalancing state machine.
//!
//! Each iteration reads fresh state, advances through as many states as it can, and
//! returns. A failed step leaves the state where it was so the next iteration resumes
//! from there with new reads.

use std::time::{Instant, SystemTime, UNIX_EPOCH};

use alloy::primitives::U256;
use clients_uniswapv3::{ExactInputSingle, MintRequest, PositionData};
use tracing::{debug, error, info, warn};
use utils::u256_to_f64;

use crate::config::RebalancerConfig;
use crate::error::{RebalanceError, Result};
use crate::hedge;
use crate::lifecycle;
use crate::swap_sizing::{min_amount_out, plan_swap, ratio_weight};
use crate::tick_math;
use crate::types::{ControllerState, Pool, RebalanceDecision, SwapPlan, WalletHoldings};
use crate::venues::{HedgeVenue, LiquidityVenue, SwapVenue, TokenWallet};

/// Plans a rebalance at `tick`: the new range and the swap, if any, that brings the
/// wallet to the configured value split. Pure; nothing is read or sent.
pub fn plan_rebalance(
    pool: &Pool,
    config: &RebalancerConfig,
    tick: i32,
    holdings: &WalletHoldings,
    needs_exit: bool,
) -> RebalanceDecision {
    let (new_tick_lower, new_tick_upper) =
        tick_math::range_around(tick, config.range_half_width, pool.tick_spacing());
    let swap_plan = plan_swap(
        pool,
        holdings,
        pool.price_at(tick),
        ratio_weight(config.swap.token0_value_ratio),
        U256::from(config.swap.min_amount_in0),
        U256::from(config.swap.min_amount_in1),
    );
    RebalanceDecision {
        needs_exit,
        new_tick_lower,
        new_tick_upper,
        swap_plan,
    }
}

pub struct RebalancingController<C, H> {
    chain: C,
    hedge: H,
    pool: Pool,
    config: RebalancerConfig,
    state: ControllerState,
    allowances_ready: bool,
    leverage_applied: bool,
}

impl<C, H> RebalancingController<C, H>
where
    C: LiquidityVenue + SwapVenue + TokenWallet,
    H: HedgeVenue,
{
    /// Validates `config` and starts either with no position or managing
    /// `initial_position_id`.
    pub fn new(config: RebalancerConfig, chain: C, hedge: H) -> Result<Self> {
        config.validate()?;
        let pool = config.pool.to_pool()?;
        let state = match config.initial_position_id {
            Some(position_id) => ControllerState::PositionActive { position_id },
            None => ControllerState::NoPosition,
        };
        Ok(Self {
            chain,
            hedge,
            pool,
            config,
            state,
            allowances_ready: false,
            leverage_applied: false,
        })
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn position_id(&self) -> Option<U256> {
        self.state.position_id()
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    pub fn chain(&self) -> &C {
        &self.chain
    }

    pub fn hedge(&self) -> &H {
        &self.hedge
    }

    /// Runs iterations forever, one every poll interval. Errors are logged and the
    /// loop carries on from the state the failed iteration left behind.
    pub async fn run(&mut self) {
        info!(
            pool = %self.pool.pair_name(),
            fee = self.pool.fee(),
            state = ?self.state,
            poll_interval_secs = self.config.poll_interval_secs,
            "rebalancer started"
        );
        loop {
            let started = Instant::now();
            match self.run_iteration().await {
                Ok(()) => debug!(
                    state = ?self.state,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "iteration complete"
                ),
                Err(err) => error!(state = ?self.state, %err, "iteration failed"),
            }
            tokio::time::sleep(self.config.poll_interval()).await;
        }
    }

    pub async fn run_iteration(&mut self) -> Result<()> {
        self.prepare_allowances().await?;
        let mut exited = false;
        loop {
            match self.state {
                ControllerState::NoPosition => {
                    info!("no managed position, opening one");
                    self.transition(ControllerState::Reopening);
                }
                ControllerState::PositionActive { position_id } => {
                    let (active, position) = self.chain.check_active(position_id).await?;
                    self.ensure_managed_pool(&position)?;
                    if active {
                        debug!(%position_id, "position in range");
                        return self.sync_hedge(Some(position_id)).await;
                    }
                    warn!(
                        %position_id,
                        tick_lower = position.tick_lower,
                        tick_upper = position.tick_upper,
                        "position out of range"
                    );
                    self.transition(ControllerState::PositionInactiveClosing { position_id });
                }
                ControllerState::PositionInactiveClosing { position_id } => {
                    let outcome = lifecycle::close_position(
                        &self.chain,
                        position_id,
                        self.chain.wallet_address(),
                        self.deadline(),
                        self.config.burn_closed_positions,
                    )
                    .await?;
                    info!(%position_id, burned = outcome.burned, "position closed");
                    exited = true;
                    self.transition(ControllerState::Reopening);
                }
                ControllerState::Reopening => {
                    let position_id = self.reopen(exited).await?;
                    self.transition(ControllerState::PositionActive { position_id });
                    return Ok(());
                }
            }
        }
    }

    fn transition(&mut self, next: ControllerState) {
        debug!(from = ?self.state, to = ?next, "state transition");
        self.state = next;
    }

    /// Approves the router and the registry for both pool tokens once per process.
    async fn prepare_allowances(&mut self) -> Result<()> {
        if self.allowances_ready {
            return Ok(());
        }
        let spenders = [self.chain.router_address(), self.chain.registry_address()];
        let tokens = [self.pool.token0().address, self.pool.token1().address];
        for spender in spenders {
            for token in tokens {
                if self.chain.ensure_allowance(token, spender).await? {
                    info!(%token, %spender, "allowance granted");
                }
            }
        }
        self.allowances_ready = true;
        Ok(())
    }

    async fn reopen(&mut self, needs_exit: bool) -> Result<U256> {
        let tick = self.chain.current_tick().await?;
        let holdings = self.chain.balances().await?;
        let decision = plan_rebalance(&self.pool, &self.config, tick, &holdings, needs_exit);
        info!(
            tick,
            price = self.pool.price_at(tick),
            balance0 = %holdings.balance0,
            balance1 = %holdings.balance1,
            needs_exit,
            swap = decision.swap_plan.is_some(),
            "rebalance planned"
        );

        let (holdings, mint_tick) = match &decision.swap_plan {
            Some(plan) => {
                self.execute_swap(plan, &holdings).await?;
                (
                    self.chain.balances().await?,
                    self.chain.current_tick().await?,
                )
            }
            None => (holdings, tick),
        };

        self.hedge_exposure(holdings.balance0).await?;

        let (tick_lower, tick_upper) = if mint_tick == tick {
            (decision.new_tick_lower, decision.new_tick_upper)
        } else {
            tick_math::range_around(mint_tick, self.config.range_half_width, self.pool.tick_spacing())
        };
        self.check_range(tick_lower, tick_upper)?;
        if holdings.balance0.is_zero() && holdings.balance1.is_zero() {
            return Err(RebalanceError::InvariantViolation(
                "wallet holds neither pool token, nothing to mint".to_string(),
            ));
        }

        let request = MintRequest {
            token0: self.pool.token0().address,
            token1: self.pool.token1().address,
            fee: self.pool.fee(),
            tick_lower,
            tick_upper,
            amount0_desired: holdings.balance0,
            amount1_desired: holdings.balance1,
            amount0_min: U256::ZERO,
            amount1_min: U256::ZERO,
            recipient: self.chain.wallet_address(),
            deadline: self.deadline(),
        };
        let position_id = self.chain.mint(&request).await?;
        info!(%position_id, tick = mint_tick, tick_lower, tick_upper, "position opened");
        Ok(position_id)
    }

    async fn execute_swap(&mut self, plan: &SwapPlan, holdings: &WalletHoldings) -> Result<()> {
        let available = holdings.balance_of(&self.pool, plan.token_in);
        if plan.amount_in > available {
            return Err(RebalanceError::InvariantViolation(format!(
                "swap input {} exceeds balance {}",
                plan.amount_in, available
            )));
        }
        let router = self.chain.router_address();
        self.chain.ensure_allowance(plan.token_in, router).await?;

        let swap = ExactInputSingle {
            token_in: plan.token_in,
            token_out: plan.token_out,
            fee: self.pool.fee(),
            recipient: self.chain.wallet_address(),
            amount_in: plan.amount_in,
            amount_out_minimum: min_amount_out(
                plan.expected_amount_out,
                self.config.swap.max_slippage_bps,
            ),
            sqrt_price_limit_x96: U256::ZERO,
        };
        self.chain.exact_input_single(&swap).await?;
        info!(
            direction = ?plan.direction,
            amount_in = %plan.amount_in,
            expected_out = %plan.expected_amount_out,
            min_out = %swap.amount_out_minimum,
            "swap executed"
        );
        Ok(())
    }

    /// The pool tick only says something about positions of this pool; anything else is
    /// left alone.
    fn ensure_managed_pool(&self, position: &PositionData) -> Result<()> {
        if position.token0 != self.pool.token0().address
            || position.token1 != self.pool.token1().address
            || position.fee != self.pool.fee()
        {
            return Err(RebalanceError::InvariantViolation(format!(
                "position {} is in pool {}/{} fee {}, not the managed {} fee {}",
                position.token_id,
                position.token0,
                position.token1,
                position.fee,
                self.pool.pair_name(),
                self.pool.fee()
            )));
        }
        Ok(())
    }

    fn check_range(&self, tick_lower: i32, tick_upper: i32) -> Result<()> {
        let spacing = self.pool.tick_spacing();
        if tick_lower >= tick_upper || tick_lower % spacing != 0 || tick_upper % spacing != 0 {
            return Err(RebalanceError::InvariantViolation(format!(
                "range [{tick_lower}, {tick_upper}] is not an ordered pair of multiples of {spacing}"
            )));
        }
        Ok(())
    }

    /// Token0 exposure is the wallet balance plus whatever the live position would
    /// release.
    async fn sync_hedge(&mut self, position_id: Option<U256>) -> Result<()> {
        let holdings = self.chain.balances().await?;
        let mut exposure0 = holdings.balance0;
        if let Some(position_id) = position_id {
            let amounts = self.chain.position_amounts(position_id).await?;
            exposure0 += amounts.withdrawable_amount0 + amounts.collectable_amount0;
        }
        self.hedge_exposure(exposure0).await
    }

    async fn hedge_exposure(&mut self, token0_amount: U256) -> Result<()> {
        let instrument = self.config.hedge.instrument.clone();
        let margin_mode = self.config.hedge.margin_mode;
        let amount = u256_to_f64(token0_amount, self.pool.token0().decimals);
        let target = hedge::target_hedge_size(
            amount,
            self.config.hedge.hedge_ratio,
            self.config.hedge.units_per_token0,
        );
        let current = self.hedge.get_position(&instrument).await?;
        let Some(order) =
            hedge::hedge_order(current.signed_size(), target, self.config.hedge.size_step)
        else {
            debug!(%instrument, current = current.signed_size(), target, "hedge on target");
            return Ok(());
        };

        if !self.leverage_applied {
            self.hedge
                .set_leverage(&instrument, self.config.hedge.leverage, margin_mode)
                .await?;
            self.leverage_applied = true;
        }
        info!(
            %instrument,
            current = current.signed_size(),
            target,
            side = order.side.as_str(),
            size = order.size,
            "adjusting hedge"
        );
        self.hedge
            .submit_market_order(&instrument, order.side, order.size, margin_mode)
            .await
    }

    fn deadline(&self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        now + self.config.tx_deadline_secs
    }
}
