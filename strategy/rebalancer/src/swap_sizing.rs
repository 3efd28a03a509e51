//! Sizing of the single swap that moves wallet holdings toward a target value split.

use alloy::primitives::U256;
use utils::{f64_to_u256, u256_to_f64};

use crate::types::{Pool, SwapDirection, SwapPlan, WalletHoldings};

/// Share of the total value that should sit in token0 when token0 and token1 are held in
/// the value ratio `token0_value_ratio : 1`.
pub fn ratio_weight(token0_value_ratio: f64) -> f64 {
    token0_value_ratio / (1.0 + token0_value_ratio)
}

/// Plans the swap that brings `holdings` to `ratio_weight` of total value in token0.
///
/// `price` is token0 in token1 human units. Returns `None` when the wallet is already on
/// target, when the price is unusable, or when the input amount falls below the minimum
/// trade size of the input token (`min_amount_in0` / `min_amount_in1`, native units).
/// The input amount never exceeds the wallet's balance of the input token. The expected
/// output is net of the pool's swap fee.
pub fn plan_swap(
    pool: &Pool,
    holdings: &WalletHoldings,
    price: f64,
    ratio_weight: f64,
    min_amount_in0: U256,
    min_amount_in1: U256,
) -> Option<SwapPlan> {
    if !price.is_finite() || price <= 0.0 {
        return None;
    }
    let decimals0 = pool.token0().decimals;
    let decimals1 = pool.token1().decimals;
    let fee_factor = 1.0 - pool.fee() as f64 / 1_000_000.0;

    let value0 = u256_to_f64(holdings.balance0, decimals0) * price;
    let value1 = u256_to_f64(holdings.balance1, decimals1);
    let total_value = value0 + value1;
    let target_value0 = total_value * ratio_weight;
    let target_value1 = total_value - target_value0;

    let plan = if value0 > target_value0 {
        let amount = (value0 - target_value0) / price;
        SwapPlan {
            direction: SwapDirection::Token0ToToken1,
            token_in: pool.token0().address,
            token_out: pool.token1().address,
            amount_in: f64_to_u256(amount, decimals0).min(holdings.balance0),
            expected_amount_out: f64_to_u256(amount * price * fee_factor, decimals1),
        }
    } else if value1 > target_value1 {
        let amount = value1 - target_value1;
        SwapPlan {
            direction: SwapDirection::Token1ToToken0,
            token_in: pool.token1().address,
            token_out: pool.token0().address,
            amount_in: f64_to_u256(amount, decimals1).min(holdings.balance1),
            expected_amount_out: f64_to_u256(amount / price * fee_factor, decimals0),
        }
    } else {
        return None;
    };

    let threshold = match plan.direction {
        SwapDirection::Token0ToToken1 => min_amount_in0,
        SwapDirection::Token1ToToken0 => min_amount_in1,
    };
    if plan.amount_in.is_zero() || plan.amount_in < threshold {
        return None;
    }
    Some(plan)
}

/// Lower bound on the swap output for a slippage tolerance in basis points; `None` means
/// no bound at all.
pub fn min_amount_out(expected_amount_out: U256, max_slippage_bps: Option<u32>) -> U256 {
    match max_slippage_bps {
        Some(bps) => {
            let keep = 10_000u32.saturating_sub(bps);
            expected_amount_out * U256::from(keep) / U256::from(10_000u32)
        }
        None => U256::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{usdc as usdc_token, weth, weth_usdc_pool};
    use crate::types::Pool;

    fn eth(amount: f64) -> U256 {
        f64_to_u256(amount, 18)
    }

    fn usdc(amount: f64) -> U256 {
        f64_to_u256(amount, 6)
    }

    #[test]
    fn sells_excess_token0_toward_even_split() {
        let pool = weth_usdc_pool();
        // 150 of value in WETH at 2000, 50 in USDC
        let holdings = WalletHoldings {
            balance0: eth(0.075),
            balance1: usdc(50.0),
        };
        let plan = plan_swap(&pool, &holdings, 2000.0, 0.5, U256::ZERO, U256::ZERO).unwrap();
        assert_eq!(plan.direction, SwapDirection::Token0ToToken1);
        assert_eq!(plan.token_in, pool.token0().address);

        let sold_value = u256_to_f64(plan.amount_in, 18) * 2000.0;
        assert!((sold_value - 50.0).abs() < 1e-6, "sold value {sold_value}");
        // 0.05% fee tier
        let expected_out = u256_to_f64(plan.expected_amount_out, 6);
        assert!((expected_out - 49.975).abs() < 1e-5, "expected out {expected_out}");
    }

    #[test]
    fn sells_excess_token1() {
        let pool = weth_usdc_pool();
        let holdings = WalletHoldings {
            balance0: U256::ZERO,
            balance1: usdc(1000.0),
        };
        let plan = plan_swap(&pool, &holdings, 2000.0, 0.5, U256::ZERO, U256::ZERO).unwrap();
        assert_eq!(plan.direction, SwapDirection::Token1ToToken0);
        assert_eq!(plan.amount_in, usdc(500.0));
        assert_eq!(plan.expected_amount_out, eth(0.25 * (1.0 - 500.0 / 1_000_000.0)));
    }

    #[test]
    fn skips_swap_below_minimum() {
        let pool = weth_usdc_pool();
        let holdings = WalletHoldings {
            balance0: eth(0.075),
            balance1: usdc(50.0),
        };
        // the plan would sell 0.025 WETH; require at least 0.03
        let plan = plan_swap(&pool, &holdings, 2000.0, 0.5, eth(0.03), U256::ZERO);
        assert!(plan.is_none());
    }

    #[test]
    fn balanced_wallet_needs_no_swap() {
        let pool = weth_usdc_pool();
        let holdings = WalletHoldings {
            balance0: eth(0.05),
            balance1: usdc(100.0),
        };
        assert!(plan_swap(&pool, &holdings, 2000.0, 0.5, eth(0.0001), usdc(0.01)).is_none());
    }

    #[test]
    fn amount_in_never_exceeds_balance() {
        let pool = weth_usdc_pool();
        let holdings = WalletHoldings {
            balance0: eth(1.0),
            balance1: U256::ZERO,
        };
        let plan = plan_swap(&pool, &holdings, 2000.0, 0.0, U256::ZERO, U256::ZERO).unwrap();
        assert!(plan.amount_in <= holdings.balance0);
    }

    #[test]
    fn weight_from_value_ratio() {
        assert!((ratio_weight(1.0) - 0.5).abs() < f64::EPSILON);
        assert!((ratio_weight(0.98) - 0.98 / 1.98).abs() < f64::EPSILON);
    }

    #[test]
    fn slippage_bound() {
        let expected = U256::from(1_000_000u64);
        assert_eq!(min_amount_out(expected, Some(50)), U256::from(995_000u64));
        assert_eq!(min_amount_out(expected, None), U256::ZERO);
    }

    #[test]
    fn default_slippage_bound_is_reachable_on_every_fee_tier() {
        for fee in [500u32, 3000, 10_000] {
            let pool = Pool::new(weth(), usdc_token(), fee, None).unwrap();
            let price = pool.price_at(-197_013);
            let holdings = WalletHoldings {
                balance0: eth(1.0),
                balance1: U256::ZERO,
            };
            let plan = plan_swap(&pool, &holdings, price, 0.5, U256::ZERO, U256::ZERO).unwrap();

            // what the pool pays with zero price impact after taking its fee
            let net_in = u256_to_f64(plan.amount_in, 18) * (1.0 - fee as f64 / 1_000_000.0);
            let best_possible_out = f64_to_u256(net_in * price, 6);
            let min_out = min_amount_out(plan.expected_amount_out, Some(50));

            assert!(
                min_out < best_possible_out,
                "fee {fee}: min out {min_out} vs best {best_possible_out}"
            );
            assert!(plan.expected_amount_out <= best_possible_out + U256::from(1u8));
        }
    }
}
