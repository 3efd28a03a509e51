//! Conversions between prices, ticks and tick-spacing-aligned range boundaries.

/// Lowest tick the AMM can represent.
pub const MIN_TICK: i32 = -887272;
/// Highest tick the AMM can represent.
pub const MAX_TICK: i32 = 887272;

const TICK_BASE: f64 = 1.0001;

/// Standard tick spacing for each fee tier (hundredths of a bip).
pub fn tick_spacing_for_fee(fee: u32) -> Option<i32> {
    match fee {
        100 => Some(1),
        500 => Some(10),
        3000 => Some(60),
        10000 => Some(200),
        _ => None,
    }
}

/// Price of token0 denominated in token1, in human units:
/// `1.0001^tick * 10^(decimals0 - decimals1)`.
pub fn price_from_tick(tick: i32, decimals0: u8, decimals1: u8) -> f64 {
    let decimal_adjustment = 10_f64.powi(decimals0 as i32 - decimals1 as i32);
    TICK_BASE.powi(tick) * decimal_adjustment
}

/// Inverse of [`price_from_tick`], rounded down to the tick at or below `price`.
pub fn tick_from_price(price: f64, decimals0: u8, decimals1: u8) -> Option<i32> {
    if !price.is_finite() || price <= 0.0 {
        return None;
    }
    let raw_price = price / 10_f64.powi(decimals0 as i32 - decimals1 as i32);
    let tick = (raw_price.ln() / TICK_BASE.ln()).floor();
    Some(tick.clamp(MIN_TICK as f64, MAX_TICK as f64) as i32)
}

/// Smallest and largest multiples of `spacing` inside `[MIN_TICK, MAX_TICK]`.
pub fn usable_tick_bounds(spacing: i32) -> (i32, i32) {
    let spacing = spacing as i64;
    let min = (MIN_TICK as i64).div_euclid(spacing) * spacing;
    let min = if min < MIN_TICK as i64 { min + spacing } else { min };
    let max = (MAX_TICK as i64).div_euclid(spacing) * spacing;
    (min as i32, max as i32)
}

/// Rounds `raw_tick` to the nearest multiple of `spacing` that the AMM can represent.
///
/// Ties round toward zero, and values beyond the usable bounds are clamped, so the
/// function is idempotent. `spacing` must be positive.
pub fn valid_tick(raw_tick: i32, spacing: i32) -> i32 {
    assert!(spacing > 0, "tick spacing must be positive");
    let raw = raw_tick as i64;
    let step = spacing as i64;

    let below = raw.div_euclid(step) * step;
    let above = below + step;
    let offset = raw - below;

    let rounded = match (2 * offset).cmp(&step) {
        std::cmp::Ordering::Less => below,
        std::cmp::Ordering::Greater => above,
        // halfway: pick the candidate closer to zero
        std::cmp::Ordering::Equal => {
            if raw > 0 {
                below
            } else {
                above
            }
        }
    };

    let (min, max) = usable_tick_bounds(spacing);
    rounded.clamp(min as i64, max as i64) as i32
}

/// Range boundaries `tick ± half_width`, each aligned through [`valid_tick`].
///
/// The result always satisfies `lower < upper`: if alignment collapses the range it is
/// widened by one spacing.
pub fn range_around(tick: i32, half_width: i32, spacing: i32) -> (i32, i32) {
    let lower = valid_tick(tick.saturating_sub(half_width), spacing);
    let upper = valid_tick(tick.saturating_add(half_width), spacing);
    if lower < upper {
        return (lower, upper);
    }
    let (min, max) = usable_tick_bounds(spacing);
    if lower + spacing <= max {
        (lower, lower + spacing)
    } else {
        (max - spacing.min(max - min), max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn price_at_zero_tick_is_decimal_adjustment() {
        assert_eq!(price_from_tick(0, 18, 18), 1.0);
        assert!((price_from_tick(0, 18, 6) - 1e12).abs() < 1e-3);
    }

    #[test]
    fn price_matches_weth_usdc_scale() {
        // tick around -197000 is roughly 2,770 USDC per WETH
        let price = price_from_tick(-197_000, 18, 6);
        assert!(price > 2_700.0 && price < 2_850.0, "price {price}");
        let tick = tick_from_price(price, 18, 6).unwrap();
        assert!((tick - -197_000).abs() <= 1, "tick {tick}");
    }

    #[test]
    fn rounds_to_nearest_multiple() {
        assert_eq!(valid_tick(14, 10), 10);
        assert_eq!(valid_tick(16, 10), 20);
        assert_eq!(valid_tick(-14, 10), -10);
        assert_eq!(valid_tick(-16, 10), -20);
        assert_eq!(valid_tick(-197_123, 60), -197_100);
    }

    #[test]
    fn ties_round_toward_zero() {
        assert_eq!(valid_tick(15, 10), 10);
        assert_eq!(valid_tick(-15, 10), -10);
        assert_eq!(valid_tick(30, 60), 0);
        assert_eq!(valid_tick(-30, 60), 0);
    }

    #[test]
    fn clamps_to_usable_range() {
        assert_eq!(valid_tick(MAX_TICK, 60), 887_220);
        assert_eq!(valid_tick(MIN_TICK, 60), -887_220);
        assert_eq!(valid_tick(i32::MAX, 200), 887_200);
        assert_eq!(valid_tick(i32::MIN, 200), -887_200);
        assert_eq!(valid_tick(MAX_TICK, 1), MAX_TICK);
    }

    #[test]
    fn range_is_centered_and_aligned() {
        let (lower, upper) = range_around(-197_013, 250, 10);
        assert_eq!((lower, upper), (-197_260, -196_760));
        assert!(lower <= -197_013 && -197_013 <= upper);
    }

    #[test]
    fn collapsed_range_is_widened() {
        let (lower, upper) = range_around(0, 1, 60);
        assert_eq!((lower, upper), (0, 60));
        let (lower, upper) = range_around(MAX_TICK, 1, 60);
        assert_eq!((lower, upper), (887_160, 887_220));
    }

    proptest! {
        #[test]
        fn valid_tick_is_idempotent(tick in any::<i32>(), spacing in 1i32..=1000) {
            let once = valid_tick(tick, spacing);
            prop_assert_eq!(valid_tick(once, spacing), once);
            prop_assert_eq!(once % spacing, 0);
        }

        #[test]
        fn range_bounds_are_ordered_multiples(
            tick in MIN_TICK..=MAX_TICK,
            half_width in 1i32..=5000,
            spacing in prop::sample::select(vec![1, 10, 60, 200]),
        ) {
            let (lower, upper) = range_around(tick, half_width, spacing);
            prop_assert!(lower < upper);
            prop_assert_eq!(lower % spacing, 0);
            prop_assert_eq!(upper % spacing, 0);
            prop_assert!(lower >= MIN_TICK && upper <= MAX_TICK);
        }
    }
}
