//! Shared utilities for the rebalancer workspace.

use alloy::primitives::U256;

/// Converts a U256 value to f64, accounting for token decimals.
///
/// Values larger than `u128::MAX` saturate; this is acceptable for f64 precision.
pub fn u256_to_f64(value: U256, decimals: u8) -> f64 {
    let value_u128 = value.saturating_to::<u128>();
    let divisor = 10_u128.pow(decimals as u32);
    let whole_part = value_u128 / divisor;
    let fractional_part = value_u128 % divisor;
    whole_part as f64 + (fractional_part as f64 / divisor as f64)
}

/// Converts a human-unit amount into the token's native integer units.
///
/// Negative and non-finite inputs map to zero; the result is rounded to the nearest unit.
pub fn f64_to_u256(value: f64, decimals: u8) -> U256 {
    if !value.is_finite() || value <= 0.0 {
        return U256::ZERO;
    }
    let scaled = (value * 10_f64.powi(decimals as i32)).round();
    if scaled >= u128::MAX as f64 {
        return U256::from(u128::MAX);
    }
    U256::from(scaled as u128)
}

/// Formats a native-unit amount with a fixed number of decimals, without going through f64.
pub fn format_units(value: U256, decimals: u8) -> String {
    if decimals == 0 {
        return value.to_string();
    }
    let divisor = U256::from(10u64).pow(U256::from(decimals));
    let (integer, frac) = value.div_rem(divisor);
    format!("{}.{:0>width$}", integer, frac, width = decimals as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_native_units_to_float() {
        let one_and_half_eth = U256::from(1_500_000_000_000_000_000u128);
        assert_eq!(u256_to_f64(one_and_half_eth, 18), 1.5);
        assert_eq!(u256_to_f64(U256::from(2_500_000u64), 6), 2.5);
    }

    #[test]
    fn converts_float_to_native_units() {
        assert_eq!(f64_to_u256(2.5, 6), U256::from(2_500_000u64));
        assert_eq!(f64_to_u256(-1.0, 18), U256::ZERO);
        assert_eq!(f64_to_u256(f64::NAN, 18), U256::ZERO);
    }

    #[test]
    fn formats_units_with_padding() {
        assert_eq!(format_units(U256::from(1_000_050u64), 6), "1.000050");
        assert_eq!(format_units(U256::from(5u64), 2), "0.05");
        assert_eq!(format_units(U256::from(42u64), 0), "42");
    }
}
