//! Hedge sizing: how far the derivatives position is from delta-neutral, and the single
//! order that closes the gap.

use clients_binance::OrderSide;

/// A market order that moves the hedge to its target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HedgeOrder {
    pub side: OrderSide,
    /// Absolute size, a multiple of the venue's size step
    pub size: f64,
}

impl HedgeOrder {
    /// Change in signed hedge size this order produces.
    pub fn signed_size(&self) -> f64 {
        match self.side {
            OrderSide::Buy => self.size,
            OrderSide::Sell => -self.size,
        }
    }
}

/// Signed hedge size for a spot holding: a long spot position is hedged with a short.
pub fn target_hedge_size(token0_amount: f64, hedge_ratio: f64, units_per_token0: f64) -> f64 {
    -hedge_ratio * token0_amount * units_per_token0
}

/// The one order that takes the hedge from `current` to `target`, or `None` when the
/// difference rounds to zero at `size_step`.
pub fn hedge_order(current: f64, target: f64, size_step: f64) -> Option<HedgeOrder> {
    let difference = round_to_step(target - current, size_step);
    if difference == 0.0 || !difference.is_finite() {
        return None;
    }
    let side = if difference > 0.0 {
        OrderSide::Buy
    } else {
        OrderSide::Sell
    };
    Some(HedgeOrder {
        side,
        size: difference.abs(),
    })
}

/// Rounds a value to the nearest multiple of step.
pub fn round_to_step(value: f64, step: f64) -> f64 {
    if step <= 0.0 {
        return value;
    }
    let rounded = (value / step).round() * step;
    // strip float noise such as 1.9999999999999998 so formatting stays exact
    let decimals = step_decimals(step) as i32;
    let scale = 10_f64.powi(decimals);
    (rounded * scale).round() / scale
}

/// Formats a quantity with decimal places derived from step.
pub fn format_quantity(quantity: f64, step: f64) -> String {
    format!("{:.prec$}", quantity, prec = step_decimals(step))
}

fn step_decimals(step: f64) -> usize {
    if step >= 1.0 || step <= 0.0 {
        0
    } else {
        (1.0_f64 / step).log10().ceil().max(0.0) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widening_short_is_one_sell_order() {
        let order = hedge_order(-8.0, -10.0, 0.01).unwrap();
        assert_eq!(order.side, OrderSide::Sell);
        assert_eq!(order.size, 2.0);
        assert_eq!(order.signed_size(), -2.0);
    }

    #[test]
    fn reducing_short_buys_back() {
        let order = hedge_order(-10.0, -7.5, 0.1).unwrap();
        assert_eq!(order.side, OrderSide::Buy);
        assert_eq!(order.size, 2.5);
    }

    #[test]
    fn difference_below_half_step_is_ignored() {
        assert!(hedge_order(-10.0, -10.004, 0.01).is_none());
        assert!(hedge_order(0.0, 0.0, 0.01).is_none());
    }

    #[test]
    fn target_is_opposite_of_spot() {
        assert_eq!(target_hedge_size(2.5, 1.0, 1.0), -2.5);
        // 0.1 ETH contracts: 1 ETH spot is ten contracts short
        assert_eq!(target_hedge_size(1.0, 1.0, 10.0), -10.0);
        assert_eq!(target_hedge_size(0.0, 1.0, 1.0), 0.0);
    }

    #[test]
    fn quantity_formatting_follows_step() {
        assert_eq!(format_quantity(2.0, 0.001), "2.000");
        assert_eq!(format_quantity(3.0, 1.0), "3");
        assert_eq!(round_to_step(1.23456, 0.01), 1.23);
    }
}
