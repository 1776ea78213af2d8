//! Common utility functions for yield calculations and display rounding.

use rust_decimal::{Decimal, RoundingStrategy};

/// Rounds a decimal value to `dp` decimal places, resolving midpoints away
/// from zero.
///
/// This is the rounding used when rendering rates and percentages, so that
/// `0.05` shown with one fraction digit becomes `0.1`.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use mill_core::calculations::common::round_half_up;
///
/// assert_eq!(round_half_up(dec!(74.94), 1), dec!(74.9));
/// assert_eq!(round_half_up(dec!(74.95), 1), dec!(75.0));
/// assert_eq!(round_half_up(dec!(-74.95), 1), dec!(-75.0)); // Away from zero
/// ```
pub fn round_half_up(
    value: Decimal,
    dp: u32,
) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

/// Multiplies two decimals, returning `None` instead of panicking on
/// overflow.
pub fn checked_product(
    a: Decimal,
    b: Decimal,
) -> Option<Decimal> {
    a.checked_mul(b)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    // =========================================================================
    // round_half_up tests
    // =========================================================================

    #[test]
    fn round_half_up_rounds_down_below_midpoint() {
        assert_eq!(round_half_up(dec!(123.44), 1), dec!(123.4));
    }

    #[test]
    fn round_half_up_rounds_up_at_midpoint() {
        assert_eq!(round_half_up(dec!(123.45), 1), dec!(123.5));
    }

    #[test]
    fn round_half_up_handles_negative_values() {
        assert_eq!(round_half_up(dec!(-123.45), 1), dec!(-123.5));
    }

    #[test]
    fn round_half_up_to_whole_units() {
        assert_eq!(round_half_up(dec!(539.5), 0), dec!(540));
        assert_eq!(round_half_up(dec!(539.49), 0), dec!(539));
    }

    #[test]
    fn round_half_up_keeps_repeating_fraction_finite() {
        let third = dec!(100) / dec!(3);

        assert_eq!(round_half_up(third, 1), dec!(33.3));
    }

    // =========================================================================
    // checked_product tests
    // =========================================================================

    #[test]
    fn checked_product_multiplies() {
        assert_eq!(checked_product(dec!(1.5), dec!(360)), Some(dec!(540)));
    }

    #[test]
    fn checked_product_reports_overflow() {
        assert_eq!(checked_product(Decimal::MAX, dec!(360)), None);
    }
}
