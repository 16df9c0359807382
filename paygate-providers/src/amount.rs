//! Fixed-point amount formatting and precision checks
//!
//! Every amount reaches the signer as text, so the formatting chosen here is
//! part of each provider's signing contract.

use rust_decimal::{Decimal, RoundingStrategy};

/// Format with exactly `scale` decimal places, rounding half away from zero
pub fn format_fixed(amount: Decimal, scale: u32) -> String {
    format_with(amount, scale, RoundingStrategy::MidpointAwayFromZero)
}

/// Format with exactly `scale` decimal places, rounding half to even
pub fn format_fixed_bank(amount: Decimal, scale: u32) -> String {
    format_with(amount, scale, RoundingStrategy::MidpointNearestEven)
}

fn format_with(amount: Decimal, scale: u32, strategy: RoundingStrategy) -> String {
    let mut rounded = amount.round_dp_with_strategy(scale, strategy);
    rounded.rescale(scale);
    rounded.to_string()
}

/// Whether the amount has no fractional part
pub fn is_integer(amount: Decimal) -> bool {
    amount.fract().is_zero()
}

/// Whether the amount can be written with at most `scale` decimal places
pub fn fits_scale(amount: Decimal, scale: u32) -> bool {
    amount.round_dp_with_strategy(scale, RoundingStrategy::ToZero) == amount
}

pub fn is_positive(amount: Decimal) -> bool {
    amount > Decimal::ZERO
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_format_fixed_pads_and_rounds() {
        assert_eq!(format_fixed(d("10"), 2), "10.00");
        assert_eq!(format_fixed(d("1.005"), 2), "1.01");
        assert_eq!(format_fixed(d("1.5"), 0), "2");
        assert_eq!(format_fixed(d("100.000"), 0), "100");
    }

    #[test]
    fn test_format_fixed_bank() {
        assert_eq!(format_fixed_bank(d("1.005"), 2), "1.00");
        assert_eq!(format_fixed_bank(d("1.015"), 2), "1.02");
        assert_eq!(format_fixed_bank(d("7"), 2), "7.00");
    }

    #[test]
    fn test_precision_checks() {
        assert!(is_integer(d("100.00")));
        assert!(!is_integer(d("100.5")));
        assert!(fits_scale(d("1.25"), 2));
        assert!(!fits_scale(d("1.255"), 2));
        assert!(fits_scale(d("3"), 0));
        assert!(is_positive(d("0.01")));
        assert!(!is_positive(Decimal::ZERO));
    }
}
