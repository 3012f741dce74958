//! Fixed-point price representation used as the order-book map key.
//!
//! The source keyed price levels by `float64` directly (§9, a documented
//! hazard). `Ticks` scales a `Decimal` price into an `i64` integer so two
//! equal prices always compare equal, the way the teacher's
//! `PriceLevel::from_decimal` does for its own price type.

use rust_decimal::Decimal;
use std::cmp::Ordering;

/// Scale factor: 8 decimal places, matching the teacher's `PriceLevel`.
const SCALE: i64 = 100_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticks(i64);

impl Ticks {
    pub fn from_decimal(price: Decimal) -> Self {
        let scaled = (price * Decimal::from(SCALE)).trunc();
        Ticks(scaled.mantissa() as i64 / 10i64.pow(scaled.scale()))
    }

    pub fn to_decimal(self) -> Decimal {
        Decimal::from(self.0) / Decimal::from(SCALE)
    }
}

impl Ord for Ticks {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl PartialOrd for Ticks {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn round_trips_through_decimal() {
        let price = dec!(97500.50);
        assert_eq!(Ticks::from_decimal(price).to_decimal(), price);
    }

    #[test]
    fn orders_by_scaled_value() {
        let a = Ticks::from_decimal(dec!(100.0));
        let b = Ticks::from_decimal(dec!(100.01));
        assert!(a < b);
    }

    #[test]
    fn equal_prices_compare_equal() {
        let a = Ticks::from_decimal(dec!(50));
        let b = Ticks::from_decimal(dec!(50.00));
        assert_eq!(a, b);
    }
}
