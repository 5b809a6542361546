//! # Revenue-Sharing Calculator
//!
//! Splits a line total between the employee who performed it and the owner.
//!
//! ```text
//!   commission = round2(total × rate / 100)
//!   owner      = round2(total) − commission      ← remainder, never rounded
//! ```
//!
//! Because the owner share is a remainder, `commission + owner == total`
//! holds to the cent for every rate. A category's stored owner percentage
//! is never consulted. Where the rate comes from (category default or an
//! employee override) is decided by [`crate::roles::RateBook`].

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::validation::is_valid_rate;

/// Employee and owner shares of one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RevenueSplit {
    pub commission_amount: Money,
    pub owner_amount: Money,
}

/// Splits `line_total` at `rate_percent` for the employee.
///
/// ## Errors
/// `InvalidRate` if the rate is outside `0..=100`. Callers accepting raw
/// input clamp first with [`crate::validation::clamp_rate`].
pub fn split(line_total: Money, rate_percent: Decimal) -> CoreResult<RevenueSplit> {
    if !is_valid_rate(rate_percent) {
        return Err(CoreError::InvalidRate(rate_percent));
    }

    let commission_amount = line_total.percent(rate_percent);
    Ok(RevenueSplit {
        commission_amount,
        owner_amount: line_total - commission_amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_shampoo_split() {
        let shares = split(Money::from_cents(5000), dec!(95)).unwrap();
        assert_eq!(shares.commission_amount, Money::from_cents(4750));
        assert_eq!(shares.owner_amount, Money::from_cents(250));
    }

    #[test]
    fn test_rounding_goes_to_commission_remainder_to_owner() {
        // $10.01 × 33.33% = 3.336333 → 3.34, owner keeps 6.67
        let shares = split(Money::from_cents(1001), dec!(33.33)).unwrap();
        assert_eq!(shares.commission_amount, Money::from_cents(334));
        assert_eq!(shares.owner_amount, Money::from_cents(667));
    }

    #[test]
    fn test_bounds() {
        let all = split(Money::from_cents(1234), dec!(100)).unwrap();
        assert_eq!(all.commission_amount, Money::from_cents(1234));
        assert!(all.owner_amount.is_zero());

        let none = split(Money::from_cents(1234), dec!(0)).unwrap();
        assert!(none.commission_amount.is_zero());
        assert_eq!(none.owner_amount, Money::from_cents(1234));
    }

    #[test]
    fn test_out_of_range_rate_rejected() {
        assert_eq!(
            split(Money::from_cents(100), dec!(100.5)),
            Err(CoreError::InvalidRate(dec!(100.5)))
        );
        assert!(split(Money::from_cents(100), dec!(-1)).is_err());
    }

    proptest! {
        #[test]
        fn prop_split_reconciles_exactly(cents in 0i64..=1_000_000, rate_hundredths in 0i64..=10_000) {
            let total = Money::from_cents(cents);
            let rate = Decimal::new(rate_hundredths, 2);
            let shares = split(total, rate).unwrap();

            prop_assert_eq!(shares.commission_amount + shares.owner_amount, total);
            prop_assert!(!shares.commission_amount.is_negative());
            prop_assert!(!shares.owner_amount.is_negative());
        }
    }
}
