//! # Money Module
//!
//! Fixed-precision monetary arithmetic shared by every calculation in the
//! settlement pipeline.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  A commission of 95% on $25.00 × 2 repeated over a day of sales drifts  │
//! │  by fractions of a cent on every line.                                  │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents + one rounding gate                        │
//! │    Intermediate products (qty × unit cost, total × rate) are exact      │
//! │    decimals; they become Money only through `round2`.                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use rust_decimal::Decimal;
//! use salon_core::money::{round2, Money};
//!
//! let price = Money::from_cents(2500); // $25.00
//! let line_total = price.multiply_quantity(2); // $50.00
//!
//! // 95% commission, rounded once on the cent boundary
//! let commission = line_total.percent(Decimal::from(95));
//! assert_eq!(commission.cents(), 4750);
//!
//! assert_eq!(round2(Decimal::new(12345, 3)), Decimal::new(1235, 2)); // 12.345 → 12.35
//! ```

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::types::TaxRate;

// =============================================================================
// Rounding
// =============================================================================

/// Rounds a decimal amount to 2 places, half away from zero.
///
/// For the non-negative amounts produced by sales and costing this is
/// standard half-up rounding on the cent boundary:
/// ```text
///   12.344 → 12.34
///   12.345 → 12.35
///    0.005 →  0.01
/// ```
///
/// Every money-producing operation in this crate passes its final value
/// through here before it is stored or displayed.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: Allows negative values for reversals and adjustments
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Serde**: serializes as the raw cent count
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Item.price ──► SaleItem.total ──┬──► commission_amount (employee)     │
/// │                                  └──► owner_amount (remainder)          │
/// │                                                                         │
/// │  InventoryBatch.unit_cost ──► UsedBatch.total_cost ──► cogs_total       │
/// │                                                                         │
/// │  Sale.subtotal ──► Tax ──► Sale.total                                   │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ## Example
    /// ```rust
    /// use salon_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // $10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from whole currency units.
    #[inline]
    pub const fn from_major(major: i64) -> Self {
        Money(major * 100)
    }

    /// Converts an exact decimal amount into Money via [`round2`].
    ///
    /// Values beyond the i64 cent range saturate.
    ///
    /// ## Example
    /// ```rust
    /// use rust_decimal::Decimal;
    /// use salon_core::money::Money;
    ///
    /// let m = Money::from_decimal(Decimal::new(26667, 3)); // 26.667
    /// assert_eq!(m.cents(), 2667);
    /// ```
    pub fn from_decimal(value: Decimal) -> Self {
        let cents = round2(value) * Decimal::ONE_HUNDRED;
        match cents.to_i64() {
            Some(c) => Money(c),
            None if cents.is_sign_negative() => Money(i64::MIN),
            None => Money(i64::MAX),
        }
    }

    /// Returns the exact decimal value (e.g. `10.99`).
    #[inline]
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit (dollars) portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit (cents) portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Calculates tax on this amount, rounding half-up on the cent.
    ///
    /// ## Implementation
    /// Integer math: `(amount * bps + 5000) / 10000`.
    /// The +5000 provides rounding (5000/10000 = 0.5).
    ///
    /// ## Example
    /// ```rust
    /// use salon_core::money::Money;
    /// use salon_core::types::TaxRate;
    ///
    /// let subtotal = Money::from_cents(5000); // $50.00
    /// let tax = subtotal.calculate_tax(TaxRate::from_bps(1000)); // 10%
    /// assert_eq!(tax.cents(), 500);
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        // i128 prevents overflow on large amounts
        let tax_cents = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money::from_cents(tax_cents as i64)
    }

    /// Multiplies money by an integer quantity (exact, no rounding needed).
    ///
    /// ## Example
    /// ```rust
    /// use salon_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(2500);
    /// assert_eq!(unit_price.multiply_quantity(2).cents(), 5000);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Multiplies money by a fractional quantity, rounding the product once.
    ///
    /// Used for `consumed × unit_cost` when weighted-average draining leaves
    /// fractional quantities on a batch.
    pub fn multiply_decimal(&self, qty: Decimal) -> Self {
        Money::from_decimal(self.to_decimal() * qty)
    }

    /// Applies a percentage (`0..=100`, may be fractional) and rounds.
    ///
    /// `amount × rate / 100`, then [`round2`].
    pub fn percent(&self, rate_percent: Decimal) -> Self {
        Money::from_decimal(self.to_decimal() * rate_percent / Decimal::ONE_HUNDRED)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Human-readable format for logs and receipts.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}${}.{:02}",
            sign,
            self.dollars().abs(),
            self.cents_part()
        )
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + *m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
