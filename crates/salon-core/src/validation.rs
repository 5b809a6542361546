//! # Validation Module
//!
//! Input validation utilities for salon-core.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Back-office forms                                            │
//! │  ├── Basic format checks, rate sliders clamped to 0..100               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Quantities, costs, rates, identifiers                             │
//! │  └── clamp_rate() for every entry point accepting a raw rate           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite CHECK / NOT NULL / FK constraints)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use salon_core::validation::{validate_quantity, validate_required};
//!
//! validate_quantity(2).unwrap();
//! assert!(validate_required("employee_id", "").is_err());
//! ```

use rust_decimal::Decimal;

use crate::error::ValidationError;
use crate::money::Money;
use crate::{MAX_CART_LINES, MAX_LINE_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates that an identifier-like field is present.
///
/// Whitespace-only values count as missing.
pub fn validate_required(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates a display name (item, category, employee).
///
/// ## Rules
/// - Must not be empty
/// - At most 200 characters
pub fn validate_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a cart line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_LINE_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a stock movement quantity (receipt, usage or count
/// adjustment). Only positivity applies; deliveries are not bound by the
/// cart line cap.
pub fn validate_movement_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    Ok(())
}

/// Validates the quantity of a new batch (must be > 0).
pub fn validate_batch_quantity(qty: Decimal) -> ValidationResult<()> {
    if qty <= Decimal::ZERO {
        return Err(ValidationError::MustBePositive {
            field: "batch quantity".to_string(),
        });
    }

    Ok(())
}

/// Validates a unit cost or price (zero allowed, e.g. free samples).
pub fn validate_non_negative(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a tax rate in basis points (0% to 100%).
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10000 {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0,
            max: 10000,
        });
    }

    Ok(())
}

// =============================================================================
// Commission Rates
// =============================================================================

/// Clamps a raw commission percentage into `0..=100`.
///
/// Mirrors the back-office rate inputs: typing 120 stores 100, typing -5
/// stores 0. Every entry point that accepts a raw rate goes through here.
pub fn clamp_rate(rate: Decimal) -> Decimal {
    rate.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED)
}

/// Returns true if the rate lies in `0..=100`.
pub fn is_valid_rate(rate: Decimal) -> bool {
    rate >= Decimal::ZERO && rate <= Decimal::ONE_HUNDRED
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates cart size before adding a line.
///
/// ## Rules
/// - Must not exceed MAX_CART_LINES (100)
pub fn validate_cart_size(current_lines: usize) -> ValidationResult<()> {
    if current_lines >= MAX_CART_LINES {
        return Err(ValidationError::OutOfRange {
            field: "cart lines".to_string(),
            min: 0,
            max: MAX_CART_LINES as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_validate_required() {
        assert!(validate_required("employee_id", "e1").is_ok());
        assert!(validate_required("employee_id", "").is_err());
        assert!(validate_required("employee_id", "   ").is_err());
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("Keratin Treatment").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name(&"A".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_movement_quantity() {
        assert!(validate_movement_quantity(1).is_ok());
        assert!(validate_movement_quantity(MAX_LINE_QUANTITY + 1).is_ok());
        assert!(validate_movement_quantity(0).is_err());
        assert!(validate_movement_quantity(-3).is_err());
    }

    #[test]
    fn test_validate_batch_quantity() {
        assert!(validate_batch_quantity(dec!(0.5)).is_ok());
        assert!(validate_batch_quantity(dec!(0)).is_err());
        assert!(validate_batch_quantity(dec!(-3)).is_err());
    }

    #[test]
    fn test_validate_non_negative() {
        assert!(validate_non_negative("unit_cost", Money::zero()).is_ok());
        assert!(validate_non_negative("unit_cost", Money::from_cents(-1)).is_err());
    }

    #[test]
    fn test_clamp_rate() {
        assert_eq!(clamp_rate(dec!(120)), dec!(100));
        assert_eq!(clamp_rate(dec!(-5)), dec!(0));
        assert_eq!(clamp_rate(dec!(42.5)), dec!(42.5));
        assert!(is_valid_rate(dec!(100)));
        assert!(!is_valid_rate(dec!(100.01)));
    }

    #[test]
    fn test_validate_tax_rate_bps() {
        assert!(validate_tax_rate_bps(0).is_ok());
        assert!(validate_tax_rate_bps(1000).is_ok());
        assert!(validate_tax_rate_bps(10001).is_err());
    }
}
