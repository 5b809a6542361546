//! # Repository Module
//!
//! Database repository implementations for the salon POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Caller                                                                │
//! │       │  db.items().get_by_id("shampoo")                               │
//! │       ▼                                                                 │
//! │  ItemRepository (owns a pool handle)                                   │
//! │       │                                                                 │
//! │       │  *_tx(&mut SqliteConnection, ..) free functions                │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  The free functions take a connection so services (checkout, stock)    │
//! │  can run several of them inside one transaction.                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Storage Conventions
//! - Money: INTEGER cents
//! - Decimal quantities and percentages: TEXT, parsed on read
//! - Enums: TEXT via the `sqlx::Type` derives in salon-core
//! - Timestamps: TEXT via sqlx's chrono support
//!
//! ## Available Repositories
//!
//! - [`ItemRepository`](item::ItemRepository) - Items, categories, role eligibility
//! - [`StaffRepository`](staff::StaffRepository) - Employees and commission overrides
//! - [`InventoryRepository`](inventory::InventoryRepository) - Batches and the movement log
//! - [`SaleRepository`](sale::SaleRepository) - Committed sales
//! - [`SettingsRepository`](settings::SettingsRepository) - Runtime key/value settings

pub mod inventory;
pub mod item;
pub mod sale;
pub mod settings;
pub mod staff;

use rust_decimal::Decimal;
use std::str::FromStr;

use crate::error::{DbError, DbResult};

/// Canonical TEXT form of a decimal column.
pub(crate) fn decimal_text(value: Decimal) -> String {
    value.normalize().to_string()
}

/// Parses a decimal column, naming the entity on failure.
pub(crate) fn parse_decimal(entity: &str, field: &str, raw: &str) -> DbResult<Decimal> {
    Decimal::from_str(raw)
        .map_err(|e| DbError::corrupt(entity, format!("{field} '{raw}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_decimal_text_is_normalized() {
        assert_eq!(decimal_text(dec!(8.0000)), "8");
        assert_eq!(decimal_text(dec!(2.50)), "2.5");
    }

    #[test]
    fn test_parse_decimal_reports_corruption() {
        assert_eq!(parse_decimal("batch", "quantity", "2.5").unwrap(), dec!(2.5));
        let err = parse_decimal("batch", "quantity", "two").unwrap_err();
        assert!(matches!(err, DbError::Corrupt { .. }));
    }
}
