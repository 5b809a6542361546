//! # Domain Types
//!
//! Core domain types used throughout the salon POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Item       │   │ InventoryBatch  │   │ InventoryRecord │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  price          │   │  quantity       │   │  kind           │       │
//! │  │  is_service     │   │  remaining_qty  │   │  cogs_total     │       │
//! │  │  stock          │   │  unit_cost      │   │  used_batches   │       │
//! │  │  average_cost   │   │  date           │   │                 │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Category     │   │      Sale       │   │    SaleItem     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  commission %   │   │  subtotal       │   │  total          │       │
//! │  │  owner %        │   │  tax, total     │   │  commission     │       │
//! │  └─────────────────┘   └─────────────────┘   │  owner amount   │       │
//! │                                              └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Quantities on batches and records are [`Decimal`] because weighted-average
//! draining leaves fractional remainders. Item stock stays an integer count.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// 1 basis point = 0.01%. The legacy default of 10% is 1000 bps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as an exact percentage (825 bps is 8.25).
    #[inline]
    pub fn percentage(&self) -> Decimal {
        Decimal::new(i64::from(self.0), 2)
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }
}

impl Default for TaxRate {
    /// 10%, the legacy checkout default.
    fn default() -> Self {
        TaxRate(1000)
    }
}

// =============================================================================
// Costing Configuration
// =============================================================================

/// Inventory costing method used to compute COGS at the moment of a sale.
///
/// Serialized exactly as the settings screen stores it:
/// `"FIFO"` or `"WeightedAverage"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
pub enum CostingMethod {
    /// Oldest batches are drained first.
    #[default]
    #[serde(rename = "FIFO")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "FIFO"))]
    Fifo,
    /// All remaining batches are blended into one unit cost.
    #[serde(rename = "WeightedAverage")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "WeightedAverage"))]
    WeightedAverage,
}

impl fmt::Display for CostingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CostingMethod::Fifo => write!(f, "FIFO"),
            CostingMethod::WeightedAverage => write!(f, "WeightedAverage"),
        }
    }
}

impl FromStr for CostingMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fifo" => Ok(CostingMethod::Fifo),
            "weightedaverage" | "weighted_average" | "weighted-average" | "average" => {
                Ok(CostingMethod::WeightedAverage)
            }
            _ => Err(ValidationError::NotAllowed {
                field: "costing_method".to_string(),
                allowed: vec!["FIFO".to_string(), "WeightedAverage".to_string()],
            }),
        }
    }
}

/// What to do when the batch ledger cannot cost every unit sold.
///
/// Happens when an item is oversold relative to its batch history, or when
/// stock was migrated without batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ShortfallPolicy {
    /// Uncovered units cost nothing. Matches the historical behavior and
    /// understates COGS.
    #[default]
    ZeroCost,
    /// Uncovered units are costed at the item's last known average cost.
    AverageCost,
    /// The sale is rejected during validation.
    Reject,
}

impl fmt::Display for ShortfallPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShortfallPolicy::ZeroCost => write!(f, "zero_cost"),
            ShortfallPolicy::AverageCost => write!(f, "average_cost"),
            ShortfallPolicy::Reject => write!(f, "reject"),
        }
    }
}

impl FromStr for ShortfallPolicy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "zero_cost" | "zero" => Ok(ShortfallPolicy::ZeroCost),
            "average_cost" | "average" => Ok(ShortfallPolicy::AverageCost),
            "reject" => Ok(ShortfallPolicy::Reject),
            _ => Err(ValidationError::NotAllowed {
                field: "shortfall_policy".to_string(),
                allowed: vec![
                    "zero_cost".to_string(),
                    "average_cost".to_string(),
                    "reject".to_string(),
                ],
            }),
        }
    }
}

/// Configuration read at the moment each sale settles.
///
/// Changing any field affects only sales settled afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SettlementConfig {
    pub costing_method: CostingMethod,
    pub tax_rate: TaxRate,
    pub shortfall: ShortfallPolicy,
}

// =============================================================================
// Catalog
// =============================================================================

/// A sellable thing: a service (haircut, color) or a physical product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    pub name: String,
    /// Category supplying the default commission split.
    pub category_id: Option<String>,
    /// Unit price.
    pub price: Money,
    /// Services never carry stock and never incur COGS.
    pub is_service: bool,
    /// Authoritative on-hand count. Ignored for services.
    pub stock: i64,
    /// Derived from the batch ledger after every movement; not authoritative.
    pub average_cost: Money,
    pub reorder_threshold: i64,
}

impl Item {
    /// Physical items are the only ones the ledger tracks.
    #[inline]
    pub fn is_physical(&self) -> bool {
        !self.is_service
    }

    /// Checks if the authoritative stock covers `quantity`.
    pub fn can_sell(&self, quantity: i64) -> bool {
        self.is_service || self.stock >= quantity
    }

    /// Low stock flag for the reorder report.
    pub fn needs_reorder(&self) -> bool {
        self.is_physical() && self.stock <= self.reorder_threshold
    }
}

/// Groups items and declares the default revenue split.
///
/// `commission_rate + salon_owner_rate` is expected to be 100 but nothing
/// enforces it; the owner share of a sale is always derived as a remainder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    /// Employee share, percent.
    #[ts(as = "String")]
    pub commission_rate: Decimal,
    /// Owner share, percent. Informational only.
    #[ts(as = "String")]
    pub salon_owner_rate: Decimal,
}

/// A staff member who can be assigned to cart lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: String,
    pub name: String,
    /// Role name, e.g. "stylist", "colorist", "nail_technician".
    pub role: String,
    pub active: bool,
}

/// Per-employee, per-item commission override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeService {
    pub employee_id: String,
    pub item_id: String,
    #[ts(as = "String")]
    pub commission_rate: Decimal,
}

// =============================================================================
// Inventory
// =============================================================================

/// How a batch of stock was acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
pub enum BatchKind {
    Purchase,
    Return,
    /// Positive stock-count adjustment.
    Adjustment,
}

impl BatchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchKind::Purchase => "purchase",
            BatchKind::Return => "return",
            BatchKind::Adjustment => "adjustment",
        }
    }
}

impl FromStr for BatchKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "purchase" => Ok(BatchKind::Purchase),
            "return" => Ok(BatchKind::Return),
            "adjustment" => Ok(BatchKind::Adjustment),
            other => Err(ValidationError::InvalidFormat {
                field: "batch kind".to_string(),
                reason: format!("unknown kind '{}'", other),
            }),
        }
    }
}

/// Stock acquired at one point in time at one unit cost.
///
/// Everything except `remaining_quantity` is immutable once created, and
/// only the [`BatchLedger`](crate::ledger::BatchLedger) writes that field.
/// Drained batches are kept with `remaining_quantity == 0` for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InventoryBatch {
    pub id: String,
    pub item_id: String,
    /// Original quantity, > 0.
    #[ts(as = "String")]
    pub quantity: Decimal,
    /// 0 <= remaining_quantity <= quantity.
    #[ts(as = "String")]
    pub remaining_quantity: Decimal,
    pub unit_cost: Money,
    pub kind: BatchKind,
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
}

impl InventoryBatch {
    #[inline]
    pub fn has_stock(&self) -> bool {
        self.remaining_quantity > Decimal::ZERO
    }
}

/// Kind of stock movement recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
pub enum InventoryRecordKind {
    Purchase,
    Usage,
    Return,
    Adjustment,
}

impl InventoryRecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InventoryRecordKind::Purchase => "purchase",
            InventoryRecordKind::Usage => "usage",
            InventoryRecordKind::Return => "return",
            InventoryRecordKind::Adjustment => "adjustment",
        }
    }
}

impl From<BatchKind> for InventoryRecordKind {
    fn from(kind: BatchKind) -> Self {
        match kind {
            BatchKind::Purchase => InventoryRecordKind::Purchase,
            BatchKind::Return => InventoryRecordKind::Return,
            BatchKind::Adjustment => InventoryRecordKind::Adjustment,
        }
    }
}

impl FromStr for InventoryRecordKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "purchase" => Ok(InventoryRecordKind::Purchase),
            "usage" => Ok(InventoryRecordKind::Usage),
            "return" => Ok(InventoryRecordKind::Return),
            "adjustment" => Ok(InventoryRecordKind::Adjustment),
            other => Err(ValidationError::InvalidFormat {
                field: "inventory record kind".to_string(),
                reason: format!("unknown kind '{}'", other),
            }),
        }
    }
}

/// One batch's contribution to a drain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct UsedBatch {
    pub batch_id: String,
    #[ts(as = "String")]
    pub quantity: Decimal,
    pub unit_cost: Money,
    pub total_cost: Money,
}

/// Audit-log entry for a stock movement.
///
/// `quantity` is type-qualified: always positive, direction given by `kind`
/// (a negative count adjustment is recorded as `Adjustment` with
/// `outbound == true`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InventoryRecord {
    pub id: String,
    pub item_id: String,
    pub kind: InventoryRecordKind,
    #[ts(as = "String")]
    pub quantity: Decimal,
    /// True when stock left the shelf.
    pub outbound: bool,
    pub unit_cost: Money,
    pub total_cost: Money,
    /// Present on outbound movements costed against the ledger.
    pub cogs_total: Option<Money>,
    pub used_batches: Vec<UsedBatch>,
    /// The sale that caused this movement, if any.
    pub sale_id: Option<String>,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
}

// =============================================================================
// Sales
// =============================================================================

/// Status of a committed sale. Sales are never edited; voiding is a flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
pub enum SaleStatus {
    #[default]
    Completed,
    Voided,
}

impl SaleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Completed => "completed",
            SaleStatus::Voided => "voided",
        }
    }
}

impl FromStr for SaleStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(SaleStatus::Completed),
            "voided" => Ok(SaleStatus::Voided),
            other => Err(ValidationError::InvalidFormat {
                field: "sale status".to_string(),
                reason: format!("unknown status '{}'", other),
            }),
        }
    }
}

/// A finalized sale line.
///
/// Invariant: `commission_amount + owner_amount == total`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleItem {
    pub item_id: String,
    /// Item name at time of sale (frozen).
    pub name: String,
    pub employee_id: String,
    pub quantity: i64,
    /// Unit price at time of sale (frozen).
    pub price: Money,
    pub total: Money,
    /// The percentage that produced `commission_amount`.
    #[ts(as = "String")]
    pub commission_rate: Decimal,
    pub commission_amount: Money,
    pub owner_amount: Money,
    /// COGS for physical lines; `None` for services.
    pub cogs_total: Option<Money>,
}

/// A committed sale. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: String,
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
    pub customer_id: Option<String>,
    pub items: Vec<SaleItem>,
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
    /// Costing method in force when the sale settled.
    pub costing_method: CostingMethod,
    pub status: SaleStatus,
}

impl Sale {
    /// Sum of COGS over physical lines.
    pub fn cogs_total(&self) -> Money {
        self.items.iter().filter_map(|i| i.cogs_total).sum()
    }

    pub fn commission_total(&self) -> Money {
        self.items.iter().map(|i| i.commission_amount).sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn product(stock: i64) -> Item {
        Item {
            id: "shampoo".to_string(),
            name: "Shampoo".to_string(),
            category_id: Some("retail".to_string()),
            price: Money::from_cents(2500),
            is_service: false,
            stock,
            average_cost: Money::zero(),
            reorder_threshold: 5,
        }
    }

    #[test]
    fn test_tax_rate_default_is_ten_percent() {
        let rate = TaxRate::default();
        assert_eq!(rate.bps(), 1000);
        assert_eq!(rate.percentage(), dec!(10));
        assert_eq!(TaxRate::from_bps(825).percentage(), dec!(8.25));
    }

    #[test]
    fn test_costing_method_parsing() {
        assert_eq!("FIFO".parse::<CostingMethod>().unwrap(), CostingMethod::Fifo);
        assert_eq!(
            "WeightedAverage".parse::<CostingMethod>().unwrap(),
            CostingMethod::WeightedAverage
        );
        assert_eq!(
            "weighted_average".parse::<CostingMethod>().unwrap(),
            CostingMethod::WeightedAverage
        );
        assert!("LIFO".parse::<CostingMethod>().is_err());
    }

    #[test]
    fn test_costing_method_serializes_as_setting_strings() {
        assert_eq!(
            serde_json::to_string(&CostingMethod::Fifo).unwrap(),
            "\"FIFO\""
        );
        assert_eq!(
            serde_json::to_string(&CostingMethod::WeightedAverage).unwrap(),
            "\"WeightedAverage\""
        );
    }

    #[test]
    fn test_shortfall_policy_parsing() {
        assert_eq!(ShortfallPolicy::default(), ShortfallPolicy::ZeroCost);
        assert_eq!(
            "average_cost".parse::<ShortfallPolicy>().unwrap(),
            ShortfallPolicy::AverageCost
        );
        assert!("maybe".parse::<ShortfallPolicy>().is_err());
    }

    #[test]
    fn test_item_stock_checks() {
        let item = product(3);
        assert!(item.can_sell(3));
        assert!(!item.can_sell(4));
        assert!(item.needs_reorder());

        let service = Item {
            is_service: true,
            stock: 0,
            ..product(0)
        };
        assert!(service.can_sell(100));
        assert!(!service.needs_reorder());
    }

    #[test]
    fn test_kind_round_trip_through_strings() {
        for kind in [BatchKind::Purchase, BatchKind::Return, BatchKind::Adjustment] {
            assert_eq!(kind.as_str().parse::<BatchKind>().unwrap(), kind);
        }
        assert_eq!(
            InventoryRecordKind::from(BatchKind::Return),
            InventoryRecordKind::Return
        );
    }
}
