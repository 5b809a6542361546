//! # Inventory Batch Ledger
//!
//! Owns every [`InventoryBatch`] for the items a caller loaded and is the
//! only writer of `remaining_quantity`.
//!
//! ## Ledger vs. Item Stock
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Item.stock                     BatchLedger::available_quantity         │
//! │  ──────────                     ───────────────────────────────         │
//! │  authoritative on-hand count    Σ remaining_quantity over batches       │
//! │  gates the sale                 gates nothing, only costs units         │
//! │  integer                        decimal (weighted average fractions)    │
//! │                                                                         │
//! │  The two drift apart when stock is migrated without batch history or   │
//! │  an item is oversold. A drain past the ledger's supply is reported as   │
//! │  InsufficientBatchStock; the caller decides what the uncovered units    │
//! │  cost.                                                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The ledger holds no connection to storage. The database layer loads the
//! batches it needs into one, runs the operation, and writes back whatever
//! changed (see [`BatchLedger::batches_by_id`]).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::debug;
use uuid::Uuid;

use crate::costing::{CostingResult, WeightedAverage};
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{BatchKind, CostingMethod, InventoryBatch};
use crate::validation::{validate_batch_quantity, validate_non_negative, validate_required};

/// Result of a drain that may not be fully covered by batches.
#[derive(Debug, Clone, PartialEq)]
pub struct PartialDrain {
    pub costing: CostingResult,
    /// Requested units no batch could cost.
    pub shortfall: Decimal,
}

/// Per-item ordered batch collections.
#[derive(Debug, Clone, Default)]
pub struct BatchLedger {
    batches: HashMap<String, Vec<InventoryBatch>>,
}

impl BatchLedger {
    pub fn new() -> Self {
        BatchLedger::default()
    }

    /// Builds a ledger from stored batches.
    ///
    /// Batches must be supplied in acquisition order per item.
    pub fn from_batches(batches: impl IntoIterator<Item = InventoryBatch>) -> Self {
        let mut ledger = BatchLedger::new();
        for batch in batches {
            ledger.load(batch);
        }
        ledger
    }

    /// Appends an existing batch without validation (storage round trip).
    pub fn load(&mut self, batch: InventoryBatch) {
        self.batches
            .entry(batch.item_id.clone())
            .or_default()
            .push(batch);
    }

    /// Records newly acquired stock.
    ///
    /// ## Rules
    /// - `quantity` must be > 0
    /// - `unit_cost` must be >= 0
    ///
    /// The new batch starts full (`remaining_quantity == quantity`).
    pub fn add_batch(
        &mut self,
        item_id: &str,
        quantity: Decimal,
        unit_cost: Money,
        kind: BatchKind,
        date: DateTime<Utc>,
    ) -> CoreResult<InventoryBatch> {
        validate_required("item_id", item_id)?;
        validate_batch_quantity(quantity)?;
        validate_non_negative("unit_cost", unit_cost)?;

        let batch = InventoryBatch {
            id: Uuid::new_v4().to_string(),
            item_id: item_id.to_string(),
            quantity,
            remaining_quantity: quantity,
            unit_cost,
            kind,
            date,
        };

        debug!(
            item_id = %item_id,
            batch_id = %batch.id,
            quantity = %quantity,
            unit_cost = %unit_cost,
            kind = batch.kind.as_str(),
            "Batch added"
        );

        self.load(batch.clone());
        Ok(batch)
    }

    /// All batches for an item in acquisition order, drained ones included.
    pub fn batches(&self, item_id: &str) -> &[InventoryBatch] {
        self.batches.get(item_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Looks up batches by id across items. Unknown ids are skipped.
    pub fn batches_by_id(&self, ids: impl IntoIterator<Item = impl AsRef<str>>) -> Vec<&InventoryBatch> {
        let mut found = Vec::new();
        for id in ids {
            let id = id.as_ref();
            if let Some(batch) = self.batches.values().flatten().find(|b| b.id == id) {
                found.push(batch);
            }
        }
        found
    }

    /// Item ids with at least one batch.
    pub fn item_ids(&self) -> impl Iterator<Item = &str> {
        self.batches.keys().map(String::as_str)
    }

    /// Σ remaining quantity for the item.
    pub fn available_quantity(&self, item_id: &str) -> Decimal {
        self.batches(item_id)
            .iter()
            .map(|b| b.remaining_quantity)
            .sum()
    }

    /// Weighted average unit cost over batches with stock, zero if none.
    ///
    /// Always recomputed from the batches; nothing is cached.
    pub fn current_average_cost(&self, item_id: &str) -> Money {
        WeightedAverage::blended_cost(self.batches(item_id))
            .map(Money::from_decimal)
            .unwrap_or_default()
    }

    /// Value of what is still on the shelf: Σ remaining × unit cost.
    pub fn stock_value(&self, item_id: &str) -> Money {
        let exact: Decimal = self
            .batches(item_id)
            .iter()
            .map(|b| b.remaining_quantity * b.unit_cost.to_decimal())
            .sum();
        Money::from_decimal(exact)
    }

    /// Drains `quantity` units using `method`.
    ///
    /// ## Errors
    /// `InsufficientBatchStock` if the batches cannot cover the whole
    /// request. Nothing is mutated in that case.
    ///
    /// `quantity <= 0` is a no-op returning an empty result.
    pub fn drain(
        &mut self,
        item_id: &str,
        quantity: Decimal,
        method: CostingMethod,
    ) -> CoreResult<CostingResult> {
        if quantity <= Decimal::ZERO {
            return Ok(CostingResult::empty());
        }

        let available = self.available_quantity(item_id);
        if quantity > available {
            return Err(CoreError::InsufficientBatchStock {
                item_id: item_id.to_string(),
                available,
                requested: quantity,
            });
        }

        Ok(self.run_policy(item_id, quantity, method))
    }

    /// Drains as much of `quantity` as the batches hold and reports the rest
    /// as a shortfall instead of failing.
    pub fn drain_available(
        &mut self,
        item_id: &str,
        quantity: Decimal,
        method: CostingMethod,
    ) -> PartialDrain {
        if quantity <= Decimal::ZERO {
            return PartialDrain {
                costing: CostingResult::empty(),
                shortfall: Decimal::ZERO,
            };
        }

        let costing = self.run_policy(item_id, quantity, method);
        let shortfall = quantity - costing.covered;
        PartialDrain { costing, shortfall }
    }

    fn run_policy(&mut self, item_id: &str, quantity: Decimal, method: CostingMethod) -> CostingResult {
        let Some(batches) = self.batches.get_mut(item_id) else {
            return CostingResult::empty();
        };

        let result = method.policy().compute_cogs(batches, quantity);

        debug!(
            item_id = %item_id,
            method = %method,
            quantity = %quantity,
            covered = %result.covered,
            cogs = %result.total_cost,
            batches = result.used_batches.len(),
            "Batches drained"
        );

        result
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn stocked_ledger() -> BatchLedger {
        let start = Utc::now() - Duration::days(10);
        let mut ledger = BatchLedger::new();
        ledger
            .add_batch("shampoo", dec!(5), Money::from_cents(1000), BatchKind::Purchase, start)
            .unwrap();
        ledger
            .add_batch(
                "shampoo",
                dec!(5),
                Money::from_cents(2000),
                BatchKind::Purchase,
                start + Duration::days(1),
            )
            .unwrap();
        ledger
            .add_batch(
                "shampoo",
                dec!(5),
                Money::from_cents(3000),
                BatchKind::Purchase,
                start + Duration::days(2),
            )
            .unwrap();
        ledger
    }

    #[test]
    fn test_add_batch_starts_full() {
        let mut ledger = BatchLedger::new();
        let batch = ledger
            .add_batch("gel", dec!(12), Money::from_cents(450), BatchKind::Purchase, Utc::now())
            .unwrap();

        assert_eq!(batch.remaining_quantity, dec!(12));
        assert_eq!(ledger.batches("gel").len(), 1);
        assert_eq!(ledger.available_quantity("gel"), dec!(12));
    }

    #[test]
    fn test_add_batch_rejects_bad_input() {
        let mut ledger = BatchLedger::new();
        let now = Utc::now();

        assert!(ledger
            .add_batch("gel", dec!(0), Money::from_cents(450), BatchKind::Purchase, now)
            .is_err());
        assert!(ledger
            .add_batch("gel", dec!(1), Money::from_cents(-1), BatchKind::Purchase, now)
            .is_err());
        assert!(ledger.batches("gel").is_empty());
    }

    #[test]
    fn test_available_and_average_cost() {
        let ledger = stocked_ledger();
        assert_eq!(ledger.available_quantity("shampoo"), dec!(15));
        assert_eq!(ledger.current_average_cost("shampoo"), Money::from_cents(2000));
        assert_eq!(ledger.stock_value("shampoo"), Money::from_cents(30000));

        assert_eq!(ledger.available_quantity("unknown"), dec!(0));
        assert_eq!(ledger.current_average_cost("unknown"), Money::zero());
    }

    #[test]
    fn test_drain_fifo_updates_average_cost() {
        let mut ledger = stocked_ledger();
        let result = ledger.drain("shampoo", dec!(7), CostingMethod::Fifo).unwrap();

        assert_eq!(result.total_cost, Money::from_cents(9000));
        assert_eq!(ledger.available_quantity("shampoo"), dec!(8));
        // 3 @ $20 + 5 @ $30 = $210 / 8 = $26.25
        assert_eq!(ledger.current_average_cost("shampoo"), Money::from_cents(2625));
    }

    #[test]
    fn test_drain_weighted_average_keeps_average() {
        let mut ledger = stocked_ledger();
        let result = ledger
            .drain("shampoo", dec!(7), CostingMethod::WeightedAverage)
            .unwrap();

        assert_eq!(result.total_cost, Money::from_cents(14000));
        assert_eq!(ledger.available_quantity("shampoo"), dec!(8));
        assert_eq!(ledger.current_average_cost("shampoo"), Money::from_cents(2000));
    }

    #[test]
    fn test_drain_insufficient_does_not_mutate() {
        let mut ledger = stocked_ledger();
        let err = ledger.drain("shampoo", dec!(16), CostingMethod::Fifo).unwrap_err();

        assert!(matches!(err, CoreError::InsufficientBatchStock { .. }));
        assert_eq!(ledger.available_quantity("shampoo"), dec!(15));
    }

    #[test]
    fn test_drain_zero_is_no_op() {
        let mut ledger = stocked_ledger();
        let result = ledger.drain("shampoo", dec!(0), CostingMethod::Fifo).unwrap();

        assert_eq!(result.total_cost, Money::zero());
        assert!(result.used_batches.is_empty());
        assert_eq!(ledger.available_quantity("shampoo"), dec!(15));
    }

    #[test]
    fn test_drain_available_reports_shortfall() {
        let mut ledger = stocked_ledger();
        let drained = ledger.drain_available("shampoo", dec!(18), CostingMethod::Fifo);

        assert_eq!(drained.shortfall, dec!(3));
        assert_eq!(drained.costing.total_cost, Money::from_cents(30000));
        assert_eq!(ledger.available_quantity("shampoo"), dec!(0));
        assert_eq!(ledger.batches("shampoo").len(), 3);
    }

    #[test]
    fn test_batches_by_id() {
        let ledger = stocked_ledger();
        let first_id = ledger.batches("shampoo")[0].id.clone();

        let found = ledger.batches_by_id([first_id.as_str(), "missing"]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].unit_cost, Money::from_cents(1000));
    }
}
