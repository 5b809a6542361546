//! # Costing Policy Engine
//!
//! Interchangeable strategies that turn "N units left the shelf" into a cost
//! of goods sold, consuming an item's batches as they go.
//!
//! ## Strategies
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Batches (acquisition order):  B1 5 @ $10   B2 5 @ $20   B3 5 @ $30     │
//! │  Request: 7 units                                                       │
//! │                                                                         │
//! │  FIFO                              Weighted average                     │
//! │  ────                              ────────────────                     │
//! │  B1: 5 @ $10 = $50                 blended = (50+100+150)/15 = $20      │
//! │  B2: 2 @ $20 = $40                 total   = 7 × $20 = $140             │
//! │  total = $90                       each batch loses 7 × (r / 15)        │
//! │  remaining: 0, 3, 5                remaining: 2.667, 2.667, 2.667       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Both strategies are no-ops for `quantity <= 0` and when no batch has
//! stock left. Neither fails: a request larger than what the batches hold
//! consumes everything available and reports how much was covered. Whether
//! that is acceptable is the ledger's (and ultimately the caller's) call.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{CostingMethod, InventoryBatch, UsedBatch};

// =============================================================================
// Result
// =============================================================================

/// Outcome of costing a drain.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CostingResult {
    pub total_cost: Money,
    pub used_batches: Vec<UsedBatch>,
    /// Units actually taken from batches (≤ requested).
    #[ts(as = "String")]
    pub covered: Decimal,
}

impl CostingResult {
    /// The `{ totalCost: 0, usedBatches: [] }` result.
    pub fn empty() -> Self {
        CostingResult::default()
    }

    pub fn is_empty(&self) -> bool {
        self.used_batches.is_empty()
    }
}

// =============================================================================
// Policy Trait
// =============================================================================

/// A costing strategy.
///
/// `batches` is one item's batch list in acquisition order. Implementations
/// mutate `remaining_quantity` in place and nothing else.
pub trait CostingPolicy: Send + Sync {
    fn method(&self) -> CostingMethod;

    fn compute_cogs(&self, batches: &mut [InventoryBatch], quantity: Decimal) -> CostingResult;
}

impl CostingMethod {
    /// The strategy implementing this method.
    pub fn policy(&self) -> &'static dyn CostingPolicy {
        match self {
            CostingMethod::Fifo => &Fifo,
            CostingMethod::WeightedAverage => &WeightedAverage,
        }
    }
}

fn line_cost(quantity: Decimal, unit_cost: Money) -> Decimal {
    quantity * unit_cost.to_decimal()
}

// =============================================================================
// FIFO
// =============================================================================

/// First-in, first-out: the oldest batches are drained first.
///
/// Batches are visited by `date`; equal dates keep insertion order (the sort
/// is stable).
#[derive(Debug, Clone, Copy, Default)]
pub struct Fifo;

impl CostingPolicy for Fifo {
    fn method(&self) -> CostingMethod {
        CostingMethod::Fifo
    }

    fn compute_cogs(&self, batches: &mut [InventoryBatch], quantity: Decimal) -> CostingResult {
        if quantity <= Decimal::ZERO {
            return CostingResult::empty();
        }

        let mut order: Vec<usize> = (0..batches.len()).collect();
        order.sort_by_key(|&i| batches[i].date);

        let mut needed = quantity;
        let mut exact_total = Decimal::ZERO;
        let mut used = Vec::new();

        for idx in order {
            if needed <= Decimal::ZERO {
                break;
            }
            let batch = &mut batches[idx];
            if !batch.has_stock() {
                continue;
            }

            let take = needed.min(batch.remaining_quantity);
            let cost = line_cost(take, batch.unit_cost);

            batch.remaining_quantity -= take;
            needed -= take;
            exact_total += cost;

            used.push(UsedBatch {
                batch_id: batch.id.clone(),
                quantity: take,
                unit_cost: batch.unit_cost,
                total_cost: Money::from_decimal(cost),
            });
        }

        CostingResult {
            total_cost: Money::from_decimal(exact_total),
            used_batches: used,
            covered: quantity - needed,
        }
    }
}

// =============================================================================
// Weighted Average
// =============================================================================

/// Blends every batch with stock into one unit cost, then drains each batch
/// in proportion to its share of the remaining quantity.
///
/// Proportional draining leaves fractional remainders. The last batch
/// touched absorbs the division residue so that the remaining total is
/// exactly `before - covered`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedAverage;

impl WeightedAverage {
    /// `Σ remaining × unit_cost / Σ remaining` over batches with stock.
    pub fn blended_cost(batches: &[InventoryBatch]) -> Option<Decimal> {
        let (qty, value) = batches
            .iter()
            .filter(|b| b.has_stock())
            .fold((Decimal::ZERO, Decimal::ZERO), |(q, v), b| {
                (q + b.remaining_quantity, v + line_cost(b.remaining_quantity, b.unit_cost))
            });

        if qty.is_zero() {
            None
        } else {
            Some(value / qty)
        }
    }
}

impl CostingPolicy for WeightedAverage {
    fn method(&self) -> CostingMethod {
        CostingMethod::WeightedAverage
    }

    fn compute_cogs(&self, batches: &mut [InventoryBatch], quantity: Decimal) -> CostingResult {
        if quantity <= Decimal::ZERO {
            return CostingResult::empty();
        }
        let Some(blended) = Self::blended_cost(batches) else {
            return CostingResult::empty();
        };

        let stocked: Vec<usize> = (0..batches.len())
            .filter(|&i| batches[i].has_stock())
            .collect();
        let total_remaining: Decimal = stocked.iter().map(|&i| batches[i].remaining_quantity).sum();
        let covered = quantity.min(total_remaining);
        let drain_all = covered == total_remaining;

        let mut used = Vec::with_capacity(stocked.len());
        let mut allocated = Decimal::ZERO;

        for (n, &idx) in stocked.iter().enumerate() {
            let batch = &mut batches[idx];
            let share = if drain_all {
                batch.remaining_quantity
            } else if n + 1 == stocked.len() {
                (covered - allocated).min(batch.remaining_quantity)
            } else {
                covered * batch.remaining_quantity / total_remaining
            };

            batch.remaining_quantity -= share;
            allocated += share;

            used.push(UsedBatch {
                batch_id: batch.id.clone(),
                quantity: share,
                unit_cost: batch.unit_cost,
                total_cost: Money::from_decimal(line_cost(share, batch.unit_cost)),
            });
        }

        CostingResult {
            total_cost: Money::from_decimal(covered * blended),
            used_batches: used,
            covered,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
