//! # Manual Stock Movements
//!
//! Stock that moves outside of a sale: deliveries, customer returns, count
//! corrections and back-bar usage (product a stylist uses during a service).
//!
//! ```text
//! receive_stock   Purchase / Return / Adjustment(+)
//!                   → new batch, stock += qty, averageCost refreshed
//!
//! consume_stock   Usage / Adjustment(−)
//!                   → batches drained per costing method, stock −= qty,
//!                     averageCost refreshed, record carries COGS
//! ```
//!
//! Both return the audit record plus what changed; like settlement, nothing
//! here touches storage.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::ledger::{BatchLedger, PartialDrain};
use crate::money::Money;
use crate::types::{
    BatchKind, InventoryBatch, InventoryRecord, InventoryRecordKind, Item, SettlementConfig,
    ShortfallPolicy,
};
use crate::validation::validate_movement_quantity;

/// Inbound stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockReceipt {
    pub quantity: i64,
    pub unit_cost: Money,
    pub kind: BatchKind,
    pub date: DateTime<Utc>,
    pub notes: Option<String>,
}

/// Why stock is leaving outside of a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsumptionKind {
    /// Back-bar usage.
    Usage,
    /// Negative count correction (breakage, shrinkage).
    Adjustment,
}

impl From<ConsumptionKind> for InventoryRecordKind {
    fn from(kind: ConsumptionKind) -> Self {
        match kind {
            ConsumptionKind::Usage => InventoryRecordKind::Usage,
            ConsumptionKind::Adjustment => InventoryRecordKind::Adjustment,
        }
    }
}

/// What a movement changed.
#[derive(Debug, Clone, PartialEq)]
pub struct StockMovement {
    pub record: InventoryRecord,
    /// The batch created by a receipt.
    pub new_batch: Option<InventoryBatch>,
    /// Batches drained by a consumption.
    pub updated_batches: Vec<InventoryBatch>,
}

fn ensure_physical(item: &Item) -> CoreResult<()> {
    if item.is_service {
        return Err(CoreError::ServiceHasNoStock(item.id.clone()));
    }
    Ok(())
}

/// Books inbound stock for `item`.
pub fn receive_stock(
    item: &mut Item,
    ledger: &mut BatchLedger,
    receipt: StockReceipt,
) -> CoreResult<StockMovement> {
    ensure_physical(item)?;
    validate_movement_quantity(receipt.quantity)?;

    let quantity = Decimal::from(receipt.quantity);
    let batch = ledger.add_batch(&item.id, quantity, receipt.unit_cost, receipt.kind, receipt.date)?;

    item.stock += receipt.quantity;
    item.average_cost = ledger.current_average_cost(&item.id);

    info!(
        item_id = %item.id,
        kind = receipt.kind.as_str(),
        quantity = receipt.quantity,
        unit_cost = %receipt.unit_cost,
        stock = item.stock,
        "Stock received"
    );

    let record = InventoryRecord {
        id: Uuid::new_v4().to_string(),
        item_id: item.id.clone(),
        kind: receipt.kind.into(),
        quantity,
        outbound: false,
        unit_cost: receipt.unit_cost,
        total_cost: receipt.unit_cost.multiply_quantity(receipt.quantity),
        cogs_total: None,
        used_batches: Vec::new(),
        sale_id: None,
        notes: receipt.notes,
        date: receipt.date,
    };

    Ok(StockMovement {
        record,
        new_batch: Some(batch),
        updated_batches: Vec::new(),
    })
}

/// Books outbound stock for `item` and costs it against the batches.
///
/// ## Errors
/// - `InsufficientStock` if `quantity` exceeds the item's stock
/// - `InsufficientBatchStock` under [`ShortfallPolicy::Reject`] when the
///   batches cannot cover it
///
/// Nothing is mutated on error.
pub fn consume_stock(
    item: &mut Item,
    ledger: &mut BatchLedger,
    quantity: i64,
    kind: ConsumptionKind,
    config: &SettlementConfig,
    date: DateTime<Utc>,
    notes: Option<String>,
) -> CoreResult<StockMovement> {
    ensure_physical(item)?;
    validate_movement_quantity(quantity)?;

    if quantity > item.stock {
        return Err(CoreError::InsufficientStock {
            item_id: item.id.clone(),
            available: item.stock,
            requested: quantity,
        });
    }

    let wanted = Decimal::from(quantity);
    let drained = if config.shortfall == ShortfallPolicy::Reject {
        let costing = ledger.drain(&item.id, wanted, config.costing_method)?;
        PartialDrain {
            costing,
            shortfall: Decimal::ZERO,
        }
    } else {
        ledger.drain_available(&item.id, wanted, config.costing_method)
    };

    let mut cogs = drained.costing.total_cost;
    if drained.shortfall > Decimal::ZERO {
        let absorbed = match config.shortfall {
            ShortfallPolicy::AverageCost => item.average_cost.multiply_decimal(drained.shortfall),
            _ => Money::zero(),
        };
        warn!(
            item_id = %item.id,
            shortfall = %drained.shortfall,
            absorbed_cost = %absorbed,
            "Batch stock short of consumed quantity"
        );
        cogs += absorbed;
    }

    item.stock -= quantity;
    item.average_cost = ledger.current_average_cost(&item.id);

    info!(
        item_id = %item.id,
        kind = ?kind,
        quantity,
        cogs = %cogs,
        stock = item.stock,
        "Stock consumed"
    );

    let updated_batches = ledger
        .batches_by_id(drained.costing.used_batches.iter().map(|u| u.batch_id.as_str()))
        .into_iter()
        .cloned()
        .collect();

    let record = InventoryRecord {
        id: Uuid::new_v4().to_string(),
        item_id: item.id.clone(),
        kind: kind.into(),
        quantity: wanted,
        outbound: true,
        unit_cost: Money::from_decimal(cogs.to_decimal() / wanted),
        total_cost: cogs,
        cogs_total: Some(cogs),
        used_batches: drained.costing.used_batches,
        sale_id: None,
        notes,
        date,
    };

    Ok(StockMovement {
        record,
        new_batch: None,
        updated_batches,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CostingMethod;
    use rust_decimal_macros::dec;

    fn conditioner() -> Item {
        Item {
            id: "conditioner".to_string(),
            name: "Conditioner".to_string(),
            category_id: Some("retail".to_string()),
            price: Money::from_cents(1800),
            is_service: false,
            stock: 0,
            average_cost: Money::zero(),
            reorder_threshold: 2,
        }
    }

    fn receipt(quantity: i64, cost_cents: i64) -> StockReceipt {
        StockReceipt {
            quantity,
            unit_cost: Money::from_cents(cost_cents),
            kind: BatchKind::Purchase,
            date: Utc::now(),
            notes: None,
        }
    }

    #[test]
    fn test_receive_stock_adds_batch_and_stock() {
        let mut item = conditioner();
        let mut ledger = BatchLedger::new();

        let movement = receive_stock(&mut item, &mut ledger, receipt(10, 600)).unwrap();

        assert_eq!(item.stock, 10);
        assert_eq!(item.average_cost, Money::from_cents(600));
        assert_eq!(movement.record.kind, InventoryRecordKind::Purchase);
        assert_eq!(movement.record.total_cost, Money::from_cents(6000));
        assert!(!movement.record.outbound);
        assert_eq!(movement.new_batch.unwrap().remaining_quantity, dec!(10));

        receive_stock(&mut item, &mut ledger, receipt(10, 800)).unwrap();
        assert_eq!(item.stock, 20);
        assert_eq!(item.average_cost, Money::from_cents(700));
    }

    #[test]
    fn test_bulk_delivery_beyond_line_cap() {
        let mut item = conditioner();
        let mut ledger = BatchLedger::new();

        receive_stock(&mut item, &mut ledger, receipt(1200, 450)).unwrap();
        assert_eq!(item.stock, 1200);
        assert_eq!(ledger.available_quantity("conditioner"), dec!(1200));

        let movement = consume_stock(
            &mut item,
            &mut ledger,
            1000,
            ConsumptionKind::Adjustment,
            &SettlementConfig::default(),
            Utc::now(),
            None,
        )
        .unwrap();
        assert_eq!(item.stock, 200);
        assert_eq!(movement.record.cogs_total, Some(Money::from_cents(450_000)));
    }

    #[test]
    fn test_return_becomes_its_own_batch() {
        let mut item = conditioner();
        let mut ledger = BatchLedger::new();
        let movement = receive_stock(
            &mut item,
            &mut ledger,
            StockReceipt {
                kind: BatchKind::Return,
                ..receipt(1, 600)
            },
        )
        .unwrap();

        assert_eq!(movement.record.kind, InventoryRecordKind::Return);
        assert_eq!(ledger.batches("conditioner")[0].kind, BatchKind::Return);
    }

    #[test]
    fn test_consume_stock_costs_usage() {
        let mut item = conditioner();
        let mut ledger = BatchLedger::new();
        receive_stock(&mut item, &mut ledger, receipt(4, 500)).unwrap();
        receive_stock(&mut item, &mut ledger, receipt(4, 900)).unwrap();

        let movement = consume_stock(
            &mut item,
            &mut ledger,
            5,
            ConsumptionKind::Usage,
            &SettlementConfig::default(),
            Utc::now(),
            Some("back bar".to_string()),
        )
        .unwrap();

        // FIFO: 4 @ $5 + 1 @ $9
        assert_eq!(movement.record.cogs_total, Some(Money::from_cents(2900)));
        assert_eq!(movement.record.kind, InventoryRecordKind::Usage);
        assert!(movement.record.outbound);
        assert_eq!(movement.updated_batches.len(), 2);
        assert_eq!(item.stock, 3);
        assert_eq!(item.average_cost, Money::from_cents(900));
    }

    #[test]
    fn test_negative_adjustment_with_weighted_average() {
        let mut item = conditioner();
        let mut ledger = BatchLedger::new();
        receive_stock(&mut item, &mut ledger, receipt(5, 1000)).unwrap();
        receive_stock(&mut item, &mut ledger, receipt(5, 2000)).unwrap();

        let config = SettlementConfig {
            costing_method: CostingMethod::WeightedAverage,
            ..SettlementConfig::default()
        };
        let movement = consume_stock(
            &mut item,
            &mut ledger,
            2,
            ConsumptionKind::Adjustment,
            &config,
            Utc::now(),
            None,
        )
        .unwrap();

        assert_eq!(movement.record.kind, InventoryRecordKind::Adjustment);
        assert_eq!(movement.record.cogs_total, Some(Money::from_cents(3000)));
        assert_eq!(ledger.available_quantity("conditioner"), dec!(8));
    }

    #[test]
    fn test_consume_beyond_stock_rejected() {
        let mut item = conditioner();
        let mut ledger = BatchLedger::new();
        receive_stock(&mut item, &mut ledger, receipt(2, 500)).unwrap();

        let result = consume_stock(
            &mut item,
            &mut ledger,
            3,
            ConsumptionKind::Usage,
            &SettlementConfig::default(),
            Utc::now(),
            None,
        );
        assert!(matches!(result, Err(CoreError::InsufficientStock { .. })));
        assert_eq!(item.stock, 2);
    }

    #[test]
    fn test_reject_policy_leaves_everything_untouched() {
        let mut item = Item {
            stock: 5,
            ..conditioner()
        };
        let mut ledger = BatchLedger::new();
        ledger
            .add_batch("conditioner", dec!(1), Money::from_cents(500), BatchKind::Purchase, Utc::now())
            .unwrap();
        let config = SettlementConfig {
            shortfall: ShortfallPolicy::Reject,
            ..SettlementConfig::default()
        };

        let result = consume_stock(
            &mut item,
            &mut ledger,
            2,
            ConsumptionKind::Usage,
            &config,
            Utc::now(),
            None,
        );
        assert!(matches!(result, Err(CoreError::InsufficientBatchStock { .. })));
        assert_eq!(item.stock, 5);
        assert_eq!(ledger.available_quantity("conditioner"), dec!(1));
    }

    #[test]
    fn test_services_carry_no_stock() {
        let mut item = Item {
            is_service: true,
            ..conditioner()
        };
        let mut ledger = BatchLedger::new();

        assert_eq!(
            receive_stock(&mut item, &mut ledger, receipt(1, 100)),
            Err(CoreError::ServiceHasNoStock("conditioner".to_string()))
        );
    }
}
