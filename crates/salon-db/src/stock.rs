//! # Inventory Service
//!
//! Persists stock movements that happen outside of a sale.
//!
//! ```text
//! receive()  BEGIN → load item + its batches → receive_stock()
//!                  → INSERT batch, INSERT record, UPDATE item → COMMIT
//!
//! consume()  BEGIN → load item + its batches → consume_stock()
//!                  → UPDATE drained batches, INSERT record, UPDATE item → COMMIT
//! ```
//!
//! A rejected movement returns before anything is written and the
//! transaction rolls back on drop.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

use crate::error::{DbError, DbResult};
use crate::repository::inventory::{insert_batch_tx, insert_record_tx, load_ledger_tx, update_remaining_tx};
use crate::repository::item::{get_item_tx, update_stock_tx};
use crate::repository::settings::costing_method_tx;
use salon_core::inventory::{consume_stock, receive_stock, ConsumptionKind, StockMovement, StockReceipt};
use salon_core::{BatchLedger, Item, SettlementConfig};

#[derive(Debug, Clone)]
pub struct InventoryService {
    pool: SqlitePool,
}

impl InventoryService {
    pub fn new(pool: SqlitePool) -> Self {
        InventoryService { pool }
    }

    /// Books a delivery, customer return or positive count adjustment.
    pub async fn receive(&self, item_id: &str, receipt: StockReceipt) -> DbResult<StockMovement> {
        let mut tx = self.pool.begin().await?;

        let (mut item, mut ledger) = load_item_tx(&mut tx, item_id).await?;
        let movement = receive_stock(&mut item, &mut ledger, receipt)?;

        if let Some(batch) = &movement.new_batch {
            insert_batch_tx(&mut tx, batch).await?;
        }
        insert_record_tx(&mut tx, &movement.record).await?;
        update_stock_tx(&mut tx, &item).await?;

        tx.commit().await?;
        Ok(movement)
    }

    /// Books back-bar usage or a negative count adjustment, costed against
    /// the batches with the costing method in force right now.
    pub async fn consume(
        &self,
        item_id: &str,
        quantity: i64,
        kind: ConsumptionKind,
        config: &SettlementConfig,
        notes: Option<String>,
    ) -> DbResult<StockMovement> {
        let mut tx = self.pool.begin().await?;

        let mut config = *config;
        if let Some(method) = costing_method_tx(&mut tx).await? {
            config.costing_method = method;
        }

        let (mut item, mut ledger) = load_item_tx(&mut tx, item_id).await?;
        let movement = consume_stock(&mut item, &mut ledger, quantity, kind, &config, Utc::now(), notes)?;

        for batch in &movement.updated_batches {
            update_remaining_tx(&mut tx, batch).await?;
        }
        insert_record_tx(&mut tx, &movement.record).await?;
        update_stock_tx(&mut tx, &item).await?;

        tx.commit().await?;

        info!(
            item_id,
            quantity,
            method = %config.costing_method,
            cogs = ?movement.record.cogs_total,
            "Stock consumption committed"
        );
        Ok(movement)
    }
}

async fn load_item_tx(conn: &mut SqliteConnection, item_id: &str) -> DbResult<(Item, BatchLedger)> {
    let item = get_item_tx(conn, item_id)
        .await?
        .ok_or_else(|| DbError::not_found("Item", item_id))?;
    let ledger = load_ledger_tx(conn, &[item_id]).await?;
    Ok((item, ledger))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;
    use salon_core::{BatchKind, CoreError, CostingMethod, Money, ShortfallPolicy};

    async fn db_with_conditioner() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.items()
            .insert(&Item {
                id: "conditioner".to_string(),
                name: "Conditioner".to_string(),
                category_id: None,
                price: Money::from_cents(1800),
                is_service: false,
                stock: 0,
                average_cost: Money::zero(),
                reorder_threshold: 2,
            })
            .await
            .unwrap();
        db
    }

    fn receipt(quantity: i64, cost_cents: i64, day: i64) -> StockReceipt {
        StockReceipt {
            quantity,
            unit_cost: Money::from_cents(cost_cents),
            kind: BatchKind::Purchase,
            date: Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap() + Duration::days(day),
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_receive_persists_batch_record_and_stock() {
        let db = db_with_conditioner().await;
        db.stock().receive("conditioner", receipt(10, 600, 0)).await.unwrap();
        db.stock().receive("conditioner", receipt(10, 800, 1)).await.unwrap();

        let item = db.items().get_by_id("conditioner").await.unwrap().unwrap();
        assert_eq!(item.stock, 20);
        assert_eq!(item.average_cost, Money::from_cents(700));

        let batches = db.inventory().batches_for_item("conditioner").await.unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].unit_cost, Money::from_cents(600));
        assert_eq!(db.inventory().records_for_item("conditioner").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_consume_drains_oldest_first() {
        let db = db_with_conditioner().await;
        db.stock().receive("conditioner", receipt(4, 500, 0)).await.unwrap();
        db.stock().receive("conditioner", receipt(4, 900, 1)).await.unwrap();

        let movement = db
            .stock()
            .consume(
                "conditioner",
                5,
                ConsumptionKind::Usage,
                &SettlementConfig::default(),
                Some("back bar".to_string()),
            )
            .await
            .unwrap();
        assert_eq!(movement.record.cogs_total, Some(Money::from_cents(2900)));

        let batches = db.inventory().batches_for_item("conditioner").await.unwrap();
        assert_eq!(batches[0].remaining_quantity, dec!(0));
        assert_eq!(batches[1].remaining_quantity, dec!(3));

        let records = db.inventory().records_for_item("conditioner").await.unwrap();
        let usage = records.iter().find(|r| r.outbound).unwrap();
        assert_eq!(usage.used_batches.len(), 2);
        assert_eq!(usage.notes.as_deref(), Some("back bar"));
    }

    #[tokio::test]
    async fn test_stored_costing_method_wins() {
        let db = db_with_conditioner().await;
        db.stock().receive("conditioner", receipt(5, 1000, 0)).await.unwrap();
        db.stock().receive("conditioner", receipt(5, 2000, 1)).await.unwrap();
        db.settings()
            .set_costing_method(CostingMethod::WeightedAverage)
            .await
            .unwrap();

        let movement = db
            .stock()
            .consume("conditioner", 2, ConsumptionKind::Adjustment, &SettlementConfig::default(), None)
            .await
            .unwrap();

        assert_eq!(movement.record.cogs_total, Some(Money::from_cents(3000)));
        let batches = db.inventory().batches_for_item("conditioner").await.unwrap();
        assert_eq!(batches[0].remaining_quantity, dec!(4));
        assert_eq!(batches[1].remaining_quantity, dec!(4));
    }

    #[tokio::test]
    async fn test_rejected_consumption_writes_nothing() {
        let db = db_with_conditioner().await;
        db.stock().receive("conditioner", receipt(2, 500, 0)).await.unwrap();
        let config = SettlementConfig {
            shortfall: ShortfallPolicy::Reject,
            ..SettlementConfig::default()
        };

        let result = db
            .stock()
            .consume("conditioner", 3, ConsumptionKind::Usage, &config, None)
            .await;
        assert!(matches!(
            result,
            Err(DbError::Core(CoreError::InsufficientStock { .. }))
        ));

        let item = db.items().get_by_id("conditioner").await.unwrap().unwrap();
        assert_eq!(item.stock, 2);
        assert_eq!(db.inventory().records_for_item("conditioner").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_item() {
        let db = db_with_conditioner().await;
        let result = db.stock().receive("ghost", receipt(1, 100, 0)).await;
        assert!(matches!(result, Err(DbError::NotFound { .. })));
    }
}
