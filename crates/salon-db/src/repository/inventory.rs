//! # Inventory Repository
//!
//! Cost batches and the stock movement log.
//!
//! ## Batch Order
//! ```text
//! inventory_batches is read ORDER BY date, rowid
//!
//! rowid is insertion order, so two batches stamped with the same date
//! keep the order they were received in. The ledger sorts by date again
//! (stable) before draining, so this only fixes the tie-break.
//! ```

use chrono::{DateTime, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::{decimal_text, parse_decimal};
use salon_core::{
    BatchKind, BatchLedger, InventoryBatch, InventoryRecord, InventoryRecordKind, Money, UsedBatch,
};

const BATCH_COLUMNS: &str = "id, item_id, quantity, remaining_quantity, unit_cost_cents, kind, date";
const RECORD_COLUMNS: &str = "id, item_id, kind, quantity, outbound, unit_cost_cents, \
                              total_cost_cents, cogs_total_cents, used_batches, sale_id, notes, date";

// =============================================================================
// Rows
// =============================================================================

#[derive(Debug, FromRow)]
struct BatchRow {
    id: String,
    item_id: String,
    quantity: String,
    remaining_quantity: String,
    unit_cost_cents: i64,
    kind: BatchKind,
    date: DateTime<Utc>,
}

impl TryFrom<BatchRow> for InventoryBatch {
    type Error = DbError;

    fn try_from(row: BatchRow) -> DbResult<Self> {
        Ok(InventoryBatch {
            quantity: parse_decimal("inventory batch", "quantity", &row.quantity)?,
            remaining_quantity: parse_decimal(
                "inventory batch",
                "remaining_quantity",
                &row.remaining_quantity,
            )?,
            id: row.id,
            item_id: row.item_id,
            unit_cost: Money::from_cents(row.unit_cost_cents),
            kind: row.kind,
            date: row.date,
        })
    }
}

#[derive(Debug, FromRow)]
struct RecordRow {
    id: String,
    item_id: String,
    kind: InventoryRecordKind,
    quantity: String,
    outbound: bool,
    unit_cost_cents: i64,
    total_cost_cents: i64,
    cogs_total_cents: Option<i64>,
    used_batches: String,
    sale_id: Option<String>,
    notes: Option<String>,
    date: DateTime<Utc>,
}

impl TryFrom<RecordRow> for InventoryRecord {
    type Error = DbError;

    fn try_from(row: RecordRow) -> DbResult<Self> {
        let used_batches: Vec<UsedBatch> = serde_json::from_str(&row.used_batches)
            .map_err(|e| DbError::corrupt("inventory record", format!("used_batches: {e}")))?;

        Ok(InventoryRecord {
            quantity: parse_decimal("inventory record", "quantity", &row.quantity)?,
            id: row.id,
            item_id: row.item_id,
            kind: row.kind,
            outbound: row.outbound,
            unit_cost: Money::from_cents(row.unit_cost_cents),
            total_cost: Money::from_cents(row.total_cost_cents),
            cogs_total: row.cogs_total_cents.map(Money::from_cents),
            used_batches,
            sale_id: row.sale_id,
            notes: row.notes,
            date: row.date,
        })
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Read access to batches and the movement log.
///
/// Writes go through [`InventoryService`](crate::stock::InventoryService)
/// and [`CheckoutService`](crate::checkout::CheckoutService) so that item
/// stock, batches and records always change together.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    /// Every batch of an item, drained ones included, oldest first.
    pub async fn batches_for_item(&self, item_id: &str) -> DbResult<Vec<InventoryBatch>> {
        let rows = sqlx::query_as::<_, BatchRow>(&format!(
            "SELECT {BATCH_COLUMNS} FROM inventory_batches WHERE item_id = ?1 ORDER BY date, rowid"
        ))
        .bind(item_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(InventoryBatch::try_from).collect()
    }

    /// The whole ledger, for valuation reports.
    pub async fn ledger(&self) -> DbResult<BatchLedger> {
        let mut conn = self.pool.acquire().await?;
        load_ledger_tx(&mut conn, &[]).await
    }

    /// Movement log for one item, newest first.
    pub async fn records_for_item(&self, item_id: &str) -> DbResult<Vec<InventoryRecord>> {
        let rows = sqlx::query_as::<_, RecordRow>(&format!(
            "SELECT {RECORD_COLUMNS} FROM inventory_records WHERE item_id = ?1 \
             ORDER BY date DESC, rowid DESC"
        ))
        .bind(item_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(InventoryRecord::try_from).collect()
    }

    /// Usage records written by one sale, in cart order.
    pub async fn records_for_sale(&self, sale_id: &str) -> DbResult<Vec<InventoryRecord>> {
        let rows = sqlx::query_as::<_, RecordRow>(&format!(
            "SELECT {RECORD_COLUMNS} FROM inventory_records WHERE sale_id = ?1 ORDER BY rowid"
        ))
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(InventoryRecord::try_from).collect()
    }
}

// =============================================================================
// Connection-level operations
// =============================================================================

/// Loads batches for the given items (all items when `item_ids` is empty).
pub(crate) async fn load_ledger_tx(
    conn: &mut SqliteConnection,
    item_ids: &[&str],
) -> DbResult<BatchLedger> {
    let mut query = QueryBuilder::<Sqlite>::new(format!(
        "SELECT {BATCH_COLUMNS} FROM inventory_batches"
    ));
    if !item_ids.is_empty() {
        query.push(" WHERE item_id IN (");
        let mut separated = query.separated(", ");
        for id in item_ids {
            separated.push_bind(id.to_string());
        }
        separated.push_unseparated(")");
    }
    query.push(" ORDER BY date, rowid");

    let batches = query
        .build_query_as::<BatchRow>()
        .fetch_all(&mut *conn)
        .await?
        .into_iter()
        .map(InventoryBatch::try_from)
        .collect::<DbResult<Vec<_>>>()?;

    debug!(batches = batches.len(), "Ledger loaded");
    Ok(BatchLedger::from_batches(batches))
}

pub(crate) async fn insert_batch_tx(
    conn: &mut SqliteConnection,
    batch: &InventoryBatch,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO inventory_batches (
            id, item_id, quantity, remaining_quantity, unit_cost_cents, kind, date
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&batch.id)
    .bind(&batch.item_id)
    .bind(decimal_text(batch.quantity))
    .bind(decimal_text(batch.remaining_quantity))
    .bind(batch.unit_cost.cents())
    .bind(batch.kind)
    .bind(batch.date)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Writes back a drained batch. Only `remaining_quantity` ever changes.
pub(crate) async fn update_remaining_tx(
    conn: &mut SqliteConnection,
    batch: &InventoryBatch,
) -> DbResult<()> {
    let result = sqlx::query("UPDATE inventory_batches SET remaining_quantity = ?1 WHERE id = ?2")
        .bind(decimal_text(batch.remaining_quantity))
        .bind(&batch.id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("InventoryBatch", &batch.id));
    }
    Ok(())
}

pub(crate) async fn insert_record_tx(
    conn: &mut SqliteConnection,
    record: &InventoryRecord,
) -> DbResult<()> {
    let used_batches = serde_json::to_string(&record.used_batches)
        .map_err(|e| DbError::Internal(format!("encoding used_batches: {e}")))?;

    sqlx::query(
        r#"
        INSERT INTO inventory_records (
            id, item_id, kind, quantity, outbound, unit_cost_cents,
            total_cost_cents, cogs_total_cents, used_batches, sale_id, notes, date
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(&record.id)
    .bind(&record.item_id)
    .bind(record.kind)
    .bind(decimal_text(record.quantity))
    .bind(record.outbound)
    .bind(record.unit_cost.cents())
    .bind(record.total_cost.cents())
    .bind(record.cogs_total.map(|m| m.cents()))
    .bind(used_batches)
    .bind(&record.sale_id)
    .bind(&record.notes)
    .bind(record.date)
    .execute(&mut *conn)
    .await?;

    Ok(())
}
