//! # Sale Repository
//!
//! Committed sales and their lines.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. CHECKOUT                                                           │
//! │     └── CheckoutService::checkout() → insert_sale_tx()                 │
//! │         (same transaction as stock, batches and usage records)        │
//! │                                                                         │
//! │  2. READ                                                               │
//! │     └── get_by_id() / list_between()                                   │
//! │                                                                         │
//! │  3. (OPTIONAL) VOID                                                    │
//! │     └── void_sale() → Sale { status: Voided }                          │
//! │         Amounts are never edited. Reports skip voided sales.          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! Item name, unit price and commission rate are copied onto each line, so
//! later catalog or rate changes never alter past sales.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::{decimal_text, parse_decimal};
use salon_core::{CostingMethod, Money, Sale, SaleItem, SaleStatus};

const SALE_COLUMNS: &str =
    "id, date, customer_id, subtotal_cents, tax_cents, total_cents, costing_method, status";
const LINE_COLUMNS: &str = "sale_id, item_id, name, employee_id, quantity, price_cents, \
                            total_cents, commission_rate, commission_cents, owner_cents, \
                            cogs_total_cents";

#[derive(Debug, FromRow)]
struct SaleRow {
    id: String,
    date: DateTime<Utc>,
    customer_id: Option<String>,
    subtotal_cents: i64,
    tax_cents: i64,
    total_cents: i64,
    costing_method: CostingMethod,
    status: SaleStatus,
}

impl SaleRow {
    fn into_sale(self, items: Vec<SaleItem>) -> Sale {
        Sale {
            id: self.id,
            date: self.date,
            customer_id: self.customer_id,
            items,
            subtotal: Money::from_cents(self.subtotal_cents),
            tax: Money::from_cents(self.tax_cents),
            total: Money::from_cents(self.total_cents),
            costing_method: self.costing_method,
            status: self.status,
        }
    }
}

#[derive(Debug, FromRow)]
struct SaleItemRow {
    sale_id: String,
    item_id: String,
    name: String,
    employee_id: String,
    quantity: i64,
    price_cents: i64,
    total_cents: i64,
    commission_rate: String,
    commission_cents: i64,
    owner_cents: i64,
    cogs_total_cents: Option<i64>,
}

impl TryFrom<SaleItemRow> for SaleItem {
    type Error = DbError;

    fn try_from(row: SaleItemRow) -> DbResult<Self> {
        Ok(SaleItem {
            commission_rate: parse_decimal("sale item", "commission_rate", &row.commission_rate)?,
            item_id: row.item_id,
            name: row.name,
            employee_id: row.employee_id,
            quantity: row.quantity,
            price: Money::from_cents(row.price_cents),
            total: Money::from_cents(row.total_cents),
            commission_amount: Money::from_cents(row.commission_cents),
            owner_amount: Money::from_cents(row.owner_cents),
            cogs_total: row.cogs_total_cents.map(Money::from_cents),
        })
    }
}

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Gets a sale with its lines.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let Some(row) = sqlx::query_as::<_, SaleRow>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, SaleItemRow>(&format!(
            "SELECT {LINE_COLUMNS} FROM sale_items WHERE sale_id = ?1 ORDER BY line_no"
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(SaleItem::try_from)
        .collect::<DbResult<Vec<_>>>()?;

        Ok(Some(row.into_sale(items)))
    }

    /// Sales dated in `[from, to)`, oldest first, voided ones included.
    pub async fn list_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> DbResult<Vec<Sale>> {
        let rows = sqlx::query_as::<_, SaleRow>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE date >= ?1 AND date < ?2 ORDER BY date, rowid"
        ))
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        let lines = sqlx::query_as::<_, SaleItemRow>(&format!(
            "SELECT {LINE_COLUMNS} FROM sale_items \
             WHERE sale_id IN (SELECT id FROM sales WHERE date >= ?1 AND date < ?2) \
             ORDER BY sale_id, line_no"
        ))
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        let mut by_sale: HashMap<String, Vec<SaleItem>> = HashMap::new();
        for line in lines {
            let sale_id = line.sale_id.clone();
            by_sale.entry(sale_id).or_default().push(SaleItem::try_from(line)?);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let items = by_sale.remove(&row.id).unwrap_or_default();
                row.into_sale(items)
            })
            .collect())
    }

    /// Marks a sale voided.
    ///
    /// Stock and batches are NOT restored; a returned product comes back
    /// through the inventory service as a `Return` batch.
    pub async fn void_sale(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE sales SET status = ?1 WHERE id = ?2 AND status = ?3")
            .bind(SaleStatus::Voided)
            .bind(id)
            .bind(SaleStatus::Completed)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Completed sale", id));
        }

        info!(sale_id = %id, "Sale voided");
        Ok(())
    }
}

// =============================================================================
// Connection-level operations
// =============================================================================

/// Inserts the sale header and every line.
pub(crate) async fn insert_sale_tx(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
    debug!(id = %sale.id, lines = sale.items.len(), "Inserting sale");

    sqlx::query(
        r#"
        INSERT INTO sales (
            id, date, customer_id, subtotal_cents, tax_cents, total_cents,
            costing_method, status
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&sale.id)
    .bind(sale.date)
    .bind(&sale.customer_id)
    .bind(sale.subtotal.cents())
    .bind(sale.tax.cents())
    .bind(sale.total.cents())
    .bind(sale.costing_method)
    .bind(sale.status)
    .execute(&mut *conn)
    .await?;

    for (line_no, line) in sale.items.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO sale_items (
                sale_id, line_no, item_id, name, employee_id, quantity, price_cents,
                total_cents, commission_rate, commission_cents, owner_cents, cogs_total_cents
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&sale.id)
        .bind(line_no as i64)
        .bind(&line.item_id)
        .bind(&line.name)
        .bind(&line.employee_id)
        .bind(line.quantity)
        .bind(line.price.cents())
        .bind(line.total.cents())
        .bind(decimal_text(line.commission_rate))
        .bind(line.commission_amount.cents())
        .bind(line.owner_amount.cents())
        .bind(line.cogs_total.map(|m| m.cents()))
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}
