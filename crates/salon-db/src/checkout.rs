//! # Checkout
//!
//! Runs a cart through [`SaleSettler`] inside one database transaction.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        checkout(cart, config)                           │
//! │                                                                         │
//! │  BEGIN                                                                 │
//! │    │                                                                    │
//! │    ├── settings.costing_method overrides config (read per sale)        │
//! │    ├── load touched items, employees, batches                          │
//! │    ├── load rate book + role eligibility                               │
//! │    │                                                                    │
//! │    ├── SaleSettler::settle()  ── Err ──► drop tx (ROLLBACK)            │
//! │    │         │                                                          │
//! │    │         ▼                                                          │
//! │    ├── INSERT sale, sale_items                                          │
//! │    ├── INSERT usage records                                             │
//! │    ├── UPDATE items (stock, average cost)                               │
//! │    ├── UPDATE batches (remaining quantity)                              │
//! │    │                                                                    │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Either every row above is written or none is. Two checkouts touching the
//! same batch are serialized by SQLite's write lock; the loser waits up to
//! the pool's busy timeout and otherwise fails with a storage error, never
//! with a lost update.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::DbResult;
use crate::repository::inventory::{insert_record_tx, load_ledger_tx, update_remaining_tx};
use crate::repository::item::{fetch_items_tx, load_eligibility_tx, update_stock_tx};
use crate::repository::sale::insert_sale_tx;
use crate::repository::settings::costing_method_tx;
use crate::repository::staff::{fetch_employees_tx, load_rate_book_tx};
use salon_core::{Cart, SaleSettler, SettledSale, SettlementConfig, SettlementState};

#[derive(Debug, Clone)]
pub struct CheckoutService {
    pool: SqlitePool,
}

impl CheckoutService {
    pub fn new(pool: SqlitePool) -> Self {
        CheckoutService { pool }
    }

    /// Settles `cart` now.
    ///
    /// ## Errors
    /// - `DbError::Core` when the sale is rejected (nothing is written)
    /// - any storage error (the transaction is rolled back)
    pub async fn checkout(&self, cart: &Cart, config: &SettlementConfig) -> DbResult<SettledSale> {
        self.checkout_at(cart, config, Utc::now()).await
    }

    /// Settles `cart` with an explicit sale timestamp.
    pub async fn checkout_at(
        &self,
        cart: &Cart,
        config: &SettlementConfig,
        date: DateTime<Utc>,
    ) -> DbResult<SettledSale> {
        let mut tx = self.pool.begin().await?;

        let mut config = *config;
        if let Some(method) = costing_method_tx(&mut tx).await? {
            config.costing_method = method;
        }

        let mut state = load_state_tx(&mut tx, cart).await?;

        let mut settler = SaleSettler::new(config).at(date);
        let settled = settler.settle(cart, &mut state)?;

        persist_tx(&mut tx, &settled).await?;
        tx.commit().await?;

        info!(
            sale_id = %settled.sale.id,
            total = %settled.sale.total,
            records = settled.inventory_records.len(),
            "Checkout committed"
        );
        Ok(settled)
    }
}

/// Loads only what the cart touches. Category rates and role eligibility
/// are small and loaded whole.
async fn load_state_tx(conn: &mut SqliteConnection, cart: &Cart) -> DbResult<SettlementState> {
    let item_ids = cart.item_ids();
    if item_ids.is_empty() {
        return Ok(SettlementState::new());
    }
    let employee_ids = cart.employee_ids();

    let items = fetch_items_tx(conn, &item_ids).await?;
    let employees = fetch_employees_tx(conn, &employee_ids).await?;

    let physical: Vec<&str> = items
        .iter()
        .filter(|item| item.is_physical())
        .map(|item| item.id.as_str())
        .collect();
    let ledger = if physical.is_empty() {
        Default::default()
    } else {
        load_ledger_tx(conn, &physical).await?
    };

    let rates = load_rate_book_tx(conn, &employee_ids).await?;
    let eligibility = load_eligibility_tx(conn).await?;

    debug!(items = items.len(), employees = employees.len(), "Settlement state loaded");

    Ok(SettlementState {
        items: items.into_iter().map(|i| (i.id.clone(), i)).collect(),
        employees: employees.into_iter().map(|e| (e.id.clone(), e)).collect(),
        ledger,
        rates,
        eligibility,
    })
}

async fn persist_tx(conn: &mut SqliteConnection, settled: &SettledSale) -> DbResult<()> {
    // Sale first: usage records reference it
    insert_sale_tx(conn, &settled.sale).await?;

    for record in &settled.inventory_records {
        insert_record_tx(conn, record).await?;
    }
    for item in &settled.updated_items {
        update_stock_tx(conn, item).await?;
    }
    for batch in &settled.updated_batches {
        update_remaining_tx(conn, batch).await?;
    }

    Ok(())
}
