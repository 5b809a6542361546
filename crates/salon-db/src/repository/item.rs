//! # Item Repository
//!
//! Catalog storage: items, the categories that carry their default
//! commission split, and which roles may perform each category.
//!
//! ## Stock Columns
//! ```text
//! items.stock               authoritative on-hand count
//! items.average_cost_cents  cached from the batch ledger, rewritten after
//!                           every movement by update_stock_tx()
//! ```

use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::{decimal_text, parse_decimal};
use salon_core::roles::RoleEligibility;
use salon_core::validation::{validate_name, validate_non_negative};
use salon_core::{Category, Item, Money};

const ITEM_COLUMNS: &str = "id, name, category_id, price_cents, is_service, stock, \
                            average_cost_cents, reorder_threshold";

// =============================================================================
// Rows
// =============================================================================

#[derive(Debug, FromRow)]
struct ItemRow {
    id: String,
    name: String,
    category_id: Option<String>,
    price_cents: i64,
    is_service: bool,
    stock: i64,
    average_cost_cents: i64,
    reorder_threshold: i64,
}

impl From<ItemRow> for Item {
    fn from(row: ItemRow) -> Self {
        Item {
            id: row.id,
            name: row.name,
            category_id: row.category_id,
            price: Money::from_cents(row.price_cents),
            is_service: row.is_service,
            stock: row.stock,
            average_cost: Money::from_cents(row.average_cost_cents),
            reorder_threshold: row.reorder_threshold,
        }
    }
}

#[derive(Debug, FromRow)]
struct CategoryRow {
    id: String,
    name: String,
    commission_rate: String,
    salon_owner_rate: String,
}

impl TryFrom<CategoryRow> for Category {
    type Error = DbError;

    fn try_from(row: CategoryRow) -> DbResult<Self> {
        Ok(Category {
            commission_rate: parse_decimal("category", "commission_rate", &row.commission_rate)?,
            salon_owner_rate: parse_decimal("category", "salon_owner_rate", &row.salon_owner_rate)?,
            id: row.id,
            name: row.name,
        })
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for catalog operations.
#[derive(Debug, Clone)]
pub struct ItemRepository {
    pool: SqlitePool,
}

impl ItemRepository {
    /// Creates a new ItemRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ItemRepository { pool }
    }

    /// Inserts a new item.
    ///
    /// Stock and average cost normally start at zero and move only through
    /// the inventory service.
    pub async fn insert(&self, item: &Item) -> DbResult<()> {
        validate_name(&item.name).map_err(salon_core::CoreError::from)?;
        validate_non_negative("price", item.price).map_err(salon_core::CoreError::from)?;

        debug!(id = %item.id, name = %item.name, is_service = item.is_service, "Inserting item");

        sqlx::query(
            r#"
            INSERT INTO items (
                id, name, category_id, price_cents, is_service,
                stock, average_cost_cents, reorder_threshold
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&item.id)
        .bind(&item.name)
        .bind(&item.category_id)
        .bind(item.price.cents())
        .bind(item.is_service)
        .bind(item.stock)
        .bind(item.average_cost.cents())
        .bind(item.reorder_threshold)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets an item by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Item>> {
        let mut conn = self.pool.acquire().await?;
        get_item_tx(&mut conn, id).await
    }

    /// Lists every item, ordered by name.
    pub async fn list(&self) -> DbResult<Vec<Item>> {
        let rows = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM items ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Item::from).collect())
    }

    /// Physical items at or below their reorder threshold.
    pub async fn low_stock(&self) -> DbResult<Vec<Item>> {
        let rows = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM items \
             WHERE is_service = 0 AND stock <= reorder_threshold \
             ORDER BY stock, name"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Item::from).collect())
    }

    /// Changes an item's price. Past sales keep the price they froze.
    pub async fn update_price(&self, id: &str, price: Money) -> DbResult<()> {
        validate_non_negative("price", price).map_err(salon_core::CoreError::from)?;

        let result = sqlx::query("UPDATE items SET price_cents = ?1 WHERE id = ?2")
            .bind(price.cents())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Item", id));
        }
        Ok(())
    }

    // =========================================================================
    // Categories
    // =========================================================================

    /// Inserts a category. Rates are stored as given; clamping happens
    /// when they are loaded into a rate book.
    pub async fn insert_category(&self, category: &Category) -> DbResult<()> {
        validate_name(&category.name).map_err(salon_core::CoreError::from)?;

        sqlx::query(
            r#"
            INSERT INTO categories (id, name, commission_rate, salon_owner_rate)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&category.id)
        .bind(&category.name)
        .bind(decimal_text(category.commission_rate))
        .bind(decimal_text(category.salon_owner_rate))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn list_categories(&self) -> DbResult<Vec<Category>> {
        let mut conn = self.pool.acquire().await?;
        list_categories_tx(&mut conn).await
    }

    /// Allows `role` to perform items in `category_id`.
    pub async fn allow_role(&self, category_id: &str, role: &str) -> DbResult<()> {
        sqlx::query("INSERT OR IGNORE INTO category_roles (category_id, role) VALUES (?1, ?2)")
            .bind(category_id)
            .bind(role)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn eligibility(&self) -> DbResult<RoleEligibility> {
        let mut conn = self.pool.acquire().await?;
        load_eligibility_tx(&mut conn).await
    }
}

// =============================================================================
// Connection-level operations
// =============================================================================

pub(crate) async fn get_item_tx(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Item>> {
    let row = sqlx::query_as::<_, ItemRow>(&format!(
        "SELECT {ITEM_COLUMNS} FROM items WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(Item::from))
}

/// Loads the given items. Unknown ids are simply absent from the result.
pub(crate) async fn fetch_items_tx(
    conn: &mut SqliteConnection,
    ids: &[&str],
) -> DbResult<Vec<Item>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut query = QueryBuilder::<Sqlite>::new(format!(
        "SELECT {ITEM_COLUMNS} FROM items WHERE id IN ("
    ));
    let mut separated = query.separated(", ");
    for id in ids {
        separated.push_bind(id.to_string());
    }
    separated.push_unseparated(")");

    let rows = query
        .build_query_as::<ItemRow>()
        .fetch_all(&mut *conn)
        .await?;

    Ok(rows.into_iter().map(Item::from).collect())
}

/// Writes back the stock count and cached average cost.
pub(crate) async fn update_stock_tx(conn: &mut SqliteConnection, item: &Item) -> DbResult<()> {
    let result = sqlx::query("UPDATE items SET stock = ?1, average_cost_cents = ?2 WHERE id = ?3")
        .bind(item.stock)
        .bind(item.average_cost.cents())
        .bind(&item.id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Item", &item.id));
    }
    Ok(())
}

pub(crate) async fn list_categories_tx(conn: &mut SqliteConnection) -> DbResult<Vec<Category>> {
    let rows = sqlx::query_as::<_, CategoryRow>(
        "SELECT id, name, commission_rate, salon_owner_rate FROM categories ORDER BY name",
    )
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter().map(Category::try_from).collect()
}

pub(crate) async fn load_eligibility_tx(conn: &mut SqliteConnection) -> DbResult<RoleEligibility> {
    let pairs: Vec<(String, String)> =
        sqlx::query_as("SELECT category_id, role FROM category_roles")
            .fetch_all(&mut *conn)
            .await?;

    Ok(RoleEligibility::from_pairs(pairs))
}
