//! # Settings Repository
//!
//! Runtime key/value settings, editable while the store is open. The
//! costing method lives here so a change applies to the next sale without
//! a restart. Past sales keep the method recorded on them.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use std::str::FromStr;
use tracing::info;

use crate::error::{DbError, DbResult};
use salon_core::CostingMethod;

/// Key under which the costing method is stored.
pub const COSTING_METHOD_KEY: &str = "inventory.costing_method";

#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SettingsRepository { pool }
    }

    pub async fn get(&self, key: &str) -> DbResult<Option<String>> {
        let mut conn = self.pool.acquire().await?;
        get_tx(&mut conn, key).await
    }

    pub async fn set(&self, key: &str, value: &str) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT (key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// The stored costing method, `None` when never set.
    pub async fn costing_method(&self) -> DbResult<Option<CostingMethod>> {
        let mut conn = self.pool.acquire().await?;
        costing_method_tx(&mut conn).await
    }

    pub async fn set_costing_method(&self, method: CostingMethod) -> DbResult<()> {
        self.set(COSTING_METHOD_KEY, &method.to_string()).await?;
        info!(method = %method, "Costing method changed");
        Ok(())
    }
}

pub(crate) async fn get_tx(conn: &mut SqliteConnection, key: &str) -> DbResult<Option<String>> {
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?1")
        .bind(key)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(value)
}

pub(crate) async fn costing_method_tx(conn: &mut SqliteConnection) -> DbResult<Option<CostingMethod>> {
    get_tx(conn, COSTING_METHOD_KEY)
        .await?
        .map(|raw| {
            CostingMethod::from_str(&raw).map_err(|e| DbError::corrupt("setting", e))
        })
        .transpose()
}
