//! # Staff Repository
//!
//! Employees and their per-item commission overrides.

use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::{decimal_text, parse_decimal};
use salon_core::roles::RateBook;
use salon_core::validation::{clamp_rate, validate_name, validate_required};
use salon_core::{CoreError, Employee, EmployeeService};
use rust_decimal::Decimal;

use super::item::list_categories_tx;

#[derive(Debug, FromRow)]
struct EmployeeRow {
    id: String,
    name: String,
    role: String,
    active: bool,
}

impl From<EmployeeRow> for Employee {
    fn from(row: EmployeeRow) -> Self {
        Employee {
            id: row.id,
            name: row.name,
            role: row.role,
            active: row.active,
        }
    }
}

#[derive(Debug, FromRow)]
struct ServiceRow {
    employee_id: String,
    item_id: String,
    commission_rate: String,
}

impl TryFrom<ServiceRow> for EmployeeService {
    type Error = DbError;

    fn try_from(row: ServiceRow) -> DbResult<Self> {
        Ok(EmployeeService {
            commission_rate: parse_decimal("employee service", "commission_rate", &row.commission_rate)?,
            employee_id: row.employee_id,
            item_id: row.item_id,
        })
    }
}

/// Repository for employees and commission overrides.
#[derive(Debug, Clone)]
pub struct StaffRepository {
    pool: SqlitePool,
}

impl StaffRepository {
    pub fn new(pool: SqlitePool) -> Self {
        StaffRepository { pool }
    }

    pub async fn insert(&self, employee: &Employee) -> DbResult<()> {
        validate_name(&employee.name).map_err(CoreError::from)?;
        validate_required("role", &employee.role).map_err(CoreError::from)?;

        debug!(id = %employee.id, role = %employee.role, "Inserting employee");

        sqlx::query("INSERT INTO employees (id, name, role, active) VALUES (?1, ?2, ?3, ?4)")
            .bind(&employee.id)
            .bind(&employee.name)
            .bind(&employee.role)
            .bind(employee.active)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Employee>> {
        let row = sqlx::query_as::<_, EmployeeRow>(
            "SELECT id, name, role, active FROM employees WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Employee::from))
    }

    /// Active employees, ordered by name.
    pub async fn list_active(&self) -> DbResult<Vec<Employee>> {
        let rows = sqlx::query_as::<_, EmployeeRow>(
            "SELECT id, name, role, active FROM employees WHERE active = 1 ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Employee::from).collect())
    }

    /// Deactivated employees stay on past sales but cannot take new lines.
    pub async fn set_active(&self, id: &str, active: bool) -> DbResult<()> {
        let result = sqlx::query("UPDATE employees SET active = ?1 WHERE id = ?2")
            .bind(active)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Employee", id));
        }
        Ok(())
    }

    /// Sets the commission override for (employee, item), clamped to 0..=100.
    pub async fn set_service_rate(&self, employee_id: &str, item_id: &str, rate: Decimal) -> DbResult<()> {
        let rate = clamp_rate(rate);
        debug!(employee_id, item_id, rate = %rate, "Setting commission override");

        sqlx::query(
            r#"
            INSERT INTO employee_services (employee_id, item_id, commission_rate)
            VALUES (?1, ?2, ?3)
            ON CONFLICT (employee_id, item_id) DO UPDATE SET commission_rate = excluded.commission_rate
            "#,
        )
        .bind(employee_id)
        .bind(item_id)
        .bind(decimal_text(rate))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Drops an override so the category default applies again.
    /// Returns whether an override existed.
    pub async fn remove_service_rate(&self, employee_id: &str, item_id: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM employee_services WHERE employee_id = ?1 AND item_id = ?2")
            .bind(employee_id)
            .bind(item_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn services_for(&self, employee_id: &str) -> DbResult<Vec<EmployeeService>> {
        let rows = sqlx::query_as::<_, ServiceRow>(
            "SELECT employee_id, item_id, commission_rate FROM employee_services \
             WHERE employee_id = ?1 ORDER BY item_id",
        )
        .bind(employee_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(EmployeeService::try_from).collect()
    }

    /// Category defaults plus every override.
    pub async fn rate_book(&self) -> DbResult<RateBook> {
        let mut conn = self.pool.acquire().await?;
        load_rate_book_tx(&mut conn, &[]).await
    }
}

// =============================================================================
// Connection-level operations
// =============================================================================

pub(crate) async fn fetch_employees_tx(
    conn: &mut SqliteConnection,
    ids: &[&str],
) -> DbResult<Vec<Employee>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut query = QueryBuilder::<Sqlite>::new(
        "SELECT id, name, role, active FROM employees WHERE id IN (",
    );
    let mut separated = query.separated(", ");
    for id in ids {
        separated.push_bind(id.to_string());
    }
    separated.push_unseparated(")");

    let rows = query
        .build_query_as::<EmployeeRow>()
        .fetch_all(&mut *conn)
        .await?;

    Ok(rows.into_iter().map(Employee::from).collect())
}

/// Builds a rate book. With `employee_ids` non-empty only those employees'
/// overrides are loaded; category defaults are always loaded in full.
pub(crate) async fn load_rate_book_tx(
    conn: &mut SqliteConnection,
    employee_ids: &[&str],
) -> DbResult<RateBook> {
    let categories = list_categories_tx(conn).await?;

    let mut query = QueryBuilder::<Sqlite>::new(
        "SELECT employee_id, item_id, commission_rate FROM employee_services",
    );
    if !employee_ids.is_empty() {
        query.push(" WHERE employee_id IN (");
        let mut separated = query.separated(", ");
        for id in employee_ids {
            separated.push_bind(id.to_string());
        }
        separated.push_unseparated(")");
    }

    let services = query
        .build_query_as::<ServiceRow>()
        .fetch_all(&mut *conn)
        .await?
        .into_iter()
        .map(EmployeeService::try_from)
        .collect::<DbResult<Vec<_>>>()?;

    Ok(RateBook::from_records(&categories, &services))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use rust_decimal_macros::dec;
    use salon_core::{Item, Money};

    async fn seeded() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.staff()
            .insert(&Employee {
                id: "ana".to_string(),
                name: "Ana".to_string(),
                role: "stylist".to_string(),
                active: true,
            })
            .await
            .unwrap();
        db.items()
            .insert(&Item {
                id: "cut".to_string(),
                name: "Haircut".to_string(),
                category_id: None,
                price: Money::from_cents(4000),
                is_service: true,
                stock: 0,
                average_cost: Money::zero(),
                reorder_threshold: 0,
            })
            .await
            .unwrap();
        db
    }

    #[tokio::test]
    async fn test_set_active_hides_employee() {
        let db = seeded().await;
        assert_eq!(db.staff().list_active().await.unwrap().len(), 1);

        db.staff().set_active("ana", false).await.unwrap();
        assert!(db.staff().list_active().await.unwrap().is_empty());
        assert!(!db.staff().get_by_id("ana").await.unwrap().unwrap().active);
    }

    #[tokio::test]
    async fn test_service_rate_is_clamped_and_upserted() {
        let db = seeded().await;
        db.staff().set_service_rate("ana", "cut", dec!(120)).await.unwrap();
        assert_eq!(db.staff().services_for("ana").await.unwrap()[0].commission_rate, dec!(100));

        db.staff().set_service_rate("ana", "cut", dec!(55)).await.unwrap();
        let services = db.staff().services_for("ana").await.unwrap();
        assert_eq!(services.len(), 1);
        assert_eq!(services[0].commission_rate, dec!(55));

        assert!(db.staff().remove_service_rate("ana", "cut").await.unwrap());
        assert!(!db.staff().remove_service_rate("ana", "cut").await.unwrap());
    }

    #[tokio::test]
    async fn test_override_requires_known_item() {
        let db = seeded().await;
        let result = db.staff().set_service_rate("ana", "ghost", dec!(50)).await;
        assert!(matches!(result, Err(DbError::ForeignKeyViolation { .. })));
    }
}
