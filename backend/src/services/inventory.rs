//! Inventory ledger service: stock lines, low-stock warnings and physical counts

use serde::{Deserialize, Serialize};
use shared::{
    InventoryCheck, InventoryLine, LocalClock, PaginatedResponse, Pagination, StockFigures,
};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Inventory service for ledger reads and reconciliation
#[derive(Clone)]
pub struct InventoryService {
    db: PgPool,
}

/// Ledger line joined with its plate
#[derive(Debug, Clone, FromRow)]
pub struct InventoryRow {
    #[sqlx(flatten)]
    pub line: InventoryLine,
    pub model: String,
    pub specification: String,
    pub unit: String,
}

/// Ledger line as reported to clients, with derived stock figures
#[derive(Debug, Clone, Serialize)]
pub struct InventoryView {
    #[serde(flatten)]
    pub line: InventoryLine,
    pub model: String,
    pub specification: String,
    pub unit: String,
    #[serde(flatten)]
    pub figures: StockFigures,
}

impl From<InventoryRow> for InventoryView {
    fn from(row: InventoryRow) -> Self {
        let figures = row.line.figures();
        Self {
            line: row.line,
            model: row.model,
            specification: row.specification,
            unit: row.unit,
            figures,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct InventoryFilter {
    /// Substring over model, specification and batch number
    pub search: Option<String>,
    /// Only lines at or below their warning threshold
    #[serde(default)]
    pub low_stock: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCheckInput {
    pub inventory_id: Uuid,
    #[validate(range(min = 0, message = "actual_quantity cannot be negative"))]
    pub actual_quantity: i32,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CheckFilter {
    pub inventory_id: Option<Uuid>,
    pub checker_id: Option<Uuid>,
}

/// Count joined with the checker's name
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct InventoryCheckView {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub check: InventoryCheck,
    pub checker_name: String,
}

/// Result of a reconciliation
#[derive(Debug, Serialize)]
pub struct CheckOutcome {
    pub check: InventoryCheck,
    pub inventory: InventoryLine,
}

const LINE_COLUMNS: &str =
    "id, plate_id, quantity, location, batch_number, warning_threshold, last_updated";

const VIEW_SELECT: &str = r#"
    SELECT i.id, i.plate_id, i.quantity, i.location, i.batch_number,
           i.warning_threshold, i.last_updated,
           p.model, p.specification, p.unit
    FROM inventory i
    JOIN plates p ON p.id = i.plate_id
"#;

const VIEW_FILTER: &str = r#"
    WHERE ($1::text IS NULL
           OR p.model ILIKE $1 OR p.specification ILIKE $1 OR i.batch_number ILIKE $1)
      AND (NOT $2 OR i.quantity <= i.warning_threshold)
"#;

impl InventoryService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Ledger lines, most recently updated first
    pub async fn list(
        &self,
        filter: InventoryFilter,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<InventoryView>> {
        let pagination = pagination.normalized();
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s));

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM inventory i JOIN plates p ON p.id = i.plate_id {}",
            VIEW_FILTER
        ))
        .bind(&search)
        .bind(filter.low_stock)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, InventoryRow>(&format!(
            "{} {} ORDER BY i.last_updated DESC LIMIT $3 OFFSET $4",
            VIEW_SELECT, VIEW_FILTER
        ))
        .bind(&search)
        .bind(filter.low_stock)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(
            rows.into_iter().map(InventoryView::from).collect(),
            pagination,
            total,
        ))
    }

    /// Low-stock lines, emptiest first
    pub async fn warnings(&self, pagination: Pagination) -> AppResult<PaginatedResponse<InventoryView>> {
        let pagination = pagination.normalized();

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM inventory WHERE quantity <= warning_threshold",
        )
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, InventoryRow>(&format!(
            "{} WHERE i.quantity <= i.warning_threshold ORDER BY i.quantity ASC, i.last_updated DESC LIMIT $1 OFFSET $2",
            VIEW_SELECT
        ))
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(
            rows.into_iter().map(InventoryView::from).collect(),
            pagination,
            total,
        ))
    }

    pub async fn get(&self, inventory_id: Uuid) -> AppResult<InventoryView> {
        sqlx::query_as::<_, InventoryRow>(&format!("{} WHERE i.id = $1", VIEW_SELECT))
            .bind(inventory_id)
            .fetch_optional(&self.db)
            .await?
            .map(InventoryView::from)
            .ok_or_else(|| AppError::NotFound("Inventory".to_string()))
    }

    /// Record a physical count and overwrite the line with it.
    ///
    /// Pending outbound requests against the line are not re-validated.
    pub async fn create_check(
        &self,
        checker_id: Uuid,
        input: CreateCheckInput,
        clock: &LocalClock,
    ) -> AppResult<CheckOutcome> {
        input.validate()?;

        let mut tx = self.db.begin().await?;

        let mut line = lock_line(&mut tx, input.inventory_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Inventory".to_string()))?;

        let now = clock.now();
        let check = InventoryCheck::reconcile(&mut line, input.actual_quantity, checker_id, input.note, now)?;

        sqlx::query(
            r#"
            INSERT INTO inventory_checks
                (id, inventory_id, expected_quantity, actual_quantity, difference, checker_id, check_time, note)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(check.id)
        .bind(check.inventory_id)
        .bind(check.expected_quantity)
        .bind(check.actual_quantity)
        .bind(check.difference)
        .bind(check.checker_id)
        .bind(check.check_time)
        .bind(&check.note)
        .execute(&mut *tx)
        .await?;

        save_line_quantity(&mut tx, &line).await?;

        tx.commit().await?;

        tracing::info!(
            inventory_id = %line.id,
            expected = check.expected_quantity,
            actual = check.actual_quantity,
            difference = check.difference,
            "inventory reconciled"
        );

        Ok(CheckOutcome {
            check,
            inventory: line,
        })
    }

    /// Physical counts, newest first
    pub async fn list_checks(
        &self,
        filter: CheckFilter,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<InventoryCheckView>> {
        let pagination = pagination.normalized();

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM inventory_checks
            WHERE ($1::uuid IS NULL OR inventory_id = $1)
              AND ($2::uuid IS NULL OR checker_id = $2)
            "#,
        )
        .bind(filter.inventory_id)
        .bind(filter.checker_id)
        .fetch_one(&self.db)
        .await?;

        let checks = sqlx::query_as::<_, InventoryCheckView>(
            r#"
            SELECT c.id, c.inventory_id, c.expected_quantity, c.actual_quantity, c.difference,
                   c.checker_id, c.check_time, c.note,
                   u.real_name AS checker_name
            FROM inventory_checks c
            JOIN users u ON u.id = c.checker_id
            WHERE ($1::uuid IS NULL OR c.inventory_id = $1)
              AND ($2::uuid IS NULL OR c.checker_id = $2)
            ORDER BY c.check_time DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(filter.inventory_id)
        .bind(filter.checker_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(checks, pagination, total))
    }
}

// ============================================================================
// Ledger primitives shared by the movement services. Every caller runs these
// inside its own transaction.
// ============================================================================

/// Lock a line by id for the rest of the transaction
pub async fn lock_line(conn: &mut PgConnection, inventory_id: Uuid) -> AppResult<Option<InventoryLine>> {
    Ok(sqlx::query_as::<_, InventoryLine>(&format!(
        "SELECT {} FROM inventory WHERE id = $1 FOR UPDATE",
        LINE_COLUMNS
    ))
    .bind(inventory_id)
    .fetch_optional(conn)
    .await?)
}

/// Lock the line holding `batch_number` of `plate_id`; no batch is its own key
pub async fn lock_batch_line(
    conn: &mut PgConnection,
    plate_id: Uuid,
    batch_number: Option<&str>,
) -> AppResult<Option<InventoryLine>> {
    Ok(sqlx::query_as::<_, InventoryLine>(&format!(
        r#"
        SELECT {} FROM inventory
        WHERE plate_id = $1 AND batch_number IS NOT DISTINCT FROM $2
        FOR UPDATE
        "#,
        LINE_COLUMNS
    ))
    .bind(plate_id)
    .bind(batch_number)
    .fetch_optional(conn)
    .await?)
}

/// The plate's fullest line, locked
pub async fn lock_fullest_line(conn: &mut PgConnection, plate_id: Uuid) -> AppResult<Option<InventoryLine>> {
    Ok(sqlx::query_as::<_, InventoryLine>(&format!(
        r#"
        SELECT {} FROM inventory
        WHERE plate_id = $1
        ORDER BY quantity DESC, last_updated DESC
        LIMIT 1
        FOR UPDATE
        "#,
        LINE_COLUMNS
    ))
    .bind(plate_id)
    .fetch_optional(conn)
    .await?)
}

pub async fn insert_line(conn: &mut PgConnection, line: &InventoryLine) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO inventory
            (id, plate_id, quantity, location, batch_number, warning_threshold, last_updated)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(line.id)
    .bind(line.plate_id)
    .bind(line.quantity)
    .bind(&line.location)
    .bind(&line.batch_number)
    .bind(line.warning_threshold)
    .bind(line.last_updated)
    .execute(conn)
    .await?;
    Ok(())
}

/// Persist the quantity and timestamp of a line mutated in memory
pub async fn save_line_quantity(conn: &mut PgConnection, line: &InventoryLine) -> AppResult<()> {
    sqlx::query("UPDATE inventory SET quantity = $2, last_updated = $3 WHERE id = $1")
        .bind(line.id)
        .bind(line.quantity)
        .bind(line.last_updated)
        .execute(conn)
        .await?;
    Ok(())
}
