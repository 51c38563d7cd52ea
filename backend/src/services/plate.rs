//! Plate catalog service

use serde::Deserialize;
use shared::{ensure_not_blank, unit_or_default, PaginatedResponse, Pagination, Plate};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{is_unique_violation, AppError, AppResult};

/// Plate catalog service
#[derive(Clone)]
pub struct PlateService {
    db: PgPool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePlateInput {
    #[validate(length(min = 1, max = 100, message = "model is required"))]
    pub model: String,
    #[validate(length(min = 1, max = 100, message = "specification is required"))]
    pub specification: String,
    #[validate(length(max = 20))]
    pub unit: Option<String>,
    #[validate(length(max = 200))]
    pub supplier: Option<String>,
    pub note: Option<String>,
}

/// Partial update; absent fields are left untouched
#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePlateInput {
    #[validate(length(min = 1, max = 100))]
    pub model: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub specification: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub unit: Option<String>,
    #[validate(length(max = 200))]
    pub supplier: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PlateFilter {
    /// Substring over model, specification and supplier
    pub search: Option<String>,
}

const PLATE_COLUMNS: &str = "id, model, specification, unit, supplier, note";

fn duplicate_plate() -> AppError {
    AppError::conflict(
        "plate",
        "A plate with this model and specification already exists",
        "该型号和规格的铝板已存在",
    )
}

impl PlateService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(
        &self,
        filter: PlateFilter,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<Plate>> {
        let pagination = pagination.normalized();
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s));

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM plates
            WHERE ($1::text IS NULL
                   OR model ILIKE $1 OR specification ILIKE $1 OR supplier ILIKE $1)
            "#,
        )
        .bind(&search)
        .fetch_one(&self.db)
        .await?;

        let plates = sqlx::query_as::<_, Plate>(&format!(
            r#"
            SELECT {} FROM plates
            WHERE ($1::text IS NULL
                   OR model ILIKE $1 OR specification ILIKE $1 OR supplier ILIKE $1)
            ORDER BY model, specification
            LIMIT $2 OFFSET $3
            "#,
            PLATE_COLUMNS
        ))
        .bind(&search)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(plates, pagination, total))
    }

    pub async fn get(&self, plate_id: Uuid) -> AppResult<Plate> {
        sqlx::query_as::<_, Plate>(&format!("SELECT {} FROM plates WHERE id = $1", PLATE_COLUMNS))
            .bind(plate_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Plate".to_string()))
    }

    pub async fn create(&self, input: CreatePlateInput) -> AppResult<Plate> {
        input.validate()?;
        ensure_not_blank("model", &input.model)?;
        ensure_not_blank("specification", &input.specification)?;

        let plate = sqlx::query_as::<_, Plate>(&format!(
            r#"
            INSERT INTO plates (id, model, specification, unit, supplier, note)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            PLATE_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(input.model.trim())
        .bind(input.specification.trim())
        .bind(unit_or_default(input.unit.as_deref()))
        .bind(&input.supplier)
        .bind(&input.note)
        .fetch_one(&self.db)
        .await
        .map_err(|e| if is_unique_violation(&e) { duplicate_plate() } else { e.into() })?;

        tracing::info!(plate_id = %plate.id, label = %plate.label(), "plate created");
        Ok(plate)
    }

    pub async fn update(&self, plate_id: Uuid, input: UpdatePlateInput) -> AppResult<Plate> {
        input.validate()?;
        let current = self.get(plate_id).await?;

        let model = input.model.map(|m| m.trim().to_string()).unwrap_or(current.model);
        let specification = input
            .specification
            .map(|s| s.trim().to_string())
            .unwrap_or(current.specification);
        ensure_not_blank("model", &model)?;
        ensure_not_blank("specification", &specification)?;

        sqlx::query_as::<_, Plate>(&format!(
            r#"
            UPDATE plates
            SET model = $2, specification = $3, unit = $4, supplier = $5, note = $6
            WHERE id = $1
            RETURNING {}
            "#,
            PLATE_COLUMNS
        ))
        .bind(plate_id)
        .bind(&model)
        .bind(&specification)
        .bind(input.unit.unwrap_or(current.unit))
        .bind(input.supplier.or(current.supplier))
        .bind(input.note.or(current.note))
        .fetch_one(&self.db)
        .await
        .map_err(|e| if is_unique_violation(&e) { duplicate_plate() } else { e.into() })
    }

    /// Delete a plate with no stock lines and no movement history
    pub async fn delete(&self, plate_id: Uuid) -> AppResult<()> {
        self.get(plate_id).await?;

        let (lines, inbound, outbound) = sqlx::query_as::<_, (i64, i64, i64)>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM inventory WHERE plate_id = $1),
                (SELECT COUNT(*) FROM inbound_records WHERE plate_id = $1),
                (SELECT COUNT(*) FROM outbound_records WHERE plate_id = $1)
            "#,
        )
        .bind(plate_id)
        .fetch_one(&self.db)
        .await?;

        if lines > 0 || inbound > 0 || outbound > 0 {
            return Err(AppError::conflict(
                "plate",
                format!(
                    "Plate is still referenced: {} inventory lines, {} inbound records, {} outbound records",
                    lines, inbound, outbound
                ),
                format!(
                    "无法删除该铝板，存在关联数据：库存 {} 条、入库记录 {} 条、出库记录 {} 条",
                    lines, inbound, outbound
                ),
            ));
        }

        sqlx::query("DELETE FROM plates WHERE id = $1")
            .bind(plate_id)
            .execute(&self.db)
            .await?;

        tracing::info!(plate_id = %plate_id, "plate deleted");
        Ok(())
    }
}

/// Load a plate inside a caller's transaction
pub async fn find_plate(conn: &mut PgConnection, plate_id: Uuid) -> AppResult<Plate> {
    sqlx::query_as::<_, Plate>(&format!("SELECT {} FROM plates WHERE id = $1", PLATE_COLUMNS))
        .bind(plate_id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Plate".to_string()))
}
