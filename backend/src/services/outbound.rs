//! Outbound approval workflow.
//!
//! A request checks stock but reserves nothing; approval re-checks and
//! decrements the ledger line under a row lock. Each operation is one
//! transaction, so a failure at any step leaves no partial effect.

use serde::{Deserialize, Serialize};
use shared::{
    parse_time_window, DispatchTask, InventoryLine, LocalClock, OutboundRecord, OutboundStatus,
    PaginatedResponse, Pagination, RESERVED_ADMIN_USERNAME,
};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::config::WarehouseConfig;
use crate::error::{AppError, AppResult};
use crate::services::inventory::{lock_fullest_line, lock_line, save_line_quantity};
use crate::services::operator::{OperatorDirectory, OperatorRef};
use crate::services::plate::find_plate;
use crate::services::task::insert_task;

/// Outbound service
#[derive(Clone)]
pub struct OutboundService {
    db: PgPool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOutboundInput {
    pub plate_id: Uuid,
    #[validate(range(min = 1, message = "quantity must be greater than 0"))]
    pub quantity: i32,
    /// Line to draw from; defaults to the plate's fullest line
    pub inventory_id: Option<Uuid>,
    pub applicant_id: Option<Uuid>,
    pub applicant_name: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RejectOutboundInput {
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OutboundFilter {
    pub status: Option<OutboundStatus>,
    pub plate_id: Option<Uuid>,
    pub applicant_id: Option<Uuid>,
    /// Bounds over outbound_time, so only approved records match a range
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Outbound record joined with plate and user names
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OutboundRecordView {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub record: OutboundRecord,
    pub plate_model: String,
    pub plate_specification: String,
    pub applicant_name: String,
    pub approver_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OutboundRequestOutcome {
    pub outbound: OutboundRecord,
    pub review_task: DispatchTask,
}

#[derive(Debug, Serialize)]
pub struct OutboundDecisionOutcome {
    pub outbound: OutboundRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inventory: Option<InventoryLine>,
}

const RECORD_COLUMNS: &str = "id, plate_id, inventory_id, quantity, applicant_id, approver_id, status, outbound_time, note, created_at";

const VIEW_SELECT: &str = r#"
    SELECT o.id, o.plate_id, o.inventory_id, o.quantity, o.applicant_id, o.approver_id,
           o.status, o.outbound_time, o.note, o.created_at,
           p.model AS plate_model, p.specification AS plate_specification,
           a.real_name AS applicant_name, v.real_name AS approver_name
    FROM outbound_records o
    JOIN plates p ON p.id = o.plate_id
    JOIN users a ON a.id = o.applicant_id
    LEFT JOIN users v ON v.id = o.approver_id
"#;

const VIEW_FILTER: &str = r#"
    WHERE ($1::outbound_status IS NULL OR o.status = $1)
      AND ($2::uuid IS NULL OR o.plate_id = $2)
      AND ($3::uuid IS NULL OR o.applicant_id = $3)
      AND ($4::timestamp IS NULL OR o.outbound_time >= $4)
      AND ($5::timestamp IS NULL OR o.outbound_time < $5)
"#;

impl OutboundService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Open a pending request and a high-priority review task for it
    pub async fn create(
        &self,
        caller_id: Uuid,
        input: CreateOutboundInput,
        warehouse: &WarehouseConfig,
        clock: &LocalClock,
    ) -> AppResult<OutboundRequestOutcome> {
        input.validate()?;
        let now = clock.now();

        let mut tx = self.db.begin().await?;

        let plate = find_plate(&mut tx, input.plate_id).await?;

        let applicant = OperatorDirectory::new(warehouse, clock)
            .resolve(
                &mut tx,
                &OperatorRef {
                    id: input.applicant_id,
                    name: input.applicant_name,
                },
                caller_id,
            )
            .await?;

        let line = match input.inventory_id {
            Some(inventory_id) => {
                let line = lock_line(&mut tx, inventory_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound("Inventory".to_string()))?;
                if line.plate_id != plate.id {
                    return Err(AppError::validation(
                        "inventory_id",
                        "Inventory line does not belong to this plate",
                        "库存记录与铝板不匹配",
                    ));
                }
                line
            }
            None => lock_fullest_line(&mut tx, plate.id)
                .await?
                .ok_or_else(|| AppError::NotFound("Inventory for this plate".to_string()))?,
        };

        let record = OutboundRecord::request(&line, input.quantity, applicant.id, input.note, now)?;
        insert_record(&mut tx, &record).await?;

        let assignee_id = review_assignee(&mut tx).await?.unwrap_or(applicant.id);
        let review_task = record.review_task(&plate.label(), &applicant.real_name, assignee_id, now);
        insert_task(&mut tx, &review_task).await?;

        tx.commit().await?;

        tracing::info!(
            outbound_id = %record.id,
            plate = %plate.label(),
            quantity = record.quantity,
            inventory_id = %line.id,
            task_id = %review_task.id,
            "outbound requested"
        );

        Ok(OutboundRequestOutcome {
            outbound: record,
            review_task,
        })
    }

    /// Approve a pending request and take its stock out of the ledger
    pub async fn approve(
        &self,
        approver_id: Uuid,
        outbound_id: Uuid,
        clock: &LocalClock,
    ) -> AppResult<OutboundDecisionOutcome> {
        let mut tx = self.db.begin().await?;

        let mut record = lock_record(&mut tx, outbound_id).await?;
        let mut line = lock_line(&mut tx, record.inventory_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Inventory".to_string()))?;

        record.approve(&mut line, approver_id, clock.now())?;

        save_decision(&mut tx, &record).await?;
        save_line_quantity(&mut tx, &line).await?;

        tx.commit().await?;

        tracing::info!(
            outbound_id = %record.id,
            approver_id = %approver_id,
            quantity = record.quantity,
            remaining = line.quantity,
            "outbound approved"
        );

        Ok(OutboundDecisionOutcome {
            outbound: record,
            inventory: Some(line),
        })
    }

    /// Reject a pending request; the ledger is untouched
    pub async fn reject(
        &self,
        approver_id: Uuid,
        outbound_id: Uuid,
        input: RejectOutboundInput,
    ) -> AppResult<OutboundDecisionOutcome> {
        let mut tx = self.db.begin().await?;

        let mut record = lock_record(&mut tx, outbound_id).await?;
        record.reject(approver_id, input.reason.as_deref())?;
        save_decision(&mut tx, &record).await?;

        tx.commit().await?;

        tracing::info!(outbound_id = %record.id, approver_id = %approver_id, "outbound rejected");

        Ok(OutboundDecisionOutcome {
            outbound: record,
            inventory: None,
        })
    }

    /// Outbound records, newest first
    pub async fn list(
        &self,
        filter: OutboundFilter,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<OutboundRecordView>> {
        let pagination = pagination.normalized();
        let window = parse_time_window(filter.start_date.as_deref(), filter.end_date.as_deref())?;

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM outbound_records o {}",
            VIEW_FILTER
        ))
        .bind(filter.status)
        .bind(filter.plate_id)
        .bind(filter.applicant_id)
        .bind(window.from)
        .bind(window.until)
        .fetch_one(&self.db)
        .await?;

        let records = sqlx::query_as::<_, OutboundRecordView>(&format!(
            "{} {} ORDER BY o.created_at DESC LIMIT $6 OFFSET $7",
            VIEW_SELECT, VIEW_FILTER
        ))
        .bind(filter.status)
        .bind(filter.plate_id)
        .bind(filter.applicant_id)
        .bind(window.from)
        .bind(window.until)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(records, pagination, total))
    }

    pub async fn get(&self, outbound_id: Uuid) -> AppResult<OutboundRecordView> {
        sqlx::query_as::<_, OutboundRecordView>(&format!("{} WHERE o.id = $1", VIEW_SELECT))
            .bind(outbound_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Outbound record".to_string()))
    }
}

async fn insert_record(conn: &mut PgConnection, record: &OutboundRecord) -> AppResult<()> {
    sqlx::query(&format!(
        "INSERT INTO outbound_records ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        RECORD_COLUMNS
    ))
    .bind(record.id)
    .bind(record.plate_id)
    .bind(record.inventory_id)
    .bind(record.quantity)
    .bind(record.applicant_id)
    .bind(record.approver_id)
    .bind(record.status)
    .bind(record.outbound_time)
    .bind(&record.note)
    .bind(record.created_at)
    .execute(conn)
    .await?;
    Ok(())
}

async fn lock_record(conn: &mut PgConnection, outbound_id: Uuid) -> AppResult<OutboundRecord> {
    sqlx::query_as::<_, OutboundRecord>(&format!(
        "SELECT {} FROM outbound_records WHERE id = $1 FOR UPDATE",
        RECORD_COLUMNS
    ))
    .bind(outbound_id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Outbound record".to_string()))
}

async fn save_decision(conn: &mut PgConnection, record: &OutboundRecord) -> AppResult<()> {
    sqlx::query(
        r#"
        UPDATE outbound_records
        SET status = $2, approver_id = $3, outbound_time = $4, note = $5
        WHERE id = $1
        "#,
    )
    .bind(record.id)
    .bind(record.status)
    .bind(record.approver_id)
    .bind(record.outbound_time)
    .bind(&record.note)
    .execute(conn)
    .await?;
    Ok(())
}

/// First active admin, else the reserved admin account
async fn review_assignee(conn: &mut PgConnection) -> AppResult<Option<Uuid>> {
    Ok(sqlx::query_scalar::<_, Uuid>(
        r#"
        SELECT id FROM users
        WHERE (role = 'admin' AND status = 'active') OR username = $1
        ORDER BY (role = 'admin' AND status = 'active') DESC, created_at
        LIMIT 1
        "#,
    )
    .bind(RESERVED_ADMIN_USERNAME)
    .fetch_optional(conn)
    .await?)
}
