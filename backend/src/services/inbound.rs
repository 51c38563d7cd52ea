//! Inbound (restock) service: records receipts and credits the ledger

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use shared::{
    ensure_non_negative, parse_time_window, InboundRecord, InventoryLine, LocalClock,
    PaginatedResponse, Pagination, TimeWindow,
};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::config::WarehouseConfig;
use crate::error::{is_unique_violation, AppError, AppResult};
use crate::services::inventory::{insert_line, lock_batch_line, save_line_quantity};
use crate::services::operator::{OperatorDirectory, OperatorRef};
use crate::services::plate::find_plate;

/// Inbound service
#[derive(Clone)]
pub struct InboundService {
    db: PgPool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateInboundInput {
    pub plate_id: Uuid,
    #[validate(range(min = 1, message = "quantity must be greater than 0"))]
    pub quantity: i32,
    #[validate(length(max = 100))]
    pub batch_number: Option<String>,
    #[validate(length(max = 200))]
    pub supplier: Option<String>,
    #[validate(length(max = 100))]
    pub location: Option<String>,
    pub warning_threshold: Option<i32>,
    pub operator_id: Option<Uuid>,
    pub operator_name: Option<String>,
    pub note: Option<String>,
}

/// Inbound record joined with plate and operator names
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct InboundRecordView {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub record: InboundRecord,
    pub plate_model: String,
    pub plate_specification: String,
    pub plate_unit: String,
    pub operator_name: String,
}

#[derive(Debug, Serialize)]
pub struct InboundOutcome {
    pub inbound_record: InboundRecordView,
    pub inventory: InventoryLine,
}

#[derive(Debug, Default, Deserialize)]
pub struct InboundFilter {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub plate_model: Option<String>,
    pub batch_number: Option<String>,
    pub supplier: Option<String>,
}

/// One spreadsheet row of the inbound export
#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    #[serde(rename = "序号")]
    index: usize,
    #[serde(rename = "铝板型号")]
    model: &'a str,
    #[serde(rename = "铝板规格")]
    specification: &'a str,
    #[serde(rename = "入库数量")]
    quantity: i32,
    #[serde(rename = "单位")]
    unit: &'a str,
    #[serde(rename = "批次号")]
    batch_number: &'a str,
    #[serde(rename = "供应商")]
    supplier: &'a str,
    #[serde(rename = "操作员")]
    operator: &'a str,
    #[serde(rename = "入库时间")]
    inbound_time: String,
    #[serde(rename = "备注")]
    note: &'a str,
}

const VIEW_SELECT: &str = r#"
    SELECT r.id, r.plate_id, r.quantity, r.batch_number, r.supplier,
           r.operator_id, r.inbound_time, r.note,
           p.model AS plate_model, p.specification AS plate_specification,
           p.unit AS plate_unit, u.real_name AS operator_name
    FROM inbound_records r
    JOIN plates p ON p.id = r.plate_id
    JOIN users u ON u.id = r.operator_id
"#;

const VIEW_FILTER: &str = r#"
    WHERE ($1::timestamp IS NULL OR r.inbound_time >= $1)
      AND ($2::timestamp IS NULL OR r.inbound_time < $2)
      AND ($3::text IS NULL OR p.model ILIKE $3)
      AND ($4::text IS NULL OR r.batch_number ILIKE $4)
      AND ($5::text IS NULL OR r.supplier ILIKE $5)
"#;

/// Bound filter values in `VIEW_FILTER` parameter order
struct BoundFilter {
    window: TimeWindow,
    plate_model: Option<String>,
    batch_number: Option<String>,
    supplier: Option<String>,
}

fn like(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| format!("%{}%", v))
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl BoundFilter {
    fn parse(filter: &InboundFilter) -> AppResult<Self> {
        Ok(Self {
            window: parse_time_window(filter.start_date.as_deref(), filter.end_date.as_deref())?,
            plate_model: like(filter.plate_model.as_deref()),
            batch_number: like(filter.batch_number.as_deref()),
            supplier: like(filter.supplier.as_deref()),
        })
    }
}

impl InboundService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record a receipt and credit the (plate, batch) line in one transaction
    pub async fn create(
        &self,
        caller_id: Uuid,
        input: CreateInboundInput,
        warehouse: &WarehouseConfig,
        clock: &LocalClock,
    ) -> AppResult<InboundOutcome> {
        input.validate()?;
        if let Some(threshold) = input.warning_threshold {
            ensure_non_negative("warning_threshold", threshold)?;
        }

        let batch_number = trimmed(input.batch_number);
        let now = clock.now();

        let mut tx = self.db.begin().await?;

        let plate = find_plate(&mut tx, input.plate_id).await?;

        let operator = OperatorDirectory::new(warehouse, clock)
            .resolve(
                &mut tx,
                &OperatorRef {
                    id: input.operator_id,
                    name: input.operator_name,
                },
                caller_id,
            )
            .await?;

        let record = InboundRecord::new(
            plate.id,
            input.quantity,
            batch_number.clone(),
            trimmed(input.supplier),
            operator.id,
            input.note,
            now,
        )?;

        sqlx::query(
            r#"
            INSERT INTO inbound_records
                (id, plate_id, quantity, batch_number, supplier, operator_id, inbound_time, note)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(record.id)
        .bind(record.plate_id)
        .bind(record.quantity)
        .bind(&record.batch_number)
        .bind(&record.supplier)
        .bind(record.operator_id)
        .bind(record.inbound_time)
        .bind(&record.note)
        .execute(&mut *tx)
        .await?;

        let existing = lock_batch_line(&mut tx, plate.id, batch_number.as_deref()).await?;
        let line = match existing {
            Some(mut line) => {
                line.receive(record.quantity, now)?;
                save_line_quantity(&mut tx, &line).await?;
                line
            }
            None => {
                let line = InventoryLine::open(
                    plate.id,
                    batch_number,
                    trimmed(input.location),
                    Some(input.warning_threshold.unwrap_or(warehouse.default_warning_threshold)),
                    record.quantity,
                    now,
                )?;
                insert_line(&mut tx, &line).await.map_err(|e| match e {
                    AppError::DatabaseError(ref db) if is_unique_violation(db) => AppError::conflict(
                        "inventory",
                        "Another receipt for this batch is in progress, please retry",
                        "该批次正在入库，请重试",
                    ),
                    other => other,
                })?;
                line
            }
        };

        tx.commit().await?;

        tracing::info!(
            inbound_id = %record.id,
            plate = %plate.label(),
            quantity = record.quantity,
            inventory_id = %line.id,
            stock = line.quantity,
            "inbound recorded"
        );

        Ok(InboundOutcome {
            inbound_record: InboundRecordView {
                record,
                plate_model: plate.model,
                plate_specification: plate.specification,
                plate_unit: plate.unit,
                operator_name: operator.real_name,
            },
            inventory: line,
        })
    }

    /// Inbound records, newest first
    pub async fn list(
        &self,
        filter: InboundFilter,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<InboundRecordView>> {
        let pagination = pagination.normalized();
        let bound = BoundFilter::parse(&filter)?;

        let total = sqlx::query_scalar::<_, i64>(&format!(
            r#"
            SELECT COUNT(*)
            FROM inbound_records r
            JOIN plates p ON p.id = r.plate_id
            {}
            "#,
            VIEW_FILTER
        ))
        .bind(bound.window.from)
        .bind(bound.window.until)
        .bind(&bound.plate_model)
        .bind(&bound.batch_number)
        .bind(&bound.supplier)
        .fetch_one(&self.db)
        .await?;

        let records = sqlx::query_as::<_, InboundRecordView>(&format!(
            "{} {} ORDER BY r.inbound_time DESC LIMIT $6 OFFSET $7",
            VIEW_SELECT, VIEW_FILTER
        ))
        .bind(bound.window.from)
        .bind(bound.window.until)
        .bind(&bound.plate_model)
        .bind(&bound.batch_number)
        .bind(&bound.supplier)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(records, pagination, total))
    }

    pub async fn get(&self, inbound_id: Uuid) -> AppResult<InboundRecordView> {
        sqlx::query_as::<_, InboundRecordView>(&format!("{} WHERE r.id = $1", VIEW_SELECT))
            .bind(inbound_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Inbound record".to_string()))
    }

    /// Every record matching the date range and plate model, as CSV
    pub async fn export(&self, filter: InboundFilter) -> AppResult<Vec<u8>> {
        let bound = BoundFilter::parse(&InboundFilter {
            batch_number: None,
            supplier: None,
            ..filter
        })?;

        let records = sqlx::query_as::<_, InboundRecordView>(&format!(
            "{} {} ORDER BY r.inbound_time DESC",
            VIEW_SELECT, VIEW_FILTER
        ))
        .bind(bound.window.from)
        .bind(bound.window.until)
        .bind(&bound.plate_model)
        .bind(&bound.batch_number)
        .bind(&bound.supplier)
        .fetch_all(&self.db)
        .await?;

        tracing::info!(rows = records.len(), "exporting inbound records");
        export_to_csv(&records)
    }
}

fn format_time(time: NaiveDateTime) -> String {
    time.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Render inbound records as a spreadsheet-friendly CSV (UTF-8 with BOM)
pub fn export_to_csv(records: &[InboundRecordView]) -> AppResult<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer("\u{feff}".as_bytes().to_vec());
    for (i, view) in records.iter().enumerate() {
        wtr.serialize(ExportRow {
            index: i + 1,
            model: &view.plate_model,
            specification: &view.plate_specification,
            quantity: view.record.quantity,
            unit: &view.plate_unit,
            batch_number: view.record.batch_number.as_deref().unwrap_or(""),
            supplier: view.record.supplier.as_deref().unwrap_or(""),
            operator: &view.operator_name,
            inbound_time: format_time(view.record.inbound_time),
            note: view.record.note.as_deref().unwrap_or(""),
        })
        .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
    }
    wtr.into_inner()
        .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn view(quantity: i32, batch: Option<&str>) -> InboundRecordView {
        let at = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        InboundRecordView {
            record: InboundRecord::new(
                Uuid::new_v4(),
                quantity,
                batch.map(String::from),
                Some("西南铝业".to_string()),
                Uuid::new_v4(),
                None,
                at,
            )
            .unwrap(),
            plate_model: "6061".to_string(),
            plate_specification: "10mm".to_string(),
            plate_unit: "张".to_string(),
            operator_name: "张三".to_string(),
        }
    }

    #[test]
    fn test_export_has_bom_and_chinese_headers() {
        let bytes = export_to_csv(&[view(100, Some("B1"))]).unwrap();
        assert!(bytes.starts_with("\u{feff}".as_bytes()));
        let text = String::from_utf8(bytes).unwrap();
        let mut lines = text.trim_start_matches('\u{feff}').lines();
        assert_eq!(
            lines.next().unwrap(),
            "序号,铝板型号,铝板规格,入库数量,单位,批次号,供应商,操作员,入库时间,备注"
        );
        assert_eq!(
            lines.next().unwrap(),
            "1,6061,10mm,100,张,B1,西南铝业,张三,2024-03-01 09:30:00,"
        );
    }

    #[test]
    fn test_export_numbers_rows_and_blanks_missing_batch() {
        let bytes = export_to_csv(&[view(5, None), view(7, Some("B2"))]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let rows: Vec<&str> = text.lines().skip(1).collect();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].starts_with("1,6061,10mm,5,张,,"));
        assert!(rows[1].starts_with("2,"));
    }

    #[test]
    fn test_empty_export_is_empty_body_after_bom() {
        let bytes = export_to_csv(&[]).unwrap();
        assert_eq!(bytes, "\u{feff}".as_bytes());
    }

    #[test]
    fn test_trimmed_drops_blank() {
        assert_eq!(trimmed(Some("  ".into())), None);
        assert_eq!(trimmed(Some(" B1 ".into())), Some("B1".into()));
        assert_eq!(like(Some("60")), Some("%60%".into()));
    }
}
