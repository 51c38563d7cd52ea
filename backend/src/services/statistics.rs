//! Dashboard statistics service

use shared::{
    build_trend, DailyQuantity, InventoryStatistics, LocalClock, LocationStock, ModelStock,
    Overview, TrendRange, TrendReport,
};
use sqlx::PgPool;

use crate::error::AppResult;

/// Read-only aggregates over the ledger and the movement logs
#[derive(Clone)]
pub struct StatisticsService {
    db: PgPool,
}

impl StatisticsService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Headline figures; "today" starts at local midnight
    pub async fn overview(&self, clock: &LocalClock) -> AppResult<Overview> {
        let overview = sqlx::query_as::<_, Overview>(
            r#"
            SELECT
                (SELECT COALESCE(SUM(quantity), 0)::bigint FROM inventory) AS total_inventory,
                (SELECT COALESCE(SUM(quantity), 0)::bigint FROM inbound_records
                    WHERE inbound_time >= $1) AS today_inbound,
                (SELECT COALESCE(SUM(quantity), 0)::bigint FROM outbound_records
                    WHERE status = 'approved' AND outbound_time >= $1) AS today_outbound,
                (SELECT COUNT(*) FROM outbound_records WHERE status = 'pending') AS pending_outbound,
                (SELECT COUNT(*) FROM inventory WHERE quantity <= warning_threshold) AS low_stock_warning,
                (SELECT COUNT(*) FROM dispatch_tasks
                    WHERE status IN ('pending', 'in_progress')) AS pending_tasks
            "#,
        )
        .bind(clock.today_start())
        .fetch_one(&self.db)
        .await?;

        Ok(overview)
    }

    /// Stock grouped by model and by location
    pub async fn inventory(&self) -> AppResult<InventoryStatistics> {
        let by_model = sqlx::query_as::<_, ModelStock>(
            r#"
            SELECT p.model, p.specification,
                   COALESCE(SUM(i.quantity), 0)::bigint AS total_quantity,
                   COUNT(i.id) AS batch_count
            FROM inventory i
            JOIN plates p ON p.id = i.plate_id
            GROUP BY p.model, p.specification
            ORDER BY p.model, p.specification
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        let by_location = sqlx::query_as::<_, LocationStock>(
            r#"
            SELECT location,
                   COALESCE(SUM(quantity), 0)::bigint AS total_quantity,
                   COUNT(id) AS batch_count
            FROM inventory
            WHERE location IS NOT NULL AND location <> ''
            GROUP BY location
            ORDER BY location
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(InventoryStatistics {
            by_model,
            by_location,
        })
    }

    /// Inbound and approved-outbound quantities bucketed over `range`
    pub async fn trend(&self, range: TrendRange) -> AppResult<TrendReport> {
        let (from, until) = range.window();

        let inbound = sqlx::query_as::<_, DailyQuantity>(
            r#"
            SELECT inbound_time::date AS day, SUM(quantity)::bigint AS quantity
            FROM inbound_records
            WHERE inbound_time >= $1 AND inbound_time < $2
            GROUP BY day
            ORDER BY day
            "#,
        )
        .bind(from)
        .bind(until)
        .fetch_all(&self.db)
        .await?;

        let outbound = sqlx::query_as::<_, DailyQuantity>(
            r#"
            SELECT outbound_time::date AS day, SUM(quantity)::bigint AS quantity
            FROM outbound_records
            WHERE status = 'approved' AND outbound_time >= $1 AND outbound_time < $2
            GROUP BY day
            ORDER BY day
            "#,
        )
        .bind(from)
        .bind(until)
        .fetch_all(&self.db)
        .await?;

        tracing::debug!(
            start = %range.start,
            end = %range.end,
            group_by = range.granularity.as_str(),
            inbound_days = inbound.len(),
            outbound_days = outbound.len(),
            "trend computed"
        );

        Ok(TrendReport {
            trends: build_trend(&inbound, &outbound, range.granularity),
            group_by: range.granularity,
            start_date: range.start,
            end_date: range.end,
        })
    }
}
