//! Dashboard statistics models and trend bucketing

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::time::{end_of_day_exclusive, start_of_day};
use crate::validation::parse_date;

/// Dashboard headline figures
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Overview {
    pub total_inventory: i64,
    pub today_inbound: i64,
    pub today_outbound: i64,
    pub pending_outbound: i64,
    pub low_stock_warning: i64,
    pub pending_tasks: i64,
}

/// Stock grouped by plate model and specification
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ModelStock {
    pub model: String,
    pub specification: String,
    pub total_quantity: i64,
    pub batch_count: i64,
}

/// Stock grouped by storage location
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct LocationStock {
    pub location: String,
    pub total_quantity: i64,
    pub batch_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryStatistics {
    pub by_model: Vec<ModelStock>,
    pub by_location: Vec<LocationStock>,
}

/// Bucket size for movement trends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrendGranularity {
    #[default]
    Day,
    Week,
    Month,
}

impl TrendGranularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendGranularity::Day => "day",
            TrendGranularity::Week => "week",
            TrendGranularity::Month => "month",
        }
    }

    /// Period key for `date`.
    ///
    /// Weeks are Monday-based and numbered within the year (`%W`), so days
    /// before the first Monday of January fall into week `00`.
    pub fn period_key(&self, date: NaiveDate) -> String {
        let format = match self {
            TrendGranularity::Day => "%Y-%m-%d",
            TrendGranularity::Week => "%Y-%W",
            TrendGranularity::Month => "%Y-%m",
        };
        date.format(format).to_string()
    }
}

impl FromStr for TrendGranularity {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "day" => Ok(TrendGranularity::Day),
            "week" => Ok(TrendGranularity::Week),
            "month" => Ok(TrendGranularity::Month),
            _ => Err(DomainError::validation(
                "group_by",
                "group_by must be one of day, week, month",
            )),
        }
    }
}

/// Validated trend request: an inclusive date range and a granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrendRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub granularity: TrendGranularity,
}

impl TrendRange {
    pub fn parse(
        start: Option<&str>,
        end: Option<&str>,
        group_by: Option<&str>,
    ) -> DomainResult<Self> {
        let (Some(start), Some(end)) = (start, end) else {
            return Err(DomainError::validation(
                "start_date/end_date",
                "start_date and end_date are required",
            ));
        };
        let start = parse_date("start_date", start)?;
        let end = parse_date("end_date", end)?;
        let granularity = match group_by {
            Some(g) => g.parse()?,
            None => TrendGranularity::default(),
        };
        if start > end {
            return Err(DomainError::validation(
                "start_date",
                "start_date cannot be after end_date",
            ));
        }
        Ok(Self {
            start,
            end,
            granularity,
        })
    }

    /// Half-open timestamp window `[start 00:00, end + 1 day 00:00)`
    pub fn window(&self) -> (NaiveDateTime, NaiveDateTime) {
        (start_of_day(self.start), end_of_day_exclusive(self.end))
    }
}

/// Movement quantity summed over one calendar day
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct DailyQuantity {
    pub day: NaiveDate,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrendRow {
    pub period: String,
    pub inbound_quantity: i64,
    pub outbound_quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendReport {
    pub trends: Vec<TrendRow>,
    pub group_by: TrendGranularity,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Bucket daily inbound and approved-outbound totals into periods and merge
/// them into one row per period, ascending. A side with no activity in a
/// period reports zero.
pub fn build_trend(
    inbound: &[DailyQuantity],
    outbound: &[DailyQuantity],
    granularity: TrendGranularity,
) -> Vec<TrendRow> {
    let mut buckets: BTreeMap<String, (i64, i64)> = BTreeMap::new();

    for day in inbound {
        buckets.entry(granularity.period_key(day.day)).or_default().0 += day.quantity;
    }
    for day in outbound {
        buckets.entry(granularity.period_key(day.day)).or_default().1 += day.quantity;
    }

    buckets
        .into_iter()
        .map(|(period, (inbound_quantity, outbound_quantity))| TrendRow {
            period,
            inbound_quantity,
            outbound_quantity,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_period_keys() {
        let date = d(2024, 3, 7);
        assert_eq!(TrendGranularity::Day.period_key(date), "2024-03-07");
        assert_eq!(TrendGranularity::Month.period_key(date), "2024-03");
        // 2024-01-01 is a Monday, so March 7th is in week 10
        assert_eq!(TrendGranularity::Week.period_key(date), "2024-10");
    }

    #[test]
    fn test_week_zero_before_first_monday() {
        // 2023-01-01 is a Sunday
        assert_eq!(TrendGranularity::Week.period_key(d(2023, 1, 1)), "2023-00");
        assert_eq!(TrendGranularity::Week.period_key(d(2023, 1, 2)), "2023-01");
    }

    #[test]
    fn test_granularity_parse() {
        assert_eq!("week".parse::<TrendGranularity>().unwrap(), TrendGranularity::Week);
        assert!("year".parse::<TrendGranularity>().is_err());
    }

    #[test]
    fn test_range_requires_both_dates() {
        assert!(TrendRange::parse(Some("2024-01-01"), None, None).is_err());
        assert!(TrendRange::parse(None, Some("2024-01-01"), None).is_err());
    }

    #[test]
    fn test_range_rejects_inverted_dates() {
        let err = TrendRange::parse(Some("2024-02-01"), Some("2024-01-01"), None).unwrap_err();
        assert!(matches!(err, DomainError::Validation { ref field, .. } if field == "start_date"));
    }

    #[test]
    fn test_range_same_day_allowed() {
        let range = TrendRange::parse(Some("2024-02-01"), Some("2024-02-01"), Some("month")).unwrap();
        assert_eq!(range.granularity, TrendGranularity::Month);
        let (from, to) = range.window();
        assert_eq!(from.to_string(), "2024-02-01 00:00:00");
        assert_eq!(to.to_string(), "2024-02-02 00:00:00");
    }

    #[test]
    fn test_range_rejects_bad_granularity_and_dates() {
        assert!(TrendRange::parse(Some("2024-01-01"), Some("2024-01-31"), Some("hour")).is_err());
        assert!(TrendRange::parse(Some("01/01/2024"), Some("2024-01-31"), None).is_err());
    }

    #[test]
    fn test_build_trend_merges_sides() {
        let inbound = [
            DailyQuantity { day: d(2024, 1, 2), quantity: 100 },
            DailyQuantity { day: d(2024, 1, 3), quantity: 20 },
        ];
        let outbound = [
            DailyQuantity { day: d(2024, 1, 3), quantity: 30 },
            DailyQuantity { day: d(2024, 1, 5), quantity: 10 },
        ];
        let rows = build_trend(&inbound, &outbound, TrendGranularity::Day);
        assert_eq!(
            rows,
            vec![
                TrendRow { period: "2024-01-02".into(), inbound_quantity: 100, outbound_quantity: 0 },
                TrendRow { period: "2024-01-03".into(), inbound_quantity: 20, outbound_quantity: 30 },
                TrendRow { period: "2024-01-05".into(), inbound_quantity: 0, outbound_quantity: 10 },
            ]
        );
    }

    #[test]
    fn test_build_trend_month_rollup() {
        let inbound = [
            DailyQuantity { day: d(2024, 1, 31), quantity: 5 },
            DailyQuantity { day: d(2024, 2, 1), quantity: 7 },
            DailyQuantity { day: d(2024, 2, 29), quantity: 3 },
        ];
        let rows = build_trend(&inbound, &[], TrendGranularity::Month);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].period, "2024-01");
        assert_eq!(rows[1].inbound_quantity, 10);
    }
}
