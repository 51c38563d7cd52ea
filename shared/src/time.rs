//! Local wall-clock used for every warehouse timestamp
//!
//! Records are stored as naive local timestamps. The warehouse runs on a fixed
//! UTC offset (UTC+8 unless configured otherwise), and the "today" boundary of
//! the dashboard is the local midnight of that offset.

use chrono::{FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, Utc};

use crate::error::{DomainError, DomainResult};

/// Default offset of the warehouse clock, in hours east of UTC
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = 8;

/// Fixed-offset clock producing naive local timestamps
#[derive(Debug, Clone, Copy)]
pub struct LocalClock {
    offset: FixedOffset,
}

impl LocalClock {
    pub fn new(offset_hours: i32) -> DomainResult<Self> {
        let offset = offset_hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                DomainError::validation("utc_offset_hours", "offset must be within ±23 hours")
            })?;
        Ok(Self { offset })
    }

    /// Current local time without zone information
    pub fn now(&self) -> NaiveDateTime {
        Utc::now().with_timezone(&self.offset).naive_local()
    }

    pub fn today(&self) -> NaiveDate {
        self.now().date()
    }

    /// Local midnight of the current day
    pub fn today_start(&self) -> NaiveDateTime {
        start_of_day(self.today())
    }
}

impl Default for LocalClock {
    fn default() -> Self {
        let offset = FixedOffset::east_opt(DEFAULT_UTC_OFFSET_HOURS * 3600)
            .unwrap_or_else(|| Utc.fix());
        Self { offset }
    }
}

pub fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// Exclusive upper bound covering the whole of `date`
pub fn end_of_day_exclusive(date: NaiveDate) -> NaiveDateTime {
    start_of_day(date.succ_opt().unwrap_or(NaiveDate::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_of_day_is_midnight() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let start = start_of_day(date);
        assert_eq!(start.to_string(), "2024-03-09 00:00:00");
    }

    #[test]
    fn test_end_of_day_rolls_into_next_day() {
        let date = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        assert_eq!(end_of_day_exclusive(date).to_string(), "2025-01-01 00:00:00");
    }

    #[test]
    fn test_offset_out_of_range_rejected() {
        assert!(LocalClock::new(8).is_ok());
        assert!(LocalClock::new(-5).is_ok());
        assert!(LocalClock::new(30).is_err());
    }

    #[test]
    fn test_clock_offset_applied() {
        let utc = LocalClock::new(0).unwrap().now();
        let east = LocalClock::new(8).unwrap().now();
        let diff = east - utc;
        // Allow for the two calls straddling a second boundary
        assert!((diff.num_minutes() - 480).abs() <= 1);
    }
}
