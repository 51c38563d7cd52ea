//! Dashboard statistics tests
//!
//! Tests for low-stock classification and trend bucketing:
//! - A line is low on stock iff quantity <= threshold
//! - Trend rows are zero-filled per side and preserve totals
//! - Trend ranges validate dates and granularity

use chrono::NaiveDate;
use proptest::prelude::*;
use shared::{build_trend, is_low_stock, DailyQuantity, TrendGranularity, TrendRange};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_low_stock_boundary() {
        assert!(is_low_stock(10, 10));
        assert!(is_low_stock(0, 0));
        assert!(!is_low_stock(11, 10));
        assert!(is_low_stock(9, 10));
    }

    #[test]
    fn test_trend_zero_fills_missing_side() {
        let inbound = [DailyQuantity { day: d(2024, 6, 1), quantity: 100 }];
        let outbound = [DailyQuantity { day: d(2024, 6, 2), quantity: 30 }];

        let rows = build_trend(&inbound, &outbound, TrendGranularity::Day);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].period, "2024-06-01");
        assert_eq!((rows[0].inbound_quantity, rows[0].outbound_quantity), (100, 0));
        assert_eq!(rows[1].period, "2024-06-02");
        assert_eq!((rows[1].inbound_quantity, rows[1].outbound_quantity), (0, 30));
    }

    #[test]
    fn test_trend_month_buckets_merge_days() {
        let inbound = [
            DailyQuantity { day: d(2024, 6, 1), quantity: 10 },
            DailyQuantity { day: d(2024, 6, 30), quantity: 5 },
            DailyQuantity { day: d(2024, 7, 1), quantity: 7 },
        ];

        let rows = build_trend(&inbound, &[], TrendGranularity::Month);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].period, "2024-06");
        assert_eq!(rows[0].inbound_quantity, 15);
        assert_eq!(rows[1].period, "2024-07");
    }

    #[test]
    fn test_trend_range_requires_both_dates() {
        assert!(TrendRange::parse(Some("2024-06-01"), None, None).is_err());
        assert!(TrendRange::parse(None, Some("2024-06-01"), None).is_err());
    }

    #[test]
    fn test_trend_range_rejects_reversed_and_unknown_grouping() {
        assert!(TrendRange::parse(Some("2024-06-02"), Some("2024-06-01"), None).is_err());
        assert!(TrendRange::parse(Some("2024-06-01"), Some("2024-06-02"), Some("year")).is_err());
        assert!(TrendRange::parse(Some("06/01/2024"), Some("2024-06-02"), None).is_err());
    }

    #[test]
    fn test_trend_range_window_covers_end_day() {
        let range = TrendRange::parse(Some("2024-06-01"), Some("2024-06-01"), Some("week")).unwrap();
        let (from, until) = range.window();
        assert_eq!(from, d(2024, 6, 1).and_hms_opt(0, 0, 0).unwrap());
        assert_eq!(until, d(2024, 6, 2).and_hms_opt(0, 0, 0).unwrap());
        assert_eq!(range.granularity, TrendGranularity::Week);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn daily_strategy() -> impl Strategy<Value = Vec<DailyQuantity>> {
        prop::collection::btree_map(0..120u64, 1..1_000i64, 0..30).prop_map(|days| {
            days.into_iter()
                .map(|(offset, quantity)| DailyQuantity {
                    day: d(2024, 1, 1) + chrono::Days::new(offset),
                    quantity,
                })
                .collect()
        })
    }

    fn granularity_strategy() -> impl Strategy<Value = TrendGranularity> {
        prop_oneof![
            Just(TrendGranularity::Day),
            Just(TrendGranularity::Week),
            Just(TrendGranularity::Month),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Bucketing never loses or invents quantity
        #[test]
        fn prop_trend_preserves_totals(
            inbound in daily_strategy(),
            outbound in daily_strategy(),
            granularity in granularity_strategy()
        ) {
            let rows = build_trend(&inbound, &outbound, granularity);
            let in_total: i64 = inbound.iter().map(|q| q.quantity).sum();
            let out_total: i64 = outbound.iter().map(|q| q.quantity).sum();
            prop_assert_eq!(rows.iter().map(|r| r.inbound_quantity).sum::<i64>(), in_total);
            prop_assert_eq!(rows.iter().map(|r| r.outbound_quantity).sum::<i64>(), out_total);
        }

        /// Periods are unique and ascending
        #[test]
        fn prop_trend_periods_ascending(
            inbound in daily_strategy(),
            outbound in daily_strategy(),
            granularity in granularity_strategy()
        ) {
            let rows = build_trend(&inbound, &outbound, granularity);
            for pair in rows.windows(2) {
                prop_assert!(pair[0].period < pair[1].period);
            }
        }

        /// Low stock is exactly quantity <= threshold
        #[test]
        fn prop_low_stock_matches_threshold(quantity in 0..1_000i32, threshold in 0..1_000i32) {
            prop_assert_eq!(is_low_stock(quantity, threshold), quantity <= threshold);
        }
    }
}
