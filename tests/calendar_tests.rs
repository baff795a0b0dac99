// tests/calendar_tests.rs

//! Tests for the custom week numbering scheme and the daily-to-weekly/
//! monthly aggregation, including the completed-week cutoff and the live
//! patch-in of the newest bucket.

use chrono::NaiveDate;
use market_calendar::calendar::{
    Timeframe, aggregate_at, filter_by_date_range, last_completed_week_at, parse_date_key,
    patch_latest_bucket, week_number, weeks_in_year, years_in_series,
};
use market_calendar::market_data::FinancialMetrics;

fn daily(date: &str, open: f64, high: f64, low: f64, close: f64, volume: f64) -> FinancialMetrics {
    FinancialMetrics::new(date.to_string(), open, high, low, close, volume)
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

#[test]
fn week_numbers_round_trip_with_weeks_in_year() {
    use chrono::Datelike;

    for year in 2020..=2028 {
        let mut max_week = 0;
        let mut day = date(year, 1, 1);
        while day.year() == year {
            let week = week_number(day);
            assert!(
                (1..=53).contains(&week),
                "week {} out of range on {}",
                week,
                day
            );
            max_week = max_week.max(week);
            day = day.succ_opt().unwrap();
        }
        assert_eq!(
            weeks_in_year(year),
            max_week,
            "weeks_in_year disagrees with per-date maximum for {}",
            year
        );
    }
}

#[test]
fn week_one_starts_on_january_first() {
    assert_eq!(week_number(date(2024, 1, 1)), 1);
    assert_eq!(week_number(date(2024, 1, 7)), 1);
    assert_eq!(week_number(date(2024, 1, 8)), 2);
    // The trailing partial week folds into week 53 instead of spilling over.
    assert_eq!(week_number(date(2024, 12, 30)), 53);
    assert_eq!(week_number(date(2024, 12, 31)), 53);
}

#[test]
fn last_completed_week_rolls_back_across_years() {
    assert_eq!(last_completed_week_at(date(2024, 6, 15)), (2024, 23));
    // Week 1 of a year: the last completed week is the previous year's last.
    assert_eq!(last_completed_week_at(date(2025, 1, 3)), (2024, 53));
}

#[test]
fn monthly_aggregation_composes_ohlc() {
    let series = vec![
        daily("2024-03-01", 100.0, 110.0, 95.0, 105.0, 10.0),
        daily("2024-03-02", 105.0, 120.0, 100.0, 115.0, 20.0),
        daily("2024-03-03", 115.0, 118.0, 90.0, 95.0, 30.0),
    ];

    let monthly = aggregate_at(&series, Timeframe::Monthly, date(2024, 6, 1));
    assert_eq!(monthly.len(), 1);

    let bucket = &monthly[0];
    assert_eq!(bucket.date, "2024-03");
    assert_eq!(bucket.open, 100.0);
    assert_eq!(bucket.close, 95.0);
    assert_eq!(bucket.high, 120.0);
    assert_eq!(bucket.low, 90.0);
    assert_eq!(bucket.volume, 60.0);
    assert_eq!(bucket.days_count, Some(3));

    let expected_performance = (95.0 - 100.0) / 100.0 * 100.0;
    assert!((bucket.performance - expected_performance).abs() < 1e-9);

    let expected_volatility = (series[0].volatility * 10.0
        + series[1].volatility * 20.0
        + series[2].volatility * 30.0)
        / 60.0;
    assert!((bucket.volatility - expected_volatility).abs() < 1e-9);
}

#[test]
fn zero_volume_groups_report_zero_volatility() {
    let series = vec![
        daily("2024-03-01", 100.0, 110.0, 95.0, 105.0, 0.0),
        daily("2024-03-02", 105.0, 120.0, 100.0, 115.0, 0.0),
    ];
    let monthly = aggregate_at(&series, Timeframe::Monthly, date(2024, 6, 1));
    assert_eq!(monthly[0].volatility, 0.0);
}

#[test]
fn weekly_aggregation_excludes_the_partial_current_week() {
    // Reference date sits in week 2 of 2024.
    let today = date(2024, 1, 10);
    let series = vec![
        daily("2024-01-01", 1.0, 2.0, 1.0, 2.0, 1.0),
        daily("2024-01-05", 2.0, 3.0, 2.0, 3.0, 1.0),
        daily("2024-01-08", 3.0, 4.0, 3.0, 4.0, 1.0), // current week, incomplete
    ];

    let weekly = aggregate_at(&series, Timeframe::Weekly, today);
    assert_eq!(weekly.len(), 1);
    assert_eq!(weekly[0].date, "2024-W01");
    assert_eq!(weekly[0].open, 1.0);
    assert_eq!(weekly[0].close, 3.0);
    assert_eq!(weekly[0].days_count, Some(2));
}

#[test]
fn weekly_buckets_sort_by_year_then_week() {
    let series = vec![
        daily("2025-01-02", 1.0, 1.0, 1.0, 1.0, 1.0),
        daily("2024-12-20", 1.0, 1.0, 1.0, 1.0, 1.0),
        daily("2024-03-10", 1.0, 1.0, 1.0, 1.0, 1.0),
    ];
    let weekly = aggregate_at(&series, Timeframe::Weekly, date(2025, 3, 1));
    let keys: Vec<&str> = weekly.iter().map(|b| b.date.as_str()).collect();
    assert_eq!(keys, vec!["2024-W10", "2024-W51", "2025-W01"]);
}

#[test]
fn daily_timeframe_passes_through_unchanged() {
    let series = vec![
        daily("2024-03-02", 105.0, 120.0, 100.0, 115.0, 20.0),
        daily("2024-03-01", 100.0, 110.0, 95.0, 105.0, 10.0),
    ];
    let out = aggregate_at(&series, Timeframe::Daily, date(2024, 6, 1));
    assert_eq!(out, series);
}

#[test]
fn patch_replaces_only_exact_date_match() {
    let mut series = vec![
        daily("2024-03-01", 100.0, 110.0, 95.0, 105.0, 10.0),
        daily("2024-03-02", 105.0, 120.0, 100.0, 115.0, 20.0),
    ];

    let update = FinancialMetrics::new("2024-03-02".to_string(), 105.0, 125.0, 100.0, 120.0, 25.0);
    assert!(patch_latest_bucket(&mut series, update.clone()));
    assert_eq!(series.len(), 2);
    assert_eq!(series[1].close, 120.0);

    // Re-applying the same update is idempotent.
    assert!(patch_latest_bucket(&mut series, update.clone()));
    assert_eq!(series[1], update);

    // Unknown buckets are ignored, never appended out-of-band.
    let unknown = FinancialMetrics::new("2024-04-01".to_string(), 1.0, 1.0, 1.0, 1.0, 1.0);
    assert!(!patch_latest_bucket(&mut series, unknown));
    assert_eq!(series.len(), 2);
}

#[test]
fn parse_date_key_handles_all_formats() {
    assert_eq!(parse_date_key("2024-W01"), Some(date(2024, 1, 1)));
    assert_eq!(parse_date_key("2024-W02"), Some(date(2024, 1, 8)));
    assert_eq!(parse_date_key("2024-05"), Some(date(2024, 5, 1)));
    assert_eq!(parse_date_key("2024-05-09"), Some(date(2024, 5, 9)));
    assert_eq!(parse_date_key("garbage"), None);
    assert_eq!(parse_date_key("2024-13"), None);
}

#[test]
fn years_are_collected_across_key_formats_newest_first() {
    let series = vec![
        daily("2022-06-01", 1.0, 1.0, 1.0, 1.0, 1.0),
        FinancialMetrics::new("2024-W10".to_string(), 1.0, 1.0, 1.0, 1.0, 1.0),
        FinancialMetrics::new("2023-07".to_string(), 1.0, 1.0, 1.0, 1.0, 1.0),
        daily("2022-08-15", 1.0, 1.0, 1.0, 1.0, 1.0),
        FinancialMetrics::new("junk".to_string(), 1.0, 1.0, 1.0, 1.0, 1.0),
    ];
    assert_eq!(years_in_series(&series), vec![2024, 2023, 2022]);
}

#[test]
fn date_range_filter_keeps_entries_in_window_and_drops_junk() {
    let series = vec![
        daily("2024-01-15", 1.0, 1.0, 1.0, 1.0, 1.0),
        daily("2024-02-20", 1.0, 1.0, 1.0, 1.0, 1.0),
        FinancialMetrics::new("2024-W02".to_string(), 1.0, 1.0, 1.0, 1.0, 1.0),
        FinancialMetrics::new("2024-02".to_string(), 1.0, 1.0, 1.0, 1.0, 1.0),
        FinancialMetrics::new("not-a-date".to_string(), 1.0, 1.0, 1.0, 1.0, 1.0),
    ];

    let kept = filter_by_date_range(&series, date(2024, 1, 1), date(2024, 1, 31));
    let keys: Vec<&str> = kept.iter().map(|e| e.date.as_str()).collect();
    assert_eq!(keys, vec!["2024-01-15", "2024-W02"]);

    // Inclusive on both ends.
    let kept = filter_by_date_range(&series, date(2024, 1, 15), date(2024, 2, 1));
    let keys: Vec<&str> = kept.iter().map(|e| e.date.as_str()).collect();
    assert_eq!(keys, vec!["2024-01-15", "2024-02"]);
}
