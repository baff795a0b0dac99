// src/calendar/mod.rs

//! Calendar bucketing for the aggregated metrics series.
//!
//! Week numbering here is custom, not ISO-8601: week 1 begins on January 1
//! of each year and the trailing partial week folds into week 53 instead
//! of spilling into the next year's week 1. Keys are `YYYY-MM-DD` for
//! days, `YYYY-Www` for weeks, and `YYYY-MM` for months.

use chrono::{Datelike, Days, NaiveDate, Utc};
use log::warn;

use crate::market_data::FinancialMetrics;

/// Aggregation resolution of the calendar series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeframe {
    Daily,
    Weekly,
    Monthly,
}

impl Timeframe {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::Daily => "daily",
            Timeframe::Weekly => "weekly",
            Timeframe::Monthly => "monthly",
        }
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn days_in_year(year: i32) -> u32 {
    if NaiveDate::from_ymd_opt(year, 2, 29).is_some() {
        366
    } else {
        365
    }
}

/// Week number for a date, with week 1 starting on January 1.
///
/// The number is `ceil(day_of_year / 7)`, except that days past the last
/// complete 7-day block of the year all report week 53.
pub fn week_number(date: NaiveDate) -> u32 {
    let day_of_year = date.ordinal();
    let week = day_of_year.div_ceil(7);

    let total_days = days_in_year(date.year());
    let complete_weeks = total_days / 7;
    let excess_days = total_days % 7;

    if excess_days > 0 && day_of_year > complete_weeks * 7 {
        return 53;
    }
    week
}

/// Number of weeks a year holds under the custom scheme: the complete
/// 7-day blocks, plus week 53 when trailing days remain.
pub fn weeks_in_year(year: i32) -> u32 {
    let total_days = days_in_year(year);
    let complete_weeks = total_days / 7;
    if total_days % 7 > 0 {
        complete_weeks + 1
    } else {
        complete_weeks
    }
}

/// The week immediately preceding the week containing `today`, rolling
/// back across the year boundary when `today` falls in week 1.
pub fn last_completed_week_at(today: NaiveDate) -> (i32, u32) {
    let current_week = week_number(today);
    if current_week == 1 {
        let last_year = today.year() - 1;
        (last_year, weeks_in_year(last_year))
    } else {
        (today.year(), current_week - 1)
    }
}

/// `last_completed_week_at` evaluated against the current UTC date.
pub fn last_completed_week() -> (i32, u32) {
    last_completed_week_at(Utc::now().date_naive())
}

fn parse_week_key(key: &str) -> Option<(i32, u32)> {
    let (year, week) = key.split_once("-W")?;
    let year: i32 = year.parse().ok()?;
    let week: u32 = week.parse().ok()?;
    if (1..=53).contains(&week) {
        Some((year, week))
    } else {
        None
    }
}

/// Parses any of the three date-key formats into a representative date:
/// the day itself, the first day of the custom week, or the first of the
/// month. Returns `None` for keys in none of the formats.
pub fn parse_date_key(key: &str) -> Option<NaiveDate> {
    if let Some((year, week)) = parse_week_key(key) {
        let jan_first = NaiveDate::from_ymd_opt(year, 1, 1)?;
        return jan_first.checked_add_days(Days::new(u64::from(week - 1) * 7));
    }
    if let Ok(date) = NaiveDate::parse_from_str(key, "%Y-%m-%d") {
        return Some(date);
    }
    let (year, month) = key.split_once('-')?;
    let year: i32 = year.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// Calendar month (1-12) of an entry's date key, whatever its format.
pub fn entry_month(key: &str) -> Option<u32> {
    parse_date_key(key).map(|date| date.month())
}

/// Distinct years present in a series, newest first. Entries with
/// unparseable keys contribute nothing.
pub fn years_in_series(series: &[FinancialMetrics]) -> Vec<i32> {
    let mut years: Vec<i32> = series
        .iter()
        .filter_map(|entry| parse_date_key(&entry.date).map(|d| d.year()))
        .collect();
    years.sort_unstable();
    years.dedup();
    years.reverse();
    years
}

/// Retains entries whose representative date falls within `[start, end]`
/// inclusive. Entries with unparseable keys are dropped, never an error.
pub fn filter_by_date_range(
    series: &[FinancialMetrics],
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<FinancialMetrics> {
    series
        .iter()
        .filter(|entry| {
            parse_date_key(&entry.date)
                .map(|date| date >= start && date <= end)
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}

/// Replaces the series entry whose date key exactly matches `updated`,
/// recomputed from a live kline event. Updates for buckets not present
/// are ignored rather than appended, so re-delivery and out-of-order
/// delivery of the same bucket are safe.
pub fn patch_latest_bucket(series: &mut [FinancialMetrics], updated: FinancialMetrics) -> bool {
    match series.iter_mut().find(|entry| entry.date == updated.date) {
        Some(slot) => {
            *slot = updated;
            true
        }
        None => false,
    }
}

/// Groups a daily series into weekly or monthly buckets.
///
/// Daily passes the input through unchanged. Weekly excludes any week
/// beyond the last completed one so a partial current week never shows as
/// final. Per group, in date-ascending order: open is the first member's
/// open, close the last member's close, high/low the extrema, volume and
/// liquidity sums, volatility the volume-weighted average (0 when total
/// volume is 0), performance recomputed from the composed open/close.
pub fn aggregate(series: &[FinancialMetrics], timeframe: Timeframe) -> Vec<FinancialMetrics> {
    aggregate_at(series, timeframe, Utc::now().date_naive())
}

/// `aggregate` with an explicit reference date for the completed-week
/// cutoff, so the grouping is reproducible in tests.
pub fn aggregate_at(
    series: &[FinancialMetrics],
    timeframe: Timeframe,
    today: NaiveDate,
) -> Vec<FinancialMetrics> {
    if timeframe == Timeframe::Daily {
        return series.to_vec();
    }

    let last_completed = last_completed_week_at(today);

    let mut groups: Vec<(String, Vec<(NaiveDate, &FinancialMetrics)>)> = Vec::new();
    for entry in series {
        let Ok(date) = NaiveDate::parse_from_str(&entry.date, "%Y-%m-%d") else {
            warn!("Skipping entry with non-daily date key: {}", entry.date);
            continue;
        };

        let key = match timeframe {
            Timeframe::Weekly => {
                let year = date.year();
                let week = week_number(date);
                if (year, week) > last_completed {
                    continue;
                }
                format!("{}-W{:02}", year, week)
            }
            Timeframe::Monthly => format!("{}-{:02}", date.year(), date.month()),
            Timeframe::Daily => unreachable!(),
        };

        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, members)) => members.push((date, entry)),
            None => groups.push((key, vec![(date, entry)])),
        }
    }

    let mut aggregated: Vec<FinancialMetrics> = groups
        .into_iter()
        .map(|(key, mut members)| {
            members.sort_by_key(|(date, _)| *date);
            compose_bucket(key, &members)
        })
        .collect();

    aggregated.sort_by(|a, b| sort_rank(&a.date).cmp(&sort_rank(&b.date)));
    aggregated
}

// (year, week-or-month) tuple used to order aggregated buckets.
fn sort_rank(key: &str) -> (i32, u32) {
    if let Some(rank) = parse_week_key(key) {
        return rank;
    }
    parse_date_key(key)
        .map(|date| (date.year(), date.ordinal()))
        .unwrap_or((i32::MIN, 0))
}

fn compose_bucket(key: String, members: &[(NaiveDate, &FinancialMetrics)]) -> FinancialMetrics {
    let open = members[0].1.open;
    let close = members[members.len() - 1].1.close;
    let high = members.iter().map(|(_, m)| m.high).fold(f64::MIN, f64::max);
    let low = members.iter().map(|(_, m)| m.low).fold(f64::MAX, f64::min);

    let total_volume: f64 = members.iter().map(|(_, m)| m.volume).sum();
    let total_liquidity: f64 = members.iter().map(|(_, m)| m.liquidity).sum();

    let weighted_volatility = if total_volume > 0.0 {
        members
            .iter()
            .map(|(_, m)| m.volatility * m.volume)
            .sum::<f64>()
            / total_volume
    } else {
        0.0
    };

    let performance = if open > 0.0 { (close - open) / open * 100.0 } else { 0.0 };

    let max_volatility = members
        .iter()
        .map(|(_, m)| m.volatility)
        .fold(f64::MIN, f64::max);
    let min_volatility = members
        .iter()
        .map(|(_, m)| m.volatility)
        .fold(f64::MAX, f64::min);

    let days = members.len();

    FinancialMetrics {
        date: key,
        open,
        high,
        low,
        close,
        volume: total_volume,
        volatility: weighted_volatility,
        liquidity: total_liquidity,
        performance,
        avg_daily_volume: Some(total_volume / days as f64),
        avg_daily_liquidity: Some(total_liquidity / days as f64),
        volatility_range: Some(max_volatility - min_volatility),
        days_count: Some(days),
    }
}
