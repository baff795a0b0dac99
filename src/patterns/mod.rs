// src/patterns/mod.rs

//! Pattern detection over the full metrics series: monthly seasonality,
//! linear trend direction, and statistical (z-score) anomalies. Pure
//! computation with no I/O, so it can run on the worker thread or inline
//! behind `pattern_worker` without caring which.

use serde::{Deserialize, Serialize};

use crate::calendar::entry_month;
use crate::market_data::FinancialMetrics;

const MIN_SERIES_LEN: usize = 20;
const MIN_TREND_LEN: usize = 10;
const TREND_WINDOW: usize = 30;
const MIN_MONTH_OBSERVATIONS: usize = 3;
const MIN_SEASONAL_CONFIDENCE: f64 = 0.3;
const ANOMALY_Z_THRESHOLD: f64 = 2.0;

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternType {
    Seasonal,
    Trend,
    Anomaly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternStrength {
    Weak,
    Moderate,
    Strong,
}

impl PatternStrength {
    /// Tiering shared by the detectors: confidence above 0.7 is strong,
    /// above 0.5 moderate, anything else weak.
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence > 0.7 {
            PatternStrength::Strong
        } else if confidence > 0.5 {
            PatternStrength::Moderate
        } else {
            PatternStrength::Weak
        }
    }
}

/// Averages characterizing the periods a pattern was observed in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatternMetrics {
    pub performance: f64,
    pub volatility: f64,
    pub volume: f64,
    pub price: f64,
}

/// One detected pattern. `color` is a presentation hint the detection
/// logic never inspects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimplePattern {
    pub id: String,
    #[serde(rename = "type")]
    pub pattern_type: PatternType,
    pub name: String,
    pub description: String,
    pub confidence: f64,
    pub period: String,
    pub metrics: PatternMetrics,
    pub historical_occurrences: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_occurrence: Option<String>,
    pub strength: PatternStrength,
    pub color: String,
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn variance(values: &[f64]) -> f64 {
    let avg = mean(values);
    values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / values.len() as f64
}

// Ordinary-least-squares slope of the values against their index.
fn linear_regression_slope(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let sum_x: f64 = (0..values.len()).map(|i| i as f64).sum();
    let sum_y: f64 = values.iter().sum();
    let sum_xy: f64 = values.iter().enumerate().map(|(i, y)| i as f64 * y).sum();
    let sum_x2: f64 = (0..values.len()).map(|i| (i * i) as f64).sum();

    (n * sum_xy - sum_x * sum_y) / (n * sum_x2 - sum_x * sum_x)
}

/// Runs all three detectors and returns their findings concatenated,
/// sorted descending by confidence. Series shorter than 20 entries
/// produce an empty set (success, not an error).
pub fn detect_patterns(series: &[FinancialMetrics]) -> Vec<SimplePattern> {
    if series.len() < MIN_SERIES_LEN {
        return Vec::new();
    }

    let mut patterns = Vec::new();
    patterns.extend(detect_seasonal(series));
    patterns.extend(detect_trend(series));
    patterns.extend(detect_anomalies(series));

    patterns.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    patterns
}

/// Groups entries by calendar month regardless of year and emits a
/// seasonal pattern for each month whose performance is consistent enough
/// (confidence `max(0, 1 - variance/100)` of at least 0.3, requiring at
/// least 3 observations).
fn detect_seasonal(series: &[FinancialMetrics]) -> Vec<SimplePattern> {
    let mut monthly: Vec<(u32, Vec<&FinancialMetrics>)> = Vec::new();
    for entry in series {
        let Some(month) = entry_month(&entry.date) else {
            continue;
        };
        match monthly.iter_mut().find(|(m, _)| *m == month) {
            Some((_, group)) => group.push(entry),
            None => monthly.push((month, vec![entry])),
        }
    }

    let mut patterns = Vec::new();
    for (month, group) in monthly {
        if group.len() < MIN_MONTH_OBSERVATIONS {
            continue;
        }

        let performances: Vec<f64> = group.iter().map(|d| d.performance).collect();
        let avg_performance = mean(&performances);
        let avg_volatility = mean(&group.iter().map(|d| d.volatility).collect::<Vec<_>>());
        let avg_volume = mean(&group.iter().map(|d| d.volume).collect::<Vec<_>>());
        let avg_price = mean(&group.iter().map(|d| d.close).collect::<Vec<_>>());

        let confidence = (1.0 - variance(&performances) / 100.0).max(0.0);
        if confidence < MIN_SEASONAL_CONFIDENCE {
            continue;
        }

        let month_name = MONTH_NAMES[(month - 1) as usize];
        let tone = if avg_performance > 0.0 { "positive" } else { "negative" };
        let color = if avg_performance > 0.0 { "#10b981" } else { "#ef4444" };

        patterns.push(SimplePattern {
            id: format!("seasonal-{}", month),
            pattern_type: PatternType::Seasonal,
            name: format!("{} Pattern", month_name),
            description: format!(
                "Recurring pattern in {} with {} performance",
                month_name, tone
            ),
            confidence,
            period: month_name.to_string(),
            metrics: PatternMetrics {
                performance: avg_performance,
                volatility: avg_volatility,
                volume: avg_volume,
                price: avg_price,
            },
            historical_occurrences: group.len(),
            last_occurrence: group.last().map(|d| d.date.clone()),
            strength: PatternStrength::from_confidence(confidence),
            color: color.to_string(),
        });
    }

    patterns
}

/// Fits an OLS slope to the closes of the last 30 entries and always
/// emits exactly one trend pattern when at least 10 entries exist.
/// Direction is sideways within `|slope| < 0.01`.
fn detect_trend(series: &[FinancialMetrics]) -> Vec<SimplePattern> {
    if series.len() < MIN_TREND_LEN {
        return Vec::new();
    }

    let recent = &series[series.len().saturating_sub(TREND_WINDOW)..];
    let prices: Vec<f64> = recent.iter().map(|d| d.close).collect();

    let slope = linear_regression_slope(&prices);
    let avg_performance = mean(&recent.iter().map(|d| d.performance).collect::<Vec<_>>());
    let avg_volatility = mean(&recent.iter().map(|d| d.volatility).collect::<Vec<_>>());
    let avg_volume = mean(&recent.iter().map(|d| d.volume).collect::<Vec<_>>());

    let (direction, color) = if slope > 0.01 {
        ("upward", "#10b981")
    } else if slope < -0.01 {
        ("downward", "#ef4444")
    } else {
        ("sideways", "#6b7280")
    };
    let confidence = (slope.abs() * 100.0).min(1.0);

    let mut name = direction.to_string();
    if let Some(first) = name.get_mut(..1) {
        first.make_ascii_uppercase();
    }

    vec![SimplePattern {
        id: "trend-recent".to_string(),
        pattern_type: PatternType::Trend,
        name: format!("{} Trend", name),
        description: format!("{} price trend detected in recent data", direction),
        confidence,
        period: format!("Recent {} periods", TREND_WINDOW),
        metrics: PatternMetrics {
            performance: avg_performance,
            volatility: avg_volatility,
            volume: avg_volume,
            price: prices[prices.len() - 1],
        },
        historical_occurrences: 1,
        last_occurrence: recent.last().map(|d| d.date.clone()),
        strength: PatternStrength::from_confidence(confidence),
        color: color.to_string(),
    }]
}

/// Flags every entry whose performance sits more than two population
/// standard deviations from the whole-series mean. A z-score above 3 is
/// strong, otherwise moderate; confidence is `min(1, |z| / 4)`.
fn detect_anomalies(series: &[FinancialMetrics]) -> Vec<SimplePattern> {
    if series.len() < MIN_SERIES_LEN {
        return Vec::new();
    }

    let performances: Vec<f64> = series.iter().map(|d| d.performance).collect();
    let avg = mean(&performances);
    let std = variance(&performances).sqrt();
    if std == 0.0 {
        return Vec::new();
    }

    let mut patterns = Vec::new();
    for (index, item) in series.iter().enumerate() {
        let z_score = ((item.performance - avg) / std).abs();
        if z_score <= ANOMALY_Z_THRESHOLD {
            continue;
        }

        let deviation = (item.performance - avg) / avg * 100.0;
        let strength = if z_score > 3.0 {
            PatternStrength::Strong
        } else {
            PatternStrength::Moderate
        };
        let color = if deviation.abs() > 50.0 { "#dc2626" } else { "#ea580c" };
        let sign = if deviation > 0.0 { "+" } else { "" };

        patterns.push(SimplePattern {
            id: format!("anomaly-{}", index),
            pattern_type: PatternType::Anomaly,
            name: "Performance Anomaly".to_string(),
            description: format!("Unusual performance: {}{:.1}% deviation", sign, deviation),
            confidence: (z_score / 4.0).min(1.0),
            period: item.date.clone(),
            metrics: PatternMetrics {
                performance: item.performance,
                volatility: item.volatility,
                volume: item.volume,
                price: item.close,
            },
            historical_occurrences: 1,
            last_occurrence: Some(item.date.clone()),
            strength,
            color: color.to_string(),
        });
    }

    patterns
}
