// src/indicators/mod.rs

//! Technical indicators over the aggregated metrics series.
//!
//! Every function is pure, reads the closing price unless noted, and
//! degrades to a defined neutral value on insufficient history (0, or 50
//! for RSI) instead of returning an error, so downstream rendering always
//! has a number to show.

use crate::market_data::FinancialMetrics;

const RSI_PERIOD: usize = 14;
const MACD_FAST: usize = 12;
const MACD_SLOW: usize = 26;
const MACD_SIGNAL: usize = 9;
const TRADING_DAYS_PER_YEAR: f64 = 252.0;

fn trailing(series: &[FinancialMetrics], count: usize) -> &[FinancialMetrics] {
    &series[series.len().saturating_sub(count)..]
}

/// Simple moving average of the last `period` closes (all available when
/// fewer). Empty series yields 0.
pub fn sma(series: &[FinancialMetrics], period: usize) -> f64 {
    let recent = trailing(series, period);
    if recent.is_empty() {
        return 0.0;
    }
    recent.iter().map(|item| item.close).sum::<f64>() / recent.len() as f64
}

/// Exponential moving average with smoothing factor `2 / (period + 1)`,
/// seeded with the first close of the slice passed and applied forward
/// over the whole slice. Series shorter than `period` yield 0.
///
/// Seeding from the slice head (rather than an SMA of the first `period`
/// values) biases early values; kept for compatibility with the series
/// the dashboard has always shown.
pub fn ema(series: &[FinancialMetrics], period: usize) -> f64 {
    if series.is_empty() || series.len() < period {
        return 0.0;
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    let mut ema = series[0].close;
    for item in &series[1..] {
        ema = item.close * multiplier + ema * (1.0 - multiplier);
    }
    ema
}

/// Relative strength index over the last 14 one-step close deltas.
///
/// Fewer than 15 points return the neutral 50; a zero average loss
/// saturates at 100.
pub fn rsi(series: &[FinancialMetrics]) -> f64 {
    if series.len() < RSI_PERIOD + 1 {
        return 50.0;
    }

    let changes: Vec<f64> = series
        .windows(2)
        .map(|pair| pair[1].close - pair[0].close)
        .collect();
    let recent = &changes[changes.len() - RSI_PERIOD..];

    let avg_gain = recent.iter().filter(|c| **c > 0.0).sum::<f64>() / RSI_PERIOD as f64;
    let avg_loss = recent
        .iter()
        .filter(|c| **c < 0.0)
        .map(|c| c.abs())
        .sum::<f64>()
        / RSI_PERIOD as f64;

    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

/// Population standard deviation of the last `period` one-step percentage
/// returns of close, expressed in percent. Fewer than 2 points yield 0.
pub fn standard_deviation(series: &[FinancialMetrics], period: usize) -> f64 {
    let recent = trailing(series, period);
    if recent.len() < 2 {
        return 0.0;
    }

    let returns: Vec<f64> = recent
        .windows(2)
        .map(|pair| (pair[1].close - pair[0].close) / pair[0].close)
        .collect();

    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    let variance = returns
        .iter()
        .map(|ret| (ret - mean).powi(2))
        .sum::<f64>()
        / returns.len() as f64;

    variance.sqrt() * 100.0
}

/// Realized-volatility metric: the windowed standard deviation annualized
/// by `sqrt(252)`, calibrated for daily-bucketed data.
pub fn vix_like(series: &[FinancialMetrics], period: usize) -> f64 {
    standard_deviation(series, period) * TRADING_DAYS_PER_YEAR.sqrt()
}

/// Volatility envelope around the moving average.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerBands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

/// Bollinger bands with `middle = SMA(period)` and a band offset of
/// `standard_deviation(period) / 100 * multiplier` (the internal std-dev
/// is in percent and rescaled).
pub fn bollinger_bands(
    series: &[FinancialMetrics],
    period: usize,
    multiplier: f64,
) -> BollingerBands {
    let middle = sma(series, period);
    let offset = standard_deviation(series, period) / 100.0 * multiplier;

    BollingerBands {
        upper: middle + offset,
        middle,
        lower: middle - offset,
    }
}

/// MACD line, signal line, and histogram.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Macd {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// MACD with the standard 12/26/9 periods: line = `EMA(12) - EMA(26)`,
/// signal = mean of the line recomputed over the trailing 9 prefixes,
/// histogram = line - signal. Series shorter than the slow period yield
/// an all-zero result.
pub fn macd(series: &[FinancialMetrics]) -> Macd {
    if series.len() < MACD_SLOW {
        return Macd::default();
    }

    let macd_line = ema(series, MACD_FAST) - ema(series, MACD_SLOW);

    let len = series.len();
    let trailing_values: Vec<f64> = (0..MACD_SIGNAL)
        .map(|i| {
            let prefix = &series[..len - MACD_SIGNAL + i + 1];
            ema(prefix, MACD_FAST) - ema(prefix, MACD_SLOW)
        })
        .collect();
    let signal = trailing_values.iter().sum::<f64>() / trailing_values.len() as f64;

    Macd {
        macd: macd_line,
        signal,
        histogram: macd_line - signal,
    }
}

/// Asset return measured against a benchmark over a trailing window.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BenchmarkComparison {
    pub performance: f64,
    pub benchmark: f64,
    pub alpha: f64,
    pub beta: f64,
}

/// Total return over the trailing `period` points compared against a
/// synthetic benchmark.
///
/// The benchmark is a fixed fraction (0.8) of the asset's own return and
/// beta is a constant 1.2 — a deterministic stand-in until a real index
/// feed backs this. Fewer than `period` points yield an all-zero result.
pub fn benchmark_comparison(series: &[FinancialMetrics], period: usize) -> BenchmarkComparison {
    if series.len() < period || period == 0 {
        return BenchmarkComparison::default();
    }

    let recent = trailing(series, period);
    let first_close = recent[0].close;
    let last_close = recent[recent.len() - 1].close;
    let total_return = if first_close > 0.0 {
        (last_close - first_close) / first_close * 100.0
    } else {
        0.0
    };

    let benchmark_return = total_return * 0.8;

    BenchmarkComparison {
        performance: total_return,
        benchmark: benchmark_return,
        alpha: total_return - benchmark_return,
        beta: 1.2,
    }
}
