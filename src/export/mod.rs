// src/export/mod.rs

//! CSV serialization of a metrics series, a pure formatter over the
//! aggregator's output with a fixed column order.

use std::io::Write;

use crate::error::MarketError;
use crate::market_data::FinancialMetrics;

const CSV_HEADERS: [&str; 9] = [
    "date",
    "open",
    "high",
    "low",
    "close",
    "volume",
    "performance",
    "volatility",
    "liquidity",
];

/// Writes the series as CSV to `writer`, header row first.
pub fn write_metrics_csv<W: Write>(
    series: &[FinancialMetrics],
    writer: W,
) -> Result<(), MarketError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer
        .write_record(CSV_HEADERS)
        .map_err(|e| MarketError::Validation(format!("CSV export failed: {}", e)))?;

    for entry in series {
        csv_writer
            .write_record(&[
                entry.date.clone(),
                entry.open.to_string(),
                entry.high.to_string(),
                entry.low.to_string(),
                entry.close.to_string(),
                entry.volume.to_string(),
                entry.performance.to_string(),
                entry.volatility.to_string(),
                entry.liquidity.to_string(),
            ])
            .map_err(|e| MarketError::Validation(format!("CSV export failed: {}", e)))?;
    }

    csv_writer
        .flush()
        .map_err(|e| MarketError::Validation(format!("CSV export failed: {}", e)))
}

/// The series rendered to an in-memory CSV string.
pub fn metrics_to_csv(series: &[FinancialMetrics]) -> Result<String, MarketError> {
    let mut buffer = Vec::new();
    write_metrics_csv(series, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| MarketError::Validation(format!("CSV export failed: {}", e)))
}
