// src/main.rs

//! Demo driver for the market calendar pipeline: fetches the calendar
//! series for the configured symbol, prints aggregated views and
//! indicator readings, runs pattern detection on the worker thread, and
//! tails the live order book for a few seconds.

use std::time::Duration;

use dotenv::dotenv;
use log::{error, info};
use prettytable::{Table, row};

use market_calendar::calendar::Timeframe;
use market_calendar::calendar_data::CalendarFeed;
use market_calendar::config::ApiConfig;
use market_calendar::indicators;
use market_calendar::live_data::LiveDataFeed;
use market_calendar::market_data::KlineInterval;
use market_calendar::orderbook::depth_percentage;
use market_calendar::pattern_worker::PatternWorker;

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();

    let config = ApiConfig::from_env();
    let symbol = ApiConfig::default_symbol();

    let calendar = CalendarFeed::connect(&config, &symbol, KlineInterval::D1, 365).await;
    if let Some(err) = calendar.last_error() {
        error!("Calendar feed failed: {}", err);
        return;
    }
    info!(
        "Fetched {} daily buckets for {}",
        calendar.data().len(),
        symbol
    );

    let monthly = calendar.aggregated(Timeframe::Monthly);
    let mut table = Table::new();
    table.add_row(row![
        "Month", "Open", "High", "Low", "Close", "Volume", "Perf %", "Vol %"
    ]);
    let recent_months = monthly.len().saturating_sub(12);
    for bucket in &monthly[recent_months..] {
        table.add_row(row![
            bucket.date,
            format!("{:.2}", bucket.open),
            format!("{:.2}", bucket.high),
            format!("{:.2}", bucket.low),
            format!("{:.2}", bucket.close),
            format!("{:.0}", bucket.volume),
            format!("{:+.2}", bucket.performance),
            format!("{:.2}", bucket.volatility),
        ]);
    }
    println!("\nMonthly aggregation for {}:", symbol);
    table.printstd();

    let series = calendar.data();
    let bands = indicators::bollinger_bands(series, 20, 2.0);
    let macd = indicators::macd(series);
    println!("\nIndicators ({} daily closes):", series.len());
    println!("  SMA(20):   {:.2}", indicators::sma(series, 20));
    println!("  EMA(20):   {:.2}", indicators::ema(series, 20));
    println!("  RSI(14):   {:.1}", indicators::rsi(series));
    println!(
        "  MACD:      {:.2} signal {:.2} histogram {:.2}",
        macd.macd, macd.signal, macd.histogram
    );
    println!(
        "  Bollinger: {:.2} / {:.2} / {:.2}",
        bands.lower, bands.middle, bands.upper
    );
    println!("  Ann. vol:  {:.2}", indicators::vix_like(series, 20));

    let worker = PatternWorker::spawn();
    match worker.detect(series.to_vec(), Timeframe::Daily).await {
        Ok(report) => {
            info!(
                "Detected {} patterns in {:.1}ms (background: {})",
                report.patterns.len(),
                report.processing_ms,
                worker.runs_in_background()
            );
            let mut table = Table::new();
            table.add_row(row!["Pattern", "Period", "Confidence", "Strength"]);
            for pattern in report.patterns.iter().take(8) {
                table.add_row(row![
                    pattern.name,
                    pattern.period,
                    format!("{:.2}", pattern.confidence),
                    format!("{:?}", pattern.strength),
                ]);
            }
            println!("\nDetected patterns:");
            table.printstd();
        }
        Err(e) => error!("Pattern detection failed: {}", e),
    }

    let mut live = LiveDataFeed::connect(&config, &symbol).await;
    if let Some(err) = live.last_error() {
        error!("Live feed failed: {}", err);
        return;
    }

    // Tail the depth stream briefly so the replica sees real diffs.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        tokio::select! {
            more = live.process_next() => {
                if !more {
                    break;
                }
            }
            _ = tokio::time::sleep_until(deadline) => {
                break;
            }
        }
    }

    let book = live.order_book();
    let total_bids = book.total_bid_quantity();
    let mut table = Table::new();
    table.add_row(row!["Bid Price", "Quantity", "Depth %"]);
    for level in book.bids().iter().take(5) {
        table.add_row(row![
            level.0,
            level.1,
            format!("{:.1}", depth_percentage(level.quantity(), total_bids)),
        ]);
    }
    println!(
        "\nOrder book for {} (status: {}):",
        live.symbol(),
        live.status()
    );
    table.printstd();

    live.close().await;
    calendar.close().await;
}
