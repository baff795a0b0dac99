// tests/market_data_tests.rs

//! Tests for kline-to-metrics conversion, date-key formats, stream event
//! dispatch, ticker normalization, and CSV export.

use chrono::NaiveDate;
use serde_json::json;

use market_calendar::export::metrics_to_csv;
use market_calendar::market_data::{
    FinancialMetrics, KlineInterval, KlineRecord, RawKline, TickerData, date_key_for,
    to_financial_metrics,
};
use market_calendar::websocket::{MarketEvent, TickerEvent};

fn millis(year: i32, month: u32, day: u32) -> i64 {
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc()
        .timestamp_millis()
}

fn kline(open_time: i64, open: &str, high: &str, low: &str, close: &str, volume: &str) -> KlineRecord {
    KlineRecord {
        open_time,
        open: open.to_string(),
        high: high.to_string(),
        low: low.to_string(),
        close: close.to_string(),
        volume: volume.to_string(),
        close_time: open_time + 86_399_999,
        quote_asset_volume: "0".to_string(),
        number_of_trades: 1,
        taker_buy_base_asset_volume: "0".to_string(),
        taker_buy_quote_asset_volume: "0".to_string(),
    }
}

#[test]
fn raw_kline_rows_deserialize_positionally() {
    let row = json!([
        1704067200000i64,
        "100.0",
        "110.0",
        "90.0",
        "105.0",
        "1234.5",
        1704153599999i64,
        "130000.0",
        4321,
        "600.0",
        "63000.0",
        "0"
    ]);
    let raw: RawKline = serde_json::from_value(row).unwrap();
    let record = KlineRecord::from(raw);
    assert_eq!(record.open_time, 1704067200000);
    assert_eq!(record.open, "100.0");
    assert_eq!(record.number_of_trades, 4321);
}

#[test]
fn conversion_computes_derived_fields() {
    let klines = vec![kline(millis(2024, 3, 5), "100", "110", "90", "105", "1000")];
    let metrics = to_financial_metrics(&klines, KlineInterval::D1);

    assert_eq!(metrics.len(), 1);
    let entry = &metrics[0];
    assert_eq!(entry.date, "2024-03-05");
    assert!((entry.performance - 5.0).abs() < 1e-9);
    assert!((entry.volatility - 20.0).abs() < 1e-9);
    // volume * 0.7 + volume * (1 - volatility/100) * 0.3
    let expected_liquidity = 1000.0 * 0.7 + 1000.0 * 0.8 * 0.3;
    assert!((entry.liquidity - expected_liquidity).abs() < 1e-9);
}

#[test]
fn date_keys_follow_the_interval() {
    let jan8 = millis(2024, 1, 8);
    assert_eq!(date_key_for(jan8, KlineInterval::D1), "2024-01-08");
    assert_eq!(date_key_for(jan8, KlineInterval::W1), "2024-W02");
    assert_eq!(date_key_for(jan8, KlineInterval::MN1), "2024-01");

    let dec31 = millis(2024, 12, 31);
    assert_eq!(date_key_for(dec31, KlineInterval::W1), "2024-W53");
}

#[test]
fn market_events_dispatch_on_event_type() {
    let depth = json!({
        "e": "depthUpdate",
        "E": 1704067200000i64,
        "s": "BTCUSDT",
        "U": 1,
        "u": 2,
        "b": [["100.0", "1.5"]],
        "a": [["100.5", "0"]]
    });
    match MarketEvent::from_value(&depth) {
        Some(MarketEvent::DepthUpdate(update)) => {
            assert_eq!(update.symbol, "BTCUSDT");
            assert_eq!(update.bids.len(), 1);
            assert_eq!(update.asks[0].1, "0");
        }
        other => panic!("expected a depth update, got {:?}", other),
    }

    // Subscription acks carry no event type and are dropped.
    assert!(MarketEvent::from_value(&json!({"result": null, "id": 1})).is_none());
    // Unknown event types are dropped.
    assert!(MarketEvent::from_value(&json!({"e": "aggTrade"})).is_none());
    // Malformed payloads of a known type are dropped, never an error.
    assert!(MarketEvent::from_value(&json!({"e": "depthUpdate", "s": 7})).is_none());
}

#[test]
fn stream_ticker_normalizes_to_the_rest_shape() {
    let event: TickerEvent = serde_json::from_value(json!({
        "e": "24hrTicker",
        "E": 1704067200000i64,
        "s": "BTCUSDT",
        "p": "150.0",
        "P": "2.5",
        "w": "6050.0",
        "x": "6000.0",
        "c": "6150.0",
        "Q": "0.5",
        "b": "6149.0",
        "B": "2.0",
        "a": "6151.0",
        "A": "1.0",
        "o": "6000.0",
        "h": "6200.0",
        "l": "5900.0",
        "v": "90000.0",
        "q": "545000000.0",
        "O": 1703980800000i64,
        "C": 1704067200000i64,
        "F": 1,
        "L": 99,
        "n": 99
    }))
    .unwrap();

    let ticker: TickerData = event.into();
    assert_eq!(ticker.symbol, "BTCUSDT");
    assert_eq!(ticker.last_price, "6150.0");
    assert_eq!(ticker.price_change_percent, "2.5");
    assert_eq!(ticker.volume, "90000.0");
    assert_eq!(ticker.open_time, 1703980800000);
}

#[test]
fn csv_export_uses_the_fixed_column_order() {
    let series = vec![
        FinancialMetrics::new("2024-03-01".to_string(), 100.0, 110.0, 90.0, 105.0, 1000.0),
        FinancialMetrics::new("2024-03-02".to_string(), 105.0, 115.0, 95.0, 100.0, 500.0),
    ];

    let csv = metrics_to_csv(&series).unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next().unwrap(),
        "date,open,high,low,close,volume,performance,volatility,liquidity"
    );
    assert_eq!(csv.lines().count(), 3);
    assert!(csv.lines().nth(1).unwrap().starts_with("2024-03-01,100,110,90,105,1000,"));
}
