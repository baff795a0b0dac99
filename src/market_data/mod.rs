// src/market_data/mod.rs

//! This module provides typed models and retrieval functions for market
//! data from the exchange REST API: order book snapshots, 24-hour ticker
//! statistics, and historical candlestick data with backward pagination
//! beyond the per-call row cap. It also converts raw candles into the
//! `FinancialMetrics` series consumed by the calendar aggregator.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::calendar::week_number;
use crate::config::MAX_KLINES_PER_REQUEST;
use crate::error::MarketError;
use crate::rest_api::RestClient;

/// A single price level: `[price, quantity]`, both decimal strings.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct PriceLevel(pub String, pub String);

impl PriceLevel {
    pub fn price(&self) -> f64 {
        self.0.parse().unwrap_or(0.0)
    }

    pub fn quantity(&self) -> f64 {
        self.1.parse().unwrap_or(0.0)
    }
}

/// Order book snapshot returned by `/depth`.
///
/// The REST body carries no symbol, so `symbol` is filled in by the fetch
/// wrapper after deserialization.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct OrderBookData {
    #[serde(default)]
    pub symbol: String,
    pub last_update_id: u64,
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
}

/// Canonical 24-hour ticker statistics, the REST shape of `/ticker/24hr`.
///
/// WebSocket ticker events arrive with compact single-letter keys and are
/// normalized into this type at the stream boundary (`websocket::TickerEvent`).
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct TickerData {
    pub symbol: String,
    pub price_change: String,
    pub price_change_percent: String,
    pub weighted_avg_price: String,
    #[serde(default)]
    pub prev_close_price: String,
    pub last_price: String,
    #[serde(default)]
    pub last_qty: String,
    #[serde(default)]
    pub bid_price: String,
    #[serde(default)]
    pub bid_qty: String,
    #[serde(default)]
    pub ask_price: String,
    #[serde(default)]
    pub ask_qty: String,
    pub open_price: String,
    pub high_price: String,
    pub low_price: String,
    pub volume: String,
    pub quote_volume: String,
    pub open_time: i64,
    pub close_time: i64,
    #[serde(default)]
    pub first_id: i64,
    #[serde(default)]
    pub last_id: i64,
    #[serde(default)]
    pub count: u64,
}

/// Raw kline row as the exchange returns it: a positional JSON array
/// `[openTime, open, high, low, close, volume, closeTime, quoteVolume,
/// trades, takerBuyBase, takerBuyQuote, ignore]`.
#[derive(Debug, Deserialize, Clone)]
pub struct RawKline(
    pub i64,    // Open time
    pub String, // Open
    pub String, // High
    pub String, // Low
    pub String, // Close
    pub String, // Volume
    pub i64,    // Close time
    pub String, // Quote asset volume
    pub u64,    // Number of trades
    pub String, // Taker buy base asset volume
    pub String, // Taker buy quote asset volume
    pub Value,  // Ignore
);

/// A candlestick with named fields, oldest-first in every sequence the
/// crate hands out.
#[derive(Debug, Clone, PartialEq)]
pub struct KlineRecord {
    pub open_time: i64,
    pub open: String,
    pub high: String,
    pub low: String,
    pub close: String,
    pub volume: String,
    pub close_time: i64,
    pub quote_asset_volume: String,
    pub number_of_trades: u64,
    pub taker_buy_base_asset_volume: String,
    pub taker_buy_quote_asset_volume: String,
}

impl From<RawKline> for KlineRecord {
    fn from(raw: RawKline) -> Self {
        Self {
            open_time: raw.0,
            open: raw.1,
            high: raw.2,
            low: raw.3,
            close: raw.4,
            volume: raw.5,
            close_time: raw.6,
            quote_asset_volume: raw.7,
            number_of_trades: raw.8,
            taker_buy_base_asset_volume: raw.9,
            taker_buy_quote_asset_volume: raw.10,
        }
    }
}

/// Candlestick intervals the calendar pipeline requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KlineInterval {
    D1,
    W1,
    MN1,
}

impl KlineInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            KlineInterval::D1 => "1d",
            KlineInterval::W1 => "1w",
            KlineInterval::MN1 => "1M",
        }
    }
}

impl std::fmt::Display for KlineInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry per time bucket of the aggregated series. The `date` key is
/// an ISO day (`YYYY-MM-DD`), a custom week (`YYYY-Www`), or a month
/// (`YYYY-MM`) depending on the source interval or aggregation timeframe.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FinancialMetrics {
    pub date: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub volatility: f64,
    pub liquidity: f64,
    pub performance: f64,
    // Rollup fields populated only on weekly/monthly aggregates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_daily_volume: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_daily_liquidity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volatility_range: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_count: Option<usize>,
}

impl FinancialMetrics {
    /// A bare bucket with every rollup field unset.
    pub fn new(date: String, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        let performance = if open > 0.0 { (close - open) / open * 100.0 } else { 0.0 };
        let volatility = if open > 0.0 { (high - low) / open * 100.0 } else { 0.0 };
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
            volatility,
            liquidity: volume,
            performance,
            avg_daily_volume: None,
            avg_daily_liquidity: None,
            volatility_range: None,
            days_count: None,
        }
    }
}

/// Source of single kline pages; the seam that lets backward pagination be
/// exercised against an in-memory fake in tests.
#[async_trait]
pub trait KlineSource {
    /// Fetches at most `limit` candles ending strictly at `end_time`
    /// (exclusive cursor, milliseconds) or the newest available when
    /// `end_time` is `None`. Rows come back oldest-first.
    async fn kline_page(
        &self,
        symbol: &str,
        interval: KlineInterval,
        limit: u32,
        end_time: Option<i64>,
    ) -> Result<Vec<KlineRecord>, MarketError>;
}

impl RestClient {
    /// Fetches an order book snapshot for a given symbol.
    ///
    /// # Arguments
    /// * `symbol` - The trading pair symbol (e.g., "BTCUSDT").
    /// * `limit` - The number of levels per side to request.
    pub async fn get_order_book(
        &self,
        symbol: &str,
        limit: u32,
    ) -> Result<OrderBookData, MarketError> {
        let endpoint = "/depth";
        let symbol_uppercase = symbol.to_uppercase();
        let limit_str = limit.to_string();
        let params = vec![
            ("symbol", symbol_uppercase.as_str()),
            ("limit", limit_str.as_str()),
        ];
        let response_value: Value = self.get_unsigned_rest_request(endpoint, params).await?;

        let mut book: OrderBookData = serde_json::from_value(response_value)
            .map_err(|e| MarketError::Parse(format!("failed to parse order book JSON: {}", e)))?;
        book.symbol = symbol_uppercase;
        Ok(book)
    }

    /// Fetches the 24-hour ticker statistics for a given symbol.
    pub async fn get_ticker_24hr(&self, symbol: &str) -> Result<TickerData, MarketError> {
        let endpoint = "/ticker/24hr";
        let symbol_uppercase = symbol.to_uppercase();
        let params = vec![("symbol", symbol_uppercase.as_str())];
        let response_value: Value = self.get_unsigned_rest_request(endpoint, params).await?;

        serde_json::from_value(response_value)
            .map_err(|e| MarketError::Parse(format!("failed to parse 24hr ticker JSON: {}", e)))
    }

    /// Fetches a single page of candlestick data.
    ///
    /// # Arguments
    /// * `symbol` - The trading pair symbol (e.g., "BTCUSDT").
    /// * `interval` - The candlestick interval.
    /// * `limit` - The number of candlesticks to retrieve (max 1000).
    /// * `end_time` - Optional exclusive end time cursor in milliseconds.
    pub async fn get_klines(
        &self,
        symbol: &str,
        interval: KlineInterval,
        limit: u32,
        end_time: Option<i64>,
    ) -> Result<Vec<KlineRecord>, MarketError> {
        let endpoint = "/klines";
        let symbol_uppercase = symbol.to_uppercase();
        let interval_str = interval.as_str();
        let limit_str = limit.to_string();

        let mut params = vec![
            ("symbol", symbol_uppercase.as_str()),
            ("interval", interval_str),
            ("limit", limit_str.as_str()),
        ];

        let end_time_str = end_time.map(|et| et.to_string());
        if let Some(ref et_str) = end_time_str {
            params.push(("endTime", et_str.as_str()));
        }

        let response_value: Value = self.get_unsigned_rest_request(endpoint, params).await?;

        let rows: Vec<RawKline> = serde_json::from_value(response_value)
            .map_err(|e| MarketError::Parse(format!("failed to parse klines JSON: {}", e)))?;
        Ok(rows.into_iter().map(KlineRecord::from).collect())
    }
}

#[async_trait]
impl KlineSource for RestClient {
    async fn kline_page(
        &self,
        symbol: &str,
        interval: KlineInterval,
        limit: u32,
        end_time: Option<i64>,
    ) -> Result<Vec<KlineRecord>, MarketError> {
        self.get_klines(symbol, interval, limit, end_time).await
    }
}

/// Collects up to `target_count` candles, oldest first, paging backward
/// through history.
///
/// The exchange caps each call at 1000 rows, so the newest-not-yet-fetched
/// page is requested repeatedly with the exclusive end-time cursor set to
/// `(earliest open time fetched so far) - 1` and prepended, until either
/// the target is reached or a page comes back shorter than requested
/// (exhausted history). Never requests the same page twice.
pub async fn fetch_kline_history<S>(
    source: &S,
    symbol: &str,
    interval: KlineInterval,
    target_count: usize,
) -> Result<Vec<KlineRecord>, MarketError>
where
    S: KlineSource + Sync + ?Sized,
{
    let mut collected: Vec<KlineRecord> = Vec::new();
    let mut end_time: Option<i64> = None;

    while collected.len() < target_count {
        let limit = (target_count - collected.len()).min(MAX_KLINES_PER_REQUEST);
        let page = source
            .kline_page(symbol, interval, limit as u32, end_time)
            .await?;
        if page.is_empty() {
            break;
        }

        end_time = Some(page[0].open_time - 1);
        let page_len = page.len();

        // Every row in the page predates everything collected so far.
        let mut merged = page;
        merged.append(&mut collected);
        collected = merged;

        if page_len < limit {
            break;
        }
    }

    collected.truncate(target_count);
    Ok(collected)
}

/// Formats the bucket key for a candle's open time according to the
/// interval: ISO day for `1d`, custom week for `1w`, year-month for `1M`.
pub fn date_key_for(open_time_ms: i64, interval: KlineInterval) -> String {
    let date = DateTime::<Utc>::from_timestamp_millis(open_time_ms)
        .unwrap_or(DateTime::UNIX_EPOCH)
        .date_naive();

    match interval {
        KlineInterval::W1 => {
            let week = week_number(date);
            format!("{}-W{:02}", date.year(), week)
        }
        KlineInterval::MN1 => format!("{}-{:02}", date.year(), date.month()),
        KlineInterval::D1 => date.format("%Y-%m-%d").to_string(),
    }
}

/// Maps each candle to a `FinancialMetrics` bucket.
///
/// Performance is `(close - open) / open * 100`, volatility the high-low
/// range as a percentage of open, and liquidity a volume/stability proxy:
/// `volume * 0.7 + volume * (1 - volatility/100) * 0.3`.
pub fn to_financial_metrics(
    klines: &[KlineRecord],
    interval: KlineInterval,
) -> Vec<FinancialMetrics> {
    klines
        .iter()
        .map(|kline| {
            let open: f64 = kline.open.parse().unwrap_or(0.0);
            let high: f64 = kline.high.parse().unwrap_or(0.0);
            let low: f64 = kline.low.parse().unwrap_or(0.0);
            let close: f64 = kline.close.parse().unwrap_or(0.0);
            let volume: f64 = kline.volume.parse().unwrap_or(0.0);

            let performance = if open > 0.0 { (close - open) / open * 100.0 } else { 0.0 };
            let volatility = if open > 0.0 { (high - low) / open * 100.0 } else { 0.0 };

            // Higher liquidity = higher volume + lower price volatility.
            let volume_weight = 0.7;
            let stability_weight = 0.3;
            let price_stability = 1.0 - volatility / 100.0;
            let liquidity = volume * volume_weight + volume * price_stability * stability_weight;

            FinancialMetrics {
                date: date_key_for(kline.open_time, interval),
                open,
                high,
                low,
                close,
                volume,
                volatility,
                liquidity,
                performance,
                avg_daily_volume: None,
                avg_daily_liquidity: None,
                volatility_range: None,
                days_count: None,
            }
        })
        .collect()
}
