// src/websocket/ticker.rs

//! This module defines the 24-hour rolling ticker stream payload and its
//! normalization into the canonical REST-shaped `TickerData`.
//!
//! The stream variant uses compact single-letter keys (`c`, `P`, `v`, ...);
//! readers never see that shape, only the normalized type.

use serde::{Deserialize, Serialize};

use crate::market_data::TickerData;

/// A 24-hour rolling window ticker statistics message (`e: "24hrTicker"`).
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TickerEvent {
    #[serde(rename = "e")]
    pub event_type: String,
    #[serde(rename = "E")]
    pub event_time: i64,
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "p")]
    pub price_change: String,
    #[serde(rename = "P")]
    pub price_change_percent: String,
    #[serde(rename = "w")]
    pub weighted_avg_price: String,
    #[serde(rename = "x")]
    pub first_trade_price: String,
    #[serde(rename = "c")]
    pub last_price: String,
    #[serde(rename = "Q")]
    pub last_quantity: String,
    #[serde(rename = "b")]
    pub best_bid_price: String,
    #[serde(rename = "B")]
    pub best_bid_quantity: String,
    #[serde(rename = "a")]
    pub best_ask_price: String,
    #[serde(rename = "A")]
    pub best_ask_quantity: String,
    #[serde(rename = "o")]
    pub open_price: String,
    #[serde(rename = "h")]
    pub high_price: String,
    #[serde(rename = "l")]
    pub low_price: String,
    #[serde(rename = "v")]
    pub total_traded_base_asset_volume: String,
    #[serde(rename = "q")]
    pub total_traded_quote_asset_volume: String,
    #[serde(rename = "O")]
    pub statistics_open_time: i64,
    #[serde(rename = "C")]
    pub statistics_close_time: i64,
    #[serde(rename = "F")]
    pub first_trade_id: i64,
    #[serde(rename = "L")]
    pub last_trade_id: i64,
    #[serde(rename = "n")]
    pub total_number_of_trades: u64,
}

impl From<TickerEvent> for TickerData {
    fn from(event: TickerEvent) -> Self {
        TickerData {
            symbol: event.symbol,
            price_change: event.price_change,
            price_change_percent: event.price_change_percent,
            weighted_avg_price: event.weighted_avg_price,
            prev_close_price: event.first_trade_price,
            last_price: event.last_price,
            last_qty: event.last_quantity,
            bid_price: event.best_bid_price,
            bid_qty: event.best_bid_quantity,
            ask_price: event.best_ask_price,
            ask_qty: event.best_ask_quantity,
            open_price: event.open_price,
            high_price: event.high_price,
            low_price: event.low_price,
            volume: event.total_traded_base_asset_volume,
            quote_volume: event.total_traded_quote_asset_volume,
            open_time: event.statistics_open_time,
            close_time: event.statistics_close_time,
            first_id: event.first_trade_id,
            last_id: event.last_trade_id,
            count: event.total_number_of_trades,
        }
    }
}
