// src/lib.rs

//! Streaming market data aggregation for a cryptocurrency calendar
//! dashboard.
//!
//! The pipeline pulls order book snapshots, 24-hour tickers, and kline
//! history from a public exchange's REST API, keeps a live order book
//! replica fed by WebSocket diffs, reconciles streaming kline updates
//! into a daily/weekly/monthly bucketed series with custom week
//! numbering, and derives technical indicators and background pattern
//! analysis from that series. Rendering is left to the consumer; the
//! feeds expose current values, loading/error flags, and connection
//! status.

pub mod calendar;
pub mod calendar_data;
pub mod config;
pub mod error;
pub mod export;
pub mod indicators;
pub mod live_data;
pub mod market_data;
pub mod orderbook;
pub mod pattern_worker;
pub mod patterns;
pub mod rest_api;
pub mod websocket;
pub mod websocket_stream;
