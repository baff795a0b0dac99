// src/config/mod.rs

//! Runtime configuration for the market data pipeline.
//!
//! Defaults target the Binance production endpoints; every field can be
//! overridden through the environment (loaded from a `.env` file by the
//! binary via `dotenv`).

use std::env;
use std::time::Duration;

/// Default trading pair used when the caller does not name one.
pub const DEFAULT_SYMBOL: &str = "BTCUSDT";

/// Maximum kline rows the exchange returns per request.
pub const MAX_KLINES_PER_REQUEST: usize = 1000;

/// Order book levels kept per side by the live replica.
pub const MAX_DEPTH_LEVELS: usize = 100;

/// Connection endpoints and client limits.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL for REST endpoints, e.g. "https://api.binance.com/api/v3".
    pub rest_base_url: String,
    /// Base URL for WebSocket streams, e.g. "wss://stream.binance.com:9443".
    pub ws_base_url: String,
    /// Depth levels requested for the initial order book snapshot.
    pub depth_limit: u32,
    /// Soft watchdog for REST calls; requests exceeding it fail with
    /// `MarketError::Timeout`.
    pub request_timeout: Duration,
    /// Fixed delay before a dropped stream schedules its reconnect attempt.
    pub reconnect_delay: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            rest_base_url: "https://api.binance.com/api/v3".to_string(),
            ws_base_url: "wss://stream.binance.com:9443".to_string(),
            depth_limit: 100,
            request_timeout: Duration::from_secs(15),
            reconnect_delay: Duration::from_secs(5),
        }
    }
}

impl ApiConfig {
    /// Builds a config from the environment, falling back to the Binance
    /// production defaults for anything unset.
    ///
    /// Recognized variables: `MARKET_REST_URL`, `MARKET_WS_URL`,
    /// `MARKET_DEPTH_LIMIT`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = env::var("MARKET_REST_URL") {
            config.rest_base_url = url;
        }
        if let Ok(url) = env::var("MARKET_WS_URL") {
            config.ws_base_url = url;
        }
        if let Ok(limit) = env::var("MARKET_DEPTH_LIMIT") {
            if let Ok(parsed) = limit.parse() {
                config.depth_limit = parsed;
            }
        }
        config
    }

    /// Symbol to use when none is configured, honoring `MARKET_SYMBOL`.
    pub fn default_symbol() -> String {
        env::var("MARKET_SYMBOL").unwrap_or_else(|_| DEFAULT_SYMBOL.to_string())
    }
}
