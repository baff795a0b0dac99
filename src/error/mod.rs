// src/error/mod.rs

//! Error taxonomy shared across the REST client, stream sessions, and the
//! pattern worker. Indicator functions never produce these: insufficient
//! history degrades to neutral values instead of raising.

use std::time::Duration;
use thiserror::Error;

/// All errors surfaced by the market data pipeline.
#[derive(Debug, Error)]
pub enum MarketError {
    /// Non-2xx response or transport failure on a REST call.
    #[error("network request failed: {0}")]
    Network(String),

    /// Soft client-side watchdog: the request neither resolved nor rejected
    /// within the configured deadline.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// WebSocket transport error or unexpected close.
    #[error("stream error: {0}")]
    Stream(String),

    /// Malformed frame or JSON body. Stream frames that fail to parse are
    /// dropped at the session boundary and never reach the caller; this
    /// variant surfaces only for REST bodies.
    #[error("failed to parse payload: {0}")]
    Parse(String),

    /// Pattern detection failed inside the worker (panic or send failure).
    #[error("pattern detection failed: {0}")]
    Worker(String),

    /// Input rejected before any work happened (bad symbol, bad range).
    #[error("{0}")]
    Validation(String),
}

impl From<reqwest::Error> for MarketError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            // The reqwest deadline is configured in ApiConfig; 15s default.
            MarketError::Timeout(Duration::from_secs(15))
        } else if err.is_decode() {
            MarketError::Parse(err.to_string())
        } else {
            MarketError::Network(err.to_string())
        }
    }
}
