// src/websocket/mod.rs

//! Typed payloads for the public market data streams and the dispatch of
//! raw frames into them. The stream session in `websocket_stream` feeds
//! every text frame through [`MarketEvent::from_value`]; frames that match
//! no known event type are dropped there.

pub mod depth;
pub mod kline;
pub mod ticker;

pub use depth::DepthUpdateEvent;
pub use kline::{KlineEvent, KlinePayload};
pub use ticker::TickerEvent;

use serde_json::Value;

/// A parsed stream event, discriminated on the payload's `e` field.
#[derive(Debug, Clone)]
pub enum MarketEvent {
    DepthUpdate(DepthUpdateEvent),
    Ticker(TickerEvent),
    Kline(KlineEvent),
}

impl MarketEvent {
    /// Parses one stream payload (the `data` half of a combined-stream
    /// envelope, or a whole raw-stream frame). Returns `None` for
    /// subscription acks, unknown event types, and malformed payloads —
    /// callers drop those silently.
    pub fn from_value(data: &Value) -> Option<MarketEvent> {
        match data.get("e").and_then(Value::as_str)? {
            "depthUpdate" => serde_json::from_value(data.clone())
                .ok()
                .map(MarketEvent::DepthUpdate),
            "24hrTicker" => serde_json::from_value(data.clone())
                .ok()
                .map(MarketEvent::Ticker),
            "kline" => serde_json::from_value(data.clone())
                .ok()
                .map(MarketEvent::Kline),
            _ => None,
        }
    }

    /// Symbol the event is tagged with, used for the current-symbol guard
    /// after a subscription switch.
    pub fn symbol(&self) -> &str {
        match self {
            MarketEvent::DepthUpdate(event) => &event.symbol,
            MarketEvent::Ticker(event) => &event.symbol,
            MarketEvent::Kline(event) => &event.symbol,
        }
    }
}
