// src/websocket/depth.rs

//! This module defines the data structure for the order book diff depth
//! stream (`<symbol>@depth@100ms`).

use serde::{Deserialize, Serialize};

use crate::market_data::PriceLevel;

/// An incremental update to the order book (`e: "depthUpdate"`).
///
/// Each level pair upserts the quantity at its price; a quantity of `"0"`
/// removes the level.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DepthUpdateEvent {
    #[serde(rename = "e")]
    pub event_type: String,
    #[serde(rename = "E")]
    pub event_time: i64,
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "U")]
    pub first_update_id: u64, // First update ID in event
    #[serde(rename = "u")]
    pub final_update_id: u64, // Final update ID in event
    #[serde(rename = "b")]
    pub bids: Vec<PriceLevel>, // Bids to be updated/inserted
    #[serde(rename = "a")]
    pub asks: Vec<PriceLevel>, // Asks to be updated/inserted
}
