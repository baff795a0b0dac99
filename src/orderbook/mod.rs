// src/orderbook/mod.rs

//! Live order book replica. One instance is owned by a depth
//! subscription: it is reseeded from a REST snapshot on (re)connect and
//! mutated in place by each diff event, in arrival order.

use std::cmp::Ordering;

use crate::config::MAX_DEPTH_LEVELS;
use crate::market_data::{OrderBookData, PriceLevel};
use crate::websocket::DepthUpdateEvent;

/// Local bid/ask ledger bounded to [`MAX_DEPTH_LEVELS`] per side.
///
/// Invariants after every mutation: bids sorted descending by numeric
/// price, asks ascending, at most one entry per price per side, no entry
/// with zero quantity.
#[derive(Debug, Clone, Default)]
pub struct OrderBookReplica {
    symbol: String,
    last_update_id: u64,
    bids: Vec<PriceLevel>,
    asks: Vec<PriceLevel>,
    seeded: bool,
}

impl OrderBookReplica {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discards all levels, e.g. when the subscription switches symbols.
    /// The replica stays empty until the next snapshot seeds it.
    pub fn clear(&mut self) {
        self.symbol.clear();
        self.last_update_id = 0;
        self.bids.clear();
        self.asks.clear();
        self.seeded = false;
    }

    /// Re-seeds the ledger from a REST snapshot.
    pub fn seed(&mut self, snapshot: OrderBookData) {
        self.symbol = snapshot.symbol;
        self.last_update_id = snapshot.last_update_id;
        self.bids = snapshot.bids;
        self.asks = snapshot.asks;
        self.seeded = true;
        sort_and_truncate(&mut self.bids, Side::Bid);
        sort_and_truncate(&mut self.asks, Side::Ask);
    }

    /// Whether a snapshot has been applied since the last clear. Diffs
    /// arriving before the seed are applied to an empty book and the next
    /// snapshot replaces them wholesale, which the design tolerates.
    pub fn is_seeded(&self) -> bool {
        self.seeded
    }

    /// Applies one diff event: per side, a zero quantity removes the level
    /// at that exact price, anything else upserts it. Both sides are then
    /// re-sorted numerically and truncated to the depth bound.
    pub fn apply_diff(&mut self, update: &DepthUpdateEvent) {
        apply_side(&mut self.bids, &update.bids);
        apply_side(&mut self.asks, &update.asks);
        sort_and_truncate(&mut self.bids, Side::Bid);
        sort_and_truncate(&mut self.asks, Side::Ask);
        self.last_update_id = update.final_update_id;
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn last_update_id(&self) -> u64 {
        self.last_update_id
    }

    pub fn bids(&self) -> &[PriceLevel] {
        &self.bids
    }

    pub fn asks(&self) -> &[PriceLevel] {
        &self.asks
    }

    pub fn best_bid(&self) -> Option<&PriceLevel> {
        self.bids.first()
    }

    pub fn best_ask(&self) -> Option<&PriceLevel> {
        self.asks.first()
    }

    /// A snapshot copy in the wire shape, for presentation or export.
    pub fn to_snapshot(&self) -> OrderBookData {
        OrderBookData {
            symbol: self.symbol.clone(),
            last_update_id: self.last_update_id,
            bids: self.bids.clone(),
            asks: self.asks.clone(),
        }
    }

    pub fn total_bid_quantity(&self) -> f64 {
        total_quantity(&self.bids)
    }

    pub fn total_ask_quantity(&self) -> f64 {
        total_quantity(&self.asks)
    }
}

#[derive(Clone, Copy)]
enum Side {
    Bid,
    Ask,
}

fn apply_side(levels: &mut Vec<PriceLevel>, updates: &[PriceLevel]) {
    for update in updates {
        let existing = levels.iter().position(|level| level.0 == update.0);
        if update.quantity() == 0.0 {
            if let Some(index) = existing {
                levels.remove(index);
            }
        } else {
            match existing {
                Some(index) => levels[index].1 = update.1.clone(),
                None => levels.push(update.clone()),
            }
        }
    }
}

fn sort_and_truncate(levels: &mut Vec<PriceLevel>, side: Side) {
    // Numeric comparison: "9.5" must sort below "10.2".
    levels.sort_by(|a, b| {
        let ordering = a
            .price()
            .partial_cmp(&b.price())
            .unwrap_or(Ordering::Equal);
        match side {
            Side::Bid => ordering.reverse(),
            Side::Ask => ordering,
        }
    });
    levels.truncate(MAX_DEPTH_LEVELS);
}

/// Sum of level quantities; 0 for an empty side, never NaN.
pub fn total_quantity(levels: &[PriceLevel]) -> f64 {
    levels.iter().map(PriceLevel::quantity).sum()
}

/// Share of `quantity` within `total`, as a percentage. An empty book
/// (total 0) yields 0.
pub fn depth_percentage(quantity: f64, total: f64) -> f64 {
    if total > 0.0 {
        quantity / total * 100.0
    } else {
        0.0
    }
}
