// tests/orderbook_tests.rs

//! Tests for the live order book replica: diff application invariants,
//! numeric level ordering, depth truncation, and the current-symbol guard
//! that discards stale frames after a subscription switch.

use market_calendar::live_data::LiveDataState;
use market_calendar::market_data::{OrderBookData, PriceLevel};
use market_calendar::orderbook::{OrderBookReplica, depth_percentage, total_quantity};
use market_calendar::websocket::{DepthUpdateEvent, MarketEvent};
use market_calendar::websocket_stream::{ConnectionStatus, StreamMessage};

fn level(price: &str, quantity: &str) -> PriceLevel {
    PriceLevel(price.to_string(), quantity.to_string())
}

fn diff(symbol: &str, bids: Vec<PriceLevel>, asks: Vec<PriceLevel>) -> DepthUpdateEvent {
    DepthUpdateEvent {
        event_type: "depthUpdate".to_string(),
        event_time: 0,
        symbol: symbol.to_string(),
        first_update_id: 1,
        final_update_id: 2,
        bids,
        asks,
    }
}

fn assert_invariants(replica: &OrderBookReplica) {
    for side in [replica.bids(), replica.asks()] {
        for entry in side {
            assert!(entry.quantity() > 0.0, "zero-quantity level stored: {:?}", entry);
        }
        let mut prices: Vec<&str> = side.iter().map(|l| l.0.as_str()).collect();
        prices.sort_unstable();
        prices.dedup();
        assert_eq!(prices.len(), side.len(), "duplicate price on one side");
    }
    for pair in replica.bids().windows(2) {
        assert!(pair[0].price() > pair[1].price(), "bids not strictly descending");
    }
    for pair in replica.asks().windows(2) {
        assert!(pair[0].price() < pair[1].price(), "asks not strictly ascending");
    }
}

#[test]
fn diff_upserts_removes_and_keeps_sides_sorted() {
    let mut replica = OrderBookReplica::new();
    replica.seed(OrderBookData {
        symbol: "BTCUSDT".to_string(),
        last_update_id: 10,
        bids: vec![level("100.0", "1.0"), level("99.5", "2.0")],
        asks: vec![level("100.5", "1.5"), level("101.0", "3.0")],
    });

    let update = diff(
        "BTCUSDT",
        vec![level("99.5", "0"), level("100.2", "4.0"), level("100.0", "2.5")],
        vec![level("101.0", "0"), level("100.7", "1.0")],
    );
    replica.apply_diff(&update);

    assert_eq!(replica.bids(), &[level("100.2", "4.0"), level("100.0", "2.5")]);
    assert_eq!(replica.asks(), &[level("100.5", "1.5"), level("100.7", "1.0")]);
    assert_eq!(replica.last_update_id(), 2);
    assert_invariants(&replica);
}

#[test]
fn removing_an_absent_price_is_a_no_op() {
    let mut replica = OrderBookReplica::new();
    replica.apply_diff(&diff(
        "BTCUSDT",
        vec![level("50.0", "1.0"), level("49.0", "0")],
        vec![],
    ));
    assert_eq!(replica.bids(), &[level("50.0", "1.0")]);
    assert_invariants(&replica);
}

#[test]
fn price_ordering_is_numeric_not_lexicographic() {
    let mut replica = OrderBookReplica::new();
    replica.apply_diff(&diff(
        "BTCUSDT",
        vec![level("9.5", "1"), level("100.0", "1"), level("10.2", "1")],
        vec![level("9.5", "1"), level("100.0", "1"), level("10.2", "1")],
    ));

    let bid_prices: Vec<&str> = replica.bids().iter().map(|l| l.0.as_str()).collect();
    assert_eq!(bid_prices, vec!["100.0", "10.2", "9.5"]);
    let ask_prices: Vec<&str> = replica.asks().iter().map(|l| l.0.as_str()).collect();
    assert_eq!(ask_prices, vec!["9.5", "10.2", "100.0"]);
}

#[test]
fn sides_truncate_to_the_depth_bound() {
    let mut replica = OrderBookReplica::new();
    let bids: Vec<PriceLevel> = (1..=120)
        .map(|i| level(&format!("{}.0", i), "1.0"))
        .collect();
    replica.apply_diff(&diff("BTCUSDT", bids, vec![]));

    assert_eq!(replica.bids().len(), 100);
    // The best (highest) bids survive truncation.
    assert_eq!(replica.best_bid().unwrap().0, "120.0");
    assert_eq!(replica.bids().last().unwrap().0, "21.0");
    assert_invariants(&replica);
}

#[test]
fn invariants_hold_across_a_diff_sequence() {
    let mut replica = OrderBookReplica::new();
    replica.seed(OrderBookData {
        symbol: "ETHUSDT".to_string(),
        last_update_id: 1,
        bids: vec![level("2000.0", "5.0")],
        asks: vec![level("2001.0", "5.0")],
    });

    let updates = [
        diff("ETHUSDT", vec![level("1999.5", "1.0")], vec![level("2002.0", "2.0")]),
        diff("ETHUSDT", vec![level("2000.0", "0")], vec![level("2001.0", "4.0")]),
        diff("ETHUSDT", vec![level("2000.5", "3.0"), level("1999.5", "0")], vec![]),
        diff("ETHUSDT", vec![level("2000.5", "1.5")], vec![level("2002.0", "0")]),
    ];
    for update in &updates {
        replica.apply_diff(update);
        assert_invariants(&replica);
    }

    assert_eq!(replica.bids(), &[level("2000.5", "1.5")]);
    assert_eq!(replica.asks(), &[level("2001.0", "4.0")]);
}

#[test]
fn seed_and_clear_drive_the_snapshot_lifecycle() {
    let mut replica = OrderBookReplica::new();
    assert!(!replica.is_seeded());

    replica.seed(OrderBookData {
        symbol: "BTCUSDT".to_string(),
        last_update_id: 7,
        bids: vec![level("100.0", "1.0")],
        asks: vec![level("100.5", "2.0")],
    });
    assert!(replica.is_seeded());
    assert_eq!(replica.symbol(), "BTCUSDT");

    let snapshot = replica.to_snapshot();
    assert_eq!(snapshot.last_update_id, 7);
    assert_eq!(snapshot.bids, vec![level("100.0", "1.0")]);
    assert_eq!(snapshot.asks, vec![level("100.5", "2.0")]);

    replica.clear();
    assert!(!replica.is_seeded());
    assert!(replica.bids().is_empty());
    assert_eq!(replica.last_update_id(), 0);
}

#[test]
fn empty_book_depth_math_returns_zero() {
    let replica = OrderBookReplica::new();
    assert_eq!(replica.total_bid_quantity(), 0.0);
    assert_eq!(replica.total_ask_quantity(), 0.0);
    assert_eq!(total_quantity(&[]), 0.0);
    assert_eq!(depth_percentage(5.0, 0.0), 0.0);
    assert!(replica.best_bid().is_none());
    assert!(replica.best_ask().is_none());
}

#[test]
fn depth_percentage_shares_sum_to_full_book() {
    let levels = vec![level("10.0", "1.0"), level("9.0", "3.0")];
    let total = total_quantity(&levels);
    assert_eq!(depth_percentage(1.0, total), 25.0);
    assert_eq!(depth_percentage(3.0, total), 75.0);
}

#[test]
fn stale_symbol_frames_are_discarded_after_switch() {
    let mut state = LiveDataState::new("BTCUSDT");
    state.order_book.seed(OrderBookData {
        symbol: "BTCUSDT".to_string(),
        last_update_id: 1,
        bids: vec![level("100.0", "1.0")],
        asks: vec![],
    });

    state.begin_symbol_switch("ETHUSDT");
    assert!(state.order_book.bids().is_empty());
    assert_eq!(state.status, ConnectionStatus::Connecting);

    // A late frame for the old symbol must not mutate the replica.
    let stale = diff("BTCUSDT", vec![level("100.0", "9.0")], vec![]);
    state.handle_message(StreamMessage::Event(MarketEvent::DepthUpdate(stale)));
    assert!(state.order_book.bids().is_empty());

    // Frames for the current symbol apply as usual.
    let fresh = diff("ETHUSDT", vec![level("2000.0", "1.0")], vec![]);
    state.handle_message(StreamMessage::Event(MarketEvent::DepthUpdate(fresh)));
    assert_eq!(state.order_book.bids(), &[level("2000.0", "1.0")]);
}

#[test]
fn status_messages_update_connection_state() {
    let mut state = LiveDataState::new("BTCUSDT");
    assert_eq!(state.status, ConnectionStatus::Disconnected);
    state.handle_message(StreamMessage::Status(ConnectionStatus::Connected));
    assert_eq!(state.status, ConnectionStatus::Connected);
    state.handle_message(StreamMessage::Status(ConnectionStatus::Error));
    assert_eq!(state.status, ConnectionStatus::Error);
}
