// src/live_data/mod.rs

//! Reactive handle over the live order book replica and 24-hour ticker
//! for one symbol: REST seeds the baseline, the stream mutates it, and
//! the presentation layer reads the current value plus loading/error/
//! connection state.

use chrono::{DateTime, Utc};
use log::{debug, info};
use tokio::sync::mpsc;

use crate::config::ApiConfig;
use crate::market_data::TickerData;
use crate::orderbook::OrderBookReplica;
use crate::rest_api::RestClient;
use crate::websocket::MarketEvent;
use crate::websocket_stream::{ConnectionStatus, StreamChannel, StreamHandle, StreamMessage};

/// Mutable state of a live feed, separated from the transport so the
/// event-handling path can be exercised without a socket.
#[derive(Debug)]
pub struct LiveDataState {
    pub symbol: String,
    pub order_book: OrderBookReplica,
    pub ticker: Option<TickerData>,
    pub real_time_price: Option<f64>,
    pub previous_price: Option<f64>,
    pub status: ConnectionStatus,
    pub loading: bool,
    pub last_error: Option<String>,
    pub last_update: Option<DateTime<Utc>>,
}

impl LiveDataState {
    pub fn new(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_uppercase(),
            order_book: OrderBookReplica::new(),
            ticker: None,
            real_time_price: None,
            previous_price: None,
            status: ConnectionStatus::Disconnected,
            loading: true,
            last_error: None,
            last_update: None,
        }
    }

    /// Applies one stream message. Depth diffs are applied in arrival
    /// order; any event tagged with a symbol other than the current one is
    /// discarded — it belongs to a subscription from before a switch.
    pub fn handle_message(&mut self, message: StreamMessage) {
        match message {
            StreamMessage::Status(status) => {
                self.status = status;
            }
            StreamMessage::Event(event) => {
                if !event.symbol().eq_ignore_ascii_case(&self.symbol) {
                    debug!(
                        "Discarding stale frame for {} while subscribed to {}",
                        event.symbol(),
                        self.symbol
                    );
                    return;
                }
                match event {
                    MarketEvent::DepthUpdate(update) => {
                        self.order_book.apply_diff(&update);
                        self.last_update = Some(Utc::now());
                    }
                    MarketEvent::Ticker(event) => {
                        let ticker: TickerData = event.into();
                        if let Ok(price) = ticker.last_price.parse::<f64>() {
                            self.previous_price = self.real_time_price;
                            self.real_time_price = Some(price);
                        }
                        self.ticker = Some(ticker);
                        self.last_update = Some(Utc::now());
                    }
                    MarketEvent::Kline(_) => {
                        // This feed does not subscribe to klines.
                    }
                }
            }
        }
    }

    /// Starts a switch to `symbol`. The replica is cleared before any
    /// fetch happens, so diffs for the old book can never be
    /// misattributed to the new one.
    pub fn begin_symbol_switch(&mut self, symbol: &str) {
        self.symbol = symbol.to_uppercase();
        self.order_book.clear();
        self.ticker = None;
        self.real_time_price = None;
        self.previous_price = None;
        self.status = ConnectionStatus::Connecting;
    }
}

/// Live order book + ticker session for one symbol at a time.
pub struct LiveDataFeed {
    rest: RestClient,
    stream: StreamHandle,
    messages: mpsc::Receiver<StreamMessage>,
    state: LiveDataState,
    depth_limit: u32,
}

impl LiveDataFeed {
    /// Opens a combined-stream session carrying both depth diffs and
    /// ticker updates, then seeds the replica from REST.
    pub async fn connect(config: &ApiConfig, symbol: &str) -> Self {
        let (message_tx, message_rx) = mpsc::channel::<StreamMessage>(256);
        let stream = StreamHandle::open_combined(
            config,
            symbol,
            vec![StreamChannel::Depth100ms, StreamChannel::Ticker],
            message_tx,
        );
        let mut feed = Self {
            rest: RestClient::new(config),
            stream,
            messages: message_rx,
            state: LiveDataState::new(symbol),
            depth_limit: config.depth_limit,
        };
        feed.refresh().await;
        feed
    }

    /// Depth-only variant on the raw single-stream endpoint; ticker data
    /// comes from explicit `refresh_ticker` polling instead.
    pub async fn connect_depth_only(config: &ApiConfig, symbol: &str) -> Self {
        let (message_tx, message_rx) = mpsc::channel::<StreamMessage>(256);
        let stream = StreamHandle::open_raw_depth(config, symbol, message_tx);
        let mut feed = Self {
            rest: RestClient::new(config),
            stream,
            messages: message_rx,
            state: LiveDataState::new(symbol),
            depth_limit: config.depth_limit,
        };
        feed.refresh().await;
        feed
    }

    /// Re-fetches the order book snapshot and ticker for the current
    /// symbol. Safe to invoke repeatedly; each call reseeds the replica
    /// wholesale.
    pub async fn refresh(&mut self) {
        self.state.loading = true;
        self.state.last_error = None;

        let symbol = self.state.symbol.clone();
        let (book, ticker) = tokio::join!(
            self.rest.get_order_book(&symbol, self.depth_limit),
            self.rest.get_ticker_24hr(&symbol),
        );

        match (book, ticker) {
            (Ok(book), Ok(ticker)) => {
                self.state.order_book.seed(book);
                if let Ok(price) = ticker.last_price.parse::<f64>() {
                    self.state.previous_price = None;
                    self.state.real_time_price = Some(price);
                }
                self.state.ticker = Some(ticker);
                self.state.loading = false;
                self.state.status = ConnectionStatus::Connected;
                self.state.last_update = Some(Utc::now());
            }
            (Err(e), _) | (_, Err(e)) => {
                self.state.loading = false;
                self.state.status = ConnectionStatus::Error;
                self.state.last_error = Some(e.to_string());
            }
        }
    }

    /// Polls the 24h ticker only, tracking the previous real-time price.
    /// Failures leave the last good ticker in place.
    pub async fn refresh_ticker(&mut self) {
        if let Ok(ticker) = self.rest.get_ticker_24hr(&self.state.symbol).await {
            if let Ok(price) = ticker.last_price.parse::<f64>() {
                self.state.previous_price = self.state.real_time_price;
                self.state.real_time_price = Some(price);
            }
            self.state.ticker = Some(ticker);
            self.state.last_update = Some(Utc::now());
        }
    }

    /// Switches the feed to a new symbol: discard-and-reseed, never a
    /// merge. The stream resubscribes in place where the transport allows
    /// it; the snapshot fetch follows the symbol assignment.
    pub async fn change_symbol(&mut self, symbol: &str) {
        if symbol.eq_ignore_ascii_case(&self.state.symbol) {
            return;
        }
        info!("Switching live feed from {} to {}", self.state.symbol, symbol);
        self.state.begin_symbol_switch(symbol);
        self.stream.change_symbol(symbol).await;
        self.refresh().await;
    }

    /// Awaits the next stream message and applies it. Returns `false`
    /// once the stream session has ended and the channel is drained.
    pub async fn process_next(&mut self) -> bool {
        match self.messages.recv().await {
            Some(message) => {
                self.state.handle_message(message);
                true
            }
            None => false,
        }
    }

    /// Applies every message already queued without waiting; returns how
    /// many were handled.
    pub fn drain_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(message) = self.messages.try_recv() {
            self.state.handle_message(message);
            handled += 1;
        }
        handled
    }

    pub fn state(&self) -> &LiveDataState {
        &self.state
    }

    pub fn order_book(&self) -> &OrderBookReplica {
        &self.state.order_book
    }

    pub fn ticker(&self) -> Option<&TickerData> {
        self.state.ticker.as_ref()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.state.status
    }

    pub fn last_error(&self) -> Option<&str> {
        self.state.last_error.as_deref()
    }

    pub fn symbol(&self) -> &str {
        &self.state.symbol
    }

    /// Ends the session without a reconnect attempt.
    pub async fn close(&self) {
        self.stream.close_intentionally().await;
    }
}
