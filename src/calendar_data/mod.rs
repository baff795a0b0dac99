// src/calendar_data/mod.rs

//! Reactive handle over the calendar metrics series: paginated kline
//! history builds the baseline, the daily kline stream patches the newest
//! bucket in place, and aggregated weekly/monthly views are derived on
//! demand.

use chrono::{DateTime, Utc};
use log::{debug, info};
use tokio::sync::mpsc;

use crate::calendar::{self, Timeframe, patch_latest_bucket};
use crate::config::ApiConfig;
use crate::market_data::{
    FinancialMetrics, KlineInterval, date_key_for, fetch_kline_history, to_financial_metrics,
};
use crate::rest_api::RestClient;
use crate::websocket::{KlineEvent, MarketEvent};
use crate::websocket_stream::{ConnectionStatus, StreamHandle, StreamMessage};

/// Mutable state of a calendar feed, separated from the transport so the
/// patch-in path can be exercised without a socket.
#[derive(Debug)]
pub struct CalendarState {
    pub symbol: String,
    pub interval: KlineInterval,
    pub data: Vec<FinancialMetrics>,
    pub status: ConnectionStatus,
    pub loading: bool,
    pub last_error: Option<String>,
    pub last_update: Option<DateTime<Utc>>,
}

impl CalendarState {
    pub fn new(symbol: &str, interval: KlineInterval) -> Self {
        Self {
            symbol: symbol.to_uppercase(),
            interval,
            data: Vec::new(),
            status: ConnectionStatus::Disconnected,
            loading: true,
            last_error: None,
            last_update: None,
        }
    }

    /// Applies one stream message. Kline updates patch the matching
    /// bucket in place; updates for buckets not in the series, or tagged
    /// with a stale symbol after a switch, are ignored.
    pub fn handle_message(&mut self, message: StreamMessage) {
        match message {
            StreamMessage::Status(status) => {
                self.status = status;
            }
            StreamMessage::Event(MarketEvent::Kline(event)) => {
                if !event.symbol.eq_ignore_ascii_case(&self.symbol) {
                    debug!(
                        "Discarding stale kline for {} while subscribed to {}",
                        event.symbol, self.symbol
                    );
                    return;
                }
                if self.apply_kline(&event) {
                    self.last_update = Some(Utc::now());
                }
            }
            StreamMessage::Event(_) => {
                // This feed only subscribes to klines.
            }
        }
    }

    // Recomputes the bucket from the event's raw OHLCV and replaces the
    // entry with the exact matching date key. The stream carries daily
    // candles, so only a daily-keyed series ever matches. Idempotent:
    // re-applying the same update yields the same series.
    fn apply_kline(&mut self, event: &KlineEvent) -> bool {
        let k = &event.kline;
        let key = date_key_for(k.open_time, KlineInterval::D1);
        let updated = FinancialMetrics::new(
            key,
            k.open.parse().unwrap_or(0.0),
            k.high.parse().unwrap_or(0.0),
            k.low.parse().unwrap_or(0.0),
            k.close.parse().unwrap_or(0.0),
            k.volume.parse().unwrap_or(0.0),
        );
        patch_latest_bucket(&mut self.data, updated)
    }
}

/// Calendar series session for one symbol at a time.
pub struct CalendarFeed {
    rest: RestClient,
    stream: StreamHandle,
    messages: mpsc::Receiver<StreamMessage>,
    state: CalendarState,
    target_count: usize,
}

impl CalendarFeed {
    /// Opens a combined-stream kline session and fetches the historical
    /// baseline (paginating past the per-call cap as needed).
    pub async fn connect(
        config: &ApiConfig,
        symbol: &str,
        interval: KlineInterval,
        target_count: usize,
    ) -> Self {
        let (message_tx, message_rx) = mpsc::channel::<StreamMessage>(64);
        let stream = StreamHandle::open_kline(config, symbol, message_tx);
        let mut feed = Self {
            rest: RestClient::new(config),
            stream,
            messages: message_rx,
            state: CalendarState::new(symbol, interval),
            target_count,
        };
        feed.refresh().await;
        feed
    }

    /// Rebuilds the series wholesale from kline history. Safe to invoke
    /// repeatedly.
    pub async fn refresh(&mut self) {
        self.state.loading = true;
        self.state.last_error = None;

        let symbol = self.state.symbol.clone();
        match fetch_kline_history(&self.rest, &symbol, self.state.interval, self.target_count)
            .await
        {
            Ok(klines) => {
                self.state.data = to_financial_metrics(&klines, self.state.interval);
                self.state.loading = false;
                self.state.status = ConnectionStatus::Connected;
                self.state.last_update = Some(Utc::now());
            }
            Err(e) => {
                self.state.loading = false;
                self.state.status = ConnectionStatus::Error;
                self.state.last_error = Some(e.to_string());
            }
        }
    }

    /// Switches the feed to a new symbol, rebuilding the series for it.
    pub async fn change_symbol(&mut self, symbol: &str) {
        if symbol.eq_ignore_ascii_case(&self.state.symbol) {
            return;
        }
        info!(
            "Switching calendar feed from {} to {}",
            self.state.symbol, symbol
        );
        self.state.symbol = symbol.to_uppercase();
        self.state.status = ConnectionStatus::Connecting;
        self.stream.change_symbol(symbol).await;
        self.refresh().await;
    }

    /// The series grouped at the requested resolution; daily returns the
    /// raw series.
    pub fn aggregated(&self, timeframe: Timeframe) -> Vec<FinancialMetrics> {
        calendar::aggregate(&self.state.data, timeframe)
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

    pub fn state(&self) -> &CalendarState {
        &self.state
    }

    pub fn data(&self) -> &[FinancialMetrics] {
        &self.state.data
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
