// src/websocket_stream/mod.rs

//! This module provides the session object for the exchange's public
//! WebSocket market data streams. A `StreamHandle` owns one connection
//! managed by a spawned listener task: it subscribes for the current
//! symbol, forwards parsed events and status changes to the consumer,
//! switches symbols in place where the transport allows it, and schedules
//! a single fixed-delay reconnect attempt after an unintentional close.

use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};

use crate::config::ApiConfig;
use crate::websocket::MarketEvent;

/// Stream channels a session subscribes to for one symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamChannel {
    /// Order book diffs at 100ms cadence.
    Depth100ms,
    /// 24-hour rolling ticker statistics.
    Ticker,
    /// Daily kline updates.
    KlineDaily,
}

impl StreamChannel {
    /// Channel name for the subscribe protocol, e.g. `btcusdt@depth@100ms`.
    pub fn stream_name(&self, symbol: &str) -> String {
        let suffix = match self {
            StreamChannel::Depth100ms => "depth@100ms",
            StreamChannel::Ticker => "ticker",
            StreamChannel::KlineDaily => "kline_1d",
        };
        format!("{}@{}", symbol.to_lowercase(), suffix)
    }
}

/// Connection state of a data handle, distinguishable from "no data yet".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Disconnected,
    Error,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Error => "error",
        };
        f.write_str(label)
    }
}

/// What the listener task delivers to the consumer: parsed events
/// interleaved with connection status changes on one channel, so the
/// consumer sees them in the order they happened.
#[derive(Debug, Clone)]
pub enum StreamMessage {
    Status(ConnectionStatus),
    Event(MarketEvent),
}

enum StreamCommand {
    ChangeSymbol(String),
    Close,
}

enum Transport {
    /// Combined endpoint (`/ws/stream`) driven by SUBSCRIBE/UNSUBSCRIBE
    /// control frames; symbol switches happen without tearing the socket
    /// down.
    Combined { channels: Vec<StreamChannel> },
    /// Single-stream depth endpoint (`/ws/<symbol>@depth@100ms`); the
    /// channel is part of the URL, so a symbol switch closes and reopens.
    RawDepth,
}

/// Handle to one live stream session.
///
/// Dropping the handle closes the consumer command channel, which the
/// listener treats as an intentional close.
pub struct StreamHandle {
    command_tx: mpsc::Sender<StreamCommand>,
    _listener_handle: JoinHandle<()>,
}

impl StreamHandle {
    /// Opens a combined-stream session subscribed to `channels` for
    /// `symbol`.
    pub fn open_combined(
        config: &ApiConfig,
        symbol: &str,
        channels: Vec<StreamChannel>,
        events: mpsc::Sender<StreamMessage>,
    ) -> Self {
        Self::spawn(config, symbol, Transport::Combined { channels }, events)
    }

    /// Opens a combined-stream session carrying only daily kline updates
    /// for `symbol`.
    pub fn open_kline(
        config: &ApiConfig,
        symbol: &str,
        events: mpsc::Sender<StreamMessage>,
    ) -> Self {
        Self::open_combined(config, symbol, vec![StreamChannel::KlineDaily], events)
    }

    /// Opens a raw single-stream depth session for `symbol`.
    pub fn open_raw_depth(
        config: &ApiConfig,
        symbol: &str,
        events: mpsc::Sender<StreamMessage>,
    ) -> Self {
        Self::spawn(config, symbol, Transport::RawDepth, events)
    }

    fn spawn(
        config: &ApiConfig,
        symbol: &str,
        transport: Transport,
        events: mpsc::Sender<StreamMessage>,
    ) -> Self {
        let (command_tx, command_rx) = mpsc::channel::<StreamCommand>(16);
        let ws_base_url = config.ws_base_url.clone();
        let reconnect_delay = config.reconnect_delay;
        let symbol = symbol.to_lowercase();

        let listener_handle = tokio::spawn(async move {
            run_stream_listener(
                ws_base_url,
                symbol,
                transport,
                reconnect_delay,
                command_rx,
                events,
            )
            .await;
        });

        Self {
            command_tx,
            _listener_handle: listener_handle,
        }
    }

    /// Switches the subscription to `symbol`. On the combined transport
    /// this unsubscribes the old channels and subscribes the new ones over
    /// the live socket; the raw transport closes and reopens.
    pub async fn change_symbol(&self, symbol: &str) {
        let _ = self
            .command_tx
            .send(StreamCommand::ChangeSymbol(symbol.to_string()))
            .await;
    }

    /// Closes the session and suppresses the reconnect attempt.
    pub async fn close_intentionally(&self) {
        let _ = self.command_tx.send(StreamCommand::Close).await;
    }
}

// Ids for subscribe/unsubscribe control frames.
fn next_request_id() -> u64 {
    static NEXT_ID: AtomicU64 = AtomicU64::new(1);
    NEXT_ID.fetch_add(1, Ordering::SeqCst)
}

async fn run_stream_listener(
    ws_base_url: String,
    mut symbol: String,
    transport: Transport,
    reconnect_delay: Duration,
    mut command_rx: mpsc::Receiver<StreamCommand>,
    events: mpsc::Sender<StreamMessage>,
) {
    loop {
        let url = match &transport {
            Transport::Combined { .. } => format!("{}/ws/stream", ws_base_url),
            Transport::RawDepth => format!("{}/ws/{}@depth@100ms", ws_base_url, symbol),
        };

        let _ = events.send(StreamMessage::Status(ConnectionStatus::Connecting)).await;
        info!("Connecting to market stream at {}", url);

        let ws_stream = match connect_async(&url).await {
            Ok((ws_stream, _)) => ws_stream,
            Err(e) => {
                error!(
                    "Failed to connect to market stream: {}. Retrying in {:?}...",
                    e, reconnect_delay
                );
                let _ = events.send(StreamMessage::Status(ConnectionStatus::Error)).await;
                tokio::time::sleep(reconnect_delay).await;
                continue;
            }
        };
        info!("Market stream connection established.");

        let (mut write, mut read) = ws_stream.split();

        if let Transport::Combined { channels } = &transport {
            let params: Vec<String> = channels.iter().map(|c| c.stream_name(&symbol)).collect();
            let payload = json!({
                "method": "SUBSCRIBE",
                "params": params,
                "id": next_request_id(),
            })
            .to_string();
            debug!("Sending stream subscribe: {}", payload);
            if let Err(e) = write.send(Message::Text(payload.into())).await {
                error!("Failed to send subscribe frame: {}", e);
                let _ = events.send(StreamMessage::Status(ConnectionStatus::Error)).await;
                tokio::time::sleep(reconnect_delay).await;
                continue;
            }
        }

        let _ = events.send(StreamMessage::Status(ConnectionStatus::Connected)).await;

        let mut intentional_close = false;
        let mut switch_reopen = false;

        loop {
            tokio::select! {
                cmd = command_rx.recv() => {
                    match cmd {
                        Some(StreamCommand::ChangeSymbol(new_symbol)) => {
                            let new_symbol = new_symbol.to_lowercase();
                            if new_symbol == symbol {
                                continue;
                            }
                            match &transport {
                                Transport::Combined { channels } => {
                                    let old: Vec<String> = channels.iter().map(|c| c.stream_name(&symbol)).collect();
                                    let new: Vec<String> = channels.iter().map(|c| c.stream_name(&new_symbol)).collect();
                                    let unsubscribe = json!({
                                        "method": "UNSUBSCRIBE",
                                        "params": old,
                                        "id": next_request_id(),
                                    })
                                    .to_string();
                                    let subscribe = json!({
                                        "method": "SUBSCRIBE",
                                        "params": new,
                                        "id": next_request_id(),
                                    })
                                    .to_string();
                                    debug!("Switching stream subscription to {}", new_symbol);
                                    let sent = write.send(Message::Text(unsubscribe.into())).await;
                                    let sent = match sent {
                                        Ok(()) => write.send(Message::Text(subscribe.into())).await,
                                        Err(e) => Err(e),
                                    };
                                    symbol = new_symbol;
                                    if let Err(e) = sent {
                                        error!("Failed to switch subscription: {}", e);
                                        break;
                                    }
                                }
                                Transport::RawDepth => {
                                    // Channel name lives in the URL; reopen with the new one.
                                    symbol = new_symbol;
                                    switch_reopen = true;
                                    break;
                                }
                            }
                        }
                        Some(StreamCommand::Close) | None => {
                            intentional_close = true;
                            let _ = write.send(Message::Close(None)).await;
                            break;
                        }
                    }
                },
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            match serde_json::from_str::<Value>(&text) {
                                Ok(value) => {
                                    // Combined envelopes wrap the payload in {stream, data};
                                    // raw frames are the payload itself.
                                    let payload = value.get("data").unwrap_or(&value);
                                    if let Some(event) = MarketEvent::from_value(payload) {
                                        if events.send(StreamMessage::Event(event)).await.is_err() {
                                            info!("Stream consumer dropped. Closing session.");
                                            intentional_close = true;
                                            break;
                                        }
                                    } else {
                                        // Subscription acks and unknown event types.
                                        debug!("Ignoring non-event stream frame: {}", text);
                                    }
                                }
                                Err(e) => {
                                    debug!("Dropping malformed stream frame: {}", e);
                                }
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            debug!("Received stream Ping: {:?}", data);
                            // tokio-tungstenite automatically sends Pong for Ping
                        }
                        Some(Ok(Message::Pong(data))) => {
                            debug!("Received stream Pong: {:?}", data);
                        }
                        Some(Ok(Message::Binary(_))) | Some(Ok(Message::Frame(_))) => {
                            debug!("Received non-text stream message (ignored)");
                        }
                        Some(Ok(Message::Close(close_frame))) => {
                            info!("Market stream closed by server: {:?}", close_frame);
                            break;
                        }
                        Some(Err(e)) => {
                            error!("Market stream read error: {}", e);
                            let _ = events.send(StreamMessage::Status(ConnectionStatus::Error)).await;
                            break;
                        }
                        None => {
                            info!("Market stream ended.");
                            break;
                        }
                    }
                }
            }
        }

        let _ = events.send(StreamMessage::Status(ConnectionStatus::Disconnected)).await;

        if intentional_close {
            info!("Market stream session closed intentionally.");
            return;
        }
        if switch_reopen {
            // Not a drop: reopen immediately against the new symbol's URL.
            continue;
        }

        warn!(
            "Market stream dropped. Scheduling reconnect in {:?} for {}",
            reconnect_delay, symbol
        );
        tokio::time::sleep(reconnect_delay).await;
        // The loop reconnects and resubscribes for the *current* symbol,
        // which may differ from the one at original open time.
    }
}
