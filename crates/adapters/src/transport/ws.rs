// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket transport client

use super::{Dialer, FrameKind, TransportClient, TransportError};
use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{sleep_until, timeout, Instant};
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async_with_config, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connection limits and timeouts
#[derive(Debug, Clone)]
pub struct WsConfig {
    /// Bound on the opening handshake
    pub handshake_timeout: Duration,
    /// Bound on each control write (ping, close)
    pub write_timeout: Duration,
    /// Largest inbound message accepted from the producer
    pub max_frame_size: usize,
    /// How often to probe the producer with a ping
    pub ping_interval: Duration,
    /// How long the connection may stay silent before it is considered dead
    pub pong_wait: Duration,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            handshake_timeout: Duration::from_secs(10),
            write_timeout: Duration::from_secs(10),
            max_frame_size: 16 * 1024,
            ping_interval: Duration::from_secs(15),
            pong_wait: Duration::from_secs(30),
        }
    }
}

impl WsConfig {
    fn websocket_config(&self) -> WebSocketConfig {
        let mut config = WebSocketConfig::default();
        config.max_message_size = Some(self.max_frame_size);
        config.max_frame_size = Some(self.max_frame_size);
        config
    }
}

/// Creates [`WsClient`]s sharing one configuration
#[derive(Debug, Clone, Default)]
pub struct WsDialer {
    config: WsConfig,
}

impl WsDialer {
    pub fn new(config: WsConfig) -> Self {
        Self { config }
    }
}

impl Dialer for WsDialer {
    type Client = WsClient;

    fn client(&self) -> WsClient {
        WsClient::new(self.config.clone())
    }
}

/// Single-use WebSocket client
pub struct WsClient {
    config: WsConfig,
    connected: AtomicBool,
    stream: Mutex<Option<SplitStream<WsStream>>>,
    sink: tokio::sync::Mutex<Option<SplitSink<WsStream, Message>>>,
    shutdown: CancellationToken,
}

impl WsClient {
    pub fn new(config: WsConfig) -> Self {
        Self {
            config,
            connected: AtomicBool::new(false),
            stream: Mutex::new(None),
            sink: tokio::sync::Mutex::new(None),
            shutdown: CancellationToken::new(),
        }
    }

    async fn ping(&self) -> Result<(), TransportError> {
        let mut sink = self.sink.lock().await;
        let Some(sink) = sink.as_mut() else {
            return Err(TransportError::Cancelled);
        };
        match timeout(self.config.write_timeout, sink.send(Message::Ping(Default::default()))).await
        {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(TransportError::Read(format!("ping: {e}"))),
            Err(_) => Err(TransportError::Read("ping: write timeout".into())),
        }
    }
}

impl std::fmt::Debug for WsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsClient")
            .field("connected", &self.connected.load(Ordering::SeqCst))
            .field("closed", &self.shutdown.is_cancelled())
            .finish()
    }
}

#[async_trait]
impl TransportClient for WsClient {
    async fn dial(&self, url: &str) -> Result<(), TransportError> {
        if self.connected.load(Ordering::SeqCst) {
            return Err(TransportError::AlreadyConnected);
        }
        if self.shutdown.is_cancelled() {
            return Err(TransportError::Cancelled);
        }

        let handshake = timeout(
            self.config.handshake_timeout,
            connect_async_with_config(url, Some(self.config.websocket_config()), false),
        );
        let ws = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => return Err(TransportError::Cancelled),
            result = handshake => match result {
                Ok(Ok((ws, _response))) => ws,
                Ok(Err(e)) => return Err(TransportError::Dial(e.to_string())),
                Err(_) => return Err(TransportError::Dial("handshake timeout".into())),
            },
        };

        let (sink, stream) = ws.split();
        *self.sink.lock().await = Some(sink);
        *self.stream.lock().unwrap_or_else(|e| e.into_inner()) = Some(stream);
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn read(
        &self,
        on_frame: &mut (dyn for<'a> FnMut(FrameKind, &'a [u8]) + Send),
    ) -> TransportError {
        let taken = self.stream.lock().unwrap_or_else(|e| e.into_inner()).take();
        let Some(mut stream) = taken else {
            if self.connected.load(Ordering::SeqCst) {
                return TransportError::Read("stream already consumed".into());
            }
            return TransportError::NilConnection;
        };

        let ping_interval = self.config.ping_interval;
        let mut next_ping = Instant::now() + ping_interval;
        let mut last_seen = Instant::now();

        loop {
            let deadline = last_seen + self.config.pong_wait;
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => return TransportError::Cancelled,
                _ = sleep_until(deadline) => {
                    return TransportError::Read("producer went silent".into());
                }
                _ = sleep_until(next_ping) => {
                    next_ping = Instant::now() + ping_interval;
                    if let Err(e) = self.ping().await {
                        return e;
                    }
                }
                message = stream.next() => {
                    let message = match message {
                        Some(Ok(message)) => message,
                        Some(Err(e)) => return TransportError::Read(e.to_string()),
                        None => return TransportError::Read("connection closed".into()),
                    };
                    last_seen = Instant::now();
                    match message {
                        Message::Text(text) => on_frame(FrameKind::Text, text.as_str().as_bytes()),
                        Message::Binary(data) => on_frame(FrameKind::Binary, &data[..]),
                        Message::Close(frame) => {
                            let reason = frame
                                .map(|f| format!("{} {}", u16::from(f.code), f.reason.as_str()))
                                .unwrap_or_else(|| "no close frame".into());
                            return TransportError::Read(format!("remote closed: {reason}"));
                        }
                        // Control frames never reach the record layer
                        Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
                    }
                }
            }
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.shutdown.cancel();

        let Some(mut sink) = self.sink.lock().await.take() else {
            // Already closed once
            if self.connected.load(Ordering::SeqCst) {
                return Ok(());
            }
            return Err(TransportError::NilConnection);
        };
        match timeout(self.config.write_timeout, sink.close()).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(TransportError::Close(e.to_string())),
            Err(_) => Err(TransportError::Close("write timeout".into())),
        }
    }
}

#[cfg(test)]
#[path = "ws_tests.rs"]
mod tests;
