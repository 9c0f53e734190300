//! Push channel: Moonraker JSON-RPC websocket with auto-reconnect.
//!
//! Connects to the host websocket, subscribes to the accessory topic and
//! streams decoded frames through a [`tokio::sync::broadcast`] channel.
//! Reconnects after a fixed delay, forever: the accessory and its host are
//! routinely power-cycled, so connection loss is never treated as fatal.
//!
//! # Example
//!
//! ```rust,ignore
//! use acectl_api::push::{PushHandle, ReconnectConfig};
//! use tokio_util::sync::CancellationToken;
//! use url::Url;
//!
//! let cancel = CancellationToken::new();
//! let ws_url = Url::parse("ws://printer.local:7125/websocket")?;
//!
//! let handle = PushHandle::connect(ws_url, ReconnectConfig::default(), None, cancel.clone());
//! let mut rx = handle.subscribe();
//!
//! while let Ok(event) = rx.recv().await {
//!     println!("{event:?}");
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::{self, ClientRequestBuilder};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Error;
use crate::models::{
    ACCESSORY_TOPIC, JsonRpcFrame, METHOD_GCODE_RESPONSE, METHOD_STATUS_UPDATE, SubscribeRequest,
};
use crate::transport::API_KEY_HEADER;

// ── Broadcast channel capacity ───────────────────────────────────────

const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Request id used for the accessory subscription.
pub const SUBSCRIBE_ID: u64 = 5434;

// ── PushEvent ────────────────────────────────────────────────────────

/// Something that happened on the push channel.
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    /// Socket opened and the subscription request was sent.
    Connected,
    /// Socket closed or failed. Another attempt follows after the delay.
    Disconnected { reason: String },
    /// Partial accessory status (subscription reply or status notification).
    Status(Value),
    /// A firmware console line.
    LogLine(String),
}

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Fixed-delay reconnection policy.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay between a close/error and the next attempt. Default: 3s.
    pub delay: Duration,
    /// Id of the subscribe request.
    pub subscribe_id: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(3),
            subscribe_id: SUBSCRIBE_ID,
        }
    }
}

// ── PushHandle ───────────────────────────────────────────────────────

/// Handle to a running push channel.
///
/// Call [`shutdown`](Self::shutdown) (or cancel the token passed to
/// [`connect`](Self::connect)) to tear down the background task.
pub struct PushHandle {
    event_rx: broadcast::Receiver<Arc<PushEvent>>,
    cancel: CancellationToken,
}

impl PushHandle {
    /// Spawn the connect/read/reconnect loop.
    ///
    /// Returns immediately; the first attempt happens asynchronously.
    /// Events are buffered from the start, so nothing is lost between
    /// this call and the first [`subscribe`](Self::subscribe).
    pub fn connect(
        ws_url: Url,
        reconnect: ReconnectConfig,
        api_key: Option<SecretString>,
        cancel: CancellationToken,
    ) -> Self {
        let (event_tx, event_rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            push_loop(ws_url, event_tx, reconnect, api_key, task_cancel).await;
        });

        Self { event_rx, cancel }
    }

    /// Get a new receiver for the event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<PushEvent>> {
        self.event_rx.resubscribe()
    }

    /// Signal the background task to shut down.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

// ── Background reconnection loop ─────────────────────────────────────

/// Main loop: connect → read → on close or error, wait → reconnect.
async fn push_loop(
    ws_url: Url,
    event_tx: broadcast::Sender<Arc<PushEvent>>,
    reconnect: ReconnectConfig,
    api_key: Option<SecretString>,
    cancel: CancellationToken,
) {
    let mut attempt: u64 = 0;

    loop {
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = connect_and_read(&ws_url, &event_tx, &cancel, &reconnect, api_key.as_ref()) => result,
        };

        if cancel.is_cancelled() {
            break;
        }

        let reason = match result {
            Ok(()) => {
                tracing::info!("push channel closed");
                "connection closed".to_owned()
            }
            Err(e) => {
                tracing::warn!(error = %e, attempt, "push channel error");
                e.to_string()
            }
        };
        let _ = event_tx.send(Arc::new(PushEvent::Disconnected { reason }));

        tracing::debug!(
            delay_ms = u64::try_from(reconnect.delay.as_millis()).unwrap_or(u64::MAX),
            attempt,
            "waiting before reconnect"
        );
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(reconnect.delay) => {}
        }
        attempt += 1;
    }

    tracing::debug!("push loop exiting");
}

// ── Single connection lifecycle ──────────────────────────────────────

/// Open one connection, subscribe, and read frames until it drops.
async fn connect_and_read(
    url: &Url,
    event_tx: &broadcast::Sender<Arc<PushEvent>>,
    cancel: &CancellationToken,
    reconnect: &ReconnectConfig,
    api_key: Option<&SecretString>,
) -> Result<(), Error> {
    tracing::info!(url = %url, "connecting push channel");

    let uri: tungstenite::http::Uri = url
        .as_str()
        .parse()
        .map_err(|e: tungstenite::http::uri::InvalidUri| Error::WebSocketConnect(e.to_string()))?;

    let mut request = ClientRequestBuilder::new(uri);
    if let Some(key) = api_key {
        request = request.with_header(API_KEY_HEADER, key.expose_secret());
    }

    let (ws_stream, _response) = tokio_tungstenite::connect_async(request)
        .await
        .map_err(|e| Error::WebSocketConnect(e.to_string()))?;

    let (mut write, mut read) = ws_stream.split();

    let subscribe = serde_json::to_string(&SubscribeRequest::accessory(reconnect.subscribe_id))
        .map_err(|e| Error::WebSocketConnect(format!("encode subscribe request: {e}")))?;
    write
        .send(tungstenite::Message::text(subscribe))
        .await
        .map_err(|e| Error::WebSocketConnect(e.to_string()))?;

    tracing::info!("push channel connected, subscribed to '{ACCESSORY_TOPIC}'");
    let _ = event_tx.send(Arc::new(PushEvent::Connected));

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(()),
            frame = read.next() => {
                match frame {
                    Some(Ok(tungstenite::Message::Text(text))) => {
                        for event in decode_frame(&text, reconnect.subscribe_id) {
                            let _ = event_tx.send(Arc::new(event));
                        }
                    }
                    Some(Ok(tungstenite::Message::Close(frame))) => {
                        if let Some(ref cf) = frame {
                            tracing::info!(code = %cf.code, reason = %cf.reason, "close frame received");
                        }
                        return Ok(());
                    }
                    Some(Err(e)) => return Err(Error::WebSocketConnect(e.to_string())),
                    None => return Ok(()),
                    Some(Ok(_)) => {
                        // Ping/Pong/Binary -- tungstenite answers pings itself
                    }
                }
            }
        }
    }
}

// ── Frame decoding ───────────────────────────────────────────────────

/// Decode one text frame into zero or more push events.
///
/// Unparseable frames and unrelated notifications are dropped with a
/// debug log; they never tear down the connection.
pub fn decode_frame(text: &str, subscribe_id: u64) -> Vec<PushEvent> {
    let frame: JsonRpcFrame = match serde_json::from_str(text) {
        Ok(f) => f,
        Err(e) => {
            tracing::debug!(error = %e, "failed to parse push frame");
            return Vec::new();
        }
    };

    match frame.method.as_deref() {
        Some(METHOD_STATUS_UPDATE) => first_param(frame.params.as_ref())
            .and_then(|p| p.get(ACCESSORY_TOPIC))
            .filter(|v| v.is_object())
            .map(|v| vec![PushEvent::Status(v.clone())])
            .unwrap_or_default(),
        Some(METHOD_GCODE_RESPONSE) => first_param(frame.params.as_ref())
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(|s| vec![PushEvent::LogLine(s.to_owned())])
            .unwrap_or_default(),
        Some(_) => Vec::new(),
        None => {
            // Reply to our subscribe request carries the initial status.
            let is_ours = frame.id.as_ref().and_then(Value::as_u64) == Some(subscribe_id);
            if !is_ours {
                return Vec::new();
            }
            frame
                .result
                .as_ref()
                .and_then(|r| r.get("status"))
                .and_then(|s| s.get(ACCESSORY_TOPIC))
                .filter(|v| v.is_object())
                .map(|v| vec![PushEvent::Status(v.clone())])
                .unwrap_or_default()
        }
    }
}

fn first_param(params: Option<&Value>) -> Option<&Value> {
    params.and_then(Value::as_array).and_then(|a| a.first())
}

// ── Tests ────────────────────────────────────────────────────────────
