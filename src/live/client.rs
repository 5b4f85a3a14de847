// src/live/client.rs
//! Live push channel client.
//!
//! One instance owns at most one WebSocket connection. After the socket opens
//! it sends a single subscribe frame, then fans every decoded inbound frame
//! out to the registered handlers (registration order) and finally to the
//! handler given to [`LiveChannel::connect`]. A close (for any reason) moves
//! the channel to `Disconnected` and schedules exactly one reconnect after
//! the configured delay; [`LiveChannel::disconnect`] cancels it.
//!
//! Stale tasks are fenced off by a generation counter: every `connect` and
//! every `disconnect` bumps it, and a task only touches shared state while
//! its generation is still current.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use metrics::counter;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{header::AUTHORIZATION, HeaderValue};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::message::{ControlMessage, LiveMessage, DEFAULT_CHANNEL};
use crate::error::ChannelError;
use crate::metrics::ensure_metrics_described;

pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

pub type MessageHandler = Arc<dyn Fn(&LiveMessage) + Send + Sync>;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

/// Identifies one connection attempt; repeated `connect` calls while it is
/// live return the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelState {
    Disconnected,
    Connecting,
    Subscribed,
}

#[derive(Debug, Clone)]
pub struct ChannelConfig {
    pub url: String,
    pub channel: String,
    pub reconnect_delay: Duration,
    pub bearer_token: Option<String>,
}

impl ChannelConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            channel: DEFAULT_CHANNEL.to_string(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            bearer_token: None,
        }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_bearer_token(mut self, token: Option<String>) -> Self {
        self.bearer_token = token.filter(|t| !t.trim().is_empty());
        self
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }
}

#[derive(Clone)]
pub struct LiveChannel {
    inner: Arc<Inner>,
}

struct Inner {
    config: ChannelConfig,
    shared: Mutex<Shared>,
    state_tx: watch::Sender<ChannelState>,
}

struct Shared {
    phase: ChannelState,
    generation: u64,
    outbound: Option<mpsc::UnboundedSender<Message>>,
    conn_task: Option<JoinHandle<()>>,
    reconnect_timer: Option<JoinHandle<()>>,
    handlers: Vec<(HandlerId, MessageHandler)>,
    next_handler: u64,
}

impl LiveChannel {
    pub fn new(config: ChannelConfig) -> Self {
        ensure_metrics_described();
        let (state_tx, _) = watch::channel(ChannelState::Disconnected);
        Self {
            inner: Arc::new(Inner {
                config,
                shared: Mutex::new(Shared {
                    phase: ChannelState::Disconnected,
                    generation: 0,
                    outbound: None,
                    conn_task: None,
                    reconnect_timer: None,
                    handlers: Vec::new(),
                    next_handler: 0,
                }),
                state_tx,
            }),
        }
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.inner.config
    }

    pub fn state(&self) -> ChannelState {
        self.inner.shared.lock().phase
    }

    /// Observe state transitions (for a "live" indicator).
    pub fn watch_state(&self) -> watch::Receiver<ChannelState> {
        self.inner.state_tx.subscribe()
    }

    /// Open the connection unless one is already open or opening.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn connect<F>(&self, on_message: F) -> ConnectionId
    where
        F: Fn(&LiveMessage) + Send + Sync + 'static,
    {
        self.connect_handler(Arc::new(on_message), None)
    }

    /// `expected` is set by the reconnect timer: the attempt only proceeds if
    /// no `connect`/`disconnect` happened since the close that scheduled it.
    /// Checked under the same lock that starts the attempt.
    fn connect_handler(&self, on_message: MessageHandler, expected: Option<u64>) -> ConnectionId {
        let mut shared = self.inner.shared.lock();
        if let Some(generation) = expected {
            if shared.generation != generation {
                return ConnectionId(shared.generation);
            }
            // The caller is the timer itself; release its slot without aborting.
            shared.reconnect_timer = None;
        }
        if shared.phase != ChannelState::Disconnected {
            return ConnectionId(shared.generation);
        }
        if let Some(timer) = shared.reconnect_timer.take() {
            timer.abort();
        }

        shared.generation += 1;
        let generation = shared.generation;
        self.set_state(&mut shared, ChannelState::Connecting);
        debug!(url = %self.inner.config.url, generation, "live channel connecting");

        let channel = self.clone();
        shared.conn_task = Some(tokio::spawn(async move {
            channel.run_connection(generation, on_message).await;
        }));
        ConnectionId(generation)
    }

    /// Cancel any pending reconnect, close the connection, drop all handlers.
    pub fn disconnect(&self) {
        let mut shared = self.inner.shared.lock();
        shared.generation += 1;
        if let Some(timer) = shared.reconnect_timer.take() {
            timer.abort();
        }
        match shared.outbound.take() {
            // The connection task sends the close frame and exits.
            Some(tx) => {
                let _ = tx.send(Message::Close(None));
                shared.conn_task = None;
            }
            None => {
                if let Some(task) = shared.conn_task.take() {
                    task.abort();
                }
            }
        }
        shared.handlers.clear();
        if shared.phase != ChannelState::Disconnected {
            info!("live channel disconnected");
        }
        self.set_state(&mut shared, ChannelState::Disconnected);
    }

    /// Serialize and transmit `message`; only possible while subscribed.
    pub fn send<T>(&self, message: &T) -> Result<(), ChannelError>
    where
        T: Serialize + ?Sized,
    {
        let text = serde_json::to_string(message).map_err(ChannelError::Encode)?;
        let shared = self.inner.shared.lock();
        match (&shared.phase, &shared.outbound) {
            (ChannelState::Subscribed, Some(tx)) => tx
                .send(Message::text(text))
                .map_err(|_| ChannelError::NotConnected),
            _ => {
                warn!("live channel is not connected; outbound message dropped");
                Err(ChannelError::NotConnected)
            }
        }
    }

    pub fn add_handler<F>(&self, handler: F) -> HandlerId
    where
        F: Fn(&LiveMessage) + Send + Sync + 'static,
    {
        let mut shared = self.inner.shared.lock();
        shared.next_handler += 1;
        let id = HandlerId(shared.next_handler);
        shared.handlers.push((id, Arc::new(handler)));
        id
    }

    /// Returns whether a handler was removed; unknown ids are a no-op.
    pub fn remove_handler(&self, id: HandlerId) -> bool {
        let mut shared = self.inner.shared.lock();
        let before = shared.handlers.len();
        shared.handlers.retain(|(h, _)| *h != id);
        shared.handlers.len() != before
    }

    pub fn handler_count(&self) -> usize {
        self.inner.shared.lock().handlers.len()
    }

    fn set_state(&self, shared: &mut Shared, state: ChannelState) {
        shared.phase = state;
        self.inner.state_tx.send_replace(state);
    }

    async fn run_connection(self, generation: u64, on_message: MessageHandler) {
        match self.open().await {
            Ok(ws) => self.drive(generation, ws, &on_message).await,
            Err(e) => {
                debug!(error = %e, url = %self.inner.config.url, "live channel transport error")
            }
        }
        self.handle_close(generation, on_message);
    }

    async fn open(&self) -> Result<WsStream, tungstenite::Error> {
        let mut request = self.inner.config.url.as_str().into_client_request()?;
        if let Some(token) = &self.inner.config.bearer_token {
            match HeaderValue::from_str(&format!("Bearer {token}")) {
                Ok(value) => {
                    request.headers_mut().insert(AUTHORIZATION, value);
                }
                Err(_) => warn!("bearer token is not a valid header value; connecting without it"),
            }
        }
        let (ws, _response) = tokio_tungstenite::connect_async(request).await?;
        Ok(ws)
    }

    async fn drive(&self, generation: u64, ws: WsStream, on_message: &MessageHandler) {
        let (mut sink, mut stream) = ws.split();

        let subscribe = ControlMessage::subscribe(&self.inner.config.channel);
        let frame = match serde_json::to_string(&subscribe) {
            Ok(text) => Message::text(text),
            Err(e) => {
                warn!(error = %e, "could not encode subscribe frame");
                return;
            }
        };
        if let Err(e) = sink.send(frame).await {
            debug!(error = %e, "subscribe send failed");
            return;
        }

        let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
        let current = {
            let mut shared = self.inner.shared.lock();
            if shared.generation == generation {
                shared.outbound = Some(tx);
                self.set_state(&mut shared, ChannelState::Subscribed);
                true
            } else {
                false
            }
        };
        if !current {
            let _ = sink.close().await;
            return;
        }

        counter!("live_connections_total").increment(1);
        info!(
            url = %self.inner.config.url,
            channel = %self.inner.config.channel,
            "live channel subscribed"
        );

        loop {
            tokio::select! {
                outbound = rx.recv() => {
                    let Some(msg) = outbound else { break };
                    let closing = matches!(msg, Message::Close(_));
                    if let Err(e) = sink.send(msg).await {
                        debug!(error = %e, "live channel send failed");
                        break;
                    }
                    if closing {
                        break;
                    }
                }
                inbound = stream.next() => match inbound {
                    Some(Ok(Message::Text(text))) => self.dispatch(text.as_str(), on_message),
                    Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                        Ok(text) => self.dispatch(text, on_message),
                        Err(_) => reject_frame(&ChannelError::MalformedFrame(
                            "binary frame is not UTF-8".into(),
                        )),
                    },
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!(error = %e, "live channel transport error");
                        break;
                    }
                },
            }
        }
    }

    /// Decode and fan out one frame. Handlers run on a snapshot of the
    /// registry, so they may add or remove handlers (themselves included).
    fn dispatch(&self, text: &str, on_message: &MessageHandler) {
        counter!("live_frames_total").increment(1);
        let msg = match LiveMessage::parse(text) {
            Ok(msg) => msg,
            Err(e) => {
                reject_frame(&e);
                return;
            }
        };

        let handlers: Vec<MessageHandler> = {
            let shared = self.inner.shared.lock();
            shared.handlers.iter().map(|(_, h)| Arc::clone(h)).collect()
        };
        for handler in &handlers {
            handler(&msg);
        }
        on_message(&msg);
    }

    fn handle_close(&self, generation: u64, on_message: MessageHandler) {
        let mut shared = self.inner.shared.lock();
        if shared.generation != generation {
            return;
        }
        shared.outbound = None;
        shared.conn_task = None;
        self.set_state(&mut shared, ChannelState::Disconnected);

        let delay = self.inner.config.reconnect_delay;
        counter!("live_reconnects_scheduled_total").increment(1);
        debug!(delay_ms = delay.as_millis() as u64, "live channel closed; reconnect scheduled");

        let channel = self.clone();
        shared.reconnect_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            channel.connect_handler(on_message, Some(generation));
        }));
    }
}

fn reject_frame(err: &ChannelError) {
    counter!("live_malformed_frames_total").increment(1);
    warn!(error = %err, "dropping live frame");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> LiveChannel {
        LiveChannel::new(ChannelConfig::new("ws://127.0.0.1:9/ws"))
    }

    #[test]
    fn send_without_connection_reports_not_connected() {
        let ch = channel();
        let err = ch
            .send(&ControlMessage::subscribe("politics"))
            .unwrap_err();
        assert!(matches!(err, ChannelError::NotConnected));
    }

    #[test]
    fn removing_unknown_handler_is_noop() {
        let ch = channel();
        let id = ch.add_handler(|_| {});
        assert!(ch.remove_handler(id));
        assert!(!ch.remove_handler(id));
        assert_eq!(ch.handler_count(), 0);
    }

    #[test]
    fn disconnect_is_idempotent_and_clears_handlers() {
        let ch = channel();
        ch.add_handler(|_| {});
        ch.add_handler(|_| {});
        ch.disconnect();
        ch.disconnect();
        assert_eq!(ch.handler_count(), 0);
        assert_eq!(ch.state(), ChannelState::Disconnected);
    }

    #[test]
    fn stale_reconnect_after_disconnect_does_nothing() {
        let ch = channel();
        let scheduled_at = ch.inner.shared.lock().generation;
        // A disconnect lands between the timer firing and the attempt.
        ch.disconnect();
        let id = ch.connect_handler(Arc::new(|_: &LiveMessage| {}), Some(scheduled_at));
        assert_eq!(id, ConnectionId(scheduled_at + 1));
        assert_eq!(ch.state(), ChannelState::Disconnected);
        assert!(ch.inner.shared.lock().conn_task.is_none());
    }

    #[test]
    fn empty_bearer_token_is_dropped() {
        let cfg = ChannelConfig::new("ws://x").with_bearer_token(Some("  ".into()));
        assert!(cfg.bearer_token.is_none());
    }
}
