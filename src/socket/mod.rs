//! Reconnecting WebSocket client
//!
//! One physical connection to the dashboard server's `/ws` endpoint. Topic
//! subscriptions (project or session) are multiplexed over it. The client
//! never gives up: every close, error or failed handshake flips the status to
//! disconnected and schedules exactly one reconnect after a fixed delay.
//!
//! Nothing here surfaces errors to callers. Listeners only ever see
//! `SocketEvent::Status` and parsed inbound messages.

use crate::events::{ClientMessage, ServerMessage, SocketEvent};
use crate::listeners::{ListenerRegistry, Subscription};
use crate::timer::ReplaceableTimer;
use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use reqwest::Url;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// Delay before reconnecting after a close
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(2000);

/// Connection lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Derive the socket endpoint from the dashboard's HTTP base URL
///
/// `http://host:port/anything` becomes `ws://host:port/ws`, https maps to wss.
pub fn socket_url(base: &str) -> Result<String> {
    let mut url = Url::parse(base).with_context(|| format!("Invalid server URL '{}'", base))?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => anyhow::bail!("Unsupported server URL scheme '{}' in '{}'", other, base),
    };
    url.set_scheme(scheme)
        .map_err(|_| anyhow::anyhow!("Cannot derive socket URL from '{}'", base))?;
    url.set_path("/ws");
    url.set_query(None);
    url.set_fragment(None);
    Ok(url.to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────────────────────────

struct Inner {
    url: String,
    reconnect_delay: Duration,
    state: Mutex<ConnectionState>,
    /// Feeds the live session's writer; `None` while not connected
    outbound: Mutex<Option<mpsc::UnboundedSender<Message>>>,
    listeners: ListenerRegistry<SocketEvent>,
    reconnect: ReplaceableTimer,
    shutdown: watch::Sender<bool>,
}

/// Handle to the shared socket connection. Clones share one connection.
#[derive(Clone)]
pub struct SocketClient {
    inner: Arc<Inner>,
}

impl SocketClient {
    /// Client for an explicit `ws://` / `wss://` endpoint
    pub fn new(url: impl Into<String>, reconnect_delay: Duration) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                url: url.into(),
                reconnect_delay,
                state: Mutex::new(ConnectionState::Disconnected),
                outbound: Mutex::new(None),
                listeners: ListenerRegistry::new("socket"),
                reconnect: ReplaceableTimer::new(),
                shutdown,
            }),
        }
    }

    /// Client for the `/ws` endpoint of a dashboard server
    pub fn for_server(base: &str, reconnect_delay: Duration) -> Result<Self> {
        Ok(Self::new(socket_url(base)?, reconnect_delay))
    }

    pub fn url(&self) -> &str {
        &self.inner.url
    }

    pub fn state(&self) -> ConnectionState {
        *lock(&self.inner.state)
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Open the connection unless one is already open or opening
    pub fn connect(&self) {
        connect(&self.inner);
    }

    /// Register a listener for status changes and inbound messages
    pub fn on_event(&self, f: impl Fn(&SocketEvent) + Send + Sync + 'static) -> Subscription {
        self.inner.listeners.register(f)
    }

    /// Returns false (and sends nothing) unless connected
    pub fn subscribe_project(&self, project_id: &str) -> bool {
        self.send(ClientMessage::SubscribeProject {
            project_id: project_id.to_string(),
        })
    }

    pub fn subscribe_session(&self, session_id: &str) -> bool {
        self.send(ClientMessage::SubscribeSession {
            session_id: session_id.to_string(),
        })
    }

    pub fn unsubscribe(&self, session_id: &str) -> bool {
        self.send(ClientMessage::Unsubscribe {
            session_id: session_id.to_string(),
        })
    }

    /// Close the live session and stop reconnecting
    pub fn shutdown(&self) {
        tracing::debug!("Socket client shutting down");
        self.inner.shutdown.send_replace(true);
        self.inner.reconnect.cancel();
    }

    fn send(&self, message: ClientMessage) -> bool {
        if !self.is_connected() {
            tracing::debug!("Dropping {:?}: socket not connected", message);
            return false;
        }
        let frame = match message.to_frame() {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!("Failed to encode {:?}: {}", message, e);
                return false;
            }
        };
        match lock(&self.inner.outbound).as_ref() {
            Some(tx) => tx.send(Message::Text(frame)).is_ok(),
            None => false,
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

fn connect(inner: &Arc<Inner>) {
    if *inner.shutdown.borrow() {
        return;
    }
    {
        let mut state = lock(&inner.state);
        if *state != ConnectionState::Disconnected {
            tracing::trace!("connect() ignored, socket is {:?}", *state);
            return;
        }
        *state = ConnectionState::Connecting;
    }
    tracing::debug!("Connecting to {}", inner.url);
    tokio::spawn(run_session(inner.clone()));
}

async fn stopped(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}

/// One connection attempt, from handshake to close
async fn run_session(inner: Arc<Inner>) {
    let mut shutdown = inner.shutdown.subscribe();

    let handshake = tokio::select! {
        result = connect_async(inner.url.as_str()) => result,
        _ = stopped(&mut shutdown) => {
            *lock(&inner.state) = ConnectionState::Disconnected;
            return;
        }
    };

    let ws = match handshake {
        Ok((ws, _response)) => ws,
        Err(e) => {
            tracing::debug!("Socket connect to {} failed: {}", inner.url, e);
            on_closed(&inner);
            return;
        }
    };

    let (mut sink, mut stream) = ws.split();
    let (tx, mut rx) = mpsc::unbounded_channel();
    *lock(&inner.outbound) = Some(tx);
    *lock(&inner.state) = ConnectionState::Connected;
    tracing::info!("Socket connected to {}", inner.url);
    inner.listeners.emit(&SocketEvent::Status { connected: true });

    loop {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => dispatch_text(&inner, &text),
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!("Socket read error: {}", e);
                    break;
                }
            },
            Some(frame) = rx.recv() => {
                if let Err(e) = sink.send(frame).await {
                    tracing::debug!("Socket write error: {}", e);
                    break;
                }
            }
            _ = stopped(&mut shutdown) => {
                let _ = sink.send(Message::Close(None)).await;
                break;
            }
        }
    }

    lock(&inner.outbound).take();
    on_closed(&inner);
}

fn dispatch_text(inner: &Inner, text: &str) {
    match ServerMessage::parse(text) {
        Ok(message) => inner.listeners.emit(&SocketEvent::Message(message)),
        Err(e) => tracing::debug!("Ignoring malformed socket frame: {}", e),
    }
}

/// Disconnected: tell listeners, then queue a single reconnect
fn on_closed(inner: &Arc<Inner>) {
    *lock(&inner.state) = ConnectionState::Disconnected;
    inner.listeners.emit(&SocketEvent::Status { connected: false });

    if *inner.shutdown.borrow() {
        return;
    }
    tracing::debug!("Socket closed, reconnecting in {:?}", inner.reconnect_delay);
    let weak = Arc::downgrade(inner);
    inner.reconnect.schedule(inner.reconnect_delay, move || async move {
        if let Some(inner) = weak.upgrade() {
            connect(&inner);
        }
    });
}
