//! Channel manager. Owns the single WebSocket connection to the peer.
//!
//! One background task runs the transport. It multiplexes outbound frames,
//! inbound frames and the shutdown signal with `tokio::select!`, and reports
//! everything it sees to the owner as an ordered stream of [`ChannelEvent`]s.
//! The owner drains that stream from one place, so no two handlers ever run
//! at the same time.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

/// How long `close()` waits for the transport task before aborting it.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

// ---------------------------------------------------------------------------
// Status, events, errors
// ---------------------------------------------------------------------------

/// Lifecycle of the underlying connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Open,
    Closing,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Disconnected => write!(f, "disconnected"),
            ConnectionStatus::Connecting => write!(f, "connecting"),
            ConnectionStatus::Open => write!(f, "open"),
            ConnectionStatus::Closing => write!(f, "closing"),
        }
    }
}

/// Transport-level failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    #[error("channel is not connected")]
    NotConnected,

    #[error("connect timed out after {0:?}")]
    Timeout(Duration),

    #[error("connect failed: {0}")]
    Connect(String),

    #[error("transport error: {0}")]
    Transport(String),
}

/// Something the transport observed, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// Handshake completed; the channel accepts sends.
    Opened,
    /// One text frame from the peer, unparsed.
    Message(String),
    /// The peer closed the connection.
    Closed { reason: Option<String> },
    /// The connection failed or dropped. Status is already `Disconnected`.
    Error(ChannelError),
}

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

/// Manages exactly one connection to a fixed endpoint.
///
/// The manager never reconnects on its own; see
/// [`ReconnectPolicy`](crate::session::ReconnectPolicy) for that.
pub struct Channel {
    url: String,
    connect_timeout: Duration,
    event_capacity: usize,
    status: Arc<watch::Sender<ConnectionStatus>>,
    // Per-connection handles, replaced on every `open()`.
    events: Option<mpsc::Receiver<ChannelEvent>>,
    outbound: Option<mpsc::UnboundedSender<String>>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl Channel {
    pub fn new(url: impl Into<String>, connect_timeout: Duration) -> Self {
        let (status, _) = watch::channel(ConnectionStatus::Disconnected);
        Self {
            url: url.into(),
            connect_timeout,
            event_capacity: 64,
            status: Arc::new(status),
            events: None,
            outbound: None,
            shutdown: None,
            task: None,
        }
    }

    /// Capacity of the inbound event queue. Values below 1 are clamped to 1.
    #[must_use]
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    /// Observe status transitions.
    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.subscribe()
    }

    /// Start a connection attempt and return immediately.
    ///
    /// Does nothing while a connection is already connecting or open. The
    /// outcome arrives later as [`ChannelEvent::Opened`] or
    /// [`ChannelEvent::Error`]. Must be called inside a Tokio runtime.
    pub fn open(&mut self) {
        let current = self.status();
        if current != ConnectionStatus::Disconnected {
            debug!(url = %self.url, status = %current, "open ignored");
            return;
        }

        // Leftovers from a connection that dropped on its own.
        self.release();

        self.status.send_replace(ConnectionStatus::Connecting);
        let (event_tx, event_rx) = mpsc::channel(self.event_capacity);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        self.task = Some(tokio::spawn(run_transport(
            self.url.clone(),
            self.connect_timeout,
            Arc::clone(&self.status),
            event_tx,
            outbound_rx,
            shutdown_rx,
        )));
        self.events = Some(event_rx);
        self.outbound = Some(outbound_tx);
        self.shutdown = Some(shutdown_tx);

        debug!(url = %self.url, "connecting");
    }

    /// Queue one text frame. Fails with `NotConnected` unless the channel is
    /// open; a failed call sent nothing.
    pub fn send(&self, text: String) -> Result<(), ChannelError> {
        if self.status() != ConnectionStatus::Open {
            return Err(ChannelError::NotConnected);
        }
        let outbound = self.outbound.as_ref().ok_or(ChannelError::NotConnected)?;
        outbound.send(text).map_err(|_| ChannelError::NotConnected)
    }

    /// Next transport event, or `None` once the current connection is gone
    /// and its events are drained (or no connection was ever opened).
    pub async fn next_event(&mut self) -> Option<ChannelEvent> {
        self.events.as_mut()?.recv().await
    }

    /// Tear down the connection, including one that is still handshaking.
    ///
    /// Safe to call repeatedly; the transport is released once. Events that
    /// were queued but not yet read are discarded, so a handshake that raced
    /// the close never surfaces as `Opened`.
    pub async fn close(&mut self) {
        let Some(shutdown) = self.shutdown.take() else {
            return;
        };
        if self.status() == ConnectionStatus::Disconnected {
            // The transport already ended on its own.
            self.release();
            debug!(url = %self.url, "released handles of a finished connection");
            return;
        }

        self.status.send_replace(ConnectionStatus::Closing);
        self.events = None;
        self.outbound = None;
        let _ = shutdown.send(());

        if let Some(mut task) = self.task.take() {
            if tokio::time::timeout(SHUTDOWN_TIMEOUT, &mut task).await.is_err() {
                warn!(url = %self.url, "transport task did not exit in time; aborting");
                task.abort();
            }
        }

        self.status.send_replace(ConnectionStatus::Disconnected);
        info!(url = %self.url, "channel closed");
    }

    fn release(&mut self) {
        self.events = None;
        self.outbound = None;
        self.shutdown = None;
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("url", &self.url)
            .field("status", &self.status())
            .field("has_task", &self.task.is_some())
            .finish()
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// ---------------------------------------------------------------------------
// Transport task
// ---------------------------------------------------------------------------

/// Connect, then pump frames until the peer, an error, or the owner ends it.
async fn run_transport(
    url: String,
    connect_timeout: Duration,
    status: Arc<watch::Sender<ConnectionStatus>>,
    events: mpsc::Sender<ChannelEvent>,
    mut outbound: mpsc::UnboundedReceiver<String>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let connect = tokio::time::timeout(
        connect_timeout,
        tokio_tungstenite::connect_async(url.as_str()),
    );

    let stream = tokio::select! {
        biased;
        _ = &mut shutdown => {
            debug!(%url, "connect cancelled");
            return;
        }
        result = connect => match result {
            Ok(Ok((stream, _response))) => stream,
            Ok(Err(e)) => {
                fail(&status, &events, ChannelError::Connect(e.to_string())).await;
                return;
            }
            Err(_) => {
                fail(&status, &events, ChannelError::Timeout(connect_timeout)).await;
                return;
            }
        }
    };

    // A close() that raced the handshake has already moved us off Connecting.
    let opened = status.send_if_modified(|s| {
        if *s == ConnectionStatus::Connecting {
            *s = ConnectionStatus::Open;
            true
        } else {
            false
        }
    });
    if !opened {
        debug!(%url, "handshake finished after close; dropping stream");
        return;
    }
    info!(%url, "channel open");
    if events.send(ChannelEvent::Opened).await.is_err() {
        return;
    }

    let (mut sink, mut source) = stream.split();
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                let _ = sink.send(Message::Close(None)).await;
                debug!(%url, "transport shut down");
                return;
            }

            frame = outbound.recv() => match frame {
                Some(text) => {
                    if let Err(e) = sink.send(Message::Text(text.into())).await {
                        fail(&status, &events, ChannelError::Transport(e.to_string())).await;
                        return;
                    }
                }
                None => {
                    let _ = sink.close().await;
                    return;
                }
            },

            incoming = source.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    let text = text.as_str().to_owned();
                    if events.send(ChannelEvent::Message(text)).await.is_err() {
                        return;
                    }
                }
                Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => {
                        if events.send(ChannelEvent::Message(text)).await.is_err() {
                            return;
                        }
                    }
                    Err(_) => warn!(%url, len = bytes.len(), "dropping non-UTF-8 binary frame"),
                },
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame
                        .map(|f| f.reason.as_str().to_owned())
                        .filter(|r| !r.is_empty());
                    info!(%url, ?reason, "peer closed channel");
                    status.send_replace(ConnectionStatus::Disconnected);
                    let _ = events.send(ChannelEvent::Closed { reason }).await;
                    return;
                }
                // Ping/pong are answered by tungstenite itself.
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    fail(&status, &events, ChannelError::Transport(e.to_string())).await;
                    return;
                }
                None => {
                    info!(%url, "channel stream ended");
                    status.send_replace(ConnectionStatus::Disconnected);
                    let _ = events.send(ChannelEvent::Closed { reason: None }).await;
                    return;
                }
            },
        }
    }
}

/// Mark the channel down, then report why.
async fn fail(
    status: &watch::Sender<ConnectionStatus>,
    events: &mpsc::Sender<ChannelEvent>,
    error: ChannelError,
) {
    warn!(%error, "channel failed");
    status.send_replace(ConnectionStatus::Disconnected);
    let _ = events.send(ChannelEvent::Error(error)).await;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
