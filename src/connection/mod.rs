//! Ownership of the single chat socket.
//!
//! A [`Connection`] opens one socket through a [`Transport`], pumps it with a
//! reader task and a writer task, and reports lifecycle changes and inbound
//! frames as [`ConnectionEvent`]s. It also owns the frame listener: the marker
//! for the one request whose response is currently being received.

pub mod mock;
pub mod transport;
pub mod websocket;

use crate::error::{ConnectionError, SubmitError};
use crate::types::RequestId;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub use transport::{FrameSink, FrameStream, Transport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl ConnectionState {
    pub fn label(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    Connected,
    Frame(String),
    /// The remote end closed the socket.
    Closed,
    /// The socket never opened or broke while open.
    Failed { message: String },
}

struct SocketLink {
    outbound_tx: mpsc::UnboundedSender<String>,
    cancel: CancellationToken,
}

pub struct Connection {
    transport: Arc<dyn Transport>,
    state: ConnectionState,
    spent: bool,
    link: Option<SocketLink>,
    listener: Option<RequestId>,
    events_tx: mpsc::UnboundedSender<ConnectionEvent>,
}

impl Connection {
    pub fn new(
        transport: Arc<dyn Transport>,
    ) -> (Self, mpsc::UnboundedReceiver<ConnectionEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let connection = Self {
            transport,
            state: ConnectionState::Disconnected,
            spent: false,
            link: None,
            listener: None,
            events_tx,
        };
        (connection, events_rx)
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Opens the socket. Observers learn the outcome through
    /// [`ConnectionEvent::Connected`] or [`ConnectionEvent::Failed`].
    pub async fn connect(&mut self, endpoint: &str) -> Result<(), ConnectionError> {
        if self.spent {
            return Err(ConnectionError::Spent);
        }
        self.spent = true;
        self.state = ConnectionState::Connecting;
        info!(endpoint, "connecting to chat backend");

        match self.transport.open(endpoint).await {
            Ok((sink, stream)) => {
                let cancel = CancellationToken::new();
                let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
                tokio::spawn(write_frames(
                    sink,
                    outbound_rx,
                    cancel.clone(),
                    self.events_tx.clone(),
                ));
                tokio::spawn(read_frames(stream, cancel.clone(), self.events_tx.clone()));
                self.link = Some(SocketLink {
                    outbound_tx,
                    cancel,
                });
                self.state = ConnectionState::Connected;
                info!(endpoint, "connected to chat backend");
                self.notify(ConnectionEvent::Connected);
                Ok(())
            }
            Err(source) => {
                warn!(endpoint, error = %source, "failed to connect to chat backend");
                self.state = ConnectionState::Error;
                self.notify(ConnectionEvent::Failed {
                    message: format!("{source:#}"),
                });
                self.teardown();
                Err(ConnectionError::Open {
                    endpoint: endpoint.to_string(),
                    source,
                })
            }
        }
    }

    /// Applies the lifecycle side of an event produced by the socket tasks.
    pub fn handle_event(&mut self, event: &ConnectionEvent) {
        match event {
            ConnectionEvent::Closed => {
                if self.state == ConnectionState::Connected {
                    info!("chat backend closed the connection");
                    self.teardown();
                }
            }
            ConnectionEvent::Failed { message } => {
                if self.link.is_some() {
                    warn!(error = %message, "chat connection failed");
                    self.state = ConnectionState::Error;
                    self.teardown();
                }
            }
            ConnectionEvent::Connected | ConnectionEvent::Frame(_) => {}
        }
    }

    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Connected && self.link.is_some()
    }

    /// Checks the preconditions of [`send`](Self::send) without sending.
    pub fn ensure_can_send(&self) -> Result<(), SubmitError> {
        if !self.is_open() {
            return Err(SubmitError::NotConnected);
        }
        if self.listener.is_some() {
            return Err(SubmitError::RequestInFlight);
        }
        Ok(())
    }

    /// Queues `text` as one outbound frame and opens a request for it.
    pub fn send(&mut self, text: &str) -> Result<RequestId, SubmitError> {
        self.ensure_can_send()?;
        let link = self.link.as_ref().ok_or(SubmitError::NotConnected)?;
        link.outbound_tx
            .send(text.to_string())
            .map_err(|_| SubmitError::NotConnected)?;

        let id = RequestId::new();
        self.listener = Some(id);
        debug!(request = %id, bytes = text.len(), "request opened");
        Ok(id)
    }

    /// The request whose frames are currently being listened for.
    pub fn open_request(&self) -> Option<RequestId> {
        self.listener
    }

    pub fn detach_listener(&mut self) -> Option<RequestId> {
        let detached = self.listener.take();
        if let Some(id) = detached {
            debug!(request = %id, "frame listener detached");
        }
        detached
    }

    pub fn disconnect(&mut self) {
        if self.link.is_some() {
            info!("disconnecting from chat backend");
        }
        self.teardown();
    }

    fn teardown(&mut self) {
        self.detach_listener();
        if let Some(link) = self.link.take() {
            link.cancel.cancel();
        }
        self.state = ConnectionState::Disconnected;
    }

    fn notify(&self, event: ConnectionEvent) {
        let _ = self.events_tx.send(event);
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.teardown();
    }
}

async fn read_frames(
    mut frames: FrameStream,
    cancel: CancellationToken,
    events_tx: mpsc::UnboundedSender<ConnectionEvent>,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = frames.next() => match next {
                Some(Ok(payload)) => {
                    if events_tx.send(ConnectionEvent::Frame(payload)).is_err() {
                        break;
                    }
                }
                Some(Err(err)) => {
                    let _ = events_tx.send(ConnectionEvent::Failed {
                        message: format!("{err:#}"),
                    });
                    break;
                }
                None => {
                    let _ = events_tx.send(ConnectionEvent::Closed);
                    break;
                }
            },
        }
    }
    debug!("socket reader stopped");
}

async fn write_frames(
    mut sink: FrameSink,
    mut outbound_rx: mpsc::UnboundedReceiver<String>,
    cancel: CancellationToken,
    events_tx: mpsc::UnboundedSender<ConnectionEvent>,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                if let Err(err) = sink.close().await {
                    debug!(error = %err, "socket close failed");
                }
                break;
            }
            next = outbound_rx.recv() => match next {
                Some(text) => {
                    if let Err(err) = sink.send(text).await {
                        let _ = events_tx.send(ConnectionEvent::Failed {
                            message: format!("{err:#}"),
                        });
                        break;
                    }
                }
                None => break,
            },
        }
    }
    debug!("socket writer stopped");
}
