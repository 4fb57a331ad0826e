use super::transport::{FrameSink, FrameStream, Transport};
use anyhow::{anyhow, Result};
use futures::channel::mpsc;
use futures::future::{self, BoxFuture};
use futures::{FutureExt, SinkExt, StreamExt};
use std::sync::{Arc, Mutex};

type Inbound = mpsc::UnboundedSender<Result<String>>;

struct MockSocket {
    inbound_rx: mpsc::UnboundedReceiver<Result<String>>,
    outbound_tx: mpsc::UnboundedSender<String>,
}

/// In-memory transport. The paired [`MockPeer`] plays the backend: it pushes
/// inbound frames and observes what the client wrote.
#[derive(Clone)]
pub struct MockTransport {
    socket: Arc<Mutex<Option<MockSocket>>>,
    refuse_with: Option<String>,
}

pub struct MockPeer {
    inbound_tx: Option<Inbound>,
    outbound_rx: mpsc::UnboundedReceiver<String>,
}

impl MockTransport {
    pub fn pair() -> (Self, MockPeer) {
        let (inbound_tx, inbound_rx) = mpsc::unbounded();
        let (outbound_tx, outbound_rx) = mpsc::unbounded();
        let transport = Self {
            socket: Arc::new(Mutex::new(Some(MockSocket {
                inbound_rx,
                outbound_tx,
            }))),
            refuse_with: None,
        };
        let peer = MockPeer {
            inbound_tx: Some(inbound_tx),
            outbound_rx,
        };
        (transport, peer)
    }

    /// A transport whose every `open` fails with `reason`.
    pub fn refusing(reason: impl Into<String>) -> Self {
        Self {
            socket: Arc::new(Mutex::new(None)),
            refuse_with: Some(reason.into()),
        }
    }
}

impl Transport for MockTransport {
    fn open<'a>(&'a self, endpoint: &'a str) -> BoxFuture<'a, Result<(FrameSink, FrameStream)>> {
        let opened = match &self.refuse_with {
            Some(reason) => Err(anyhow!("{endpoint}: {reason}")),
            None => self
                .socket
                .lock()
                .map_err(|_| anyhow!("mock socket lock poisoned"))
                .and_then(|mut slot| {
                    slot.take()
                        .ok_or_else(|| anyhow!("mock transport already opened"))
                })
                .map(|socket| {
                    let sink: FrameSink =
                        Box::pin(socket.outbound_tx.sink_map_err(anyhow::Error::from));
                    let stream: FrameStream = Box::pin(socket.inbound_rx);
                    (sink, stream)
                }),
        };
        future::ready(opened).boxed()
    }
}

impl MockPeer {
    pub fn push_frame(&self, payload: impl Into<String>) {
        if let Some(tx) = &self.inbound_tx {
            let _ = tx.unbounded_send(Ok(payload.into()));
        }
    }

    /// Breaks the socket with a transport error.
    pub fn fail(&self, reason: impl Into<String>) {
        if let Some(tx) = &self.inbound_tx {
            let _ = tx.unbounded_send(Err(anyhow!(reason.into())));
        }
    }

    /// Remote close: the client's inbound stream ends.
    pub fn close(&mut self) {
        self.inbound_tx = None;
    }

    pub async fn next_outbound(&mut self) -> Option<String> {
        self.outbound_rx.next().await
    }

    /// Non-blocking read of the next written frame, if one is already queued.
    pub fn try_outbound(&mut self) -> Option<String> {
        self.outbound_rx.next().now_or_never().flatten()
    }
}
