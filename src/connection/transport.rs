use anyhow::Result;
use futures::future::BoxFuture;
use futures::{Sink, Stream};
use std::pin::Pin;

/// Outbound half of an open socket. Each item is sent as one text frame.
pub type FrameSink = Pin<Box<dyn Sink<String, Error = anyhow::Error> + Send>>;

/// Inbound half of an open socket. Ends when the remote closes the connection.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Opens sockets for a [`Connection`](super::Connection).
///
/// The websocket implementation lives in [`super::websocket`]; tests swap in
/// [`super::mock::MockTransport`].
pub trait Transport: Send + Sync {
    fn open<'a>(&'a self, endpoint: &'a str) -> BoxFuture<'a, Result<(FrameSink, FrameStream)>>;
}
