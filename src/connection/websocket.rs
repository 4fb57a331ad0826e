use super::transport::{FrameSink, FrameStream, Transport};
use anyhow::{Context, Result};
use futures::future::{self, BoxFuture};
use futures::{FutureExt, SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;
use tracing::debug;

/// Plain `ws://` transport backed by tokio-tungstenite.
#[derive(Debug, Default, Clone, Copy)]
pub struct WsTransport;

impl Transport for WsTransport {
    fn open<'a>(&'a self, endpoint: &'a str) -> BoxFuture<'a, Result<(FrameSink, FrameStream)>> {
        async move {
            let (socket, _response) = tokio_tungstenite::connect_async(endpoint)
                .await
                .with_context(|| format!("websocket handshake with {endpoint} failed"))?;
            let (sink, stream) = socket.split();

            let sink: FrameSink = Box::pin(
                sink.sink_map_err(anyhow::Error::from)
                    .with(|text: String| future::ready(Ok::<_, anyhow::Error>(Message::text(text)))),
            );

            let stream: FrameStream = Box::pin(
                stream
                    .take_while(|item| future::ready(!matches!(item, Ok(Message::Close(_)))))
                    .filter_map(|item| future::ready(text_payload(item))),
            );

            Ok((sink, stream))
        }
        .boxed()
    }
}

fn text_payload(
    item: std::result::Result<Message, tokio_tungstenite::tungstenite::Error>,
) -> Option<Result<String>> {
    match item {
        Ok(Message::Text(text)) => Some(Ok(text.as_str().to_owned())),
        Ok(Message::Binary(data)) => {
            debug!(bytes = data.len(), "ignoring binary frame");
            None
        }
        Ok(_) => None,
        Err(err) => Some(Err(anyhow::Error::from(err))),
    }
}
