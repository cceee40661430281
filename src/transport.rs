// file: src/transport.rs
// description: transport seam between the live feed client and the websocket library
// reference: https://docs.rs/tokio-tungstenite/latest/tokio_tungstenite/

use crate::error::TriageError;
use futures_util::{
    Sink, SinkExt, StreamExt, TryStreamExt,
    future::{self, BoxFuture},
    stream::BoxStream,
};
use std::pin::Pin;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, trace};
use url::Url;

/// Outbound half of a connection: text frames in, transport errors out.
pub type FrameSink = Pin<Box<dyn Sink<String, Error = TriageError> + Send>>;

/// Inbound half of a connection. The stream ending is the close event; an
/// `Err` item is a transport error and is followed by the close.
pub type FrameStream = BoxStream<'static, Result<String, TriageError>>;

pub struct TransportConnection {
    pub sink: FrameSink,
    pub stream: FrameStream,
}

/// Opens one connection to the push endpoint.
///
/// The returned future resolving is the transport's "open" event; resolving
/// to an error means the attempt failed and is treated like a close.
pub trait Transport: Send + Sync + 'static {
    fn open(&self, endpoint: Url) -> BoxFuture<'static, Result<TransportConnection, TriageError>>;
}

/// WebSocket transport backed by `tokio-tungstenite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsTransport;

impl Transport for WsTransport {
    fn open(&self, endpoint: Url) -> BoxFuture<'static, Result<TransportConnection, TriageError>> {
        Box::pin(async move {
            let (ws_stream, response) = connect_async(endpoint.as_str()).await?;
            info!(
                "WebSocket connection established to {} (status {})",
                endpoint,
                response.status()
            );

            let (write, read) = ws_stream.split();

            let sink = write.sink_map_err(TriageError::from).with(|text: String| {
                future::ready(Ok::<_, TriageError>(Message::Text(text.into())))
            });

            let stream = read
                .map_err(TriageError::from)
                .try_filter_map(|message| future::ready(Ok(text_payload(message))));

            Ok(TransportConnection {
                sink: Box::pin(sink),
                stream: stream.boxed(),
            })
        })
    }
}

/// Keeps text frames; control frames are handled by tungstenite itself.
fn text_payload(message: Message) -> Option<String> {
    match message {
        Message::Text(text) => Some(text.as_str().to_owned()),
        Message::Binary(data) => {
            debug!("Ignoring binary frame of {} bytes", data.len());
            None
        }
        Message::Ping(_) | Message::Pong(_) => {
            trace!("Received control frame");
            None
        }
        Message::Close(frame) => {
            debug!("Received close frame: {:?}", frame);
            None
        }
        Message::Frame(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_text_frames() {
        assert_eq!(
            text_payload(Message::Text("{\"type\":\"pong\"}".into())),
            Some("{\"type\":\"pong\"}".to_string())
        );
        assert_eq!(text_payload(Message::Binary(vec![1u8, 2, 3].into())), None);
        assert_eq!(text_payload(Message::Ping(Vec::<u8>::new().into())), None);
        assert_eq!(text_payload(Message::Close(None)), None);
    }

    #[tokio::test]
    async fn refused_connection_is_an_error() {
        // nothing listens on the discard port
        let endpoint = Url::parse("ws://127.0.0.1:9/ws/feedbacks").unwrap();
        assert!(WsTransport.open(endpoint).await.is_err());
    }
}
