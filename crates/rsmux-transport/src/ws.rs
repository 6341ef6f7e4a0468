use bytes::Bytes;
use futures::future::{self, BoxFuture};
use futures::{FutureExt, SinkExt, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, trace};

use crate::error::{Result, TransportError};
use crate::socket::{Connector, SocketHandle};

/// Dials a `ws://` or `wss://` endpoint. Each binary message carries one frame.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    url: String,
}

impl WebSocketConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl Connector for WebSocketConnector {
    fn connect(&self) -> BoxFuture<'static, Result<SocketHandle>> {
        let url = self.url.clone();
        async move {
            let (socket, response) =
                connect_async(url.as_str())
                    .await
                    .map_err(|err| TransportError::Connect {
                        endpoint: url.clone(),
                        source: Box::new(err),
                    })?;
            debug!(%url, status = %response.status(), "websocket handshake complete");

            let (sink, stream) = socket.split();
            let sink = sink
                .sink_map_err(TransportError::from)
                .with(|bytes: Bytes| future::ready(Ok::<_, TransportError>(Message::Binary(bytes))));
            let stream = stream.filter_map(|message| {
                future::ready(match message {
                    Ok(Message::Binary(bytes)) => Some(Ok(bytes)),
                    Ok(Message::Text(text)) => {
                        Some(Ok(Bytes::copy_from_slice(text.as_str().as_bytes())))
                    }
                    Ok(Message::Close(reason)) => {
                        debug!(?reason, "websocket close received");
                        None
                    }
                    Ok(other) => {
                        trace!(kind = ?other, "ignoring control message");
                        None
                    }
                    Err(err) => Some(Err(TransportError::from(err))),
                })
            });
            Ok(SocketHandle::new("websocket", sink, stream))
        }
        .boxed()
    }

    fn endpoint(&self) -> &str {
        &self.url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_refused_reports_endpoint() {
        let connector = WebSocketConnector::new("ws://127.0.0.1:1/rsocket");
        let err = connector.connect().await.unwrap_err();
        match err {
            TransportError::Connect { endpoint, .. } => {
                assert_eq!(endpoint, "ws://127.0.0.1:1/rsocket")
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
