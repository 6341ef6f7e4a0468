use std::fmt;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use futures::future::BoxFuture;
use futures::{Sink, Stream};

use crate::error::{Result, TransportError};
use crate::tcp::TcpConnector;
use crate::ws::WebSocketConnector;

/// Outbound half of an open socket: one item is one message.
pub type SocketSink = Pin<Box<dyn Sink<Bytes, Error = TransportError> + Send>>;

/// Inbound half of an open socket. The stream ends when the peer closes.
pub type SocketStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// An open, message-oriented socket.
///
/// The transport owns the handle for the lifetime of one generation and
/// drops it on the terminal transition.
pub struct SocketHandle {
    pub(crate) sink: SocketSink,
    pub(crate) stream: SocketStream,
    kind: &'static str,
}

impl SocketHandle {
    pub fn new<Si, St>(kind: &'static str, sink: Si, stream: St) -> Self
    where
        Si: Sink<Bytes, Error = TransportError> + Send + 'static,
        St: Stream<Item = Result<Bytes>> + Send + 'static,
    {
        Self {
            sink: Box::pin(sink),
            stream: Box::pin(stream),
            kind,
        }
    }

    /// Socket type, for diagnostics (e.g. "websocket", "tcp").
    pub fn kind(&self) -> &'static str {
        self.kind
    }
}

impl fmt::Debug for SocketHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocketHandle")
            .field("type", &self.kind)
            .finish()
    }
}

/// Opens sockets to one endpoint.
pub trait Connector: Send + Sync {
    /// Start a connection attempt. The future resolves once the socket is
    /// open (or has failed to open).
    fn connect(&self) -> BoxFuture<'static, Result<SocketHandle>>;

    /// The endpoint this connector dials, for logs and errors.
    fn endpoint(&self) -> &str;
}

/// How frames map onto socket messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Framing {
    /// One frame per message (WebSocket).
    #[default]
    Message,
    /// Frames carry a 24-bit length prefix and may span or share messages (TCP).
    LengthPrefixed,
}

/// Pick a connector and framing from the endpoint URL scheme.
pub fn connector_for(url: &str) -> Result<(Arc<dyn Connector>, Framing)> {
    if url.starts_with("ws://") || url.starts_with("wss://") {
        return Ok((Arc::new(WebSocketConnector::new(url)), Framing::Message));
    }
    if let Some(addr) = url.strip_prefix("tcp://") {
        let addr = addr.trim_end_matches('/');
        if addr.is_empty() {
            return Err(TransportError::UnsupportedEndpoint(url.to_string()));
        }
        return Ok((Arc::new(TcpConnector::new(addr)), Framing::LengthPrefixed));
    }
    Err(TransportError::UnsupportedEndpoint(url.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connector_for_schemes() {
        let (ws, framing) = connector_for("ws://localhost:7000/rsocket").unwrap();
        assert_eq!(ws.endpoint(), "ws://localhost:7000/rsocket");
        assert_eq!(framing, Framing::Message);

        let (tcp, framing) = connector_for("tcp://127.0.0.1:7000/").unwrap();
        assert_eq!(tcp.endpoint(), "127.0.0.1:7000");
        assert_eq!(framing, Framing::LengthPrefixed);
    }

    #[test]
    fn test_connector_for_rejects_unknown_scheme() {
        assert!(matches!(
            connector_for("http://localhost"),
            Err(TransportError::UnsupportedEndpoint(_))
        ));
        assert!(matches!(
            connector_for("tcp://"),
            Err(TransportError::UnsupportedEndpoint(_))
        ));
    }
}
