use crate::status::ConnectionStatus;

/// Errors that can occur in transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The operation is not valid in the current connection state.
    #[error("cannot {operation} while {status}")]
    InvalidState {
        operation: &'static str,
        status: ConnectionStatus,
    },

    /// A frame was written with no live socket.
    #[error("transport is not connected")]
    NotConnected,

    /// Failed to open a socket to the endpoint.
    #[error("failed to connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The live connection failed.
    #[error("connection error: {0}")]
    Connection(String),

    /// A frame could not be encoded or decoded.
    #[error("frame error: {0}")]
    Frame(#[from] rsmux_frame::FrameError),

    /// WebSocket protocol error.
    #[error("websocket error: {0}")]
    WebSocket(Box<tokio_tungstenite::tungstenite::Error>),

    /// An I/O error occurred on the socket.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The endpoint URL scheme has no connector.
    #[error("unsupported endpoint {0:?} (expected ws://, wss:// or tcp://)")]
    UnsupportedEndpoint(String),

    /// The socket was closed by the local side.
    #[error("socket closed")]
    Closed,
}

impl From<tokio_tungstenite::tungstenite::Error> for TransportError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        TransportError::WebSocket(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
