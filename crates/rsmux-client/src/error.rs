use crate::decoder::DecodeError;

/// Errors that can occur in client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] rsmux_transport::TransportError),

    /// Frame or metadata encoding error.
    #[error("frame error: {0}")]
    Frame(#[from] rsmux_frame::FrameError),

    /// The interaction requires a live connection and there is none.
    #[error("not connected")]
    NotConnected,

    /// An inbound payload could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// An outbound value could not be serialized.
    #[error("serialize error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Reconnection gave up.
    #[error("reconnection gave up after {attempts} attempts")]
    ReconnectExhausted { attempts: u32 },

    /// The session task has stopped.
    #[error("client session has shut down")]
    Shutdown,
}

pub type Result<T> = std::result::Result<T, ClientError>;
