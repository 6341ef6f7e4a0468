//! Reconnecting RSocket client.
//!
//! rsmux multiplexes request-response, request-stream, channel and
//! fire-and-forget interactions over one WebSocket or TCP connection, with
//! composite routing and bearer metadata, queued dispatch and bounded
//! reconnection.
//!
//! # Crate Structure
//!
//! - [`frame`]: RSocket frame and composite metadata codec
//! - [`transport`]: Duplex transport, connection state and socket connectors
//! - [`client`]: Interaction multiplexer, session and caller-facing handles

/// Re-export frame types.
pub mod frame {
    pub use rsmux_frame::*;
}

/// Re-export transport types.
pub mod transport {
    pub use rsmux_transport::*;
}

/// Re-export client types.
pub mod client {
    pub use rsmux_client::*;
}
