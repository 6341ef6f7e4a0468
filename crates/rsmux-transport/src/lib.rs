//! Duplex frame transport.
//!
//! A [`DuplexTransport`] owns one socket per connection generation, encodes
//! outbound frames onto it and decodes inbound frames from it, and broadcasts
//! every [`ConnectionStatus`] change. Sockets come from a [`Connector`]:
//! WebSocket (`ws://`, `wss://`) and TCP (`tcp://`) connectors are built in,
//! and [`memory`] provides in-process sockets for tests.

pub mod duplex;
pub mod error;
pub mod memory;
pub mod socket;
pub mod status;
pub mod tcp;
pub mod ws;

pub use duplex::{DuplexTransport, FrameObserver, TransportConfig};
pub use error::{Result, TransportError};
pub use socket::{connector_for, Connector, Framing, SocketHandle, SocketSink, SocketStream};
pub use status::{ConnectionStatus, StatusBroadcast, StatusObserver};
pub use tcp::TcpConnector;
pub use ws::WebSocketConnector;
