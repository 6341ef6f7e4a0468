//! Duplex frame transport over one socket at a time.
//!
//! ```text
//! NotConnected ──connect──▶ Connecting ──open──▶ Connected ──close──▶ Closed
//!                               │                    │
//!                               └──────failure───────┴──────▶ Error(cause)
//! ```
//!
//! Closed and Error end a generation. `reconnect` starts the next one.

use std::collections::VecDeque;
use std::mem;
use std::sync::Arc;

use bytes::BytesMut;
use futures::{SinkExt, StreamExt};
use rsmux_frame::{
    decode_frame, decode_frame_length_prefixed, encode_frame, encode_frame_length_prefixed,
    Frame, FrameError, DEFAULT_MAX_FRAME_SIZE, LENGTH_PREFIX_SIZE,
};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::error::{Result, TransportError};
use crate::socket::{Connector, Framing, SocketHandle, SocketSink, SocketStream};
use crate::status::{ConnectionStatus, StatusBroadcast};

/// Transport settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportConfig {
    pub framing: Framing,
    /// Largest encoded frame accepted in either direction.
    pub max_frame_size: usize,
}

impl TransportConfig {
    pub fn new(framing: Framing) -> Self {
        Self {
            framing,
            ..Self::default()
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            framing: Framing::Message,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

/// Receives every inbound frame of the current generation.
///
/// The channel ends when the generation ends: with a final `Err` if it failed,
/// or simply closes if it was closed cleanly.
pub type FrameObserver = mpsc::UnboundedReceiver<Result<Frame>>;

struct ActiveSocket {
    sink: SocketSink,
    stream: SocketStream,
    read_buf: BytesMut,
    ready: VecDeque<Frame>,
}

impl ActiveSocket {
    fn new(handle: SocketHandle) -> Self {
        Self {
            sink: handle.sink,
            stream: handle.stream,
            read_buf: BytesMut::new(),
            ready: VecDeque::new(),
        }
    }
}

/// Owns the socket for one generation and drives the frame codec over it.
pub struct DuplexTransport {
    connector: Arc<dyn Connector>,
    config: TransportConfig,
    status: StatusBroadcast,
    generation: u64,
    socket: Option<ActiveSocket>,
    frame_observers: Vec<mpsc::UnboundedSender<Result<Frame>>>,
}

impl std::fmt::Debug for DuplexTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuplexTransport")
            .field("endpoint", &self.connector.endpoint())
            .field("config", &self.config)
            .field("status", &self.status.current())
            .field("generation", &self.generation)
            .finish()
    }
}

impl DuplexTransport {
    pub fn new(connector: Arc<dyn Connector>, config: TransportConfig) -> Self {
        Self::with_status(connector, config, StatusBroadcast::new())
    }

    /// Create a transport that reports through an existing status handle.
    pub fn with_status(
        connector: Arc<dyn Connector>,
        config: TransportConfig,
        status: StatusBroadcast,
    ) -> Self {
        Self {
            connector,
            config,
            status,
            generation: 0,
            socket: None,
            frame_observers: Vec::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        self.connector.endpoint()
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status.current()
    }

    pub fn is_connected(&self) -> bool {
        self.socket.is_some() && self.status.is_connected()
    }

    /// A shared handle for reading and observing the status from elsewhere.
    pub fn status_handle(&self) -> StatusBroadcast {
        self.status.clone()
    }

    /// Number of connection attempts made so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Open the first connection. Only valid from `NotConnected`.
    pub async fn connect(&mut self) -> Result<()> {
        let status = self.status.current();
        if status != ConnectionStatus::NotConnected {
            return Err(TransportError::InvalidState {
                operation: "connect",
                status,
            });
        }
        self.open().await
    }

    /// Open a new connection after the previous generation ended.
    pub async fn reconnect(&mut self) -> Result<()> {
        let status = self.status.current();
        if matches!(
            status,
            ConnectionStatus::Connecting | ConnectionStatus::Connected
        ) {
            return Err(TransportError::InvalidState {
                operation: "reconnect",
                status,
            });
        }
        self.open().await
    }

    async fn open(&mut self) -> Result<()> {
        self.generation += 1;
        self.status.transition(ConnectionStatus::Connecting);
        info!(
            endpoint = self.connector.endpoint(),
            generation = self.generation,
            "connecting"
        );

        match self.connector.connect().await {
            Ok(handle) => {
                debug!(socket = handle.kind(), "socket open");
                self.socket = Some(ActiveSocket::new(handle));
                self.status.transition(ConnectionStatus::Connected);
                info!(generation = self.generation, "connected");
                Ok(())
            }
            Err(err) => {
                warn!(endpoint = self.connector.endpoint(), error = %err, "connect failed");
                self.terminate(ConnectionStatus::Error(err.to_string()));
                Err(err)
            }
        }
    }

    /// Register an observer for inbound frames of the current generation.
    ///
    /// Observers registered while no socket is open are released by the next
    /// terminal transition, like any other.
    pub fn subscribe_frames(&mut self) -> FrameObserver {
        let (tx, rx) = mpsc::unbounded_channel();
        self.frame_observers.push(tx);
        rx
    }

    /// Encode and write one frame.
    ///
    /// An encode or write failure ends the generation with `Error`.
    pub async fn send(&mut self, frame: &Frame) -> Result<()> {
        if self.socket.is_none() {
            return Err(TransportError::NotConnected);
        }

        let mut buf = BytesMut::new();
        if let Err(err) = self.encode(frame, &mut buf) {
            self.fail(format!("failed to encode {}: {err}", frame.frame_type()));
            return Err(err.into());
        }

        let Some(socket) = self.socket.as_mut() else {
            return Err(TransportError::NotConnected);
        };
        trace!(
            stream_id = frame.stream_id,
            frame_type = %frame.frame_type(),
            len = buf.len(),
            "sending frame"
        );
        let written = socket.sink.send(buf.freeze()).await;
        if let Err(err) = written {
            self.fail(err.to_string());
            return Err(err);
        }
        Ok(())
    }

    fn encode(&self, frame: &Frame, dst: &mut BytesMut) -> std::result::Result<(), FrameError> {
        let max = self.config.max_frame_size;
        let size = match self.config.framing {
            Framing::Message => {
                encode_frame(frame, dst)?;
                dst.len()
            }
            Framing::LengthPrefixed => {
                encode_frame_length_prefixed(frame, dst)?;
                dst.len() - LENGTH_PREFIX_SIZE
            }
        };
        if size > max {
            dst.clear();
            return Err(FrameError::PayloadTooLarge { size, max });
        }
        Ok(())
    }

    /// Wait for the next inbound frame.
    ///
    /// Returns `None` when no socket is open, or when the generation ends
    /// while waiting: the socket closed, failed, or delivered a malformed
    /// frame. Check [`status`](Self::status) to tell these apart.
    pub async fn next_frame(&mut self) -> Option<Frame> {
        loop {
            let socket = self.socket.as_mut()?;
            if let Some(frame) = socket.ready.pop_front() {
                trace!(
                    stream_id = frame.stream_id,
                    frame_type = %frame.frame_type(),
                    "received frame"
                );
                self.publish(&frame);
                return Some(frame);
            }

            let message = socket.stream.next().await;
            match message {
                Some(Ok(bytes)) => {
                    if let Err(err) = self.ingest(bytes) {
                        warn!(error = %err, "malformed inbound frame");
                        self.fail(format!("malformed frame: {err}"));
                        return None;
                    }
                }
                Some(Err(err)) => {
                    self.fail(err.to_string());
                    return None;
                }
                None => {
                    debug!("socket closed by peer");
                    self.terminate(ConnectionStatus::Closed);
                    return None;
                }
            }
        }
    }

    fn ingest(&mut self, bytes: bytes::Bytes) -> std::result::Result<(), FrameError> {
        let max = self.config.max_frame_size;
        let framing = self.config.framing;
        let Some(socket) = self.socket.as_mut() else {
            return Ok(());
        };
        match framing {
            Framing::Message => {
                if bytes.len() > max {
                    return Err(FrameError::PayloadTooLarge {
                        size: bytes.len(),
                        max,
                    });
                }
                socket.ready.push_back(decode_frame(bytes)?);
            }
            Framing::LengthPrefixed => {
                socket.read_buf.extend_from_slice(&bytes);
                while let Some(frame) = decode_frame_length_prefixed(&mut socket.read_buf, max)? {
                    socket.ready.push_back(frame);
                }
            }
        }
        Ok(())
    }

    fn publish(&mut self, frame: &Frame) {
        self.frame_observers
            .retain(|observer| observer.send(Ok(frame.clone())).is_ok());
    }

    /// Close the socket and end the generation with `Closed`.
    ///
    /// Does nothing unless connecting or connected.
    pub async fn close(&mut self) {
        if let Some(socket) = self.socket.as_mut() {
            if let Err(err) = socket.sink.close().await {
                debug!(error = %err, "error while closing socket");
            }
        }
        self.terminate(ConnectionStatus::Closed);
    }

    /// End the generation with `Error(cause)`.
    ///
    /// Does nothing unless connecting or connected.
    pub fn fail(&mut self, cause: impl Into<String>) {
        self.terminate(ConnectionStatus::Error(cause.into()));
    }

    fn terminate(&mut self, next: ConnectionStatus) {
        if !matches!(
            self.status.current(),
            ConnectionStatus::Connecting | ConnectionStatus::Connected
        ) {
            return;
        }

        self.socket = None;
        let observers = mem::take(&mut self.frame_observers);
        if let ConnectionStatus::Error(cause) = &next {
            for observer in observers {
                let _ = observer.send(Err(TransportError::Connection(cause.clone())));
            }
        }

        match &next {
            ConnectionStatus::Error(cause) => {
                warn!(generation = self.generation, %cause, "connection failed")
            }
            _ => info!(generation = self.generation, status = %next, "connection ended"),
        }
        self.status.transition(next);
    }
}
