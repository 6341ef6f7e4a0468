//! In-process sockets.
//!
//! [`pair`] returns an already-open socket and the peer end that plays the
//! server. [`listener`] returns a connector whose connection attempts block
//! until a [`MemoryListener`] accepts or refuses them, so tests can drive the
//! connect and reconnect paths deterministically.

use std::io;

use bytes::{Bytes, BytesMut};
use futures::channel::mpsc as chan;
use futures::future::BoxFuture;
use futures::{FutureExt, SinkExt, StreamExt};
use rsmux_frame::{decode_frame, encode_frame, Frame, FrameError};
use tokio::sync::{mpsc, oneshot};

use crate::error::{Result, TransportError};
use crate::socket::{Connector, SocketHandle};

const MEMORY_ENDPOINT: &str = "memory";

/// Create a connected in-memory socket and its peer end.
pub fn pair() -> (SocketHandle, MemoryPeer) {
    let (to_peer, from_client) = chan::unbounded::<Bytes>();
    let (to_client, from_peer) = chan::unbounded::<Result<Bytes>>();
    let sink = to_peer.sink_map_err(|_| TransportError::Closed);
    let handle = SocketHandle::new("memory", sink, from_peer);
    let peer = MemoryPeer {
        inbound: from_client,
        outbound: to_client,
    };
    (handle, peer)
}

/// The server side of an in-memory socket. One message carries one frame.
#[derive(Debug)]
pub struct MemoryPeer {
    inbound: chan::UnboundedReceiver<Bytes>,
    outbound: chan::UnboundedSender<Result<Bytes>>,
}

impl MemoryPeer {
    /// Next message written by the client, or `None` once the client side is gone.
    pub async fn recv(&mut self) -> Option<Bytes> {
        self.inbound.next().await
    }

    /// Next frame written by the client.
    pub async fn recv_frame(&mut self) -> std::result::Result<Option<Frame>, FrameError> {
        match self.recv().await {
            Some(bytes) => decode_frame(bytes).map(Some),
            None => Ok(None),
        }
    }

    /// Deliver a raw message to the client. Returns false if the client is gone.
    pub fn send(&self, message: impl Into<Bytes>) -> bool {
        self.outbound.unbounded_send(Ok(message.into())).is_ok()
    }

    /// Encode and deliver a frame to the client.
    pub fn send_frame(&self, frame: &Frame) -> bool {
        let mut buf = BytesMut::new();
        if encode_frame(frame, &mut buf).is_err() {
            return false;
        }
        self.send(buf.freeze())
    }

    /// Surface a socket error on the client's inbound stream.
    pub fn fail(&self, cause: impl Into<String>) {
        let _ = self
            .outbound
            .unbounded_send(Err(TransportError::Connection(cause.into())));
    }

    /// End the client's inbound stream, as a clean remote close.
    pub fn close(&self) {
        self.outbound.close_channel();
    }
}

type ConnectRequest = oneshot::Sender<Result<SocketHandle>>;

/// Create a connector and the listener that answers its connection attempts.
pub fn listener() -> (MemoryConnector, MemoryListener) {
    let (requests, incoming) = mpsc::unbounded_channel();
    (MemoryConnector { requests }, MemoryListener { incoming })
}

/// Connects to a [`MemoryListener`].
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    requests: mpsc::UnboundedSender<ConnectRequest>,
}

impl Connector for MemoryConnector {
    fn connect(&self) -> BoxFuture<'static, Result<SocketHandle>> {
        let requests = self.requests.clone();
        async move {
            let (respond, response) = oneshot::channel();
            if requests.send(respond).is_err() {
                return Err(refused("listener dropped"));
            }
            response
                .await
                .unwrap_or_else(|_| Err(refused("listener dropped")))
        }
        .boxed()
    }

    fn endpoint(&self) -> &str {
        MEMORY_ENDPOINT
    }
}

/// Answers connection attempts from a [`MemoryConnector`].
#[derive(Debug)]
pub struct MemoryListener {
    incoming: mpsc::UnboundedReceiver<ConnectRequest>,
}

impl MemoryListener {
    /// Wait for the next connection attempt and accept it.
    ///
    /// Returns `None` once every connector has been dropped.
    pub async fn accept(&mut self) -> Option<MemoryPeer> {
        loop {
            let respond = self.incoming.recv().await?;
            let (handle, peer) = pair();
            if respond.send(Ok(handle)).is_ok() {
                return Some(peer);
            }
        }
    }

    /// Wait for the next connection attempt and refuse it.
    ///
    /// Returns false once every connector has been dropped.
    pub async fn refuse(&mut self) -> bool {
        match self.incoming.recv().await {
            Some(respond) => {
                let _ = respond.send(Err(refused("connection refused")));
                true
            }
            None => false,
        }
    }

    /// Count attempts already waiting, refusing each of them.
    pub fn refuse_pending(&mut self) -> usize {
        let mut refused_count = 0;
        while let Ok(respond) = self.incoming.try_recv() {
            let _ = respond.send(Err(refused("connection refused")));
            refused_count += 1;
        }
        refused_count
    }
}

fn refused(reason: &str) -> TransportError {
    TransportError::Connect {
        endpoint: MEMORY_ENDPOINT.to_string(),
        source: Box::new(io::Error::new(io::ErrorKind::ConnectionRefused, reason.to_string())),
    }
}
