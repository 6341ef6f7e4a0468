use bytes::{Bytes, BytesMut};
use futures::future::BoxFuture;
use futures::{FutureExt, SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::{BytesCodec, FramedRead, FramedWrite};
use tracing::debug;

use crate::error::{Result, TransportError};
use crate::socket::{Connector, SocketHandle};

/// Dials a `host:port` TCP endpoint. Reads arrive as raw byte chunks; the
/// transport reassembles length-prefixed frames from them.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    addr: String,
}

impl TcpConnector {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }
}

impl Connector for TcpConnector {
    fn connect(&self) -> BoxFuture<'static, Result<SocketHandle>> {
        let addr = self.addr.clone();
        async move {
            let stream = TcpStream::connect(addr.as_str())
                .await
                .map_err(|err| TransportError::Connect {
                    endpoint: addr.clone(),
                    source: Box::new(err),
                })?;
            stream.set_nodelay(true)?;
            debug!(%addr, "connected to tcp endpoint");

            let (read, write) = stream.into_split();
            let sink = SinkExt::<Bytes>::sink_map_err(
                FramedWrite::new(write, BytesCodec::new()),
                TransportError::Io,
            );
            let stream = FramedRead::new(read, BytesCodec::new())
                .map(|chunk| chunk.map(BytesMut::freeze).map_err(TransportError::Io));
            Ok(SocketHandle::new("tcp", sink, stream))
        }
        .boxed()
    }

    fn endpoint(&self) -> &str {
        &self.addr
    }
}
