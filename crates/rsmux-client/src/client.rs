use std::collections::VecDeque;
use std::sync::Arc;

use bytes::Bytes;
use rsmux_frame::{Payload, MAX_REQUEST_N};
use rsmux_transport::{ConnectionStatus, FrameObserver, StatusBroadcast, StatusObserver};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::interaction::{self, Interaction};
use crate::metadata;
use crate::multiplexer::{PendingInteraction, Shape};
use crate::reconnect::ReconnectState;
use crate::serializer::{MetadataSerializer, Serializer};
use crate::session::Command;
use crate::token::{self, TokenSource};

/// Handle to a running client session. Cheap to clone.
///
/// Interactions issued before the connection is up are queued and dispatched
/// in order once it is. Dropping the last handle disconnects the session.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    endpoint: String,
    commands: mpsc::UnboundedSender<Command>,
    status: StatusBroadcast,
    reconnect: watch::Receiver<ReconnectState>,
    serializer: Arc<dyn Serializer>,
    metadata_serializer: Arc<dyn MetadataSerializer>,
    default_token: Option<TokenSource>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("endpoint", &self.inner.endpoint)
            .field("status", &self.inner.status.current())
            .finish()
    }
}

impl Client {
    pub(crate) fn new(
        endpoint: String,
        commands: mpsc::UnboundedSender<Command>,
        status: StatusBroadcast,
        reconnect: watch::Receiver<ReconnectState>,
        config: &ClientConfig,
    ) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                endpoint,
                commands,
                status,
                reconnect,
                serializer: config.data_serializer.clone(),
                metadata_serializer: config.metadata_serializer.clone(),
                default_token: config.token.clone(),
            }),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.inner.endpoint
    }

    pub fn status(&self) -> ConnectionStatus {
        self.inner.status.current()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.status.is_connected()
    }

    /// Observe every subsequent status change.
    pub fn subscribe_status(&self) -> StatusObserver {
        self.inner.status.subscribe()
    }

    pub fn reconnect_state(&self) -> ReconnectState {
        *self.inner.reconnect.borrow()
    }

    /// Wait until the session is connected.
    ///
    /// Fails with [`ClientError::ReconnectExhausted`] once reconnection has
    /// given up, or [`ClientError::Shutdown`] if the session task is gone.
    pub async fn ready(&self) -> Result<()> {
        let mut status = self.inner.status.subscribe();
        let mut reconnect = self.inner.reconnect.clone();
        loop {
            if self.inner.status.is_connected() {
                return Ok(());
            }
            let state = *reconnect.borrow_and_update();
            if state.exhausted {
                return Err(ClientError::ReconnectExhausted {
                    attempts: state.attempts,
                });
            }
            tokio::select! {
                changed = status.recv() => {
                    if changed.is_none() {
                        return Err(ClientError::Shutdown);
                    }
                }
                changed = reconnect.changed() => {
                    if changed.is_err() {
                        return Err(ClientError::Shutdown);
                    }
                }
            }
        }
    }

    /// Request a single response. The result holds `None` until it arrives.
    pub fn request_response<T>(
        &self,
        route: &str,
        data: &impl Serialize,
        token: Option<TokenSource>,
    ) -> Result<Interaction<Option<T>>>
    where
        T: DeserializeOwned + Clone + Send + Sync + 'static,
    {
        let data = self.serialize(data)?;
        let (interaction, sink) = interaction::single::<T>(route);
        self.submit(PendingInteraction {
            route: route.to_string(),
            shape: Shape::Response { data },
            token,
            sink,
        })?;
        Ok(interaction)
    }

    /// Request a stream of values. `request_n` defaults to unbounded and is
    /// requested once, up front.
    pub fn request_stream<T>(
        &self,
        route: &str,
        data: &impl Serialize,
        request_n: Option<u32>,
        token: Option<TokenSource>,
    ) -> Result<Interaction<Vec<T>>>
    where
        T: DeserializeOwned + Clone + Send + Sync + 'static,
    {
        let data = self.serialize(data)?;
        let (interaction, sink) = interaction::sequence::<T>(route);
        self.submit(PendingInteraction {
            route: route.to_string(),
            shape: Shape::Stream {
                data,
                request_n: request_n.unwrap_or(MAX_REQUEST_N),
            },
            token,
            sink,
        })?;
        Ok(interaction)
    }

    /// Open a channel. Every outbound item is serialized now; the first is
    /// sent with the request, the rest as the responder asks for them.
    pub fn channel<T, I>(
        &self,
        route: &str,
        items: impl IntoIterator<Item = I>,
        request_n: Option<u32>,
        token: Option<TokenSource>,
    ) -> Result<Interaction<Vec<T>>>
    where
        T: DeserializeOwned + Clone + Send + Sync + 'static,
        I: Serialize,
    {
        let items: VecDeque<Bytes> = items
            .into_iter()
            .map(|item| self.serialize(&item))
            .collect::<Result<_>>()?;
        let (interaction, sink) = interaction::sequence::<T>(route);
        self.submit(PendingInteraction {
            route: route.to_string(),
            shape: Shape::Channel {
                items,
                request_n: request_n.unwrap_or(MAX_REQUEST_N),
            },
            token,
            sink,
        })?;
        Ok(interaction)
    }

    /// Send without expecting a response. Never queued: fails with
    /// [`ClientError::NotConnected`] unless connected when the frame is
    /// written. Resolves once the frame is written or has failed to be.
    pub async fn fire_and_forget(
        &self,
        route: &str,
        data: &impl Serialize,
        token: Option<TokenSource>,
    ) -> Result<()> {
        if !self.is_connected() {
            return Err(ClientError::NotConnected);
        }
        let data = self.serialize(data)?;
        let token = token::resolve_effective(token.as_ref(), self.inner.default_token.as_ref());
        let metadata = metadata::compose(route, token.as_deref())?;
        let metadata = self.inner.metadata_serializer.serialize(metadata);

        let (sent, written) = oneshot::channel();
        self.send(Command::Fire {
            route: route.to_string(),
            payload: Payload::with_metadata(data, metadata),
            sent,
        })?;
        written.await.map_err(|_| ClientError::Shutdown)?
    }

    /// Tap the raw inbound frames of the current connection.
    pub async fn inbound_frames(&self) -> Result<FrameObserver> {
        let (reply, observer) = oneshot::channel();
        self.send(Command::InboundFrames { reply })?;
        observer.await.map_err(|_| ClientError::Shutdown)
    }

    /// Cancel active interactions, close the connection and stop reconnecting.
    /// Queued interactions are kept for a later [`reconnect`](Self::reconnect).
    pub async fn disconnect(&self) {
        let (done, finished) = oneshot::channel();
        if self.send(Command::Disconnect { done }).is_ok() {
            let _ = finished.await;
        }
    }

    /// Restart the session with a fresh attempt budget.
    pub fn reconnect(&self) -> Result<()> {
        self.send(Command::Reconnect)
    }

    fn serialize(&self, data: &impl Serialize) -> Result<Bytes> {
        let value = serde_json::to_value(data)?;
        Ok(self.inner.serializer.serialize(&value)?)
    }

    fn submit(&self, interaction: PendingInteraction) -> Result<()> {
        self.send(Command::Submit(interaction))
    }

    fn send(&self, command: Command) -> Result<()> {
        self.inner
            .commands
            .send(command)
            .map_err(|_| ClientError::Shutdown)
    }
}
