//! The session task: the only owner of the transport, the multiplexer and the
//! reconnection controller.
//!
//! Client handles talk to it through [`Command`]s. Every state change happens
//! on this task, between awaits, so none of the state needs locking.

use std::time::Duration;

use bytes::Bytes;
use rsmux_frame::kind::MAX_U31;
use rsmux_frame::{error_code_name, Frame, FrameBody, Payload};
use rsmux_transport::{ConnectionStatus, DuplexTransport, FrameObserver};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, trace, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::metadata;
use crate::multiplexer::{Multiplexer, PendingInteraction};
use crate::reconnect::{ReconnectController, ReconnectDecision, ReconnectState};
use crate::token;

const MIN_KEEP_ALIVE: Duration = Duration::from_millis(1);

pub(crate) enum Command {
    Submit(PendingInteraction),
    Fire {
        route: String,
        payload: Payload,
        sent: oneshot::Sender<Result<()>>,
    },
    InboundFrames {
        reply: oneshot::Sender<FrameObserver>,
    },
    Disconnect {
        done: oneshot::Sender<()>,
    },
    Reconnect,
}

pub(crate) struct Session {
    config: ClientConfig,
    transport: DuplexTransport,
    mux: Multiplexer,
    reconnect: ReconnectController,
    reconnect_state: watch::Sender<ReconnectState>,
    commands: mpsc::UnboundedReceiver<Command>,
    keepalive: Interval,
    last_received: Instant,
    retry_at: Option<Instant>,
    /// Generation whose end has already been handled.
    settled_generation: u64,
    /// Set by an explicit disconnect; suppresses reconnection.
    stopped: bool,
}

impl Session {
    pub(crate) fn new(
        config: ClientConfig,
        transport: DuplexTransport,
        commands: mpsc::UnboundedReceiver<Command>,
        reconnect_state: watch::Sender<ReconnectState>,
    ) -> Self {
        let mut keepalive = time::interval(config.keep_alive.max(MIN_KEEP_ALIVE));
        keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            mux: Multiplexer::new(
                config.data_serializer.clone(),
                config.metadata_serializer.clone(),
            ),
            reconnect: ReconnectController::new(config.reconnect_policy()),
            config,
            transport,
            reconnect_state,
            commands,
            keepalive,
            last_received: Instant::now(),
            retry_at: None,
            settled_generation: 0,
            stopped: false,
        }
    }

    pub(crate) async fn run(mut self) {
        self.establish().await;
        loop {
            self.sync_connection();
            let live = self.transport.is_connected();
            let retry_at = self.retry_at;
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => {
                        debug!("all client handles dropped");
                        self.disconnect().await;
                        break;
                    }
                },
                frame = self.transport.next_frame(), if live => {
                    if let Some(frame) = frame {
                        self.handle_frame(frame).await;
                    }
                }
                _ = time::sleep_until(retry_at.unwrap_or_else(Instant::now)), if retry_at.is_some() => {
                    self.retry_at = None;
                    self.establish().await;
                }
                _ = self.keepalive.tick(), if live => self.on_keepalive_tick().await,
            }
        }
        debug!("session stopped");
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Submit(interaction) => {
                if self.transport.is_connected() {
                    self.dispatch(interaction).await;
                } else {
                    self.mux.enqueue(interaction);
                }
            }
            Command::Fire {
                route,
                payload,
                sent,
            } => {
                let result = self.fire(payload).await;
                if let Err(err) = &result {
                    warn!(route = %route, error = %err, "fire-and-forget not sent");
                }
                let _ = sent.send(result);
            }
            Command::InboundFrames { reply } => {
                let _ = reply.send(self.transport.subscribe_frames());
            }
            Command::Disconnect { done } => {
                self.disconnect().await;
                let _ = done.send(());
            }
            Command::Reconnect => {
                self.stopped = false;
                self.retry_at = None;
                self.reconnect.reset();
                self.publish_reconnect_state();
                if !self.transport.is_connected() {
                    self.establish().await;
                }
            }
        }
    }

    /// Open a socket. Success runs the connected sequence; failure is picked
    /// up by `sync_connection`.
    async fn establish(&mut self) {
        let opened = match self.transport.status() {
            ConnectionStatus::NotConnected => self.transport.connect().await,
            _ => self.transport.reconnect().await,
        };
        match opened {
            Ok(()) => self.on_connected().await,
            Err(err) => debug!(error = %err, "connection attempt failed"),
        }
    }

    async fn on_connected(&mut self) {
        self.reconnect.reset();
        self.publish_reconnect_state();
        self.mux.begin_generation();
        self.last_received = Instant::now();
        self.keepalive.reset();

        let setup = match self.setup_frame() {
            Ok(setup) => setup,
            Err(err) => {
                self.transport.fail(format!("failed to build SETUP: {err}"));
                return;
            }
        };
        if let Err(err) = self.transport.send(&setup).await {
            warn!(error = %err, "failed to send SETUP");
            return;
        }
        self.drain_pending().await;
    }

    fn setup_frame(&self) -> std::result::Result<Frame, rsmux_frame::FrameError> {
        let mut setup = rsmux_frame::Setup::new(
            duration_ms(self.config.keep_alive),
            duration_ms(self.config.lifetime),
            self.config.metadata_mime_type.clone(),
            self.config.data_mime_type.clone(),
        );
        let token = token::resolve(self.config.token.as_ref());
        setup.payload.metadata = metadata::setup_metadata(token.as_deref())?
            .map(|metadata| self.config.metadata_serializer.serialize(metadata));
        Ok(Frame::setup(setup))
    }

    /// Dispatch the queue in order. Interactions submitted meanwhile queue
    /// behind it; if the connection drops mid-drain the rest is kept.
    async fn drain_pending(&mut self) {
        let mut queue = self.mux.take_pending();
        if !queue.is_empty() {
            debug!(count = queue.len(), "dispatching queued interactions");
        }
        while let Some(interaction) = queue.pop_front() {
            if !self.transport.is_connected() {
                queue.push_front(interaction);
                break;
            }
            self.dispatch(interaction).await;
        }
        if !queue.is_empty() {
            self.mux.restore_pending(queue);
        }
    }

    async fn dispatch(&mut self, interaction: PendingInteraction) {
        let Some((stream_id, frame)) = self.mux.open(interaction, self.config.token.as_ref())
        else {
            return;
        };
        if let Err(err) = self.transport.send(&frame).await {
            self.mux.fail_stream(stream_id, &err.to_string());
        }
    }

    async fn fire(&mut self, payload: Payload) -> Result<()> {
        if !self.transport.is_connected() {
            return Err(ClientError::NotConnected);
        }
        let frame = self.mux.fire_and_forget(payload);
        self.transport.send(&frame).await?;
        Ok(())
    }

    async fn handle_frame(&mut self, frame: Frame) {
        self.last_received = Instant::now();
        if frame.stream_id == 0 {
            self.handle_connection_frame(frame).await;
            return;
        }
        for reply in self.mux.handle_frame(frame) {
            if self.transport.send(&reply).await.is_err() {
                break;
            }
        }
    }

    async fn handle_connection_frame(&mut self, frame: Frame) {
        match frame.body {
            FrameBody::KeepAlive {
                respond: true,
                data,
                ..
            } => {
                trace!("answering keepalive");
                let _ = self.transport.send(&Frame::keepalive(false, data)).await;
            }
            FrameBody::KeepAlive { .. } => trace!("keepalive received"),
            FrameBody::Error { code, message } => {
                warn!(code = error_code_name(code), %message, "connection error from server");
                self.transport
                    .fail(format!("{message} ({})", error_code_name(code)));
            }
            other => debug!(body = ?other, "ignoring connection-level frame"),
        }
    }

    async fn on_keepalive_tick(&mut self) {
        if self.last_received.elapsed() > self.config.lifetime {
            warn!(lifetime = ?self.config.lifetime, "no frames from server within lifetime");
            self.transport.fail("keep-alive lifetime exceeded");
            return;
        }
        let _ = self.transport.send(&Frame::keepalive(true, Bytes::new())).await;
    }

    /// React once to the end of the current generation.
    fn sync_connection(&mut self) {
        let generation = self.transport.generation();
        if generation == self.settled_generation || !self.transport.status().is_terminal() {
            return;
        }
        self.settled_generation = generation;

        let cancelled = self.mux.cancel_all();
        if !cancelled.is_empty() {
            info!(count = cancelled.len(), "cancelled interactions of lost connection");
        }
        if !self.stopped {
            self.schedule_retry();
        }
    }

    fn schedule_retry(&mut self) {
        match self.reconnect.record_failure() {
            ReconnectDecision::Retry { attempt, delay } => {
                info!(
                    attempt,
                    max_attempts = self.reconnect.policy().max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "scheduling reconnect"
                );
                self.retry_at = Some(Instant::now() + delay);
            }
            ReconnectDecision::Exhausted { attempts } => {
                error!(attempts, "reconnection attempts exhausted, giving up");
            }
        }
        self.publish_reconnect_state();
    }

    async fn disconnect(&mut self) {
        self.stopped = true;
        self.retry_at = None;

        let cancelled = self.mux.cancel_all();
        if self.transport.is_connected() {
            for stream_id in &cancelled {
                if self.transport.send(&Frame::cancel(*stream_id)).await.is_err() {
                    break;
                }
            }
        }
        info!(
            cancelled = cancelled.len(),
            queued = self.mux.pending_count(),
            "disconnecting"
        );
        self.transport.close().await;
        self.settled_generation = self.transport.generation();
    }

    fn publish_reconnect_state(&self) {
        self.reconnect_state.send_replace(self.reconnect.state());
    }
}

fn duration_ms(duration: Duration) -> u32 {
    u32::try_from(duration.as_millis())
        .unwrap_or(u32::MAX)
        .clamp(1, MAX_U31)
}
