//! Interaction bookkeeping: the pending queue, active streams and their
//! frames. Pure state; the session does all I/O.

use std::collections::{HashMap, VecDeque};
use std::mem;
use std::sync::Arc;

use bytes::Bytes;
use rsmux_frame::{error_code_name, Frame, FrameBody, Payload, MAX_REQUEST_N};
use tracing::{debug, trace, warn};

use crate::interaction::InboundSink;
use crate::metadata;
use crate::serializer::{MetadataSerializer, Serializer};
use crate::token::{resolve_effective, TokenSource};

/// Shape-specific part of a queued interaction.
pub(crate) enum Shape {
    Response {
        data: Bytes,
    },
    Stream {
        data: Bytes,
        request_n: u32,
    },
    /// Every outbound item, materialized before dispatch.
    Channel {
        items: VecDeque<Bytes>,
        request_n: u32,
    },
}

/// An interaction waiting for a connection. Metadata is built when it is
/// dispatched, so the token is resolved at that point.
pub(crate) struct PendingInteraction {
    pub route: String,
    pub shape: Shape,
    pub token: Option<TokenSource>,
    pub sink: Box<dyn InboundSink>,
}

struct Outbound {
    items: VecDeque<Bytes>,
    credits: u64,
    done: bool,
}

struct ActiveStream {
    route: String,
    sink: Box<dyn InboundSink>,
    single: bool,
    inbound_done: bool,
    outbound: Option<Outbound>,
}

impl ActiveStream {
    fn outbound_open(&self) -> bool {
        self.outbound.as_ref().is_some_and(|outbound| !outbound.done)
    }
}

pub(crate) struct Multiplexer {
    serializer: Arc<dyn Serializer>,
    metadata_serializer: Arc<dyn MetadataSerializer>,
    pending: VecDeque<PendingInteraction>,
    active: HashMap<u32, ActiveStream>,
    next_stream_id: u32,
}

impl Multiplexer {
    pub fn new(
        serializer: Arc<dyn Serializer>,
        metadata_serializer: Arc<dyn MetadataSerializer>,
    ) -> Self {
        Self {
            serializer,
            metadata_serializer,
            pending: VecDeque::new(),
            active: HashMap::new(),
            next_stream_id: 1,
        }
    }

    pub fn enqueue(&mut self, interaction: PendingInteraction) {
        debug!(route = %interaction.route, queued = self.pending.len() + 1, "interaction queued");
        self.pending.push_back(interaction);
    }

    /// Take the whole queue. Interactions enqueued afterwards land in a fresh one.
    pub fn take_pending(&mut self) -> VecDeque<PendingInteraction> {
        mem::take(&mut self.pending)
    }

    /// Put back the undispatched rest of a drain, ahead of anything queued since.
    pub fn restore_pending(&mut self, mut remaining: VecDeque<PendingInteraction>) {
        remaining.extend(self.pending.drain(..));
        self.pending = remaining;
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    #[cfg(test)]
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Start numbering streams for a new connection.
    pub fn begin_generation(&mut self) {
        self.next_stream_id = 1;
    }

    fn allocate_stream_id(&mut self) -> u32 {
        loop {
            let id = self.next_stream_id;
            self.next_stream_id = if id >= MAX_REQUEST_N - 1 { 1 } else { id + 2 };
            if !self.active.contains_key(&id) {
                return id;
            }
        }
    }

    /// Build the request frame for `interaction` and register it as active.
    ///
    /// A metadata encoding failure settles the interaction as failed and
    /// returns `None`.
    pub fn open(
        &mut self,
        interaction: PendingInteraction,
        default_token: Option<&TokenSource>,
    ) -> Option<(u32, Frame)> {
        let PendingInteraction {
            route,
            shape,
            token,
            mut sink,
        } = interaction;

        let token = resolve_effective(token.as_ref(), default_token);
        let metadata = match metadata::compose(&route, token.as_deref()) {
            Ok(metadata) => self.metadata_serializer.serialize(metadata),
            Err(err) => {
                sink.on_error(&err.to_string());
                return None;
            }
        };

        let stream_id = self.allocate_stream_id();
        let (body, single, outbound) = match shape {
            Shape::Response { data } => (
                FrameBody::RequestResponse(Payload::with_metadata(data, metadata)),
                true,
                None,
            ),
            Shape::Stream { data, request_n } => (
                FrameBody::RequestStream {
                    initial_request_n: clamp_request_n(request_n),
                    payload: Payload::with_metadata(data, metadata),
                },
                false,
                None,
            ),
            Shape::Channel {
                mut items,
                request_n,
            } => {
                let first = items.pop_front().unwrap_or_default();
                let complete = items.is_empty();
                let body = FrameBody::RequestChannel {
                    initial_request_n: clamp_request_n(request_n),
                    complete,
                    payload: Payload::with_metadata(first, metadata),
                };
                let outbound = Outbound {
                    items,
                    credits: 0,
                    done: complete,
                };
                (body, false, Some(outbound))
            }
        };

        sink.on_subscribe();
        debug!(stream_id, %route, "interaction dispatched");
        self.active.insert(
            stream_id,
            ActiveStream {
                route,
                sink,
                single,
                inbound_done: false,
                outbound,
            },
        );
        Some((stream_id, Frame::new(stream_id, body)))
    }

    /// Build a fire-and-forget frame. Nothing is registered.
    pub fn fire_and_forget(&mut self, payload: Payload) -> Frame {
        let stream_id = self.allocate_stream_id();
        Frame::new(stream_id, FrameBody::RequestFnf(payload))
    }

    /// Settle a stream whose request could not be written.
    pub fn fail_stream(&mut self, stream_id: u32, message: &str) {
        if let Some(mut stream) = self.active.remove(&stream_id) {
            stream.sink.on_error(message);
        }
    }

    /// Apply an inbound frame for a non-zero stream. Returns frames to send
    /// in reply (outbound channel items).
    pub fn handle_frame(&mut self, frame: Frame) -> Vec<Frame> {
        let stream_id = frame.stream_id;
        let Some(stream) = self.active.get_mut(&stream_id) else {
            trace!(stream_id, frame_type = %frame.frame_type(), "frame for unknown stream");
            return Vec::new();
        };

        let mut replies = Vec::new();
        match frame.body {
            FrameBody::Payload {
                next,
                complete,
                payload,
            } => {
                if next {
                    match self.serializer.deserialize(payload.data) {
                        Ok(value) => stream.sink.on_next(value),
                        Err(err) => {
                            warn!(stream_id, route = %stream.route, error = %err, "dropping undecodable payload")
                        }
                    }
                }
                if complete || (next && stream.single) {
                    stream.sink.on_complete();
                    stream.inbound_done = true;
                }
            }
            FrameBody::Error { code, message } => {
                let message = format!("{message} ({})", error_code_name(code));
                stream.sink.on_error(&message);
                self.active.remove(&stream_id);
                return replies;
            }
            FrameBody::RequestN(n) => {
                if let Some(outbound) = stream.outbound.as_mut() {
                    outbound.credits = outbound.credits.saturating_add(u64::from(n));
                    while outbound.credits > 0 && !outbound.done {
                        let Some(item) = outbound.items.pop_front() else {
                            replies.push(Frame::complete(stream_id));
                            outbound.done = true;
                            break;
                        };
                        outbound.credits -= 1;
                        let last = outbound.items.is_empty();
                        replies.push(Frame::next(stream_id, Payload::new(item), last));
                        outbound.done = last;
                    }
                }
            }
            FrameBody::Cancel => {
                if let Some(outbound) = stream.outbound.as_mut() {
                    debug!(stream_id, "responder cancelled outbound items");
                    outbound.items.clear();
                    outbound.done = true;
                }
            }
            other => {
                trace!(stream_id, body = ?other, "ignoring frame");
            }
        }

        if stream.inbound_done && !stream.outbound_open() {
            self.active.remove(&stream_id);
        }
        replies
    }

    /// Cancel every active stream locally. Returns their ids.
    pub fn cancel_all(&mut self) -> Vec<u32> {
        let mut ids = Vec::with_capacity(self.active.len());
        for (stream_id, mut stream) in self.active.drain() {
            stream.sink.on_cancel();
            ids.push(stream_id);
        }
        ids.sort_unstable();
        ids
    }
}

fn clamp_request_n(n: u32) -> u32 {
    n.clamp(1, MAX_REQUEST_N)
}
