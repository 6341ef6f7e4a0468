//! RSocket frame codec.
//!
//! Frames are encoded as a 6-byte header (31-bit stream id, 6-bit type,
//! 10 flag bits) followed by a type-specific body. Message transports such as
//! WebSocket carry one frame per message; stream transports such as TCP
//! prefix every frame with a 24-bit length.
//!
//! The [`metadata`] module builds the composite metadata attached to each
//! request: a routing entry, optionally followed by an authentication entry.

pub mod codec;
pub mod error;
pub mod kind;
pub mod metadata;
pub mod mime;

pub use codec::{
    decode_frame, decode_frame_length_prefixed, encode_frame, encode_frame_length_prefixed, Frame,
    FrameBody, FrameConfig, Payload, Setup, DEFAULT_MAX_FRAME_SIZE, HEADER_SIZE,
    LENGTH_PREFIX_SIZE, MAX_FRAME_LENGTH,
};
pub use error::{FrameError, Result};
pub use kind::{error_code_name, FrameType, MAX_REQUEST_N};
pub use metadata::{
    decode_auth, decode_composite_metadata, decode_routes, encode_bearer_auth,
    encode_composite_metadata, encode_custom_auth, encode_route, encode_routes,
    encode_simple_auth, Authentication, CompositeMetadataEntry,
};
pub use mime::{MimeType, WellKnownMimeType};
