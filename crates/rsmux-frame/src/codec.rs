use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};
use crate::kind::{
    FrameType, FLAGS_MASK, FLAG_COMPLETE, FLAG_LEASE, FLAG_METADATA, FLAG_NEXT, FLAG_RESPOND,
    FLAG_RESUME_ENABLE, MAX_U31,
};

/// Frame header: stream id (4) + type and flags (2) = 6 bytes.
pub const HEADER_SIZE: usize = 6;

/// Length prefix used by stream transports: 3 bytes, big-endian.
pub const LENGTH_PREFIX_SIZE: usize = 3;

/// Largest value a 24-bit length field can carry.
pub const MAX_FRAME_LENGTH: usize = 0x00FF_FFFF;

/// Default maximum frame size: the 24-bit limit (16 MiB - 1).
pub const DEFAULT_MAX_FRAME_SIZE: usize = MAX_FRAME_LENGTH;

const MAX_KEEPALIVE_POSITION: u64 = 0x7FFF_FFFF_FFFF_FFFF;

/// Data plus optional metadata, as carried by request and payload frames.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Payload {
    /// Metadata, present when the METADATA flag is set.
    pub metadata: Option<Bytes>,
    /// Application data.
    pub data: Bytes,
}

impl Payload {
    /// A payload with data and no metadata.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            metadata: None,
            data: data.into(),
        }
    }

    /// A payload with both data and metadata.
    pub fn with_metadata(data: impl Into<Bytes>, metadata: impl Into<Bytes>) -> Self {
        Self {
            metadata: Some(metadata.into()),
            data: data.into(),
        }
    }
}

/// Contents of a SETUP frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Setup {
    pub major_version: u16,
    pub minor_version: u16,
    /// Milliseconds between client KEEPALIVE frames.
    pub keepalive_interval_ms: u32,
    /// Milliseconds without a KEEPALIVE before the peer is considered dead.
    pub max_lifetime_ms: u32,
    pub resume_token: Option<Bytes>,
    pub lease: bool,
    pub metadata_mime_type: String,
    pub data_mime_type: String,
    pub payload: Payload,
}

impl Setup {
    /// A protocol 1.0 setup without resumption or leasing.
    pub fn new(
        keepalive_interval_ms: u32,
        max_lifetime_ms: u32,
        metadata_mime_type: impl Into<String>,
        data_mime_type: impl Into<String>,
    ) -> Self {
        Self {
            major_version: 1,
            minor_version: 0,
            keepalive_interval_ms,
            max_lifetime_ms,
            resume_token: None,
            lease: false,
            metadata_mime_type: metadata_mime_type.into(),
            data_mime_type: data_mime_type.into(),
            payload: Payload::default(),
        }
    }
}

/// Frame-type specific contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameBody {
    Setup(Setup),
    KeepAlive {
        respond: bool,
        last_received_position: u64,
        data: Bytes,
    },
    RequestResponse(Payload),
    RequestFnf(Payload),
    RequestStream {
        initial_request_n: u32,
        payload: Payload,
    },
    RequestChannel {
        initial_request_n: u32,
        complete: bool,
        payload: Payload,
    },
    RequestN(u32),
    Cancel,
    Payload {
        next: bool,
        complete: bool,
        payload: Payload,
    },
    Error {
        code: u32,
        message: String,
    },
    MetadataPush(Bytes),
}

/// A single protocol frame addressed to a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Stream the frame belongs to; 0 is the connection itself.
    pub stream_id: u32,
    pub body: FrameBody,
}

impl Frame {
    /// Create a new frame.
    pub fn new(stream_id: u32, body: FrameBody) -> Self {
        Self { stream_id, body }
    }

    pub fn setup(setup: Setup) -> Self {
        Self::new(0, FrameBody::Setup(setup))
    }

    pub fn keepalive(respond: bool, data: impl Into<Bytes>) -> Self {
        Self::new(
            0,
            FrameBody::KeepAlive {
                respond,
                last_received_position: 0,
                data: data.into(),
            },
        )
    }

    pub fn request_n(stream_id: u32, n: u32) -> Self {
        Self::new(stream_id, FrameBody::RequestN(n))
    }

    pub fn cancel(stream_id: u32) -> Self {
        Self::new(stream_id, FrameBody::Cancel)
    }

    /// A PAYLOAD frame carrying a value, optionally completing the stream.
    pub fn next(stream_id: u32, payload: Payload, complete: bool) -> Self {
        Self::new(
            stream_id,
            FrameBody::Payload {
                next: true,
                complete,
                payload,
            },
        )
    }

    /// A PAYLOAD frame that only completes the stream.
    pub fn complete(stream_id: u32) -> Self {
        Self::new(
            stream_id,
            FrameBody::Payload {
                next: false,
                complete: true,
                payload: Payload::default(),
            },
        )
    }

    pub fn error(stream_id: u32, code: u32, message: impl Into<String>) -> Self {
        Self::new(
            stream_id,
            FrameBody::Error {
                code,
                message: message.into(),
            },
        )
    }

    /// The wire type of this frame.
    pub fn frame_type(&self) -> FrameType {
        match &self.body {
            FrameBody::Setup(_) => FrameType::Setup,
            FrameBody::KeepAlive { .. } => FrameType::KeepAlive,
            FrameBody::RequestResponse(_) => FrameType::RequestResponse,
            FrameBody::RequestFnf(_) => FrameType::RequestFnf,
            FrameBody::RequestStream { .. } => FrameType::RequestStream,
            FrameBody::RequestChannel { .. } => FrameType::RequestChannel,
            FrameBody::RequestN(_) => FrameType::RequestN,
            FrameBody::Cancel => FrameType::Cancel,
            FrameBody::Payload { .. } => FrameType::Payload,
            FrameBody::Error { .. } => FrameType::Error,
            FrameBody::MetadataPush(_) => FrameType::MetadataPush,
        }
    }

    fn flags(&self) -> u16 {
        fn metadata_flag(payload: &Payload) -> u16 {
            if payload.metadata.is_some() {
                FLAG_METADATA
            } else {
                0
            }
        }
        fn flag_if(set: bool, flag: u16) -> u16 {
            if set {
                flag
            } else {
                0
            }
        }

        match &self.body {
            FrameBody::Setup(setup) => {
                metadata_flag(&setup.payload)
                    | flag_if(setup.resume_token.is_some(), FLAG_RESUME_ENABLE)
                    | flag_if(setup.lease, FLAG_LEASE)
            }
            FrameBody::KeepAlive { respond, .. } => flag_if(*respond, FLAG_RESPOND),
            FrameBody::RequestResponse(payload)
            | FrameBody::RequestFnf(payload)
            | FrameBody::RequestStream { payload, .. } => metadata_flag(payload),
            FrameBody::RequestChannel {
                complete, payload, ..
            } => metadata_flag(payload) | flag_if(*complete, FLAG_COMPLETE),
            FrameBody::Payload {
                next,
                complete,
                payload,
            } => {
                metadata_flag(payload)
                    | flag_if(*next, FLAG_NEXT)
                    | flag_if(*complete, FLAG_COMPLETE)
            }
            FrameBody::MetadataPush(_) => FLAG_METADATA,
            FrameBody::RequestN(_) | FrameBody::Cancel | FrameBody::Error { .. } => 0,
        }
    }
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌───┬──────────────────┬──────────┬──────────┬────────────────────────┐
/// │ 0 │ Stream ID (31b)  │ Type (6b)│ Flags    │ Frame-type body         │
/// │   │ big-endian       │          │ (10b)    │ (metadata length 24b)   │
/// └───┴──────────────────┴──────────┴──────────┴────────────────────────┘
/// ```
///
/// On error nothing is appended to `dst`.
pub fn encode_frame(frame: &Frame, dst: &mut BytesMut) -> Result<()> {
    let start = dst.len();
    let result = encode_into(frame, dst);
    if result.is_err() {
        dst.truncate(start);
    }
    result
}

fn encode_into(frame: &Frame, dst: &mut BytesMut) -> Result<()> {
    let type_and_flags = (u16::from(frame.frame_type().tag()) << 10) | (frame.flags() & FLAGS_MASK);
    dst.put_u32(frame.stream_id & MAX_U31);
    dst.put_u16(type_and_flags);

    match &frame.body {
        FrameBody::Setup(setup) => {
            dst.put_u16(setup.major_version);
            dst.put_u16(setup.minor_version);
            dst.put_u32(setup.keepalive_interval_ms & MAX_U31);
            dst.put_u32(setup.max_lifetime_ms & MAX_U31);
            if let Some(token) = &setup.resume_token {
                if token.len() > usize::from(u16::MAX) {
                    return Err(FrameError::FieldTooLong {
                        field: "resume token",
                        len: token.len(),
                        max: usize::from(u16::MAX),
                    });
                }
                dst.put_u16(token.len() as u16);
                dst.put_slice(token);
            }
            put_mime_type(dst, &setup.metadata_mime_type)?;
            put_mime_type(dst, &setup.data_mime_type)?;
            put_payload(dst, &setup.payload)?;
        }
        FrameBody::KeepAlive {
            last_received_position,
            data,
            ..
        } => {
            dst.put_u64(*last_received_position & MAX_KEEPALIVE_POSITION);
            dst.put_slice(data);
        }
        FrameBody::RequestResponse(payload) | FrameBody::RequestFnf(payload) => {
            put_payload(dst, payload)?;
        }
        FrameBody::RequestStream {
            initial_request_n,
            payload,
        }
        | FrameBody::RequestChannel {
            initial_request_n,
            payload,
            ..
        } => {
            dst.put_u32((*initial_request_n).min(MAX_U31));
            put_payload(dst, payload)?;
        }
        FrameBody::RequestN(n) => dst.put_u32((*n).min(MAX_U31)),
        FrameBody::Cancel => {}
        FrameBody::Payload { payload, .. } => put_payload(dst, payload)?,
        FrameBody::Error { code, message } => {
            dst.put_u32(*code);
            dst.put_slice(message.as_bytes());
        }
        FrameBody::MetadataPush(metadata) => dst.put_slice(metadata),
    }
    Ok(())
}

fn put_mime_type(dst: &mut BytesMut, mime_type: &str) -> Result<()> {
    if mime_type.is_empty() || !mime_type.is_ascii() {
        return Err(FrameError::InvalidMimeType(mime_type.to_string()));
    }
    if mime_type.len() > usize::from(u8::MAX) {
        return Err(FrameError::FieldTooLong {
            field: "mime type",
            len: mime_type.len(),
            max: usize::from(u8::MAX),
        });
    }
    dst.put_u8(mime_type.len() as u8);
    dst.put_slice(mime_type.as_bytes());
    Ok(())
}

fn put_payload(dst: &mut BytesMut, payload: &Payload) -> Result<()> {
    if let Some(metadata) = &payload.metadata {
        if metadata.len() > MAX_FRAME_LENGTH {
            return Err(FrameError::FieldTooLong {
                field: "metadata",
                len: metadata.len(),
                max: MAX_FRAME_LENGTH,
            });
        }
        dst.put_uint(metadata.len() as u64, 3);
        dst.put_slice(metadata);
    }
    dst.put_slice(&payload.data);
    Ok(())
}

/// Decode one complete frame (one socket message on message transports).
pub fn decode_frame(mut src: Bytes) -> Result<Frame> {
    ensure(&src, HEADER_SIZE, "frame header")?;
    let stream_id = src.get_u32() & MAX_U31;
    let type_and_flags = src.get_u16();
    let frame_type = FrameType::from_tag((type_and_flags >> 10) as u8)?;
    let flags = type_and_flags & FLAGS_MASK;
    let has_metadata = flags & FLAG_METADATA != 0;

    let body = match frame_type {
        FrameType::Setup => {
            ensure(&src, 12, "setup header")?;
            let major_version = src.get_u16();
            let minor_version = src.get_u16();
            let keepalive_interval_ms = src.get_u32() & MAX_U31;
            let max_lifetime_ms = src.get_u32() & MAX_U31;
            let resume_token = if flags & FLAG_RESUME_ENABLE != 0 {
                ensure(&src, 2, "resume token length")?;
                let len = usize::from(src.get_u16());
                ensure(&src, len, "resume token")?;
                Some(src.split_to(len))
            } else {
                None
            };
            let metadata_mime_type = take_mime_type(&mut src, "metadata mime type")?;
            let data_mime_type = take_mime_type(&mut src, "data mime type")?;
            FrameBody::Setup(Setup {
                major_version,
                minor_version,
                keepalive_interval_ms,
                max_lifetime_ms,
                resume_token,
                lease: flags & FLAG_LEASE != 0,
                metadata_mime_type,
                data_mime_type,
                payload: take_payload(src, has_metadata)?,
            })
        }
        FrameType::KeepAlive => {
            ensure(&src, 8, "keepalive position")?;
            let last_received_position = src.get_u64() & MAX_KEEPALIVE_POSITION;
            FrameBody::KeepAlive {
                respond: flags & FLAG_RESPOND != 0,
                last_received_position,
                data: src,
            }
        }
        FrameType::RequestResponse => FrameBody::RequestResponse(take_payload(src, has_metadata)?),
        FrameType::RequestFnf => FrameBody::RequestFnf(take_payload(src, has_metadata)?),
        FrameType::RequestStream => {
            ensure(&src, 4, "initial request n")?;
            let initial_request_n = src.get_u32() & MAX_U31;
            FrameBody::RequestStream {
                initial_request_n,
                payload: take_payload(src, has_metadata)?,
            }
        }
        FrameType::RequestChannel => {
            ensure(&src, 4, "initial request n")?;
            let initial_request_n = src.get_u32() & MAX_U31;
            FrameBody::RequestChannel {
                initial_request_n,
                complete: flags & FLAG_COMPLETE != 0,
                payload: take_payload(src, has_metadata)?,
            }
        }
        FrameType::RequestN => {
            ensure(&src, 4, "request n")?;
            FrameBody::RequestN(src.get_u32() & MAX_U31)
        }
        FrameType::Cancel => FrameBody::Cancel,
        FrameType::Payload => FrameBody::Payload {
            next: flags & FLAG_NEXT != 0,
            complete: flags & FLAG_COMPLETE != 0,
            payload: take_payload(src, has_metadata)?,
        },
        FrameType::Error => {
            ensure(&src, 4, "error code")?;
            let code = src.get_u32();
            let message = String::from_utf8(src.to_vec())
                .map_err(|_| FrameError::InvalidUtf8("error message"))?;
            FrameBody::Error { code, message }
        }
        FrameType::MetadataPush => FrameBody::MetadataPush(src),
        FrameType::Lease | FrameType::Resume | FrameType::ResumeOk | FrameType::Ext => {
            return Err(FrameError::UnsupportedFrameType(frame_type.name()));
        }
    };

    Ok(Frame { stream_id, body })
}

pub(crate) fn ensure(src: &Bytes, needed: usize, field: &'static str) -> Result<()> {
    if src.remaining() < needed {
        return Err(FrameError::Truncated {
            field,
            needed,
            remaining: src.remaining(),
        });
    }
    Ok(())
}

fn take_mime_type(src: &mut Bytes, field: &'static str) -> Result<String> {
    ensure(src, 1, field)?;
    let len = usize::from(src.get_u8());
    ensure(src, len, field)?;
    let raw = src.split_to(len);
    String::from_utf8(raw.to_vec()).map_err(|_| FrameError::InvalidUtf8(field))
}

fn take_payload(mut src: Bytes, has_metadata: bool) -> Result<Payload> {
    let metadata = if has_metadata {
        ensure(&src, 3, "metadata length")?;
        let len = src.get_uint(3) as usize;
        ensure(&src, len, "metadata")?;
        Some(src.split_to(len))
    } else {
        None
    };
    Ok(Payload {
        metadata,
        data: src,
    })
}

/// Encode a frame preceded by its 24-bit length, for stream transports.
pub fn encode_frame_length_prefixed(frame: &Frame, dst: &mut BytesMut) -> Result<()> {
    let start = dst.len();
    dst.put_bytes(0, LENGTH_PREFIX_SIZE);
    if let Err(err) = encode_frame(frame, dst) {
        dst.truncate(start);
        return Err(err);
    }

    let len = dst.len() - start - LENGTH_PREFIX_SIZE;
    if len > MAX_FRAME_LENGTH {
        dst.truncate(start);
        return Err(FrameError::PayloadTooLarge {
            size: len,
            max: MAX_FRAME_LENGTH,
        });
    }
    dst[start..start + LENGTH_PREFIX_SIZE].copy_from_slice(&(len as u32).to_be_bytes()[1..]);
    Ok(())
}

/// Decode a length-prefixed frame from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes the frame bytes from the buffer.
pub fn decode_frame_length_prefixed(
    src: &mut BytesMut,
    max_frame_size: usize,
) -> Result<Option<Frame>> {
    if src.len() < LENGTH_PREFIX_SIZE {
        return Ok(None);
    }

    let len = (usize::from(src[0]) << 16) | (usize::from(src[1]) << 8) | usize::from(src[2]);
    if len > max_frame_size {
        return Err(FrameError::PayloadTooLarge {
            size: len,
            max: max_frame_size,
        });
    }
    if src.len() < LENGTH_PREFIX_SIZE + len {
        return Ok(None);
    }

    src.advance(LENGTH_PREFIX_SIZE);
    let frame = src.split_to(len).freeze();
    decode_frame(frame).map(Some)
}

/// Configuration for the frame codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum encoded frame size in bytes. Default: 16 MiB - 1.
    pub max_frame_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::{ERROR_APPLICATION_ERROR, MAX_REQUEST_N};

    fn roundtrip(frame: &Frame) -> Frame {
        let mut buf = BytesMut::new();
        encode_frame(frame, &mut buf).unwrap();
        decode_frame(buf.freeze()).unwrap()
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let mut setup = Setup::new(
            60_000,
            180_000,
            "message/x.rsocket.composite-metadata.v0",
            "application/json",
        );
        setup.payload = Payload::with_metadata(Bytes::new(), Bytes::from_static(b"\x81tok"));

        let frames = vec![
            Frame::setup(setup),
            Frame::keepalive(true, Bytes::from_static(b"ping")),
            Frame::new(
                1,
                FrameBody::RequestResponse(Payload::with_metadata(
                    Bytes::from_static(br#"{"msg":"hi"}"#),
                    Bytes::from_static(b"\xfe\x00\x00\x05\x04echo"),
                )),
            ),
            Frame::new(3, FrameBody::RequestFnf(Payload::new("fire"))),
            Frame::new(
                5,
                FrameBody::RequestStream {
                    initial_request_n: MAX_REQUEST_N,
                    payload: Payload::new(Bytes::new()),
                },
            ),
            Frame::new(
                7,
                FrameBody::RequestChannel {
                    initial_request_n: 8,
                    complete: true,
                    payload: Payload::with_metadata("first", Bytes::new()),
                },
            ),
            Frame::request_n(7, 16),
            Frame::cancel(9),
            Frame::next(1, Payload::new("value"), true),
            Frame::complete(5),
            Frame::error(1, ERROR_APPLICATION_ERROR, "boom"),
            Frame::new(0, FrameBody::MetadataPush(Bytes::from_static(b"meta"))),
        ];

        for frame in &frames {
            assert_eq!(&roundtrip(frame), frame, "frame {} did not roundtrip", frame.frame_type());
        }
    }

    #[test]
    fn test_known_wire_bytes() {
        let mut buf = BytesMut::new();
        encode_frame(&Frame::request_n(1, 5), &mut buf).unwrap();
        assert_eq!(buf.as_ref(), &[0, 0, 0, 1, 0x20, 0x00, 0, 0, 0, 5]);

        buf.clear();
        encode_frame(&Frame::cancel(3), &mut buf).unwrap();
        assert_eq!(buf.as_ref(), &[0, 0, 0, 3, 0x24, 0x00]);

        buf.clear();
        encode_frame(&Frame::next(1, Payload::new("x"), true), &mut buf).unwrap();
        assert_eq!(buf.as_ref(), &[0, 0, 0, 1, 0x28, 0x60, b'x']);
    }

    #[test]
    fn test_decode_truncated_header() {
        let result = decode_frame(Bytes::from_static(&[0, 0, 0]));
        assert!(matches!(
            result,
            Err(FrameError::Truncated {
                field: "frame header",
                ..
            })
        ));
    }

    #[test]
    fn test_decode_metadata_longer_than_frame() {
        // REQUEST_RESPONSE with METADATA flag declaring 16 bytes of metadata.
        let bytes = Bytes::from_static(&[0, 0, 0, 1, 0x11, 0x00, 0, 0, 16, b'a']);
        let err = decode_frame(bytes).unwrap_err();
        assert!(err.is_malformed());
        assert!(matches!(err, FrameError::Truncated { field: "metadata", .. }));
    }

    #[test]
    fn test_decode_invalid_type() {
        let bytes = Bytes::from_static(&[0, 0, 0, 1, 0x40, 0x00]);
        let err = decode_frame(bytes).unwrap_err();
        assert!(matches!(err, FrameError::InvalidFrameType(0x10)));
        assert!(err.is_malformed());
    }

    #[test]
    fn test_decode_lease_is_unsupported() {
        let bytes = Bytes::from_static(&[0, 0, 0, 0, 0x08, 0x00, 0, 0, 0, 1, 0, 0, 0, 1]);
        let err = decode_frame(bytes).unwrap_err();
        assert!(matches!(err, FrameError::UnsupportedFrameType("LEASE")));
    }

    #[test]
    fn test_decode_error_message_must_be_utf8() {
        let bytes = Bytes::from_static(&[0, 0, 0, 1, 0x2C, 0x00, 0, 0, 2, 1, 0xFF, 0xFE]);
        assert!(matches!(
            decode_frame(bytes),
            Err(FrameError::InvalidUtf8("error message"))
        ));
    }

    #[test]
    fn test_request_n_clamped_to_31_bits() {
        let decoded = roundtrip(&Frame::request_n(1, u32::MAX));
        assert_eq!(decoded.body, FrameBody::RequestN(MAX_REQUEST_N));
    }

    #[test]
    fn test_encode_rejects_non_ascii_mime_and_leaves_buffer_untouched() {
        let mut buf = BytesMut::from(&b"keep"[..]);
        let frame = Frame::setup(Setup::new(1, 1, "métadata", "application/json"));
        assert!(matches!(
            encode_frame(&frame, &mut buf),
            Err(FrameError::InvalidMimeType(_))
        ));
        assert_eq!(buf.as_ref(), b"keep");
    }

    #[test]
    fn test_length_prefixed_roundtrip_and_partial_input() {
        let mut buf = BytesMut::new();
        encode_frame_length_prefixed(&Frame::request_n(1, 5), &mut buf).unwrap();
        assert_eq!(&buf[..LENGTH_PREFIX_SIZE], &[0, 0, 10]);

        let mut partial = BytesMut::from(&buf[..7]);
        assert!(decode_frame_length_prefixed(&mut partial, DEFAULT_MAX_FRAME_SIZE)
            .unwrap()
            .is_none());
        assert_eq!(partial.len(), 7);

        let frame = decode_frame_length_prefixed(&mut buf, DEFAULT_MAX_FRAME_SIZE)
            .unwrap()
            .unwrap();
        assert_eq!(frame, Frame::request_n(1, 5));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_length_prefixed_multiple_frames() {
        let mut buf = BytesMut::new();
        encode_frame_length_prefixed(&Frame::cancel(1), &mut buf).unwrap();
        encode_frame_length_prefixed(&Frame::next(3, Payload::new("two"), false), &mut buf)
            .unwrap();

        let first = decode_frame_length_prefixed(&mut buf, DEFAULT_MAX_FRAME_SIZE)
            .unwrap()
            .unwrap();
        let second = decode_frame_length_prefixed(&mut buf, DEFAULT_MAX_FRAME_SIZE)
            .unwrap()
            .unwrap();
        assert_eq!(first, Frame::cancel(1));
        assert_eq!(second, Frame::next(3, Payload::new("two"), false));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_length_prefixed_too_large() {
        let mut buf = BytesMut::from(&[0x01, 0x00, 0x00][..]);
        let result = decode_frame_length_prefixed(&mut buf, 1024);
        assert!(matches!(
            result,
            Err(FrameError::PayloadTooLarge {
                size: 65536,
                max: 1024
            })
        ));
    }
}
