//! Composite metadata, routing tags and authentication entries.
//!
//! Composite metadata is a sequence of typed entries:
//! ```text
//! ┌──────────────────────────┬──────────────────┬──────────────────┐
//! │ 0x80|id  or  len-1 + MIME │ Length (24b BE)  │ Content          │
//! └──────────────────────────┴──────────────────┴──────────────────┘
//! ```

use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::codec::{ensure, MAX_FRAME_LENGTH};
use crate::error::{FrameError, Result};
use crate::mime::{MimeType, WellKnownMimeType};

const WELL_KNOWN_FLAG: u8 = 0x80;
const MAX_CUSTOM_TYPE_LEN: usize = 128;
const MAX_ROUTE_LEN: usize = u8::MAX as usize;

const AUTH_SIMPLE: u8 = 0x00;
const AUTH_BEARER: u8 = 0x01;

/// One (mime type, content) pair of a composite metadata buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeMetadataEntry {
    pub mime_type: MimeType,
    pub content: Bytes,
}

impl CompositeMetadataEntry {
    pub fn new(mime_type: impl Into<MimeType>, content: impl Into<Bytes>) -> Self {
        Self {
            mime_type: mime_type.into(),
            content: content.into(),
        }
    }
}

/// Encode entries, in order, into a composite metadata buffer.
pub fn encode_composite_metadata(entries: &[CompositeMetadataEntry]) -> Result<Bytes> {
    let mut dst = BytesMut::new();
    for entry in entries {
        match &entry.mime_type {
            MimeType::WellKnown(known) => dst.put_u8(WELL_KNOWN_FLAG | known.id()),
            MimeType::Custom(name) => put_custom_type(&mut dst, "metadata mime type", name)?,
        }
        if entry.content.len() > MAX_FRAME_LENGTH {
            return Err(FrameError::FieldTooLong {
                field: "metadata entry",
                len: entry.content.len(),
                max: MAX_FRAME_LENGTH,
            });
        }
        dst.put_uint(entry.content.len() as u64, 3);
        dst.put_slice(&entry.content);
    }
    Ok(dst.freeze())
}

/// Decode a composite metadata buffer into its entries.
pub fn decode_composite_metadata(mut src: Bytes) -> Result<Vec<CompositeMetadataEntry>> {
    let mut entries = Vec::new();
    while src.has_remaining() {
        let head = src.get_u8();
        let mime_type = if head & WELL_KNOWN_FLAG != 0 {
            let id = head & !WELL_KNOWN_FLAG;
            let known = WellKnownMimeType::from_id(id)
                .ok_or_else(|| FrameError::InvalidMimeType(format!("reserved id 0x{id:02x}")))?;
            MimeType::WellKnown(known)
        } else {
            MimeType::Custom(take_custom_type(&mut src, head, "metadata mime type")?)
        };

        ensure(&src, 3, "metadata entry length")?;
        let len = src.get_uint(3) as usize;
        ensure(&src, len, "metadata entry")?;
        entries.push(CompositeMetadataEntry {
            mime_type,
            content: src.split_to(len),
        });
    }
    Ok(entries)
}

/// Encode a single routing tag.
pub fn encode_route(route: &str) -> Result<Bytes> {
    encode_routes(&[route])
}

/// Encode routing tags as `u8 length + UTF-8` sequences.
pub fn encode_routes<S: AsRef<str>>(routes: &[S]) -> Result<Bytes> {
    let mut dst = BytesMut::new();
    for route in routes {
        let route = route.as_ref();
        if route.len() > MAX_ROUTE_LEN {
            return Err(FrameError::FieldTooLong {
                field: "route",
                len: route.len(),
                max: MAX_ROUTE_LEN,
            });
        }
        dst.put_u8(route.len() as u8);
        dst.put_slice(route.as_bytes());
    }
    Ok(dst.freeze())
}

/// Decode routing tags.
pub fn decode_routes(mut src: Bytes) -> Result<Vec<String>> {
    let mut routes = Vec::new();
    while src.has_remaining() {
        let len = usize::from(src.get_u8());
        ensure(&src, len, "route")?;
        let raw = src.split_to(len);
        routes.push(String::from_utf8(raw.to_vec()).map_err(|_| FrameError::InvalidUtf8("route"))?);
    }
    Ok(routes)
}

/// Authentication metadata content.
#[derive(Clone, PartialEq, Eq)]
pub enum Authentication {
    Simple { username: String, password: String },
    Bearer(String),
    Custom { auth_type: String, payload: Bytes },
}

impl fmt::Debug for Authentication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Authentication::Simple { username, password } => f
                .debug_struct("Simple")
                .field("username", username)
                .field(
                    "password",
                    &format_args!("<redacted:{} bytes>", password.len()),
                )
                .finish(),
            Authentication::Bearer(token) => f
                .debug_tuple("Bearer")
                .field(&format_args!("<redacted:{} bytes>", token.len()))
                .finish(),
            Authentication::Custom { auth_type, payload } => f
                .debug_struct("Custom")
                .field("auth_type", auth_type)
                .field(
                    "payload",
                    &format_args!("<redacted:{} bytes>", payload.len()),
                )
                .finish(),
        }
    }
}

/// Encode a bearer token as authentication metadata.
pub fn encode_bearer_auth(token: &str) -> Bytes {
    let mut dst = BytesMut::with_capacity(1 + token.len());
    dst.put_u8(WELL_KNOWN_FLAG | AUTH_BEARER);
    dst.put_slice(token.as_bytes());
    dst.freeze()
}

/// Encode username/password authentication metadata.
pub fn encode_simple_auth(username: &str, password: &str) -> Result<Bytes> {
    if username.len() > usize::from(u16::MAX) {
        return Err(FrameError::FieldTooLong {
            field: "username",
            len: username.len(),
            max: usize::from(u16::MAX),
        });
    }
    let mut dst = BytesMut::with_capacity(3 + username.len() + password.len());
    dst.put_u8(WELL_KNOWN_FLAG | AUTH_SIMPLE);
    dst.put_u16(username.len() as u16);
    dst.put_slice(username.as_bytes());
    dst.put_slice(password.as_bytes());
    Ok(dst.freeze())
}

/// Encode authentication metadata with an application-defined auth type.
pub fn encode_custom_auth(auth_type: &str, payload: &[u8]) -> Result<Bytes> {
    let mut dst = BytesMut::new();
    put_custom_type(&mut dst, "auth type", auth_type)?;
    dst.put_slice(payload);
    Ok(dst.freeze())
}

/// Decode authentication metadata.
pub fn decode_auth(mut src: Bytes) -> Result<Authentication> {
    ensure(&src, 1, "auth type")?;
    let head = src.get_u8();
    if head & WELL_KNOWN_FLAG == 0 {
        let auth_type = take_custom_type(&mut src, head, "auth type")?;
        return Ok(Authentication::Custom {
            auth_type,
            payload: src,
        });
    }

    match head & !WELL_KNOWN_FLAG {
        AUTH_BEARER => {
            let token = String::from_utf8(src.to_vec())
                .map_err(|_| FrameError::InvalidUtf8("bearer token"))?;
            Ok(Authentication::Bearer(token))
        }
        AUTH_SIMPLE => {
            ensure(&src, 2, "username length")?;
            let len = usize::from(src.get_u16());
            ensure(&src, len, "username")?;
            let username = String::from_utf8(src.split_to(len).to_vec())
                .map_err(|_| FrameError::InvalidUtf8("username"))?;
            let password = String::from_utf8(src.to_vec())
                .map_err(|_| FrameError::InvalidUtf8("password"))?;
            Ok(Authentication::Simple { username, password })
        }
        other => Err(FrameError::InvalidMimeType(format!(
            "reserved auth type 0x{other:02x}"
        ))),
    }
}

fn put_custom_type(dst: &mut BytesMut, field: &'static str, name: &str) -> Result<()> {
    if name.is_empty() || !name.is_ascii() {
        return Err(FrameError::InvalidMimeType(name.to_string()));
    }
    if name.len() > MAX_CUSTOM_TYPE_LEN {
        return Err(FrameError::FieldTooLong {
            field,
            len: name.len(),
            max: MAX_CUSTOM_TYPE_LEN,
        });
    }
    dst.put_u8((name.len() - 1) as u8);
    dst.put_slice(name.as_bytes());
    Ok(())
}

fn take_custom_type(src: &mut Bytes, head: u8, field: &'static str) -> Result<String> {
    let len = usize::from(head) + 1;
    ensure(src, len, field)?;
    String::from_utf8(src.split_to(len).to_vec()).map_err(|_| FrameError::InvalidUtf8(field))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routing_then_auth_wire_layout() {
        let entries = vec![
            CompositeMetadataEntry::new(
                WellKnownMimeType::MessageRouting,
                encode_route("echo").unwrap(),
            ),
            CompositeMetadataEntry::new(
                WellKnownMimeType::MessageAuthentication,
                encode_bearer_auth("tok"),
            ),
        ];
        let encoded = encode_composite_metadata(&entries).unwrap();
        assert_eq!(
            encoded.as_ref(),
            &[
                0xFE, 0, 0, 5, 4, b'e', b'c', b'h', b'o', // routing
                0xFC, 0, 0, 4, 0x81, b't', b'o', b'k', // bearer auth
            ]
        );

        let decoded = decode_composite_metadata(encoded).unwrap();
        assert_eq!(decoded, entries);
        assert_eq!(
            decode_routes(decoded[0].content.clone()).unwrap(),
            vec!["echo".to_string()]
        );
        assert_eq!(
            decode_auth(decoded[1].content.clone()).unwrap(),
            Authentication::Bearer("tok".to_string())
        );
    }

    #[test]
    fn test_custom_mime_entry() {
        let entries = vec![CompositeMetadataEntry::new(
            MimeType::Custom("text/x-trace".to_string()),
            Bytes::from_static(b"abc"),
        )];
        let encoded = encode_composite_metadata(&entries).unwrap();
        assert_eq!(encoded[0], 11);
        assert_eq!(decode_composite_metadata(encoded).unwrap(), entries);
    }

    #[test]
    fn test_empty_composite_metadata() {
        assert!(encode_composite_metadata(&[]).unwrap().is_empty());
        assert!(decode_composite_metadata(Bytes::new()).unwrap().is_empty());
    }

    #[test]
    fn test_truncated_entry_is_malformed() {
        let err = decode_composite_metadata(Bytes::from_static(&[0xFE, 0, 0, 9, 1])).unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn test_route_too_long() {
        let route = "r".repeat(256);
        assert!(matches!(
            encode_route(&route),
            Err(FrameError::FieldTooLong { field: "route", .. })
        ));
    }

    #[test]
    fn test_multiple_routes() {
        let encoded = encode_routes(&["a", "bc"]).unwrap();
        assert_eq!(encoded.as_ref(), &[1, b'a', 2, b'b', b'c']);
        assert_eq!(decode_routes(encoded).unwrap(), vec!["a", "bc"]);
    }

    #[test]
    fn test_simple_and_custom_auth() {
        let simple = encode_simple_auth("user", "pass").unwrap();
        assert_eq!(
            decode_auth(simple).unwrap(),
            Authentication::Simple {
                username: "user".to_string(),
                password: "pass".to_string()
            }
        );

        let custom = encode_custom_auth("x-api-key", b"k1").unwrap();
        assert_eq!(
            decode_auth(custom).unwrap(),
            Authentication::Custom {
                auth_type: "x-api-key".to_string(),
                payload: Bytes::from_static(b"k1")
            }
        );
    }

    #[test]
    fn test_auth_debug_is_redacted() {
        let debug = format!("{:?}", Authentication::Bearer("secret-token".to_string()));
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("<redacted:12 bytes>"));
    }
}
