//! Frame type tags, header flags and error codes.
//!
//! Flag bits share positions between frame types; the constant name says which
//! frame types interpret a given bit.

use std::fmt;

use crate::error::{FrameError, Result};

/// Ignore the frame if it is not understood.
pub const FLAG_IGNORE: u16 = 0x200;
/// Metadata is present.
pub const FLAG_METADATA: u16 = 0x100;
/// More fragments follow (request and payload frames).
pub const FLAG_FOLLOWS: u16 = 0x080;
/// Respond with a KEEPALIVE (keepalive frames).
pub const FLAG_RESPOND: u16 = 0x080;
/// Resume enabled (setup frames).
pub const FLAG_RESUME_ENABLE: u16 = 0x080;
/// Stream completed (payload and request-channel frames).
pub const FLAG_COMPLETE: u16 = 0x040;
/// Client will honor leases (setup frames).
pub const FLAG_LEASE: u16 = 0x040;
/// Payload carries data and/or metadata (payload frames).
pub const FLAG_NEXT: u16 = 0x020;

/// Mask for the 10 flag bits of the header.
pub const FLAGS_MASK: u16 = 0x03FF;

/// Largest stream id and request-n value (31 bits).
pub const MAX_U31: u32 = 0x7FFF_FFFF;

/// Request-n value meaning "effectively unbounded".
pub const MAX_REQUEST_N: u32 = MAX_U31;

// Error codes carried by ERROR frames.
pub const ERROR_INVALID_SETUP: u32 = 0x0000_0001;
pub const ERROR_UNSUPPORTED_SETUP: u32 = 0x0000_0002;
pub const ERROR_REJECTED_SETUP: u32 = 0x0000_0003;
pub const ERROR_REJECTED_RESUME: u32 = 0x0000_0004;
pub const ERROR_CONNECTION_ERROR: u32 = 0x0000_0101;
pub const ERROR_CONNECTION_CLOSE: u32 = 0x0000_0102;
pub const ERROR_APPLICATION_ERROR: u32 = 0x0000_0201;
pub const ERROR_REJECTED: u32 = 0x0000_0202;
pub const ERROR_CANCELED: u32 = 0x0000_0203;
pub const ERROR_INVALID: u32 = 0x0000_0204;

/// The 6-bit frame type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FrameType {
    Setup = 0x01,
    Lease = 0x02,
    KeepAlive = 0x03,
    RequestResponse = 0x04,
    RequestFnf = 0x05,
    RequestStream = 0x06,
    RequestChannel = 0x07,
    RequestN = 0x08,
    Cancel = 0x09,
    Payload = 0x0A,
    Error = 0x0B,
    MetadataPush = 0x0C,
    Resume = 0x0D,
    ResumeOk = 0x0E,
    Ext = 0x3F,
}

impl FrameType {
    /// Parse a type tag from the header.
    pub fn from_tag(tag: u8) -> Result<Self> {
        Ok(match tag {
            0x01 => FrameType::Setup,
            0x02 => FrameType::Lease,
            0x03 => FrameType::KeepAlive,
            0x04 => FrameType::RequestResponse,
            0x05 => FrameType::RequestFnf,
            0x06 => FrameType::RequestStream,
            0x07 => FrameType::RequestChannel,
            0x08 => FrameType::RequestN,
            0x09 => FrameType::Cancel,
            0x0A => FrameType::Payload,
            0x0B => FrameType::Error,
            0x0C => FrameType::MetadataPush,
            0x0D => FrameType::Resume,
            0x0E => FrameType::ResumeOk,
            0x3F => FrameType::Ext,
            other => return Err(FrameError::InvalidFrameType(other)),
        })
    }

    /// The wire tag.
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Returns a human-readable name for the frame type.
    pub fn name(self) -> &'static str {
        match self {
            FrameType::Setup => "SETUP",
            FrameType::Lease => "LEASE",
            FrameType::KeepAlive => "KEEPALIVE",
            FrameType::RequestResponse => "REQUEST_RESPONSE",
            FrameType::RequestFnf => "REQUEST_FNF",
            FrameType::RequestStream => "REQUEST_STREAM",
            FrameType::RequestChannel => "REQUEST_CHANNEL",
            FrameType::RequestN => "REQUEST_N",
            FrameType::Cancel => "CANCEL",
            FrameType::Payload => "PAYLOAD",
            FrameType::Error => "ERROR",
            FrameType::MetadataPush => "METADATA_PUSH",
            FrameType::Resume => "RESUME",
            FrameType::ResumeOk => "RESUME_OK",
            FrameType::Ext => "EXT",
        }
    }
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returns a human-readable name for an ERROR frame code.
pub fn error_code_name(code: u32) -> &'static str {
    match code {
        ERROR_INVALID_SETUP => "INVALID_SETUP",
        ERROR_UNSUPPORTED_SETUP => "UNSUPPORTED_SETUP",
        ERROR_REJECTED_SETUP => "REJECTED_SETUP",
        ERROR_REJECTED_RESUME => "REJECTED_RESUME",
        ERROR_CONNECTION_ERROR => "CONNECTION_ERROR",
        ERROR_CONNECTION_CLOSE => "CONNECTION_CLOSE",
        ERROR_APPLICATION_ERROR => "APPLICATION_ERROR",
        ERROR_REJECTED => "REJECTED",
        ERROR_CANCELED => "CANCELED",
        ERROR_INVALID => "INVALID",
        _ => "APPLICATION_DEFINED",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_roundtrip_for_known_types() {
        for tag in (0x01..=0x0E).chain([0x3F]) {
            let frame_type = FrameType::from_tag(tag).unwrap();
            assert_eq!(frame_type.tag(), tag);
        }
    }

    #[test]
    fn test_unknown_tag_is_rejected() {
        assert!(matches!(
            FrameType::from_tag(0x20),
            Err(FrameError::InvalidFrameType(0x20))
        ));
        assert!(matches!(
            FrameType::from_tag(0x00),
            Err(FrameError::InvalidFrameType(0x00))
        ));
    }

    #[test]
    fn test_error_code_names() {
        assert_eq!(error_code_name(ERROR_APPLICATION_ERROR), "APPLICATION_ERROR");
        assert_eq!(error_code_name(0x0000_0301), "APPLICATION_DEFINED");
    }
}
