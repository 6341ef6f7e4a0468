/// Errors that can occur while encoding or decoding frames and metadata.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The buffer ended before a declared field was complete.
    #[error("truncated {field}: need {needed} bytes, have {remaining}")]
    Truncated {
        field: &'static str,
        needed: usize,
        remaining: usize,
    },

    /// The frame type tag is not part of the protocol.
    #[error("invalid frame type 0x{0:02x}")]
    InvalidFrameType(u8),

    /// The frame type is valid on the wire but not handled by this client.
    #[error("unsupported frame type {0}")]
    UnsupportedFrameType(&'static str),

    /// A text field did not contain valid UTF-8.
    #[error("invalid utf-8 in {0}")]
    InvalidUtf8(&'static str),

    /// A length-bounded field exceeds its wire limit.
    #[error("{field} too long ({len} bytes, max {max})")]
    FieldTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    /// A frame exceeds the configured or wire-level size limit.
    #[error("frame too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// A MIME type string cannot be written as a metadata type.
    #[error("invalid mime type {0:?}")]
    InvalidMimeType(String),
}

impl FrameError {
    /// Returns true for errors raised by unreadable inbound bytes.
    ///
    /// These correspond to a malformed frame and are fatal to the connection
    /// that produced them.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            FrameError::Truncated { .. }
                | FrameError::InvalidFrameType(_)
                | FrameError::UnsupportedFrameType(_)
                | FrameError::InvalidUtf8(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
