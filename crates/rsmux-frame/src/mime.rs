//! Well-known MIME type identifiers for composite metadata.

use std::fmt;

use crate::error::{FrameError, Result};

/// MIME types with a compressed one-byte identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WellKnownMimeType {
    ApplicationAvro,
    ApplicationCbor,
    ApplicationGraphql,
    ApplicationGzip,
    ApplicationJavascript,
    ApplicationJson,
    ApplicationOctetStream,
    ApplicationPdf,
    ApplicationThrift,
    ApplicationProtobuf,
    ApplicationXml,
    ApplicationZip,
    MessageMimeType,
    MessageAcceptMimeTypes,
    MessageAuthentication,
    MessageTracingZipkin,
    MessageRouting,
    MessageCompositeMetadata,
}

const TABLE: &[(WellKnownMimeType, u8, &str)] = &[
    (WellKnownMimeType::ApplicationAvro, 0x00, "application/avro"),
    (WellKnownMimeType::ApplicationCbor, 0x01, "application/cbor"),
    (WellKnownMimeType::ApplicationGraphql, 0x02, "application/graphql"),
    (WellKnownMimeType::ApplicationGzip, 0x03, "application/gzip"),
    (WellKnownMimeType::ApplicationJavascript, 0x04, "application/javascript"),
    (WellKnownMimeType::ApplicationJson, 0x05, "application/json"),
    (WellKnownMimeType::ApplicationOctetStream, 0x06, "application/octet-stream"),
    (WellKnownMimeType::ApplicationPdf, 0x07, "application/pdf"),
    (WellKnownMimeType::ApplicationThrift, 0x08, "application/vnd.apache.thrift.binary"),
    (WellKnownMimeType::ApplicationProtobuf, 0x09, "application/vnd.google.protobuf"),
    (WellKnownMimeType::ApplicationXml, 0x0A, "application/xml"),
    (WellKnownMimeType::ApplicationZip, 0x0B, "application/zip"),
    (WellKnownMimeType::MessageMimeType, 0x7A, "message/x.rsocket.mime-type.v0"),
    (WellKnownMimeType::MessageAcceptMimeTypes, 0x7B, "message/x.rsocket.accept-mime-types.v0"),
    (WellKnownMimeType::MessageAuthentication, 0x7C, "message/x.rsocket.authentication.v0"),
    (WellKnownMimeType::MessageTracingZipkin, 0x7D, "message/x.rsocket.tracing-zipkin.v0"),
    (WellKnownMimeType::MessageRouting, 0x7E, "message/x.rsocket.routing.v0"),
    (WellKnownMimeType::MessageCompositeMetadata, 0x7F, "message/x.rsocket.composite-metadata.v0"),
];

impl WellKnownMimeType {
    /// The 7-bit identifier.
    pub fn id(self) -> u8 {
        TABLE
            .iter()
            .find(|(mime, _, _)| *mime == self)
            .map_or(0, |(_, id, _)| *id)
    }

    /// The MIME string.
    pub fn as_str(self) -> &'static str {
        TABLE
            .iter()
            .find(|(mime, _, _)| *mime == self)
            .map_or("", |(_, _, name)| *name)
    }

    pub fn from_id(id: u8) -> Option<Self> {
        TABLE
            .iter()
            .find(|(_, known, _)| *known == id)
            .map(|(mime, _, _)| *mime)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        TABLE
            .iter()
            .find(|(_, _, known)| *known == name)
            .map(|(mime, _, _)| *mime)
    }
}

/// A metadata or data MIME type, compressed when well known.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MimeType {
    WellKnown(WellKnownMimeType),
    Custom(String),
}

impl MimeType {
    /// Parse a MIME string, preferring the well-known form.
    pub fn parse(name: &str) -> Result<Self> {
        if let Some(known) = WellKnownMimeType::from_name(name) {
            return Ok(MimeType::WellKnown(known));
        }
        if name.is_empty() || !name.is_ascii() {
            return Err(FrameError::InvalidMimeType(name.to_string()));
        }
        Ok(MimeType::Custom(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        match self {
            MimeType::WellKnown(known) => known.as_str(),
            MimeType::Custom(name) => name,
        }
    }
}

impl From<WellKnownMimeType> for MimeType {
    fn from(value: WellKnownMimeType) -> Self {
        MimeType::WellKnown(value)
    }
}

impl fmt::Display for MimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_match_registry() {
        assert_eq!(WellKnownMimeType::ApplicationJson.id(), 0x05);
        assert_eq!(WellKnownMimeType::MessageAuthentication.id(), 0x7C);
        assert_eq!(WellKnownMimeType::MessageRouting.id(), 0x7E);
        assert_eq!(WellKnownMimeType::MessageCompositeMetadata.id(), 0x7F);
        assert_eq!(
            WellKnownMimeType::from_id(0x7E),
            Some(WellKnownMimeType::MessageRouting)
        );
        assert_eq!(WellKnownMimeType::from_id(0x50), None);
    }

    #[test]
    fn test_parse_prefers_well_known() {
        assert_eq!(
            MimeType::parse("application/json").unwrap(),
            MimeType::WellKnown(WellKnownMimeType::ApplicationJson)
        );
        assert_eq!(
            MimeType::parse("text/x-custom").unwrap(),
            MimeType::Custom("text/x-custom".to_string())
        );
        assert!(MimeType::parse("").is_err());
    }
}
