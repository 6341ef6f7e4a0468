//! Data and metadata serializers.

use std::fmt;

use bytes::Bytes;
use serde_json::Value;

use crate::decoder::DecodeError;

/// An inbound payload as the serializer hands it to the decoder.
#[derive(Debug, Clone, PartialEq)]
pub enum DataValue {
    /// Raw bytes, still to be parsed.
    Binary(Bytes),
    /// Already parsed by the serializer.
    Structured(Value),
}

/// Converts outbound values to payload data and inbound payload data to
/// [`DataValue`]s.
pub trait Serializer: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    fn serialize(&self, value: &Value) -> Result<Bytes, serde_json::Error>;

    fn deserialize(&self, data: Bytes) -> Result<DataValue, DecodeError>;
}

/// Transforms composed metadata before it is written.
pub trait MetadataSerializer: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    fn serialize(&self, metadata: Bytes) -> Bytes;
}

/// Passes data through. Strings go out as raw UTF-8, null as an empty payload,
/// anything else as JSON text. Inbound data stays binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentitySerializer;

impl Serializer for IdentitySerializer {
    fn name(&self) -> &'static str {
        "identity"
    }

    fn serialize(&self, value: &Value) -> Result<Bytes, serde_json::Error> {
        match value {
            Value::Null => Ok(Bytes::new()),
            Value::String(text) => Ok(Bytes::copy_from_slice(text.as_bytes())),
            other => serde_json::to_vec(other).map(Bytes::from),
        }
    }

    fn deserialize(&self, data: Bytes) -> Result<DataValue, DecodeError> {
        Ok(DataValue::Binary(data))
    }
}

impl MetadataSerializer for IdentitySerializer {
    fn name(&self) -> &'static str {
        "identity"
    }

    fn serialize(&self, metadata: Bytes) -> Bytes {
        metadata
    }
}

/// JSON in both directions. Inbound data is parsed into a structured value.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn name(&self) -> &'static str {
        "json"
    }

    fn serialize(&self, value: &Value) -> Result<Bytes, serde_json::Error> {
        serde_json::to_vec(value).map(Bytes::from)
    }

    fn deserialize(&self, data: Bytes) -> Result<DataValue, DecodeError> {
        let text = std::str::from_utf8(&data)?;
        Ok(DataValue::Structured(serde_json::from_str(text)?))
    }
}
