//! Response decoding.

use serde::de::DeserializeOwned;

use crate::serializer::DataValue;

/// An inbound payload could not be turned into the caller's value type.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Decode one inbound value.
///
/// Binary payloads are read as UTF-8 JSON text. Structured values are
/// converted directly.
pub fn decode<T: DeserializeOwned>(value: DataValue) -> Result<T, DecodeError> {
    match value {
        DataValue::Binary(bytes) => {
            let text = std::str::from_utf8(&bytes)?;
            Ok(serde_json::from_str(text)?)
        }
        DataValue::Structured(value) => Ok(serde_json::from_value(value)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use serde::Deserialize;
    use serde_json::{json, Value};

    #[derive(Debug, Deserialize, PartialEq)]
    struct Echo {
        msg: String,
    }

    #[test]
    fn test_binary_is_parsed() {
        let echo: Echo = decode(DataValue::Binary(Bytes::from_static(br#"{"msg":"hi"}"#))).unwrap();
        assert_eq!(echo.msg, "hi");
    }

    #[test]
    fn test_structured_passes_through() {
        let original = json!({"msg": "hi", "extra": [1, 2]});
        let value: Value = decode(DataValue::Structured(original.clone())).unwrap();
        assert_eq!(value, original);
    }

    #[test]
    fn test_invalid_utf8() {
        let err = decode::<Value>(DataValue::Binary(Bytes::from_static(&[0xff, 0xfe]))).unwrap_err();
        assert!(matches!(err, DecodeError::Utf8(_)));
    }

    #[test]
    fn test_invalid_json() {
        let err = decode::<Echo>(DataValue::Binary(Bytes::from_static(b"{msg"))).unwrap_err();
        assert!(matches!(err, DecodeError::Json(_)));
    }
}
