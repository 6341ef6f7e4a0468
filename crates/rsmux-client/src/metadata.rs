//! Per-interaction composite metadata.

use bytes::Bytes;
use rsmux_frame::{
    encode_bearer_auth, encode_composite_metadata, encode_route, CompositeMetadataEntry,
    FrameError, WellKnownMimeType,
};

/// The routing entry for `route`, followed by a bearer entry when a token is given.
pub fn entries(route: &str, token: Option<&str>) -> Result<Vec<CompositeMetadataEntry>, FrameError> {
    let mut entries = vec![CompositeMetadataEntry::new(
        WellKnownMimeType::MessageRouting,
        encode_route(route)?,
    )];
    if let Some(token) = token {
        entries.push(bearer_entry(token));
    }
    Ok(entries)
}

/// Encode the composite metadata for one interaction.
pub fn compose(route: &str, token: Option<&str>) -> Result<Bytes, FrameError> {
    encode_composite_metadata(&entries(route, token)?)
}

/// SETUP metadata: a lone bearer entry, or nothing without a token.
pub fn setup_metadata(token: Option<&str>) -> Result<Option<Bytes>, FrameError> {
    token
        .map(|token| encode_composite_metadata(&[bearer_entry(token)]))
        .transpose()
}

fn bearer_entry(token: &str) -> CompositeMetadataEntry {
    CompositeMetadataEntry::new(
        WellKnownMimeType::MessageAuthentication,
        encode_bearer_auth(token),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsmux_frame::{decode_auth, decode_composite_metadata, decode_routes, Authentication, MimeType};

    #[test]
    fn test_route_only() {
        let decoded = decode_composite_metadata(compose("echo", None).unwrap()).unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(
            decoded[0].mime_type,
            MimeType::WellKnown(WellKnownMimeType::MessageRouting)
        );
        assert_eq!(decode_routes(decoded[0].content.clone()).unwrap(), vec!["echo"]);
    }

    #[test]
    fn test_route_then_bearer() {
        let decoded = decode_composite_metadata(compose("orders", Some("jwt")).unwrap()).unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(
            decoded[1].mime_type,
            MimeType::WellKnown(WellKnownMimeType::MessageAuthentication)
        );
        assert_eq!(
            decode_auth(decoded[1].content.clone()).unwrap(),
            Authentication::Bearer("jwt".to_string())
        );
    }

    #[test]
    fn test_setup_metadata() {
        assert_eq!(setup_metadata(None).unwrap(), None);
        let decoded = decode_composite_metadata(setup_metadata(Some("t")).unwrap().unwrap()).unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(
            decode_auth(decoded[0].content.clone()).unwrap(),
            Authentication::Bearer("t".to_string())
        );
    }

    #[test]
    fn test_long_route_propagates_error() {
        let route = "x".repeat(300);
        assert!(matches!(
            compose(&route, None),
            Err(FrameError::FieldTooLong { .. })
        ));
    }
}
