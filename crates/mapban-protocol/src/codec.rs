//! Codec trait and the JSON implementation.
//!
//! A codec turns values into bytes and back. Two consumers share it: the
//! connection handler (request and response frames) and the snapshot
//! store (the persisted registry). Neither cares which format is
//! underneath, only that it round-trips.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes values to bytes and decodes bytes back.
///
/// `Send + Sync + 'static` because one codec instance is shared by every
/// connection task for the lifetime of the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if the value can't be represented.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes into a value.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] if the bytes are malformed,
    /// truncated, or don't match `T`.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] backed by `serde_json`.
///
/// Behind the `json` feature (on by default).
///
/// ```rust
/// use mapban_protocol::{Codec, JsonCodec, RawRequest, Request};
///
/// let codec = JsonCodec;
/// let raw: RawRequest = codec
///     .decode(br#"{"phase":2,"token":"abc","choice":"Border"}"#)
///     .unwrap();
/// assert!(matches!(raw.validate(), Ok(Request::Choose(_))));
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{RawRequest, Response, ResponseBody};

    #[test]
    fn test_decode_garbage_returns_decode_error() {
        let result: Result<RawRequest, _> = JsonCodec.decode(b"not json");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_decode_truncated_returns_decode_error() {
        let result: Result<RawRequest, _> = JsonCodec.decode(br#"{"phase":1,"tok"#);
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_encode_response_is_utf8_json() {
        let resp = Response::ok(
            0,
            ResponseBody::MapsChosen {
                maps_chosen: vec!["Kafe".into()],
            },
        );
        let bytes = JsonCodec.encode(&resp).unwrap();
        let text = std::str::from_utf8(&bytes).expect("JSON is UTF-8");
        assert!(text.contains(r#""mapsChosen":["Kafe"]"#));
    }
}
