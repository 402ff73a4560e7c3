use crate::call::SignedCall;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use thiserror::Error;

/// Errors that can occur during encoding/decoding
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Failed to encode call: {0}")]
    EncodeError(String),

    #[error("Failed to decode call: {0}")]
    DecodeError(String),

    #[error("Invalid hex string: {0}")]
    InvalidHex(String),

    #[error("Invalid base64 string: {0}")]
    InvalidBase64(String),
}

/// Wire codec for signed calls (postcard binary, hex and base64 text)
pub struct CallCodec;

impl CallCodec {
    pub fn encode(signed_call: &SignedCall) -> Result<Vec<u8>, CodecError> {
        postcard::to_allocvec(signed_call).map_err(|e| CodecError::EncodeError(e.to_string()))
    }

    /// Decode a call; unknown selectors, truncated input and trailing bytes
    /// are rejected
    pub fn decode(bytes: &[u8]) -> Result<SignedCall, CodecError> {
        let (signed_call, rest) = postcard::take_from_bytes::<SignedCall>(bytes)
            .map_err(|e| CodecError::DecodeError(e.to_string()))?;
        if !rest.is_empty() {
            return Err(CodecError::DecodeError(format!(
                "{} trailing bytes after call",
                rest.len()
            )));
        }
        Ok(signed_call)
    }

    pub fn encode_hex(signed_call: &SignedCall) -> Result<String, CodecError> {
        Ok(hex::encode(Self::encode(signed_call)?))
    }

    pub fn decode_hex(hex_str: &str) -> Result<SignedCall, CodecError> {
        let bytes = hex::decode(hex_str).map_err(|e| CodecError::InvalidHex(e.to_string()))?;
        Self::decode(&bytes)
    }

    /// URL-safe, no padding
    pub fn encode_base64(signed_call: &SignedCall) -> Result<String, CodecError> {
        Ok(URL_SAFE_NO_PAD.encode(Self::encode(signed_call)?))
    }

    pub fn decode_base64(b64_str: &str) -> Result<SignedCall, CodecError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(b64_str)
            .map_err(|e| CodecError::InvalidBase64(e.to_string()))?;
        Self::decode(&bytes)
    }
}
