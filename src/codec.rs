//! Field text codec
//!
//! Encrypted fields are stored upstream as base64 text whose decoded content
//! is itself the base64 text of a token. This module strips both layers so the
//! token layer only ever sees raw bytes.

use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine as _;

use crate::error::ComputeError;

/// Codec for the double base64 layering of encrypted fields
pub struct TokenCodec;

impl TokenCodec {
    /// Decode a stored field into raw token bytes.
    ///
    /// The outer layer must be standard base64. The inner layer is tried with
    /// the standard alphabet first and then the URL-safe one, since token
    /// producers conventionally emit URL-safe text.
    pub fn decode(text: &str) -> Result<Vec<u8>, ComputeError> {
        let intermediate = STANDARD
            .decode(text)
            .map_err(|e| ComputeError::MalformedEncoding(format!("outer layer: {}", e)))?;

        match STANDARD.decode(&intermediate) {
            Ok(token) => Ok(token),
            Err(standard_err) => URL_SAFE.decode(&intermediate).map_err(|_| {
                ComputeError::MalformedEncoding(format!("inner layer: {}", standard_err))
            }),
        }
    }

    /// Encode raw token bytes into the stored field form (base64 twice).
    pub fn encode(token: &[u8]) -> String {
        let inner = STANDARD.encode(token);
        STANDARD.encode(inner.as_bytes())
    }
}
