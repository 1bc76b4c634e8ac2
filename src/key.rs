//! Decryption key material
//!
//! A key is 32 raw bytes: the first half signs (HMAC-SHA256), the second half
//! encrypts (AES-128-CBC). Key bytes are wiped when the key is dropped.

use std::fmt;

use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine as _;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::ComputeError;

/// Length of a raw key in bytes
pub const KEY_LEN: usize = 32;

/// 32-byte token key, split into signing and encryption halves
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Key {
    bytes: [u8; KEY_LEN],
}

impl Key {
    /// Create a key from exactly 32 raw bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ComputeError> {
        let bytes: [u8; KEY_LEN] = bytes.try_into().map_err(|_| {
            ComputeError::InvalidKey(format!(
                "expected {} bytes, got {}",
                KEY_LEN,
                bytes.len()
            ))
        })?;
        Ok(Self { bytes })
    }

    /// Create a key from its base64 text form (URL-safe or standard alphabet)
    pub fn from_encoded(text: &str) -> Result<Self, ComputeError> {
        let text = text.trim();
        let mut decoded = URL_SAFE
            .decode(text)
            .or_else(|_| STANDARD.decode(text))
            .map_err(|e| ComputeError::InvalidKey(format!("not base64: {}", e)))?;
        let key = Self::from_bytes(&decoded);
        decoded.zeroize();
        key
    }

    /// Parse an optional configured key; empty text means "no key"
    pub fn from_optional_encoded(text: Option<&str>) -> Result<Option<Self>, ComputeError> {
        match text.map(str::trim) {
            None | Some("") => Ok(None),
            Some(encoded) => Self::from_encoded(encoded).map(Some),
        }
    }

    /// Generate a random key (fixtures and the `seal` CLI command)
    pub fn generate() -> Self {
        use rand::RngCore;

        let mut bytes = [0u8; KEY_LEN];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// HMAC-SHA256 signing half
    pub fn signing_key(&self) -> &[u8] {
        &self.bytes[..KEY_LEN / 2]
    }

    /// AES-128 encryption half
    pub fn encryption_key(&self) -> &[u8] {
        &self.bytes[KEY_LEN / 2..]
    }

    /// URL-safe base64 text form
    pub fn to_encoded(&self) -> String {
        URL_SAFE.encode(self.bytes)
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Key(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sequential_bytes() -> Vec<u8> {
        (0u8..32).collect()
    }

    #[test]
    fn test_key_halves() {
        let key = Key::from_bytes(&sequential_bytes()).unwrap();
        assert_eq!(key.signing_key(), &sequential_bytes()[..16]);
        assert_eq!(key.encryption_key(), &sequential_bytes()[16..]);
    }

    #[test]
    fn test_wrong_length_rejected() {
        let result = Key::from_bytes(&[0u8; 16]);
        assert!(matches!(result, Err(ComputeError::InvalidKey(_))));
    }

    #[test]
    fn test_encoded_forms() {
        let key = Key::from_bytes(&[0xfbu8; 32]).unwrap();
        let url_safe = key.to_encoded();
        assert!(url_safe.contains('-') || url_safe.contains('_'));

        let restored = Key::from_encoded(&url_safe).unwrap();
        assert_eq!(restored.signing_key(), key.signing_key());

        let standard = STANDARD.encode([0xfbu8; 32]);
        let restored = Key::from_encoded(&standard).unwrap();
        assert_eq!(restored.encryption_key(), key.encryption_key());
    }

    #[test]
    fn test_optional_empty_key_is_none() {
        assert!(Key::from_optional_encoded(None).unwrap().is_none());
        assert!(Key::from_optional_encoded(Some("  ")).unwrap().is_none());

        let encoded = Key::generate().to_encoded();
        assert!(Key::from_optional_encoded(Some(&encoded)).unwrap().is_some());
    }

    #[test]
    fn test_debug_is_redacted() {
        let key = Key::from_bytes(&sequential_bytes()).unwrap();
        assert_eq!(format!("{:?}", key), "Key(<redacted>)");
    }
}
