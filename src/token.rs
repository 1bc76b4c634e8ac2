//! Authenticated token decryption
//!
//! Token layout (all offsets in bytes):
//!
//! ```text
//! 0        1            9          25                 len-32      len
//! | version | timestamp | iv (16)  | ciphertext (n*16) | tag (32)  |
//! ```
//!
//! `tag` is HMAC-SHA256 under the signing half of the key over everything
//! before it. The ciphertext is AES-128-CBC with PKCS#7 padding under the
//! encryption half. The tag is always verified before any decryption.

use aes::Aes128;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::ComputeError;
use crate::key::Key;

type HmacSha256 = Hmac<Sha256>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;
type Aes128CbcEnc = cbc::Encryptor<Aes128>;

/// Version byte every token must start with
pub const TOKEN_VERSION: u8 = 0x80;

const VERSION_LEN: usize = 1;
const TIMESTAMP_LEN: usize = 8;
const IV_LEN: usize = 16;
const TAG_LEN: usize = 32;
const BLOCK_LEN: usize = 16;
const HEADER_LEN: usize = VERSION_LEN + TIMESTAMP_LEN + IV_LEN;

/// Smallest well-formed token: header and tag with an empty ciphertext
pub const MIN_TOKEN_LEN: usize = HEADER_LEN + TAG_LEN;

/// Borrowed view over the fields of a token
#[derive(Debug, Clone, Copy)]
pub struct Token<'a> {
    /// Version byte (always [`TOKEN_VERSION`] once parsed)
    pub version: u8,
    /// Creation time in seconds since the epoch; informational only
    pub timestamp: u64,
    pub iv: &'a [u8],
    pub ciphertext: &'a [u8],
    pub tag: &'a [u8],
    signed: &'a [u8],
}

impl<'a> Token<'a> {
    /// Split raw token bytes into fields, checking length and version.
    ///
    /// Nothing here is authenticated yet.
    pub fn parse(bytes: &'a [u8]) -> Result<Self, ComputeError> {
        if bytes.len() < MIN_TOKEN_LEN {
            return Err(ComputeError::MalformedToken(format!(
                "token is {} bytes, need at least {}",
                bytes.len(),
                MIN_TOKEN_LEN
            )));
        }

        let version = bytes[0];
        if version != TOKEN_VERSION {
            return Err(ComputeError::UnsupportedVersion(version));
        }

        let (signed, tag) = bytes.split_at(bytes.len() - TAG_LEN);

        let mut timestamp_bytes = [0u8; TIMESTAMP_LEN];
        timestamp_bytes.copy_from_slice(&signed[VERSION_LEN..VERSION_LEN + TIMESTAMP_LEN]);

        Ok(Token {
            version,
            timestamp: u64::from_be_bytes(timestamp_bytes),
            iv: &signed[VERSION_LEN + TIMESTAMP_LEN..HEADER_LEN],
            ciphertext: &signed[HEADER_LEN..],
            tag,
            signed,
        })
    }

    /// Creation time as a UTC datetime, if representable
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        i64::try_from(self.timestamp)
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
    }

    /// Verify the tag in constant time against the signing half of `key`
    pub fn verify(&self, key: &Key) -> Result<(), ComputeError> {
        let mut mac = HmacSha256::new_from_slice(key.signing_key())
            .map_err(|e| ComputeError::InvalidKey(e.to_string()))?;
        mac.update(self.signed);
        mac.verify_slice(self.tag)
            .map_err(|_| ComputeError::AuthenticationFailed)
    }
}

/// Verify and decrypt a token, returning the unpadded plaintext
pub fn decrypt(token_bytes: &[u8], key: &Key) -> Result<Vec<u8>, ComputeError> {
    let token = Token::parse(token_bytes)?;
    token.verify(key)?;

    let ciphertext = token.ciphertext;
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_LEN != 0 {
        return Err(ComputeError::MalformedToken(format!(
            "ciphertext length {} is not a positive multiple of {}",
            ciphertext.len(),
            BLOCK_LEN
        )));
    }

    let cipher = Aes128CbcDec::new_from_slices(key.encryption_key(), token.iv)
        .map_err(|e| ComputeError::InvalidKey(e.to_string()))?;

    let mut buffer = ciphertext.to_vec();
    let plaintext_len = cipher
        .decrypt_padded_mut::<Pkcs7>(&mut buffer)
        .map_err(|_| ComputeError::InvalidPadding)?
        .len();
    buffer.truncate(plaintext_len);
    Ok(buffer)
}

/// Build a token for `plaintext` with an explicit IV and timestamp
pub fn seal_with_iv(
    plaintext: &[u8],
    key: &Key,
    iv: [u8; IV_LEN],
    timestamp: u64,
) -> Result<Vec<u8>, ComputeError> {
    let cipher = Aes128CbcEnc::new_from_slices(key.encryption_key(), &iv)
        .map_err(|e| ComputeError::InvalidKey(e.to_string()))?;
    let ciphertext = cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext);

    let mut token = Vec::with_capacity(HEADER_LEN + ciphertext.len() + TAG_LEN);
    token.push(TOKEN_VERSION);
    token.extend_from_slice(&timestamp.to_be_bytes());
    token.extend_from_slice(&iv);
    token.extend_from_slice(&ciphertext);

    let mut mac = HmacSha256::new_from_slice(key.signing_key())
        .map_err(|e| ComputeError::InvalidKey(e.to_string()))?;
    mac.update(&token);
    token.extend_from_slice(&mac.finalize().into_bytes());

    Ok(token)
}

/// Build a token for `plaintext` with a fresh random IV and the current time
pub fn seal(plaintext: &[u8], key: &Key) -> Result<Vec<u8>, ComputeError> {
    use rand::RngCore;

    let mut iv = [0u8; IV_LEN];
    rand::rngs::OsRng.fill_bytes(&mut iv);
    let timestamp = u64::try_from(Utc::now().timestamp()).unwrap_or(0);
    seal_with_iv(plaintext, key, iv, timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cbc::cipher::block_padding::NoPadding;

    fn test_key() -> Key {
        let bytes: Vec<u8> = (0u8..32).collect();
        Key::from_bytes(&bytes).unwrap()
    }

    fn sealed(plaintext: &[u8]) -> Vec<u8> {
        seal_with_iv(plaintext, &test_key(), [7u8; 16], 1_756_285_200).unwrap()
    }

    /// Re-sign a tampered token so only the post-HMAC checks can reject it
    fn resign(mut token: Vec<u8>, key: &Key) -> Vec<u8> {
        let body_len = token.len() - TAG_LEN;
        let mut mac = HmacSha256::new_from_slice(key.signing_key()).unwrap();
        mac.update(&token[..body_len]);
        let tag = mac.finalize().into_bytes();
        token[body_len..].copy_from_slice(&tag);
        token
    }

    #[test]
    fn test_seal_then_decrypt() {
        let key = test_key();
        let plaintexts: [&[u8]; 4] = [
            b"",
            b"3600",
            b"exactly sixteen!",
            b"a longer plaintext spanning blocks",
        ];
        for plaintext in plaintexts {
            let token = seal(plaintext, &key).unwrap();
            assert_eq!(decrypt(&token, &key).unwrap(), plaintext);
        }
    }

    #[test]
    fn test_layout() {
        let token = sealed(b"3600");
        // header + one padded block + tag
        assert_eq!(token.len(), HEADER_LEN + 16 + TAG_LEN);

        let parsed = Token::parse(&token).unwrap();
        assert_eq!(parsed.version, TOKEN_VERSION);
        assert_eq!(parsed.timestamp, 1_756_285_200);
        assert_eq!(parsed.iv, &[7u8; 16]);
        assert_eq!(parsed.ciphertext.len(), 16);
        assert_eq!(
            parsed.issued_at().unwrap().to_rfc3339(),
            "2025-08-27T09:00:00+00:00"
        );
    }

    #[test]
    fn test_too_short() {
        let result = decrypt(&[TOKEN_VERSION; MIN_TOKEN_LEN - 1], &test_key());
        assert!(matches!(result, Err(ComputeError::MalformedToken(_))));
    }

    #[test]
    fn test_unsupported_version() {
        let mut token = sealed(b"1");
        token[0] = 0x81;
        let result = decrypt(&token, &test_key());
        assert!(matches!(result, Err(ComputeError::UnsupportedVersion(0x81))));
    }

    #[test]
    fn test_every_ciphertext_and_tag_bit_is_authenticated() {
        let key = test_key();
        let token = sealed(b"7200.5");

        for byte in HEADER_LEN..token.len() {
            for bit in 0..8 {
                let mut tampered = token.clone();
                tampered[byte] ^= 1 << bit;
                let result = decrypt(&tampered, &key);
                assert!(
                    matches!(result, Err(ComputeError::AuthenticationFailed)),
                    "byte {} bit {} was not rejected",
                    byte,
                    bit
                );
            }
        }
    }

    #[test]
    fn test_wrong_key_rejected() {
        let token = sealed(b"true");
        let other = Key::from_bytes(&[0xaa; 32]).unwrap();
        assert!(matches!(
            decrypt(&token, &other),
            Err(ComputeError::AuthenticationFailed)
        ));
    }

    #[test]
    fn test_empty_ciphertext_is_malformed_after_auth() {
        let key = test_key();
        let token = sealed(b"x");
        let mut truncated = token[..HEADER_LEN].to_vec();
        truncated.extend_from_slice(&[0u8; TAG_LEN]);
        let truncated = resign(truncated, &key);

        assert!(matches!(
            decrypt(&truncated, &key),
            Err(ComputeError::MalformedToken(_))
        ));
    }

    #[test]
    fn test_partial_block_is_malformed() {
        let key = test_key();
        let token = sealed(b"x");
        let mut partial = token[..HEADER_LEN + 10].to_vec();
        partial.extend_from_slice(&[0u8; TAG_LEN]);
        let partial = resign(partial, &key);

        assert!(matches!(
            decrypt(&partial, &key),
            Err(ComputeError::MalformedToken(_))
        ));
    }

    /// Sign a token whose single ciphertext block decrypts to `block` as-is
    fn signed_unpadded(block: [u8; 16], key: &Key) -> Vec<u8> {
        let cipher = Aes128CbcEnc::new_from_slices(key.encryption_key(), &[1u8; 16]).unwrap();
        let ciphertext = cipher.encrypt_padded_vec_mut::<NoPadding>(&block);

        let mut token = vec![TOKEN_VERSION];
        token.extend_from_slice(&0u64.to_be_bytes());
        token.extend_from_slice(&[1u8; 16]);
        token.extend_from_slice(&ciphertext);
        token.extend_from_slice(&[0u8; TAG_LEN]);
        resign(token, key)
    }

    #[test]
    fn test_bad_padding_detected_after_auth() {
        let key = test_key();

        let mut inconsistent = [b'a'; 16];
        inconsistent[14] = 3;
        inconsistent[15] = 2;

        for block in [[0u8; 16], [17u8; 16], inconsistent] {
            assert!(matches!(
                decrypt(&signed_unpadded(block, &key), &key),
                Err(ComputeError::InvalidPadding)
            ));
        }
    }

    #[test]
    fn test_full_padding_block_decrypts_to_empty() {
        let key = test_key();
        assert_eq!(decrypt(&signed_unpadded([16u8; 16], &key), &key).unwrap(), b"");

        let mut two_pad = [b'z'; 16];
        two_pad[14] = 2;
        two_pad[15] = 2;
        assert_eq!(
            decrypt(&signed_unpadded(two_pad, &key), &key).unwrap(),
            [b'z'; 14].to_vec()
        );
    }
}
