//! Record field decryption
//!
//! Turns the two encrypted fields of an [`ActivityRecord`] into typed values:
//! field text → [`TokenCodec`] → [`token::decrypt`] → UTF-8 → value.
//!
//! Without a key the field text is taken verbatim as the decrypted value,
//! which is how unencrypted legacy and test data is read.

use crate::codec::TokenCodec;
use crate::error::ComputeError;
use crate::key::Key;
use crate::token;
use crate::types::{ActivityRecord, AfkPolicy, DecryptedRecord, EncryptedField};

/// Texts that mark an interval as AFK (compared case-insensitively)
const AFK_TRUTHY: &[&str] = &["true", "1"];
/// Texts the strict policy accepts as not AFK (compared case-insensitively)
const AFK_FALSY: &[&str] = &["false", "0"];

/// Decrypts and types the fields of activity records
#[derive(Debug, Clone, Copy)]
pub struct RecordDecryptor<'k> {
    key: Option<&'k Key>,
    afk_policy: AfkPolicy,
}

impl<'k> RecordDecryptor<'k> {
    /// Create a decryptor; `None` reads field text verbatim
    pub fn new(key: Option<&'k Key>) -> Self {
        Self {
            key,
            afk_policy: AfkPolicy::default(),
        }
    }

    pub fn with_afk_policy(mut self, afk_policy: AfkPolicy) -> Self {
        self.afk_policy = afk_policy;
        self
    }

    /// Whether field text is used verbatim
    pub fn is_bypass(&self) -> bool {
        self.key.is_none()
    }

    /// Recover the plaintext of one field
    pub fn decrypt_field(&self, field: &EncryptedField) -> Result<String, ComputeError> {
        let Some(key) = self.key else {
            return Ok(field.as_str().to_string());
        };

        let token_bytes = TokenCodec::decode(field.as_str())?;
        let plaintext = token::decrypt(&token_bytes, key)?;
        String::from_utf8(plaintext)
            .map_err(|e| ComputeError::MalformedPlaintext(e.to_string()))
    }

    /// Interval duration in seconds
    pub fn decrypt_duration(&self, record: &ActivityRecord) -> Result<f64, ComputeError> {
        let text = self.decrypt_field(&record.encrypted_duration)?;
        parse_duration(&text)
    }

    /// Away-from-keyboard flag
    pub fn decrypt_afk_flag(&self, record: &ActivityRecord) -> Result<bool, ComputeError> {
        let text = self.decrypt_field(&record.encrypted_afk_flag)?;
        parse_afk_flag(&text, self.afk_policy)
    }

    /// Both fields of a record
    pub fn decrypt(&self, record: &ActivityRecord) -> Result<DecryptedRecord, ComputeError> {
        Ok(DecryptedRecord {
            start_time: record.start_time,
            duration_seconds: self.decrypt_duration(record)?,
            is_afk: self.decrypt_afk_flag(record)?,
        })
    }
}

/// Parse decrypted duration text as a finite, non-negative number of seconds
pub fn parse_duration(text: &str) -> Result<f64, ComputeError> {
    let trimmed = text.trim();
    match trimmed.parse::<f64>() {
        Ok(seconds) if seconds.is_finite() && seconds >= 0.0 => Ok(seconds.abs()),
        _ => Err(ComputeError::InvalidDurationValue(text.to_string())),
    }
}

/// Interpret decrypted AFK text under `policy`
pub fn parse_afk_flag(text: &str, policy: AfkPolicy) -> Result<bool, ComputeError> {
    let trimmed = text.trim();
    let in_set = |set: &[&str]| set.iter().any(|t| trimmed.eq_ignore_ascii_case(t));

    if in_set(AFK_TRUTHY) {
        return Ok(true);
    }

    match policy {
        AfkPolicy::Lenient => Ok(false),
        AfkPolicy::Strict if in_set(AFK_FALSY) => Ok(false),
        AfkPolicy::Strict => Err(ComputeError::InvalidAfkFlag(text.to_string())),
    }
}

/// Encrypt `plaintext` into stored field form (fixtures and the `seal` command)
pub fn seal_field(plaintext: &str, key: &Key) -> Result<EncryptedField, ComputeError> {
    let token = token::seal(plaintext.as_bytes(), key)?;
    Ok(EncryptedField::new(TokenCodec::encode(&token)))
}
