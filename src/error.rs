//! Error types for Worktrace

use thiserror::Error;

/// Errors that can occur while decrypting records or computing metrics
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Malformed field encoding: {0}")]
    MalformedEncoding(String),

    #[error("Malformed token: {0}")]
    MalformedToken(String),

    #[error("Unsupported token version: 0x{0:02x}")]
    UnsupportedVersion(u8),

    #[error("Token authentication failed")]
    AuthenticationFailed,

    #[error("Invalid token padding")]
    InvalidPadding,

    #[error("Decrypted field is not valid UTF-8: {0}")]
    MalformedPlaintext(String),

    #[error("Invalid duration value: {0:?}")]
    InvalidDurationValue(String),

    #[error("Invalid AFK flag value: {0:?}")]
    InvalidAfkFlag(String),

    #[error("No data for owner {owner_id} on {date}")]
    NoDataForDate { owner_id: String, date: String },

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Failed to parse activity records: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Date parse error: {0}")]
    DateParseError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ComputeError {
    /// Whether the failure came from token decoding or verification rather
    /// than from the decrypted value or the record selection.
    pub fn is_token_failure(&self) -> bool {
        matches!(
            self,
            ComputeError::MalformedEncoding(_)
                | ComputeError::MalformedToken(_)
                | ComputeError::UnsupportedVersion(_)
                | ComputeError::AuthenticationFailed
                | ComputeError::InvalidPadding
                | ComputeError::MalformedPlaintext(_)
        )
    }
}
