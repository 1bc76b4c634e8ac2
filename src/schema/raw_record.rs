//! Raw activity export rows

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::types::{ActivityRecord, EncryptedField};

/// Naive start-time layouts accepted besides RFC 3339
const NAIVE_START_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// One row of the activity export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawActivityRecord {
    /// Owner of the interval
    #[serde(alias = "owner_id")]
    pub employee_id: String,
    /// Interval start as written by the tracker
    pub start_time: String,
    /// Encrypted duration in seconds
    pub duration_seconds: EncryptedField,
    /// Encrypted away-from-keyboard flag
    pub is_afk: EncryptedField,
}

impl RawActivityRecord {
    /// Check the row can become an [`ActivityRecord`]
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.to_record().map(|_| ())
    }

    /// Convert into a typed record
    pub fn to_record(&self) -> Result<ActivityRecord, ValidationError> {
        if self.employee_id.trim().is_empty() {
            return Err(ValidationError::MissingOwner);
        }
        if self.duration_seconds.as_str().is_empty() {
            return Err(ValidationError::EmptyField("duration_seconds"));
        }
        if self.is_afk.as_str().is_empty() {
            return Err(ValidationError::EmptyField("is_afk"));
        }

        Ok(ActivityRecord {
            owner_id: self.employee_id.clone(),
            start_time: parse_start_time(&self.start_time)?,
            encrypted_duration: self.duration_seconds.clone(),
            encrypted_afk_flag: self.is_afk.clone(),
        })
    }
}

impl From<&ActivityRecord> for RawActivityRecord {
    fn from(record: &ActivityRecord) -> Self {
        RawActivityRecord {
            employee_id: record.owner_id.clone(),
            start_time: record.start_time.format("%Y-%m-%dT%H:%M:%S%.f").to_string(),
            duration_seconds: record.encrypted_duration.clone(),
            is_afk: record.encrypted_afk_flag.clone(),
        }
    }
}

/// Parse a start time into naive wall-clock time.
///
/// RFC 3339 values keep the wall clock they were written with; the offset is
/// dropped rather than converted.
pub fn parse_start_time(text: &str) -> Result<NaiveDateTime, ValidationError> {
    let trimmed = text.trim();

    if let Ok(with_offset) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(with_offset.naive_local());
    }

    NAIVE_START_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .ok_or_else(|| ValidationError::InvalidStartTime(text.to_string()))
}

/// Validation errors for raw export rows
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Missing owner id")]
    MissingOwner,

    #[error("Invalid start time: {0:?}")]
    InvalidStartTime(String),

    #[error("Empty field: {0}")]
    EmptyField(&'static str),
}
