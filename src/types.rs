//! Core types for the Worktrace metrics engine
//!
//! This module defines the data that flows through the engine: typed activity
//! records carrying encrypted fields, their decrypted form, and the daily and
//! multi-day metrics computed from them.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Encrypted field text exactly as stored upstream (base64 of a base64 token)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncryptedField(String);

impl EncryptedField {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for EncryptedField {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl From<&str> for EncryptedField {
    fn from(text: &str) -> Self {
        Self(text.to_string())
    }
}

/// One tracked interval as delivered by the record source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRecord {
    /// Subject the interval belongs to
    pub owner_id: String,
    /// Interval start, naive local wall-clock time
    pub start_time: NaiveDateTime,
    /// Decrypts to the duration in seconds as decimal text
    pub encrypted_duration: EncryptedField,
    /// Decrypts to the away-from-keyboard flag as text
    pub encrypted_afk_flag: EncryptedField,
}

impl ActivityRecord {
    /// Calendar date of the interval start
    pub fn date(&self) -> NaiveDate {
        self.start_time.date()
    }
}

/// Typed values recovered from one record
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecryptedRecord {
    pub start_time: NaiveDateTime,
    pub duration_seconds: f64,
    pub is_afk: bool,
}

/// How decrypted AFK text is interpreted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AfkPolicy {
    /// Truthy text means AFK, anything else means not AFK
    #[default]
    Lenient,
    /// Only recognized truthy or falsy text is accepted
    Strict,
}

/// Overall productivity classification for a day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductivityTier {
    Excellent,
    Good,
    NeedsImprovement,
}

/// Aspect of a day an assessment rates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentDimension {
    /// Total tracked hours
    TrackedTime,
    /// Active share of tracked time (%)
    ActivityRate,
    /// Inactive share of tracked time (%)
    Inactivity,
}

/// Rating given to one assessment dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentLevel {
    Excellent,
    Good,
    Poor,
}

/// A single rated dimension of a day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub dimension: AssessmentDimension,
    pub level: AssessmentLevel,
    /// The rounded value the rating was derived from
    pub value: f64,
}

/// Metrics for one owner on one calendar date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyMetrics {
    pub owner_id: String,
    pub date: NaiveDate,
    /// Number of records that contributed
    pub total_records: usize,

    pub total_seconds: f64,
    pub active_seconds: f64,
    pub afk_seconds: f64,
    /// Total minus active
    pub inactive_seconds: f64,

    /// Hour values, rounded to 2 decimal places
    pub total_hours: f64,
    pub active_hours: f64,
    pub afk_hours: f64,
    pub inactive_hours: f64,

    /// Rates in percent, rounded to 1 decimal place; 0 when nothing was tracked
    pub activity_rate_percent: f64,
    pub inactivity_rate_percent: f64,
    pub afk_rate_percent: f64,

    /// Earliest interval start; `None` means unknown
    pub observed_start: Option<NaiveDateTime>,
    /// Latest interval end (start + duration); `None` means unknown
    pub observed_end: Option<NaiveDateTime>,

    pub productivity_tier: ProductivityTier,
    /// Tracked time, activity rate and inactivity ratings, in that order
    pub assessments: Vec<Assessment>,
}

/// Per-day projection of [`DailyMetrics`] carried in a rollup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub total_records: usize,
    pub total_hours: f64,
    pub active_hours: f64,
    pub inactive_hours: f64,
    pub afk_hours: f64,
    pub activity_rate_percent: f64,
    pub inactivity_rate_percent: f64,
    pub productivity_tier: ProductivityTier,
}

impl From<&DailyMetrics> for DaySummary {
    fn from(metrics: &DailyMetrics) -> Self {
        DaySummary {
            date: metrics.date,
            total_records: metrics.total_records,
            total_hours: metrics.total_hours,
            active_hours: metrics.active_hours,
            inactive_hours: metrics.inactive_hours,
            afk_hours: metrics.afk_hours,
            activity_rate_percent: metrics.activity_rate_percent,
            inactivity_rate_percent: metrics.inactivity_rate_percent,
            productivity_tier: metrics.productivity_tier,
        }
    }
}

/// Mean and sample standard deviation of one per-day quantity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    pub mean: f64,
    /// Sample (n - 1) standard deviation; `None` with fewer than two days
    pub std_dev: Option<f64>,
}

/// Spread of the per-day values across a rollup
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RollupStatistics {
    pub total_hours: Distribution,
    pub active_hours: Distribution,
    pub inactive_hours: Distribution,
    pub activity_rate_percent: Distribution,
    pub records: Distribution,
}

/// Metrics across an ordered list of dates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollupMetrics {
    pub owner_id: String,
    pub total_days: usize,
    pub total_records: usize,

    /// Sums of the per-day rounded hour values
    pub total_active_hours: f64,
    pub total_tracked_hours: f64,
    pub total_inactive_hours: f64,
    pub total_afk_hours: f64,

    pub average_active_hours: f64,
    pub average_total_hours: f64,
    pub average_inactive_hours: f64,

    pub overall_activity_rate_percent: f64,

    pub statistics: RollupStatistics,
    /// One entry per requested date, in request order
    pub daily_breakdown: Vec<DaySummary>,
}
