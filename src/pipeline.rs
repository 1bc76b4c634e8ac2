//! Pipeline orchestration
//!
//! This module provides the public API for Worktrace. It wires record
//! decryption into the daily and multi-day aggregators.

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::config::WorktraceConfig;
use crate::daily::DailyAggregator;
use crate::error::ComputeError;
use crate::key::Key;
use crate::record::RecordDecryptor;
use crate::rollup::{MultiDayAggregator, RollupOptions};
use crate::schema::available_dates;
use crate::types::{ActivityRecord, AfkPolicy, DailyMetrics, RollupMetrics};

/// Compute metrics for one owner on one date.
///
/// # Arguments
/// * `records` - Activity records from any number of owners and dates
/// * `owner_id` - Owner whose records are selected
/// * `date` - Calendar date compared against each record's start date
/// * `key` - Token key, or `None` to read field text verbatim
///
/// # Example
/// ```ignore
/// let metrics = compute_daily(&records, "E1", date, Some(&key))?;
/// ```
pub fn compute_daily(
    records: &[ActivityRecord],
    owner_id: &str,
    date: NaiveDate,
    key: Option<&Key>,
) -> Result<DailyMetrics, ComputeError> {
    DailyAggregator::new(RecordDecryptor::new(key)).aggregate(records, owner_id, date)
}

/// Compute rollup metrics for one owner over `dates`, in order.
///
/// Fails without a partial result if any date has no records.
///
/// # Example
/// ```ignore
/// let rollup = compute_rollup(&records, "E1", &dates, Some(&key))?;
/// ```
pub fn compute_rollup(
    records: &[ActivityRecord],
    owner_id: &str,
    dates: &[NaiveDate],
    key: Option<&Key>,
) -> Result<RollupMetrics, ComputeError> {
    MultiDayAggregator::new(DailyAggregator::new(RecordDecryptor::new(key)))
        .aggregate(records, owner_id, dates)
}

/// Configured analyzer for one owner.
///
/// Owns its key; the key bytes are wiped when the analyzer is dropped.
pub struct ActivityAnalyzer {
    owner_id: String,
    key: Option<Key>,
    afk_policy: AfkPolicy,
    rollup_options: RollupOptions,
}

impl ActivityAnalyzer {
    /// Create an analyzer with lenient AFK parsing and sequential rollups
    pub fn new(owner_id: impl Into<String>, key: Option<Key>) -> Self {
        Self {
            owner_id: owner_id.into(),
            key,
            afk_policy: AfkPolicy::default(),
            rollup_options: RollupOptions::default(),
        }
    }

    /// Create an analyzer from configuration
    pub fn from_config(config: &WorktraceConfig) -> Result<Self, ComputeError> {
        let owner_id = config
            .owner_id
            .clone()
            .ok_or_else(|| ComputeError::ConfigError("owner_id is not set".to_string()))?;
        let key = config.resolve_key()?;

        Ok(Self::new(owner_id, key)
            .with_afk_policy(config.afk_policy)
            .with_rollup_options(config.rollup_options()))
    }

    pub fn with_afk_policy(mut self, afk_policy: AfkPolicy) -> Self {
        self.afk_policy = afk_policy;
        self
    }

    pub fn with_rollup_options(mut self, options: RollupOptions) -> Self {
        self.rollup_options = options;
        self
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    /// Whether records are decrypted (false means field text is read verbatim)
    pub fn has_key(&self) -> bool {
        self.key.is_some()
    }

    /// Sorted distinct dates on which the owner has records
    pub fn available_dates(&self, records: &[ActivityRecord]) -> Vec<NaiveDate> {
        available_dates(records, &self.owner_id)
    }

    /// Metrics for one date
    pub fn daily(
        &self,
        records: &[ActivityRecord],
        date: NaiveDate,
    ) -> Result<DailyMetrics, ComputeError> {
        self.daily_aggregator().aggregate(records, &self.owner_id, date)
    }

    /// Rollup over `dates`, in order
    pub fn rollup(
        &self,
        records: &[ActivityRecord],
        dates: &[NaiveDate],
    ) -> Result<RollupMetrics, ComputeError> {
        let rollup = MultiDayAggregator::new(self.daily_aggregator())
            .with_options(self.rollup_options)
            .aggregate(records, &self.owner_id, dates)?;

        info!(
            owner_id = %self.owner_id,
            days = rollup.total_days,
            active_hours = rollup.total_active_hours,
            "rollup complete"
        );
        Ok(rollup)
    }

    /// Rollup over every date the owner has records for
    pub fn rollup_all(&self, records: &[ActivityRecord]) -> Result<RollupMetrics, ComputeError> {
        let dates = self.available_dates(records);
        debug!(owner_id = %self.owner_id, days = dates.len(), "rolling up all available dates");
        self.rollup(records, &dates)
    }

    fn daily_aggregator(&self) -> DailyAggregator<'_> {
        if self.key.is_none() {
            debug!("no key configured; reading field text verbatim");
        }
        DailyAggregator::new(
            RecordDecryptor::new(self.key.as_ref()).with_afk_policy(self.afk_policy),
        )
    }
}
