//! Single-day aggregation
//!
//! Selects the records of one owner on one calendar date, decrypts them, and
//! folds them into [`DailyMetrics`]. Any record that fails to decrypt fails
//! the whole day so totals never under-report.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use tracing::debug;

use crate::assessment::{assess_day, classify_tier};
use crate::error::ComputeError;
use crate::record::RecordDecryptor;
use crate::types::{ActivityRecord, DailyMetrics};

const SECONDS_PER_HOUR: f64 = 3600.0;
/// Decimal places for hour values
pub const HOURS_DECIMALS: i32 = 2;
/// Decimal places for percentages
pub const RATE_DECIMALS: i32 = 1;

/// Running sums over the selected records of a day
#[derive(Debug, Default)]
struct DayTotals {
    records: usize,
    total_seconds: f64,
    active_seconds: f64,
    afk_seconds: f64,
    observed_start: Option<NaiveDateTime>,
    observed_end: Option<NaiveDateTime>,
}

impl DayTotals {
    fn add(mut self, start: NaiveDateTime, duration_seconds: f64, is_afk: bool) -> Self {
        let end = interval_end(start, duration_seconds);

        self.records += 1;
        self.total_seconds += duration_seconds;
        if is_afk {
            self.afk_seconds += duration_seconds;
        } else {
            self.active_seconds += duration_seconds;
        }
        self.observed_start = Some(self.observed_start.map_or(start, |s| s.min(start)));
        self.observed_end = Some(self.observed_end.map_or(end, |e| e.max(end)));

        self
    }
}

/// Computes [`DailyMetrics`] for an owner and date
#[derive(Debug, Clone, Copy)]
pub struct DailyAggregator<'k> {
    decryptor: RecordDecryptor<'k>,
}

impl<'k> DailyAggregator<'k> {
    pub fn new(decryptor: RecordDecryptor<'k>) -> Self {
        Self { decryptor }
    }

    /// Aggregate the records of `owner_id` whose start falls on `date`.
    ///
    /// Only the date portion of the start time is compared; no timezone
    /// conversion is applied.
    pub fn aggregate(
        &self,
        records: &[ActivityRecord],
        owner_id: &str,
        date: NaiveDate,
    ) -> Result<DailyMetrics, ComputeError> {
        let selected: Vec<&ActivityRecord> = records
            .iter()
            .filter(|r| r.owner_id == owner_id && r.date() == date)
            .collect();

        if selected.is_empty() {
            return Err(ComputeError::NoDataForDate {
                owner_id: owner_id.to_string(),
                date: date.to_string(),
            });
        }

        debug!(owner_id, %date, records = selected.len(), "aggregating day");

        let totals = selected
            .into_iter()
            .try_fold(DayTotals::default(), |totals, record| {
                let decrypted = self.decryptor.decrypt(record)?;
                Ok::<_, ComputeError>(totals.add(
                    decrypted.start_time,
                    decrypted.duration_seconds,
                    decrypted.is_afk,
                ))
            })?;

        Ok(build_metrics(owner_id, date, totals))
    }
}

fn build_metrics(owner_id: &str, date: NaiveDate, totals: DayTotals) -> DailyMetrics {
    let inactive_seconds = totals.total_seconds - totals.active_seconds;

    let total_hours = round_to(totals.total_seconds / SECONDS_PER_HOUR, HOURS_DECIMALS);
    let activity_rate_percent = round_to(
        percent(totals.active_seconds, totals.total_seconds),
        RATE_DECIMALS,
    );
    let inactivity_rate_percent =
        round_to(percent(inactive_seconds, totals.total_seconds), RATE_DECIMALS);

    DailyMetrics {
        owner_id: owner_id.to_string(),
        date,
        total_records: totals.records,
        total_seconds: totals.total_seconds,
        active_seconds: totals.active_seconds,
        afk_seconds: totals.afk_seconds,
        inactive_seconds,
        total_hours,
        active_hours: round_to(totals.active_seconds / SECONDS_PER_HOUR, HOURS_DECIMALS),
        afk_hours: round_to(totals.afk_seconds / SECONDS_PER_HOUR, HOURS_DECIMALS),
        inactive_hours: round_to(inactive_seconds / SECONDS_PER_HOUR, HOURS_DECIMALS),
        activity_rate_percent,
        inactivity_rate_percent,
        afk_rate_percent: round_to(
            percent(totals.afk_seconds, totals.total_seconds),
            RATE_DECIMALS,
        ),
        observed_start: totals.observed_start,
        observed_end: totals.observed_end,
        productivity_tier: classify_tier(activity_rate_percent, total_hours),
        assessments: assess_day(total_hours, activity_rate_percent, inactivity_rate_percent),
    }
}

/// End of an interval, saturating at the latest representable time
fn interval_end(start: NaiveDateTime, duration_seconds: f64) -> NaiveDateTime {
    let millis = (duration_seconds * 1000.0).round();
    let delta = if millis < i64::MAX as f64 {
        TimeDelta::try_milliseconds(millis as i64)
    } else {
        None
    };

    delta
        .and_then(|delta| start.checked_add_signed(delta))
        .unwrap_or(NaiveDateTime::MAX)
}

/// `part / whole * 100`, or 0 when `whole` is not positive
pub(crate) fn percent(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}

/// Round half away from zero to `decimals` places.
///
/// The scaled value is first snapped to 1e-6 so binary artefacts such as
/// 3.6849999999999996 round as the decimal 3.685 they stand for.
pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    let snapped = ((value * factor) * 1e6).round() / 1e6;
    if !snapped.is_finite() {
        return value;
    }
    snapped.round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AssessmentLevel, ProductivityTier};
    use pretty_assertions::assert_eq;

    fn at(date: &str, time: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(&format!("{} {}", date, time), "%Y-%m-%d %H:%M:%S")
            .unwrap()
    }

    fn plain(owner: &str, start: NaiveDateTime, seconds: &str, afk: &str) -> ActivityRecord {
        ActivityRecord {
            owner_id: owner.to_string(),
            start_time: start,
            encrypted_duration: seconds.into(),
            encrypted_afk_flag: afk.into(),
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, 27).unwrap()
    }

    fn aggregate(records: &[ActivityRecord]) -> Result<DailyMetrics, ComputeError> {
        DailyAggregator::new(RecordDecryptor::new(None)).aggregate(records, "E1", day())
    }

    #[test]
    fn test_three_intervals() {
        let records = vec![
            plain("E1", at("2025-08-27", "09:00:00"), "3600", "false"),
            plain("E1", at("2025-08-27", "10:00:00"), "7200", "true"),
            plain("E1", at("2025-08-27", "12:00:00"), "1800", "false"),
        ];

        let metrics = aggregate(&records).unwrap();

        assert_eq!(metrics.total_records, 3);
        assert_eq!(metrics.total_seconds, 12600.0);
        assert_eq!(metrics.active_seconds, 5400.0);
        assert_eq!(metrics.afk_seconds, 7200.0);
        assert_eq!(metrics.inactive_seconds, 7200.0);
        assert_eq!(metrics.total_hours, 3.5);
        assert_eq!(metrics.active_hours, 1.5);
        assert_eq!(metrics.afk_hours, 2.0);
        assert_eq!(metrics.activity_rate_percent, 42.9);
        assert_eq!(metrics.inactivity_rate_percent, 57.1);
        assert_eq!(metrics.afk_rate_percent, 57.1);
        assert_eq!(metrics.observed_start, Some(at("2025-08-27", "09:00:00")));
        assert_eq!(metrics.observed_end, Some(at("2025-08-27", "12:30:00")));
        assert_eq!(metrics.productivity_tier, ProductivityTier::NeedsImprovement);
    }

    #[test]
    fn test_selection_by_owner_and_date() {
        let records = vec![
            plain("E1", at("2025-08-27", "23:59:59"), "60", "false"),
            plain("E2", at("2025-08-27", "10:00:00"), "9999", "false"),
            plain("E1", at("2025-08-28", "00:00:00"), "9999", "false"),
            plain("E1", at("2025-08-26", "23:00:00"), "9999", "false"),
        ];

        let metrics = aggregate(&records).unwrap();
        assert_eq!(metrics.total_records, 1);
        assert_eq!(metrics.total_seconds, 60.0);
        // An interval may run past midnight; the end is still reported
        assert_eq!(metrics.observed_end, Some(at("2025-08-28", "00:00:59")));
    }

    #[test]
    fn test_no_data_for_date() {
        let records = vec![plain("E2", at("2025-08-27", "09:00:00"), "60", "false")];
        let result = aggregate(&records);
        assert!(matches!(result, Err(ComputeError::NoDataForDate { .. })));
    }

    #[test]
    fn test_zero_duration_day() {
        let records = vec![plain("E1", at("2025-08-27", "09:00:00"), "0", "false")];

        let metrics = aggregate(&records).unwrap();
        assert_eq!(metrics.total_seconds, 0.0);
        assert_eq!(metrics.activity_rate_percent, 0.0);
        assert_eq!(metrics.inactivity_rate_percent, 0.0);
        assert_eq!(metrics.afk_rate_percent, 0.0);
        assert_eq!(metrics.observed_start, metrics.observed_end);
    }

    #[test]
    fn test_one_bad_record_fails_the_day() {
        let records = vec![
            plain("E1", at("2025-08-27", "09:00:00"), "3600", "false"),
            plain("E1", at("2025-08-27", "10:00:00"), "not-a-number", "false"),
        ];
        let result = aggregate(&records);
        assert!(matches!(result, Err(ComputeError::InvalidDurationValue(_))));
    }

    #[test]
    fn test_huge_duration_saturates_end() {
        let records = vec![
            plain("E1", at("2025-08-27", "09:00:00"), "1e13", "false"),
            plain("E1", at("2025-08-27", "10:00:00"), "3600", "true"),
        ];

        let metrics = aggregate(&records).unwrap();
        assert_eq!(metrics.total_seconds, 1e13 + 3600.0);
        assert_eq!(metrics.active_seconds, 1e13);
        assert_eq!(metrics.observed_end, Some(NaiveDateTime::MAX));
    }

    #[test]
    fn test_interval_end() {
        let start = at("2025-08-27", "09:00:00");
        assert_eq!(
            interval_end(start, 90.5),
            at("2025-08-27", "09:01:30") + TimeDelta::milliseconds(500)
        );
        assert_eq!(interval_end(start, f64::MAX), NaiveDateTime::MAX);
    }

    #[test]
    fn test_excellent_day() {
        let records = vec![
            plain("E1", at("2025-08-27", "08:00:00"), "21600", "false"),
            plain("E1", at("2025-08-27", "14:00:00"), "3600", "true"),
        ];

        let metrics = aggregate(&records).unwrap();
        assert_eq!(metrics.total_hours, 7.0);
        assert_eq!(metrics.activity_rate_percent, 85.7);
        assert_eq!(metrics.productivity_tier, ProductivityTier::Excellent);
        assert_eq!(metrics.assessments[0].level, AssessmentLevel::Good);
        assert_eq!(metrics.assessments[1].level, AssessmentLevel::Excellent);
        assert_eq!(metrics.assessments[2].level, AssessmentLevel::Excellent);
    }

    #[test]
    fn test_identical_inputs_identical_metrics() {
        let records = vec![
            plain("E1", at("2025-08-27", "09:00:00"), "1234.5", "false"),
            plain("E1", at("2025-08-27", "11:00:00"), "987.25", "true"),
        ];
        assert_eq!(aggregate(&records).unwrap(), aggregate(&records).unwrap());
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(3.6849999999999996, 2), 3.69);
        assert_eq!(round_to(42.857142857142854, 1), 42.9);
        assert_eq!(round_to(59.82142857142857, 1), 59.8);
        assert_eq!(round_to(1.004, 2), 1.0);
        assert_eq!(round_to(0.0, 2), 0.0);
    }

    #[test]
    fn test_percent_guard() {
        assert_eq!(percent(0.0, 0.0), 0.0);
        assert_eq!(percent(1.0, 4.0), 25.0);
    }
}
