//! Multi-day aggregation
//!
//! Runs the daily aggregation for every requested date and rolls the results
//! up. Totals are sums of the per-day rounded hour values, so they match what
//! a reader adding up the daily figures would get. A date without data fails
//! the whole rollup.

use std::thread;

use chrono::NaiveDate;
use tracing::debug;

use crate::daily::{percent, round_to, DailyAggregator, HOURS_DECIMALS, RATE_DECIMALS};
use crate::error::ComputeError;
use crate::types::{ActivityRecord, DailyMetrics, DaySummary, RollupMetrics, RollupStatistics};

/// Evaluation options for a rollup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RollupOptions {
    /// Aggregate dates on scoped worker threads
    pub parallel: bool,
}

/// Computes [`RollupMetrics`] over an ordered list of dates
#[derive(Debug, Clone, Copy)]
pub struct MultiDayAggregator<'k> {
    daily: DailyAggregator<'k>,
    options: RollupOptions,
}

impl<'k> MultiDayAggregator<'k> {
    pub fn new(daily: DailyAggregator<'k>) -> Self {
        Self {
            daily,
            options: RollupOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RollupOptions) -> Self {
        self.options = options;
        self
    }

    /// Aggregate `dates` in order; the breakdown follows the same order.
    pub fn aggregate(
        &self,
        records: &[ActivityRecord],
        owner_id: &str,
        dates: &[NaiveDate],
    ) -> Result<RollupMetrics, ComputeError> {
        debug!(
            owner_id,
            days = dates.len(),
            parallel = self.options.parallel,
            "aggregating rollup"
        );

        let days = if self.options.parallel {
            self.aggregate_parallel(records, owner_id, dates)?
        } else {
            dates
                .iter()
                .map(|&date| self.daily.aggregate(records, owner_id, date))
                .collect::<Result<Vec<_>, _>>()?
        };

        Ok(build_rollup(owner_id, &days))
    }

    /// Split `dates` into contiguous chunks, one per worker. Chunk results are
    /// joined in order, so the reported error is the one for the earliest
    /// failing date, as in sequential evaluation.
    fn aggregate_parallel(
        &self,
        records: &[ActivityRecord],
        owner_id: &str,
        dates: &[NaiveDate],
    ) -> Result<Vec<DailyMetrics>, ComputeError> {
        let workers = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let chunk_len = dates.len().div_ceil(workers).max(1);
        let daily = self.daily;

        thread::scope(|scope| {
            let handles: Vec<_> = dates
                .chunks(chunk_len)
                .map(|chunk| {
                    scope.spawn(move || {
                        chunk
                            .iter()
                            .map(|&date| daily.aggregate(records, owner_id, date))
                            .collect::<Result<Vec<_>, _>>()
                    })
                })
                .collect();

            let mut days = Vec::with_capacity(dates.len());
            for handle in handles {
                let chunk = handle
                    .join()
                    .unwrap_or_else(|panic| std::panic::resume_unwind(panic))?;
                days.extend(chunk);
            }
            Ok(days)
        })
    }
}

fn build_rollup(owner_id: &str, days: &[DailyMetrics]) -> RollupMetrics {
    let total_days = days.len();
    let sum_hours =
        |f: fn(&DailyMetrics) -> f64| round_to(days.iter().map(f).sum(), HOURS_DECIMALS);
    let average = |total: f64| {
        if total_days > 0 {
            round_to(total / total_days as f64, HOURS_DECIMALS)
        } else {
            0.0
        }
    };

    let total_active_hours = sum_hours(|d| d.active_hours);
    let total_tracked_hours = sum_hours(|d| d.total_hours);
    let total_inactive_hours = sum_hours(|d| d.inactive_hours);

    RollupMetrics {
        owner_id: owner_id.to_string(),
        total_days,
        total_records: days.iter().map(|d| d.total_records).sum(),
        total_active_hours,
        total_tracked_hours,
        total_inactive_hours,
        total_afk_hours: sum_hours(|d| d.afk_hours),
        average_active_hours: average(total_active_hours),
        average_total_hours: average(total_tracked_hours),
        average_inactive_hours: average(total_inactive_hours),
        overall_activity_rate_percent: round_to(
            percent(total_active_hours, total_tracked_hours),
            RATE_DECIMALS,
        ),
        statistics: RollupStatistics::from_days(days),
        daily_breakdown: days.iter().map(DaySummary::from).collect(),
    }
}
