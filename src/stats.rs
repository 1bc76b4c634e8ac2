//! Distribution statistics over per-day values

use crate::types::{DailyMetrics, Distribution, RollupStatistics};

/// Mean and sample standard deviation of `values`
pub fn distribution(values: &[f64]) -> Distribution {
    if values.is_empty() {
        return Distribution {
            mean: 0.0,
            std_dev: None,
        };
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;

    let std_dev = if values.len() < 2 {
        None
    } else {
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
        Some(variance.sqrt())
    };

    Distribution { mean, std_dev }
}

impl RollupStatistics {
    /// Spread of the per-day values of `days`
    pub fn from_days(days: &[DailyMetrics]) -> Self {
        let column = |f: fn(&DailyMetrics) -> f64| -> Distribution {
            let values: Vec<f64> = days.iter().map(f).collect();
            distribution(&values)
        };

        RollupStatistics {
            total_hours: column(|d| d.total_hours),
            active_hours: column(|d| d.active_hours),
            inactive_hours: column(|d| d.inactive_hours),
            activity_rate_percent: column(|d| d.activity_rate_percent),
            records: column(|d| d.total_records as f64),
        }
    }
}
