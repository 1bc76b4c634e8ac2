//! Productivity classification
//!
//! Rates a day on its rounded output values:
//! - overall tier from activity rate and tracked hours
//! - per-dimension assessments for tracked time, activity rate and inactivity

use crate::types::{Assessment, AssessmentDimension, AssessmentLevel, ProductivityTier};

/// Classify a day from its rounded activity rate (%) and total hours
pub fn classify_tier(activity_rate_percent: f64, total_hours: f64) -> ProductivityTier {
    if activity_rate_percent >= 80.0 && total_hours >= 6.0 {
        ProductivityTier::Excellent
    } else if activity_rate_percent >= 60.0 && total_hours >= 4.0 {
        ProductivityTier::Good
    } else {
        ProductivityTier::NeedsImprovement
    }
}

/// Rate tracked time, activity rate and inactivity, in that order
pub fn assess_day(
    total_hours: f64,
    activity_rate_percent: f64,
    inactivity_rate_percent: f64,
) -> Vec<Assessment> {
    vec![
        Assessment {
            dimension: AssessmentDimension::TrackedTime,
            level: at_least(total_hours, 8.0, 6.0),
            value: total_hours,
        },
        Assessment {
            dimension: AssessmentDimension::ActivityRate,
            level: at_least(activity_rate_percent, 80.0, 60.0),
            value: activity_rate_percent,
        },
        Assessment {
            dimension: AssessmentDimension::Inactivity,
            level: at_most(inactivity_rate_percent, 20.0, 40.0),
            value: inactivity_rate_percent,
        },
    ]
}

/// Higher is better
fn at_least(value: f64, excellent: f64, good: f64) -> AssessmentLevel {
    if value >= excellent {
        AssessmentLevel::Excellent
    } else if value >= good {
        AssessmentLevel::Good
    } else {
        AssessmentLevel::Poor
    }
}

/// Lower is better
fn at_most(value: f64, excellent: f64, good: f64) -> AssessmentLevel {
    if value <= excellent {
        AssessmentLevel::Excellent
    } else if value <= good {
        AssessmentLevel::Good
    } else {
        AssessmentLevel::Poor
    }
}
