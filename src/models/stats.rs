//! Statistics response models.

use serde::{Deserialize, Serialize};

const SECONDS_PER_DAY: f64 = 86_400.0;
const SECONDS_PER_HOUR: f64 = 3_600.0;
const SECONDS_PER_MINUTE: f64 = 60.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrsTotal {
    pub total_prs: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrsStatus {
    pub open_prs: i64,
    pub merged_prs: i64,
}

/// Number of pull requests a user is assigned to review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAssignment {
    pub user_id: String,
    pub username: String,
    pub assignment_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAssignments {
    pub user_assignments: Vec<UserAssignment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopReviewers {
    pub top_reviewers: Vec<UserAssignment>,
}

/// A per-team counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMetric {
    pub team_name: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamMetrics {
    pub team_metrics: Vec<TeamMetric>,
}

/// Whole days, hours, minutes and seconds of a duration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseTimeBreakdown {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl CloseTimeBreakdown {
    pub fn from_seconds(total: f64) -> Self {
        let days = (total / SECONDS_PER_DAY).trunc();
        let mut remainder = total - days * SECONDS_PER_DAY;
        let hours = (remainder / SECONDS_PER_HOUR).trunc();
        remainder -= hours * SECONDS_PER_HOUR;
        let minutes = (remainder / SECONDS_PER_MINUTE).trunc();
        remainder -= minutes * SECONDS_PER_MINUTE;

        Self {
            days: days as i64,
            hours: hours as i64,
            minutes: minutes as i64,
            seconds: remainder.trunc() as i64,
        }
    }
}

/// Average time between creation and merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvgCloseTime {
    pub average_seconds: f64,
    pub breakdown: CloseTimeBreakdown,
    pub merged_prs_count: i64,
}

impl AvgCloseTime {
    /// Shape the raw `(average seconds, merged count)` pair.
    pub fn new(average_seconds: f64, merged_prs_count: i64) -> Self {
        let breakdown = if merged_prs_count > 0 {
            CloseTimeBreakdown::from_seconds(average_seconds)
        } else {
            CloseTimeBreakdown::default()
        };

        Self {
            average_seconds,
            breakdown,
            merged_prs_count,
        }
    }
}
