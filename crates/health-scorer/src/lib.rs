//! Battery Health Scoring
//!
//! Maps a bounded window of telemetry readings to a 0-100 health score and a
//! discrete status. Scoring is a pure function of the window and its
//! configuration, so it can be unit-tested and benchmarked in isolation.

mod performance;
mod scorer;
mod statistics;
mod summary;

pub use performance::{PerformanceSample, PERFORMANCE_METRICS};
pub use scorer::{HealthModel, HealthScorer, ScoreBreakdown, ScoringConfig};
pub use statistics::SignalStatistics;
pub use summary::ReadingSummary;

use chrono::{DateTime, Utc};
use ring_buffer::Timestamped;
use serde::{Deserialize, Serialize};
use telemetry_ingest::BatteryId;
use thiserror::Error;

/// Lowest score classified as HEALTHY
pub const HEALTHY_THRESHOLD: f64 = 80.0;
/// Lowest score classified as WARNING
pub const WARNING_THRESHOLD: f64 = 50.0;

/// Discrete battery status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthStatus {
    Healthy,
    Warning,
    Critical,
    /// No readings have been evaluated yet
    Unknown,
}

impl HealthStatus {
    /// Classify a score: `>= 80` HEALTHY, `[50, 80)` WARNING, `< 50` CRITICAL.
    pub fn from_score(score: f64) -> Self {
        if score >= HEALTHY_THRESHOLD {
            HealthStatus::Healthy
        } else if score >= WARNING_THRESHOLD {
            HealthStatus::Warning
        } else {
            HealthStatus::Critical
        }
    }

    /// Whether this is one of the three operational statuses
    pub fn is_evaluated(self) -> bool {
        !matches!(self, HealthStatus::Unknown)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HealthStatus::Healthy => "HEALTHY",
            HealthStatus::Warning => "WARNING",
            HealthStatus::Critical => "CRITICAL",
            HealthStatus::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One evaluated health score for a battery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthScoreSample {
    pub battery_id: BatteryId,
    /// Timestamp of the newest reading in the scored window
    pub timestamp: DateTime<Utc>,
    pub score: f64,
    pub status: HealthStatus,
}

impl Timestamped for HealthScoreSample {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Errors produced by the scorer
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoringError {
    /// The battery has no readings yet
    #[error("No readings in scoring window")]
    EmptyWindow,

    #[error("Invalid scoring configuration: {0}")]
    InvalidConfig(String),
}

/// Maintenance recommendations for a health score
pub fn recommendations(score: f64) -> Vec<&'static str> {
    if score < 60.0 {
        vec![
            "Schedule immediate maintenance check",
            "Consider battery replacement",
            "Monitor temperature closely",
        ]
    } else if score < 75.0 {
        vec![
            "Schedule routine maintenance check",
            "Monitor battery performance",
            "Check for any unusual patterns",
        ]
    } else {
        vec!["Battery performance is within normal range"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_threshold_boundaries() {
        assert_eq!(HealthStatus::from_score(100.0), HealthStatus::Healthy);
        assert_eq!(HealthStatus::from_score(80.0), HealthStatus::Healthy);
        assert_eq!(HealthStatus::from_score(79.99), HealthStatus::Warning);
        assert_eq!(HealthStatus::from_score(50.0), HealthStatus::Warning);
        assert_eq!(HealthStatus::from_score(49.99), HealthStatus::Critical);
        assert_eq!(HealthStatus::from_score(0.0), HealthStatus::Critical);
    }

    #[test]
    fn test_recommendations() {
        assert_eq!(recommendations(45.0).len(), 3);
        assert_eq!(recommendations(70.0)[0], "Schedule routine maintenance check");
        assert_eq!(
            recommendations(90.0),
            vec!["Battery performance is within normal range"]
        );
    }

    #[test]
    fn test_status_display() {
        assert_eq!(HealthStatus::Critical.to_string(), "CRITICAL");
        assert!(HealthStatus::Warning.is_evaluated());
        assert!(!HealthStatus::Unknown.is_evaluated());
    }

    proptest! {
        #[test]
        fn prop_classification_matches_thresholds(score in 0.0f64..=100.0) {
            let status = HealthStatus::from_score(score);
            prop_assert_eq!(status == HealthStatus::Healthy, score >= 80.0);
            prop_assert_eq!(status == HealthStatus::Warning, (50.0..80.0).contains(&score));
            prop_assert_eq!(status == HealthStatus::Critical, score < 50.0);
        }
    }
}
