//! Least-squares Trend Classifier

use crate::{Trend, TrendError};
use health_scorer::HealthScoreSample;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Slopes are rounded to this many parts before comparison with epsilon
const SLOPE_SCALE: f64 = 1_000_000.0;

/// Trend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    /// Number of most recent samples considered
    pub window_size: usize,
    /// Dead band around zero slope (score points per evaluation)
    pub epsilon: f64,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            window_size: 5,
            epsilon: 0.5,
        }
    }
}

impl TrendConfig {
    pub fn validate(&self) -> Result<(), TrendError> {
        if self.window_size < 2 {
            return Err(TrendError::InvalidConfig(format!(
                "window_size must be at least 2, got {}",
                self.window_size
            )));
        }
        if !self.epsilon.is_finite() || self.epsilon < 0.0 {
            return Err(TrendError::InvalidConfig(format!(
                "epsilon must be a non-negative number, got {}",
                self.epsilon
            )));
        }
        Ok(())
    }
}

/// Least-squares slope of `values` against their index, rounded to 1e-6.
///
/// Returns `None` for fewer than two values.
pub fn slope(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }

    let n = values.len() as f64;
    let mean_x = (n - 1.0) / 2.0;
    let mean_y = values.iter().sum::<f64>() / n;

    let mut num = 0.0;
    let mut den = 0.0;
    for (i, y) in values.iter().enumerate() {
        let dx = i as f64 - mean_x;
        num += dx * (y - mean_y);
        den += dx * dx;
    }

    Some((num / den * SLOPE_SCALE).round() / SLOPE_SCALE)
}

/// Classifies ordered series by the sign of their slope
#[derive(Debug, Clone)]
pub struct TrendAnalyzer {
    config: TrendConfig,
}

impl TrendAnalyzer {
    pub fn new(config: TrendConfig) -> Result<Self, TrendError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &TrendConfig {
        &self.config
    }

    /// Classify the last `window_size` values. Fewer than two is STABLE.
    pub fn classify_values(&self, values: &[f64]) -> Trend {
        let start = values.len().saturating_sub(self.config.window_size);
        let Some(slope) = slope(&values[start..]) else {
            return Trend::Stable;
        };

        let trend = if slope > self.config.epsilon {
            Trend::Improving
        } else if slope < -self.config.epsilon {
            Trend::Declining
        } else {
            Trend::Stable
        };
        debug!(slope, %trend, "Classified trend");
        trend
    }

    /// Classify an ordered health-score history
    pub fn classify_trend(&self, history: &[HealthScoreSample]) -> Trend {
        let scores: Vec<f64> = history.iter().map(|s| s.score).collect();
        self.classify_values(&scores)
    }
}

impl Default for TrendAnalyzer {
    fn default() -> Self {
        Self {
            config: TrendConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use health_scorer::HealthStatus;
    use proptest::prelude::*;

    fn samples(scores: &[f64]) -> Vec<HealthScoreSample> {
        scores
            .iter()
            .enumerate()
            .map(|(i, score)| HealthScoreSample {
                battery_id: "bat-1".into(),
                timestamp: Utc.timestamp_opt(1_700_000_000 + i as i64 * 60, 0).unwrap(),
                score: *score,
                status: HealthStatus::from_score(*score),
            })
            .collect()
    }

    #[test]
    fn test_fewer_than_two_is_stable() {
        let analyzer = TrendAnalyzer::default();
        assert_eq!(analyzer.classify_trend(&[]), Trend::Stable);
        assert_eq!(analyzer.classify_trend(&samples(&[42.0])), Trend::Stable);
    }

    #[test]
    fn test_slope() {
        assert_eq!(slope(&[90.0, 85.0, 60.0]), Some(-15.0));
        assert_eq!(slope(&[1.0, 2.0, 3.0, 4.0]), Some(1.0));
        assert_eq!(slope(&[5.0]), None);
    }

    #[test]
    fn test_directions() {
        let analyzer = TrendAnalyzer::default();
        assert_eq!(analyzer.classify_trend(&samples(&[60.0, 70.0, 80.0])), Trend::Improving);
        assert_eq!(analyzer.classify_trend(&samples(&[90.0, 85.0, 60.0])), Trend::Declining);
        assert_eq!(analyzer.classify_trend(&samples(&[80.0, 80.2, 79.9])), Trend::Stable);
    }

    #[test]
    fn test_epsilon_boundary_is_stable() {
        let analyzer = TrendAnalyzer::new(TrendConfig {
            window_size: 5,
            epsilon: 1.0,
        })
        .unwrap();
        // Slope exactly at epsilon does not exceed it
        assert_eq!(analyzer.classify_values(&[10.0, 11.0]), Trend::Stable);
        assert_eq!(analyzer.classify_values(&[11.0, 10.0]), Trend::Stable);
        assert_eq!(analyzer.classify_values(&[10.0, 11.5]), Trend::Improving);
    }

    #[test]
    fn test_only_window_is_considered() {
        let analyzer = TrendAnalyzer::new(TrendConfig {
            window_size: 3,
            epsilon: 0.5,
        })
        .unwrap();
        // Old decline followed by a flat tail
        assert_eq!(
            analyzer.classify_values(&[100.0, 80.0, 60.0, 60.0, 60.0, 60.0]),
            Trend::Stable
        );
    }

    #[test]
    fn test_invalid_config() {
        assert!(TrendAnalyzer::new(TrendConfig {
            window_size: 1,
            epsilon: 0.5
        })
        .is_err());
        assert!(TrendConfig {
            window_size: 5,
            epsilon: -1.0
        }
        .validate()
        .is_err());
    }

    proptest! {
        #[test]
        fn prop_continuing_decline_stays_declining(
            start in 50.0f64..100.0,
            step in 0.6f64..10.0,
            len in 2usize..12,
        ) {
            let analyzer = TrendAnalyzer::default();
            let mut values: Vec<f64> = (0..len).map(|i| start - step * i as f64).collect();
            prop_assert_eq!(analyzer.classify_values(&values), Trend::Declining);
            values.push(start - step * len as f64);
            prop_assert_eq!(analyzer.classify_values(&values), Trend::Declining);
        }
    }
}
