//! Engine configuration

use crate::EngineError;
use alerting::AlertConfig;
use health_scorer::ScoringConfig;
use serde::{Deserialize, Serialize};
use storage::RetentionConfig;
use telemetry_ingest::ValidationConfig;
use trend_analyzer::TrendConfig;

/// Engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub validation: ValidationConfig,
    pub scoring: ScoringConfig,
    pub trend: TrendConfig,
    pub alerts: AlertConfig,
    pub retention: RetentionConfig,
    pub scheduler: SchedulerSettings,
}

/// Evaluation scheduling
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSettings {
    /// Period of the evaluation cycle (ms)
    pub evaluation_interval_ms: u64,
    /// Per-battery evaluation budget (ms)
    pub evaluation_budget_ms: u64,
    /// Evaluate right after each accepted reading
    pub evaluate_on_ingest: bool,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            evaluation_interval_ms: 60_000,
            evaluation_budget_ms: 5_000,
            evaluate_on_ingest: false,
        }
    }
}

impl EngineConfig {
    /// Reject inconsistent thresholds, weights and limits
    pub fn validate(&self) -> Result<(), EngineError> {
        let config_err = |e: &dyn std::fmt::Display| EngineError::Configuration(e.to_string());

        self.validation.validate().map_err(|e| config_err(&e))?;
        self.scoring.validate().map_err(|e| config_err(&e))?;
        self.trend.validate().map_err(|e| config_err(&e))?;
        self.alerts.validate().map_err(|e| config_err(&e))?;

        if self.scheduler.evaluation_interval_ms == 0 || self.scheduler.evaluation_budget_ms == 0 {
            return Err(EngineError::Configuration(
                "evaluation interval and budget must be positive".into(),
            ));
        }
        if self.retention.history.capacity < self.trend.window_size {
            return Err(EngineError::Configuration(format!(
                "history retention ({}) is shorter than the trend window ({})",
                self.retention.history.capacity, self.trend.window_size
            )));
        }
        if self.retention.telemetry.capacity < self.scoring.window_size {
            return Err(EngineError::Configuration(format!(
                "telemetry retention ({}) is shorter than the scoring window ({})",
                self.retention.telemetry.capacity, self.scoring.window_size
            )));
        }
        Ok(())
    }
}
