//! Battery Fleet Evaluation Engine
//!
//! Ties ingest, scoring, trend analysis and alerting together. Evaluations of
//! different batteries run concurrently; everything touching one battery's
//! state is serialized behind that battery's evaluation lock.

mod config;
mod engine;
mod scheduler;
mod worker;

pub use config::{EngineConfig, SchedulerSettings};
pub use engine::{
    BatteryDetail, BatterySummary, CycleReport, EvaluationOutcome, FleetEngine, OutcomeKind,
};
pub use scheduler::EvaluationScheduler;

pub use alerting::{Alert, AlertFilter, AlertStatus, ConditionKind, Severity};
pub use health_scorer::{HealthModel, HealthStatus};
pub use storage::{
    AnalyticsKind, AnalyticsSeries, AnalyticsWindow, Battery, BatteryDescriptor, BatteryUpdate,
    FleetStats,
};
pub use telemetry_ingest::{BatteryId, TelemetryReading};
pub use trend_analyzer::Trend;

use chrono::{DateTime, Utc};
use storage::StorageError;
use telemetry_ingest::{IngestError, ValidationError};
use thiserror::Error;

/// Engine errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("Invalid reading: {0}")]
    InvalidReading(ValidationError),

    #[error("Out-of-order reading for {battery_id}: {timestamp} is not after {last_known}")]
    OutOfOrder {
        battery_id: String,
        timestamp: DateTime<Utc>,
        last_known: DateTime<Utc>,
    },

    #[error("Battery not found: {0}")]
    BatteryNotFound(String),

    #[error("Alert not found: {0}")]
    AlertNotFound(String),

    /// Non-fatal; the battery is retried on the next cycle
    #[error("Evaluation of {battery_id} exceeded its {budget_ms}ms budget")]
    EvaluationTimeout { battery_id: String, budget_ms: u64 },

    /// Fatal at startup
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The health model rejected the window or panicked
    #[error("Scoring error: {0}")]
    Scoring(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl EngineError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            EngineError::BatteryNotFound(_) | EngineError::AlertNotFound(_)
        )
    }
}

impl From<IngestError> for EngineError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::InvalidReading(e) => EngineError::InvalidReading(e),
            IngestError::OutOfOrder {
                battery_id,
                timestamp,
                last_known,
            } => EngineError::OutOfOrder {
                battery_id,
                timestamp,
                last_known,
            },
        }
    }
}

impl From<StorageError> for EngineError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::BatteryNotFound(id) => EngineError::BatteryNotFound(id),
            StorageError::AlertNotFound(id) => EngineError::AlertNotFound(id),
            other => EngineError::Storage(other.to_string()),
        }
    }
}
