//! Alerting System
//!
//! Derives alerts from health status, trend and reading thresholds. Keeps at
//! most one open alert per (battery, condition kind), escalates it in place,
//! and resolves it once the condition has been clear for a configured number
//! of evaluations.

mod alert;
mod filter;
mod manager;

pub use alert::{Alert, AlertStatus, AlertTransition, ConditionKind, Severity};
pub use filter::AlertFilter;
pub use manager::{AlertConfig, AlertManager, AlertState, Observation};

use thiserror::Error;

/// Alert configuration errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AlertError {
    #[error("Invalid alert configuration: {0}")]
    InvalidConfig(String),
}
