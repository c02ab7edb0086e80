//! Ingest Error Types

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors during reading validation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Value out of allowed range
    #[error("{field} value {value} is out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// NaN or infinite value
    #[error("{field} is not a finite number")]
    NotFinite { field: &'static str },

    /// Cycle counter went backwards
    #[error("cycle count decreased from {previous} to {current}")]
    CycleCountDecreased { previous: u32, current: u32 },

    /// Inconsistent validation bounds
    #[error("Invalid {field} range [{min}, {max}]")]
    InvalidBounds {
        field: &'static str,
        min: f64,
        max: f64,
    },
}

/// Errors returned by `TelemetryLog::append`
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IngestError {
    #[error("Invalid reading: {0}")]
    InvalidReading(#[from] ValidationError),

    #[error("Out-of-order reading for {battery_id}: {timestamp} is not after {last_known}")]
    OutOfOrder {
        battery_id: String,
        timestamp: DateTime<Utc>,
        last_known: DateTime<Utc>,
    },
}
