//! Telemetry Ingest
//!
//! Accepts periodic raw battery readings, validates them against plausible
//! physical ranges and appends them to a per-battery, timestamp-ordered log.

mod error;
mod log;
mod validator;

pub use error::{IngestError, ValidationError};
pub use log::TelemetryLog;
pub use validator::{ValidationConfig, Validator};

use chrono::{DateTime, Utc};
use ring_buffer::Timestamped;
use serde::{Deserialize, Serialize};

/// Battery identifier (UUID string assigned at registration)
pub type BatteryId = String;

/// A single raw reading reported by a battery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryReading {
    pub timestamp: DateTime<Utc>,
    /// Terminal voltage (V)
    pub voltage: f64,
    /// Current (A), positive while charging
    pub current: f64,
    /// Cell temperature (°C)
    pub temperature: f64,
    /// Full charge/discharge cycles completed
    pub cycle_count: u32,
    /// State of charge (%), when the battery reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_of_charge: Option<f64>,
}

impl Timestamped for TelemetryReading {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}
