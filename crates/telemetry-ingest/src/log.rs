//! Per-battery Telemetry Log

use crate::error::IngestError;
use crate::validator::Validator;
use crate::{BatteryId, TelemetryReading};
use chrono::{DateTime, Utc};
use ring_buffer::{RetentionPolicy, RingBuffer};
use tracing::{debug, warn};

/// Append-only, timestamp-ordered reading log for one battery
///
/// Out-of-order readings are rejected, never reordered. Every accepted
/// reading bumps `version`, which lets the evaluator tell whether anything
/// arrived since it last looked.
#[derive(Debug, Clone)]
pub struct TelemetryLog {
    battery_id: BatteryId,
    readings: RingBuffer<TelemetryReading>,
    last_timestamp: Option<DateTime<Utc>>,
    last_cycle_count: Option<u32>,
    version: u64,
}

impl TelemetryLog {
    /// Create an empty log
    pub fn new(battery_id: impl Into<BatteryId>, retention: RetentionPolicy) -> Self {
        Self {
            battery_id: battery_id.into(),
            readings: RingBuffer::with_policy(retention),
            last_timestamp: None,
            last_cycle_count: None,
            version: 0,
        }
    }

    /// Validate and append a reading, returning the new log version
    pub fn append(
        &mut self,
        reading: TelemetryReading,
        validator: &Validator,
    ) -> Result<u64, IngestError> {
        if let Some(last_known) = self.last_timestamp {
            if reading.timestamp <= last_known {
                warn!(
                    battery_id = %self.battery_id,
                    timestamp = %reading.timestamp,
                    last_known = %last_known,
                    "Rejected out-of-order reading"
                );
                return Err(IngestError::OutOfOrder {
                    battery_id: self.battery_id.clone(),
                    timestamp: reading.timestamp,
                    last_known,
                });
            }
        }

        if let Err(err) = validator.validate_reading(&reading, self.last_cycle_count) {
            warn!(battery_id = %self.battery_id, "Rejected invalid reading: {}", err);
            return Err(err.into());
        }

        self.last_timestamp = Some(reading.timestamp);
        self.last_cycle_count = Some(reading.cycle_count);
        self.readings.push(reading);
        self.version += 1;

        debug!(
            battery_id = %self.battery_id,
            version = self.version,
            "Reading appended"
        );
        Ok(self.version)
    }

    /// The most recent `size` readings in time order
    pub fn window(&self, size: usize) -> Vec<TelemetryReading> {
        self.readings.tail(size)
    }

    /// Readings at or after `since` in time order
    pub fn since(&self, since: DateTime<Utc>) -> Vec<TelemetryReading> {
        self.readings.read_since(since)
    }

    /// Timestamp of the latest accepted reading
    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.last_timestamp
    }

    /// Number of readings accepted so far
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Number of readings currently retained
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    /// Whether the log holds no readings
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}
