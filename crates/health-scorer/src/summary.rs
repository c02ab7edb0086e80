//! Per-battery Reading Summary

use crate::statistics::SignalStatistics;
use chrono::{DateTime, Utc};
use serde::Serialize;
use telemetry_ingest::TelemetryReading;

/// Signal statistics over a span of retained readings
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReadingSummary {
    pub reading_count: usize,
    pub first_reading_at: Option<DateTime<Utc>>,
    pub last_reading_at: Option<DateTime<Utc>>,
    pub voltage: SignalStatistics,
    pub temperature: SignalStatistics,
    pub current: SignalStatistics,
    /// Lowest reported state of charge; `None` if no reading carried one
    pub min_state_of_charge: Option<f64>,
    /// Cycle counter of the newest reading
    pub total_cycles: u32,
}

impl ReadingSummary {
    /// Summarize readings given in time order
    pub fn from_readings(readings: &[TelemetryReading]) -> Self {
        let min_state_of_charge = readings
            .iter()
            .filter_map(|r| r.state_of_charge)
            .reduce(f64::min);

        Self {
            reading_count: readings.len(),
            first_reading_at: readings.first().map(|r| r.timestamp),
            last_reading_at: readings.last().map(|r| r.timestamp),
            voltage: SignalStatistics::compute(&SignalStatistics::extract_voltage(readings)),
            temperature: SignalStatistics::compute(&SignalStatistics::extract_temperature(
                readings,
            )),
            current: SignalStatistics::compute(&SignalStatistics::extract_current(readings)),
            min_state_of_charge,
            total_cycles: readings.last().map(|r| r.cycle_count).unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn reading(secs: i64, voltage: f64, current: f64, soc: Option<f64>, cycles: u32) -> TelemetryReading {
        TelemetryReading {
            timestamp: Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
            voltage,
            current,
            temperature: 20.0 + secs as f64,
            cycle_count: cycles,
            state_of_charge: soc,
        }
    }

    #[test]
    fn test_summary_over_readings() {
        let readings = vec![
            reading(0, 3.6, -2.0, Some(80.0), 10),
            reading(10, 3.8, 5.0, None, 11),
            reading(20, 3.7, 1.0, Some(65.0), 12),
        ];
        let summary = ReadingSummary::from_readings(&readings);

        assert_eq!(summary.reading_count, 3);
        assert!((summary.voltage.mean - 3.7).abs() < 1e-9);
        assert!((summary.temperature.mean - 30.0).abs() < 1e-9);
        assert_eq!(summary.current.max, 5.0);
        assert_eq!(summary.current.min, -2.0);
        assert_eq!(summary.min_state_of_charge, Some(65.0));
        assert_eq!(summary.total_cycles, 12);
        assert_eq!(summary.first_reading_at, Some(readings[0].timestamp));
        assert_eq!(summary.last_reading_at, Some(readings[2].timestamp));
        assert!((summary.temperature.rate_of_change - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_summary() {
        let summary = ReadingSummary::from_readings(&[]);
        assert_eq!(summary, ReadingSummary::default());
        assert_eq!(summary.min_state_of_charge, None);
    }
}
