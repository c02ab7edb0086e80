//! Window Statistics

use serde::Serialize;
use telemetry_ingest::TelemetryReading;

/// Summary statistics for one signal over a window
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SignalStatistics {
    /// Mean value
    pub mean: f64,
    /// Standard deviation
    pub std_dev: f64,
    /// Minimum value
    pub min: f64,
    /// Maximum value
    pub max: f64,
    /// Mean absolute change between consecutive values
    pub rate_of_change: f64,
}

impl SignalStatistics {
    /// Compute statistics from a slice of values
    pub fn compute(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let min = values.iter().cloned().fold(f64::MAX, f64::min);
        let max = values.iter().cloned().fold(f64::MIN, f64::max);

        let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;

        let rate_of_change = if values.len() >= 2 {
            let total: f64 = values.windows(2).map(|w| (w[1] - w[0]).abs()).sum();
            total / (values.len() - 1) as f64
        } else {
            0.0
        };

        Self {
            mean,
            std_dev: variance.sqrt(),
            min,
            max,
            rate_of_change,
        }
    }

    /// Extract voltage values from readings
    pub fn extract_voltage(readings: &[TelemetryReading]) -> Vec<f64> {
        readings.iter().map(|r| r.voltage).collect()
    }

    /// Extract temperature values from readings
    pub fn extract_temperature(readings: &[TelemetryReading]) -> Vec<f64> {
        readings.iter().map(|r| r.temperature).collect()
    }

    /// Extract current values from readings
    pub fn extract_current(readings: &[TelemetryReading]) -> Vec<f64> {
        readings.iter().map(|r| r.current).collect()
    }
}
