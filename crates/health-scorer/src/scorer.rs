//! Weighted Health Score Model

use crate::performance::PerformanceSample;
use crate::statistics::SignalStatistics;
use crate::{HealthScoreSample, HealthStatus, ScoringError};
use serde::{Deserialize, Serialize};
use telemetry_ingest::TelemetryReading;
use tracing::{debug, info};

/// Scoring configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Number of most recent readings scored (K)
    pub window_size: usize,
    /// Weight of the temperature component
    pub temperature_weight: f64,
    /// Weight of the voltage sag component
    pub voltage_weight: f64,
    /// Weight of the cycle degradation component
    pub cycle_weight: f64,
    /// Safe operating temperature band (°C)
    pub safe_temperature_band: (f64, f64),
    /// Points lost per degree outside the safe band
    pub temperature_penalty_per_degree: f64,
    /// Nominal voltage (V)
    pub nominal_voltage: f64,
    /// Voltage at which the voltage component reaches zero (V)
    pub cutoff_voltage: f64,
    /// Rated cycle life
    pub rated_cycles: u32,
    /// Exponent of the cycle degradation curve
    pub degradation_exponent: f64,
    /// Capacity retained at rated cycle life (%)
    pub end_of_life_retention: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            window_size: 10,
            temperature_weight: 0.3,
            voltage_weight: 0.3,
            cycle_weight: 0.4,
            safe_temperature_band: (15.0, 35.0),
            temperature_penalty_per_degree: 4.0,
            nominal_voltage: 3.7,
            cutoff_voltage: 3.0,
            rated_cycles: 2000,
            degradation_exponent: 1.5,
            end_of_life_retention: 80.0,
        }
    }
}

impl ScoringConfig {
    /// Check weights, bands and curve parameters for consistency
    pub fn validate(&self) -> Result<(), ScoringError> {
        let invalid = |msg: String| Err(ScoringError::InvalidConfig(msg));

        if self.window_size == 0 {
            return invalid("window_size must be at least 1".into());
        }
        let weights = [self.temperature_weight, self.voltage_weight, self.cycle_weight];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return invalid(format!("weights must be non-negative, got {:?}", weights));
        }
        let total: f64 = weights.iter().sum();
        if (total - 1.0).abs() > 1e-6 {
            return invalid(format!("weights must sum to 1.0, got {}", total));
        }
        let (low, high) = self.safe_temperature_band;
        if !(low < high) {
            return invalid(format!("safe temperature band [{}, {}] is empty", low, high));
        }
        if !(self.temperature_penalty_per_degree >= 0.0) {
            return invalid("temperature_penalty_per_degree must be non-negative".into());
        }
        if !(self.cutoff_voltage < self.nominal_voltage) {
            return invalid(format!(
                "cutoff voltage {} must be below nominal {}",
                self.cutoff_voltage, self.nominal_voltage
            ));
        }
        if self.rated_cycles == 0 {
            return invalid("rated_cycles must be at least 1".into());
        }
        if !(self.degradation_exponent > 0.0) {
            return invalid("degradation_exponent must be positive".into());
        }
        if !(0.0..=100.0).contains(&self.end_of_life_retention) {
            return invalid("end_of_life_retention must be within [0, 100]".into());
        }
        Ok(())
    }
}

/// Component scores behind a health score
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub temperature: f64,
    pub voltage: f64,
    pub cycles: f64,
    /// Weighted total, rounded to 0.01
    pub total: f64,
}

/// Anything that can turn a reading window into a health score sample
pub trait HealthModel: Send + Sync {
    /// Score the window; `EmptyWindow` when there is nothing to score
    fn evaluate(
        &self,
        battery_id: &str,
        window: &[TelemetryReading],
    ) -> Result<HealthScoreSample, ScoringError>;

    /// Derived performance metrics for the same window
    fn performance(&self, window: &[TelemetryReading]) -> Option<PerformanceSample>;

    /// Number of readings the model wants to see
    fn window_size(&self) -> usize;
}

/// Weighted temperature / voltage / cycle-life scorer
#[derive(Debug, Clone)]
pub struct HealthScorer {
    config: ScoringConfig,
}

impl HealthScorer {
    /// Create a scorer, rejecting inconsistent configuration
    pub fn new(config: ScoringConfig) -> Result<Self, ScoringError> {
        config.validate()?;
        info!(
            "Creating health scorer: window={}, weights=({}, {}, {})",
            config.window_size, config.temperature_weight, config.voltage_weight, config.cycle_weight
        );
        Ok(Self { config })
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Temperature component from mean window temperature
    pub fn temperature_score(&self, temperature: f64) -> f64 {
        let (low, high) = self.config.safe_temperature_band;
        let deviation = if temperature < low {
            low - temperature
        } else if temperature > high {
            temperature - high
        } else {
            0.0
        };
        (100.0 - deviation * self.config.temperature_penalty_per_degree).clamp(0.0, 100.0)
    }

    /// Voltage component from sag relative to nominal
    pub fn voltage_score(&self, voltage: f64) -> f64 {
        let span = self.config.nominal_voltage - self.config.cutoff_voltage;
        let sag = ((self.config.nominal_voltage - voltage) / span).clamp(0.0, 1.0);
        100.0 * (1.0 - sag)
    }

    /// Fraction of rated cycle life consumed, shaped by the degradation curve
    fn wear(&self, cycle_count: u32) -> f64 {
        let used = (cycle_count as f64 / self.config.rated_cycles as f64).min(1.0);
        used.powf(self.config.degradation_exponent)
    }

    /// Cycle-count degradation component
    pub fn cycle_score(&self, cycle_count: u32) -> f64 {
        100.0 * (1.0 - self.wear(cycle_count))
    }

    /// Estimated capacity retention (%) for a cycle count
    pub fn capacity_retention(&self, cycle_count: u32) -> f64 {
        100.0 - (100.0 - self.config.end_of_life_retention) * self.wear(cycle_count)
    }

    fn recent<'a>(&self, window: &'a [TelemetryReading]) -> &'a [TelemetryReading] {
        let start = window.len().saturating_sub(self.config.window_size);
        &window[start..]
    }

    /// Component scores for a window, or `None` if it is empty
    pub fn breakdown(&self, window: &[TelemetryReading]) -> Option<ScoreBreakdown> {
        let window = self.recent(window);
        let latest = window.last()?;

        let temperature = self.temperature_score(
            SignalStatistics::compute(&SignalStatistics::extract_temperature(window)).mean,
        );
        let voltage = self
            .voltage_score(SignalStatistics::compute(&SignalStatistics::extract_voltage(window)).mean);
        let cycles = self.cycle_score(latest.cycle_count);

        let weighted = temperature * self.config.temperature_weight
            + voltage * self.config.voltage_weight
            + cycles * self.config.cycle_weight;

        Some(ScoreBreakdown {
            temperature,
            voltage,
            cycles,
            total: round_hundredths(weighted.clamp(0.0, 100.0)),
        })
    }
}

impl HealthModel for HealthScorer {
    fn evaluate(
        &self,
        battery_id: &str,
        window: &[TelemetryReading],
    ) -> Result<HealthScoreSample, ScoringError> {
        let breakdown = self.breakdown(window).ok_or(ScoringError::EmptyWindow)?;
        let timestamp = window.last().ok_or(ScoringError::EmptyWindow)?.timestamp;

        debug!(
            battery_id,
            temperature = breakdown.temperature,
            voltage = breakdown.voltage,
            cycles = breakdown.cycles,
            score = breakdown.total,
            "Scored window"
        );

        Ok(HealthScoreSample {
            battery_id: battery_id.to_string(),
            timestamp,
            score: breakdown.total,
            status: HealthStatus::from_score(breakdown.total),
        })
    }

    fn performance(&self, window: &[TelemetryReading]) -> Option<PerformanceSample> {
        let window = self.recent(window);
        let latest = window.last()?;
        let mean_voltage = SignalStatistics::compute(&SignalStatistics::extract_voltage(window)).mean;

        Some(PerformanceSample {
            timestamp: latest.timestamp,
            capacity_retention: round_hundredths(self.capacity_retention(latest.cycle_count)),
            charge_efficiency: round_hundredths(
                (mean_voltage / self.config.nominal_voltage * 100.0).clamp(0.0, 100.0),
            ),
            estimated_lifetime: self.config.rated_cycles.saturating_sub(latest.cycle_count),
        })
    }

    fn window_size(&self) -> usize {
        self.config.window_size
    }
}

fn round_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn reading(secs: i64, voltage: f64, temperature: f64, cycles: u32) -> TelemetryReading {
        TelemetryReading {
            timestamp: at(secs),
            voltage,
            current: 1.0,
            temperature,
            cycle_count: cycles,
            state_of_charge: None,
        }
    }

    fn scorer() -> HealthScorer {
        HealthScorer::new(ScoringConfig::default()).unwrap()
    }

    #[test]
    fn test_new_battery_scores_perfect() {
        let sample = scorer()
            .evaluate("bat-1", &[reading(0, 3.7, 25.0, 0)])
            .unwrap();
        assert_eq!(sample.score, 100.0);
        assert_eq!(sample.status, HealthStatus::Healthy);
        assert_eq!(sample.timestamp, at(0));
    }

    #[test]
    fn test_empty_window() {
        assert_eq!(scorer().evaluate("bat-1", &[]), Err(ScoringError::EmptyWindow));
        assert!(scorer().performance(&[]).is_none());
    }

    #[test]
    fn test_component_scores() {
        let scorer = scorer();
        assert_eq!(scorer.temperature_score(25.0), 100.0);
        assert_eq!(scorer.temperature_score(40.0), 80.0);
        assert_eq!(scorer.temperature_score(5.0), 60.0);
        assert_eq!(scorer.temperature_score(80.0), 0.0);

        assert_eq!(scorer.voltage_score(3.9), 100.0);
        assert!((scorer.voltage_score(3.35) - 50.0).abs() < 1e-9);
        assert_eq!(scorer.voltage_score(2.5), 0.0);

        assert_eq!(scorer.cycle_score(0), 100.0);
        assert_eq!(scorer.cycle_score(2000), 0.0);
        assert_eq!(scorer.cycle_score(5000), 0.0);
    }

    #[test]
    fn test_weighted_total() {
        // temperature 80, voltage 50, cycles 100
        let breakdown = scorer()
            .breakdown(&[reading(0, 3.35, 40.0, 0)])
            .unwrap();
        assert!((breakdown.total - 79.0).abs() < 1e-9);
    }

    #[test]
    fn test_only_recent_window_is_scored() {
        let config = ScoringConfig {
            window_size: 2,
            ..Default::default()
        };
        let scorer = HealthScorer::new(config).unwrap();
        let mut window = vec![reading(0, 2.0, 80.0, 0)];
        window.push(reading(1, 3.7, 25.0, 0));
        window.push(reading(2, 3.7, 25.0, 0));

        assert_eq!(scorer.evaluate("bat-1", &window).unwrap().score, 100.0);
    }

    #[test]
    fn test_deterministic() {
        let scorer = scorer();
        let window: Vec<_> = (0..10)
            .map(|i| reading(i, 3.6 - i as f64 * 0.01, 30.0 + i as f64, 700))
            .collect();
        let a = scorer.evaluate("bat-1", &window).unwrap();
        let b = scorer.evaluate("bat-1", &window).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_performance_metrics() {
        let perf = scorer()
            .performance(&[reading(0, 3.7, 25.0, 2000)])
            .unwrap();
        assert_eq!(perf.capacity_retention, 80.0);
        assert_eq!(perf.charge_efficiency, 100.0);
        assert_eq!(perf.estimated_lifetime, 0);

        let perf = scorer()
            .performance(&[reading(0, 3.7, 25.0, 500)])
            .unwrap();
        assert_eq!(perf.estimated_lifetime, 1500);
        assert!(perf.capacity_retention > 80.0 && perf.capacity_retention < 100.0);
    }

    #[test]
    fn test_invalid_config() {
        let weights = ScoringConfig {
            cycle_weight: 0.5,
            ..Default::default()
        };
        assert!(matches!(
            HealthScorer::new(weights),
            Err(ScoringError::InvalidConfig(_))
        ));

        let band = ScoringConfig {
            safe_temperature_band: (40.0, 10.0),
            ..Default::default()
        };
        assert!(band.validate().is_err());

        let voltage = ScoringConfig {
            cutoff_voltage: 4.0,
            ..Default::default()
        };
        assert!(voltage.validate().is_err());
    }
}
