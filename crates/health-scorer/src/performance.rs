//! Derived Performance Metrics

use chrono::{DateTime, Utc};
use ring_buffer::Timestamped;
use serde::{Deserialize, Serialize};

/// Performance metric names, in the order they are reported
pub const PERFORMANCE_METRICS: [&str; 2] = ["capacity_retention", "charge_efficiency"];

/// Derived performance metrics for one evaluated window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSample {
    pub timestamp: DateTime<Utc>,
    /// Estimated capacity retained relative to new (%)
    pub capacity_retention: f64,
    /// Mean terminal voltage relative to nominal (%)
    pub charge_efficiency: f64,
    /// Cycles left before rated cycle life
    pub estimated_lifetime: u32,
}

impl PerformanceSample {
    /// Value of a named metric
    pub fn metric(&self, name: &str) -> Option<f64> {
        match name {
            "capacity_retention" => Some(self.capacity_retention),
            "charge_efficiency" => Some(self.charge_efficiency),
            _ => None,
        }
    }
}

impl Timestamped for PerformanceSample {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}
