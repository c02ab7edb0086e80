//! Trend Analysis
//!
//! Classifies the direction of a health-score history (or any ordered metric
//! series) as IMPROVING, STABLE or DECLINING.

mod analyzer;

pub use analyzer::{slope, TrendAnalyzer, TrendConfig};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Direction of change over the retained window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Trend {
    Improving,
    #[default]
    Stable,
    Declining,
}

impl Trend {
    pub fn as_str(self) -> &'static str {
        match self {
            Trend::Improving => "IMPROVING",
            Trend::Stable => "STABLE",
            Trend::Declining => "DECLINING",
        }
    }
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trend configuration errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrendError {
    #[error("Invalid trend configuration: {0}")]
    InvalidConfig(String),
}
