//! Analytics Series Types

use chrono::{DateTime, Utc};
use ring_buffer::Timestamped;
use serde::{Deserialize, Serialize};
use telemetry_ingest::BatteryId;
use trend_analyzer::Trend;

/// Which series to return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalyticsKind {
    Health,
    Temperature,
    Performance,
}

/// Time window applied per battery
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AnalyticsWindow {
    /// Only points at or after this instant
    pub since: Option<DateTime<Utc>>,
    /// Only the most recent N points
    pub limit: Option<usize>,
}

impl AnalyticsWindow {
    /// Restrict time-ordered points to this window
    pub fn select<T: Timestamped + Clone>(&self, points: impl Iterator<Item = T>) -> Vec<T> {
        let mut selected: Vec<T> = points
            .filter(|p| self.since.map_or(true, |since| p.timestamp() >= since))
            .collect();
        if let Some(limit) = self.limit {
            let skip = selected.len().saturating_sub(limit);
            selected.drain(..skip);
        }
        selected
    }
}

/// One point of a series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub battery_id: BatteryId,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl Timestamped for SeriesPoint {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// A named derived metric with its own trend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSeries {
    pub battery_id: BatteryId,
    pub metric: String,
    pub trend: Trend,
    pub points: Vec<SeriesPoint>,
}

/// Analytics response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "series", rename_all = "lowercase")]
pub enum AnalyticsSeries {
    Health(Vec<SeriesPoint>),
    Temperature(Vec<SeriesPoint>),
    Performance(Vec<MetricSeries>),
}

impl AnalyticsSeries {
    /// Whether the series holds no points
    pub fn is_empty(&self) -> bool {
        match self {
            AnalyticsSeries::Health(points) | AnalyticsSeries::Temperature(points) => {
                points.is_empty()
            }
            AnalyticsSeries::Performance(series) => series.iter().all(|s| s.points.is_empty()),
        }
    }
}
