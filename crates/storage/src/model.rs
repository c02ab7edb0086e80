//! Fleet Records

use alerting::{Alert, AlertTransition};
use chrono::{DateTime, Utc};
use health_scorer::{HealthScoreSample, HealthStatus, PerformanceSample};
use serde::{Deserialize, Serialize};
use telemetry_ingest::BatteryId;
use trend_analyzer::Trend;

/// A managed battery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Battery {
    pub id: BatteryId,
    pub name: String,
    #[serde(rename = "type")]
    pub battery_type: String,
    /// Rated capacity (Ah)
    pub capacity: Option<f64>,
    pub manufacturer: Option<String>,
    pub installation_date: Option<DateTime<Utc>>,
    pub current_status: HealthStatus,
    pub health_score: Option<f64>,
    pub trend: Trend,
    pub last_evaluated_at: Option<DateTime<Utc>>,
    /// Set by a manual status override, cleared by the next evaluation
    pub status_overridden: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied when registering a battery
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatteryDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub battery_type: String,
    #[serde(default)]
    pub capacity: Option<f64>,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub installation_date: Option<DateTime<Utc>>,
}

/// Descriptive fields to change; `None` leaves a field as is
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatteryUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub battery_type: Option<String>,
    #[serde(default)]
    pub capacity: Option<f64>,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub installation_date: Option<DateTime<Utc>>,
}

impl Battery {
    /// New battery in UNKNOWN status
    pub fn register(id: BatteryId, descriptor: BatteryDescriptor, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: descriptor.name,
            battery_type: descriptor.battery_type,
            capacity: descriptor.capacity,
            manufacturer: descriptor.manufacturer,
            installation_date: descriptor.installation_date,
            current_status: HealthStatus::Unknown,
            health_score: None,
            trend: Trend::Stable,
            last_evaluated_at: None,
            status_overridden: false,
            created_at: now,
        }
    }

    /// Apply descriptive changes
    pub fn apply(&mut self, update: BatteryUpdate) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(battery_type) = update.battery_type {
            self.battery_type = battery_type;
        }
        if update.capacity.is_some() {
            self.capacity = update.capacity;
        }
        if update.manufacturer.is_some() {
            self.manufacturer = update.manufacturer;
        }
        if update.installation_date.is_some() {
            self.installation_date = update.installation_date;
        }
    }
}

/// Everything one evaluation publishes, written in a single transaction
#[derive(Debug, Clone)]
pub struct EvaluationCommit {
    pub battery_id: BatteryId,
    pub status: HealthStatus,
    pub score: Option<f64>,
    pub trend: Trend,
    pub evaluated_at: DateTime<Utc>,
    /// New history sample, absent when nothing new was scored
    pub sample: Option<HealthScoreSample>,
    pub performance: Option<PerformanceSample>,
    pub transitions: Vec<AlertTransition>,
}

/// Battery counts by status
///
/// `total` counts every battery; UNKNOWN batteries have their own bucket,
/// so `total == healthy + warning + critical + unknown`.
/// One battery's record, alerts and latest performance, read together
#[derive(Debug, Clone, PartialEq)]
pub struct BatteryView {
    pub battery: Battery,
    /// Newest first
    pub alerts: Vec<Alert>,
    pub performance: Option<PerformanceSample>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetStats {
    pub total: usize,
    pub healthy: usize,
    pub warning: usize,
    pub critical: usize,
    pub unknown: usize,
}

impl FleetStats {
    /// Count statuses
    pub fn from_statuses(statuses: impl IntoIterator<Item = HealthStatus>) -> Self {
        let mut stats = Self::default();
        for status in statuses {
            stats.total += 1;
            match status {
                HealthStatus::Healthy => stats.healthy += 1,
                HealthStatus::Warning => stats.warning += 1,
                HealthStatus::Critical => stats.critical += 1,
                HealthStatus::Unknown => stats.unknown += 1,
            }
        }
        stats
    }

    /// Batteries with one of the three operational statuses
    pub fn evaluated(&self) -> usize {
        self.healthy + self.warning + self.critical
    }
}
