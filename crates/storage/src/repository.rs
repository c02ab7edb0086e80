//! Repository Implementation

use crate::analytics::{AnalyticsKind, AnalyticsSeries, AnalyticsWindow, MetricSeries, SeriesPoint};
use crate::model::{
    Battery, BatteryDescriptor, BatteryUpdate, BatteryView, EvaluationCommit, FleetStats,
};
use crate::StorageError;
use alerting::{Alert, AlertFilter};
use chrono::{DateTime, Utc};
use health_scorer::{HealthScoreSample, HealthStatus, PerformanceSample, PERFORMANCE_METRICS};
use ring_buffer::{RetentionPolicy, RingBuffer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use telemetry_ingest::BatteryId;
use tracing::{debug, info};
use trend_analyzer::TrendAnalyzer;

/// Retention limits for published series and alerts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Health-score and performance samples per battery
    pub history: RetentionPolicy,
    /// Raw telemetry readings per battery
    pub telemetry: RetentionPolicy,
    /// Resolved alerts kept per battery
    pub max_resolved_alerts: usize,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            history: RetentionPolicy {
                capacity: 1440,
                max_age_secs: Some(7 * 24 * 3600),
            },
            telemetry: RetentionPolicy {
                capacity: 2880,
                max_age_secs: Some(24 * 3600),
            },
            max_resolved_alerts: 100,
        }
    }
}

/// Published state of one battery
#[derive(Debug)]
struct BatteryEntry {
    battery: Battery,
    alerts: Vec<Alert>,
    health: RingBuffer<HealthScoreSample>,
    performance: RingBuffer<PerformanceSample>,
    temperature: RingBuffer<SeriesPoint>,
}

impl BatteryEntry {
    fn new(battery: Battery, retention: &RetentionConfig) -> Self {
        Self {
            battery,
            alerts: Vec::new(),
            health: RingBuffer::with_policy(retention.history),
            performance: RingBuffer::with_policy(retention.history),
            temperature: RingBuffer::with_policy(retention.telemetry),
        }
    }

    /// Drop the oldest resolved alerts beyond the retention limit
    fn prune_resolved(&mut self, keep: usize) {
        let resolved = self.alerts.iter().filter(|a| !a.is_open()).count();
        let mut excess = resolved.saturating_sub(keep);
        if excess == 0 {
            return;
        }
        // Alerts are appended in creation order, so the first resolved ones are the oldest
        self.alerts.retain(|a| {
            if excess > 0 && !a.is_open() {
                excess -= 1;
                false
            } else {
                true
            }
        });
    }
}

/// Fleet repository (in-memory)
///
/// A single reader-writer lock guards every battery entry, so each read sees
/// either all or none of an evaluation's commit, and a delete removes the
/// battery together with its alerts and series.
pub struct Repository {
    entries: RwLock<BTreeMap<BatteryId, BatteryEntry>>,
    retention: RetentionConfig,
    trend: TrendAnalyzer,
}

impl Repository {
    /// Create a new in-memory repository
    pub fn new(retention: RetentionConfig, trend: TrendAnalyzer) -> Self {
        info!("Creating in-memory fleet repository");
        Self {
            entries: RwLock::new(BTreeMap::new()),
            retention,
            trend,
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<BatteryId, BatteryEntry>>, StorageError> {
        self.entries
            .read()
            .map_err(|e| StorageError::Lock(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<BatteryId, BatteryEntry>>, StorageError> {
        self.entries
            .write()
            .map_err(|e| StorageError::Lock(e.to_string()))
    }

    /// Register a battery in UNKNOWN status
    pub fn create_battery(
        &self,
        id: BatteryId,
        descriptor: BatteryDescriptor,
        now: DateTime<Utc>,
    ) -> Result<Battery, StorageError> {
        let mut entries = self.write()?;
        if entries.contains_key(&id) {
            return Err(StorageError::AlreadyExists(id));
        }
        let battery = Battery::register(id.clone(), descriptor, now);
        entries.insert(id, BatteryEntry::new(battery.clone(), &self.retention));
        debug!(battery_id = %battery.id, "Battery registered");
        Ok(battery)
    }

    /// Get one battery
    pub fn get_battery(&self, id: &str) -> Result<Battery, StorageError> {
        let entries = self.read()?;
        entries
            .get(id)
            .map(|e| e.battery.clone())
            .ok_or_else(|| StorageError::BatteryNotFound(id.to_string()))
    }

    /// All batteries, oldest registration first
    pub fn list_batteries(&self) -> Result<Vec<Battery>, StorageError> {
        let entries = self.read()?;
        let mut batteries: Vec<Battery> = entries.values().map(|e| e.battery.clone()).collect();
        batteries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(batteries)
    }

    /// Change descriptive fields
    pub fn update_battery(&self, id: &str, update: BatteryUpdate) -> Result<Battery, StorageError> {
        let mut entries = self.write()?;
        let entry = entries
            .get_mut(id)
            .ok_or_else(|| StorageError::BatteryNotFound(id.to_string()))?;
        entry.battery.apply(update);
        Ok(entry.battery.clone())
    }

    /// Manual status override; reconciled by the next evaluation
    pub fn override_status(&self, id: &str, status: HealthStatus) -> Result<Battery, StorageError> {
        let mut entries = self.write()?;
        let entry = entries
            .get_mut(id)
            .ok_or_else(|| StorageError::BatteryNotFound(id.to_string()))?;
        entry.battery.current_status = status;
        entry.battery.status_overridden = true;
        info!(battery_id = id, %status, "Status manually overridden");
        Ok(entry.battery.clone())
    }

    /// Remove a battery with its alerts and series in one step
    pub fn remove_battery(&self, id: &str) -> Result<Battery, StorageError> {
        let mut entries = self.write()?;
        let entry = entries
            .remove(id)
            .ok_or_else(|| StorageError::BatteryNotFound(id.to_string()))?;
        info!(
            battery_id = id,
            alerts = entry.alerts.len(),
            samples = entry.health.len(),
            "Battery removed"
        );
        Ok(entry.battery)
    }

    /// Append a raw temperature point
    pub fn record_temperature(&self, point: SeriesPoint) -> Result<(), StorageError> {
        let mut entries = self.write()?;
        let entry = entries
            .get_mut(&point.battery_id)
            .ok_or_else(|| StorageError::BatteryNotFound(point.battery_id.clone()))?;
        entry.temperature.push(point);
        Ok(())
    }

    /// Publish an evaluation: status, score, history and alert changes together
    pub fn commit_evaluation(&self, commit: EvaluationCommit) -> Result<Battery, StorageError> {
        let mut entries = self.write()?;
        let entry = entries
            .get_mut(&commit.battery_id)
            .ok_or_else(|| StorageError::BatteryNotFound(commit.battery_id.clone()))?;

        entry.battery.current_status = commit.status;
        entry.battery.health_score = commit.score;
        entry.battery.trend = commit.trend;
        entry.battery.last_evaluated_at = Some(commit.evaluated_at);
        entry.battery.status_overridden = false;

        if let Some(sample) = commit.sample {
            entry.health.push(sample);
        }
        if let Some(performance) = commit.performance {
            entry.performance.push(performance);
        }
        for transition in &commit.transitions {
            transition.apply(&mut entry.alerts);
        }
        entry.prune_resolved(self.retention.max_resolved_alerts);

        Ok(entry.battery.clone())
    }

    /// Mark an alert acknowledged
    pub fn acknowledge_alert(&self, alert_id: &str) -> Result<Alert, StorageError> {
        let mut entries = self.write()?;
        let alert = entries
            .values_mut()
            .flat_map(|e| e.alerts.iter_mut())
            .find(|a| a.id == alert_id)
            .ok_or_else(|| StorageError::AlertNotFound(alert_id.to_string()))?;
        alert.acknowledged = true;
        info!(alert_id, battery_id = %alert.battery_id, "Alert acknowledged");
        Ok(alert.clone())
    }

    /// Alerts matching the filter, newest first
    pub fn list_alerts(&self, filter: &AlertFilter) -> Result<Vec<Alert>, StorageError> {
        let entries = self.read()?;
        Ok(filter.apply(entries.values().flat_map(|e| e.alerts.iter())))
    }

    /// A battery with its alerts and latest performance sample
    pub fn battery_view(&self, id: &str) -> Result<BatteryView, StorageError> {
        let entries = self.read()?;
        let entry = entries
            .get(id)
            .ok_or_else(|| StorageError::BatteryNotFound(id.to_string()))?;
        Ok(BatteryView {
            battery: entry.battery.clone(),
            alerts: AlertFilter::default().apply(&entry.alerts),
            performance: entry.performance.tail(1).pop(),
        })
    }

    /// Counts by current status
    pub fn fleet_stats(&self) -> Result<FleetStats, StorageError> {
        let entries = self.read()?;
        Ok(FleetStats::from_statuses(
            entries.values().map(|e| e.battery.current_status),
        ))
    }

    /// Time series for one battery, or the whole fleet when `battery_id` is `None`
    pub fn analytics_series(
        &self,
        kind: AnalyticsKind,
        battery_id: Option<&str>,
        window: AnalyticsWindow,
    ) -> Result<AnalyticsSeries, StorageError> {
        let entries = self.read()?;
        let selected: Vec<&BatteryEntry> = match battery_id {
            Some(id) => vec![entries
                .get(id)
                .ok_or_else(|| StorageError::BatteryNotFound(id.to_string()))?],
            None => entries.values().collect(),
        };

        let series = match kind {
            AnalyticsKind::Health => {
                let mut points: Vec<SeriesPoint> = selected
                    .iter()
                    .flat_map(|e| {
                        window.select(e.health.iter().map(|s| SeriesPoint {
                            battery_id: s.battery_id.clone(),
                            timestamp: s.timestamp,
                            value: s.score,
                        }))
                    })
                    .collect();
                sort_points(&mut points);
                AnalyticsSeries::Health(points)
            }
            AnalyticsKind::Temperature => {
                let mut points: Vec<SeriesPoint> = selected
                    .iter()
                    .flat_map(|e| window.select(e.temperature.iter().cloned()))
                    .collect();
                sort_points(&mut points);
                AnalyticsSeries::Temperature(points)
            }
            AnalyticsKind::Performance => {
                let mut series = Vec::new();
                for entry in &selected {
                    let samples = window.select(entry.performance.iter().cloned());
                    for metric in PERFORMANCE_METRICS {
                        let points: Vec<SeriesPoint> = samples
                            .iter()
                            .filter_map(|s| {
                                s.metric(metric).map(|value| SeriesPoint {
                                    battery_id: entry.battery.id.clone(),
                                    timestamp: s.timestamp,
                                    value,
                                })
                            })
                            .collect();
                        let values: Vec<f64> = points.iter().map(|p| p.value).collect();
                        series.push(MetricSeries {
                            battery_id: entry.battery.id.clone(),
                            metric: metric.to_string(),
                            trend: self.trend.classify_values(&values),
                            points,
                        });
                    }
                }
                AnalyticsSeries::Performance(series)
            }
        };
        Ok(series)
    }

    /// Get total battery count
    pub fn battery_count(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }
}

impl Default for Repository {
    fn default() -> Self {
        Self::new(RetentionConfig::default(), TrendAnalyzer::default())
    }
}

fn sort_points(points: &mut [SeriesPoint]) {
    points.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then_with(|| a.battery_id.cmp(&b.battery_id))
    });
}
