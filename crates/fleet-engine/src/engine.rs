//! Fleet evaluation engine

use crate::config::EngineConfig;
use crate::worker::BatteryWorker;
use crate::EngineError;
use alerting::{Alert, AlertFilter, AlertTransition, Observation};
use chrono::{DateTime, Utc};
use health_scorer::{
    recommendations, HealthModel, HealthScorer, HealthStatus, ReadingSummary, ScoringError,
};
use metrics::{counter, gauge, histogram};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};
use storage::{
    AnalyticsKind, AnalyticsSeries, AnalyticsWindow, Battery, BatteryDescriptor, BatteryUpdate,
    BatteryView, EvaluationCommit, FleetStats, Repository, SeriesPoint,
};
use telemetry_ingest::{BatteryId, TelemetryReading, Validator};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use trend_analyzer::{Trend, TrendAnalyzer};
use uuid::Uuid;

/// What an evaluation did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeKind {
    /// New telemetry was scored and published
    Evaluated,
    /// No new telemetry; a manual override was replaced by the evaluated status
    Reconciled,
    /// No new telemetry; nothing changed
    Unchanged,
}

/// Result of evaluating one battery
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationOutcome {
    pub kind: OutcomeKind,
    pub battery: Battery,
    pub alerts_opened: usize,
    pub alerts_resolved: usize,
}

/// Battery record with its alerts, life estimates and maintenance advice
#[derive(Debug, Clone, Serialize)]
pub struct BatteryDetail {
    #[serde(flatten)]
    pub battery: Battery,
    pub alerts: Vec<Alert>,
    /// Estimated capacity retained relative to new (%)
    pub remaining_capacity: Option<f64>,
    /// Cycles left before rated cycle life
    pub estimated_lifetime: Option<u32>,
    pub recommendations: Vec<&'static str>,
}

/// Reading statistics and health history for one battery
#[derive(Debug, Clone, Serialize)]
pub struct BatterySummary {
    pub battery_id: BatteryId,
    #[serde(flatten)]
    pub readings: ReadingSummary,
    pub trend: Trend,
    pub health_trend: Vec<SeriesPoint>,
}

/// Summary of one fleet-wide evaluation cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub evaluated: usize,
    pub unchanged: usize,
    pub timed_out: usize,
    pub failed: usize,
}

impl CycleReport {
    pub fn total(&self) -> usize {
        self.evaluated + self.unchanged + self.timed_out + self.failed
    }
}

/// Battery fleet health engine
///
/// Owns the telemetry logs and per-battery evaluation state, and publishes
/// results to the [`Repository`]. Meant to be shared behind an `Arc`.
pub struct FleetEngine {
    config: EngineConfig,
    model: Arc<dyn HealthModel>,
    analyzer: TrendAnalyzer,
    validator: Validator,
    repository: Repository,
    workers: RwLock<HashMap<BatteryId, Arc<BatteryWorker>>>,
    last_cycle: Mutex<Option<DateTime<Utc>>>,
}

impl FleetEngine {
    /// Create an engine with the weighted health scorer
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let scorer = HealthScorer::new(config.scoring.clone())
            .map_err(|e| EngineError::Configuration(e.to_string()))?;
        Self::with_model(config, Arc::new(scorer))
    }

    /// Create an engine with a custom health model
    pub fn with_model(
        config: EngineConfig,
        model: Arc<dyn HealthModel>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let analyzer = TrendAnalyzer::new(config.trend.clone())
            .map_err(|e| EngineError::Configuration(e.to_string()))?;

        info!(
            interval_ms = config.scheduler.evaluation_interval_ms,
            budget_ms = config.scheduler.evaluation_budget_ms,
            window = model.window_size(),
            "Creating fleet engine"
        );

        Ok(Self {
            validator: Validator::new(config.validation.clone()),
            repository: Repository::new(config.retention.clone(), analyzer.clone()),
            analyzer,
            model,
            workers: RwLock::new(HashMap::new()),
            last_cycle: Mutex::new(None),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn worker(&self, battery_id: &str) -> Result<Arc<BatteryWorker>, EngineError> {
        let workers = self
            .workers
            .read()
            .map_err(|e| EngineError::Storage(format!("Lock error: {}", e)))?;
        workers
            .get(battery_id)
            .cloned()
            .ok_or_else(|| EngineError::BatteryNotFound(battery_id.to_string()))
    }

    fn battery_ids(&self) -> Result<Vec<BatteryId>, EngineError> {
        let workers = self
            .workers
            .read()
            .map_err(|e| EngineError::Storage(format!("Lock error: {}", e)))?;
        Ok(workers.keys().cloned().collect())
    }

    // ========================================================================
    // Battery registry
    // ========================================================================

    /// Register a new battery in UNKNOWN status
    pub fn register_battery(&self, descriptor: BatteryDescriptor) -> Result<Battery, EngineError> {
        let id = Uuid::new_v4().to_string();
        let battery = self
            .repository
            .create_battery(id.clone(), descriptor, Utc::now())?;

        let worker = BatteryWorker::new(
            id.clone(),
            self.config.retention.telemetry,
            self.config.retention.history,
            self.config.alerts.clone(),
        );
        let count = {
            let mut workers = self
                .workers
                .write()
                .map_err(|e| EngineError::Storage(format!("Lock error: {}", e)))?;
            workers.insert(id.clone(), Arc::new(worker));
            workers.len()
        };

        gauge!("fleet_batteries").set(count as f64);
        info!(battery_id = %id, name = %battery.name, "Battery registered");
        Ok(battery)
    }

    pub fn get_battery(&self, battery_id: &str) -> Result<Battery, EngineError> {
        Ok(self.repository.get_battery(battery_id)?)
    }

    /// Battery with its alerts, life estimates and recommendations
    pub fn battery_detail(&self, battery_id: &str) -> Result<BatteryDetail, EngineError> {
        let BatteryView {
            battery,
            alerts,
            performance,
        } = self.repository.battery_view(battery_id)?;
        let recommendations = battery.health_score.map(recommendations).unwrap_or_default();
        Ok(BatteryDetail {
            remaining_capacity: performance.as_ref().map(|p| p.capacity_retention),
            estimated_lifetime: performance.as_ref().map(|p| p.estimated_lifetime),
            battery,
            alerts,
            recommendations,
        })
    }

    /// Statistics over retained readings, optionally only those at or after `since`
    pub fn battery_summary(
        &self,
        battery_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<BatterySummary, EngineError> {
        let worker = self.worker(battery_id)?;
        let readings = {
            let log = worker.log()?;
            match since {
                Some(since) => log.since(since),
                None => log.window(log.len()),
            }
        };

        let battery = self.repository.get_battery(battery_id)?;
        let window = AnalyticsWindow { since, limit: None };
        let series = self
            .repository
            .analytics_series(AnalyticsKind::Health, Some(battery_id), window)?;
        let health_trend = match series {
            AnalyticsSeries::Health(points) => points,
            _ => Vec::new(),
        };

        Ok(BatterySummary {
            battery_id: battery.id,
            readings: ReadingSummary::from_readings(&readings),
            trend: battery.trend,
            health_trend,
        })
    }

    /// All batteries in registration order
    pub fn list_batteries(&self) -> Result<Vec<Battery>, EngineError> {
        Ok(self.repository.list_batteries()?)
    }

    /// Update descriptive fields, serialized with evaluations of the battery
    pub async fn update_battery(
        &self,
        battery_id: &str,
        update: BatteryUpdate,
    ) -> Result<Battery, EngineError> {
        let worker = self.worker(battery_id)?;
        let state = worker.state.lock().await;
        if state.deleted {
            return Err(EngineError::BatteryNotFound(battery_id.to_string()));
        }
        Ok(self.repository.update_battery(battery_id, update)?)
    }

    /// Manually set the status; the next evaluation replaces it
    pub async fn override_status(
        &self,
        battery_id: &str,
        status: HealthStatus,
    ) -> Result<Battery, EngineError> {
        let worker = self.worker(battery_id)?;
        let mut state = worker.state.lock().await;
        if state.deleted {
            return Err(EngineError::BatteryNotFound(battery_id.to_string()));
        }
        let battery = self.repository.override_status(battery_id, status)?;
        state.override_pending = true;
        info!(battery_id, %status, "Status manually overridden");
        Ok(battery)
    }

    /// Remove a battery together with its telemetry, history and alerts
    pub async fn delete_battery(&self, battery_id: &str) -> Result<Battery, EngineError> {
        let worker = self.worker(battery_id)?;
        let mut state = worker.state.lock().await;
        if state.deleted {
            return Err(EngineError::BatteryNotFound(battery_id.to_string()));
        }

        // The worker goes only once the published records are gone
        let battery = self.repository.remove_battery(battery_id)?;
        state.deleted = true;
        let count = {
            let mut workers = self
                .workers
                .write()
                .map_err(|e| EngineError::Storage(format!("Lock error: {}", e)))?;
            workers.remove(battery_id);
            workers.len()
        };

        gauge!("fleet_batteries").set(count as f64);
        info!(battery_id, "Battery deleted");
        Ok(battery)
    }

    // ========================================================================
    // Ingest and evaluation
    // ========================================================================

    /// Validate and append a reading; returns the new log version
    ///
    /// Never waits on an in-flight evaluation of the same battery.
    pub fn ingest(&self, battery_id: &str, reading: TelemetryReading) -> Result<u64, EngineError> {
        let worker = self.worker(battery_id)?;
        let mut log = worker.log()?;

        let point = SeriesPoint {
            battery_id: battery_id.to_string(),
            timestamp: reading.timestamp,
            value: reading.temperature,
        };
        let version = match log.append(reading, &self.validator) {
            Ok(version) => version,
            Err(err) => {
                let err = EngineError::from(err);
                let reason = match &err {
                    EngineError::OutOfOrder { .. } => "out_of_order",
                    _ => "invalid",
                };
                counter!("fleet_readings_rejected_total", "reason" => reason).increment(1);
                return Err(err);
            }
        };
        // Recorded under the log lock so the temperature series keeps log order
        self.repository.record_temperature(point)?;
        drop(log);

        counter!("fleet_readings_accepted_total").increment(1);
        Ok(version)
    }

    /// Evaluate one battery within the configured budget
    ///
    /// On timeout nothing is published and the battery is retried on the next
    /// cycle.
    pub async fn evaluate(&self, battery_id: &str) -> Result<EvaluationOutcome, EngineError> {
        let budget_ms = self.config.scheduler.evaluation_budget_ms;
        let worker = self.worker(battery_id)?;
        let started = Instant::now();

        let result = tokio::time::timeout(
            Duration::from_millis(budget_ms),
            self.evaluate_worker(battery_id, &worker),
        )
        .await;

        match result {
            Ok(outcome) => {
                histogram!("fleet_evaluation_duration_seconds")
                    .record(started.elapsed().as_secs_f64());
                outcome
            }
            Err(_) => {
                counter!("fleet_evaluation_timeouts_total").increment(1);
                warn!(battery_id, budget_ms, "Evaluation exceeded its budget");
                Err(EngineError::EvaluationTimeout {
                    battery_id: battery_id.to_string(),
                    budget_ms,
                })
            }
        }
    }

    async fn evaluate_worker(
        &self,
        battery_id: &str,
        worker: &BatteryWorker,
    ) -> Result<EvaluationOutcome, EngineError> {
        let mut state = worker.state.lock().await;
        if state.deleted {
            return Err(EngineError::BatteryNotFound(battery_id.to_string()));
        }

        let (window, version) = {
            let log = worker.log()?;
            (log.window(self.model.window_size()), log.version())
        };
        let now = Utc::now();

        if version == state.evaluated_version {
            if !state.override_pending {
                debug!(battery_id, version, "No new telemetry");
                return Ok(EvaluationOutcome {
                    kind: OutcomeKind::Unchanged,
                    battery: self.repository.get_battery(battery_id)?,
                    alerts_opened: 0,
                    alerts_resolved: 0,
                });
            }

            let battery = self.repository.commit_evaluation(EvaluationCommit {
                battery_id: battery_id.to_string(),
                status: state
                    .last_sample
                    .as_ref()
                    .map(|s| s.status)
                    .unwrap_or(HealthStatus::Unknown),
                score: state.last_sample.as_ref().map(|s| s.score),
                trend: state.trend,
                evaluated_at: now,
                sample: None,
                performance: None,
                transitions: Vec::new(),
            })?;
            state.override_pending = false;
            info!(battery_id, status = %battery.current_status, "Manual override reconciled");
            return Ok(EvaluationOutcome {
                kind: OutcomeKind::Reconciled,
                battery,
                alerts_opened: 0,
                alerts_resolved: 0,
            });
        }

        // Scoring is the only await after the lock; an expired budget drops
        // this future here, before anything is published
        let model = Arc::clone(&self.model);
        let scored_id = battery_id.to_string();
        let (scored, performance, window) = tokio::task::spawn_blocking(move || {
            let scored = model.evaluate(&scored_id, &window);
            let performance = model.performance(&window);
            (scored, performance, window)
        })
        .await
        .map_err(|e| EngineError::Scoring(format!("scoring task failed: {}", e)))?;

        let sample = match scored {
            Ok(sample) => Some(sample),
            Err(ScoringError::EmptyWindow) => None,
            Err(e) => return Err(EngineError::Scoring(e.to_string())),
        };
        let status = sample
            .as_ref()
            .map(|s| s.status)
            .unwrap_or(HealthStatus::Unknown);
        let score = sample.as_ref().map(|s| s.score);

        let trend_window = self.analyzer.config().window_size;
        let mut recent = state.history.tail(trend_window.saturating_sub(1));
        recent.extend(sample.iter().cloned());
        let trend = self.analyzer.classify_trend(&recent);

        let mut alerts = state.alerts.clone();
        let transitions = alerts.observe(&Observation {
            status,
            score,
            trend,
            latest: window.last(),
            at: now,
        });
        let alerts_opened = transitions
            .iter()
            .filter(|t| matches!(t, AlertTransition::Opened(_)))
            .count();
        let alerts_resolved = transitions
            .iter()
            .filter(|t| matches!(t, AlertTransition::Resolved { .. }))
            .count();

        let battery = self.repository.commit_evaluation(EvaluationCommit {
            battery_id: battery_id.to_string(),
            status,
            score,
            trend,
            evaluated_at: now,
            sample: sample.clone(),
            performance,
            transitions,
        })?;

        if let Some(sample) = &sample {
            state.history.push(sample.clone());
        }
        state.alerts = alerts;
        state.evaluated_version = version;
        state.last_sample = sample;
        state.trend = trend;
        state.override_pending = false;

        counter!("fleet_evaluations_total").increment(1);
        counter!("fleet_alerts_opened_total").increment(alerts_opened as u64);
        counter!("fleet_alerts_resolved_total").increment(alerts_resolved as u64);
        debug!(
            battery_id,
            version,
            %status,
            ?score,
            %trend,
            alerts_opened,
            alerts_resolved,
            "Battery evaluated"
        );

        Ok(EvaluationOutcome {
            kind: OutcomeKind::Evaluated,
            battery,
            alerts_opened,
            alerts_resolved,
        })
    }

    /// Evaluate every battery concurrently
    ///
    /// A failure or timeout on one battery does not affect the others.
    pub async fn evaluate_all(self: &Arc<Self>) -> CycleReport {
        let ids = match self.battery_ids() {
            Ok(ids) => ids,
            Err(e) => {
                warn!("Evaluation cycle skipped: {}", e);
                return CycleReport::default();
            }
        };

        let mut tasks = JoinSet::new();
        for id in ids {
            let engine = Arc::clone(self);
            tasks.spawn(async move {
                let result = engine.evaluate(&id).await;
                (id, result)
            });
        }

        let mut report = CycleReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(outcome))) => match outcome.kind {
                    OutcomeKind::Unchanged => report.unchanged += 1,
                    _ => report.evaluated += 1,
                },
                Ok((_, Err(EngineError::EvaluationTimeout { .. }))) => report.timed_out += 1,
                // Deleted between listing and evaluation
                Ok((_, Err(EngineError::BatteryNotFound(_)))) => {}
                Ok((id, Err(e))) => {
                    warn!(battery_id = %id, "Evaluation failed: {}", e);
                    report.failed += 1;
                }
                Err(e) => {
                    warn!("Evaluation task failed: {}", e);
                    report.failed += 1;
                }
            }
        }

        if let Ok(mut last) = self.last_cycle.lock() {
            *last = Some(Utc::now());
        }
        report
    }

    /// Completion time of the last evaluation cycle
    pub fn last_cycle(&self) -> Option<DateTime<Utc>> {
        self.last_cycle.lock().ok().and_then(|last| *last)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn fleet_stats(&self) -> Result<FleetStats, EngineError> {
        Ok(self.repository.fleet_stats()?)
    }

    /// Alerts matching the filter, newest first
    pub fn list_alerts(&self, filter: &AlertFilter) -> Result<Vec<Alert>, EngineError> {
        Ok(self.repository.list_alerts(filter)?)
    }

    pub fn acknowledge_alert(&self, alert_id: &str) -> Result<Alert, EngineError> {
        Ok(self.repository.acknowledge_alert(alert_id)?)
    }

    pub fn analytics_series(
        &self,
        kind: AnalyticsKind,
        battery_id: Option<&str>,
        window: AnalyticsWindow,
    ) -> Result<AnalyticsSeries, EngineError> {
        Ok(self.repository.analytics_series(kind, battery_id, window)?)
    }

    pub fn battery_count(&self) -> usize {
        self.repository.battery_count()
    }
}
