//! Per-battery state

use crate::EngineError;
use alerting::{AlertConfig, AlertManager};
use health_scorer::HealthScoreSample;
use ring_buffer::{RetentionPolicy, RingBuffer};
use std::sync::{Mutex, MutexGuard};
use telemetry_ingest::{BatteryId, TelemetryLog};
use trend_analyzer::Trend;

/// Evaluation-side state of one battery, guarded by the evaluation lock
#[derive(Debug)]
pub(crate) struct EvaluationState {
    pub history: RingBuffer<HealthScoreSample>,
    pub alerts: AlertManager,
    /// Log version covered by the last evaluation
    pub evaluated_version: u64,
    pub last_sample: Option<HealthScoreSample>,
    pub trend: Trend,
    /// A manual override awaits reconciliation
    pub override_pending: bool,
    /// The battery was deleted while this state was queued on
    pub deleted: bool,
}

/// Telemetry log plus evaluation state for one battery
///
/// The log sits behind a short-lived std mutex so ingest never waits on an
/// evaluation; the evaluation state sits behind an async mutex held for a
/// whole evaluation or write.
#[derive(Debug)]
pub(crate) struct BatteryWorker {
    log: Mutex<TelemetryLog>,
    pub state: tokio::sync::Mutex<EvaluationState>,
}

impl BatteryWorker {
    pub fn new(
        battery_id: BatteryId,
        telemetry: RetentionPolicy,
        history: RetentionPolicy,
        alerts: AlertConfig,
    ) -> Self {
        Self {
            log: Mutex::new(TelemetryLog::new(battery_id.clone(), telemetry)),
            state: tokio::sync::Mutex::new(EvaluationState {
                history: RingBuffer::with_policy(history),
                alerts: AlertManager::new(battery_id, alerts),
                evaluated_version: 0,
                last_sample: None,
                trend: Trend::Stable,
                override_pending: false,
                deleted: false,
            }),
        }
    }

    pub fn log(&self) -> Result<MutexGuard<'_, TelemetryLog>, EngineError> {
        self.log
            .lock()
            .map_err(|e| EngineError::Storage(format!("Lock error: {}", e)))
    }
}
