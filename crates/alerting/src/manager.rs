//! Alert Manager Implementation

use crate::alert::{Alert, AlertStatus, AlertTransition, ConditionKind, Severity};
use crate::AlertError;
use chrono::{DateTime, Utc};
use health_scorer::HealthStatus;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use telemetry_ingest::{BatteryId, TelemetryReading};
use tracing::{debug, info};
use trend_analyzer::Trend;
use uuid::Uuid;

/// Alert configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Consecutive DECLINING evaluations before a trend alert opens (N)
    pub declining_evaluations: u32,
    /// Consecutive clear evaluations before an open alert resolves (M)
    pub resolve_after: u32,
    /// Voltage below which LOW_VOLTAGE triggers (V)
    pub low_voltage_threshold: f64,
    /// Temperature above which HIGH_TEMPERATURE triggers (°C)
    pub high_temperature_threshold: f64,
    /// State of charge below which LOW_STATE_OF_CHARGE triggers (%)
    pub low_state_of_charge_threshold: f64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            declining_evaluations: 3,
            resolve_after: 2,
            low_voltage_threshold: 3.0,
            high_temperature_threshold: 45.0,
            low_state_of_charge_threshold: 20.0,
        }
    }
}

impl AlertConfig {
    pub fn validate(&self) -> Result<(), AlertError> {
        if self.declining_evaluations == 0 || self.resolve_after == 0 {
            return Err(AlertError::InvalidConfig(
                "declining_evaluations and resolve_after must be at least 1".into(),
            ));
        }
        let thresholds = [
            self.low_voltage_threshold,
            self.high_temperature_threshold,
            self.low_state_of_charge_threshold,
        ];
        if thresholds.iter().any(|t| !t.is_finite()) {
            return Err(AlertError::InvalidConfig(format!(
                "thresholds must be finite, got {:?}",
                thresholds
            )));
        }
        Ok(())
    }

    /// Consecutive triggering evaluations needed to open an alert
    fn open_after(&self, kind: ConditionKind) -> u32 {
        match kind {
            ConditionKind::DecliningTrend => self.declining_evaluations,
            _ => 1,
        }
    }
}

/// What one evaluation saw, as input to the alert state machines
#[derive(Debug, Clone, Copy)]
pub struct Observation<'a> {
    pub status: HealthStatus,
    pub score: Option<f64>,
    pub trend: Trend,
    /// Newest reading in the evaluated window
    pub latest: Option<&'a TelemetryReading>,
    pub at: DateTime<Utc>,
}

/// Currently open alert for a condition
#[derive(Debug, Clone, PartialEq)]
struct OpenAlert {
    id: String,
    severity: Severity,
}

/// State of one (battery, condition) pair
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertState {
    open: Option<OpenAlert>,
    /// Consecutive evaluations with the condition present
    pub trigger_streak: u32,
    /// Consecutive evaluations with the condition absent
    pub clear_streak: u32,
}

impl AlertState {
    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }
}

/// Result of checking one condition against an observation
enum Check {
    Triggered(Severity, String),
    Clear,
    /// Not enough information; streaks are left untouched
    Undetermined,
}

/// Per-battery alert state machines, one per condition kind
///
/// NONE -> OPEN -> RESOLVED -> NONE. While open, a persisting condition
/// updates the alert in place and may escalate its severity; it never
/// de-escalates before resolution.
#[derive(Debug, Clone)]
pub struct AlertManager {
    battery_id: BatteryId,
    config: AlertConfig,
    states: BTreeMap<ConditionKind, AlertState>,
}

impl AlertManager {
    /// Create a new alert manager for one battery
    pub fn new(battery_id: impl Into<BatteryId>, config: AlertConfig) -> Self {
        let battery_id = battery_id.into();
        debug!(battery_id = %battery_id, "Creating alert manager");
        Self {
            battery_id,
            config,
            states: BTreeMap::new(),
        }
    }

    /// Run every condition state machine against one evaluation
    pub fn observe(&mut self, observation: &Observation<'_>) -> Vec<AlertTransition> {
        let mut transitions = Vec::new();
        for kind in ConditionKind::ALL {
            let check = self.check(kind, observation);
            if let Some(transition) = self.step(kind, check, observation.at) {
                transitions.push(transition);
            }
        }
        transitions
    }

    fn check(&self, kind: ConditionKind, obs: &Observation<'_>) -> Check {
        match kind {
            ConditionKind::HealthDegraded => match obs.status {
                HealthStatus::Unknown => Check::Undetermined,
                status => match Severity::from_status(status) {
                    Some(severity) => Check::Triggered(
                        severity,
                        format!(
                            "Battery health {} (score {:.1})",
                            status,
                            obs.score.unwrap_or_default()
                        ),
                    ),
                    None => Check::Clear,
                },
            },
            ConditionKind::DecliningTrend => {
                if obs.status == HealthStatus::Unknown {
                    Check::Undetermined
                } else if obs.trend == Trend::Declining {
                    Check::Triggered(
                        Severity::Info,
                        format!(
                            "Battery health score declining (score {:.1})",
                            obs.score.unwrap_or_default()
                        ),
                    )
                } else {
                    Check::Clear
                }
            }
            ConditionKind::LowVoltage => match obs.latest {
                None => Check::Undetermined,
                Some(r) if r.voltage < self.config.low_voltage_threshold => Check::Triggered(
                    Severity::Critical,
                    format!("Battery voltage below critical threshold: {}V", r.voltage),
                ),
                Some(_) => Check::Clear,
            },
            ConditionKind::HighTemperature => match obs.latest {
                None => Check::Undetermined,
                Some(r) if r.temperature > self.config.high_temperature_threshold => {
                    Check::Triggered(
                        Severity::Warning,
                        format!("Battery temperature above threshold: {}°C", r.temperature),
                    )
                }
                Some(_) => Check::Clear,
            },
            ConditionKind::LowStateOfCharge => match obs.latest.and_then(|r| r.state_of_charge) {
                None => Check::Undetermined,
                Some(soc) if soc < self.config.low_state_of_charge_threshold => Check::Triggered(
                    Severity::Warning,
                    format!("Battery State of Charge below threshold: {}%", soc),
                ),
                Some(_) => Check::Clear,
            },
        }
    }

    fn step(&mut self, kind: ConditionKind, check: Check, at: DateTime<Utc>) -> Option<AlertTransition> {
        let open_after = self.config.open_after(kind);
        let resolve_after = self.config.resolve_after;
        let battery_id = &self.battery_id;
        let state = self.states.entry(kind).or_default();

        match check {
            Check::Undetermined => None,
            Check::Triggered(severity, message) => {
                state.trigger_streak = state.trigger_streak.saturating_add(1);
                state.clear_streak = 0;

                if let Some(open) = state.open.as_mut() {
                    let escalated = severity > open.severity;
                    if escalated {
                        info!(battery_id = %battery_id, ?kind, ?severity, "Alert escalated");
                        open.severity = severity;
                    }
                    return Some(AlertTransition::Updated {
                        alert_id: open.id.clone(),
                        severity: open.severity,
                        message,
                        last_seen_at: at,
                        escalated,
                    });
                }

                if state.trigger_streak < open_after {
                    debug!(
                        battery_id = %battery_id,
                        ?kind,
                        streak = state.trigger_streak,
                        "Condition present, waiting for streak"
                    );
                    return None;
                }

                let alert = Alert {
                    id: Uuid::new_v4().to_string(),
                    battery_id: battery_id.clone(),
                    kind,
                    severity,
                    message,
                    created_at: at,
                    last_seen_at: at,
                    status: AlertStatus::Open,
                    acknowledged: false,
                    resolved_at: None,
                };
                info!(battery_id = %battery_id, ?kind, ?severity, alert_id = %alert.id, "Alert opened");
                state.open = Some(OpenAlert {
                    id: alert.id.clone(),
                    severity,
                });
                Some(AlertTransition::Opened(alert))
            }
            Check::Clear => {
                state.clear_streak = state.clear_streak.saturating_add(1);
                state.trigger_streak = 0;

                if state.clear_streak < resolve_after {
                    return None;
                }
                let open = state.open.take()?;
                state.clear_streak = 0;
                info!(battery_id = %battery_id, ?kind, alert_id = %open.id, "Alert resolved");
                Some(AlertTransition::Resolved {
                    alert_id: open.id,
                    resolved_at: at,
                })
            }
        }
    }

    /// State of one condition
    pub fn state(&self, kind: ConditionKind) -> Option<&AlertState> {
        self.states.get(&kind)
    }

    /// Number of conditions with an open alert
    pub fn open_count(&self) -> usize {
        self.states.values().filter(|s| s.is_open()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(step: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + step * 60, 0).unwrap()
    }

    fn obs(status: HealthStatus, trend: Trend, step: i64) -> Observation<'static> {
        Observation {
            status,
            score: Some(70.0),
            trend,
            latest: None,
            at: at(step),
        }
    }

    fn opened(transitions: &[AlertTransition]) -> Vec<&Alert> {
        transitions
            .iter()
            .filter_map(|t| match t {
                AlertTransition::Opened(a) => Some(a),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_degraded_opens_once_and_escalates_in_place() {
        let mut manager = AlertManager::new("bat-1", AlertConfig::default());

        let first = manager.observe(&obs(HealthStatus::Warning, Trend::Stable, 0));
        let alerts = opened(&first);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, Severity::Warning);
        let id = alerts[0].id.clone();

        let second = manager.observe(&obs(HealthStatus::Critical, Trend::Stable, 1));
        assert!(opened(&second).is_empty());
        assert!(second.iter().any(|t| matches!(
            t,
            AlertTransition::Updated { alert_id, severity: Severity::Critical, escalated: true, .. }
                if *alert_id == id
        )));

        // De-escalation keeps the higher severity
        let third = manager.observe(&obs(HealthStatus::Warning, Trend::Stable, 2));
        assert!(third.iter().any(|t| matches!(
            t,
            AlertTransition::Updated { severity: Severity::Critical, escalated: false, .. }
        )));
        assert_eq!(manager.open_count(), 1);
    }

    #[test]
    fn test_resolves_after_m_clear_evaluations() {
        let mut manager = AlertManager::new("bat-1", AlertConfig::default());
        manager.observe(&obs(HealthStatus::Critical, Trend::Stable, 0));
        manager.observe(&obs(HealthStatus::Critical, Trend::Stable, 1));

        let first_clear = manager.observe(&obs(HealthStatus::Healthy, Trend::Stable, 2));
        assert!(first_clear.is_empty());
        assert!(manager.state(ConditionKind::HealthDegraded).unwrap().is_open());

        let second_clear = manager.observe(&obs(HealthStatus::Healthy, Trend::Stable, 3));
        assert!(matches!(second_clear.as_slice(), [AlertTransition::Resolved { .. }]));
        assert_eq!(manager.open_count(), 0);

        // Cycle repeats with a fresh alert
        let again = manager.observe(&obs(HealthStatus::Warning, Trend::Stable, 4));
        assert_eq!(opened(&again).len(), 1);
    }

    #[test]
    fn test_interrupted_clear_streak_does_not_resolve() {
        let mut manager = AlertManager::new("bat-1", AlertConfig::default());
        manager.observe(&obs(HealthStatus::Warning, Trend::Stable, 0));
        manager.observe(&obs(HealthStatus::Healthy, Trend::Stable, 1));
        manager.observe(&obs(HealthStatus::Warning, Trend::Stable, 2));
        manager.observe(&obs(HealthStatus::Healthy, Trend::Stable, 3));
        assert_eq!(manager.open_count(), 1);
    }

    #[test]
    fn test_declining_needs_n_consecutive() {
        let mut manager = AlertManager::new("bat-1", AlertConfig::default());
        let healthy = |step| obs(HealthStatus::Healthy, Trend::Declining, step);

        assert!(manager.observe(&healthy(0)).is_empty());
        assert!(manager.observe(&healthy(1)).is_empty());
        let third = manager.observe(&healthy(2));
        let alerts = opened(&third);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, ConditionKind::DecliningTrend);
        assert_eq!(alerts[0].severity, Severity::Info);
    }

    #[test]
    fn test_declining_streak_resets() {
        let mut manager = AlertManager::new("bat-1", AlertConfig::default());
        manager.observe(&obs(HealthStatus::Healthy, Trend::Declining, 0));
        manager.observe(&obs(HealthStatus::Healthy, Trend::Declining, 1));
        manager.observe(&obs(HealthStatus::Healthy, Trend::Stable, 2));
        assert!(manager.observe(&obs(HealthStatus::Healthy, Trend::Declining, 3)).is_empty());
        assert_eq!(manager.open_count(), 0);
    }

    #[test]
    fn test_unknown_status_holds_state() {
        let mut manager = AlertManager::new("bat-1", AlertConfig::default());
        manager.observe(&obs(HealthStatus::Warning, Trend::Stable, 0));
        for step in 1..5 {
            assert!(manager
                .observe(&obs(HealthStatus::Unknown, Trend::Stable, step))
                .is_empty());
        }
        assert_eq!(manager.open_count(), 1);
    }

    #[test]
    fn test_reading_thresholds() {
        let mut manager = AlertManager::new("bat-1", AlertConfig::default());
        let reading = TelemetryReading {
            timestamp: at(0),
            voltage: 2.8,
            current: -3.0,
            temperature: 50.0,
            cycle_count: 10,
            state_of_charge: Some(10.0),
        };
        let observation = Observation {
            status: HealthStatus::Healthy,
            score: Some(85.0),
            trend: Trend::Stable,
            latest: Some(&reading),
            at: at(0),
        };

        let transitions = manager.observe(&observation);
        let mut kinds: Vec<_> = opened(&transitions).iter().map(|a| (a.kind, a.severity)).collect();
        kinds.sort();
        assert_eq!(
            kinds,
            vec![
                (ConditionKind::LowVoltage, Severity::Critical),
                (ConditionKind::HighTemperature, Severity::Warning),
                (ConditionKind::LowStateOfCharge, Severity::Warning),
            ]
        );
    }

    #[test]
    fn test_apply_transitions_to_records() {
        let mut manager = AlertManager::new("bat-1", AlertConfig::default());
        let mut records = Vec::new();

        for (step, status) in [
            HealthStatus::Warning,
            HealthStatus::Critical,
            HealthStatus::Healthy,
            HealthStatus::Healthy,
        ]
        .into_iter()
        .enumerate()
        {
            for t in manager.observe(&obs(status, Trend::Stable, step as i64)) {
                t.apply(&mut records);
            }
        }

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].severity, Severity::Critical);
        assert_eq!(records[0].status, AlertStatus::Resolved);
        assert_eq!(records[0].created_at, at(0));
        assert_eq!(records[0].resolved_at, Some(at(3)));
    }

    #[test]
    fn test_invalid_config() {
        let config = AlertConfig {
            resolve_after: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(AlertConfig::default().validate().is_ok());
    }
}
