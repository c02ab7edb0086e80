//! Alert Records and Transitions

use chrono::{DateTime, Utc};
use health_scorer::HealthStatus;
use serde::{Deserialize, Serialize};
use telemetry_ingest::BatteryId;

/// Alert severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    /// Severity implied by a health status, if it is adverse
    pub fn from_status(status: HealthStatus) -> Option<Self> {
        match status {
            HealthStatus::Warning => Some(Severity::Warning),
            HealthStatus::Critical => Some(Severity::Critical),
            HealthStatus::Healthy | HealthStatus::Unknown => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Critical => "CRITICAL",
        }
    }
}

/// Alert lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertStatus {
    Open,
    Resolved,
}

/// Kind of condition an alert tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConditionKind {
    /// Status is WARNING or CRITICAL
    HealthDegraded,
    /// Trend DECLINING for N consecutive evaluations
    DecliningTrend,
    LowVoltage,
    HighTemperature,
    LowStateOfCharge,
}

impl ConditionKind {
    pub const ALL: [ConditionKind; 5] = [
        ConditionKind::HealthDegraded,
        ConditionKind::DecliningTrend,
        ConditionKind::LowVoltage,
        ConditionKind::HighTemperature,
        ConditionKind::LowStateOfCharge,
    ];
}

/// A detected adverse condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub battery_id: BatteryId,
    pub kind: ConditionKind,
    pub severity: Severity,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub status: AlertStatus,
    pub acknowledged: bool,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Alert {
    pub fn is_open(&self) -> bool {
        self.status == AlertStatus::Open
    }
}

/// Change to an alert produced by one evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum AlertTransition {
    /// NONE -> OPEN
    Opened(Alert),
    /// OPEN -> OPEN, condition persists
    Updated {
        alert_id: String,
        severity: Severity,
        message: String,
        last_seen_at: DateTime<Utc>,
        escalated: bool,
    },
    /// OPEN -> RESOLVED
    Resolved {
        alert_id: String,
        resolved_at: DateTime<Utc>,
    },
}

impl AlertTransition {
    /// Apply this transition to a battery's alert records
    pub fn apply(&self, alerts: &mut Vec<Alert>) {
        match self {
            AlertTransition::Opened(alert) => alerts.push(alert.clone()),
            AlertTransition::Updated {
                alert_id,
                severity,
                message,
                last_seen_at,
                escalated,
            } => {
                if let Some(alert) = alerts.iter_mut().find(|a| &a.id == alert_id) {
                    alert.severity = *severity;
                    alert.message.clone_from(message);
                    alert.last_seen_at = *last_seen_at;
                    if *escalated {
                        alert.acknowledged = false;
                    }
                }
            }
            AlertTransition::Resolved {
                alert_id,
                resolved_at,
            } => {
                if let Some(alert) = alerts.iter_mut().find(|a| &a.id == alert_id) {
                    alert.status = AlertStatus::Resolved;
                    alert.resolved_at = Some(*resolved_at);
                    alert.last_seen_at = *resolved_at;
                }
            }
        }
    }
}
