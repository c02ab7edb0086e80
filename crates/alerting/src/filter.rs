//! Alert Query Filters

use crate::alert::{Alert, AlertStatus, Severity};
use serde::Deserialize;

/// Optional filters for listing alerts
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertFilter {
    pub severity: Option<Severity>,
    pub status: Option<AlertStatus>,
    pub battery_id: Option<String>,
    pub acknowledged: Option<bool>,
    pub limit: Option<usize>,
}

impl AlertFilter {
    /// Whether an alert passes every set filter
    pub fn matches(&self, alert: &Alert) -> bool {
        self.severity.map_or(true, |s| alert.severity == s)
            && self.status.map_or(true, |s| alert.status == s)
            && self.battery_id.as_deref().map_or(true, |id| alert.battery_id == id)
            && self.acknowledged.map_or(true, |a| alert.acknowledged == a)
    }

    /// Filter and order newest first (ties broken by id for stable output)
    pub fn apply<'a>(&self, alerts: impl IntoIterator<Item = &'a Alert>) -> Vec<Alert> {
        let mut selected: Vec<Alert> = alerts
            .into_iter()
            .filter(|a| self.matches(a))
            .cloned()
            .collect();
        selected.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        if let Some(limit) = self.limit {
            selected.truncate(limit);
        }
        selected
    }
}
