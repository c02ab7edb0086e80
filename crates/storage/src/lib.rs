//! Storage Layer
//!
//! Aggregation store for the fleet: battery registry, published alert
//! records, bounded health/performance/temperature series, and the derived
//! projections (fleet stats, analytics) read by the reporting API. Every
//! read observes one consistent snapshot.

mod analytics;
mod model;
mod repository;

pub use analytics::{AnalyticsKind, AnalyticsSeries, AnalyticsWindow, MetricSeries, SeriesPoint};
pub use model::{
    Battery, BatteryDescriptor, BatteryUpdate, BatteryView, EvaluationCommit, FleetStats,
};
pub use repository::{Repository, RetentionConfig};

use thiserror::Error;

/// Storage errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StorageError {
    #[error("Lock error: {0}")]
    Lock(String),
    #[error("Battery not found: {0}")]
    BatteryNotFound(String),
    #[error("Alert not found: {0}")]
    AlertNotFound(String),
    #[error("Battery already exists: {0}")]
    AlreadyExists(String),
}
