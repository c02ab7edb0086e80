//! Analytics Routes

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use fleet_engine::{AnalyticsKind, AnalyticsSeries, AnalyticsWindow};
use serde::Deserialize;
use std::sync::Arc;

use crate::{ApiError, AppState};

/// Query parameters for analytics endpoint
#[derive(Debug, Deserialize)]
pub struct AnalyticsQuery {
    #[serde(default = "default_kind")]
    pub kind: AnalyticsKind,
    /// Restrict to one battery; whole fleet otherwise
    pub battery_id: Option<String>,
    pub since: Option<DateTime<Utc>>,
    /// Most recent points per battery
    pub limit: Option<usize>,
}

fn default_kind() -> AnalyticsKind {
    AnalyticsKind::Health
}

/// Get a time series
pub async fn get_analytics(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AnalyticsQuery>,
) -> Result<Json<AnalyticsSeries>, ApiError> {
    let window = AnalyticsWindow {
        since: params.since,
        limit: params.limit,
    };
    let series = state
        .engine
        .analytics_series(params.kind, params.battery_id.as_deref(), window)?;
    Ok(Json(series))
}
