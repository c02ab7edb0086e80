//! Alert Routes

use axum::{
    extract::{Path, Query, State},
    Json,
};
use fleet_engine::{Alert, AlertFilter};
use serde::Serialize;
use std::sync::Arc;

use crate::{ApiError, AppState};

const DEFAULT_LIMIT: usize = 50;

/// Response for alerts endpoint
#[derive(Debug, Serialize)]
pub struct AlertResponse {
    pub data: Vec<Alert>,
    pub count: usize,
    pub unacknowledged_count: usize,
}

/// List alerts, newest first
pub async fn get_alerts(
    State(state): State<Arc<AppState>>,
    Query(mut filter): Query<AlertFilter>,
) -> Result<Json<AlertResponse>, ApiError> {
    filter.limit.get_or_insert(DEFAULT_LIMIT);
    let alerts = state.engine.list_alerts(&filter)?;
    let unacknowledged_count = alerts.iter().filter(|a| !a.acknowledged).count();

    Ok(Json(AlertResponse {
        count: alerts.len(),
        unacknowledged_count,
        data: alerts,
    }))
}

/// Acknowledge an alert
pub async fn acknowledge_alert(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Alert>, ApiError> {
    Ok(Json(state.engine.acknowledge_alert(&id)?))
}
