//! Battery Routes

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use fleet_engine::{
    Battery, BatteryDescriptor, BatteryDetail, BatterySummary, BatteryUpdate, EngineError,
    EvaluationOutcome, HealthStatus, TelemetryReading,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use crate::{ApiError, AppState};

/// Response for battery list endpoint
#[derive(Debug, Serialize)]
pub struct BatteryListResponse {
    pub data: Vec<Battery>,
    pub count: usize,
}

/// Manual status override
#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: HealthStatus,
}

/// Query parameters for the summary endpoint
#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub since: Option<DateTime<Utc>>,
}

/// Response for an accepted reading
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub battery_id: String,
    pub version: u64,
    /// Present when the reading was evaluated right away
    pub evaluation: Option<EvaluationOutcome>,
}

pub async fn list_batteries(
    State(state): State<Arc<AppState>>,
) -> Result<Json<BatteryListResponse>, ApiError> {
    let batteries = state.engine.list_batteries()?;
    Ok(Json(BatteryListResponse {
        count: batteries.len(),
        data: batteries,
    }))
}

pub async fn create_battery(
    State(state): State<Arc<AppState>>,
    Json(descriptor): Json<BatteryDescriptor>,
) -> Result<(StatusCode, Json<Battery>), ApiError> {
    if descriptor.name.trim().is_empty() {
        return Err(ApiError::BadRequest("battery name must not be empty".into()));
    }
    if descriptor.capacity.is_some_and(|c| !c.is_finite() || c <= 0.0) {
        return Err(ApiError::BadRequest("battery capacity must be positive".into()));
    }
    let battery = state.engine.register_battery(descriptor)?;
    Ok((StatusCode::CREATED, Json(battery)))
}

pub async fn get_battery(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<BatteryDetail>, ApiError> {
    Ok(Json(state.engine.battery_detail(&id)?))
}

/// Reading statistics and health history
pub async fn get_summary(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<SummaryQuery>,
) -> Result<Json<BatterySummary>, ApiError> {
    Ok(Json(state.engine.battery_summary(&id, params.since)?))
}

pub async fn update_battery(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(update): Json<BatteryUpdate>,
) -> Result<Json<Battery>, ApiError> {
    if update.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(ApiError::BadRequest("battery name must not be empty".into()));
    }
    Ok(Json(state.engine.update_battery(&id, update).await?))
}

pub async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<StatusRequest>,
) -> Result<Json<Battery>, ApiError> {
    Ok(Json(state.engine.override_status(&id, request.status).await?))
}

pub async fn delete_battery(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.engine.delete_battery(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Append a reading, evaluating immediately when configured to
pub async fn submit_reading(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(reading): Json<TelemetryReading>,
) -> Result<(StatusCode, Json<IngestResponse>), ApiError> {
    let version = state.engine.ingest(&id, reading)?;

    let evaluation = if state.engine.config().scheduler.evaluate_on_ingest {
        match state.engine.evaluate(&id).await {
            Ok(outcome) => Some(outcome),
            // The reading is stored; the scheduler retries the evaluation
            Err(EngineError::EvaluationTimeout { .. }) => {
                warn!(battery_id = %id, "Evaluation on ingest timed out");
                None
            }
            Err(e) => return Err(e.into()),
        }
    } else {
        None
    };

    let status = if evaluation.is_some() {
        StatusCode::OK
    } else {
        StatusCode::ACCEPTED
    };
    Ok((
        status,
        Json(IngestResponse {
            battery_id: id,
            version,
            evaluation,
        }),
    ))
}

/// Evaluate a battery now
pub async fn evaluate_battery(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<EvaluationOutcome>, ApiError> {
    Ok(Json(state.engine.evaluate(&id).await?))
}
