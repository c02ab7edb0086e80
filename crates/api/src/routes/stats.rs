//! Fleet Stats Route

use axum::{extract::State, Json};
use fleet_engine::FleetStats;
use std::sync::Arc;

use crate::{ApiError, AppState};

/// Battery counts by current status
pub async fn get_stats(State(state): State<Arc<AppState>>) -> Result<Json<FleetStats>, ApiError> {
    Ok(Json(state.engine.fleet_stats()?))
}
