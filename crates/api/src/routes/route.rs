//! Route Planning Routes

use axum::{extract::State, Json};
use routing::{DirectionsProvider, Route};
use serde::{Deserialize, Serialize};

use crate::{ApiError, SharedState};

/// Request body for route planning
#[derive(Debug, Deserialize)]
pub struct PlanRequest {
    #[serde(default)]
    pub origin: String,
    #[serde(default)]
    pub destination: String,
}

/// Response for a planned route
#[derive(Debug, Serialize)]
pub struct PlanResponse {
    pub route: Route,
    pub message: String,
}

fn outcome_label(result: &Result<Route, routing::RouteError>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(e) if e.is_validation() => "invalid",
        Err(_) => "failed",
    }
}

/// Plan a driving route between two places
pub async fn plan_route<P: DirectionsProvider + 'static>(
    State(state): State<SharedState<P>>,
    Json(body): Json<PlanRequest>,
) -> Result<Json<PlanResponse>, ApiError> {
    let result = state.planner.plan(&body.origin, &body.destination).await;
    metrics::counter!("driver_safety_route_requests_total", "outcome" => outcome_label(&result))
        .increment(1);

    let route = result?;
    let message = format!(
        "Route found: {:.1} km, {} min",
        route.distance_meters as f64 / 1000.0,
        route.duration_seconds.div_ceil(60)
    );
    Ok(Json(PlanResponse { route, message }))
}

/// Last successfully planned route
pub async fn get_route<P: DirectionsProvider + 'static>(
    State(state): State<SharedState<P>>,
) -> Result<Json<Route>, ApiError> {
    state
        .planner
        .last_route()
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("No route planned yet".to_string()))
}
