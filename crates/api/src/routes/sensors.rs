//! Sensor Routes

use axum::{extract::State, Json};
use routing::DirectionsProvider;
use serde::{Deserialize, Serialize};

use crate::{ApiError, SharedState};
use alerting::AlertSnapshot;
use sensors::{LocationError, Position, Sample};

/// Raw reading pushed by an external sensor feed
#[derive(Debug, Deserialize)]
pub struct SampleRequest {
    pub heart_rate: f64,
    pub speed: f64,
}

/// Location report from the dashboard
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum LocationReport {
    Fix(Position),
    Failure { error: LocationError },
}

/// Response for the location endpoint
#[derive(Debug, Serialize)]
pub struct LocationResponse {
    pub center: Position,
    pub notice: Option<String>,
}

/// Feed one sample into the monitor
pub async fn post_sample<P: DirectionsProvider + 'static>(
    State(state): State<SharedState<P>>,
    Json(body): Json<SampleRequest>,
) -> Result<Json<AlertSnapshot>, ApiError> {
    let sample = Sample::from_raw(body.heart_rate, body.speed)?;
    let snapshot = state.monitor.submit_sample(sample).await?;
    Ok(Json(snapshot))
}

/// Record a location fix or failure
pub async fn put_location<P: DirectionsProvider + 'static>(
    State(state): State<SharedState<P>>,
    Json(report): Json<LocationReport>,
) -> Json<LocationResponse> {
    let mut tracker = state.location.write().await;
    let notice = match report {
        LocationReport::Fix(position) => tracker.update(position),
        LocationReport::Failure { error } => tracker.report_error(error),
    };

    Json(LocationResponse {
        center: tracker.center(),
        notice: notice.map(str::to_string),
    })
}
