//! Alert Routes

use axum::{extract::State, Json};
use routing::DirectionsProvider;
use serde::{Deserialize, Serialize};

use crate::{ApiError, SharedState, SosRecord};
use alerting::AlertSnapshot;
use sensors::Position;

/// Response for the status endpoint
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub alert: AlertSnapshot,
    pub map_center: Position,
    pub location_notice: Option<String>,
}

/// Request body for the contact endpoint
#[derive(Debug, Deserialize)]
pub struct ContactRequest {
    pub contact: String,
}

/// Response for the SOS history endpoint
#[derive(Debug, Serialize)]
pub struct SosResponse {
    pub data: Vec<SosRecord>,
    pub count: usize,
}

/// Current alert state and map center
pub async fn get_status<P: DirectionsProvider + 'static>(
    State(state): State<SharedState<P>>,
) -> Json<StatusResponse> {
    let location = state.location.read().await;

    Json(StatusResponse {
        alert: state.monitor.snapshot(),
        map_center: location.center(),
        location_notice: location.notice().map(str::to_string),
    })
}

/// "I'm OK"
pub async fn acknowledge<P: DirectionsProvider + 'static>(
    State(state): State<SharedState<P>>,
) -> Result<Json<AlertSnapshot>, ApiError> {
    let snapshot = state.monitor.acknowledge().await?;
    Ok(Json(snapshot))
}

/// Change the emergency contact
pub async fn set_contact<P: DirectionsProvider + 'static>(
    State(state): State<SharedState<P>>,
    Json(body): Json<ContactRequest>,
) -> Result<Json<AlertSnapshot>, ApiError> {
    let contact = body.contact.trim();
    if contact.is_empty() {
        return Err(ApiError::Validation(
            "Emergency contact cannot be empty".to_string(),
        ));
    }

    let snapshot = state.monitor.set_emergency_contact(contact).await?;
    Ok(Json(snapshot))
}

/// Recent SOS events, oldest first
pub async fn get_sos<P: DirectionsProvider + 'static>(
    State(state): State<SharedState<P>>,
) -> Json<SosResponse> {
    let data: Vec<SosRecord> = state.sos_log.read().await.iter().cloned().collect();

    Json(SosResponse {
        count: data.len(),
        data,
    })
}
