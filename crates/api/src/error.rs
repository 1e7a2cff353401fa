//! API error responses

use alerting::MonitorError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use routing::RouteError;
use sensors::SampleError;
use serde::Serialize;
use thiserror::Error;

/// Errors surfaced to dashboard clients
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Route(#[from] RouteError),

    #[error("Invalid sample: {0}")]
    InvalidSample(#[from] SampleError),

    #[error("{0}")]
    Validation(String),

    #[error("Vital monitor is not running")]
    Monitor(#[from] MonitorError),

    #[error("{0}")]
    NotFound(String),
}

/// JSON error body
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Route(e) if e.is_validation() => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Route(_) => StatusCode::BAD_GATEWAY,
            ApiError::InvalidSample(_) | ApiError::Validation(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::Monitor(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::from(RouteError::MissingEndpoints).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::from(RouteError::Provider {
                status: "ZERO_RESULTS".to_string()
            })
            .status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::from(MonitorError::Closed).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_route_message_passthrough() {
        let err = ApiError::from(RouteError::MissingEndpoints);
        assert_eq!(err.to_string(), "Please enter both origin and destination.");
    }
}
