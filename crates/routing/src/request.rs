//! Route request and response types

use crate::error::RouteError;
use serde::{Deserialize, Serialize};

/// How the route will be travelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TravelMode {
    #[default]
    Driving,
}

impl TravelMode {
    /// Value of the provider's `mode` query parameter
    pub fn as_query(self) -> &'static str {
        match self {
            TravelMode::Driving => "driving",
        }
    }
}

/// Validated route request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRequest {
    pub origin: String,
    pub destination: String,
    pub mode: TravelMode,
}

impl RouteRequest {
    /// Build a driving request; blank endpoints are rejected
    pub fn new(origin: &str, destination: &str) -> Result<Self, RouteError> {
        let origin = origin.trim();
        let destination = destination.trim();
        if origin.is_empty() || destination.is_empty() {
            return Err(RouteError::MissingEndpoints);
        }

        Ok(Self {
            origin: origin.to_string(),
            destination: destination.to_string(),
            mode: TravelMode::Driving,
        })
    }
}

/// Route geometry and summary returned by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub origin: String,
    pub destination: String,
    /// Provider's short description (usually the main road)
    pub summary: String,
    pub distance_meters: u64,
    pub duration_seconds: u64,
    /// Encoded overview polyline
    pub polyline: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_endpoints_rejected() {
        assert_eq!(RouteRequest::new("", "B"), Err(RouteError::MissingEndpoints));
        assert_eq!(RouteRequest::new("A", "  "), Err(RouteError::MissingEndpoints));
    }

    #[test]
    fn test_request_trimmed() {
        let request = RouteRequest::new(" Oakland ", "San Jose").unwrap();
        assert_eq!(request.origin, "Oakland");
        assert_eq!(request.mode, TravelMode::Driving);
    }

    #[test]
    fn test_mode_serialization() {
        let json = serde_json::to_string(&TravelMode::Driving).unwrap();
        assert_eq!(json, "\"DRIVING\"");
        assert_eq!(TravelMode::Driving.as_query(), "driving");
    }
}
