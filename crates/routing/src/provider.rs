//! Directions providers

use crate::error::RouteError;
use crate::request::{Route, RouteRequest};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

/// External directions service
pub trait DirectionsProvider: Send + Sync {
    /// Look up one route for the request
    fn directions(
        &self,
        request: &RouteRequest,
    ) -> impl Future<Output = Result<Route, RouteError>> + Send;
}

/// Directions service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectionsConfig {
    /// Service root, without trailing slash
    pub base_url: String,
    /// API key sent with every request
    pub api_key: String,
    /// Request timeout (seconds)
    pub timeout_secs: u64,
}

impl Default for DirectionsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://maps.googleapis.com".to_string(),
            api_key: String::new(),
            timeout_secs: 10,
        }
    }
}

/// Google Directions web service response (fields we use)
#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    routes: Vec<ResponseRoute>,
}

#[derive(Debug, Deserialize)]
struct ResponseRoute {
    #[serde(default)]
    summary: String,
    overview_polyline: Polyline,
    #[serde(default)]
    legs: Vec<Leg>,
}

#[derive(Debug, Deserialize)]
struct Polyline {
    points: String,
}

#[derive(Debug, Deserialize)]
struct Leg {
    distance: Measure,
    duration: Measure,
}

#[derive(Debug, Deserialize)]
struct Measure {
    value: u64,
}

/// Turn a decoded provider response into a route
fn route_from_response(
    request: &RouteRequest,
    response: DirectionsResponse,
) -> Result<Route, RouteError> {
    if response.status != "OK" {
        if let Some(message) = &response.error_message {
            warn!("Directions provider error: {}", message);
        }
        return Err(RouteError::Provider {
            status: response.status,
        });
    }

    let route = response
        .routes
        .into_iter()
        .next()
        .ok_or(RouteError::NoRoute)?;

    Ok(Route {
        origin: request.origin.clone(),
        destination: request.destination.clone(),
        summary: route.summary,
        distance_meters: route.legs.iter().map(|l| l.distance.value).sum(),
        duration_seconds: route.legs.iter().map(|l| l.duration.value).sum(),
        polyline: route.overview_polyline.points,
    })
}

/// Google Maps Directions API over HTTPS
pub struct GoogleDirectionsProvider {
    client: reqwest::Client,
    config: DirectionsConfig,
}

impl GoogleDirectionsProvider {
    /// Create a provider with its own HTTP client
    pub fn new(config: DirectionsConfig) -> Result<Self, RouteError> {
        info!("Creating directions provider for {}", config.base_url);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/maps/api/directions/json",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

impl DirectionsProvider for GoogleDirectionsProvider {
    async fn directions(&self, request: &RouteRequest) -> Result<Route, RouteError> {
        debug!(
            "Requesting directions {} -> {}",
            request.origin, request.destination
        );

        let response = self
            .client
            .get(self.endpoint())
            .query(&[
                ("origin", request.origin.as_str()),
                ("destination", request.destination.as_str()),
                ("mode", request.mode.as_query()),
                ("key", self.config.api_key.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RouteError::Transport(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let body: DirectionsResponse = response.json().await?;

        route_from_response(request, body)
    }
}
