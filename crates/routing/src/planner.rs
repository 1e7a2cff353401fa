//! Route planner

use crate::error::RouteError;
use crate::provider::DirectionsProvider;
use crate::request::{Route, RouteRequest};
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Validates requests, calls the provider, and keeps the last good route
pub struct RoutePlanner<P> {
    provider: P,
    last_route: RwLock<Option<Route>>,
}

impl<P: DirectionsProvider> RoutePlanner<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            last_route: RwLock::new(None),
        }
    }

    /// Plan a driving route
    ///
    /// Blank endpoints fail without contacting the provider. On provider
    /// failure the previously stored route is kept.
    pub async fn plan(&self, origin: &str, destination: &str) -> Result<Route, RouteError> {
        let request = RouteRequest::new(origin, destination)?;

        match self.provider.directions(&request).await {
            Ok(route) => {
                info!(
                    "Route {} -> {}: {} m, {} s",
                    route.origin, route.destination, route.distance_meters, route.duration_seconds
                );
                *self.last_route.write().await = Some(route.clone());
                Ok(route)
            }
            Err(e) => {
                warn!(
                    "Route {} -> {} failed: {}",
                    request.origin, request.destination, e
                );
                Err(e)
            }
        }
    }

    /// Most recent successful route
    pub async fn last_route(&self) -> Option<Route> {
        self.last_route.read().await.clone()
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }
}
