//! Route Planning
//!
//! Thin adapter over an external directions service:
//! - Request validation (no request without origin and destination)
//! - Pluggable directions provider
//! - Last successful route kept for display

mod error;
mod planner;
mod provider;
mod request;

pub use error::RouteError;
pub use planner::RoutePlanner;
pub use provider::{DirectionsConfig, DirectionsProvider, GoogleDirectionsProvider};
pub use request::{Route, RouteRequest, TravelMode};
