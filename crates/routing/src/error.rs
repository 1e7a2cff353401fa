//! Route Error Types

use thiserror::Error;

/// Errors while planning a route
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RouteError {
    /// Origin or destination left blank
    #[error("Please enter both origin and destination.")]
    MissingEndpoints,

    /// Provider answered with a non-OK status
    #[error("Directions request failed: {status}")]
    Provider { status: String },

    /// Provider returned OK but no route
    #[error("No route found between these locations")]
    NoRoute,

    /// Network or HTTP failure talking to the provider
    #[error("Directions service unreachable: {0}")]
    Transport(String),

    /// Provider response could not be decoded
    #[error("Invalid directions response: {0}")]
    InvalidResponse(String),
}

impl RouteError {
    /// Whether the error was caught before contacting the provider
    pub fn is_validation(&self) -> bool {
        matches!(self, RouteError::MissingEndpoints)
    }
}

// reqwest includes the request URL in its messages, and ours carries the API key
impl From<reqwest::Error> for RouteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RouteError::InvalidResponse(err.without_url().to_string())
        } else {
            RouteError::Transport(err.without_url().to_string())
        }
    }
}
