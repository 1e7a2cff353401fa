//! Last-known location tracking

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Geographic position in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lng: f64,
}

impl Position {
    /// San Francisco, used when no fix has been received
    pub const DEFAULT_CENTER: Position = Position {
        lat: 37.7749,
        lng: -122.4194,
    };

    /// Whether the coordinates are on the globe
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::DEFAULT_CENTER
    }
}

/// Reasons a location fix could not be obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationError {
    #[error("location permission denied")]
    PermissionDenied,

    #[error("location unavailable")]
    Unavailable,

    #[error("geolocation not supported")]
    Unsupported,
}

impl LocationError {
    /// Message shown to the driver
    pub fn notice(&self) -> &'static str {
        match self {
            LocationError::PermissionDenied | LocationError::Unavailable => {
                "Unable to track location. Please enable location services."
            }
            LocationError::Unsupported => "Geolocation is not supported by your browser.",
        }
    }
}

/// Keeps the most recent fix and falls back to a default center
#[derive(Debug, Clone)]
pub struct LocationTracker {
    default_center: Position,
    last_fix: Option<Position>,
    notice: Option<&'static str>,
}

impl LocationTracker {
    /// Create a tracker with the map's default center
    pub fn new(default_center: Position) -> Self {
        Self {
            default_center,
            last_fix: None,
            notice: None,
        }
    }

    /// Record a new fix; invalid coordinates are treated as unavailable
    pub fn update(&mut self, position: Position) -> Option<&'static str> {
        if !position.is_valid() {
            return self.report_error(LocationError::Unavailable);
        }

        debug!("Location fix: {:.5}, {:.5}", position.lat, position.lng);
        self.last_fix = Some(position);
        self.notice = None;
        None
    }

    /// Record a failed fix; the last known position is kept
    pub fn report_error(&mut self, error: LocationError) -> Option<&'static str> {
        warn!("Location error: {}", error);
        self.notice = Some(error.notice());
        self.notice
    }

    /// Where the map should be centered
    pub fn center(&self) -> Position {
        self.last_fix.unwrap_or(self.default_center)
    }

    pub fn last_fix(&self) -> Option<Position> {
        self.last_fix
    }

    /// Outstanding location notice, if any
    pub fn notice(&self) -> Option<&'static str> {
        self.notice
    }
}

impl Default for LocationTracker {
    fn default() -> Self {
        Self::new(Position::DEFAULT_CENTER)
    }
}
