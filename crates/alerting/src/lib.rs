//! Alerting System
//!
//! Classifies vital-sign samples, raises driver alerts, and escalates to an
//! SOS when an abnormal reading goes unacknowledged.

mod classifier;
mod controller;
mod monitor;
mod timer;

pub use classifier::{classify, Status, Thresholds};
pub use controller::{
    AlertPhase, AlertSnapshot, AlertState, EscalationConfig, EscalationController, SosEvent,
};
pub use monitor::{Monitor, MonitorError, MonitorEvent, MonitorHandle};
pub use timer::{EscalationTimer, TimerToken};
