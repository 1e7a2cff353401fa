//! Escalation Controller
//!
//! State machine that turns classified samples into driver alerts:
//!
//! ```text
//!   Normal ──abnormal sample──▶ AbnormalUnacknowledged ──acknowledge──▶ AbnormalAcknowledged
//!     ▲                              │ (timer armed)                        │
//!     └────────── normal sample ─────┴──────────────────────────────────────┘
//! ```
//!
//! If the timer armed on entering `AbnormalUnacknowledged` fires before an
//! acknowledgment or a normal sample, an [`SosEvent`] is emitted.

use crate::classifier::{classify, Status, Thresholds};
use crate::monitor::MonitorEvent;
use crate::timer::{EscalationTimer, TimerToken};
use sensors::Sample;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Message shown once the driver has acknowledged an alert
const ACKNOWLEDGED_TEXT: &str = "👍 Acknowledged. Monitoring continues.";

/// Escalation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EscalationConfig {
    /// Heart-rate thresholds
    pub thresholds: Thresholds,
    /// Time an abnormal alert may go unacknowledged before SOS (seconds)
    pub escalation_delay_secs: u64,
    /// Emergency contact used until the driver edits it
    pub default_contact: String,
    /// Only send SOS if speed changed by less than this since the alert (mph)
    pub sos_speed_tolerance: Option<f64>,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            escalation_delay_secs: 10,
            default_contact: "911".to_string(),
            sos_speed_tolerance: None,
        }
    }
}

impl EscalationConfig {
    pub fn escalation_delay(&self) -> Duration {
        Duration::from_secs(self.escalation_delay_secs)
    }
}

/// Where the controller sits in its state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertPhase {
    Normal,
    AbnormalUnacknowledged,
    AbnormalAcknowledged,
}

/// Emergency notification raised by an expired escalation timer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SosEvent {
    /// Contact the SOS is addressed to
    pub contact: String,
    /// Status at the time the timer fired
    pub status: Status,
    pub heart_rate: Option<u32>,
    pub speed: Option<f64>,
    pub timestamp_ms: u64,
    /// Text shown to the driver
    pub message: String,
}

/// Escalation timer together with the speed seen when it was armed
#[derive(Debug)]
struct PendingEscalation {
    timer: EscalationTimer,
    armed_speed: f64,
}

/// Alert state owned by the controller
#[derive(Debug)]
pub struct AlertState {
    pub status: Status,
    pub message: String,
    pub acknowledged: bool,
    /// SOS has been sent for the current abnormal episode
    pub escalated: bool,
    pub last_sample: Option<Sample>,
    pending: Option<PendingEscalation>,
}

impl AlertState {
    fn new() -> Self {
        Self {
            status: Status::Normal,
            message: Status::Normal.warning_text().to_string(),
            acknowledged: true,
            escalated: false,
            last_sample: None,
            pending: None,
        }
    }

    pub fn phase(&self) -> AlertPhase {
        match (self.status.is_abnormal(), self.acknowledged) {
            (false, _) => AlertPhase::Normal,
            (true, false) => AlertPhase::AbnormalUnacknowledged,
            (true, true) => AlertPhase::AbnormalAcknowledged,
        }
    }

    pub fn timer_armed(&self) -> bool {
        self.pending.is_some()
    }

    /// Token of the armed timer, if any
    pub fn pending_token(&self) -> Option<TimerToken> {
        self.pending.as_ref().map(|p| p.timer.token())
    }

    fn disarm(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.timer.cancel();
        }
    }
}

/// Read-only view of the alert state for the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertSnapshot {
    pub status: Status,
    pub phase: AlertPhase,
    pub message: String,
    pub acknowledged: bool,
    pub escalated: bool,
    pub timer_armed: bool,
    /// Milliseconds until the armed timer fires
    pub escalation_in_ms: Option<u64>,
    pub emergency_contact: String,
    pub last_sample: Option<Sample>,
    /// Sensor or location problem to show alongside the alert
    pub notice: Option<String>,
}

/// Drives [`AlertState`] through sample, acknowledgment and timer events
pub struct EscalationController {
    config: EscalationConfig,
    state: AlertState,
    contact: String,
    /// Where armed timers post their fire events
    fire_tx: mpsc::Sender<MonitorEvent>,
    next_token: u64,
}

impl EscalationController {
    /// Create a controller; timers post to `fire_tx`
    pub fn new(config: EscalationConfig, fire_tx: mpsc::Sender<MonitorEvent>) -> Self {
        info!(
            "Creating escalation controller: thresholds {}-{} bpm, delay {}s",
            config.thresholds.low_bpm, config.thresholds.high_bpm, config.escalation_delay_secs
        );
        Self {
            contact: config.default_contact.clone(),
            config,
            state: AlertState::new(),
            fire_tx,
            next_token: 0,
        }
    }

    /// Apply a new sample and return its classification
    pub fn on_sample(&mut self, sample: Sample) -> Status {
        let status = classify(&sample, &self.config.thresholds);
        let previous = self.state.status;
        self.state.status = status;
        self.state.last_sample = Some(sample);

        if !status.is_abnormal() {
            if previous.is_abnormal() {
                info!("Heart rate back to normal ({} bpm)", sample.heart_rate);
            }
            self.state.disarm();
            self.state.acknowledged = true;
            self.state.escalated = false;
            self.state.message = status.warning_text().to_string();
            return status;
        }

        // Keep the SOS on screen while the episode lasts
        if !self.state.escalated {
            self.state.message = status.warning_text().to_string();
        }

        if !previous.is_abnormal() {
            warn!("{:?} heart rate: {} bpm", status, sample.heart_rate);
            self.state.acknowledged = false;
            if self.state.pending.is_none() {
                self.arm(sample.speed);
            }
        } else if previous != status {
            debug!(
                "Status changed {:?} -> {:?}; escalation timer left as is",
                previous, status
            );
        }

        status
    }

    /// The driver confirmed they are OK
    pub fn acknowledge(&mut self) {
        info!("Alert acknowledged by driver");
        self.state.acknowledged = true;
        self.state.escalated = false;
        self.state.disarm();
        self.state.message = if self.state.status.is_abnormal() {
            ACKNOWLEDGED_TEXT.to_string()
        } else {
            Status::Normal.warning_text().to_string()
        };
    }

    /// Handle an expired timer; returns the SOS to emit, if any
    pub fn on_timer_fired(&mut self, token: TimerToken) -> Option<SosEvent> {
        if self.state.pending_token() != Some(token) {
            debug!("Ignoring stale escalation timer {}", token);
            return None;
        }
        let pending = self.state.pending.take()?;

        if self.state.acknowledged {
            return None;
        }

        let speed = self.state.last_sample.map(|s| s.speed);
        if let (Some(tolerance), Some(speed)) = (self.config.sos_speed_tolerance, speed) {
            if (speed - pending.armed_speed).abs() >= tolerance {
                info!(
                    "SOS withheld: speed changed {} -> {} mph",
                    pending.armed_speed, speed
                );
                return None;
            }
        }

        let sos = SosEvent {
            contact: self.contact.clone(),
            status: self.state.status,
            heart_rate: self.state.last_sample.map(|s| s.heart_rate),
            speed,
            timestamp_ms: sensors::now_ms(),
            message: format!("🚨 EMERGENCY: Sending SOS to {}!", self.contact),
        };

        warn!("No response from driver, escalating SOS to {}", self.contact);
        self.state.escalated = true;
        self.state.message = sos.message.clone();
        Some(sos)
    }

    /// Change who receives the SOS
    pub fn set_emergency_contact(&mut self, contact: impl Into<String>) {
        let contact = contact.into();
        info!("Emergency contact set to {}", contact);
        self.contact = contact;
    }

    pub fn emergency_contact(&self) -> &str {
        &self.contact
    }

    pub fn state(&self) -> &AlertState {
        &self.state
    }

    pub fn config(&self) -> &EscalationConfig {
        &self.config
    }

    /// Current state as a presentation snapshot
    pub fn snapshot(&self) -> AlertSnapshot {
        AlertSnapshot {
            status: self.state.status,
            phase: self.state.phase(),
            message: self.state.message.clone(),
            acknowledged: self.state.acknowledged,
            escalated: self.state.escalated,
            timer_armed: self.state.timer_armed(),
            escalation_in_ms: self
                .state
                .pending
                .as_ref()
                .map(|p| p.timer.remaining().as_millis() as u64),
            emergency_contact: self.contact.clone(),
            last_sample: self.state.last_sample,
            notice: None,
        }
    }

    /// Cancel any armed timer before the controller goes away
    pub fn shutdown(&mut self) {
        if self.state.timer_armed() {
            info!("Cancelling pending escalation on shutdown");
        }
        self.state.disarm();
    }

    fn arm(&mut self, speed: f64) {
        self.next_token += 1;
        let token = TimerToken(self.next_token);
        let timer = EscalationTimer::arm(
            token,
            self.config.escalation_delay(),
            self.fire_tx.clone(),
        );
        self.state.pending = Some(PendingEscalation {
            timer,
            armed_speed: speed,
        });
    }
}
