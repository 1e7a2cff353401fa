//! One-shot escalation timer

use crate::monitor::MonitorEvent;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

/// Identifies one arming of the escalation timer
///
/// Tokens are never reused, so a fire event for a cancelled timer can be told
/// apart from the currently armed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TimerToken(pub(crate) u64);

impl fmt::Display for TimerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An armed one-shot timer that posts [`MonitorEvent::TimerFired`] when it expires
///
/// Dropping the timer aborts the task; an event already queued by the task is
/// discarded by the controller because its token no longer matches.
#[derive(Debug)]
pub struct EscalationTimer {
    token: TimerToken,
    deadline: Instant,
    handle: JoinHandle<()>,
}

impl EscalationTimer {
    /// Arm a timer that fires after `delay`
    pub fn arm(token: TimerToken, delay: Duration, fire_tx: mpsc::Sender<MonitorEvent>) -> Self {
        let deadline = Instant::now() + delay;

        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            debug!("Escalation timer {} expired", token);
            // Receiver gone means the monitor shut down first
            let _ = fire_tx.send(MonitorEvent::TimerFired(token)).await;
        });

        debug!("Escalation timer {} armed for {:?}", token, delay);
        Self {
            token,
            deadline,
            handle,
        }
    }

    pub fn token(&self) -> TimerToken {
        self.token
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Time left before the timer fires
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Disarm the timer
    pub fn cancel(self) {
        debug!("Escalation timer {} cancelled", self.token);
    }
}

impl Drop for EscalationTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
