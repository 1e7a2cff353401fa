//! Monitor Event Loop
//!
//! A single task owns the [`EscalationController`] and applies events one at
//! a time, so sample arrival, acknowledgment and timer expiry never race.

use crate::controller::{AlertSnapshot, EscalationConfig, EscalationController, SosEvent};
use crate::timer::TimerToken;
use sensors::{Sample, SourceReading};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Capacity of the monitor's event queue
const EVENT_QUEUE_SIZE: usize = 64;

/// Capacity of the SOS broadcast channel
const SOS_CHANNEL_SIZE: usize = 16;

/// Optional reply carrying the snapshot after an event was applied
pub type Reply = Option<oneshot::Sender<AlertSnapshot>>;

/// Monitor error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MonitorError {
    #[error("monitor has shut down")]
    Closed,
}

/// Events delivered to the monitor
#[derive(Debug)]
pub enum MonitorEvent {
    /// New vital-sign sample
    Sample(Sample, Reply),
    /// Sample source failed this tick
    SourceUnavailable(String),
    /// Driver pressed "I'm OK"
    Acknowledge(Reply),
    /// Driver edited the emergency contact
    SetEmergencyContact(String, Reply),
    /// An escalation timer expired
    TimerFired(TimerToken),
    /// Stop the loop, cancelling any armed timer
    Shutdown,
}

impl From<SourceReading> for MonitorEvent {
    fn from(reading: SourceReading) -> Self {
        match reading {
            SourceReading::Sample(sample) => MonitorEvent::Sample(sample, None),
            SourceReading::Unavailable(notice) => MonitorEvent::SourceUnavailable(notice),
        }
    }
}

/// Owner of the controller and its event queue
pub struct Monitor {
    controller: EscalationController,
    rx: mpsc::Receiver<MonitorEvent>,
    snapshot_tx: watch::Sender<AlertSnapshot>,
    sos_tx: broadcast::Sender<SosEvent>,
    notice: Option<String>,
    /// Resolves once every [`MonitorHandle`] is gone
    handles_dropped: oneshot::Receiver<()>,
}

impl Monitor {
    /// Start the monitor loop on the current runtime
    pub fn spawn(config: EscalationConfig) -> (MonitorHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(EVENT_QUEUE_SIZE);
        let controller = EscalationController::new(config, tx.clone());
        let (snapshot_tx, snapshot_rx) = watch::channel(controller.snapshot());
        let (sos_tx, _) = broadcast::channel(SOS_CHANNEL_SIZE);
        let (alive_tx, handles_dropped) = oneshot::channel();

        let monitor = Monitor {
            controller,
            rx,
            snapshot_tx,
            sos_tx: sos_tx.clone(),
            notice: None,
            handles_dropped,
        };
        let join = tokio::spawn(monitor.run());

        let handle = MonitorHandle {
            tx,
            snapshot_rx,
            sos_tx,
            _alive: Arc::new(alive_tx),
        };
        (handle, join)
    }

    async fn run(mut self) {
        info!("Vital monitor started");

        // The controller holds its own sender for timers, so the queue never
        // closes by itself; stop when the last handle is dropped instead.
        loop {
            let event = tokio::select! {
                biased;
                event = self.rx.recv() => event,
                _ = &mut self.handles_dropped => {
                    debug!("All monitor handles dropped");
                    None
                }
            };
            let Some(event) = event else { break };
            if !self.handle(event) {
                break;
            }
        }

        self.controller.shutdown();
        info!("Vital monitor stopped");
    }

    /// Apply one event; returns false when the loop should stop
    fn handle(&mut self, event: MonitorEvent) -> bool {
        let reply = match event {
            MonitorEvent::Sample(sample, reply) => {
                metrics::counter!("driver_safety_samples_total").increment(1);
                self.notice = None;
                self.controller.on_sample(sample);
                reply
            }
            MonitorEvent::SourceUnavailable(notice) => {
                debug!("Source notice: {}", notice);
                self.notice = Some(notice);
                None
            }
            MonitorEvent::Acknowledge(reply) => {
                metrics::counter!("driver_safety_acknowledgements_total").increment(1);
                self.controller.acknowledge();
                reply
            }
            MonitorEvent::SetEmergencyContact(contact, reply) => {
                self.controller.set_emergency_contact(contact);
                reply
            }
            MonitorEvent::TimerFired(token) => {
                if let Some(sos) = self.controller.on_timer_fired(token) {
                    metrics::counter!("driver_safety_sos_total").increment(1);
                    // No subscribers is fine; the snapshot still shows the SOS
                    let _ = self.sos_tx.send(sos);
                }
                None
            }
            MonitorEvent::Shutdown => return false,
        };

        let snapshot = self.snapshot();
        self.snapshot_tx.send_replace(snapshot.clone());
        if let Some(reply) = reply {
            let _ = reply.send(snapshot);
        }
        true
    }

    fn snapshot(&self) -> AlertSnapshot {
        AlertSnapshot {
            notice: self.notice.clone(),
            ..self.controller.snapshot()
        }
    }
}

/// Cloneable handle used by the sampler and the presentation layer
#[derive(Clone)]
pub struct MonitorHandle {
    tx: mpsc::Sender<MonitorEvent>,
    snapshot_rx: watch::Receiver<AlertSnapshot>,
    sos_tx: broadcast::Sender<SosEvent>,
    _alive: Arc<oneshot::Sender<()>>,
}

impl MonitorHandle {
    /// Event sender for sample sources
    pub fn sender(&self) -> mpsc::Sender<MonitorEvent> {
        self.tx.clone()
    }

    /// Submit a sample and wait until it has been applied
    pub async fn submit_sample(&self, sample: Sample) -> Result<AlertSnapshot, MonitorError> {
        self.request(|reply| MonitorEvent::Sample(sample, reply)).await
    }

    /// Acknowledge the current alert
    pub async fn acknowledge(&self) -> Result<AlertSnapshot, MonitorError> {
        self.request(MonitorEvent::Acknowledge).await
    }

    /// Change the emergency contact
    pub async fn set_emergency_contact(
        &self,
        contact: impl Into<String>,
    ) -> Result<AlertSnapshot, MonitorError> {
        let contact = contact.into();
        self.request(|reply| MonitorEvent::SetEmergencyContact(contact, reply))
            .await
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> AlertSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// Watch snapshots as they change
    pub fn subscribe_snapshots(&self) -> watch::Receiver<AlertSnapshot> {
        self.snapshot_rx.clone()
    }

    /// Receive every SOS emitted from now on
    pub fn subscribe_sos(&self) -> broadcast::Receiver<SosEvent> {
        self.sos_tx.subscribe()
    }

    /// Ask the loop to stop; await its join handle to wait for teardown
    pub async fn shutdown(&self) -> Result<(), MonitorError> {
        self.tx
            .send(MonitorEvent::Shutdown)
            .await
            .map_err(|_| MonitorError::Closed)
    }

    async fn request<F>(&self, event: F) -> Result<AlertSnapshot, MonitorError>
    where
        F: FnOnce(Reply) -> MonitorEvent,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(event(Some(reply_tx)))
            .await
            .map_err(|_| MonitorError::Closed)?;
        reply_rx.await.map_err(|_| MonitorError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Status;
    use crate::controller::AlertPhase;
    use sensors::{spawn_sampler, ScriptedSource};
    use std::time::Duration;

    fn sample(bpm: u32) -> Sample {
        Sample::at(bpm, 30.0, 0).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_normal_sample_snapshot() {
        let (handle, join) = Monitor::spawn(EscalationConfig::default());

        let snap = handle.submit_sample(sample(72)).await.unwrap();
        assert_eq!(snap.status, Status::Normal);
        assert_eq!(snap.message, "✅ Normal");
        assert!(!snap.timer_armed);
        assert_eq!(handle.snapshot(), snap);

        handle.shutdown().await.unwrap();
        join.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_sos_broadcast_exactly_once() {
        let (handle, join) = Monitor::spawn(EscalationConfig::default());
        let mut sos_rx = handle.subscribe_sos();

        handle.submit_sample(sample(55)).await.unwrap();
        let sos = sos_rx.recv().await.unwrap();
        assert_eq!(sos.contact, "911");
        assert_eq!(handle.snapshot().message, sos.message);
        assert!(handle.snapshot().escalated);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert!(matches!(
            sos_rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));

        handle.shutdown().await.unwrap();
        join.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_acknowledge_through_handle() {
        let (handle, join) = Monitor::spawn(EscalationConfig::default());
        let mut sos_rx = handle.subscribe_sos();

        handle.submit_sample(sample(55)).await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        let snap = handle.acknowledge().await.unwrap();
        assert!(snap.acknowledged);
        assert!(!snap.timer_armed);
        assert_eq!(snap.phase, AlertPhase::AbnormalAcknowledged);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(sos_rx.try_recv().is_err());

        handle.shutdown().await.unwrap();
        join.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_contact_change_applies_to_sos() {
        let (handle, join) = Monitor::spawn(EscalationConfig::default());
        let mut sos_rx = handle.subscribe_sos();

        let snap = handle.set_emergency_contact("Alex").await.unwrap();
        assert_eq!(snap.emergency_contact, "Alex");

        handle.submit_sample(sample(130)).await.unwrap();
        let sos = sos_rx.recv().await.unwrap();
        assert_eq!(sos.contact, "Alex");
        assert_eq!(sos.status, Status::High);

        handle.shutdown().await.unwrap();
        join.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_with_armed_timer() {
        let (handle, join) = Monitor::spawn(EscalationConfig::default());
        let mut sos_rx = handle.subscribe_sos();

        handle.submit_sample(sample(55)).await.unwrap();
        handle.shutdown().await.unwrap();
        join.await.unwrap();

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(sos_rx.try_recv().is_err());
        assert_eq!(
            handle.acknowledge().await.unwrap_err(),
            MonitorError::Closed
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handles_stops_loop() {
        let (handle, join) = Monitor::spawn(EscalationConfig::default());
        let mut sos_rx = handle.subscribe_sos();
        let events = handle.sender();

        let snap = handle.submit_sample(sample(55)).await.unwrap();
        assert!(snap.timer_armed);

        let clone = handle.clone();
        drop(handle);
        drop(clone);
        join.await.unwrap();

        // The armed timer went down with the loop
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(sos_rx.try_recv().is_err());
        assert!(events.send(MonitorEvent::Shutdown).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sampler_feeds_monitor() {
        let (handle, join) = Monitor::spawn(EscalationConfig::default());
        let mut snapshots = handle.subscribe_snapshots();

        let source = ScriptedSource::from_heart_rates(&[55], 20.0);
        let sampler = spawn_sampler(source, Duration::from_secs(2), handle.sender());

        snapshots
            .wait_for(|s| s.status == Status::Low)
            .await
            .unwrap();

        // Script exhausted: the next tick reports the sensor as unavailable
        let snap = snapshots
            .wait_for(|s| s.notice.is_some())
            .await
            .unwrap()
            .clone();
        assert_eq!(snap.status, Status::Low);
        assert!(snap.timer_armed);

        sampler.abort();
        handle.shutdown().await.unwrap();
        join.await.unwrap();
    }
}
