//! Polling driver - the control loop that keeps events flowing
//!
//! A [`PollingDriver`] pulls a batch of samples from an [`EventSource`] per
//! [`tick`](PollingDriver::tick) and routes each one through an
//! [`EventStream`]. It is scheduler-agnostic: the [`Scheduler`](super::Scheduler),
//! a timer, or a plain loop can call `tick` at the configured cadence.
//!
//! ```text
//!          start / tracking flag set
//!   Idle ----------------------------> Polling
//!    ^                                    |
//!    +------------------------------------+
//!      stop / tracking flag cleared / device error
//! ```

use super::config::PollingConfig;
use crate::communication::{DispatchOutcome, EventSource, EventStream};
use crate::core::{Node, NodeInfo};
use crate::device::DeviceEvent;
use crate::error::TrackResult;
use crossbeam::channel::{self, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollingState {
    Idle,
    Polling,
}

/// Shareable handle on the driver's tracking flag
#[derive(Debug, Clone, Default)]
pub struct TrackingFlag(Arc<AtomicBool>);

impl TrackingFlag {
    pub fn set(&self, on: bool) {
        self.0.store(on, Ordering::SeqCst);
    }

    pub fn get(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What one tick did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Samples pulled from the source
    pub pulled: usize,
    /// Samples that reached an attribute set
    pub delivered: usize,
}

pub struct PollingDriver<S: EventSource> {
    name: String,
    source: S,
    stream: Arc<EventStream>,
    config: PollingConfig,
    tracking: TrackingFlag,
    state: PollingState,
    health_tx: Sender<DeviceEvent>,
    health_rx: Receiver<DeviceEvent>,
    total_pulled: u64,
}

impl<S: EventSource> PollingDriver<S> {
    pub fn new(name: &str, source: S, stream: Arc<EventStream>, config: PollingConfig) -> Self {
        let (health_tx, health_rx) = channel::unbounded();
        Self {
            name: name.to_string(),
            source,
            stream,
            config,
            tracking: TrackingFlag::default(),
            state: PollingState::Idle,
            health_tx,
            health_rx,
            total_pulled: 0,
        }
    }

    pub fn state(&self) -> PollingState {
        self.state
    }

    pub fn config(&self) -> &PollingConfig {
        &self.config
    }

    pub fn stream(&self) -> &Arc<EventStream> {
        &self.stream
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn total_pulled(&self) -> u64 {
        self.total_pulled
    }

    /// Flag other threads can clear to end the session at the next tick
    pub fn tracking_flag(&self) -> TrackingFlag {
        self.tracking.clone()
    }

    /// Device health notifications (started, stopped, errors)
    pub fn health_events(&self) -> Receiver<DeviceEvent> {
        self.health_rx.clone()
    }

    /// Start a tracking session. A no-op while already polling.
    pub fn start(&mut self) -> TrackResult<()> {
        self.tracking.set(true);
        if self.state == PollingState::Polling {
            return Ok(());
        }
        if let Err(e) = self.source.start() {
            self.tracking.set(false);
            self.report_error(&format!("start failed: {}", e));
            return Err(e);
        }
        self.state = PollingState::Polling;
        log::info!("[{}] polling started ({} ms)", self.name, self.config.speed_ms);
        let _ = self.health_tx.send(DeviceEvent::Started);
        Ok(())
    }

    /// End the session. A no-op while idle.
    pub fn stop(&mut self) {
        self.tracking.set(false);
        self.enter_idle();
    }

    // Always ends in Idle, even when the device refuses to stop
    fn enter_idle(&mut self) {
        if self.state == PollingState::Idle {
            return;
        }
        self.state = PollingState::Idle;
        if let Err(e) = self.source.stop() {
            self.report_error(&format!("stop failed: {}", e));
        }
        log::info!("[{}] polling stopped", self.name);
        let _ = self.health_tx.send(DeviceEvent::Stopped);
    }

    fn report_error(&self, msg: &str) {
        log::error!("[{}] {}", self.name, msg);
        let _ = self.health_tx.send(DeviceEvent::Error(msg.to_string()));
    }

    /// One pull-and-dispatch cycle.
    ///
    /// With the tracking flag cleared the driver goes idle (stopping the
    /// device) instead of pulling. A device error ends the session and is
    /// returned after the driver is idle.
    pub fn tick(&mut self) -> TrackResult<TickReport> {
        if !self.tracking.get() {
            self.enter_idle();
            return Ok(TickReport::default());
        }
        if self.state == PollingState::Idle {
            self.start()?;
        }

        let mut report = TickReport::default();
        for i in 0..self.config.batch_size {
            if !self.tracking.get() {
                break;
            }
            let event = match self.source.poll() {
                Ok(Some(event)) => event,
                Ok(None) => break,
                Err(e) => {
                    self.report_error(&format!("poll failed: {}", e));
                    self.tracking.set(false);
                    self.enter_idle();
                    return Err(e);
                }
            };

            report.pulled += 1;
            self.total_pulled += 1;
            if let DispatchOutcome::Delivered { .. } = self.stream.on_event(&event) {
                report.delivered += 1;
            }

            if self.config.speed_ms > 0 && i + 1 < self.config.batch_size {
                std::thread::sleep(self.config.speed());
            }
        }
        Ok(report)
    }
}

impl<S: EventSource> Node for PollingDriver<S> {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&mut self, ctx: &mut NodeInfo) -> TrackResult<()> {
        self.start()?;
        ctx.log_info("tracking session open");
        Ok(())
    }

    fn tick(&mut self, ctx: Option<&mut NodeInfo>) {
        let result = PollingDriver::tick(self);
        if let Some(ctx) = ctx {
            match result {
                Ok(report) => {
                    if report.pulled > report.delivered {
                        ctx.log_debug(&format!(
                            "{} of {} samples unrouted",
                            report.pulled - report.delivered,
                            report.pulled
                        ));
                    }
                    ctx.record_dispatch(report.delivered as u64);
                }
                Err(e) => ctx.record_tick_failure(e.to_string()),
            }
        }
    }

    fn shutdown(&mut self, ctx: &mut NodeInfo) -> TrackResult<()> {
        self.stop();
        ctx.log_info(&format!("closed after {} samples", self.total_pulled));
        Ok(())
    }

    fn is_healthy(&self) -> bool {
        self.state == PollingState::Polling
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::communication::{MessageEvent, StreamConfig};
    use crate::error::TrackError;

    #[derive(Default)]
    struct CountingSource {
        starts: usize,
        stops: usize,
        fail_stop: bool,
        fail_poll: bool,
    }

    impl EventSource for CountingSource {
        fn start(&mut self) -> TrackResult<()> {
            self.starts += 1;
            Ok(())
        }

        fn stop(&mut self) -> TrackResult<()> {
            self.stops += 1;
            if self.fail_stop {
                Err(TrackError::device("reset refused"))
            } else {
                Ok(())
            }
        }

        fn poll(&mut self) -> TrackResult<Option<MessageEvent>> {
            if self.fail_poll {
                Err(TrackError::device("cable unplugged"))
            } else {
                Ok(Some(MessageEvent::new("tracker")))
            }
        }
    }

    fn driver(source: CountingSource) -> PollingDriver<CountingSource> {
        let stream = EventStream::shared(StreamConfig::default());
        PollingDriver::new("test", source, stream, PollingConfig::immediate(10))
    }

    #[test]
    fn test_start_and_stop_are_idempotent() {
        let mut d = driver(CountingSource::default());
        d.start().unwrap();
        d.start().unwrap();
        assert_eq!(d.state(), PollingState::Polling);
        assert_eq!(d.source().starts, 1);

        d.stop();
        d.stop();
        assert_eq!(d.state(), PollingState::Idle);
        assert_eq!(d.source().stops, 1);
    }

    #[test]
    fn test_tick_pulls_one_batch() {
        let mut d = driver(CountingSource::default());
        d.start().unwrap();
        let report = d.tick().unwrap();
        assert_eq!(report.pulled, 10);
        // nothing registered for "tracker"
        assert_eq!(report.delivered, 0);
        assert_eq!(d.stream().stats().unrouted, 10);
    }

    #[test]
    fn test_cleared_flag_goes_idle_on_next_tick() {
        let mut d = driver(CountingSource::default());
        d.start().unwrap();
        d.tracking_flag().set(false);

        let report = d.tick().unwrap();
        assert_eq!(report.pulled, 0);
        assert_eq!(d.state(), PollingState::Idle);
        assert_eq!(d.source().stops, 1);
    }

    #[test]
    fn test_stop_failure_still_ends_idle() {
        let mut d = driver(CountingSource {
            fail_stop: true,
            ..Default::default()
        });
        let health = d.health_events();
        d.start().unwrap();
        d.stop();

        assert_eq!(d.state(), PollingState::Idle);
        let events: Vec<DeviceEvent> = health.try_iter().collect();
        assert_eq!(events[0], DeviceEvent::Started);
        assert!(matches!(events[1], DeviceEvent::Error(_)));
        assert_eq!(events[2], DeviceEvent::Stopped);
    }

    #[test]
    fn test_poll_error_ends_session() {
        let mut d = driver(CountingSource {
            fail_poll: true,
            ..Default::default()
        });
        d.start().unwrap();
        assert!(matches!(d.tick(), Err(TrackError::DeviceComm(_))));
        assert_eq!(d.state(), PollingState::Idle);
        assert!(!d.tracking_flag().get());
    }
}
