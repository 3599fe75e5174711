//! Event sources backed by tracker hardware
//!
//! [`DeviceEventSource`] drives a [`TrackerDevice`] directly: every poll
//! refreshes the device and turns the configured tool's pose into a
//! `"tracker"` event. The simulated devices in [`sim`] stand in for real
//! hardware in tests and in the `tracklink-sim` binary.

pub mod sim;

use tracklink_core::attributes::AttributeValue;
use tracklink_core::communication::{EventSource, MessageEvent};
use tracklink_core::device::{ToolPose, TrackerDevice};
use tracklink_core::error::TrackResult;

pub use sim::{SimulatedRobot, SimulatedScanner, SimulatedTracker};

/// Callback name of events synthesized from tool poses
pub const TRACKER_CALLBACK: &str = "tracker";

/// Convert a tool pose into a tracker event
pub fn pose_event(callback: &str, pose: &ToolPose) -> MessageEvent {
    MessageEvent::new(callback)
        .with_field("position", AttributeValue::FloatVector(pose.position.to_vec()))
        .with_field(
            "orientation",
            AttributeValue::FloatVector(pose.orientation.to_vec()),
        )
}

pub struct DeviceEventSource<D: TrackerDevice> {
    device: D,
    tool_index: usize,
    callback: String,
    is_open: bool,
}

impl<D: TrackerDevice> DeviceEventSource<D> {
    pub fn new(device: D, tool_index: usize) -> Self {
        Self {
            device,
            tool_index,
            callback: TRACKER_CALLBACK.to_string(),
            is_open: false,
        }
    }

    /// Publish under a callback name other than `"tracker"`
    pub fn with_callback(mut self, callback: &str) -> Self {
        self.callback = callback.to_string();
        self
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn tool_index(&self) -> usize {
        self.tool_index
    }
}

impl<D: TrackerDevice> EventSource for DeviceEventSource<D> {
    // A device opened here is closed again when tracking refuses to start
    fn start(&mut self) -> TrackResult<()> {
        let opened_here = !self.is_open;
        if opened_here {
            self.device.open()?;
            self.is_open = true;
        }
        if let Err(e) = self.device.start_tracking() {
            if opened_here {
                self.is_open = false;
                if let Err(close_err) = self.device.close() {
                    log::warn!("close after failed start: {}", close_err);
                }
            }
            return Err(e);
        }
        Ok(())
    }

    // Close even when stopping fails; report the first failure
    fn stop(&mut self) -> TrackResult<()> {
        let stopped = self.device.stop_tracking();
        let closed = if self.is_open {
            self.is_open = false;
            self.device.close()
        } else {
            Ok(())
        };
        stopped.and(closed)
    }

    fn poll(&mut self) -> TrackResult<Option<MessageEvent>> {
        self.device.update_status()?;
        let pose = self.device.tool_transform(self.tool_index)?;
        Ok(Some(pose_event(&self.callback, &pose)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracklink_core::communication::InboundEvent;
    use tracklink_core::TrackError;

    #[test]
    fn test_lifecycle_reaches_device() {
        let mut source = DeviceEventSource::new(SimulatedTracker::new(1), 0);
        source.start().unwrap();
        assert!(source.device().is_open());
        assert!(source.device().is_tracking());

        let event = source.poll().unwrap().unwrap();
        assert_eq!(event.callback_name(), TRACKER_CALLBACK);
        assert!(event.has_field("position"));
        assert!(event.has_field("orientation"));

        source.stop().unwrap();
        assert!(!source.device().is_open());
        assert!(!source.device().is_tracking());
    }

    #[test]
    fn test_bad_tool_index_is_device_error() {
        let mut source = DeviceEventSource::new(SimulatedTracker::new(1), 3);
        source.start().unwrap();
        assert!(matches!(source.poll(), Err(TrackError::DeviceComm(_))));
    }

    struct RefusingTracker {
        is_open: bool,
        closes: usize,
    }

    impl TrackerDevice for RefusingTracker {
        fn open(&mut self) -> TrackResult<()> {
            self.is_open = true;
            Ok(())
        }

        fn close(&mut self) -> TrackResult<()> {
            self.is_open = false;
            self.closes += 1;
            Ok(())
        }

        fn start_tracking(&mut self) -> TrackResult<()> {
            Err(TrackError::device("tracking refused"))
        }

        fn stop_tracking(&mut self) -> TrackResult<()> {
            Ok(())
        }

        fn update_status(&mut self) -> TrackResult<()> {
            Ok(())
        }

        fn tool_transform(&self, _tool_index: usize) -> TrackResult<ToolPose> {
            Ok(ToolPose::default())
        }
    }

    #[test]
    fn test_refused_start_closes_device() {
        let device = RefusingTracker {
            is_open: false,
            closes: 0,
        };
        let mut source = DeviceEventSource::new(device, 0);
        assert!(matches!(source.start(), Err(TrackError::DeviceComm(_))));
        assert!(!source.device().is_open);
        assert_eq!(source.device().closes, 1);

        // a second attempt opens and closes again
        assert!(source.start().is_err());
        assert_eq!(source.device().closes, 2);
    }

    #[test]
    fn test_failed_session_start_leaves_device_closed() {
        use tracklink_core::communication::{EventStream, StreamConfig};
        use tracklink_core::scheduling::{PollingConfig, PollingDriver, PollingState};

        let device = RefusingTracker {
            is_open: false,
            closes: 0,
        };
        let stream = EventStream::shared(StreamConfig::default());
        let mut driver = PollingDriver::new(
            "tracker",
            DeviceEventSource::new(device, 0),
            stream,
            PollingConfig::immediate(1),
        );

        assert!(driver.start().is_err());
        driver.stop();
        driver.tick().unwrap();
        assert_eq!(driver.state(), PollingState::Idle);
        assert!(!driver.source().device().is_open);
    }

    #[test]
    fn test_custom_callback() {
        let mut source =
            DeviceEventSource::new(SimulatedTracker::new(2), 1).with_callback("stylus");
        source.start().unwrap();
        assert_eq!(source.poll().unwrap().unwrap().name(), "stylus");
    }
}
