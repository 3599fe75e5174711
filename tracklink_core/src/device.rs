//! Tracker hardware contract
//!
//! Drivers for optical/electromagnetic trackers implement [`TrackerDevice`].
//! The polling driver never talks to a device directly; a device is wrapped
//! in an [`EventSource`](crate::communication::EventSource) that turns tool
//! poses into events.

use crate::error::TrackResult;

/// Raw pose of one tracked tool, in device units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolPose {
    pub position: [f32; 3],
    /// Quaternion as (x, y, z, w)
    pub orientation: [f32; 4],
}

impl Default for ToolPose {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            orientation: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

/// Device health notifications published by the polling driver
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    Started,
    Stopped,
    Error(String),
}

pub trait TrackerDevice: Send {
    fn open(&mut self) -> TrackResult<()>;

    fn close(&mut self) -> TrackResult<()>;

    fn start_tracking(&mut self) -> TrackResult<()>;

    fn stop_tracking(&mut self) -> TrackResult<()>;

    /// Refresh the device's cached tool states
    fn update_status(&mut self) -> TrackResult<()>;

    fn tool_transform(&self, tool_index: usize) -> TrackResult<ToolPose>;
}
