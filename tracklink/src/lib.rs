//! # TRACKLINK - tracking streams for image-guided therapy
//!
//! TRACKLINK routes telemetry from trackers, robots and scanners into typed
//! attribute sets, and turns raw poses into locator and needle frames.
//!
//! ## Quick Start
//!
//! ```rust
//! use tracklink::prelude::*;
//!
//! let stream = EventStream::shared(StreamConfig::default());
//! let nav = ProstateNavNode::new(stream.clone(), NeedleConfig::default()).unwrap();
//!
//! stream.on_event(
//!     &MessageEvent::new("robot")
//!         .with_field("position", AttributeValue::FloatVector(vec![0.0, 0.0, 0.0]))
//!         .with_field("orientation", AttributeValue::FloatVector(vec![0.0, 0.0, 0.0, 1.0]))
//!         .with_field("depth", AttributeValue::FloatVector(vec![0.0, 0.0, 5.0])),
//! );
//! assert_eq!(nav.needle_matrix().translation().z, 5.0);
//! ```
//!
//! ## Features
//!
//! - **Typed attributes** over a closed set of sixteen payload types
//! - **Name-routed dispatch** with completion handlers per data source
//! - **Polling driver** with an Idle/Polling state machine and device health events
//! - **Pose geometry** for locator frames, needle tips and tube placement

pub use tracklink_core::{self, *};

pub use tracklink_library as library;

pub use nalgebra;

/// The TRACKLINK prelude - everything you need to get started
pub mod prelude {
    // Attributes
    pub use tracklink_core::attributes::{
        AttributeSet, AttributeType, AttributeValue, ImageBuffer, ImageGeometry,
        SharedAttributeSet, TypeTag,
    };

    // Dispatch
    pub use tracklink_core::communication::{
        ChannelSink, DispatchOutcome, EventSink, EventSource, EventStream, InboundEvent,
        MessageEvent, OutboundEvent, QueueEventSource, StreamConfig,
    };

    // Nodes and scheduling
    pub use tracklink_core::core::{Node, NodeInfo, NodeState};
    pub use tracklink_core::device::{DeviceEvent, ToolPose, TrackerDevice};
    pub use tracklink_core::scheduling::{PollingConfig, PollingDriver, PollingState, Scheduler};

    // Configuration
    pub use tracklink_core::params::{NeedleConfig, TrackParams};

    // Error types
    pub use tracklink_core::error::{TrackError, TrackResult};
    pub type Result<T> = TrackResult<T>;

    // Library
    pub use tracklink_library::nodes::{
        DeviceEventSource, LocatorNode, ProstateNavNode, SimulatedRobot, SimulatedScanner,
        SimulatedTracker,
    };
    pub use tracklink_library::tf::{build_frame, needle_transform, LocatorFrame};

    // Common std types
    pub use std::sync::Arc;
    pub use std::time::{Duration, Instant};

    // Common traits
    pub use serde::{Deserialize, Serialize};

    // Pose math
    pub use nalgebra::{Matrix4, Vector3};

    // Re-export anyhow for error handling
    pub use anyhow::{anyhow, bail, ensure, Context, Result as AnyResult};
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Session {
        params: TrackParams,
    }

    #[test]
    fn test_prelude_covers_config_and_pose_math() {
        let session = Session {
            params: TrackParams::default(),
        };
        assert_eq!(session.params.needle.tube_length, 100.0);

        let frame = build_frame([0.0; 3], [0.0, 0.0, 0.0, 1.0], 1.0, None);
        let placement: Matrix4<f64> = needle_transform(&frame, 0.0);
        assert_eq!(placement, Matrix4::identity());
        assert_eq!(frame.normal(), Vector3::z());
    }
}
