//! # TRACKLINK Core
//!
//! The runtime layer between tracking hardware and navigation consumers.
//!
//! - **Attributes**: typed, named cells grouped into per-source attribute sets
//! - **Communication**: the event stream that routes inbound events into
//!   attribute sets by callback name and pushes sets back out as commands
//! - **Scheduling**: the polling driver that keeps samples flowing, and a
//!   small scheduler for nodes
//! - **Params**: TOML configuration for all of the above
//!
//! ## Quick Start
//!
//! ```rust
//! use tracklink_core::{AttributeSet, EventStream, MessageEvent, StreamConfig, TypeTag};
//! use tracklink_core::attributes::AttributeValue;
//!
//! let stream = EventStream::new(StreamConfig::default());
//! let scanner = AttributeSet::new("scanner")
//!     .with_attribute("fov", TypeTag::Float)
//!     .unwrap()
//!     .into_shared();
//! stream.register_callback("scanner", &scanner, None);
//!
//! stream.on_event(&MessageEvent::new("scanner").with_field("fov", AttributeValue::Float(240.0)));
//! assert_eq!(scanner.lock().get::<f32>("fov").unwrap(), 240.0);
//! ```

pub mod attributes;
pub mod communication;
pub mod core;
pub mod device;
pub mod error;
pub mod params;
pub mod scheduling;

pub use attributes::{
    AttributeCell, AttributeSet, AttributeType, AttributeValue, CellHandle, ImageBuffer,
    ImageGeometry, SharedAttributeSet, TypeTag,
};
pub use communication::{
    DispatchOutcome, EventSink, EventSource, EventStream, InboundEvent, MessageEvent,
    OutboundEvent, StreamConfig,
};
pub use core::{Node, NodeInfo, NodeState};
pub use device::{DeviceEvent, ToolPose, TrackerDevice};
pub use error::{TrackError, TrackResult};
pub use params::{NeedleConfig, TrackParams};
pub use scheduling::{PollingConfig, PollingDriver, PollingState, Scheduler};
