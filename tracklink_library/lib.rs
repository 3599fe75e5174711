//! # TRACKLINK Library
//!
//! Geometry and concrete consumers built on `tracklink_core`.
//!
//! ## Structure
//!
//! ```text
//! tracklink_library/
//! ── tf/       # Locator frames, needle tip and tube transforms
//! ── nodes/    # LocatorNode, ProstateNavNode, tracker sources
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use tracklink_core::{EventStream, NeedleConfig, StreamConfig};
//! use tracklink_library::ProstateNavNode;
//!
//! let stream = EventStream::shared(StreamConfig::default());
//! let nav = ProstateNavNode::new(stream.clone(), NeedleConfig::default()).unwrap();
//! assert!(!nav.is_needle_ready());
//! assert_eq!(stream.callback_names(), vec!["robot", "scanner"]);
//! ```

pub mod nodes;
pub mod tf;

pub use nodes::{
    DeviceEventSource, LocatorNode, ProstateNavNode, SimulatedRobot, SimulatedScanner,
    SimulatedTracker,
};
pub use tf::{build_frame, needle_transform, LocatorFrame};
