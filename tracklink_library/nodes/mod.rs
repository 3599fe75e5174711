//! TRACKLINK nodes
//!
//! - [`LocatorNode`]: locator frame of a tracked tool
//! - [`ProstateNavNode`]: needle guide robot plus live scanner images
//! - [`tracker`]: hardware-backed and simulated event sources

pub mod locator;
pub mod prostate_nav;
pub mod tracker;

pub use locator::LocatorNode;
pub use prostate_nav::{ProstateNavNode, ROBOT_CALLBACK, SCANNER_CALLBACK};
pub use tracker::{
    DeviceEventSource, SimulatedRobot, SimulatedScanner, SimulatedTracker, TRACKER_CALLBACK,
};
