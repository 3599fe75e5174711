//! # Scheduling
//!
//! - **PollingDriver**: pulls batches from an event source into a stream
//! - **Scheduler**: ticks a set of [`Node`](crate::core::Node)s in priority order

pub mod config;
pub mod poller;
pub mod scheduler;

pub use config::PollingConfig;
pub use poller::{PollingDriver, PollingState, TickReport, TrackingFlag};
pub use scheduler::Scheduler;
