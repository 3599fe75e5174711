//! # Event dispatch for TRACKLINK
//!
//! - **EventStream**: routes inbound events to attribute sets by callback name
//!   and pushes attribute sets out as commands
//! - **MessageEvent**: in-memory event used in both directions
//! - **Traits**: the collaborator contracts for event sources, events and sinks
//!
//! ## Usage
//!
//! ```rust
//! use tracklink_core::attributes::{AttributeSet, TypeTag};
//! use tracklink_core::communication::{EventStream, MessageEvent, StreamConfig};
//! use tracklink_core::attributes::AttributeValue;
//!
//! let stream = EventStream::new(StreamConfig::default());
//! let robot = AttributeSet::new("robot")
//!     .with_attribute("status", TypeTag::String)
//!     .unwrap()
//!     .into_shared();
//! stream.register_callback("robot", &robot, None);
//!
//! let event = MessageEvent::new("robot").with_field("status", AttributeValue::text("READY"));
//! stream.on_event(&event);
//! assert_eq!(robot.lock().get::<String>("status").unwrap(), "READY");
//! ```

pub mod config;
pub mod event;
pub mod queue;
pub mod stream;
pub mod traits;

pub use config::StreamConfig;
pub use event::{EventField, MessageEvent};
pub use queue::{ChannelSink, QueueEventSource};
pub use stream::{DispatchOutcome, DispatchStats, EventStream};
pub use traits::{EventSink, EventSource, InboundEvent, OutboundEvent};
