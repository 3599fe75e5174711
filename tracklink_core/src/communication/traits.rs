//! Collaborator traits at the edges of the dispatch layer
//!
//! Tracker middleware, hardware drivers and command sinks live outside this
//! crate. These traits are the only contact points the
//! [`EventStream`](super::EventStream) and the polling driver rely on, so any
//! backend (middleware callbacks, a device SDK, a test queue) can be swapped in.

use super::event::MessageEvent;
use crate::attributes::{AttributeValue, TypeTag};
use crate::error::TrackResult;

/// An incoming event whose fields are looked up by name and expected type
pub trait InboundEvent {
    /// Routing key used to find the target attribute set
    fn callback_name(&self) -> &str;

    fn has_field(&self, name: &str) -> bool;

    /// Read a field as the given tag.
    ///
    /// Never called with [`TypeTag::ImageBuffer`]; images go through
    /// [`InboundEvent::raw_image`].
    fn field(&self, name: &str, tag: TypeTag) -> TrackResult<AttributeValue>;

    /// Raw voxel bytes of an image field; the wire format carries no geometry
    fn raw_image(&self, name: &str) -> TrackResult<Vec<u8>>;
}

/// An outgoing event under construction
pub trait OutboundEvent {
    fn set_field(&mut self, name: &str, value: AttributeValue);
}

/// Destination for outgoing events (robot commands and the like)
pub trait EventSink: Send {
    fn send(&mut self, sink_name: &str, event: &MessageEvent) -> TrackResult<()>;
}

/// Something the polling driver can pull events from
pub trait EventSource: Send {
    /// Begin a tracking session (open/start the hardware)
    fn start(&mut self) -> TrackResult<()>;

    /// End the session (stop/reset the hardware)
    fn stop(&mut self) -> TrackResult<()>;

    /// Fetch one sample, `Ok(None)` when nothing is pending
    fn poll(&mut self) -> TrackResult<Option<MessageEvent>>;
}
