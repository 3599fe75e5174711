//! Event dispatch between tracker events and attribute sets
//!
//! The [`EventStream`] keeps a registry from callback name to attribute set.
//! Each incoming event is routed by its callback name; every registered
//! attribute that the event carries is extracted with the cell's own type and
//! stored, then the set is touched and its handler runs. The reverse path,
//! [`EventStream::push_event`], serializes a set into an outgoing event.

use super::config::StreamConfig;
use super::event::MessageEvent;
use super::traits::{EventSink, InboundEvent, OutboundEvent};
use crate::attributes::{
    AttributeHandler, AttributeSet, AttributeValue, ImageBuffer, ImageGeometry,
    SharedAttributeSet, TypeTag,
};
use crate::error::{TrackError, TrackResult};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Result of routing one inbound event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The event reached an attribute set
    Delivered {
        /// Fields stored into cells
        updated: usize,
        /// Fields present but rejected (type mismatch, bad image)
        rejected: usize,
    },
    /// No attribute set is registered under the event's callback name
    Unrouted,
}

impl DispatchOutcome {
    /// Treat an unrouted event as an error, for callers that expect every
    /// callback name to be registered. Returns the number of updated fields.
    pub fn routed(self, callback: &str) -> TrackResult<usize> {
        match self {
            DispatchOutcome::Delivered { updated, .. } => Ok(updated),
            DispatchOutcome::Unrouted => Err(TrackError::UnknownCallbackName(callback.to_string())),
        }
    }
}

/// Counters snapshot for monitoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub delivered: u64,
    pub unrouted: u64,
    pub rejected_fields: u64,
    pub pushed: u64,
}

#[derive(Debug, Default)]
struct AtomicDispatchStats {
    delivered: AtomicU64,
    unrouted: AtomicU64,
    rejected_fields: AtomicU64,
    pushed: AtomicU64,
}

impl AtomicDispatchStats {
    fn snapshot(&self) -> DispatchStats {
        DispatchStats {
            delivered: self.delivered.load(Ordering::Relaxed),
            unrouted: self.unrouted.load(Ordering::Relaxed),
            rejected_fields: self.rejected_fields.load(Ordering::Relaxed),
            pushed: self.pushed.load(Ordering::Relaxed),
        }
    }
}

/// Routes inbound events to attribute sets and outbound sets to a sink
pub struct EventStream {
    name: String,
    unit_scale: f64,
    image_geometry: RwLock<ImageGeometry>,
    // Non-owning: consumers keep the sets alive
    registry: RwLock<HashMap<String, Weak<Mutex<AttributeSet>>>>,
    sink: Mutex<Option<Box<dyn EventSink>>>,
    stats: AtomicDispatchStats,
}

impl EventStream {
    pub fn new(config: StreamConfig) -> Self {
        Self {
            name: config.name,
            unit_scale: config.unit_scale,
            image_geometry: RwLock::new(config.image_geometry),
            registry: RwLock::new(HashMap::new()),
            sink: Mutex::new(None),
            stats: AtomicDispatchStats::default(),
        }
    }

    /// Convenience constructor returning a shareable stream
    pub fn shared(config: StreamConfig) -> Arc<Self> {
        Arc::new(Self::new(config))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit_scale(&self) -> f64 {
        self.unit_scale
    }

    pub fn image_geometry(&self) -> ImageGeometry {
        *self.image_geometry.read()
    }

    /// Override the geometry used to materialize raw image payloads
    pub fn set_image_geometry(&self, geometry: ImageGeometry) {
        *self.image_geometry.write() = geometry;
    }

    /// Attach the destination for [`EventStream::push_event`]
    pub fn set_sink(&self, sink: Box<dyn EventSink>) {
        *self.sink.lock() = Some(sink);
    }

    /// Associate `name` with `set` and install the set's handler.
    ///
    /// Re-registering a name replaces the previous association; the replaced
    /// set is returned so the caller can notice the overwrite.
    pub fn register_callback(
        &self,
        name: &str,
        set: &SharedAttributeSet,
        handler: Option<AttributeHandler>,
    ) -> Option<SharedAttributeSet> {
        {
            let mut guard = set.lock();
            guard.set_owning_stream(Some(self.name.clone()));
            guard.set_handler(handler);
        }

        let previous = self
            .registry
            .write()
            .insert(name.to_string(), Arc::downgrade(set))
            .and_then(|weak| weak.upgrade())
            .filter(|old| !Arc::ptr_eq(old, set));

        if let Some(old) = &previous {
            log::warn!(
                "[{}] callback '{}' re-registered, replacing attribute set '{}'",
                self.name,
                name,
                old.lock().name()
            );
            old.lock().set_owning_stream(None);
        } else {
            log::debug!("[{}] registered callback '{}'", self.name, name);
        }
        previous
    }

    /// Drop the association for `name`, returning the set if it is still alive
    pub fn unregister_callback(&self, name: &str) -> Option<SharedAttributeSet> {
        let removed = self.registry.write().remove(name)?.upgrade()?;
        removed.lock().set_owning_stream(None);
        Some(removed)
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.registry
            .read()
            .get(name)
            .map_or(false, |weak| weak.strong_count() > 0)
    }

    pub fn callback_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.registry.read().keys().cloned().collect();
        names.sort();
        names
    }

    fn lookup(&self, name: &str) -> Option<SharedAttributeSet> {
        let found = self.registry.read().get(name).map(Weak::upgrade);
        match found {
            Some(Some(set)) => Some(set),
            Some(None) => {
                log::debug!("[{}] attribute set for '{}' was dropped", self.name, name);
                self.registry.write().remove(name);
                None
            }
            None => None,
        }
    }

    /// Route one inbound event.
    ///
    /// All field writes for the cycle complete before the set is touched and
    /// its handler runs. Unknown callback names and bad fields are logged and
    /// skipped; they never fail the call.
    pub fn on_event(&self, event: &dyn InboundEvent) -> DispatchOutcome {
        let callback = event.callback_name();
        let Some(shared) = self.lookup(callback) else {
            self.stats.unrouted.fetch_add(1, Ordering::Relaxed);
            log::debug!("[{}] no attribute set for callback '{}'", self.name, callback);
            return DispatchOutcome::Unrouted;
        };

        let geometry = self.image_geometry();
        let mut set = shared.lock();
        let mut updated = 0;
        let mut rejected = 0;

        for (field, handle) in set.handles() {
            if !event.has_field(&field) {
                continue;
            }
            let Some(tag) = set.cell(handle).map(|c| c.tag()) else {
                continue;
            };
            let stored = extract(event, &field, tag, geometry).and_then(|v| {
                log::trace!("[{}] {}.{} = {}", self.name, callback, field, v.log_summary());
                set.set(handle, v)
            });
            match stored {
                Ok(()) => updated += 1,
                Err(e) => {
                    rejected += 1;
                    log::warn!("[{}] '{}.{}' skipped: {}", self.name, callback, field, e);
                }
            }
        }

        set.touch();
        set.notify();

        self.stats.delivered.fetch_add(1, Ordering::Relaxed);
        self.stats
            .rejected_fields
            .fetch_add(rejected as u64, Ordering::Relaxed);
        DispatchOutcome::Delivered { updated, rejected }
    }

    /// Serialize every set cell into an outgoing event and hand it to the sink.
    ///
    /// Cells that were never written (images before their first frame) are
    /// left out.
    pub fn push_event(&self, sink_name: &str, set: &AttributeSet) -> TrackResult<MessageEvent> {
        let mut event = MessageEvent::new(sink_name);
        for cell in set.iter() {
            if let Ok(value) = cell.value() {
                event.set_field(cell.name(), value.clone());
            }
        }

        let mut sink = self.sink.lock();
        let sink = sink
            .as_mut()
            .ok_or_else(|| TrackError::NoSink(self.name.clone()))?;
        sink.send(sink_name, &event)?;

        self.stats.pushed.fetch_add(1, Ordering::Relaxed);
        log::debug!(
            "[{}] pushed '{}' with {} fields",
            self.name,
            sink_name,
            event.len()
        );
        Ok(event)
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats.snapshot()
    }
}

impl std::fmt::Debug for EventStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStream")
            .field("name", &self.name)
            .field("callbacks", &self.callback_names())
            .finish_non_exhaustive()
    }
}

fn extract(
    event: &dyn InboundEvent,
    field: &str,
    tag: TypeTag,
    geometry: ImageGeometry,
) -> TrackResult<AttributeValue> {
    if tag == TypeTag::ImageBuffer {
        let bytes = event.raw_image(field)?;
        Ok(AttributeValue::ImageBuffer(ImageBuffer::from_raw(geometry, bytes)?))
    } else {
        event.field(field, tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dropped_set_is_pruned() {
        let stream = EventStream::new(StreamConfig::default());
        let set = AttributeSet::new("robot").into_shared();
        stream.register_callback("robot", &set, None);
        assert!(stream.is_registered("robot"));

        drop(set);
        assert!(!stream.is_registered("robot"));
        let outcome = stream.on_event(&MessageEvent::new("robot"));
        assert_eq!(outcome, DispatchOutcome::Unrouted);
        assert!(stream.callback_names().is_empty());
    }

    #[test]
    fn test_register_records_owning_stream() {
        let stream = EventStream::new(StreamConfig::named("nav"));
        let set = AttributeSet::new("robot").into_shared();
        stream.register_callback("robot", &set, None);
        assert_eq!(set.lock().owning_stream(), Some("nav"));

        stream.unregister_callback("robot");
        assert_eq!(set.lock().owning_stream(), None);
    }

    #[test]
    fn test_replaced_set_loses_owning_stream() {
        let stream = EventStream::new(StreamConfig::named("nav"));
        let first = AttributeSet::new("robot").into_shared();
        let second = AttributeSet::new("robot").into_shared();
        stream.register_callback("robot", &first, None);

        let replaced = stream.register_callback("robot", &second, None).unwrap();
        assert!(Arc::ptr_eq(&replaced, &first));
        assert_eq!(first.lock().owning_stream(), None);
        assert_eq!(second.lock().owning_stream(), Some("nav"));
    }

    #[test]
    fn test_routed_outcome() {
        let stream = EventStream::new(StreamConfig::default());
        let set = AttributeSet::new("scanner")
            .with_attribute("fov", TypeTag::Float)
            .unwrap()
            .into_shared();
        stream.register_callback("scanner", &set, None);

        let event = MessageEvent::new("scanner").with_field("fov", AttributeValue::Float(240.0));
        assert_eq!(stream.on_event(&event).routed("scanner").unwrap(), 1);

        let stray = MessageEvent::new("needle_guide");
        assert!(matches!(
            stream.on_event(&stray).routed("needle_guide"),
            Err(TrackError::UnknownCallbackName(ref name)) if name == "needle_guide"
        ));
    }

    #[test]
    fn test_push_without_sink_fails() {
        let stream = EventStream::new(StreamConfig::default());
        let set = AttributeSet::new("cmd");
        assert!(matches!(
            stream.push_event("robot", &set),
            Err(TrackError::NoSink(_))
        ));
    }
}
