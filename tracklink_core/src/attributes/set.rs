//! Attribute sets - one logical telemetry message per set
//!
//! An [`AttributeSet`] owns an insertion-ordered collection of
//! [`AttributeCell`]s, the time of its last completed update and an optional
//! completion handler. Sets are shared between the consumer that owns them and
//! the [`EventStream`](crate::communication::EventStream) that feeds them, so
//! they normally live behind a [`SharedAttributeSet`].

use super::cell::{AttributeCell, CellHandle};
use super::value::{AttributeType, AttributeValue, TypeTag};
use crate::error::{TrackError, TrackResult};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Completion handler, invoked after every dispatch cycle
pub type AttributeHandler = Box<dyn FnMut(&AttributeSet) + Send>;

/// Attribute set shared between its owner and a stream
pub type SharedAttributeSet = Arc<Mutex<AttributeSet>>;

pub struct AttributeSet {
    name: String,
    cells: Vec<AttributeCell>,
    index: HashMap<String, usize>,
    last_update: Option<Instant>,
    update_count: u64,
    handler: Option<AttributeHandler>,
    // name of the registering stream
    owning_stream: Option<String>,
}

impl AttributeSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cells: Vec::new(),
            index: HashMap::new(),
            last_update: None,
            update_count: 0,
            handler: None,
            owning_stream: None,
        }
    }

    /// Wrap the set for sharing with a stream
    pub fn into_shared(self) -> SharedAttributeSet {
        Arc::new(Mutex::new(self))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register an attribute with the tag's zero value
    pub fn add_attribute(&mut self, name: &str, tag: TypeTag) -> TrackResult<CellHandle> {
        self.insert(AttributeCell::new(name, tag, None)?)
    }

    /// Register an attribute whose tag is inferred from `T`
    pub fn register<T: AttributeType>(
        &mut self,
        name: &str,
        initial: Option<T>,
    ) -> TrackResult<CellHandle> {
        let cell = AttributeCell::new(name, T::TAG, initial.map(T::into_value))?;
        self.insert(cell)
    }

    /// Builder-style registration used when declaring a fixed schema
    pub fn with_attribute(mut self, name: &str, tag: TypeTag) -> TrackResult<Self> {
        self.add_attribute(name, tag)?;
        Ok(self)
    }

    fn insert(&mut self, cell: AttributeCell) -> TrackResult<CellHandle> {
        if self.index.contains_key(cell.name()) {
            return Err(TrackError::DuplicateName(cell.name().to_string()));
        }
        let handle = CellHandle(self.cells.len());
        self.index.insert(cell.name().to_string(), handle.0);
        self.cells.push(cell);
        Ok(handle)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn handle(&self, name: &str) -> Option<CellHandle> {
        self.index.get(name).map(|&i| CellHandle(i))
    }

    pub fn cell(&self, handle: CellHandle) -> Option<&AttributeCell> {
        self.cells.get(handle.0)
    }

    pub fn cell_by_name(&self, name: &str) -> TrackResult<&AttributeCell> {
        self.index
            .get(name)
            .map(|&i| &self.cells[i])
            .ok_or_else(|| TrackError::UnknownAttribute(name.to_string()))
    }

    fn cell_mut(&mut self, handle: CellHandle) -> TrackResult<&mut AttributeCell> {
        let name = &self.name;
        self.cells
            .get_mut(handle.0)
            .ok_or_else(|| TrackError::UnknownAttribute(format!("{}#{}", name, handle.0)))
    }

    /// Store a type-erased value into a cell
    pub fn set(&mut self, handle: CellHandle, value: AttributeValue) -> TrackResult<()> {
        self.cell_mut(handle)?.set(value)
    }

    pub fn set_by_name(&mut self, name: &str, value: AttributeValue) -> TrackResult<()> {
        let handle = self
            .handle(name)
            .ok_or_else(|| TrackError::UnknownAttribute(name.to_string()))?;
        self.set(handle, value)
    }

    pub fn set_typed<T: AttributeType>(&mut self, name: &str, value: T) -> TrackResult<()> {
        self.set_by_name(name, value.into_value())
    }

    pub fn get<T: AttributeType>(&self, name: &str) -> TrackResult<T> {
        self.cell_by_name(name)?.get::<T>()
    }

    pub fn value(&self, name: &str) -> TrackResult<&AttributeValue> {
        self.cell_by_name(name)?.value()
    }

    pub fn clear(&mut self, handle: CellHandle) -> TrackResult<()> {
        self.cell_mut(handle)?.clear();
        Ok(())
    }

    /// Snapshot of the registered names in insertion order
    pub fn handles(&self) -> Vec<(String, CellHandle)> {
        self.cells
            .iter()
            .enumerate()
            .map(|(i, cell)| (cell.name().to_string(), CellHandle(i)))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AttributeCell> {
        self.cells.iter()
    }

    // Update bookkeeping

    /// Mark the end of one update cycle
    pub fn touch(&mut self) {
        let now = Instant::now();
        self.last_update = Some(match self.last_update {
            Some(prev) if prev > now => prev,
            _ => now,
        });
        self.update_count += 1;
    }

    pub fn last_update(&self) -> Option<Instant> {
        self.last_update
    }

    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    /// Time since the last completed update, `None` before the first one
    pub fn age(&self) -> Option<Duration> {
        self.last_update.map(|t| t.elapsed())
    }

    /// A set that never received an update is stale
    pub fn is_stale(&self, threshold: Duration) -> bool {
        self.age().map_or(true, |age| age > threshold)
    }

    // Handler

    /// Replace the completion handler; `None` disables notification
    pub fn set_handler(&mut self, handler: Option<AttributeHandler>) {
        self.handler = handler;
    }

    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }

    /// Invoke the completion handler, if any
    pub fn notify(&mut self) {
        if let Some(mut handler) = self.handler.take() {
            handler(self);
            // the handler only sees `&self`, so nothing could have replaced it
            self.handler = Some(handler);
        }
    }

    /// Name of the stream this set is registered with.
    ///
    /// Only the name is recorded, not a handle on the stream: the stream
    /// holds sets weakly and a set never keeps its stream alive or calls back
    /// into it. Cleared when the set is unregistered or replaced.
    pub fn owning_stream(&self) -> Option<&str> {
        self.owning_stream.as_deref()
    }

    pub(crate) fn set_owning_stream(&mut self, stream: Option<String>) {
        self.owning_stream = stream;
    }
}

impl fmt::Debug for AttributeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeSet")
            .field("name", &self.name)
            .field("cells", &self.cells)
            .field("last_update", &self.last_update)
            .field("update_count", &self.update_count)
            .field("has_handler", &self.handler.is_some())
            .field("owning_stream", &self.owning_stream)
            .finish()
    }
}
