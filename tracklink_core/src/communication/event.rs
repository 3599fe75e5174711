use super::traits::{InboundEvent, OutboundEvent};
use crate::attributes::{AttributeValue, TypeTag};
use crate::error::{TrackError, TrackResult};

/// One field of a [`MessageEvent`]
#[derive(Debug, Clone, PartialEq)]
pub enum EventField {
    Value(AttributeValue),
    /// Image bytes as delivered by the scanner, without geometry
    RawImage(Vec<u8>),
}

/// In-memory event used in both directions.
///
/// Fields keep their insertion order; setting an existing name replaces it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MessageEvent {
    name: String,
    fields: Vec<(String, EventField)>,
}

impl MessageEvent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn with_field(mut self, name: &str, value: AttributeValue) -> Self {
        self.insert(name, EventField::Value(value));
        self
    }

    pub fn with_raw_image(mut self, name: &str, bytes: Vec<u8>) -> Self {
        self.insert(name, EventField::RawImage(bytes));
        self
    }

    fn insert(&mut self, name: &str, field: EventField) {
        match self.fields.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = field,
            None => self.fields.push((name.to_string(), field)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&EventField> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, f)| f)
    }

    /// Plain value of a field, `None` for raw images and missing fields
    pub fn value(&self, name: &str) -> Option<&AttributeValue> {
        match self.get(name)? {
            EventField::Value(v) => Some(v),
            EventField::RawImage(_) => None,
        }
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl InboundEvent for MessageEvent {
    fn callback_name(&self) -> &str {
        &self.name
    }

    fn has_field(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    fn field(&self, name: &str, tag: TypeTag) -> TrackResult<AttributeValue> {
        match self.get(name) {
            Some(EventField::Value(v)) if v.tag() == tag => Ok(v.clone()),
            Some(EventField::Value(v)) => Err(TrackError::TypeMismatch {
                name: name.to_string(),
                expected: tag,
                found: v.tag(),
            }),
            Some(EventField::RawImage(_)) => Err(TrackError::TypeMismatch {
                name: name.to_string(),
                expected: tag,
                found: TypeTag::ImageBuffer,
            }),
            None => Err(TrackError::UnknownAttribute(name.to_string())),
        }
    }

    fn raw_image(&self, name: &str) -> TrackResult<Vec<u8>> {
        match self.get(name) {
            Some(EventField::RawImage(bytes)) => Ok(bytes.clone()),
            // an already materialized image still yields its voxels
            Some(EventField::Value(AttributeValue::ImageBuffer(img))) => Ok(img.data().to_vec()),
            Some(EventField::Value(v)) => Err(TrackError::TypeMismatch {
                name: name.to_string(),
                expected: TypeTag::ImageBuffer,
                found: v.tag(),
            }),
            None => Err(TrackError::UnknownAttribute(name.to_string())),
        }
    }
}

impl OutboundEvent for MessageEvent {
    fn set_field(&mut self, name: &str, value: AttributeValue) {
        self.insert(name, EventField::Value(value));
    }
}
