use super::value::{AttributeType, AttributeValue, TypeTag};
use crate::error::{TrackError, TrackResult};

/// Index of a cell inside its owning [`AttributeSet`](super::AttributeSet)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellHandle(pub(crate) usize);

impl CellHandle {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A named value holder whose payload type never changes
#[derive(Debug, Clone)]
pub struct AttributeCell {
    name: String,
    tag: TypeTag,
    value: Option<AttributeValue>,
}

impl AttributeCell {
    /// Create a cell; without an initial value it starts at the tag's zero
    /// (images start unset).
    pub fn new(
        name: impl Into<String>,
        tag: TypeTag,
        initial: Option<AttributeValue>,
    ) -> TrackResult<Self> {
        let name = name.into();
        if let Some(value) = &initial {
            check_tag(&name, tag, value.tag())?;
        }
        Ok(Self {
            value: initial.or_else(|| tag.zero_value()),
            name,
            tag,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self) -> TypeTag {
        self.tag
    }

    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }

    /// Store a value; the payload must carry the cell's tag
    pub fn set(&mut self, value: AttributeValue) -> TrackResult<()> {
        check_tag(&self.name, self.tag, value.tag())?;
        self.value = Some(value);
        Ok(())
    }

    pub fn set_typed<T: AttributeType>(&mut self, value: T) -> TrackResult<()> {
        self.set(value.into_value())
    }

    /// Type-erased read
    pub fn value(&self) -> TrackResult<&AttributeValue> {
        self.value
            .as_ref()
            .ok_or_else(|| TrackError::ValueUnset(self.name.clone()))
    }

    /// Type-checked read
    pub fn get<T: AttributeType>(&self) -> TrackResult<T> {
        check_tag(&self.name, self.tag, T::TAG)?;
        let value = self.value()?;
        T::from_value(value).ok_or(TrackError::TypeMismatch {
            name: self.name.clone(),
            expected: self.tag,
            found: T::TAG,
        })
    }

    /// Release an image or reset a scalar to its zero value
    pub fn clear(&mut self) {
        self.value = self.tag.zero_value();
    }
}

fn check_tag(name: &str, expected: TypeTag, found: TypeTag) -> TrackResult<()> {
    if expected == found {
        Ok(())
    } else {
        Err(TrackError::TypeMismatch {
            name: name.to_string(),
            expected,
            found,
        })
    }
}
