//! Error types for TRACKLINK

use crate::attributes::TypeTag;
use thiserror::Error;

/// Errors raised by attribute storage, dispatch and device handling
#[derive(Debug, Error)]
pub enum TrackError {
    #[error("Attribute '{0}' is already registered")]
    DuplicateName(String),

    #[error("Type mismatch on '{name}': cell holds {expected}, got {found}")]
    TypeMismatch {
        name: String,
        expected: TypeTag,
        found: TypeTag,
    },

    #[error("Attribute '{0}' has not received a value yet")]
    ValueUnset(String),

    #[error("Attribute '{0}' not found")]
    UnknownAttribute(String),

    #[error("No attribute set registered for callback '{0}'")]
    UnknownCallbackName(String),

    #[error("Device communication error: {0}")]
    DeviceComm(String),

    #[error("Orientation vector has zero length")]
    DegenerateOrientation,

    #[error("Image payload of {len} bytes does not fit {dimensions:?} voxels")]
    ImageGeometry { len: usize, dimensions: [usize; 3] },

    #[error("No outbound sink attached to stream '{0}'")]
    NoSink(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),
}

impl TrackError {
    /// Shorthand for device failures reported by collaborators
    pub fn device(msg: impl Into<String>) -> Self {
        TrackError::DeviceComm(msg.into())
    }
}

impl From<toml::ser::Error> for TrackError {
    fn from(err: toml::ser::Error) -> Self {
        TrackError::Config(err.to_string())
    }
}

/// Result type for TRACKLINK operations
pub type TrackResult<T> = Result<T, TrackError>;
