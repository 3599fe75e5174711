//! Closed set of attribute payload types
//!
//! Every attribute cell stores exactly one [`AttributeValue`] variant, and the
//! variant's [`TypeTag`] is fixed when the cell is registered. Generic access
//! goes through [`AttributeType`], which maps a Rust type to its tag.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Payload type identifier for an attribute cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeTag {
    Bool,
    Char,
    SignedChar,
    UnsignedChar,
    Int,
    Long,
    Short,
    UnsignedInt,
    UnsignedLong,
    UnsignedShort,
    Double,
    LongDouble,
    Float,
    String,
    FloatVector,
    ImageBuffer,
}

impl TypeTag {
    /// All tags, in declaration order
    pub const ALL: [TypeTag; 16] = [
        TypeTag::Bool,
        TypeTag::Char,
        TypeTag::SignedChar,
        TypeTag::UnsignedChar,
        TypeTag::Int,
        TypeTag::Long,
        TypeTag::Short,
        TypeTag::UnsignedInt,
        TypeTag::UnsignedLong,
        TypeTag::UnsignedShort,
        TypeTag::Double,
        TypeTag::LongDouble,
        TypeTag::Float,
        TypeTag::String,
        TypeTag::FloatVector,
        TypeTag::ImageBuffer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Char => "char",
            Self::SignedChar => "signed char",
            Self::UnsignedChar => "unsigned char",
            Self::Int => "int",
            Self::Long => "long",
            Self::Short => "short",
            Self::UnsignedInt => "unsigned int",
            Self::UnsignedLong => "unsigned long",
            Self::UnsignedShort => "unsigned short",
            Self::Double => "double",
            Self::LongDouble => "long double",
            Self::Float => "float",
            Self::String => "string",
            Self::FloatVector => "float vector",
            Self::ImageBuffer => "image",
        }
    }

    /// Zero value for the tag, `None` for [`TypeTag::ImageBuffer`]
    pub fn zero_value(&self) -> Option<AttributeValue> {
        let value = match self {
            Self::Bool => AttributeValue::Bool(false),
            Self::Char => AttributeValue::Char(0),
            Self::SignedChar => AttributeValue::SignedChar(0),
            Self::UnsignedChar => AttributeValue::UnsignedChar(0),
            Self::Int => AttributeValue::Int(0),
            Self::Long => AttributeValue::Long(0),
            Self::Short => AttributeValue::Short(0),
            Self::UnsignedInt => AttributeValue::UnsignedInt(0),
            Self::UnsignedLong => AttributeValue::UnsignedLong(0),
            Self::UnsignedShort => AttributeValue::UnsignedShort(0),
            Self::Double => AttributeValue::Double(0.0),
            Self::LongDouble => AttributeValue::LongDouble(0.0),
            Self::Float => AttributeValue::Float(0.0),
            Self::String => AttributeValue::String(Vec::new()),
            Self::FloatVector => AttributeValue::FloatVector(Vec::new()),
            Self::ImageBuffer => return None,
        };
        Some(value)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Voxel grid layout of an image payload
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageGeometry {
    pub dimensions: [usize; 3],
    pub spacing: [f64; 3],
}

impl ImageGeometry {
    pub fn new(dimensions: [usize; 3], spacing: [f64; 3]) -> Self {
        Self {
            dimensions,
            spacing,
        }
    }

    pub fn voxel_count(&self) -> usize {
        self.dimensions.iter().product()
    }
}

impl Default for ImageGeometry {
    /// 256x256x1 with unit spacing, the layout assumed for raw scanner frames
    fn default() -> Self {
        Self {
            dimensions: [256, 256, 1],
            spacing: [1.0, 1.0, 1.0],
        }
    }
}

/// An image frame with exclusively owned voxel data
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBuffer {
    geometry: ImageGeometry,
    bytes_per_voxel: usize,
    data: Vec<u8>,
}

impl ImageBuffer {
    /// Wrap raw voxel bytes in the given geometry.
    ///
    /// The byte count must be a non-zero multiple of the voxel count.
    pub fn from_raw(geometry: ImageGeometry, data: Vec<u8>) -> crate::error::TrackResult<Self> {
        let voxels = geometry.voxel_count();
        if voxels == 0 || data.is_empty() || data.len() % voxels != 0 {
            return Err(crate::error::TrackError::ImageGeometry {
                len: data.len(),
                dimensions: geometry.dimensions,
            });
        }
        Ok(Self {
            geometry,
            bytes_per_voxel: data.len() / voxels,
            data,
        })
    }

    pub fn geometry(&self) -> &ImageGeometry {
        &self.geometry
    }

    pub fn dimensions(&self) -> [usize; 3] {
        self.geometry.dimensions
    }

    pub fn spacing(&self) -> [f64; 3] {
        self.geometry.spacing
    }

    pub fn bytes_per_voxel(&self) -> usize {
        self.bytes_per_voxel
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// `char` payload, kept apart from `signed char` so the tag can be inferred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CChar(pub i8);

/// `long double` payload; stored at `f64` precision
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LongDouble(pub f64);

/// Tagged attribute payload
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Bool(bool),
    Char(i8),
    SignedChar(i8),
    UnsignedChar(u8),
    Int(i32),
    Long(i64),
    Short(i16),
    UnsignedInt(u32),
    UnsignedLong(u64),
    UnsignedShort(u16),
    Double(f64),
    LongDouble(f64),
    Float(f32),
    /// Opaque byte sequence; encoding is left to the producer
    String(Vec<u8>),
    FloatVector(Vec<f32>),
    ImageBuffer(ImageBuffer),
}

impl AttributeValue {
    pub fn tag(&self) -> TypeTag {
        match self {
            Self::Bool(_) => TypeTag::Bool,
            Self::Char(_) => TypeTag::Char,
            Self::SignedChar(_) => TypeTag::SignedChar,
            Self::UnsignedChar(_) => TypeTag::UnsignedChar,
            Self::Int(_) => TypeTag::Int,
            Self::Long(_) => TypeTag::Long,
            Self::Short(_) => TypeTag::Short,
            Self::UnsignedInt(_) => TypeTag::UnsignedInt,
            Self::UnsignedLong(_) => TypeTag::UnsignedLong,
            Self::UnsignedShort(_) => TypeTag::UnsignedShort,
            Self::Double(_) => TypeTag::Double,
            Self::LongDouble(_) => TypeTag::LongDouble,
            Self::Float(_) => TypeTag::Float,
            Self::String(_) => TypeTag::String,
            Self::FloatVector(_) => TypeTag::FloatVector,
            Self::ImageBuffer(_) => TypeTag::ImageBuffer,
        }
    }

    /// Build a string payload from UTF-8 text
    pub fn text(s: &str) -> Self {
        Self::String(s.as_bytes().to_vec())
    }

    /// Lossy UTF-8 view of a string payload
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::String(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
            _ => None,
        }
    }

    pub fn as_image(&self) -> Option<&ImageBuffer> {
        match self {
            Self::ImageBuffer(img) => Some(img),
            _ => None,
        }
    }

    /// Short description for log lines; images and long vectors are summarized
    pub fn log_summary(&self) -> String {
        match self {
            Self::String(bytes) => format!("\"{}\"", String::from_utf8_lossy(bytes)),
            Self::FloatVector(v) if v.len() > 8 => format!("[{} floats]", v.len()),
            Self::FloatVector(v) => format!("{:?}", v),
            Self::ImageBuffer(img) => {
                let [x, y, z] = img.dimensions();
                format!("image {}x{}x{} ({} bytes)", x, y, z, img.data().len())
            }
            other => format!("{:?}", other),
        }
    }
}

/// Rust types that map onto exactly one [`TypeTag`]
pub trait AttributeType: Sized {
    const TAG: TypeTag;

    fn into_value(self) -> AttributeValue;

    fn from_value(value: &AttributeValue) -> Option<Self>;
}

macro_rules! impl_attribute_type {
    ($ty:ty, $variant:ident) => {
        impl AttributeType for $ty {
            const TAG: TypeTag = TypeTag::$variant;

            fn into_value(self) -> AttributeValue {
                AttributeValue::$variant(self)
            }

            fn from_value(value: &AttributeValue) -> Option<Self> {
                match value {
                    AttributeValue::$variant(v) => Some(v.clone()),
                    _ => None,
                }
            }
        }
    };
}

impl_attribute_type!(bool, Bool);
impl_attribute_type!(i8, SignedChar);
impl_attribute_type!(u8, UnsignedChar);
impl_attribute_type!(i32, Int);
impl_attribute_type!(i64, Long);
impl_attribute_type!(i16, Short);
impl_attribute_type!(u32, UnsignedInt);
impl_attribute_type!(u64, UnsignedLong);
impl_attribute_type!(u16, UnsignedShort);
impl_attribute_type!(f64, Double);
impl_attribute_type!(f32, Float);
impl_attribute_type!(Vec<f32>, FloatVector);
impl_attribute_type!(ImageBuffer, ImageBuffer);

impl AttributeType for CChar {
    const TAG: TypeTag = TypeTag::Char;

    fn into_value(self) -> AttributeValue {
        AttributeValue::Char(self.0)
    }

    fn from_value(value: &AttributeValue) -> Option<Self> {
        match value {
            AttributeValue::Char(c) => Some(CChar(*c)),
            _ => None,
        }
    }
}

impl AttributeType for LongDouble {
    const TAG: TypeTag = TypeTag::LongDouble;

    fn into_value(self) -> AttributeValue {
        AttributeValue::LongDouble(self.0)
    }

    fn from_value(value: &AttributeValue) -> Option<Self> {
        match value {
            AttributeValue::LongDouble(v) => Some(LongDouble(*v)),
            _ => None,
        }
    }
}

// Strings are handed out as text; raw bytes go through `Vec<u8>`
impl AttributeType for String {
    const TAG: TypeTag = TypeTag::String;

    fn into_value(self) -> AttributeValue {
        AttributeValue::String(self.into_bytes())
    }

    fn from_value(value: &AttributeValue) -> Option<Self> {
        value.as_text()
    }
}

impl AttributeType for Vec<u8> {
    const TAG: TypeTag = TypeTag::String;

    fn into_value(self) -> AttributeValue {
        AttributeValue::String(self)
    }

    fn from_value(value: &AttributeValue) -> Option<Self> {
        match value {
            AttributeValue::String(bytes) => Some(bytes.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_values_match_their_tag() {
        for tag in TypeTag::ALL {
            match tag.zero_value() {
                Some(v) => assert_eq!(v.tag(), tag),
                None => assert_eq!(tag, TypeTag::ImageBuffer),
            }
        }
    }

    #[test]
    fn test_newtypes_select_distinct_tags() {
        assert_eq!(CChar(3).into_value().tag(), TypeTag::Char);
        assert_eq!(3i8.into_value().tag(), TypeTag::SignedChar);
        assert_eq!(LongDouble(1.5).into_value().tag(), TypeTag::LongDouble);
        assert_eq!(1.5f64.into_value().tag(), TypeTag::Double);
    }

    #[test]
    fn test_image_from_raw_checks_geometry() {
        let geometry = ImageGeometry::new([4, 4, 1], [1.0, 1.0, 1.0]);
        let img = ImageBuffer::from_raw(geometry, vec![0u8; 32]).unwrap();
        assert_eq!(img.bytes_per_voxel(), 2);

        let err = ImageBuffer::from_raw(geometry, vec![0u8; 17]).unwrap_err();
        assert!(matches!(err, crate::error::TrackError::ImageGeometry { len: 17, .. }));
    }

    #[test]
    fn test_log_summary_shortens_bulk_payloads() {
        let geometry = ImageGeometry::new([2, 2, 1], [1.0; 3]);
        let image = ImageBuffer::from_raw(geometry, vec![0u8; 4]).unwrap();
        assert_eq!(
            AttributeValue::ImageBuffer(image).log_summary(),
            "image 2x2x1 (4 bytes)"
        );
        assert_eq!(
            AttributeValue::FloatVector(vec![0.0; 16]).log_summary(),
            "[16 floats]"
        );
        assert_eq!(AttributeValue::text("READY").log_summary(), "\"READY\"");
        assert_eq!(AttributeValue::Int(5).log_summary(), "Int(5)");
    }

    #[test]
    fn test_string_payload_is_opaque_bytes() {
        let raw = AttributeValue::String(vec![0xff, b'o', b'k']);
        assert_eq!(raw.tag(), TypeTag::String);
        assert_eq!(Vec::<u8>::from_value(&raw), Some(vec![0xff, b'o', b'k']));
        assert!(String::from_value(&raw).unwrap().ends_with("ok"));
    }
}
