//! # Typed attribute storage
//!
//! - **TypeTag / AttributeValue**: the closed set of payload types
//! - **AttributeCell**: one named value whose type is fixed at registration
//! - **AttributeSet**: an ordered collection of cells for one data source,
//!   with its last-update time and completion handler

pub mod cell;
pub mod set;
pub mod value;

pub use cell::{AttributeCell, CellHandle};
pub use set::{AttributeHandler, AttributeSet, SharedAttributeSet};
pub use value::{
    AttributeType, AttributeValue, CChar, ImageBuffer, ImageGeometry, LongDouble, TypeTag,
};
