//! TRACKLINK Transform (TF) helpers
//!
//! Pose math shared by the tracking consumers:
//! - Locator frames from (position, quaternion) poses, with unit scaling and
//!   an optional registration matrix
//! - Needle tip placement and the orthonormal tube transform drawn at the tip
//!
//! # Example
//!
//! ```rust
//! use tracklink_library::tf::{build_frame, needle_transform};
//!
//! let frame = build_frame([0.01, 0.02, 0.03], [0.0, 0.0, 0.0, 1.0], 1000.0, None);
//! assert!((frame.position().x - 10.0).abs() < 1e-4);
//!
//! let placement = needle_transform(&frame, 100.0);
//! assert!((placement[(2, 3)] - (30.0 - 50.0)).abs() < 1e-4);
//! ```

mod needle;
mod pose_frame;

pub use needle::{needle_frame, needle_transform, tool_transform};
pub use pose_frame::{
    build_frame, fixed, normalize_or, quaternion_to_axes, unit_rotation, FrameError, LocatorFrame,
    DEGENERATE_EPSILON,
};
