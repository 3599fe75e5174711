//! Locator frames built from raw tracker poses
//!
//! A locator frame packs one tool pose into a 4x4 matrix:
//!
//! ```text
//! | px  nx  tx  px |
//! | py  ny  ty  py |
//! | pz  nz  tz  pz |
//! | 0   0   0   1  |
//! ```
//!
//! Column 0 is the position, column 1 the normal (tool long axis), column 2
//! the transverse normal. Column 3 mirrors the position so consumers that read
//! the conventional translation column see the same point.

use nalgebra::{Matrix4, Quaternion, UnitQuaternion, Vector3, Vector4};
use thiserror::Error;
use tracklink_core::TrackError;

/// Below this norm a quaternion or axis counts as zero
pub const DEGENERATE_EPSILON: f64 = 1e-12;

#[derive(Debug, Error, PartialEq)]
pub enum FrameError {
    #[error("'{field}' must have {expected} components, got {found}")]
    WrongLength {
        field: String,
        expected: usize,
        found: usize,
    },

    #[error("Zero-length orientation")]
    Degenerate,
}

impl From<FrameError> for TrackError {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::Degenerate => TrackError::DegenerateOrientation,
            other => TrackError::InvalidInput(other.to_string()),
        }
    }
}

/// Copy a float vector attribute into a fixed-size array
pub fn fixed<const N: usize>(field: &str, values: &[f32]) -> Result<[f32; N], FrameError> {
    values.try_into().map_err(|_| FrameError::WrongLength {
        field: field.to_string(),
        expected: N,
        found: values.len(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocatorFrame {
    matrix: Matrix4<f64>,
    degenerate: bool,
}

/// Origin with identity axes
impl Default for LocatorFrame {
    fn default() -> Self {
        Self::from_parts(Vector3::zeros(), Vector3::z(), Vector3::x())
    }
}

impl LocatorFrame {
    pub fn from_parts(
        position: Vector3<f64>,
        normal: Vector3<f64>,
        transnormal: Vector3<f64>,
    ) -> Self {
        let mut matrix = Matrix4::identity();
        matrix.set_column(0, &position.push(0.0));
        matrix.set_column(1, &normal.push(0.0));
        matrix.set_column(2, &transnormal.push(0.0));
        matrix.set_column(3, &position.push(1.0));
        Self {
            matrix,
            degenerate: false,
        }
    }

    pub fn matrix(&self) -> &Matrix4<f64> {
        &self.matrix
    }

    pub fn position(&self) -> Vector3<f64> {
        column3(&self.matrix, 0)
    }

    pub fn normal(&self) -> Vector3<f64> {
        column3(&self.matrix, 1)
    }

    pub fn transnormal(&self) -> Vector3<f64> {
        column3(&self.matrix, 2)
    }

    pub fn translation(&self) -> Vector3<f64> {
        column3(&self.matrix, 3)
    }

    /// Move the frame, keeping both position columns in step
    pub fn set_position(&mut self, position: Vector3<f64>) {
        self.matrix.set_column(0, &position.push(0.0));
        self.matrix.set_column(3, &position.push(1.0));
    }

    /// True when an axis fell back to its default because the input was zero
    pub fn is_degenerate(&self) -> bool {
        self.degenerate
    }
}

pub(crate) fn column3(m: &Matrix4<f64>, c: usize) -> Vector3<f64> {
    Vector3::new(m[(0, c)], m[(1, c)], m[(2, c)])
}

/// Normalize `v`, or return `fallback` (and `false`) when it has no direction
pub fn normalize_or(v: Vector3<f64>, fallback: Vector3<f64>) -> (Vector3<f64>, bool) {
    let norm = v.norm();
    if norm.is_finite() && norm > DEGENERATE_EPSILON {
        (v / norm, true)
    } else {
        (fallback, false)
    }
}

/// Unit rotation for an (x, y, z, w) quaternion, `None` when it is zero
pub fn unit_rotation(orientation: [f32; 4]) -> Option<UnitQuaternion<f64>> {
    let [x, y, z, w] = orientation.map(f64::from);
    let q = Quaternion::new(w, x, y, z);
    let norm = q.norm();
    if !norm.is_finite() || norm <= DEGENERATE_EPSILON {
        return None;
    }
    Some(UnitQuaternion::new_unchecked(q / norm))
}

/// Normal and transverse normal of the tool for an (x, y, z, w) quaternion.
///
/// These are the rotated z and x axes. A zero quaternion is reported as
/// [`FrameError::Degenerate`].
pub fn quaternion_to_axes(
    orientation: [f32; 4],
) -> Result<(Vector3<f64>, Vector3<f64>), FrameError> {
    let q = unit_rotation(orientation).ok_or(FrameError::Degenerate)?;
    let (x, y, z, w) = (q.i, q.j, q.k, q.w);

    let normal = Vector3::new(
        2.0 * x * z + 2.0 * y * w,
        2.0 * y * z - 2.0 * x * w,
        1.0 - 2.0 * x * x - 2.0 * y * y,
    );
    let transnormal = Vector3::new(
        1.0 - 2.0 * y * y - 2.0 * z * z,
        2.0 * x * y + 2.0 * z * w,
        2.0 * x * z - 2.0 * y * w,
    );
    Ok((normal, transnormal))
}

/// Build a locator frame from a raw pose.
///
/// The position is scaled by `unit_scale`. When a registration matrix is
/// given it is applied to the position as a point and to both axes as
/// directions, and the axes are normalized again. A zero orientation gives
/// the identity axes and a frame flagged degenerate.
pub fn build_frame(
    position: [f32; 3],
    orientation: [f32; 4],
    unit_scale: f64,
    registration: Option<&Matrix4<f64>>,
) -> LocatorFrame {
    let mut degenerate = false;
    let (mut normal, mut transnormal) = match quaternion_to_axes(orientation) {
        Ok(axes) => axes,
        Err(_) => {
            degenerate = true;
            (Vector3::z(), Vector3::x())
        }
    };
    let mut p = Vector3::from(position.map(f64::from)) * unit_scale;

    if let Some(reg) = registration {
        p = (reg * Vector4::new(p.x, p.y, p.z, 1.0)).xyz();
        normal = (reg * normal.push(0.0)).xyz();
        transnormal = (reg * transnormal.push(0.0)).xyz();
    }

    let (normal, ok_n) = normalize_or(normal, Vector3::z());
    let (transnormal, ok_t) = normalize_or(transnormal, Vector3::x());
    if !(ok_n && ok_t) {
        degenerate = true;
    }

    let mut frame = LocatorFrame::from_parts(p, normal, transnormal);
    frame.degenerate = degenerate;
    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_identity_quaternion_axes() {
        let (n, t) = quaternion_to_axes([0.0, 0.0, 0.0, 1.0]).unwrap();
        assert_relative_eq!(n, Vector3::z(), epsilon = 1e-12);
        assert_relative_eq!(t, Vector3::x(), epsilon = 1e-12);
    }

    #[test]
    fn test_unnormalized_quaternion_is_normalized() {
        let (n, t) = quaternion_to_axes([0.0, 0.0, 0.0, 4.0]).unwrap();
        assert_relative_eq!(n, Vector3::z(), epsilon = 1e-12);
        assert_relative_eq!(t, Vector3::x(), epsilon = 1e-12);
    }

    #[test]
    fn test_quarter_turn_about_z() {
        let h = std::f32::consts::FRAC_1_SQRT_2;
        let (n, t) = quaternion_to_axes([0.0, 0.0, h, h]).unwrap();
        assert_relative_eq!(n, Vector3::z(), epsilon = 1e-6);
        assert_relative_eq!(t, Vector3::y(), epsilon = 1e-6);
    }

    #[test]
    fn test_column_layout() {
        let frame = build_frame([0.1, 0.2, 0.3], [0.0, 0.0, 0.0, 1.0], 1000.0, None);
        let m = frame.matrix();
        assert_relative_eq!(frame.position(), Vector3::new(100.0, 200.0, 300.0), epsilon = 1e-4);
        assert_relative_eq!(frame.translation(), frame.position());
        assert_relative_eq!(frame.normal(), Vector3::z());
        assert_relative_eq!(frame.transnormal(), Vector3::x());
        assert_eq!(m.row(3).transpose(), Vector4::new(0.0, 0.0, 0.0, 1.0));
        assert!(!frame.is_degenerate());
    }

    #[test]
    fn test_zero_quaternion_falls_back() {
        let frame = build_frame([1.0, 2.0, 3.0], [0.0; 4], 1.0, None);
        assert!(frame.is_degenerate());
        assert_relative_eq!(frame.normal(), Vector3::z());
        assert_relative_eq!(frame.transnormal(), Vector3::x());
        assert!(frame.matrix().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_registration_moves_point_not_axes() {
        let reg = Matrix4::new_translation(&Vector3::new(10.0, 0.0, -5.0));
        let frame = build_frame([1.0, 1.0, 1.0], [0.0, 0.0, 0.0, 1.0], 1.0, Some(&reg));
        assert_relative_eq!(frame.position(), Vector3::new(11.0, 1.0, -4.0), epsilon = 1e-12);
        assert_relative_eq!(frame.normal(), Vector3::z());
        assert_relative_eq!(frame.transnormal(), Vector3::x());
    }

    #[test]
    fn test_registration_rotation_renormalizes() {
        let angle = std::f64::consts::FRAC_PI_2;
        let rot = nalgebra::Rotation3::from_axis_angle(&Vector3::x_axis(), angle);
        let reg = rot.to_homogeneous() * 2.0;
        let frame = build_frame([0.0, 0.0, 1.0], [0.0, 0.0, 0.0, 1.0], 1.0, Some(&reg));
        assert_relative_eq!(frame.normal(), -Vector3::y(), epsilon = 1e-12);
        assert_relative_eq!(frame.transnormal().norm(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_fixed_length_check() {
        assert_eq!(fixed::<3>("depth", &[1.0, 2.0, 3.0]).unwrap(), [1.0, 2.0, 3.0]);
        assert_eq!(
            fixed::<4>("orientation", &[1.0]),
            Err(FrameError::WrongLength {
                field: "orientation".to_string(),
                expected: 4,
                found: 1
            })
        );
    }
}
