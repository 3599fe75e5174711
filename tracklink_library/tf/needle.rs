//! Needle geometry on top of locator frames

use super::pose_frame::{build_frame, normalize_or, unit_rotation, LocatorFrame};
use nalgebra::{Matrix3, Matrix4, Vector3};

/// Locator frame whose position is moved to the needle tip.
///
/// `depth` is rotated by the pose orientation and added to the scaled
/// position. A zero orientation leaves the offset unrotated.
pub fn needle_frame(
    position: [f32; 3],
    orientation: [f32; 4],
    depth: [f32; 3],
    unit_scale: f64,
    registration: Option<&Matrix4<f64>>,
) -> LocatorFrame {
    let mut frame = build_frame(position, orientation, unit_scale, registration);
    let depth = Vector3::from(depth.map(f64::from));
    let offset = match unit_rotation(orientation) {
        Some(rotation) => rotation * depth,
        None => depth,
    };
    let tip = frame.translation() + offset;
    frame.set_position(tip);
    frame
}

/// Rigid transform of a tool: rotation columns (transverse, cross, normal)
/// and the frame's translation.
///
/// The axes are orthogonalized again with two cross products, so small
/// drift in the stored frame does not shear the result. When the transverse
/// axis is missing or parallel to the normal, one perpendicular to the normal
/// is chosen instead.
pub fn tool_transform(frame: &LocatorFrame) -> Matrix4<f64> {
    let (n, _) = normalize_or(frame.normal(), Vector3::z());
    let (c, has_cross) = normalize_or(n.cross(&frame.transnormal()), Vector3::y());
    let c = if has_cross { c } else { perpendicular(&n) };
    // n and c are orthonormal, so t is unit length
    let t = c.cross(&n);

    let rotation = Matrix3::from_columns(&[t, c, n]).to_homogeneous();
    Matrix4::new_translation(&frame.translation()) * rotation
}

// Unit vector perpendicular to unit `n`, using the world axis least aligned with it
fn perpendicular(n: &Vector3<f64>) -> Vector3<f64> {
    let helper = if n.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    n.cross(&helper).normalize()
}

/// Placement of a tube of `tube_length` centered behind the needle tip,
/// extending back along the needle axis.
pub fn needle_transform(frame: &LocatorFrame, tube_length: f64) -> Matrix4<f64> {
    tool_transform(frame) * Matrix4::new_translation(&Vector3::new(0.0, 0.0, -tube_length / 2.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const IDENTITY: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

    #[test]
    fn test_depth_along_identity() {
        let frame = needle_frame([0.0; 3], IDENTITY, [0.0, 0.0, 5.0], 1.0, None);
        assert_relative_eq!(frame.translation(), Vector3::new(0.0, 0.0, 5.0));
        assert_relative_eq!(frame.position(), Vector3::new(0.0, 0.0, 5.0));
    }

    #[test]
    fn test_depth_is_rotated() {
        // half turn about x flips z
        let frame = needle_frame([1.0, 0.0, 0.0], [1.0, 0.0, 0.0, 0.0], [0.0, 0.0, 5.0], 1.0, None);
        assert_relative_eq!(frame.translation(), Vector3::new(1.0, 0.0, -5.0), epsilon = 1e-9);
    }

    #[test]
    fn test_tube_centered_behind_tip() {
        let frame = needle_frame([0.0; 3], IDENTITY, [0.0, 0.0, 5.0], 1.0, None);
        let m = needle_transform(&frame, 100.0);
        let r = m.fixed_view::<3, 3>(0, 0).into_owned();
        assert_relative_eq!(r, Matrix3::identity(), epsilon = 1e-12);
        assert_relative_eq!(m[(2, 3)], -45.0, epsilon = 1e-12);
    }

    #[test]
    fn test_unpopulated_frame_is_identity() {
        let m = needle_transform(&LocatorFrame::default(), 0.0);
        assert_relative_eq!(m, Matrix4::identity());
    }

    fn assert_rigid(m: &Matrix4<f64>) {
        let r = m.fixed_view::<3, 3>(0, 0).into_owned();
        assert_relative_eq!(r.transpose() * r, Matrix3::identity(), epsilon = 1e-12);
        assert_relative_eq!(r.determinant(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_parallel_axes_still_give_rotation() {
        for axis in [Vector3::x(), Vector3::y(), Vector3::z(), -Vector3::x()] {
            let frame = LocatorFrame::from_parts(Vector3::zeros(), axis, axis);
            let m = tool_transform(&frame);
            assert_rigid(&m);
            // normal column is kept
            assert_relative_eq!(m[(0, 2)], axis.x, epsilon = 1e-12);
            assert_relative_eq!(m[(1, 2)], axis.y, epsilon = 1e-12);
            assert_relative_eq!(m[(2, 2)], axis.z, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_zero_transverse_axis_gives_rotation() {
        let frame = LocatorFrame::from_parts(
            Vector3::new(1.0, 2.0, 3.0),
            Vector3::new(0.0, 0.6, 0.8),
            Vector3::zeros(),
        );
        assert_rigid(&tool_transform(&frame));
    }

    #[test]
    fn test_drifted_axes_are_orthonormalized() {
        let mut frame = LocatorFrame::from_parts(
            Vector3::zeros(),
            Vector3::new(0.0, 0.05, 1.0),
            Vector3::new(1.0, 0.0, 0.1),
        );
        frame.set_position(Vector3::new(3.0, 4.0, 5.0));
        let m = tool_transform(&frame);
        let r = m.fixed_view::<3, 3>(0, 0).into_owned();
        assert_relative_eq!(r.transpose() * r, Matrix3::identity(), epsilon = 1e-12);
        assert_relative_eq!(r.determinant(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(m[(0, 3)], 3.0);
    }
}
