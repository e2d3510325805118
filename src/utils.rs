//! Orientation helpers shared by the camera, the player and the physics registry.
//!
//! Rotations are `(pitch, yaw)` pairs in radians. Yaw 0 looks down +Z,
//! positive yaw turns towards +X.

use glam::{Vec2, Vec3};

/// Forward unit vector for a `(pitch, yaw)` orientation.
pub fn forward(rotation: Vec2) -> Vec3 {
    let (sin_pitch, cos_pitch) = rotation.x.sin_cos();
    let (sin_yaw, cos_yaw) = rotation.y.sin_cos();
    Vec3::new(cos_pitch * sin_yaw, sin_pitch, cos_pitch * cos_yaw)
}

/// Right unit vector. Independent of pitch, always horizontal.
pub fn right(rotation: Vec2) -> Vec3 {
    let (sin_yaw, cos_yaw) = rotation.y.sin_cos();
    Vec3::new(cos_yaw, 0.0, -sin_yaw)
}

/// Up unit vector, completing the forward/right frame.
pub fn up(rotation: Vec2) -> Vec3 {
    forward(rotation).cross(right(rotation))
}

/// Converts a camera-local vector (x = right, y = up, z = forward) to world space.
pub fn camera_relative(rotation: Vec2, local: Vec3) -> Vec3 {
    right(rotation) * local.x + up(rotation) * local.y + forward(rotation) * local.z
}

/// Like [`camera_relative`] but flattened to the ground plane: pitch never
/// tilts walking direction and the local y component is dropped.
pub fn camera_relative_horizontal(rotation: Vec2, local: Vec3) -> Vec3 {
    let forward = forward(rotation);
    let forward_flat = Vec3::new(forward.x, 0.0, forward.z).normalize_or_zero();
    let right_flat = right(rotation);
    right_flat * local.x + forward_flat * local.z
}

/// Horizontal (x, z) magnitude of a vector.
pub fn horizontal_length(v: Vec3) -> f32 {
    Vec2::new(v.x, v.z).length()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn identity_orientation_frame() {
        let r = Vec2::ZERO;
        assert_abs_diff_eq!(forward(r), Vec3::Z, epsilon = 1e-6);
        assert_abs_diff_eq!(right(r), Vec3::X, epsilon = 1e-6);
        assert_abs_diff_eq!(up(r), Vec3::Y, epsilon = 1e-6);
    }

    #[test]
    fn frame_is_orthonormal() {
        for &(pitch, yaw) in &[(0.3, 1.2), (-1.0, -2.5), (1.4, 0.1), (0.0, 3.0)] {
            let r = Vec2::new(pitch, yaw);
            let (f, rt, u) = (forward(r), right(r), up(r));
            assert_abs_diff_eq!(f.length(), 1.0, epsilon = 1e-5);
            assert_abs_diff_eq!(rt.length(), 1.0, epsilon = 1e-5);
            assert_abs_diff_eq!(u.length(), 1.0, epsilon = 1e-5);
            assert_abs_diff_eq!(f.dot(rt), 0.0, epsilon = 1e-5);
            assert_abs_diff_eq!(f.dot(u), 0.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn quarter_turn_yaw_maps_forward_to_x() {
        let r = Vec2::new(0.0, FRAC_PI_2);
        let world = camera_relative(r, Vec3::Z);
        assert_abs_diff_eq!(world, Vec3::X, epsilon = 1e-6);
        assert_abs_diff_eq!(right(r), -Vec3::Z, epsilon = 1e-6);
    }

    #[test]
    fn horizontal_transform_ignores_pitch() {
        let looking_down = Vec2::new(-1.2, 0.0);
        let world = camera_relative_horizontal(looking_down, Vec3::new(0.0, 1.0, 1.0));
        assert_abs_diff_eq!(world, Vec3::Z, epsilon = 1e-6);
        assert_abs_diff_eq!(horizontal_length(Vec3::new(3.0, 9.0, 4.0)), 5.0);
    }
}
