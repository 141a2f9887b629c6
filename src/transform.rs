//! Entity placement: location, Euler rotation in degrees, and scale.
//!
//! The model matrix is always composed as `T * Rx * Ry * Rz * S`, and
//! [`Transform::decompose`] inverts exactly that composition. The gizmo edits a
//! matrix directly, so every manipulated frame goes matrix -> fields -> matrix.
//!
//! # Example
//!
//! ```
//! use vantage::{Transform, Vec3};
//!
//! let transform = Transform::new()
//!     .location(Vec3::new(1.0, 2.0, 3.0))
//!     .rotation(Vec3::new(30.0, -45.0, 10.0))
//!     .scale(Vec3::new(2.0, 1.0, 0.5));
//!
//! let back = Transform::decompose(&transform.model_matrix()).unwrap();
//! assert!((back.rotation - transform.rotation).length() < 1e-3);
//! ```

use glam::{Mat4, Vec3};

/// Smallest scale magnitude a decomposed transform will carry.
pub const MIN_SCALE: f32 = 1e-4;

/// Within this of `|sin(pitch)| == 1` the X and Z axes coincide and Z is pinned to zero.
const GIMBAL_EPSILON: f32 = 1e-6;

/// Per-entity placement component.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    /// World-space translation.
    pub location: Vec3,
    /// Euler angles in degrees, applied X then Y then Z.
    pub rotation: Vec3,
    /// Per-axis scale.
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            location: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_location(location: Vec3) -> Self {
        Self {
            location,
            ..Default::default()
        }
    }

    pub fn location(mut self, location: Vec3) -> Self {
        self.location = location;
        self
    }

    pub fn rotation(mut self, degrees: Vec3) -> Self {
        self.rotation = degrees;
        self
    }

    pub fn scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    pub fn uniform_scale(mut self, scale: f32) -> Self {
        self.scale = Vec3::splat(scale);
        self
    }

    /// Rotation part of the model matrix.
    pub fn rotation_matrix(&self) -> Mat4 {
        let radians = self.rotation * (std::f32::consts::PI / 180.0);
        Mat4::from_rotation_x(radians.x)
            * Mat4::from_rotation_y(radians.y)
            * Mat4::from_rotation_z(radians.z)
    }

    /// `Translate(location) * Rotate(rotation) * Scale(scale)`.
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_translation(self.location)
            * self.rotation_matrix()
            * Mat4::from_scale(self.scale)
    }

    /// Recover location, rotation and scale from an affine matrix without shear.
    ///
    /// The pitch (Y angle) comes back in `[-90, 90]`; other angle triples that
    /// describe the same rotation are folded into that range. Scale magnitudes
    /// are clamped to [`MIN_SCALE`], and an axis that collapsed to zero gets its
    /// direction rebuilt from the other two. Returns `None` for non-finite input.
    pub fn decompose(matrix: &Mat4) -> Option<Transform> {
        if !matrix.is_finite() {
            return None;
        }

        let location = matrix.w_axis.truncate();
        let mut axes = [
            matrix.x_axis.truncate(),
            matrix.y_axis.truncate(),
            matrix.z_axis.truncate(),
        ];
        let mut scale = Vec3::new(axes[0].length(), axes[1].length(), axes[2].length());

        let collapsed: Vec<usize> = (0..3).filter(|&i| scale[i] < MIN_SCALE).collect();
        match collapsed.as_slice() {
            [] => {
                for axis in &mut axes {
                    *axis = axis.normalize();
                }
                // A mirrored basis is carried as a negative X scale.
                if axes[0].cross(axes[1]).dot(axes[2]) < 0.0 {
                    scale.x = -scale.x;
                    axes[0] = -axes[0];
                }
            }
            [missing] => {
                let (a, b) = ((missing + 1) % 3, (missing + 2) % 3);
                axes[a] = axes[a].normalize();
                axes[b] = axes[b].normalize();
                axes[*missing] = axes[a].cross(axes[b]).normalize_or(Vec3::Z);
            }
            _ => axes = [Vec3::X, Vec3::Y, Vec3::Z],
        }

        let scale = Vec3::new(
            clamp_magnitude(scale.x),
            clamp_magnitude(scale.y),
            clamp_magnitude(scale.z),
        );

        // r{row}{col} of the pure rotation R = Rx * Ry * Rz.
        let r00 = axes[0].x;
        let r01 = axes[1].x;
        let r11 = axes[1].y;
        let r21 = axes[1].z;
        let r02 = axes[2].x;
        let r12 = axes[2].y;
        let r22 = axes[2].z;

        let pitch = r02.clamp(-1.0, 1.0).asin();
        let (roll_x, yaw_z) = if r02.abs() < 1.0 - GIMBAL_EPSILON {
            ((-r12).atan2(r22), (-r01).atan2(r00))
        } else {
            (r21.atan2(r11), 0.0)
        };

        let rotation = Vec3::new(roll_x, pitch, yaw_z) * (180.0 / std::f32::consts::PI);

        Some(Transform {
            location,
            rotation,
            scale,
        })
    }

    /// Overwrite this transform from a matrix, keeping the old values when the
    /// matrix is not usable. Returns whether anything was written.
    pub fn set_from_matrix(&mut self, matrix: &Mat4) -> bool {
        match Self::decompose(matrix) {
            Some(decomposed) => {
                *self = decomposed;
                true
            }
            None => {
                log::debug!("ignoring non-finite transform matrix");
                false
            }
        }
    }
}

fn clamp_magnitude(value: f32) -> f32 {
    if value.abs() < MIN_SCALE {
        MIN_SCALE.copysign(value)
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_vec_close(a: Vec3, b: Vec3, tolerance: f32) {
        assert!(
            (a - b).abs().max_element() < tolerance,
            "expected {b:?}, got {a:?}"
        );
    }

    #[test]
    fn identity_matrix() {
        assert_eq!(Transform::new().model_matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn composition_order_is_translate_rotate_scale() {
        let transform = Transform::new()
            .location(Vec3::new(5.0, 0.0, 0.0))
            .rotation(Vec3::new(0.0, 0.0, 90.0))
            .scale(Vec3::new(2.0, 1.0, 1.0));

        // +X is scaled to 2, rotated onto +Y, then moved by 5 on X.
        let p = transform.model_matrix().transform_point3(Vec3::X);
        assert_vec_close(p, Vec3::new(5.0, 2.0, 0.0), 1e-5);
    }

    #[test]
    fn rotation_applies_x_then_y_then_z() {
        let transform = Transform::new().rotation(Vec3::new(90.0, 90.0, 0.0));
        let expected = Mat4::from_rotation_x(std::f32::consts::FRAC_PI_2)
            * Mat4::from_rotation_y(std::f32::consts::FRAC_PI_2);
        assert!(transform.model_matrix().abs_diff_eq(expected, 1e-6));
    }

    #[test]
    fn decompose_round_trips_canonical_angles() {
        let locations = [Vec3::ZERO, Vec3::new(-3.0, 7.5, 12.25)];
        let rotations = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(30.0, -45.0, 10.0),
            Vec3::new(-170.0, 80.0, 179.0),
            Vec3::new(135.0, -12.0, -90.0),
        ];
        let scales = [Vec3::ONE, Vec3::new(2.0, 0.5, 3.0), Vec3::splat(0.01)];

        for location in locations {
            for rotation in rotations {
                for scale in scales {
                    let original = Transform { location, rotation, scale };
                    let back = Transform::decompose(&original.model_matrix()).unwrap();
                    assert_vec_close(back.location, location, 1e-4);
                    assert_vec_close(back.rotation, rotation, 1e-2);
                    assert_vec_close(back.scale, scale, 1e-4);
                }
            }
        }
    }

    #[test]
    fn decompose_out_of_range_pitch_gives_equivalent_matrix() {
        let original = Transform::new().rotation(Vec3::new(20.0, 150.0, -40.0));
        let back = Transform::decompose(&original.model_matrix()).unwrap();
        assert!(back.rotation.y.abs() <= 90.0 + 1e-3);
        assert!(back.model_matrix().abs_diff_eq(original.model_matrix(), 1e-4));
    }

    #[test]
    fn decompose_gimbal_lock_keeps_matrix() {
        let original = Transform::new().rotation(Vec3::new(25.0, 90.0, 40.0));
        let back = Transform::decompose(&original.model_matrix()).unwrap();
        assert!(back.rotation.is_finite());
        assert!(back.model_matrix().abs_diff_eq(original.model_matrix(), 1e-3));
    }

    #[test]
    fn decompose_keeps_mirrored_scale() {
        let original = Transform::new()
            .rotation(Vec3::new(10.0, 20.0, 30.0))
            .scale(Vec3::new(-2.0, 1.0, 1.0));
        let back = Transform::decompose(&original.model_matrix()).unwrap();
        assert!(back.model_matrix().abs_diff_eq(original.model_matrix(), 1e-4));
    }

    #[test]
    fn zero_scale_is_clamped_not_nan() {
        let original = Transform::new()
            .rotation(Vec3::new(0.0, 0.0, 45.0))
            .scale(Vec3::new(0.0, 1.0, 1.0));
        let back = Transform::decompose(&original.model_matrix()).unwrap();
        assert!(back.rotation.is_finite());
        assert_eq!(back.scale.x, MIN_SCALE);
        assert_vec_close(back.rotation, Vec3::new(0.0, 0.0, 45.0), 1e-3);
    }

    #[test]
    fn fully_collapsed_matrix_yields_identity_rotation() {
        let back = Transform::decompose(&(Mat4::from_translation(Vec3::ONE) * Mat4::ZERO)).unwrap();
        assert_eq!(back.rotation, Vec3::ZERO);
        assert_eq!(back.scale, Vec3::splat(MIN_SCALE));
    }

    #[test]
    fn non_finite_matrix_leaves_transform_untouched() {
        let mut transform = Transform::from_location(Vec3::new(1.0, 2.0, 3.0));
        let mut bad = Mat4::IDENTITY;
        bad.x_axis.x = f32::NAN;

        assert!(!transform.set_from_matrix(&bad));
        assert_eq!(transform.location, Vec3::new(1.0, 2.0, 3.0));
    }
}
