//! Math utilities and types
//!
//! Provides the fundamental math types for the scene runtime. Everything is
//! `f32` and backed by nalgebra.

pub use nalgebra::{Matrix3, Matrix4, Quaternion, Unit, Vector2, Vector3};

/// 2D vector type (screen space)
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Smallest scale component allowed in a composed transform.
pub const MIN_SCALE: f32 = 1e-6;

/// Tolerance used for degenerate-value checks across the runtime.
pub const EPSILON: f32 = 1e-6;

/// Transform representing position, rotation, and scale
///
/// Value type: copied freely, converted into a matrix on demand and never
/// cached, so a matrix can never go stale across a mutation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Position in 3D space
    pub position: Vec3,

    /// Rotation quaternion
    pub rotation: Quat,

    /// Scale factors (component-wise, kept positive)
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    /// Create a new identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a transform with only position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Create a transform with position and rotation
    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            ..Default::default()
        }
    }

    /// Create from position, rotation and scale
    pub fn from_parts(position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    /// Builder pattern: Set position
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Builder pattern: Set rotation
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Builder pattern: Set rotation from axis-angle
    pub fn with_rotation_axis_angle(mut self, axis: Vec3, angle: f32) -> Self {
        self.rotation = match Unit::try_new(axis, EPSILON) {
            Some(axis) => Quat::from_axis_angle(&axis, angle),
            None => Quat::identity(),
        };
        self
    }

    /// Builder pattern: Set uniform scale
    pub fn with_uniform_scale(mut self, scale: f32) -> Self {
        self.scale = Vec3::new(scale, scale, scale);
        self
    }

    /// Builder pattern: Set non-uniform scale
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Rotation renormalized, falling back to identity for degenerate input.
    pub fn normalized_rotation(&self) -> Quat {
        normalize_quat(*self.rotation.quaternion())
    }

    /// Scale with every component clamped to stay positive.
    pub fn positive_scale(&self) -> Vec3 {
        self.scale.map(|s| if s.is_finite() { s.abs().max(MIN_SCALE) } else { 1.0 })
    }

    /// Return a copy with the composition invariants enforced.
    pub fn sanitized(&self) -> Self {
        Self {
            position: self.position,
            rotation: self.normalized_rotation(),
            scale: self.positive_scale(),
        }
    }

    /// Convert to a transformation matrix (TRS order)
    pub fn to_matrix(&self) -> Mat4 {
        let clean = self.sanitized();
        Mat4::new_translation(&clean.position)
            * clean.rotation.to_homogeneous()
            * Mat4::new_nonuniform_scaling(&clean.scale)
    }

    /// Apply this transform to a point
    pub fn transform_point(&self, point: Point3) -> Point3 {
        self.to_matrix().transform_point(&point)
    }

    /// Apply this transform to a vector (no translation)
    pub fn transform_vector(&self, vector: Vec3) -> Vec3 {
        self.to_matrix().transform_vector(&vector)
    }

    /// Create a transform from a transformation matrix
    ///
    /// Shear is discarded. A column with zero length yields identity rotation
    /// for that decomposition instead of NaN.
    pub fn from_matrix(matrix: Mat4) -> Self {
        let position = Vec3::new(matrix.m14, matrix.m24, matrix.m34);

        let scale_x = Vec3::new(matrix.m11, matrix.m21, matrix.m31).magnitude();
        let scale_y = Vec3::new(matrix.m12, matrix.m22, matrix.m32).magnitude();
        let scale_z = Vec3::new(matrix.m13, matrix.m23, matrix.m33).magnitude();

        if scale_x < EPSILON || scale_y < EPSILON || scale_z < EPSILON {
            return Self {
                position,
                rotation: Quat::identity(),
                scale: Vec3::new(scale_x, scale_y, scale_z).map(|s| s.max(MIN_SCALE)),
            };
        }

        let rotation_matrix = Matrix3::new(
            matrix.m11 / scale_x, matrix.m12 / scale_y, matrix.m13 / scale_z,
            matrix.m21 / scale_x, matrix.m22 / scale_y, matrix.m23 / scale_z,
            matrix.m31 / scale_x, matrix.m32 / scale_y, matrix.m33 / scale_z,
        );
        let rotation = Quat::from_matrix(&rotation_matrix);

        Self {
            position,
            rotation,
            scale: Vec3::new(scale_x, scale_y, scale_z),
        }
    }

    /// Combine this transform with another (`self` is the parent)
    ///
    /// Exact for uniform scale. With non-uniform parent scale and a rotated
    /// child the true product contains shear; use [`Transform::to_matrix`]
    /// products when that matters.
    pub fn combine(&self, other: &Transform) -> Transform {
        let parent = self.sanitized();
        let child = other.sanitized();
        Transform {
            position: parent.position + parent.rotation * parent.scale.component_mul(&child.position),
            rotation: normalize_quat(*(parent.rotation * child.rotation).quaternion()),
            scale: parent.scale.component_mul(&child.scale),
        }
    }

    /// Get the inverse transform
    pub fn inverse(&self) -> Transform {
        let clean = self.sanitized();
        let inv_scale = Vec3::new(1.0 / clean.scale.x, 1.0 / clean.scale.y, 1.0 / clean.scale.z);
        let inv_rotation = clean.rotation.inverse();
        let inv_position = inv_scale.component_mul(&(inv_rotation * -clean.position));

        Transform {
            position: inv_position,
            rotation: inv_rotation,
            scale: inv_scale,
        }
    }

    /// Interpolate between two transforms
    ///
    /// Position and scale are lerped, rotation is slerped along the shortest
    /// arc. `t` is not clamped so overshooting easings work.
    pub fn interpolate(&self, other: &Transform, t: f32) -> Transform {
        Transform {
            position: self.position.lerp(&other.position, t),
            rotation: slerp(&self.normalized_rotation(), &other.normalized_rotation(), t),
            scale: self.scale.lerp(&other.scale, t),
        }
    }

    /// Check whether two transforms match within `epsilon`
    pub fn approx_eq(&self, other: &Transform, epsilon: f32) -> bool {
        (self.position - other.position).amax() <= epsilon
            && (self.scale - other.scale).amax() <= epsilon
            && self.normalized_rotation().angle_to(&other.normalized_rotation()) <= epsilon.max(1e-3)
    }
}

/// Normalize a raw quaternion, resolving degenerate input to identity.
pub fn normalize_quat(quaternion: Quaternion<f32>) -> Quat {
    let norm = quaternion.norm();
    if !norm.is_finite() || norm < EPSILON {
        return Quat::identity();
    }
    Quat::new_unchecked(quaternion / norm)
}

/// Shortest-arc spherical interpolation tolerant of antipodal inputs.
pub fn slerp(from: &Quat, to: &Quat, t: f32) -> Quat {
    // `try_slerp` fails when the two rotations are 180 degrees apart.
    from.try_slerp(to, t, EPSILON)
        .unwrap_or_else(|| normalize_quat(from.quaternion().lerp(to.quaternion(), t)))
}

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// 2 * Pi
    pub const TAU: f32 = 2.0 * PI;
}

/// Math utility functions
pub mod utils {
    use super::constants;

    /// Wrap an angle into `(-PI, PI]`
    pub fn wrap_angle(angle: f32) -> f32 {
        let mut wrapped = angle % constants::TAU;
        if wrapped > constants::PI {
            wrapped -= constants::TAU;
        } else if wrapped <= -constants::PI {
            wrapped += constants::TAU;
        }
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::constants::PI;
    use approx::assert_relative_eq;

    const EPS: f32 = 1e-5;

    #[test]
    fn test_transform_identity() {
        let transform = Transform::identity();

        assert_eq!(transform.position, Vec3::zeros());
        assert_relative_eq!(transform.rotation, Quat::identity(), epsilon = EPS);
        assert_eq!(transform.scale, Vec3::new(1.0, 1.0, 1.0));
        assert_relative_eq!(transform.to_matrix(), Mat4::identity(), epsilon = EPS);
    }

    #[test]
    fn test_matrix_roundtrip_consistency() {
        let original = Transform::from_parts(
            Vec3::new(1.0, 2.0, 3.0),
            Quat::from_axis_angle(&Unit::new_normalize(Vec3::new(1.0, 1.0, 1.0)), 0.5),
            Vec3::new(2.0, 1.5, 0.8),
        );

        let reconstructed = Transform::from_matrix(original.to_matrix());

        assert_relative_eq!(reconstructed.position, original.position, epsilon = EPS);
        assert_relative_eq!(reconstructed.scale, original.scale, epsilon = EPS);
        let dot = original.rotation.coords.dot(&reconstructed.rotation.coords);
        assert!(dot.abs() > 0.999, "Quaternion rotation mismatch: dot product = {}", dot);
    }

    #[test]
    fn test_combine_matches_matrix_product_for_uniform_scale() {
        let parent = Transform::from_parts(
            Vec3::new(1.0, 0.0, 0.0),
            Quat::from_axis_angle(&Vec3::y_axis(), PI / 2.0),
            Vec3::new(2.0, 2.0, 2.0),
        );
        let child = Transform::from_position(Vec3::new(0.0, 0.0, 1.0));

        let combined = parent.combine(&child);
        let product = parent.to_matrix() * child.to_matrix();

        assert_relative_eq!(combined.to_matrix(), product, epsilon = EPS);
        assert_relative_eq!(combined.position, Vec3::new(3.0, 0.0, 0.0), epsilon = EPS);
    }

    #[test]
    fn test_inverse_transform_validation() {
        let original = Transform::from_parts(
            Vec3::new(2.0, 3.0, 1.0),
            Quat::from_axis_angle(&Vec3::y_axis(), 0.785),
            Vec3::new(2.0, 2.0, 2.0),
        );

        let should_be_identity = original.combine(&original.inverse());

        assert_relative_eq!(should_be_identity.position, Vec3::zeros(), epsilon = EPS);
        assert_relative_eq!(should_be_identity.scale, Vec3::new(1.0, 1.0, 1.0), epsilon = EPS);
        let rotation_dot = should_be_identity.rotation.coords.dot(&Quat::identity().coords);
        assert!(rotation_dot.abs() > 0.999, "Inverse rotation validation failed");
    }

    #[test]
    fn test_degenerate_quaternion_resolves_to_identity() {
        let degenerate = Quat::new_unchecked(Quaternion::new(0.0, 0.0, 0.0, 0.0));
        let transform = Transform::identity().with_rotation(degenerate);

        assert_relative_eq!(transform.normalized_rotation(), Quat::identity(), epsilon = EPS);
        assert!(transform.to_matrix().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_non_positive_scale_is_clamped_for_composition() {
        let transform = Transform::identity().with_scale(Vec3::new(-2.0, 0.0, 1.0));
        let scale = transform.positive_scale();

        assert_relative_eq!(scale.x, 2.0);
        assert!(scale.y > 0.0);
        assert!(transform.inverse().to_matrix().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_interpolate_endpoints_and_midpoint() {
        let a = Transform::from_position(Vec3::new(0.0, 0.0, 0.0));
        let b = Transform::from_parts(
            Vec3::new(2.0, 4.0, 0.0),
            Quat::from_axis_angle(&Vec3::z_axis(), PI / 2.0),
            Vec3::new(3.0, 3.0, 3.0),
        );

        assert!(a.interpolate(&b, 0.0).approx_eq(&a, EPS));
        assert!(a.interpolate(&b, 1.0).approx_eq(&b, EPS));

        let mid = a.interpolate(&b, 0.5);
        assert_relative_eq!(mid.position, Vec3::new(1.0, 2.0, 0.0), epsilon = EPS);
        assert_relative_eq!(mid.rotation.angle(), PI / 4.0, epsilon = 1e-4);
    }

    #[test]
    fn test_wrap_angle() {
        assert_relative_eq!(utils::wrap_angle(3.0 * PI / 2.0), -PI / 2.0, epsilon = EPS);
        assert_relative_eq!(utils::wrap_angle(-3.0 * PI / 2.0), PI / 2.0, epsilon = EPS);
        assert_relative_eq!(utils::wrap_angle(0.25), 0.25, epsilon = EPS);
    }
}
