//! Primitive collision shapes and intersection algorithms
//!
//! Rays, bounding spheres and oriented boxes with the intersection tests
//! used by raycasting and the narrow phase.

use crate::foundation::collections::{BodyHandle, EntityId};
use crate::foundation::math::{Quat, Vec3, EPSILON};

/// A ray for ray casting and picking
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// The origin point of the ray in world space
    pub origin: Vec3,
    /// The direction of the ray (normalized)
    pub direction: Vec3,
}

impl Ray {
    /// Creates a new ray, or `None` when `direction` has no length
    pub fn new(origin: Vec3, direction: Vec3) -> Option<Self> {
        let length = direction.norm();
        if !length.is_finite() || length < EPSILON {
            return None;
        }
        Some(Self {
            origin,
            direction: direction / length,
        })
    }

    /// Get a point along the ray at distance t
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Distance along the ray to a horizontal plane at height `y`
    pub fn intersect_horizontal_plane(&self, y: f32) -> Option<f32> {
        if self.direction.y.abs() < EPSILON {
            return None;
        }
        let t = (y - self.origin.y) / self.direction.y;
        (t >= 0.0).then_some(t)
    }
}

/// Result of a physics raycast
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// The body that was hit
    pub body: BodyHandle,
    /// Entity owning the body
    pub entity: EntityId,
    /// The distance from the ray origin to the hit point
    pub distance: f32,
    /// The point of intersection in world space
    pub point: Vec3,
    /// Direction from the body center towards the ray origin
    pub normal: Vec3,
}

/// A bounding sphere for collision detection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    /// The center position of the sphere in world space
    pub center: Vec3,
    /// The radius of the sphere
    pub radius: f32,
}

impl BoundingSphere {
    /// Creates a new bounding sphere with the given center and radius
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Check if this sphere strictly overlaps another
    pub fn intersects(&self, other: &BoundingSphere) -> bool {
        let radius_sum = self.radius + other.radius;
        (self.center - other.center).magnitude_squared() < radius_sum * radius_sum
    }

    /// Get the penetration depth if intersecting (0.0 if not intersecting)
    pub fn penetration_depth(&self, other: &BoundingSphere) -> f32 {
        let distance = (self.center - other.center).magnitude();
        (self.radius + other.radius - distance).max(0.0)
    }

    /// Test ray intersection with this sphere
    ///
    /// Returns the nearest positive distance; a ray starting inside the
    /// sphere reports its exit point.
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        // Solve |origin + t*direction - center|^2 = radius^2
        let oc = ray.origin - self.center;
        let a = ray.direction.dot(&ray.direction);
        let b = 2.0 * oc.dot(&ray.direction);
        let c = oc.dot(&oc) - self.radius * self.radius;

        let discriminant = b * b - 4.0 * a * c;
        if discriminant < 0.0 || a < EPSILON {
            return None;
        }

        let sqrt_discriminant = discriminant.sqrt();
        let t1 = (-b - sqrt_discriminant) / (2.0 * a);
        let t2 = (-b + sqrt_discriminant) / (2.0 * a);

        if t1 > 0.0 {
            Some(t1)
        } else if t2 > 0.0 {
            Some(t2)
        } else {
            None
        }
    }
}

/// A box with arbitrary orientation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientedBox {
    /// World-space center
    pub center: Vec3,
    /// Orientation of the box axes
    pub rotation: Quat,
    /// Half size along each local axis
    pub half_extents: Vec3,
}

impl OrientedBox {
    /// Create a new oriented box
    pub fn new(center: Vec3, rotation: Quat, half_extents: Vec3) -> Self {
        Self {
            center,
            rotation,
            half_extents,
        }
    }

    /// Slab test in the box's local frame
    ///
    /// Returns the entry distance, or the exit distance when the ray starts
    /// inside the box.
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        let inverse = self.rotation.inverse();
        let origin = inverse * (ray.origin - self.center);
        let direction = inverse * ray.direction;

        let mut t_min = f32::NEG_INFINITY;
        let mut t_max = f32::INFINITY;
        for axis in 0..3 {
            let extent = self.half_extents[axis];
            if direction[axis].abs() < EPSILON {
                // Parallel to this slab: either always inside it or never
                if origin[axis].abs() > extent {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / direction[axis];
            let t1 = (-extent - origin[axis]) * inv;
            let t2 = (extent - origin[axis]) * inv;
            t_min = t_min.max(t1.min(t2));
            t_max = t_max.min(t1.max(t2));
        }

        if t_max < t_min || t_max <= 0.0 {
            None
        } else if t_min > 0.0 {
            Some(t_min)
        } else {
            Some(t_max)
        }
    }
}
