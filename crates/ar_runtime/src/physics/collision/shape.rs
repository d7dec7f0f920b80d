//! Collision shapes
//!
//! Shapes are stored in the body's local space (offset and rotation
//! relative to the body origin) and moved into world space on demand.

use serde::{Deserialize, Serialize};

use super::primitives::{BoundingSphere, OrientedBox, Ray};
use crate::foundation::math::{constants::PI, Quat, Vec3};

/// Geometry of a collision shape
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ShapeKind {
    /// Box given by half extents along its local axes
    Box {
        /// Half size along X, Y and Z
        half_extents: Vec3,
    },
    /// Sphere
    Sphere {
        /// Sphere radius
        radius: f32,
    },
    /// Capsule aligned with the local Y axis
    Capsule {
        /// Radius of the rounded ends and the cylinder
        radius: f32,
        /// Half length of the cylindrical section
        half_height: f32,
    },
}

/// A shape placed relative to its body
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollisionShape {
    /// Geometry
    pub kind: ShapeKind,
    /// Position relative to the body origin
    pub offset: Vec3,
    /// Orientation relative to the body
    pub rotation: Quat,
}

impl CollisionShape {
    fn with_kind(kind: ShapeKind) -> Self {
        Self {
            kind,
            offset: Vec3::zeros(),
            rotation: Quat::identity(),
        }
    }

    /// Sphere centered on the body
    pub fn sphere(radius: f32) -> Self {
        Self::with_kind(ShapeKind::Sphere { radius: radius.abs() })
    }

    /// Box centered on the body
    pub fn cuboid(half_extents: Vec3) -> Self {
        Self::with_kind(ShapeKind::Box { half_extents: half_extents.abs() })
    }

    /// Y-aligned capsule centered on the body
    pub fn capsule(radius: f32, half_height: f32) -> Self {
        Self::with_kind(ShapeKind::Capsule {
            radius: radius.abs(),
            half_height: half_height.abs(),
        })
    }

    /// Set the local offset
    pub fn with_offset(mut self, offset: Vec3) -> Self {
        self.offset = offset;
        self
    }

    /// Set the local rotation
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Volume in cubic meters, used for mass derivation
    pub fn volume(&self) -> f32 {
        match self.kind {
            ShapeKind::Box { half_extents } => 8.0 * half_extents.x * half_extents.y * half_extents.z,
            ShapeKind::Sphere { radius } => sphere_volume(radius),
            ShapeKind::Capsule { radius, half_height } => {
                PI * radius * radius * 2.0 * half_height + sphere_volume(radius)
            }
        }
    }

    /// Radius of the sphere standing in for this shape
    ///
    /// Boxes use half their longest axis, which is their largest half extent.
    pub fn bounding_radius(&self) -> f32 {
        match self.kind {
            ShapeKind::Box { half_extents } => half_extents.max(),
            ShapeKind::Sphere { radius } => radius,
            ShapeKind::Capsule { radius, half_height } => radius + half_height,
        }
    }

    /// Radius around the body origin that encloses the whole shape
    pub fn enclosing_radius(&self) -> f32 {
        self.offset.norm() + self.bounding_radius()
    }

    /// World-space center for a body at `position` / `rotation`
    pub fn world_center(&self, position: Vec3, rotation: Quat) -> Vec3 {
        position + rotation * self.offset
    }

    /// Distance along `ray` to this shape placed on a body
    ///
    /// Spheres are exact, boxes use an oriented slab test and capsules fall
    /// back to their bounding sphere.
    pub fn intersect_ray(&self, ray: &Ray, position: Vec3, rotation: Quat) -> Option<f32> {
        let center = self.world_center(position, rotation);
        match self.kind {
            ShapeKind::Box { half_extents } => {
                OrientedBox::new(center, rotation * self.rotation, half_extents).intersect_ray(ray)
            }
            ShapeKind::Sphere { .. } | ShapeKind::Capsule { .. } => {
                BoundingSphere::new(center, self.bounding_radius()).intersect_ray(ray)
            }
        }
    }
}

fn sphere_volume(radius: f32) -> f32 {
    4.0 / 3.0 * PI * radius * radius * radius
}
