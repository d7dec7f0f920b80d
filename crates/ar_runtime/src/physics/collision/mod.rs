//! Collision geometry
//!
//! - [`primitives`] - rays, bounding spheres, oriented boxes
//! - [`shape`] - body-local collision shapes

pub mod primitives;
pub mod shape;

pub use primitives::{BoundingSphere, OrientedBox, Ray, RayHit};
pub use shape::{CollisionShape, ShapeKind};
