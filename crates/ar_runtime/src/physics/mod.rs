//! Physics module for rigid body simulation and collision detection
//!
//! - [`body`] - rigid bodies, materials and creation descriptors
//! - [`collision`] - shapes, rays and intersection primitives
//! - [`collision_layers`] - category / mask filtering
//! - [`contact`] - contacts and the events derived from them
//! - [`world`] - the stepping world owning every body

pub mod body;
pub mod collision;
pub mod collision_layers;
pub mod contact;
pub mod world;

pub use body::{BodyKind, PhysicsMaterial, RigidBody, RigidBodyDesc};
pub use collision::{BoundingSphere, CollisionShape, OrientedBox, Ray, RayHit, ShapeKind};
pub use collision_layers::{should_collide, CollisionFilter, CollisionGroups};
pub use contact::{CollisionContact, PhysicsEvent, TriggerOverlap};
pub use world::PhysicsWorld;
