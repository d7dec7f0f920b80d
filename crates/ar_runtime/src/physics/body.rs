//! Rigid bodies
//!
//! A body is created from a [`RigidBodyDesc`] and registered in exactly one
//! [`PhysicsWorld`](super::PhysicsWorld). Mass is derived from shape volumes
//! and material density for dynamic bodies; static and kinematic bodies have
//! zero effective mass and are never displaced by collision resolution.

use serde::{Deserialize, Serialize};

use super::collision::{BoundingSphere, CollisionShape};
use super::collision_layers::CollisionFilter;
use crate::foundation::collections::EntityId;
use crate::foundation::math::{normalize_quat, Quat, Vec3, EPSILON};

/// How a body participates in the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BodyKind {
    /// Never moves
    Static,
    /// Moved by forces, gravity and collisions
    Dynamic,
    /// Moved by its own velocity while it has one, otherwise follows its
    /// entity; never moved by collisions
    Kinematic,
}

/// Surface and bulk properties of a body
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicsMaterial {
    /// Mass per cubic meter
    pub density: f32,
    /// Bounciness, 0 = inelastic, 1 = perfectly elastic
    pub restitution: f32,
    /// Coulomb friction coefficient
    pub friction: f32,
}

impl Default for PhysicsMaterial {
    fn default() -> Self {
        Self {
            density: 1.0,
            restitution: 0.3,
            friction: 0.5,
        }
    }
}

impl PhysicsMaterial {
    /// Create a new material
    pub fn new(density: f32, restitution: f32, friction: f32) -> Self {
        Self {
            density: density.max(0.0),
            restitution: restitution.clamp(0.0, 1.0),
            friction: friction.max(0.0),
        }
    }
}

/// Descriptor used to create a [`RigidBody`]
///
/// ```
/// use ar_runtime::physics::{CollisionShape, RigidBodyDesc};
/// use ar_runtime::foundation::math::Vec3;
///
/// let ball = RigidBodyDesc::dynamic()
///     .with_shape(CollisionShape::sphere(0.5))
///     .with_position(Vec3::new(0.0, 2.0, 0.0))
///     .with_restitution(0.8);
/// assert_eq!(ball.shapes.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RigidBodyDesc {
    /// Body kind
    pub kind: BodyKind,
    /// Shapes in body space
    pub shapes: Vec<CollisionShape>,
    /// Initial world position
    pub position: Vec3,
    /// Initial world rotation
    pub rotation: Quat,
    /// Initial linear velocity
    pub linear_velocity: Vec3,
    /// Initial angular velocity (axis * radians per second)
    pub angular_velocity: Vec3,
    /// Fraction of linear velocity lost per second
    pub linear_damping: f32,
    /// Fraction of angular velocity lost per second
    pub angular_damping: f32,
    /// Multiplier applied to world gravity
    pub gravity_scale: f32,
    /// Material
    pub material: PhysicsMaterial,
    /// Collision filter
    pub filter: CollisionFilter,
    /// Trigger bodies report overlaps without being resolved
    pub is_trigger: bool,
    /// Explicit mass overriding the shape-derived one
    pub mass_override: Option<f32>,
}

impl RigidBodyDesc {
    /// Create a descriptor of the given kind with default settings
    pub fn new(kind: BodyKind) -> Self {
        Self {
            kind,
            shapes: Vec::new(),
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            linear_velocity: Vec3::zeros(),
            angular_velocity: Vec3::zeros(),
            linear_damping: 0.01,
            angular_damping: 0.01,
            gravity_scale: 1.0,
            material: PhysicsMaterial::default(),
            filter: CollisionFilter::default(),
            is_trigger: false,
            mass_override: None,
        }
    }

    /// Dynamic body descriptor
    pub fn dynamic() -> Self {
        Self::new(BodyKind::Dynamic)
    }

    /// Static body descriptor
    pub fn fixed() -> Self {
        Self::new(BodyKind::Static)
    }

    /// Kinematic body descriptor
    pub fn kinematic() -> Self {
        Self::new(BodyKind::Kinematic)
    }

    /// Add one shape
    pub fn with_shape(mut self, shape: CollisionShape) -> Self {
        self.shapes.push(shape);
        self
    }

    /// Replace all shapes
    pub fn with_shapes(mut self, shapes: Vec<CollisionShape>) -> Self {
        self.shapes = shapes;
        self
    }

    /// Set the initial position
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Set the initial rotation
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Set the initial linear velocity
    pub fn with_linear_velocity(mut self, velocity: Vec3) -> Self {
        self.linear_velocity = velocity;
        self
    }

    /// Set the initial angular velocity
    pub fn with_angular_velocity(mut self, velocity: Vec3) -> Self {
        self.angular_velocity = velocity;
        self
    }

    /// Set both damping coefficients
    pub fn with_damping(mut self, linear: f32, angular: f32) -> Self {
        self.linear_damping = linear.max(0.0);
        self.angular_damping = angular.max(0.0);
        self
    }

    /// Set the gravity multiplier
    pub fn with_gravity_scale(mut self, scale: f32) -> Self {
        self.gravity_scale = scale;
        self
    }

    /// Set the material
    pub fn with_material(mut self, material: PhysicsMaterial) -> Self {
        self.material = material;
        self
    }

    /// Set only the restitution of the material
    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.material.restitution = restitution.clamp(0.0, 1.0);
        self
    }

    /// Set the collision filter
    pub fn with_filter(mut self, filter: CollisionFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Mark as a trigger volume
    pub fn with_trigger(mut self, is_trigger: bool) -> Self {
        self.is_trigger = is_trigger;
        self
    }

    /// Use an explicit mass instead of deriving it from the shapes
    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass_override = Some(mass.max(0.0));
        self
    }
}

impl Default for RigidBodyDesc {
    fn default() -> Self {
        Self::dynamic()
    }
}

/// A body simulated by the physics world
#[derive(Debug, Clone)]
pub struct RigidBody {
    owner: EntityId,
    kind: BodyKind,
    shapes: Vec<CollisionShape>,
    mass: f32,
    inverse_mass: f32,
    inverse_inertia: f32,
    bounding_radius: f32,
    sleeping: bool,

    /// World position of the body origin
    pub position: Vec3,
    /// World rotation
    pub rotation: Quat,
    /// Linear velocity in m/s
    pub linear_velocity: Vec3,
    /// Angular velocity (axis * radians per second)
    pub angular_velocity: Vec3,
    /// Fraction of linear velocity lost per second
    pub linear_damping: f32,
    /// Fraction of angular velocity lost per second
    pub angular_damping: f32,
    /// Multiplier applied to world gravity
    pub gravity_scale: f32,
    /// Material
    pub material: PhysicsMaterial,
    /// Collision filter
    pub filter: CollisionFilter,
    /// Trigger bodies report overlaps without being resolved
    pub is_trigger: bool,

    pub(crate) force: Vec3,
    pub(crate) torque: Vec3,
    pub(crate) impulse: Vec3,
    pub(crate) angular_impulse: Vec3,
}

impl RigidBody {
    /// Build a body owned by `owner` from a descriptor
    pub fn from_desc(owner: EntityId, desc: RigidBodyDesc) -> Self {
        let bounding_radius = desc
            .shapes
            .iter()
            .map(CollisionShape::enclosing_radius)
            .fold(0.0, f32::max);

        let mass = match desc.kind {
            BodyKind::Dynamic => desc.mass_override.unwrap_or_else(|| {
                desc.shapes.iter().map(CollisionShape::volume).sum::<f32>() * desc.material.density
            }),
            BodyKind::Static | BodyKind::Kinematic => 0.0,
        };
        let mass = if mass.is_finite() && mass > EPSILON { mass } else { 0.0 };
        let inverse_mass = if mass > 0.0 { 1.0 / mass } else { 0.0 };

        // Solid-sphere inertia around the bounding radius
        let inertia = 0.4 * mass * bounding_radius * bounding_radius;
        let inverse_inertia = if inertia > EPSILON { 1.0 / inertia } else { 0.0 };

        if desc.kind == BodyKind::Dynamic && mass == 0.0 {
            log::debug!("Dynamic body for {:?} has no mass and will not be resolved", owner);
        }

        Self {
            owner,
            kind: desc.kind,
            shapes: desc.shapes,
            mass,
            inverse_mass,
            inverse_inertia,
            bounding_radius,
            sleeping: false,
            position: desc.position,
            rotation: normalize_quat(*desc.rotation.quaternion()),
            linear_velocity: desc.linear_velocity,
            angular_velocity: desc.angular_velocity,
            linear_damping: desc.linear_damping,
            angular_damping: desc.angular_damping,
            gravity_scale: desc.gravity_scale,
            material: desc.material,
            filter: desc.filter,
            is_trigger: desc.is_trigger,
            force: Vec3::zeros(),
            torque: Vec3::zeros(),
            impulse: Vec3::zeros(),
            angular_impulse: Vec3::zeros(),
        }
    }

    /// Entity that owns the body
    pub fn owner(&self) -> EntityId {
        self.owner
    }

    /// Body kind
    pub fn kind(&self) -> BodyKind {
        self.kind
    }

    /// Whether the simulation, not the owning entity, drives the pose
    ///
    /// True for dynamic bodies and for kinematic bodies with a non-zero
    /// velocity.
    pub fn drives_pose(&self) -> bool {
        match self.kind {
            BodyKind::Dynamic => true,
            BodyKind::Kinematic => {
                self.linear_velocity.norm_squared() > EPSILON || self.angular_velocity.norm_squared() > EPSILON
            }
            BodyKind::Static => false,
        }
    }

    /// Shapes in body space
    pub fn shapes(&self) -> &[CollisionShape] {
        &self.shapes
    }

    /// Effective mass (zero for static, kinematic and shapeless bodies)
    pub fn mass(&self) -> f32 {
        self.mass
    }

    /// Inverse mass, zero when the body cannot be pushed
    pub fn inverse_mass(&self) -> f32 {
        self.inverse_mass
    }

    /// Radius of the sphere the narrow phase uses for this body
    pub fn bounding_radius(&self) -> f32 {
        self.bounding_radius
    }

    /// World-space sphere enclosing every shape
    pub fn bounding_sphere(&self) -> BoundingSphere {
        BoundingSphere::new(self.position, self.bounding_radius)
    }

    /// Whether the body is asleep
    pub fn is_sleeping(&self) -> bool {
        self.sleeping
    }

    /// Dynamic with positive mass: the only bodies collisions can move
    pub fn is_simulated(&self) -> bool {
        self.kind == BodyKind::Dynamic && self.inverse_mass > 0.0
    }

    /// Whether the body counts as moving for the broad phase
    pub fn is_awake(&self) -> bool {
        match self.kind {
            BodyKind::Static => false,
            BodyKind::Kinematic => true,
            BodyKind::Dynamic => !self.sleeping,
        }
    }

    /// Wake a sleeping dynamic body
    pub fn wake(&mut self) {
        if self.kind == BodyKind::Dynamic && self.sleeping {
            self.sleeping = false;
        }
    }

    /// Put a dynamic body to sleep, zeroing its velocities
    pub fn sleep(&mut self) {
        if self.kind == BodyKind::Dynamic {
            self.sleeping = true;
            self.linear_velocity = Vec3::zeros();
            self.angular_velocity = Vec3::zeros();
        }
    }

    /// Queue a force for the next step
    pub fn add_force(&mut self, force: Vec3) {
        self.force += force;
        self.wake();
    }

    /// Queue a torque for the next step
    pub fn add_torque(&mut self, torque: Vec3) {
        self.torque += torque;
        self.wake();
    }

    /// Queue a linear impulse for the next step
    pub fn add_impulse(&mut self, impulse: Vec3) {
        self.impulse += impulse;
        self.wake();
    }

    /// Queue an angular impulse for the next step
    pub fn add_angular_impulse(&mut self, impulse: Vec3) {
        self.angular_impulse += impulse;
        self.wake();
    }

    /// Apply queued forces and impulses to the velocities and clear them
    pub(crate) fn apply_pending(&mut self, dt: f32) {
        if self.kind == BodyKind::Dynamic {
            self.linear_velocity += self.force * self.inverse_mass * dt + self.impulse * self.inverse_mass;
            self.angular_velocity +=
                self.torque * self.inverse_inertia * dt + self.angular_impulse * self.inverse_inertia;
        }
        self.force = Vec3::zeros();
        self.torque = Vec3::zeros();
        self.impulse = Vec3::zeros();
        self.angular_impulse = Vec3::zeros();
    }

    /// Multiplicative damping for one step
    pub(crate) fn apply_damping(&mut self, dt: f32) {
        self.linear_velocity *= (1.0 - self.linear_damping * dt).clamp(0.0, 1.0);
        self.angular_velocity *= (1.0 - self.angular_damping * dt).clamp(0.0, 1.0);
    }

    /// Advance position and orientation by the current velocities
    pub(crate) fn integrate(&mut self, dt: f32) {
        self.position += self.linear_velocity * dt;
        let rotation_step = self.angular_velocity * dt;
        if rotation_step.norm() > EPSILON {
            let delta = Quat::from_scaled_axis(rotation_step);
            self.rotation = normalize_quat(*(delta * self.rotation).quaternion());
        }
    }

    /// Sleep-check at the end of a step; returns true when the state changed
    pub(crate) fn update_sleep_state(&mut self, linear_threshold: f32, angular_threshold: f32) -> bool {
        if self.kind != BodyKind::Dynamic {
            return false;
        }
        let resting = self.linear_velocity.norm() < linear_threshold
            && self.angular_velocity.norm() < angular_threshold;
        match (self.sleeping, resting) {
            (false, true) => {
                self.sleep();
                true
            }
            (true, false) => {
                self.sleeping = false;
                true
            }
            _ => false,
        }
    }
}
