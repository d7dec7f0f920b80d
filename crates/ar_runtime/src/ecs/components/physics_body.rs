//! Physics body and collision shape components

use crate::ecs::{Component, ComponentKind, TypedComponent};
use crate::foundation::collections::{BodyHandle, EntityId};
use crate::physics::{CollisionFilter, CollisionShape};

/// Links an entity to its rigid body
///
/// Removing this component orphans the body; the coordinator removes
/// orphaned bodies from the world on its next update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysicsBodyComponent {
    /// Body registered in the physics world
    pub handle: BodyHandle,
}

impl PhysicsBodyComponent {
    /// Create a new physics body component
    pub fn new(handle: BodyHandle) -> Self {
        Self { handle }
    }
}

impl Component for PhysicsBodyComponent {
    fn kind(&self) -> ComponentKind {
        ComponentKind::PhysicsBody
    }

    fn on_attach(&mut self, entity: EntityId) {
        log::trace!("Body {:?} attached to entity {:?}", self.handle, entity);
    }

    fn on_detach(&mut self, entity: EntityId) {
        log::trace!("Body {:?} detached from entity {:?}", self.handle, entity);
    }
}

impl TypedComponent for PhysicsBodyComponent {
    const KIND: ComponentKind = ComponentKind::PhysicsBody;
}

/// Collision description of an entity's body
///
/// Mirrors what the body was created with so scene code can inspect shapes
/// without reaching into the physics world.
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionComponent {
    /// Shapes in the entity's local space
    pub shapes: Vec<CollisionShape>,
    /// Category and mask bits
    pub filter: CollisionFilter,
    /// Trigger volumes report overlaps but are never resolved
    pub is_trigger: bool,
}

impl CollisionComponent {
    /// Create a new collision component
    pub fn new(shapes: Vec<CollisionShape>) -> Self {
        Self {
            shapes,
            filter: CollisionFilter::default(),
            is_trigger: false,
        }
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

    /// Radius of a sphere around the entity origin enclosing every shape
    pub fn bounding_radius(&self) -> f32 {
        self.shapes
            .iter()
            .map(CollisionShape::enclosing_radius)
            .fold(0.0, f32::max)
    }
}

impl Component for CollisionComponent {
    fn kind(&self) -> ComponentKind {
        ComponentKind::CollisionShape
    }
}

impl TypedComponent for CollisionComponent {
    const KIND: ComponentKind = ComponentKind::CollisionShape;
}
