//! Component trait and lifecycle hooks
//!
//! Components are trait objects with a small fixed vtable. Every component
//! reports a [`ComponentKind`]; an entity holds at most one component per
//! kind, so adding a second one of the same kind replaces the first.

use std::any::Any;

use crate::foundation::collections::EntityId;
use crate::foundation::math::Transform;

/// Closed set of component slots an entity can fill
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ComponentKind {
    /// Link to a rigid body in the physics world
    PhysicsBody,
    /// Collision shapes and filter of the entity's body
    CollisionShape,
    /// Raycast target that receives interaction events
    Interaction,
    /// Marks the entity as the scene node of a tracked anchor
    Anchor,
    /// Named per-frame behaviour
    Behavior(&'static str),
}

/// Mutable view handed to [`Component::on_update`]
pub struct ComponentContext<'a> {
    /// Entity owning the component
    pub entity: EntityId,
    /// The entity's local transform
    pub transform: &'a mut Transform,
    /// Seconds since the previous update
    pub delta_time: f32,
}

/// Upcasting helpers, implemented for every `'static` type
pub trait AsAny: Any {
    /// Borrow as `dyn Any`
    fn as_any(&self) -> &dyn Any;
    /// Mutably borrow as `dyn Any`
    fn as_any_mut(&mut self) -> &mut dyn Any;
    /// Convert a box into `Box<dyn Any>`
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// Behaviour attachable to an entity
///
/// All hooks default to no-ops. `Send` is required so a graph holding
/// components can sit behind a mutex shared with other threads.
pub trait Component: AsAny + Send {
    /// Slot this component occupies
    fn kind(&self) -> ComponentKind;

    /// Called after the component is stored on `entity`
    fn on_attach(&mut self, _entity: EntityId) {}

    /// Called after the component is taken off `entity`
    fn on_detach(&mut self, _entity: EntityId) {}

    /// Called once per update while the entity is enabled
    fn on_update(&mut self, _context: &mut ComponentContext<'_>) {}
}

/// Component whose kind is known statically, enabling typed lookups
pub trait TypedComponent: Component + Sized {
    /// Slot every instance of this type occupies
    const KIND: ComponentKind;
}

/// Downcast a stored component to a concrete type
pub fn downcast_ref<T: Component>(component: &dyn Component) -> Option<&T> {
    component.as_any().downcast_ref::<T>()
}

/// Mutably downcast a stored component to a concrete type
pub fn downcast_mut<T: Component>(component: &mut dyn Component) -> Option<&mut T> {
    component.as_any_mut().downcast_mut::<T>()
}

/// Downcast an owned component to a concrete type
pub fn downcast_box<T: Component>(component: Box<dyn Component>) -> Option<Box<T>> {
    component.into_any().downcast::<T>().ok()
}
