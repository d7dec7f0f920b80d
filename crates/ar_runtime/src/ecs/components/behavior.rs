//! Closure-backed behaviour component

use crate::ecs::{Component, ComponentContext, ComponentKind};

type UpdateFn = Box<dyn FnMut(&mut ComponentContext<'_>) + Send>;

/// Named per-frame behaviour
///
/// The name doubles as the component slot, so an entity can carry several
/// behaviours as long as their names differ.
///
/// ```
/// # use ar_runtime::ecs::components::BehaviorComponent;
/// # use ar_runtime::foundation::math::{Quat, Vec3};
/// let spin = BehaviorComponent::new("spin", |ctx| {
///     let step = Quat::from_axis_angle(&Vec3::y_axis(), ctx.delta_time);
///     ctx.transform.rotation = step * ctx.transform.rotation;
/// });
/// assert_eq!(spin.name(), "spin");
/// ```
pub struct BehaviorComponent {
    name: &'static str,
    update: UpdateFn,
}

impl BehaviorComponent {
    /// Create a behaviour running `update` every frame
    pub fn new(name: &'static str, update: impl FnMut(&mut ComponentContext<'_>) + Send + 'static) -> Self {
        Self {
            name,
            update: Box::new(update),
        }
    }

    /// Name of the behaviour
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl std::fmt::Debug for BehaviorComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BehaviorComponent").field("name", &self.name).finish_non_exhaustive()
    }
}

impl Component for BehaviorComponent {
    fn kind(&self) -> ComponentKind {
        ComponentKind::Behavior(self.name)
    }

    fn on_update(&mut self, context: &mut ComponentContext<'_>) {
        (self.update)(context);
    }
}
