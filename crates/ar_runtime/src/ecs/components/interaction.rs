//! Interaction target component
//!
//! Marks an entity as a raycast target for taps and drags and optionally
//! routes the interaction events addressed to it into a callback.

use crate::ecs::{Component, ComponentKind, TypedComponent};
use crate::events::InteractionEvent;

/// Callback invoked with every interaction event targeting the entity
pub type InteractionCallback = Box<dyn FnMut(&InteractionEvent) + Send>;

/// Component making an entity tappable
///
/// # Examples
/// ```
/// # use ar_runtime::ecs::components::InteractionComponent;
/// let target = InteractionComponent::new()
///     .with_radius(0.25)
///     .with_callback(|event| println!("{event:?}"));
/// assert!(target.enabled);
/// ```
pub struct InteractionComponent {
    /// Whether raycasts consider this entity
    pub enabled: bool,

    /// Hit sphere radius around the entity origin
    ///
    /// When `None`, loaded asset bounds are used instead; an entity with
    /// neither is only hittable through its physics body.
    pub radius: Option<f32>,

    /// Whether the entity may be dragged around on a horizontal plane
    pub draggable: bool,

    callback: Option<InteractionCallback>,
}

impl InteractionComponent {
    /// Create a new interaction component with default settings
    pub fn new() -> Self {
        Self {
            enabled: true,
            radius: None,
            draggable: false,
            callback: None,
        }
    }

    /// Set an explicit hit radius
    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = Some(radius.max(0.0));
        self
    }

    /// Allow dragging
    pub fn with_draggable(mut self, draggable: bool) -> Self {
        self.draggable = draggable;
        self
    }

    /// Set the event callback
    pub fn with_callback(mut self, callback: impl FnMut(&InteractionEvent) + Send + 'static) -> Self {
        self.callback = Some(Box::new(callback));
        self
    }

    /// Deliver an event to the callback, if any
    pub fn notify(&mut self, event: &InteractionEvent) {
        if let Some(callback) = self.callback.as_mut() {
            callback(event);
        }
    }

    /// Whether a callback is registered
    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }

    /// Move the callback out so it can run without the graph lock held
    pub(crate) fn take_callback(&mut self) -> Option<InteractionCallback> {
        self.callback.take()
    }

    /// Put back a callback taken with [`take_callback`](Self::take_callback)
    ///
    /// A callback installed in the meantime wins.
    pub(crate) fn restore_callback(&mut self, callback: InteractionCallback) {
        if self.callback.is_none() {
            self.callback = Some(callback);
        }
    }
}

impl Default for InteractionComponent {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InteractionComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteractionComponent")
            .field("enabled", &self.enabled)
            .field("radius", &self.radius)
            .field("draggable", &self.draggable)
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

impl Component for InteractionComponent {
    fn kind(&self) -> ComponentKind {
        ComponentKind::Interaction
    }
}

impl TypedComponent for InteractionComponent {
    const KIND: ComponentKind = ComponentKind::Interaction;
}
