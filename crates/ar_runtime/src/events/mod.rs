//! Interaction event queue
//!
//! Key principles:
//! - Typed events (one enum, no stringly keyed arguments)
//! - Handler returns bool (true = consumed, stops forwarding)
//! - Registration system (only notify interested handlers)
//! - Events no handler consumed stay queued for polling
//!
//! The coordinator pushes events while it ticks and dispatches them once at
//! the end of the tick, so handlers always run in emission order and never
//! in the middle of a subsystem update.

use std::collections::HashMap;

use crate::foundation::collections::EntityId;
use crate::foundation::math::{Vec2, Vec3};
use crate::input::GestureState;
use crate::physics::{CollisionContact, TriggerOverlap};

/// Where a raycast hit an interaction target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InteractionHit {
    /// Entity that was hit
    pub entity: EntityId,
    /// World-space hit point
    pub point: Vec3,
    /// Approximate surface normal
    pub normal: Vec3,
    /// Distance from the ray origin
    pub distance: f32,
}

/// Event type identification, used to register handlers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractionKind {
    /// Single tap on an entity
    Tap,
    /// Double tap on an entity
    DoubleTap,
    /// Long press on an entity
    LongPress,
    /// Tap that hit no entity
    BackgroundTap,
    /// Drag of an entity started
    DragStarted,
    /// Dragged entity moved
    DragUpdated,
    /// Drag of an entity finished
    DragEnded,
    /// Two-finger pinch
    Pinch,
    /// Two-finger rotation
    Rotate,
    /// Two bodies started touching
    CollisionBegan,
    /// Two bodies kept touching
    CollisionStay,
    /// Two bodies stopped touching
    CollisionEnded,
    /// A body entered a trigger
    TriggerEntered,
    /// A body left a trigger
    TriggerExited,
}

/// High-level interaction produced by the coordinator
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InteractionEvent {
    /// Single tap on an entity
    Tap {
        /// Raycast hit
        hit: InteractionHit,
        /// Touch location in screen points
        screen: Vec2,
    },
    /// Double tap on an entity
    DoubleTap {
        /// Raycast hit
        hit: InteractionHit,
        /// Touch location in screen points
        screen: Vec2,
    },
    /// Long press on an entity
    LongPress {
        /// Raycast hit
        hit: InteractionHit,
        /// Touch location in screen points
        screen: Vec2,
    },
    /// Tap that hit no entity
    BackgroundTap {
        /// Touch location in screen points
        screen: Vec2,
        /// Surface point hit by the ray, if any surface was hit
        world_position: Option<Vec3>,
    },
    /// Drag of an entity started
    DragStarted {
        /// Dragged entity
        entity: EntityId,
        /// Touch location in screen points
        screen: Vec2,
        /// Where the entity is being held
        world_position: Vec3,
    },
    /// Dragged entity moved
    DragUpdated {
        /// Dragged entity
        entity: EntityId,
        /// Touch location in screen points
        screen: Vec2,
        /// New world position of the entity
        world_position: Vec3,
        /// Screen offset since the drag started
        translation: Vec2,
    },
    /// Drag of an entity finished
    DragEnded {
        /// Dragged entity
        entity: EntityId,
        /// Touch location in screen points
        screen: Vec2,
        /// Final world position of the entity
        world_position: Vec3,
        /// Smoothed screen velocity at release
        velocity: Vec2,
    },
    /// Two-finger pinch
    Pinch {
        /// Entity under the pinch centroid, if any
        entity: Option<EntityId>,
        /// Gesture transition
        state: GestureState,
        /// Distance ratio since the pinch started
        scale: f32,
    },
    /// Two-finger rotation
    Rotate {
        /// Entity under the rotation centroid, if any
        entity: Option<EntityId>,
        /// Gesture transition
        state: GestureState,
        /// Angle change in radians
        rotation: f32,
    },
    /// Two bodies started touching
    CollisionBegan(CollisionContact),
    /// Two bodies kept touching
    CollisionStay(CollisionContact),
    /// Two bodies stopped touching
    CollisionEnded(CollisionContact),
    /// A body entered a trigger
    TriggerEntered(TriggerOverlap),
    /// A body left a trigger
    TriggerExited(TriggerOverlap),
}

impl InteractionEvent {
    /// Type of this event
    pub fn kind(&self) -> InteractionKind {
        match self {
            Self::Tap { .. } => InteractionKind::Tap,
            Self::DoubleTap { .. } => InteractionKind::DoubleTap,
            Self::LongPress { .. } => InteractionKind::LongPress,
            Self::BackgroundTap { .. } => InteractionKind::BackgroundTap,
            Self::DragStarted { .. } => InteractionKind::DragStarted,
            Self::DragUpdated { .. } => InteractionKind::DragUpdated,
            Self::DragEnded { .. } => InteractionKind::DragEnded,
            Self::Pinch { .. } => InteractionKind::Pinch,
            Self::Rotate { .. } => InteractionKind::Rotate,
            Self::CollisionBegan(_) => InteractionKind::CollisionBegan,
            Self::CollisionStay(_) => InteractionKind::CollisionStay,
            Self::CollisionEnded(_) => InteractionKind::CollisionEnded,
            Self::TriggerEntered(_) => InteractionKind::TriggerEntered,
            Self::TriggerExited(_) => InteractionKind::TriggerExited,
        }
    }

    /// Entity the event is addressed to
    ///
    /// Collision events go to the body's own entity, trigger events to the
    /// trigger's entity.
    pub fn target(&self) -> Option<EntityId> {
        match self {
            Self::Tap { hit, .. } | Self::DoubleTap { hit, .. } | Self::LongPress { hit, .. } => Some(hit.entity),
            Self::BackgroundTap { .. } => None,
            Self::DragStarted { entity, .. } | Self::DragUpdated { entity, .. } | Self::DragEnded { entity, .. } => {
                Some(*entity)
            }
            Self::Pinch { entity, .. } | Self::Rotate { entity, .. } => *entity,
            Self::CollisionBegan(contact) | Self::CollisionStay(contact) | Self::CollisionEnded(contact) => {
                Some(contact.entity)
            }
            Self::TriggerEntered(overlap) | Self::TriggerExited(overlap) => Some(overlap.trigger_entity),
        }
    }
}

/// Event handler trait
/// Returns true if event was consumed (stops forwarding)
/// Returns false to allow forwarding to other handlers
pub trait EventHandler: Send {
    /// Handle an event, return true if consumed
    fn on_event(&mut self, event: &InteractionEvent) -> bool;
}

impl<F> EventHandler for F
where
    F: FnMut(&InteractionEvent) -> bool + Send,
{
    fn on_event(&mut self, event: &InteractionEvent) -> bool {
        self(event)
    }
}

/// Event queue with handler registration and polling
#[derive(Default)]
pub struct EventQueue {
    pending: Vec<InteractionEvent>,
    unhandled: Vec<InteractionEvent>,
    handlers: HashMap<InteractionKind, Vec<Box<dyn EventHandler>>>,
}

impl EventQueue {
    /// Create a new empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a specific event type
    /// Only handlers registered for this type will be notified
    pub fn register_handler(&mut self, kind: InteractionKind, handler: impl EventHandler + 'static) {
        self.handlers.entry(kind).or_default().push(Box::new(handler));
    }

    /// Remove every handler registered for `kind`
    pub fn clear_handlers(&mut self, kind: InteractionKind) {
        self.handlers.remove(&kind);
    }

    /// Queue an event for the next dispatch
    pub fn send(&mut self, event: InteractionEvent) {
        self.pending.push(event);
    }

    /// Number of events waiting for dispatch
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Deliver queued events to handlers in emission order
    ///
    /// Handlers are asked in registration order until one consumes the
    /// event. Events nobody consumed are kept for [`drain`](Self::drain).
    /// Returns the number of events dispatched.
    pub fn dispatch(&mut self) -> usize {
        let pending = std::mem::take(&mut self.pending);
        let count = pending.len();
        for event in pending {
            if !self.dispatch_event(&event) {
                self.unhandled.push(event);
            }
        }
        count
    }

    fn dispatch_event(&mut self, event: &InteractionEvent) -> bool {
        match self.handlers.get_mut(&event.kind()) {
            Some(handlers) => handlers.iter_mut().any(|handler| handler.on_event(event)),
            None => false,
        }
    }

    /// Take every event no handler consumed, oldest first
    pub fn drain(&mut self) -> Vec<InteractionEvent> {
        std::mem::take(&mut self.unhandled)
    }

    /// Drop queued and unconsumed events, keeping handlers
    pub fn clear(&mut self) {
        self.pending.clear();
        self.unhandled.clear();
    }
}

impl std::fmt::Debug for EventQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventQueue")
            .field("pending", &self.pending.len())
            .field("unhandled", &self.unhandled.len())
            .field("handler_kinds", &self.handlers.len())
            .finish()
    }
}
