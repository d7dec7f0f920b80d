//! Built-in components

pub mod anchor;
pub mod behavior;
pub mod interaction;
pub mod physics_body;

pub use anchor::{AnchorComponent, AnchorKind, TrackingState};
pub use behavior::BehaviorComponent;
pub use interaction::{InteractionCallback, InteractionComponent};
pub use physics_body::{CollisionComponent, PhysicsBodyComponent};
