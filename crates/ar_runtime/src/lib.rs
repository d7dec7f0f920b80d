//! # AR Runtime
//!
//! Scene and simulation runtime for augmented-reality content.
//!
//! ## Features
//!
//! - **Entity Graph**: arena-backed transform hierarchy with typed components
//! - **Physics**: fixed-timestep rigid bodies, contact events and raycasts
//! - **Gestures**: multi-touch tap / pan / pinch / rotation recognition
//! - **Animation**: eased property tracks with delay, loops and auto-reverse
//! - **Coordinator**: session lifecycle, per-tick orchestration and
//!   touch-to-entity interaction
//! - **Persistence**: versioned records for saving and restoring content
//!
//! Tracking, rendering and asset loading live outside this crate. The host
//! feeds camera frames, anchor poses, touches and load results in, and reads
//! interaction events out.
//!
//! ## Quick Start
//!
//! ```rust
//! use ar_runtime::prelude::*;
//!
//! let mut coordinator = Coordinator::new(RuntimeConfig::default());
//! coordinator.request_start().expect("default config is valid");
//! coordinator.session_ready();
//!
//! let root = coordinator.graph().root();
//! let ball = coordinator.graph().spawn(root, "ball").expect("root exists");
//! coordinator.add_physics_body(ball, RigidBodyDesc::dynamic().with_shape(CollisionShape::sphere(0.1)));
//!
//! for _ in 0..60 {
//!     coordinator.tick(1.0 / 60.0);
//! }
//! let fallen = coordinator.graph().world_transform(ball).expect("live");
//! assert!(fallen.position.y < 0.0);
//!
//! coordinator.cleanup();
//! assert_eq!(coordinator.state(), SessionState::Idle);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

// Core runtime modules
pub mod core;

pub mod animation;
pub mod assets;
pub mod config;
pub mod coordinator;
pub mod ecs;
pub mod events;
pub mod foundation;
pub mod input;
pub mod physics;
pub mod scene;

#[cfg(test)]
mod tests;

pub use coordinator::{Coordinator, CoordinatorError, SessionState};

/// Common imports for runtime users
pub mod prelude {
    pub use crate::{
        animation::{Animation, AnimationController, AnimationTrack, Easing, PlaybackState},
        assets::{AssetLoadError, AssetLoadState, MeshBounds},
        coordinator::{AnchorUpdate, Coordinator, CoordinatorError, PickHit, PickTarget, SessionState},
        core::config::{
            AnimationConfig, CoordinatorConfig, GestureConfig, PhysicsConfig, RuntimeConfig,
        },
        ecs::components::{
            AnchorComponent, AnchorKind, BehaviorComponent, InteractionComponent, PhysicsBodyComponent,
            TrackingState,
        },
        ecs::{Component, ComponentContext, ComponentKind, TypedComponent},
        events::{EventHandler, InteractionEvent, InteractionKind},
        foundation::{
            collections::{AnimationId, BodyHandle, EntityId},
            math::{Mat4, Quat, Transform, Vec2, Vec3},
        },
        input::{CameraFrame, GestureEvent, GestureKind, GestureState, TouchPoint, Viewport},
        physics::{BodyKind, CollisionGroups, CollisionShape, PhysicsWorld, RigidBodyDesc},
        scene::{EntityGraph, SceneRecord, SharedEntityGraph},
    };
}
