//! The coordinator owning one AR session
//!
//! The coordinator ties the subsystems together and drives them from a
//! single update thread. One call to [`Coordinator::tick`] runs, in order:
//!
//! 1. animations (completion callbacks fire with no lock held)
//! 2. physics: kinematic and static bodies follow their entities, the world
//!    steps, dynamic bodies write their pose back
//! 3. entity component updates
//! 4. gestures, resolved into interaction events through raycasts
//! 5. event delivery to entity callbacks and registered handlers
//!
//! Nothing here blocks on the tracking subsystem. Session readiness, anchor
//! poses, camera frames and asset loads arrive through plain method calls.

use std::collections::HashMap;

use log::{debug, error, info, trace, warn};
use thiserror::Error;

use super::anchors::{AnchorRegistry, AnchorUpdate};
use super::lifecycle::{LifecycleEvent, SessionState};
use super::picking::{self, PickHit, PickTarget};
use crate::animation::{Animation, AnimationController, CompletionCallback};
use crate::assets::{AssetLoadError, AssetLoadState, AssetRequestId, AssetRequests, MeshBounds};
use crate::core::config::{has_errors, ConfigIssue, RuntimeConfig, Severity};
use crate::ecs::components::{CollisionComponent, InteractionCallback, InteractionComponent, PhysicsBodyComponent};
use crate::ecs::ComponentKind;
use crate::events::{EventHandler, EventQueue, InteractionEvent, InteractionHit, InteractionKind};
use crate::foundation::collections::{AnimationId, BodyHandle, EntityId};
use crate::foundation::math::{Quat, Transform, Vec2, Vec3};
use crate::foundation::time::FrameRateCounter;
use crate::input::{CameraFrame, GestureEvent, GestureKind, GestureState, SharedGestureRecognizer, TouchPoint};
use crate::physics::{PhysicsEvent, PhysicsWorld, RigidBodyDesc};
use crate::scene::persistence::{capture_scene, restore_scene};
use crate::scene::{EntityGraph, ListSpatialIndex, PersistenceError, SceneRecord, SharedEntityGraph, SpatialIndex};

/// Coordinator errors
#[derive(Error, Debug)]
pub enum CoordinatorError {
    /// Configuration contains error-level issues
    #[error("Invalid configuration ({} errors)", .0.len())]
    InvalidConfig(Vec<ConfigIssue>),

    /// The tracking session could not start
    #[error("Session failed: {0}")]
    SessionFailed(String),

    /// The request id is unknown, already finished or was cancelled
    #[error("Unknown asset request {0:?}")]
    UnknownAssetRequest(AssetRequestId),

    /// Saving or restoring scene records failed
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

/// Entity being dragged across a horizontal plane
#[derive(Debug, Clone, Copy)]
struct DragSession {
    entity: EntityId,
    plane_height: f32,
    grab_offset: Vec3,
    start_screen: Vec2,
}

/// Target of the current pinch / rotation pair
#[derive(Debug, Clone, Copy)]
struct TwoFingerSession {
    entity: Option<EntityId>,
    start: Option<Transform>,
    scale: f32,
    rotation: f32,
    pinching: bool,
    rotating: bool,
}

/// Runtime of one AR session
pub struct Coordinator {
    config: RuntimeConfig,
    state: SessionState,
    failure: Option<String>,

    graph: SharedEntityGraph,
    physics: PhysicsWorld,
    animations: AnimationController,
    gestures: SharedGestureRecognizer,
    events: EventQueue,
    outbox: Vec<InteractionEvent>,

    anchors: AnchorRegistry,
    assets: AssetRequests,
    index: ListSpatialIndex,
    camera: CameraFrame,

    frame_rate: FrameRateCounter,
    clock: f64,
    tick_count: u64,

    drag: Option<DragSession>,
    two_finger: Option<TwoFingerSession>,
}

impl Coordinator {
    /// Create an idle coordinator with a fresh entity graph
    pub fn new(config: RuntimeConfig) -> Self {
        Self::with_graph(config, SharedEntityGraph::new())
    }

    /// Create an idle coordinator driving an existing graph
    pub fn with_graph(config: RuntimeConfig, graph: SharedEntityGraph) -> Self {
        Self {
            physics: PhysicsWorld::new(config.physics.clone()),
            animations: AnimationController::new(&config.animation),
            gestures: SharedGestureRecognizer::new(config.gestures.clone()),
            frame_rate: FrameRateCounter::new(config.coordinator.frame_rate_interval),
            config,
            state: SessionState::Idle,
            failure: None,
            graph,
            events: EventQueue::new(),
            outbox: Vec::new(),
            anchors: AnchorRegistry::new(),
            assets: AssetRequests::new(),
            index: ListSpatialIndex::new(),
            camera: CameraFrame::default(),
            clock: 0.0,
            tick_count: 0,
            drag: None,
            two_finger: None,
        }
    }

    // ---- accessors ----

    /// Configuration the coordinator was built with
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Why the session last entered the error state
    pub fn last_failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// Handle to the entity graph
    pub fn graph(&self) -> &SharedEntityGraph {
        &self.graph
    }

    /// The physics world
    pub fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }

    /// Mutable access to the physics world
    pub fn physics_mut(&mut self) -> &mut PhysicsWorld {
        &mut self.physics
    }

    /// The animation controller
    pub fn animations(&self) -> &AnimationController {
        &self.animations
    }

    /// Mutable access to the animation controller
    pub fn animations_mut(&mut self) -> &mut AnimationController {
        &mut self.animations
    }

    /// Handle to the gesture recognizer, for delivering touches from
    /// another thread
    pub fn gestures(&self) -> &SharedGestureRecognizer {
        &self.gestures
    }

    /// The interaction event queue
    pub fn events_mut(&mut self) -> &mut EventQueue {
        &mut self.events
    }

    /// Known anchors
    pub fn anchors(&self) -> &AnchorRegistry {
        &self.anchors
    }

    /// Latest camera frame
    pub fn camera_frame(&self) -> &CameraFrame {
        &self.camera
    }

    /// Last frame-rate reading
    pub fn frame_rate(&self) -> f32 {
        self.frame_rate.fps()
    }

    /// Ticks run since the session became active
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Session time in seconds; touch timestamps share this timebase
    pub fn clock(&self) -> f64 {
        self.clock
    }

    // ---- lifecycle ----

    fn transition(&mut self, event: LifecycleEvent) -> bool {
        match self.state.transition(event) {
            Some(next) => {
                debug!("Session {} -> {} ({:?})", self.state, next, event);
                self.state = next;
                true
            }
            None => {
                debug!("Ignoring {:?} in state {}", event, self.state);
                false
            }
        }
    }

    /// Begin starting the session
    ///
    /// Returns immediately. Validation errors move the session to
    /// [`SessionState::Error`]; otherwise it waits in
    /// [`SessionState::Setup`] for [`session_ready`](Self::session_ready).
    /// Calling this outside `Idle` does nothing.
    pub fn request_start(&mut self) -> Result<(), CoordinatorError> {
        if !self.transition(LifecycleEvent::RequestStart) {
            return Ok(());
        }
        self.failure = None;

        let issues = self.config.validate();
        for issue in &issues {
            match issue.severity {
                Severity::Warning => warn!("{}", issue),
                Severity::Error => error!("{}", issue),
            }
        }
        if has_errors(&issues) {
            let errors: Vec<ConfigIssue> = issues
                .into_iter()
                .filter(|issue| issue.severity == Severity::Error)
                .collect();
            let err = CoordinatorError::InvalidConfig(errors);
            self.failure = Some(err.to_string());
            self.transition(LifecycleEvent::Failed);
            return Err(err);
        }

        info!("Session setup started");
        Ok(())
    }

    /// Tracking session is running; start ticking
    pub fn session_ready(&mut self) {
        if self.transition(LifecycleEvent::Ready) {
            self.frame_rate.reset();
            info!("Session active");
        }
    }

    /// Tracking session could not start
    pub fn session_failed(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        if self.transition(LifecycleEvent::Failed) {
            error!("Session failed: {}", reason);
            self.failure = Some(CoordinatorError::SessionFailed(reason).to_string());
        }
    }

    /// Interrupt ticking; touches in flight are dropped
    pub fn pause(&mut self) {
        if self.transition(LifecycleEvent::Pause) {
            self.gestures.reset();
            self.drag = None;
            self.two_finger = None;
        }
    }

    /// Continue after [`pause`](Self::pause)
    pub fn resume(&mut self) {
        if self.transition(LifecycleEvent::Resume) {
            self.frame_rate.reset();
        }
    }

    /// Leave the error state
    pub fn reset(&mut self) {
        if self.transition(LifecycleEvent::Reset) {
            self.failure = None;
        }
    }

    /// Release every owned subsystem and return to idle
    ///
    /// Idempotent. Animations are dropped without running their callbacks
    /// and undelivered events are discarded. Entities stay in the graph but
    /// lose their physics-body and collision components. Anchor entities
    /// are hidden until their anchor is reported again.
    pub fn cleanup(&mut self) {
        if !self.transition(LifecycleEvent::BeginCleanup) {
            return;
        }

        self.animations.clear();
        self.physics.clear();
        self.gestures.reset();
        self.events.clear();
        self.outbox.clear();
        self.assets.clear();
        self.index.clear();
        self.drag = None;
        self.two_finger = None;
        self.frame_rate.reset();

        {
            let mut graph = self.graph.lock();
            self.anchors.suspend(&mut graph);
            for entity in graph.entities_with_component(ComponentKind::PhysicsBody) {
                graph.remove_component_kind(entity, ComponentKind::PhysicsBody);
                graph.remove_component_kind(entity, ComponentKind::CollisionShape);
            }
        }

        self.transition(LifecycleEvent::CleanupFinished);
        info!("Session cleaned up after {} ticks", self.tick_count);
    }

    // ---- per-frame input ----

    /// Record the latest camera frame
    ///
    /// The session clock never runs behind frame timestamps.
    pub fn set_camera_frame(&mut self, frame: CameraFrame) {
        self.clock = self.clock.max(frame.timestamp);
        self.camera = frame;
    }

    /// See [`GestureRecognizer::touches_began`](crate::input::GestureRecognizer::touches_began)
    pub fn touches_began(&self, points: &[TouchPoint]) {
        self.gestures.touches_began(points);
    }

    /// See [`GestureRecognizer::touches_moved`](crate::input::GestureRecognizer::touches_moved)
    pub fn touches_moved(&self, points: &[TouchPoint]) {
        self.gestures.touches_moved(points);
    }

    /// See [`GestureRecognizer::touches_ended`](crate::input::GestureRecognizer::touches_ended)
    pub fn touches_ended(&self, points: &[TouchPoint]) {
        self.gestures.touches_ended(points);
    }

    /// See [`GestureRecognizer::touches_cancelled`](crate::input::GestureRecognizer::touches_cancelled)
    pub fn touches_cancelled(&self, points: &[TouchPoint]) {
        self.gestures.touches_cancelled(points);
    }

    // ---- events ----

    /// Register a handler for one interaction kind
    pub fn register_handler(&mut self, kind: InteractionKind, handler: impl EventHandler + 'static) {
        self.events.register_handler(kind, handler);
    }

    /// Take every event no handler consumed, oldest first
    pub fn drain_events(&mut self) -> Vec<InteractionEvent> {
        self.events.drain()
    }

    // ---- tick ----

    /// Run one update
    ///
    /// Does nothing unless the session is active. Returns whether the tick
    /// ran.
    pub fn tick(&mut self, delta_time: f32) -> bool {
        if !self.state.is_running() {
            trace!("Tick skipped in state {}", self.state);
            return false;
        }
        let delta_time = if delta_time.is_finite() { delta_time.max(0.0) } else { 0.0 };

        self.clock += f64::from(delta_time);
        self.tick_count += 1;
        if let Some(fps) = self.frame_rate.tick(delta_time) {
            debug!("Frame rate: {:.1} fps", fps);
        }

        let completions = self.update_animations(delta_time);
        for callback in completions {
            callback();
        }
        self.animations.prune();

        self.update_scene(delta_time);

        let gestures = self.gestures.poll(self.clock);
        for gesture in &gestures {
            self.handle_gesture(gesture);
        }

        self.deliver_events();
        true
    }

    fn update_animations(&mut self, delta_time: f32) -> Vec<CompletionCallback> {
        let shared = self.graph.clone();
        let mut graph = shared.lock();
        self.animations.advance(delta_time, &mut graph)
    }

    fn update_scene(&mut self, delta_time: f32) {
        let shared = self.graph.clone();
        let mut graph = shared.lock();

        if self.config.coordinator.enable_physics {
            self.step_physics(&mut graph, delta_time);
        }
        graph.update(delta_time);
        picking::refresh_interaction_index(&graph, &mut self.index);
    }

    fn step_physics(&mut self, graph: &mut EntityGraph, delta_time: f32) {
        let mut orphans = Vec::new();
        let mut followers = Vec::new();
        for (handle, body) in self.physics.bodies() {
            let owner = body.owner();
            let linked = graph
                .get_component::<PhysicsBodyComponent>(owner)
                .map_or(false, |component| component.handle == handle);
            if !linked {
                orphans.push(handle);
            } else if !body.drives_pose() {
                if let Some(world) = graph.world_transform(owner) {
                    followers.push((handle, world));
                }
            }
        }
        for handle in orphans {
            debug!("Removing orphaned body {:?}", handle);
            self.physics.remove_body(handle);
        }
        for (handle, world) in followers {
            self.physics.set_pose(handle, world.position, world.rotation);
        }

        let steps = self.physics.simulate(delta_time);
        if steps == 0 {
            return;
        }

        let dragged = self.drag.map(|drag| drag.entity);
        for (_, body) in self.physics.bodies() {
            if body.drives_pose() && Some(body.owner()) != dragged {
                graph.set_world_pose(body.owner(), body.position, body.rotation);
            }
        }

        for event in self.physics.drain_events() {
            self.outbox.push(match event {
                PhysicsEvent::CollisionBegan(contact) => InteractionEvent::CollisionBegan(contact),
                PhysicsEvent::CollisionStay(contact) => InteractionEvent::CollisionStay(contact),
                PhysicsEvent::CollisionEnded(contact) => InteractionEvent::CollisionEnded(contact),
                PhysicsEvent::TriggerEntered(overlap) => InteractionEvent::TriggerEntered(overlap),
                PhysicsEvent::TriggerExited(overlap) => InteractionEvent::TriggerExited(overlap),
            });
        }
    }

    /// Hand queued events to entity callbacks, then to the event queue
    ///
    /// Entity callbacks are moved out of the graph while they run, so they
    /// may lock the graph themselves.
    fn deliver_events(&mut self) {
        let outbox = std::mem::take(&mut self.outbox);
        if outbox.is_empty() {
            return;
        }

        let mut callbacks: HashMap<EntityId, InteractionCallback> = HashMap::new();
        {
            let mut graph = self.graph.lock();
            for target in outbox.iter().filter_map(InteractionEvent::target) {
                if callbacks.contains_key(&target) {
                    continue;
                }
                let callback = graph
                    .get_component_mut::<InteractionComponent>(target)
                    .filter(|component| component.enabled)
                    .and_then(InteractionComponent::take_callback);
                if let Some(callback) = callback {
                    callbacks.insert(target, callback);
                }
            }
        }

        for event in outbox {
            if let Some(callback) = event.target().and_then(|target| callbacks.get_mut(&target)) {
                callback(&event);
            }
            self.events.send(event);
        }

        if !callbacks.is_empty() {
            let mut graph = self.graph.lock();
            for (entity, callback) in callbacks {
                if let Some(component) = graph.get_component_mut::<InteractionComponent>(entity) {
                    component.restore_callback(callback);
                }
            }
        }

        let dispatched = self.events.dispatch();
        trace!("Dispatched {} interaction events", dispatched);
    }

    // ---- gestures ----

    /// Every hit under a screen point, nearest first
    pub fn pick(&self, screen: Vec2) -> Vec<PickHit> {
        let graph = self.graph.lock();
        self.pick_in(&graph, screen)
    }

    fn pick_in(&self, graph: &EntityGraph, screen: Vec2) -> Vec<PickHit> {
        match self.camera.ray_from_screen(screen) {
            Some(ray) => picking::pick(
                graph,
                &self.physics,
                &self.index,
                &ray,
                self.config.coordinator.max_raycast_distance,
            ),
            None => Vec::new(),
        }
    }

    fn handle_gesture(&mut self, gesture: &GestureEvent) {
        trace!("Gesture {:?} {:?} at {:?}", gesture.kind, gesture.state, gesture.location);
        match gesture.kind {
            GestureKind::Tap | GestureKind::DoubleTap => self.resolve_tap(gesture),
            GestureKind::LongPress if gesture.state == GestureState::Began => self.resolve_tap(gesture),
            GestureKind::Pan | GestureKind::Drag => self.handle_drag(gesture),
            GestureKind::Pinch | GestureKind::Rotation => self.handle_two_finger(gesture),
            GestureKind::LongPress | GestureKind::Swipe => {}
        }
    }

    /// Tap, double tap and long press: nearest entity or background
    fn resolve_tap(&mut self, gesture: &GestureEvent) {
        let screen = gesture.location;
        let hits = {
            let graph = self.graph.lock();
            self.pick_in(&graph, screen)
        };

        let Some(nearest) = hits.first() else {
            if gesture.kind == GestureKind::Tap {
                self.outbox.push(InteractionEvent::BackgroundTap {
                    screen,
                    world_position: None,
                });
            }
            return;
        };

        let hit = match nearest.target {
            PickTarget::Entity(entity) => InteractionHit {
                entity,
                point: nearest.point,
                normal: nearest.normal,
                distance: nearest.distance,
            },
            PickTarget::Surface(_) => {
                if gesture.kind == GestureKind::Tap {
                    self.outbox.push(InteractionEvent::BackgroundTap {
                        screen,
                        world_position: Some(nearest.point),
                    });
                }
                return;
            }
        };

        self.outbox.push(match gesture.kind {
            GestureKind::DoubleTap => InteractionEvent::DoubleTap { hit, screen },
            GestureKind::LongPress => InteractionEvent::LongPress { hit, screen },
            _ => InteractionEvent::Tap { hit, screen },
        });
    }

    fn handle_drag(&mut self, gesture: &GestureEvent) {
        match gesture.state {
            GestureState::Began => self.begin_drag(gesture),
            GestureState::Changed => self.update_drag(gesture),
            GestureState::Ended | GestureState::Cancelled | GestureState::Failed => self.end_drag(gesture),
            GestureState::Possible => {}
        }
    }

    fn begin_drag(&mut self, gesture: &GestureEvent) {
        let shared = self.graph.clone();
        let mut graph = shared.lock();

        let start_screen = gesture.location - gesture.translation;
        let Some(entity) = self.pick_in(&graph, start_screen).first().and_then(PickHit::entity) else {
            return;
        };
        let draggable = graph
            .get_component::<InteractionComponent>(entity)
            .map_or(false, |component| component.enabled && component.draggable);
        if !draggable {
            return;
        }
        let Some(position) = graph.world_position(entity) else {
            return;
        };

        let grab_point = self
            .camera
            .ray_from_screen(start_screen)
            .and_then(|ray| ray.intersect_horizontal_plane(position.y).map(|t| ray.point_at(t)));
        let grab_offset = grab_point.map_or_else(Vec3::zeros, |point| position - point);

        let session = DragSession {
            entity,
            plane_height: position.y,
            grab_offset,
            start_screen,
        };
        self.drag = Some(session);
        debug!("Drag of {:?} started", entity);

        let world_position = self
            .move_dragged(&mut graph, session, gesture.location)
            .unwrap_or(position);
        self.outbox.push(InteractionEvent::DragStarted {
            entity,
            screen: gesture.location,
            world_position,
        });
    }

    fn update_drag(&mut self, gesture: &GestureEvent) {
        let Some(session) = self.drag else {
            return;
        };
        let shared = self.graph.clone();
        let mut graph = shared.lock();
        if !graph.contains(session.entity) {
            self.drag = None;
            return;
        }
        if let Some(world_position) = self.move_dragged(&mut graph, session, gesture.location) {
            self.outbox.push(InteractionEvent::DragUpdated {
                entity: session.entity,
                screen: gesture.location,
                world_position,
                translation: gesture.location - session.start_screen,
            });
        }
    }

    fn end_drag(&mut self, gesture: &GestureEvent) {
        let Some(session) = self.drag.take() else {
            return;
        };
        let world_position = {
            let graph = self.graph.lock();
            graph.world_position(session.entity)
        };
        let Some(world_position) = world_position else {
            return;
        };
        debug!("Drag of {:?} ended", session.entity);
        self.outbox.push(InteractionEvent::DragEnded {
            entity: session.entity,
            screen: gesture.location,
            world_position,
            velocity: gesture.velocity,
        });
    }

    /// Move the dragged entity under `screen`; returns its new position
    fn move_dragged(&mut self, graph: &mut EntityGraph, session: DragSession, screen: Vec2) -> Option<Vec3> {
        let ray = self.camera.ray_from_screen(screen)?;
        let t = ray.intersect_horizontal_plane(session.plane_height)?;
        let target = ray.point_at(t) + session.grab_offset;
        let rotation = graph.world_transform(session.entity)?.rotation;
        graph.set_world_pose(session.entity, target, rotation);

        if let Some(handle) = graph
            .get_component::<PhysicsBodyComponent>(session.entity)
            .map(|component| component.handle)
        {
            self.physics.set_pose(handle, target, rotation);
            self.physics.set_linear_velocity(handle, Vec3::zeros());
        }
        Some(target)
    }

    fn handle_two_finger(&mut self, gesture: &GestureEvent) {
        let shared = self.graph.clone();
        let mut graph = shared.lock();

        let mut session = match self.two_finger {
            Some(session) => session,
            None => {
                if gesture.state != GestureState::Began {
                    return;
                }
                let entity = self.pick_in(&graph, gesture.location).first().and_then(PickHit::entity);
                let manipulable = entity.map_or(false, |entity| {
                    graph
                        .get_component::<InteractionComponent>(entity)
                        .map_or(false, |component| component.enabled && component.draggable)
                });
                TwoFingerSession {
                    entity,
                    start: entity.filter(|_| manipulable).and_then(|entity| graph.local_transform(entity)),
                    scale: 1.0,
                    rotation: 0.0,
                    pinching: false,
                    rotating: false,
                }
            }
        };

        let active = gesture.state.is_active();
        match gesture.kind {
            GestureKind::Pinch => {
                session.scale = gesture.scale;
                session.pinching = active;
                self.outbox.push(InteractionEvent::Pinch {
                    entity: session.entity,
                    state: gesture.state,
                    scale: gesture.scale,
                });
            }
            _ => {
                session.rotation = gesture.rotation;
                session.rotating = active;
                self.outbox.push(InteractionEvent::Rotate {
                    entity: session.entity,
                    state: gesture.state,
                    rotation: gesture.rotation,
                });
            }
        }

        if let (Some(entity), Some(start)) = (session.entity, session.start) {
            if gesture.state != GestureState::Cancelled {
                // Screen rotation is clockwise-positive; spin about world up
                let spin = Quat::from_axis_angle(&Vec3::y_axis(), -session.rotation);
                let transform = start
                    .with_scale(start.positive_scale() * session.scale.max(f32::EPSILON))
                    .with_rotation(spin * start.normalized_rotation());
                graph.set_local_transform(entity, transform);
            } else {
                graph.set_local_transform(entity, start);
            }
        }

        self.two_finger = (session.pinching || session.rotating).then_some(session);
    }

    // ---- entities ----

    /// Give `entity` a rigid body at its current world pose
    ///
    /// The descriptor's position and rotation are replaced. An existing body
    /// of the entity is removed first. Returns `None` for unknown entities.
    pub fn add_physics_body(&mut self, entity: EntityId, desc: RigidBodyDesc) -> Option<BodyHandle> {
        let mut graph = self.graph.lock();
        let world = graph.world_transform(entity)?;

        if let Some(old) = graph
            .get_component::<PhysicsBodyComponent>(entity)
            .map(|component| component.handle)
        {
            self.physics.remove_body(old);
        }

        let collision = CollisionComponent::new(desc.shapes.clone())
            .with_filter(desc.filter)
            .with_trigger(desc.is_trigger);
        let handle = self
            .physics
            .add_body(entity, desc.with_position(world.position).with_rotation(world.rotation));
        graph.add_component(entity, PhysicsBodyComponent::new(handle));
        graph.add_component(entity, collision);
        Some(handle)
    }

    /// Remove the rigid body of `entity`
    pub fn remove_physics_body(&mut self, entity: EntityId) -> bool {
        let mut graph = self.graph.lock();
        graph.remove_component_kind(entity, ComponentKind::CollisionShape);
        match graph.remove_component::<PhysicsBodyComponent>(entity) {
            Some(component) => self.physics.remove_body(component.handle).is_some(),
            None => false,
        }
    }

    /// Destroy `entity` with its subtree, releasing everything tied to it
    ///
    /// Bodies are removed, animations stopped and pending asset loads
    /// cancelled. Returns the destroyed entities.
    pub fn destroy_entity(&mut self, entity: EntityId) -> Vec<EntityId> {
        let destroyed = self.graph.destroy(entity);
        self.release(&destroyed);
        destroyed
    }

    fn release(&mut self, destroyed: &[EntityId]) {
        for &entity in destroyed {
            self.physics.remove_bodies_for_entity(entity);
            self.animations.stop_all_for(entity);
            self.assets.cancel_for(entity);
            self.index.remove(entity);
            if self.drag.map_or(false, |drag| drag.entity == entity) {
                self.drag = None;
            }
        }
    }

    /// Start an animation
    pub fn play_animation(&mut self, animation: Animation) -> AnimationId {
        self.animations.play(animation)
    }

    // ---- anchors ----

    /// Create or move the entity of a tracked anchor
    pub fn update_anchor(&mut self, update: &AnchorUpdate) -> EntityId {
        let mut graph = self.graph.lock();
        self.anchors.apply(&mut graph, update)
    }

    /// Place `entity` under an anchor; false if the anchor is unknown
    pub fn attach_to_anchor(&mut self, anchor_id: &str, entity: EntityId) -> bool {
        let mut graph = self.graph.lock();
        self.anchors.attach(&mut graph, anchor_id, entity)
    }

    /// Entity of a tracked anchor
    pub fn anchor_entity(&self, anchor_id: &str) -> Option<EntityId> {
        self.anchors.get(anchor_id)
    }

    /// Forget an anchor, destroying its entity and everything attached
    pub fn remove_anchor(&mut self, anchor_id: &str) -> Vec<EntityId> {
        let destroyed = {
            let mut graph = self.graph.lock();
            self.anchors.remove(&mut graph, anchor_id)
        };
        self.release(&destroyed);
        destroyed
    }

    // ---- assets ----

    /// Mark `entity` as waiting for content from `source`
    ///
    /// A load already in flight for the entity is superseded.
    pub fn request_asset(&mut self, entity: EntityId, source: impl Into<String>) -> Option<AssetRequestId> {
        let mut graph = self.graph.lock();
        let node = graph.get_mut(entity)?;
        let source = source.into();

        self.assets.cancel_for(entity);
        let request = self.assets.begin(entity, source.clone());
        debug!("Asset '{}' requested for {:?}", source, entity);
        node.asset_state = AssetLoadState::Loading { request, source };
        Some(request)
    }

    /// Attach the outcome of a load to its entity
    ///
    /// Load failures are recorded on the entity and are not errors here.
    /// Fails only when the request is unknown or its entity is gone.
    pub fn complete_asset_load(
        &mut self,
        request: AssetRequestId,
        result: Result<MeshBounds, AssetLoadError>,
    ) -> Result<EntityId, CoordinatorError> {
        let pending = self
            .assets
            .finish(request)
            .ok_or(CoordinatorError::UnknownAssetRequest(request))?;

        let mut graph = self.graph.lock();
        let node = graph
            .get_mut(pending.entity)
            .ok_or(CoordinatorError::UnknownAssetRequest(request))?;

        node.asset_state = match result {
            Ok(bounds) => {
                debug!("Asset '{}' loaded for {:?}", pending.source, pending.entity);
                AssetLoadState::Loaded(bounds)
            }
            Err(err) => {
                warn!("Asset '{}' failed for {:?}: {}", pending.source, pending.entity, err);
                AssetLoadState::Failed(err)
            }
        };
        Ok(pending.entity)
    }

    // ---- persistence ----

    /// Capture every non-anchor entity as a scene record
    pub fn save_scene(&self) -> SceneRecord {
        capture_scene(&self.graph.lock())
    }

    /// Restore a scene record into the graph
    pub fn load_scene(&mut self, record: &SceneRecord) -> Result<Vec<EntityId>, CoordinatorError> {
        let mut graph = self.graph.lock();
        Ok(restore_scene(&mut graph, record)?)
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("state", &self.state)
            .field("tick_count", &self.tick_count)
            .field("bodies", &self.physics.body_count())
            .field("animations", &self.animations.len())
            .field("anchors", &self.anchors.len())
            .finish_non_exhaustive()
    }
}
