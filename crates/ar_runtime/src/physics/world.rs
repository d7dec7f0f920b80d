//! Physics world
//!
//! Owns every rigid body and advances them with a fixed-timestep
//! accumulator. Each step runs, in order:
//!
//! 1. queued forces, torques and impulses
//! 2. gravity on awake dynamic bodies
//! 3. multiplicative damping
//! 4. position and orientation integration
//! 5. sleep check
//! 6. collision detection and resolution
//!
//! The broad phase checks every pair; the narrow phase treats each body as
//! a bounding sphere. Resolution moves bodies apart first, then applies an
//! impulse using the lower restitution of the pair.

use std::collections::BTreeMap;

use super::body::{BodyKind, RigidBody, RigidBodyDesc};
use super::collision::{Ray, RayHit};
use super::collision_layers::CollisionGroups;
use super::contact::{ActivePair, CollisionContact, PhysicsEvent, TriggerOverlap};
use crate::core::config::PhysicsConfig;
use crate::foundation::collections::{BodyHandle, EntityId, KeyPair, SecondaryMap, SlotMap};
use crate::foundation::math::{Quat, Vec3, EPSILON};

/// Rigid body simulation
pub struct PhysicsWorld {
    config: PhysicsConfig,
    bodies: SlotMap<BodyHandle, RigidBody>,
    accumulator: f32,
    active_pairs: BTreeMap<KeyPair<BodyHandle>, ActivePair>,
    contacts: SecondaryMap<BodyHandle, Vec<CollisionContact>>,
    events: Vec<PhysicsEvent>,
    step_count: u64,
}

impl PhysicsWorld {
    /// Create an empty world
    pub fn new(config: PhysicsConfig) -> Self {
        Self {
            config,
            bodies: SlotMap::with_key(),
            accumulator: 0.0,
            active_pairs: BTreeMap::new(),
            contacts: SecondaryMap::new(),
            events: Vec::new(),
            step_count: 0,
        }
    }

    /// Current configuration
    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    /// World gravity
    pub fn gravity(&self) -> Vec3 {
        self.config.gravity
    }

    /// Change world gravity
    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.config.gravity = gravity;
    }

    /// Change the multiplier applied to incoming frame deltas
    pub fn set_time_scale(&mut self, time_scale: f32) {
        self.config.time_scale = time_scale.max(0.0);
    }

    /// Unconsumed simulation time
    pub fn accumulator(&self) -> f32 {
        self.accumulator
    }

    /// Number of fixed steps run since creation
    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    // ---- body table ----

    /// Register a body owned by `owner`
    pub fn add_body(&mut self, owner: EntityId, desc: RigidBodyDesc) -> BodyHandle {
        let handle = self.bodies.insert(RigidBody::from_desc(owner, desc));
        log::debug!("Added {:?} body {:?} for entity {:?}", self.bodies[handle].kind(), handle, owner);
        handle
    }

    /// Remove a body, ending any contact it was part of
    pub fn remove_body(&mut self, handle: BodyHandle) -> Option<RigidBody> {
        let body = self.bodies.remove(handle)?;
        self.contacts.remove(handle);

        let ended: Vec<KeyPair<BodyHandle>> = self
            .active_pairs
            .keys()
            .filter(|pair| pair.contains(handle))
            .copied()
            .collect();
        for pair in ended {
            if let Some(previous) = self.active_pairs.remove(&pair) {
                self.emit_ended(&previous);
            }
        }

        log::debug!("Removed body {:?}", handle);
        Some(body)
    }

    /// Remove every body owned by `entity`
    pub fn remove_bodies_for_entity(&mut self, entity: EntityId) -> Vec<BodyHandle> {
        let owned: Vec<BodyHandle> = self
            .bodies
            .iter()
            .filter(|(_, body)| body.owner() == entity)
            .map(|(handle, _)| handle)
            .collect();
        for &handle in &owned {
            self.remove_body(handle);
        }
        owned
    }

    /// Remove all bodies, contacts and pending events
    pub fn clear(&mut self) {
        self.bodies.clear();
        self.active_pairs.clear();
        self.contacts.clear();
        self.events.clear();
        self.accumulator = 0.0;
    }

    /// Look up a body
    pub fn body(&self, handle: BodyHandle) -> Option<&RigidBody> {
        self.bodies.get(handle)
    }

    /// Look up a body mutably
    pub fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut RigidBody> {
        self.bodies.get_mut(handle)
    }

    /// Whether `handle` refers to a registered body
    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.bodies.contains_key(handle)
    }

    /// Iterate over all bodies
    pub fn bodies(&self) -> impl Iterator<Item = (BodyHandle, &RigidBody)> {
        self.bodies.iter()
    }

    /// Number of registered bodies
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    // ---- body control ----

    /// Teleport a body; dynamic bodies are woken
    pub fn set_pose(&mut self, handle: BodyHandle, position: Vec3, rotation: Quat) -> bool {
        let Some(body) = self.bodies.get_mut(handle) else {
            return false;
        };
        body.position = position;
        body.rotation = rotation;
        body.wake();
        true
    }

    /// Overwrite a body's linear velocity
    pub fn set_linear_velocity(&mut self, handle: BodyHandle, velocity: Vec3) -> bool {
        let Some(body) = self.bodies.get_mut(handle) else {
            return false;
        };
        body.linear_velocity = velocity;
        body.wake();
        true
    }

    /// Overwrite a body's angular velocity
    pub fn set_angular_velocity(&mut self, handle: BodyHandle, velocity: Vec3) -> bool {
        let Some(body) = self.bodies.get_mut(handle) else {
            return false;
        };
        body.angular_velocity = velocity;
        body.wake();
        true
    }

    /// Queue a force (newtons) for the next step
    pub fn apply_force(&mut self, handle: BodyHandle, force: Vec3) -> bool {
        self.bodies.get_mut(handle).map(|body| body.add_force(force)).is_some()
    }

    /// Queue an impulse (newton-seconds) for the next step
    pub fn apply_impulse(&mut self, handle: BodyHandle, impulse: Vec3) -> bool {
        self.bodies.get_mut(handle).map(|body| body.add_impulse(impulse)).is_some()
    }

    /// Queue a torque for the next step
    pub fn apply_torque(&mut self, handle: BodyHandle, torque: Vec3) -> bool {
        self.bodies.get_mut(handle).map(|body| body.add_torque(torque)).is_some()
    }

    /// Queue an angular impulse for the next step
    pub fn apply_angular_impulse(&mut self, handle: BodyHandle, impulse: Vec3) -> bool {
        self.bodies.get_mut(handle).map(|body| body.add_angular_impulse(impulse)).is_some()
    }

    /// Wake a sleeping body
    pub fn wake(&mut self, handle: BodyHandle) -> bool {
        self.bodies.get_mut(handle).map(RigidBody::wake).is_some()
    }

    /// Put a dynamic body to sleep
    pub fn sleep(&mut self, handle: BodyHandle) -> bool {
        self.bodies.get_mut(handle).map(RigidBody::sleep).is_some()
    }

    // ---- stepping ----

    /// Advance the simulation by a frame delta
    ///
    /// Runs as many fixed steps as the accumulated time allows, up to the
    /// substep cap. Time still owed after the cap is dropped. Returns the
    /// number of steps taken.
    pub fn simulate(&mut self, delta_time: f32) -> u32 {
        if !delta_time.is_finite() || delta_time <= 0.0 {
            return 0;
        }
        let fixed = self.config.fixed_timestep;
        if fixed <= 0.0 {
            return 0;
        }

        self.accumulator += delta_time * self.config.time_scale;

        let mut steps = 0;
        while self.accumulator >= fixed && steps < self.config.max_substeps {
            self.step(fixed);
            self.accumulator -= fixed;
            steps += 1;
        }

        if self.accumulator >= fixed {
            log::debug!(
                "Physics fell behind: dropping {:.4}s after {} substeps",
                self.accumulator,
                steps
            );
            self.accumulator = 0.0;
        }

        steps
    }

    /// Run exactly one step of `dt` seconds
    pub fn step(&mut self, dt: f32) {
        let gravity = self.config.gravity;
        let linear_threshold = self.config.linear_sleep_threshold;
        let angular_threshold = self.config.angular_sleep_threshold;

        for (handle, body) in &mut self.bodies {
            body.apply_pending(dt);

            if !body.is_awake() {
                // Asleep dynamic bodies only wake from outside interference
                if body.update_sleep_state(linear_threshold, angular_threshold) {
                    log::trace!("Body {:?} woke up", handle);
                }
                continue;
            }

            if body.kind() == BodyKind::Dynamic {
                body.linear_velocity += gravity * body.gravity_scale * dt;
                body.apply_damping(dt);
            }
            body.integrate(dt);

            if body.update_sleep_state(linear_threshold, angular_threshold) {
                log::trace!("Body {:?} fell asleep", handle);
            }
        }

        self.detect_collisions();
        self.step_count += 1;
    }

    fn detect_collisions(&mut self) {
        let handles: Vec<BodyHandle> = self.bodies.keys().collect();
        let mut current: BTreeMap<KeyPair<BodyHandle>, ActivePair> = BTreeMap::new();
        self.contacts.clear();

        for (index, &a) in handles.iter().enumerate() {
            for &b in &handles[index + 1..] {
                let pair = KeyPair::new(a, b);
                let (Some(body_a), Some(body_b)) = (self.bodies.get(a), self.bodies.get(b)) else {
                    continue;
                };

                if !body_a.filter.collides_with(&body_b.filter) {
                    continue;
                }

                if !body_a.is_awake() && !body_b.is_awake() {
                    // Nothing moved, so whatever was touching still is
                    if let Some(previous) = self.active_pairs.get(&pair) {
                        current.insert(pair, *previous);
                    }
                    continue;
                }

                let Some(contact) = sphere_contact(a, body_a, b, body_b) else {
                    continue;
                };
                let is_trigger = body_a.is_trigger || body_b.is_trigger;
                let was_active = self.active_pairs.contains_key(&pair);

                if is_trigger {
                    if !was_active {
                        self.emit_trigger(&contact, true);
                    }
                } else {
                    self.resolve(&contact);
                    let mirrored = contact.mirrored();
                    if was_active {
                        self.events.push(PhysicsEvent::CollisionStay(contact));
                        self.events.push(PhysicsEvent::CollisionStay(mirrored));
                    } else {
                        self.events.push(PhysicsEvent::CollisionBegan(contact));
                        self.events.push(PhysicsEvent::CollisionBegan(mirrored));
                    }
                    self.push_contact(contact);
                    self.push_contact(mirrored);
                }

                let oriented = if pair.first == a { contact } else { contact.mirrored() };
                current.insert(pair, ActivePair { contact: oriented, is_trigger });
            }
        }

        let previous = std::mem::replace(&mut self.active_pairs, current);
        for (pair, ended) in previous {
            if !self.active_pairs.contains_key(&pair) {
                self.emit_ended(&ended);
            }
        }
    }

    fn resolve(&mut self, contact: &CollisionContact) {
        let Some([body_a, body_b]) = self.bodies.get_disjoint_mut([contact.body, contact.other]) else {
            return;
        };

        let simulated_a = body_a.is_simulated();
        let simulated_b = body_b.is_simulated();
        let inverse_a = if simulated_a { body_a.inverse_mass() } else { 0.0 };
        let inverse_b = if simulated_b { body_b.inverse_mass() } else { 0.0 };
        let inverse_sum = inverse_a + inverse_b;
        if inverse_sum <= 0.0 {
            return;
        }

        let normal = contact.normal;
        let correction = normal * contact.penetration;
        match (simulated_a, simulated_b) {
            (true, true) => {
                body_a.position -= correction * 0.5;
                body_b.position += correction * 0.5;
            }
            (true, false) => body_a.position -= correction,
            (false, true) => body_b.position += correction,
            (false, false) => {}
        }

        let relative = body_b.linear_velocity - body_a.linear_velocity;
        let closing = relative.dot(&normal);
        if closing < 0.0 {
            let restitution = body_a.material.restitution.min(body_b.material.restitution);
            let j = -(1.0 + restitution) * closing / inverse_sum;
            body_a.linear_velocity -= normal * j * inverse_a;
            body_b.linear_velocity += normal * j * inverse_b;

            let tangential = relative - normal * closing;
            let tangential_speed = tangential.norm();
            if tangential_speed > EPSILON {
                let tangent = tangential / tangential_speed;
                let friction = (body_a.material.friction * body_b.material.friction).sqrt();
                let jt = (-tangential_speed / inverse_sum).clamp(-friction * j, friction * j);
                body_a.linear_velocity -= tangent * jt * inverse_a;
                body_b.linear_velocity += tangent * jt * inverse_b;
            }
        }

        if simulated_a {
            body_a.wake();
        }
        if simulated_b {
            body_b.wake();
        }
    }

    fn push_contact(&mut self, contact: CollisionContact) {
        if let Some(entry) = self.contacts.entry(contact.body) {
            entry.or_default().push(contact);
        }
    }

    fn emit_trigger(&mut self, contact: &CollisionContact, entered: bool) {
        let a_is_trigger = self.bodies.get(contact.body).map_or(false, |body| body.is_trigger);
        let b_is_trigger = self.bodies.get(contact.other).map_or(false, |body| body.is_trigger);

        let mut overlaps = Vec::with_capacity(2);
        if a_is_trigger {
            overlaps.push(TriggerOverlap {
                trigger: contact.body,
                trigger_entity: contact.entity,
                other: contact.other,
                other_entity: contact.other_entity,
            });
        }
        if b_is_trigger {
            overlaps.push(TriggerOverlap {
                trigger: contact.other,
                trigger_entity: contact.other_entity,
                other: contact.body,
                other_entity: contact.entity,
            });
        }
        // A trigger that was removed mid-contact still reports its exit
        if overlaps.is_empty() {
            overlaps.push(TriggerOverlap {
                trigger: contact.body,
                trigger_entity: contact.entity,
                other: contact.other,
                other_entity: contact.other_entity,
            });
        }

        for overlap in overlaps {
            self.events.push(if entered {
                PhysicsEvent::TriggerEntered(overlap)
            } else {
                PhysicsEvent::TriggerExited(overlap)
            });
        }
    }

    fn emit_ended(&mut self, ended: &ActivePair) {
        if ended.is_trigger {
            self.emit_trigger(&ended.contact, false);
        } else {
            self.events.push(PhysicsEvent::CollisionEnded(ended.contact));
            self.events.push(PhysicsEvent::CollisionEnded(ended.contact.mirrored()));
        }
    }

    // ---- results ----

    /// Take all events produced since the last drain
    pub fn drain_events(&mut self) -> Vec<PhysicsEvent> {
        std::mem::take(&mut self.events)
    }

    /// Contacts `handle` had during the last step
    pub fn contacts(&self, handle: BodyHandle) -> &[CollisionContact] {
        self.contacts.get(handle).map_or(&[][..], Vec::as_slice)
    }

    /// Whether two bodies are currently touching or overlapping
    pub fn in_contact(&self, a: BodyHandle, b: BodyHandle) -> bool {
        self.active_pairs.contains_key(&KeyPair::new(a, b))
    }

    // ---- queries ----

    /// Closest body hit by a ray within `max_distance`
    pub fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<RayHit> {
        self.raycast_filtered(origin, direction, max_distance, CollisionGroups::all())
    }

    /// Closest hit among bodies whose category intersects `mask`
    pub fn raycast_filtered(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: CollisionGroups,
    ) -> Option<RayHit> {
        let ray = Ray::new(origin, direction)?;
        self.bodies
            .iter()
            .filter(|(_, body)| body.filter.category.intersects(mask))
            .filter_map(|(handle, body)| cast_body(&ray, handle, body, max_distance))
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }

    /// Every body hit by a ray within `max_distance`, nearest first
    pub fn raycast_all(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Vec<RayHit> {
        let Some(ray) = Ray::new(origin, direction) else {
            return Vec::new();
        };
        let mut hits: Vec<RayHit> = self
            .bodies
            .iter()
            .filter_map(|(handle, body)| cast_body(&ray, handle, body, max_distance))
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new(PhysicsConfig::default())
    }
}

/// Bounding-sphere narrow phase, oriented from `a` to `b`
fn sphere_contact(a: BodyHandle, body_a: &RigidBody, b: BodyHandle, body_b: &RigidBody) -> Option<CollisionContact> {
    let sphere_a = body_a.bounding_sphere();
    let sphere_b = body_b.bounding_sphere();
    if !sphere_a.intersects(&sphere_b) {
        return None;
    }

    let delta = sphere_b.center - sphere_a.center;
    let distance = delta.norm();
    let normal = if distance > EPSILON { delta / distance } else { Vec3::y() };
    Some(CollisionContact {
        body: a,
        entity: body_a.owner(),
        other: b,
        other_entity: body_b.owner(),
        point: sphere_a.center + normal * sphere_a.radius,
        normal,
        penetration: sphere_a.penetration_depth(&sphere_b),
        relative_velocity: body_b.linear_velocity - body_a.linear_velocity,
    })
}

fn cast_body(ray: &Ray, handle: BodyHandle, body: &RigidBody, max_distance: f32) -> Option<RayHit> {
    let distance = body
        .shapes()
        .iter()
        .filter_map(|shape| shape.intersect_ray(ray, body.position, body.rotation))
        .filter(|&t| t > 0.0 && t <= max_distance)
        .min_by(f32::total_cmp)?;

    let to_origin = ray.origin - body.position;
    let normal = if to_origin.norm() > EPSILON {
        to_origin.normalize()
    } else {
        -ray.direction
    };

    Some(RayHit {
        body: handle,
        entity: body.owner(),
        distance,
        point: ray.point_at(distance),
        normal,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::{CollisionFilter, CollisionShape, PhysicsMaterial};
    use approx::assert_relative_eq;

    const DT: f32 = 1.0 / 60.0;

    fn entity() -> EntityId {
        let mut entities: SlotMap<EntityId, ()> = SlotMap::with_key();
        entities.insert(())
    }

    fn weightless() -> PhysicsWorld {
        PhysicsWorld::new(PhysicsConfig::default().with_gravity(Vec3::zeros()))
    }

    fn ball(position: Vec3) -> RigidBodyDesc {
        RigidBodyDesc::dynamic()
            .with_shape(CollisionShape::sphere(0.5))
            .with_position(position)
            .with_damping(0.0, 0.0)
    }

    #[test]
    fn test_simulate_runs_whole_steps_and_keeps_remainder() {
        let mut world = weightless();

        assert_eq!(world.simulate(DT * 2.5), 2);
        assert_relative_eq!(world.accumulator(), DT * 0.5, epsilon = 1e-6);
        assert_eq!(world.simulate(DT), 1);
    }

    #[test]
    fn test_simulate_caps_substeps_and_drops_backlog() {
        let mut world = PhysicsWorld::new(PhysicsConfig::default().with_max_substeps(3));

        assert_eq!(world.simulate(1.0), 3);
        assert_eq!(world.accumulator(), 0.0);
        assert_eq!(world.step_count(), 3);
    }

    #[test]
    fn test_time_scale_multiplies_delta() {
        let mut world = PhysicsWorld::new(PhysicsConfig::default().with_time_scale(0.5));
        assert_eq!(world.simulate(DT), 0);
        assert_eq!(world.simulate(DT), 1);

        world.set_time_scale(0.0);
        assert_eq!(world.simulate(1.0), 0);
    }

    #[test]
    fn test_gravity_accelerates_dynamic_bodies_only() {
        let mut world = PhysicsWorld::default();
        let owner = entity();
        let falling = world.add_body(owner, ball(Vec3::new(0.0, 10.0, 0.0)));
        let floating = world.add_body(owner, ball(Vec3::new(5.0, 10.0, 0.0)).with_gravity_scale(0.0));
        let fixed = world.add_body(
            owner,
            RigidBodyDesc::fixed().with_shape(CollisionShape::sphere(0.5)).with_position(Vec3::new(-5.0, 10.0, 0.0)),
        );

        world.step(DT);

        let v = world.body(falling).expect("body").linear_velocity;
        assert_relative_eq!(v.y, -9.81 * DT, epsilon = 1e-5);
        assert!(world.body(falling).expect("body").position.y < 10.0);
        assert_eq!(world.body(fixed).expect("body").position, Vec3::new(-5.0, 10.0, 0.0));
        // No gravity and no velocity: asleep after the first step
        assert!(world.body(floating).expect("body").is_sleeping());
    }

    #[test]
    fn test_damping_is_multiplicative() {
        let mut world = weightless();
        let handle = world.add_body(
            entity(),
            ball(Vec3::zeros()).with_linear_velocity(Vec3::new(10.0, 0.0, 0.0)).with_damping(0.6, 0.0),
        );

        world.step(0.5);

        assert_relative_eq!(world.body(handle).expect("body").linear_velocity.x, 7.0, epsilon = 1e-5);
    }

    #[test]
    fn test_torque_and_angular_impulse_scale_by_inverse_inertia() {
        let mut world = weightless();
        // Solid sphere: I = 0.4 * 1 * 0.5^2 = 0.1
        let handle = world.add_body(entity(), ball(Vec3::zeros()).with_mass(1.0));

        assert!(world.set_angular_velocity(handle, Vec3::new(1.0, 0.0, 0.0)));
        assert!(world.apply_torque(handle, Vec3::new(0.0, 1.0, 0.0)));
        assert!(world.apply_angular_impulse(handle, Vec3::new(0.0, 0.0, 0.2)));
        world.step(0.5);

        let spin = world.body(handle).expect("body").angular_velocity;
        assert_relative_eq!(spin, Vec3::new(1.0, 5.0, 2.0), epsilon = 1e-4);

        // Queued torque and impulse are consumed by one step
        world.step(0.5);
        assert_relative_eq!(world.body(handle).expect("body").angular_velocity, spin, epsilon = 1e-4);

        let fixed = world.add_body(entity(), RigidBodyDesc::fixed().with_shape(CollisionShape::sphere(0.5)));
        world.apply_angular_impulse(fixed, Vec3::new(0.0, 3.0, 0.0));
        world.step(DT);
        assert_eq!(world.body(fixed).expect("body").angular_velocity, Vec3::zeros());
    }

    #[test]
    fn test_angular_velocity_rotates_body() {
        let mut world = weightless();
        let handle = world.add_body(
            entity(),
            ball(Vec3::zeros()).with_angular_velocity(Vec3::new(0.0, std::f32::consts::PI, 0.0)),
        );

        world.step(0.5);

        let rotation = world.body(handle).expect("body").rotation;
        assert_relative_eq!(rotation.angle(), std::f32::consts::FRAC_PI_2, epsilon = 1e-4);
        assert_relative_eq!(rotation.quaternion().norm(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_force_and_impulse_are_applied_once() {
        let mut world = weightless();
        let handle = world.add_body(entity(), ball(Vec3::zeros()).with_mass(2.0));

        world.apply_force(handle, Vec3::new(120.0, 0.0, 0.0));
        world.apply_impulse(handle, Vec3::new(0.0, 0.0, 2.0));
        world.step(DT);
        world.step(DT);

        let v = world.body(handle).expect("body").linear_velocity;
        assert_relative_eq!(v, Vec3::new(1.0, 0.0, 1.0), epsilon = 1e-5);
    }

    #[test]
    fn test_sleeping_body_wakes_on_impulse() {
        let mut world = weightless();
        let handle = world.add_body(entity(), ball(Vec3::zeros()));
        world.step(DT);
        assert!(world.body(handle).expect("body").is_sleeping());

        world.apply_impulse(handle, Vec3::new(1.0, 0.0, 0.0));
        assert!(!world.body(handle).expect("body").is_sleeping());
        world.step(DT);
        assert!(world.body(handle).expect("body").position.x > 0.0);
    }

    #[test]
    fn test_static_body_is_never_displaced() {
        let mut world = weightless();
        let owner = entity();
        let floor = world.add_body(
            owner,
            RigidBodyDesc::fixed().with_shape(CollisionShape::sphere(0.5)),
        );
        let crate_body = world.add_body(owner, ball(Vec3::new(0.6, 0.0, 0.0)).with_linear_velocity(Vec3::new(-1.0, 0.0, 0.0)));

        world.step(DT);

        assert_eq!(world.body(floor).expect("floor").position, Vec3::zeros());
        let moved = world.body(crate_body).expect("crate").position;
        assert_relative_eq!(moved.x, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_collision_events_are_mirrored_and_transition() {
        let mut world = weightless();
        let owner = entity();
        let a = world.add_body(owner, ball(Vec3::zeros()).with_mass(1.0).with_restitution(0.0));
        let b = world.add_body(
            owner,
            RigidBodyDesc::fixed().with_shape(CollisionShape::sphere(0.5)).with_position(Vec3::new(0.9, 0.0, 0.0)),
        );
        world.set_linear_velocity(a, Vec3::new(0.6, 0.0, 0.0));

        world.step(DT);
        let events = world.drain_events();
        let began: Vec<CollisionContact> = events
            .iter()
            .filter_map(|event| match event {
                PhysicsEvent::CollisionBegan(contact) => Some(*contact),
                _ => None,
            })
            .collect();

        assert_eq!(began.len(), 2);
        assert_eq!(began[0].body, a);
        assert_eq!(began[1].body, b);
        assert_relative_eq!(began[0].point, began[1].point, epsilon = 1e-6);
        assert_relative_eq!(began[0].normal, -began[1].normal, epsilon = 1e-6);
        assert_eq!(world.contacts(a).len(), 1);
        assert!(world.in_contact(a, b));

        // Separate the bodies and the pair ends for both sides
        world.set_pose(a, Vec3::new(-5.0, 0.0, 0.0), Quat::identity());
        world.set_linear_velocity(a, Vec3::new(-1.0, 0.0, 0.0));
        world.step(DT);
        let ended = world
            .drain_events()
            .into_iter()
            .filter(|event| matches!(event, PhysicsEvent::CollisionEnded(_)))
            .count();
        assert_eq!(ended, 2);
        assert!(!world.in_contact(a, b));
    }

    #[test]
    fn test_incompatible_filters_never_collide() {
        let mut world = weightless();
        let owner = entity();
        let ghost = CollisionFilter::new(CollisionGroups::DEBRIS, CollisionGroups::DEBRIS);
        world.add_body(owner, ball(Vec3::zeros()).with_linear_velocity(Vec3::new(1.0, 0.0, 0.0)));
        world.add_body(owner, ball(Vec3::new(0.5, 0.0, 0.0)).with_filter(ghost));

        world.step(DT);

        assert!(world.drain_events().is_empty());
    }

    #[test]
    fn test_trigger_reports_overlap_without_resolution() {
        let mut world = weightless();
        let owner = entity();
        let zone = world.add_body(
            owner,
            RigidBodyDesc::fixed().with_shape(CollisionShape::sphere(1.0)).with_trigger(true),
        );
        let visitor = world.add_body(owner, ball(Vec3::new(1.2, 0.0, 0.0)).with_linear_velocity(Vec3::new(-1.0, 0.0, 0.0)));

        world.step(DT);
        let events = world.drain_events();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            PhysicsEvent::TriggerEntered(TriggerOverlap { trigger, other, .. }) if trigger == zone && other == visitor
        ));
        assert_relative_eq!(
            world.body(visitor).expect("visitor").linear_velocity.x,
            -1.0,
            epsilon = 1e-6
        );

        // Staying inside is silent
        world.step(DT);
        assert!(world.drain_events().is_empty());

        world.set_pose(visitor, Vec3::new(10.0, 0.0, 0.0), Quat::identity());
        world.step(DT);
        assert!(matches!(world.drain_events()[..], [PhysicsEvent::TriggerExited(_)]));
    }

    #[test]
    fn test_sleeping_pair_keeps_contact_without_end_event() {
        let mut world = weightless();
        let owner = entity();
        let a = world.add_body(owner, ball(Vec3::zeros()).with_linear_velocity(Vec3::new(0.1, 0.0, 0.0)));
        let b = world.add_body(owner, ball(Vec3::new(0.9, 0.0, 0.0)));
        world.step(DT);
        assert!(world.in_contact(a, b));
        world.drain_events();

        world.sleep(a);
        world.sleep(b);
        let resting = world.body(b).expect("b").position;
        world.step(DT);
        world.step(DT);

        assert!(world.in_contact(a, b));
        assert!(world.drain_events().is_empty());
        assert_eq!(world.body(b).expect("b").position, resting);
    }

    #[test]
    fn test_remove_body_ends_its_contacts() {
        let mut world = weightless();
        let owner = entity();
        let a = world.add_body(owner, ball(Vec3::zeros()).with_linear_velocity(Vec3::new(0.1, 0.0, 0.0)));
        let b = world.add_body(owner, ball(Vec3::new(0.9, 0.0, 0.0)));
        world.step(DT);
        world.drain_events();

        assert!(world.remove_body(b).is_some());
        let events = world.drain_events();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|event| matches!(event, PhysicsEvent::CollisionEnded(_))));
        assert!(!world.in_contact(a, b));
        assert!(world.remove_body(b).is_none());
    }

    #[test]
    fn test_remove_bodies_for_entity() {
        let mut world = weightless();
        let mut entities: SlotMap<EntityId, ()> = SlotMap::with_key();
        let first = entities.insert(());
        let second = entities.insert(());
        world.add_body(first, ball(Vec3::zeros()));
        world.add_body(first, ball(Vec3::new(3.0, 0.0, 0.0)));
        world.add_body(second, ball(Vec3::new(6.0, 0.0, 0.0)));

        assert_eq!(world.remove_bodies_for_entity(first).len(), 2);
        assert_eq!(world.body_count(), 1);
    }

    #[test]
    fn test_shapeless_bodies_never_collide() {
        let mut world = weightless();
        let owner = entity();
        world.add_body(owner, RigidBodyDesc::dynamic().with_linear_velocity(Vec3::x()));
        world.add_body(owner, RigidBodyDesc::dynamic());

        world.step(DT);

        assert!(world.drain_events().is_empty());
    }

    #[test]
    fn test_raycast_returns_closest_with_origin_facing_normal() {
        let mut world = weightless();
        let owner = entity();
        let near = world.add_body(owner, ball(Vec3::new(0.0, 0.0, -3.0)));
        let far = world.add_body(owner, ball(Vec3::new(0.0, 0.0, -6.0)));

        let hit = world.raycast(Vec3::zeros(), -Vec3::z(), 100.0).expect("hit");
        assert_eq!(hit.body, near);
        assert_relative_eq!(hit.distance, 2.5, epsilon = 1e-5);
        assert_relative_eq!(hit.normal, Vec3::z(), epsilon = 1e-5);

        let all = world.raycast_all(Vec3::zeros(), -Vec3::z(), 100.0);
        assert_eq!(all.iter().map(|hit| hit.body).collect::<Vec<_>>(), vec![near, far]);

        assert!(world.raycast(Vec3::zeros(), -Vec3::z(), 2.0).is_none());
        assert!(world.raycast(Vec3::zeros(), Vec3::zeros(), 100.0).is_none());
    }

    #[test]
    fn test_raycast_filtered_and_box_shapes() {
        let mut world = weightless();
        let owner = entity();
        let debris = CollisionFilter::new(CollisionGroups::DEBRIS, CollisionGroups::all());
        world.add_body(owner, ball(Vec3::new(0.0, 0.0, -2.0)).with_filter(debris));
        let wall = world.add_body(
            owner,
            RigidBodyDesc::fixed()
                .with_shape(CollisionShape::cuboid(Vec3::new(2.0, 2.0, 0.1)))
                .with_position(Vec3::new(0.0, 0.0, -5.0)),
        );

        let hit = world
            .raycast_filtered(Vec3::zeros(), -Vec3::z(), 100.0, CollisionGroups::DEFAULT)
            .expect("wall hit");
        assert_eq!(hit.body, wall);
        assert_relative_eq!(hit.distance, 4.9, epsilon = 1e-5);
    }

    #[test]
    fn test_identical_runs_are_bitwise_equal() {
        let run = || {
            let mut world = PhysicsWorld::new(PhysicsConfig::default());
            let owner = entity();
            let handles: Vec<BodyHandle> = (0..4)
                .map(|i| {
                    world.add_body(
                        owner,
                        ball(Vec3::new(i as f32 * 0.8, i as f32 * 0.3, 0.0))
                            .with_material(PhysicsMaterial::new(1.0, 0.5, 0.4)),
                    )
                })
                .collect();
            for _ in 0..120 {
                world.step(DT);
            }
            handles
                .iter()
                .map(|&handle| world.body(handle).map(|body| body.position))
                .collect::<Vec<_>>()
        };

        assert_eq!(run(), run());
    }
}
