//! Owns running animations and drives them once per tick

use log::{debug, trace};

use super::animation::{Animation, CompletionCallback, PlaybackState};
use crate::core::AnimationConfig;
use crate::foundation::collections::{AnimationId, EntityId, SlotMap};
use crate::scene::EntityGraph;

/// Registry of animations keyed by [`AnimationId`]
pub struct AnimationController {
    animations: SlotMap<AnimationId, Animation>,
    global_speed: f32,
}

impl AnimationController {
    /// Create an empty controller
    pub fn new(config: &AnimationConfig) -> Self {
        Self {
            animations: SlotMap::with_key(),
            global_speed: config.global_speed.max(0.0),
        }
    }

    /// Register an animation without starting it
    pub fn add(&mut self, animation: Animation) -> AnimationId {
        self.animations.insert(animation)
    }

    /// Register an animation and start it
    pub fn play(&mut self, mut animation: Animation) -> AnimationId {
        animation.play();
        let id = self.animations.insert(animation);
        debug!("Animation {:?} started", id);
        id
    }

    /// Look up an animation
    pub fn get(&self, id: AnimationId) -> Option<&Animation> {
        self.animations.get(id)
    }

    /// Look up an animation mutably
    pub fn get_mut(&mut self, id: AnimationId) -> Option<&mut Animation> {
        self.animations.get_mut(id)
    }

    /// Whether `id` is still registered
    pub fn contains(&self, id: AnimationId) -> bool {
        self.animations.contains_key(id)
    }

    /// Number of registered animations
    pub fn len(&self) -> usize {
        self.animations.len()
    }

    /// Check if no animation is registered
    pub fn is_empty(&self) -> bool {
        self.animations.is_empty()
    }

    /// Speed multiplier applied on top of every animation's own speed
    pub fn global_speed(&self) -> f32 {
        self.global_speed
    }

    /// Change the global speed multiplier
    pub fn set_global_speed(&mut self, speed: f32) {
        self.global_speed = speed.max(0.0);
    }

    /// Start a registered animation; false if `id` is unknown
    pub fn start(&mut self, id: AnimationId) -> bool {
        self.with_animation(id, Animation::play)
    }

    /// Pause an animation; false if `id` is unknown
    pub fn pause(&mut self, id: AnimationId) -> bool {
        self.with_animation(id, Animation::pause)
    }

    /// Resume a paused animation; false if `id` is unknown
    pub fn resume(&mut self, id: AnimationId) -> bool {
        self.with_animation(id, Animation::resume)
    }

    /// Stop and rewind an animation; false if `id` is unknown
    pub fn stop(&mut self, id: AnimationId) -> bool {
        self.with_animation(id, Animation::stop)
    }

    /// Rewind and replay an animation; false if `id` is unknown
    pub fn restart(&mut self, id: AnimationId) -> bool {
        self.with_animation(id, Animation::restart)
    }

    fn with_animation(&mut self, id: AnimationId, f: impl FnOnce(&mut Animation)) -> bool {
        match self.animations.get_mut(id) {
            Some(animation) => {
                f(animation);
                true
            }
            None => false,
        }
    }

    /// Remove an animation without firing its completion callback
    pub fn remove(&mut self, id: AnimationId) -> Option<Animation> {
        self.animations.remove(id)
    }

    /// Remove every animation targeting `entity`
    ///
    /// Returns the number removed.
    pub fn stop_all_for(&mut self, entity: EntityId) -> usize {
        let before = self.animations.len();
        self.animations.retain(|_, animation| animation.target() != Some(entity));
        before - self.animations.len()
    }

    /// Remove every animation; no callbacks fire
    pub fn clear(&mut self) {
        self.animations.clear();
    }

    /// Advance every playing animation by `delta_time`
    ///
    /// Tracks are written into live target entities. Animations whose target
    /// was destroyed still advance but write nothing. Completion callbacks
    /// run after the whole pass, then completed animations are dropped.
    /// Returns the number of animations that completed.
    pub fn update(&mut self, delta_time: f32, graph: &mut EntityGraph) -> usize {
        let completions = self.advance(delta_time, graph);
        for callback in completions {
            callback();
        }
        self.prune()
    }

    /// Advance without firing callbacks or pruning
    ///
    /// Returns the completion callbacks collected during the pass. Callers
    /// that hold a lock on `graph` release it, fire the callbacks, then call
    /// [`prune`](Self::prune).
    pub fn advance(&mut self, delta_time: f32, graph: &mut EntityGraph) -> Vec<CompletionCallback> {
        let scaled = delta_time * self.global_speed;
        let mut completions: Vec<CompletionCallback> = Vec::new();

        for (id, animation) in self.animations.iter_mut() {
            if let Some(progress) = animation.advance(scaled) {
                let transform = animation
                    .target()
                    .and_then(|target| graph.get_mut(target))
                    .map(|node| &mut node.transform);
                animation.apply(transform, progress);
            }
            if animation.state() == PlaybackState::Completed {
                if let Some(callback) = animation.take_completion() {
                    completions.push(callback);
                }
                trace!("Animation {:?} completed", id);
            }
        }
        completions
    }

    /// Drop completed animations, returning how many were removed
    pub fn prune(&mut self) -> usize {
        let before = self.animations.len();
        self.animations
            .retain(|_, animation| animation.state() != PlaybackState::Completed);
        before - self.animations.len()
    }
}

impl std::fmt::Debug for AnimationController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimationController")
            .field("animations", &self.animations.len())
            .field("global_speed", &self.global_speed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::Easing;
    use crate::foundation::math::Vec3;
    use approx::assert_relative_eq;
    use std::sync::{Arc, Mutex};

    fn controller() -> AnimationController {
        AnimationController::new(&AnimationConfig::default())
    }

    #[test]
    fn test_position_track_moves_target() {
        let mut graph = EntityGraph::new();
        let entity = graph.create_entity("cube");
        let mut animations = controller();

        animations.play(Animation::move_to(entity, Vec3::zeros(), Vec3::new(0.0, 2.0, 0.0), 1.0));
        animations.update(0.5, &mut graph);

        let position = graph.local_transform(entity).expect("live").position;
        assert_relative_eq!(position, Vec3::new(0.0, 1.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn test_completed_animations_fire_once_and_are_pruned() {
        let mut graph = EntityGraph::new();
        let entity = graph.create_entity("cube");
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut animations = controller();

        let sink = Arc::clone(&log);
        let id = animations.play(
            Animation::scale_to(entity, Vec3::new(1.0, 1.0, 1.0), Vec3::new(2.0, 2.0, 2.0), 0.25)
                .with_easing(Easing::QuadOut)
                .on_complete(move || sink.lock().expect("log").push("done")),
        );

        assert_eq!(animations.update(0.5, &mut graph), 1);
        animations.update(0.5, &mut graph);

        assert_eq!(*log.lock().expect("log"), vec!["done"]);
        assert!(!animations.contains(id));
        let scale = graph.local_transform(entity).expect("live").scale;
        assert_relative_eq!(scale, Vec3::new(2.0, 2.0, 2.0), epsilon = 1e-6);
    }

    #[test]
    fn test_destroyed_target_is_skipped() {
        let mut graph = EntityGraph::new();
        let entity = graph.create_entity("cube");
        let mut animations = controller();
        let progress = Arc::new(Mutex::new(0.0));
        let sink = Arc::clone(&progress);
        animations.play(
            Animation::move_to(entity, Vec3::zeros(), Vec3::new(1.0, 0.0, 0.0), 1.0)
                .on_update(move |p| *sink.lock().expect("progress") = p),
        );

        graph.destroy(entity);
        animations.update(0.5, &mut graph);

        assert_relative_eq!(*progress.lock().expect("progress"), 0.5);
        assert_eq!(animations.len(), 1);
    }

    #[test]
    fn test_global_speed_scales_every_animation() {
        let mut graph = EntityGraph::new();
        let mut config = AnimationConfig::default();
        config.global_speed = 2.0;
        let mut animations = AnimationController::new(&config);
        let id = animations.play(Animation::new(4.0));

        animations.update(1.0, &mut graph);

        assert_relative_eq!(animations.get(id).expect("running").current_time(), 2.0);
    }

    #[test]
    fn test_stop_all_for_only_touches_that_entity() {
        let mut graph = EntityGraph::new();
        let a = graph.create_entity("a");
        let b = graph.create_entity("b");
        let mut animations = controller();
        animations.play(Animation::move_to(a, Vec3::zeros(), Vec3::x(), 1.0));
        animations.play(Animation::move_to(a, Vec3::zeros(), Vec3::y(), 1.0));
        let keep = animations.play(Animation::move_to(b, Vec3::zeros(), Vec3::z(), 1.0));

        assert_eq!(animations.stop_all_for(a), 2);
        assert!(animations.contains(keep));
    }

    #[test]
    fn test_completion_callback_may_touch_shared_state() {
        let mut graph = EntityGraph::new();
        let chained = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&chained);
        let mut animations = controller();
        animations.play(Animation::new(0.1).on_complete(move || *flag.lock().expect("flag") = true));

        animations.update(0.2, &mut graph);

        assert!(*chained.lock().expect("flag"));
        assert!(animations.is_empty());
    }
}
