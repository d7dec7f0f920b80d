//! Time-driven property animation
//!
//! An [`Animation`] owns its own clock. Each update first consumes the start
//! delay, then moves the clock forward (or backward while reversing) and
//! evaluates the loop / reverse / completion rules exactly once.

use super::easing::Easing;
use crate::foundation::collections::EntityId;
use crate::foundation::math::{slerp, Quat, Transform, Vec3, EPSILON};

/// Per-tick callback receiving the eased progress
pub type ProgressCallback = Box<dyn FnMut(f32) + Send>;

/// Callback fired once when an animation completes
pub type CompletionCallback = Box<dyn FnOnce() + Send>;

/// Lifecycle of an animation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaybackState {
    /// Not running; the clock is at the start
    Stopped,
    /// Advancing every update
    Playing,
    /// Holding its current time
    Paused,
    /// Reached its end; the completion callback has been queued
    Completed,
}

/// Property an animation writes to its target
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnimationTrack {
    /// Nothing is written; only the progress callback runs
    Callback,
    /// Local position
    Position {
        /// Start value
        from: Vec3,
        /// End value
        to: Vec3,
    },
    /// Local rotation, interpolated along the shortest arc
    Rotation {
        /// Start value
        from: Quat,
        /// End value
        to: Quat,
    },
    /// Local scale
    Scale {
        /// Start value
        from: Vec3,
        /// End value
        to: Vec3,
    },
    /// Whole local transform
    Transform {
        /// Start value
        from: Transform,
        /// End value
        to: Transform,
    },
}

impl AnimationTrack {
    /// Write the value at `progress` into `transform`
    ///
    /// Progress may leave `[0, 1]` for overshooting curves.
    pub fn apply(&self, transform: &mut Transform, progress: f32) {
        match self {
            Self::Callback => {}
            Self::Position { from, to } => transform.position = from.lerp(to, progress),
            Self::Rotation { from, to } => transform.rotation = slerp(from, to, progress),
            Self::Scale { from, to } => transform.scale = from.lerp(to, progress),
            Self::Transform { from, to } => *transform = from.interpolate(to, progress),
        }
    }
}

/// One property animation
pub struct Animation {
    target: Option<EntityId>,
    track: AnimationTrack,
    duration: f32,
    current_time: f32,
    delay: f32,
    delay_remaining: f32,
    easing: Easing,
    looping: bool,
    loop_count: u32,
    loops_completed: u32,
    auto_reverse: bool,
    reversing: bool,
    speed: f32,
    state: PlaybackState,
    on_update: Option<ProgressCallback>,
    on_complete: Option<CompletionCallback>,
    completion_pending: bool,
}

impl Animation {
    /// Create a stopped, callback-only animation
    pub fn new(duration: f32) -> Self {
        Self {
            target: None,
            track: AnimationTrack::Callback,
            duration: duration.max(0.0),
            current_time: 0.0,
            delay: 0.0,
            delay_remaining: 0.0,
            easing: Easing::Linear,
            looping: false,
            loop_count: 0,
            loops_completed: 0,
            auto_reverse: false,
            reversing: false,
            speed: 1.0,
            state: PlaybackState::Stopped,
            on_update: None,
            on_complete: None,
            completion_pending: false,
        }
    }

    /// Create an animation writing `track` into `target`
    pub fn for_entity(target: EntityId, track: AnimationTrack, duration: f32) -> Self {
        let mut animation = Self::new(duration);
        animation.target = Some(target);
        animation.track = track;
        animation
    }

    /// Animate the local position of `target`
    pub fn move_to(target: EntityId, from: Vec3, to: Vec3, duration: f32) -> Self {
        Self::for_entity(target, AnimationTrack::Position { from, to }, duration)
    }

    /// Animate the local rotation of `target`
    pub fn rotate_to(target: EntityId, from: Quat, to: Quat, duration: f32) -> Self {
        Self::for_entity(target, AnimationTrack::Rotation { from, to }, duration)
    }

    /// Animate the local scale of `target`
    pub fn scale_to(target: EntityId, from: Vec3, to: Vec3, duration: f32) -> Self {
        Self::for_entity(target, AnimationTrack::Scale { from, to }, duration)
    }

    /// Set the easing curve
    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    /// Wait `delay` seconds before the clock starts
    pub fn with_delay(mut self, delay: f32) -> Self {
        self.delay = delay.max(0.0);
        self.delay_remaining = self.delay;
        self
    }

    /// Loop `count` cycles in total, or forever when `count` is 0
    pub fn with_loop(mut self, count: u32) -> Self {
        self.looping = true;
        self.loop_count = count;
        self
    }

    /// Play backwards after reaching the end
    pub fn with_auto_reverse(mut self, auto_reverse: bool) -> Self {
        self.auto_reverse = auto_reverse;
        self
    }

    /// Set the playback speed multiplier
    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed.max(0.0);
        self
    }

    /// Call `callback` with the eased progress every tick
    pub fn on_update(mut self, callback: impl FnMut(f32) + Send + 'static) -> Self {
        self.on_update = Some(Box::new(callback));
        self
    }

    /// Call `callback` once when the animation completes
    pub fn on_complete(mut self, callback: impl FnOnce() + Send + 'static) -> Self {
        self.on_complete = Some(Box::new(callback));
        self
    }

    // ---- accessors ----

    /// Entity the track writes to
    pub fn target(&self) -> Option<EntityId> {
        self.target
    }

    /// Track written every tick
    pub fn track(&self) -> &AnimationTrack {
        &self.track
    }

    /// Length of one cycle in seconds
    pub fn duration(&self) -> f32 {
        self.duration
    }

    /// Position of the clock within the cycle
    pub fn current_time(&self) -> f32 {
        self.current_time
    }

    /// Lifecycle state
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Whether the animation loops
    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// Whether the clock currently runs backwards
    pub fn is_reversing(&self) -> bool {
        self.reversing
    }

    /// Number of finished cycles
    pub fn loops_completed(&self) -> u32 {
        self.loops_completed
    }

    /// Playback speed multiplier
    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// Eased progress at the current time
    pub fn progress(&self) -> f32 {
        let linear = if self.duration > EPSILON {
            self.current_time / self.duration
        } else {
            1.0
        };
        self.easing.apply(linear.clamp(0.0, 1.0))
    }

    // ---- playback control ----

    /// Start or continue playing
    ///
    /// A completed animation stays completed; use [`restart`](Self::restart).
    pub fn play(&mut self) {
        match self.state {
            PlaybackState::Stopped | PlaybackState::Paused => self.state = PlaybackState::Playing,
            PlaybackState::Playing | PlaybackState::Completed => {}
        }
    }

    /// Hold at the current time
    pub fn pause(&mut self) {
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Paused;
        }
    }

    /// Continue after [`pause`](Self::pause)
    pub fn resume(&mut self) {
        if self.state == PlaybackState::Paused {
            self.state = PlaybackState::Playing;
        }
    }

    /// Stop and rewind to the start (delay included)
    pub fn stop(&mut self) {
        self.state = PlaybackState::Stopped;
        self.rewind();
    }

    /// Rewind and play from the start
    ///
    /// The completion callback only fires once per animation, so a restarted
    /// animation completes silently.
    pub fn restart(&mut self) {
        self.rewind();
        self.state = PlaybackState::Playing;
    }

    fn rewind(&mut self) {
        self.current_time = 0.0;
        self.delay_remaining = self.delay;
        self.loops_completed = 0;
        self.reversing = false;
        self.completion_pending = false;
    }

    // ---- stepping ----

    /// Advance the clock by `delta_time` seconds
    ///
    /// Returns the eased progress when the animation ran this tick, `None`
    /// while it is not playing or still inside its start delay.
    pub fn advance(&mut self, delta_time: f32) -> Option<f32> {
        if self.state != PlaybackState::Playing {
            return None;
        }
        let mut dt = (delta_time * self.speed).max(0.0);

        if self.delay_remaining > 0.0 {
            if dt <= self.delay_remaining {
                self.delay_remaining -= dt;
                return None;
            }
            dt -= self.delay_remaining;
            self.delay_remaining = 0.0;
        }

        if self.duration <= EPSILON {
            self.current_time = 0.0;
            self.complete();
            return Some(self.easing.apply(1.0));
        }

        if self.reversing {
            self.current_time -= dt;
        } else {
            self.current_time += dt;
        }

        let at_bound = if self.reversing {
            self.current_time <= 0.0
        } else {
            self.current_time >= self.duration
        };

        if self.auto_reverse && !self.reversing && at_bound {
            self.reversing = true;
            self.current_time = self.duration;
        } else if at_bound && self.looping && (self.loop_count == 0 || self.loops_completed + 1 < self.loop_count) {
            self.loops_completed += 1;
            self.current_time = 0.0;
            self.reversing = false;
        } else if at_bound {
            self.current_time = if self.reversing { 0.0 } else { self.duration };
            if self.looping {
                self.loops_completed += 1;
            }
            self.complete();
        }

        Some(self.progress())
    }

    fn complete(&mut self) {
        self.state = PlaybackState::Completed;
        self.completion_pending = true;
    }

    /// Apply `progress` to `transform` and run the progress callback
    pub fn apply(&mut self, transform: Option<&mut Transform>, progress: f32) {
        if let Some(transform) = transform {
            self.track.apply(transform, progress);
        }
        if let Some(callback) = self.on_update.as_mut() {
            callback(progress);
        }
    }

    /// Take the completion callback if the animation completed since the
    /// last call
    pub fn take_completion(&mut self) -> Option<CompletionCallback> {
        if !std::mem::take(&mut self.completion_pending) {
            return None;
        }
        self.on_complete.take()
    }
}

impl std::fmt::Debug for Animation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Animation")
            .field("target", &self.target)
            .field("track", &self.track)
            .field("duration", &self.duration)
            .field("current_time", &self.current_time)
            .field("easing", &self.easing)
            .field("state", &self.state)
            .field("loops_completed", &self.loops_completed)
            .field("reversing", &self.reversing)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn playing(animation: Animation) -> Animation {
        let mut animation = animation;
        animation.play();
        animation
    }

    #[test]
    fn test_infinite_loop_counts_cycles_and_never_completes() {
        let mut animation = playing(Animation::new(1.0).with_loop(0));

        for _ in 0..4 {
            animation.advance(0.5);
        }

        assert_eq!(animation.loops_completed(), 2);
        assert_eq!(animation.state(), PlaybackState::Playing);
        assert!(animation.take_completion().is_none());
    }

    #[test]
    fn test_finite_loop_completes_after_count() {
        let mut animation = playing(Animation::new(1.0).with_loop(2));

        animation.advance(1.0);
        assert_eq!(animation.state(), PlaybackState::Playing);
        animation.advance(1.0);

        assert_eq!(animation.state(), PlaybackState::Completed);
        assert_eq!(animation.loops_completed(), 2);
    }

    #[test]
    fn test_delay_is_consumed_first() {
        let mut animation = playing(Animation::new(1.0).with_delay(0.5));

        assert_eq!(animation.advance(0.3), None);
        let progress = animation.advance(0.4).expect("running");

        assert_relative_eq!(animation.current_time(), 0.2, epsilon = 1e-6);
        assert_relative_eq!(progress, 0.2, epsilon = 1e-6);
    }

    #[test]
    fn test_auto_reverse_runs_back_then_completes() {
        let mut animation = playing(Animation::new(1.0).with_auto_reverse(true));

        animation.advance(1.2);
        assert!(animation.is_reversing());
        assert_relative_eq!(animation.current_time(), 1.0);

        animation.advance(0.25);
        assert_relative_eq!(animation.current_time(), 0.75);

        animation.advance(1.0);
        assert_eq!(animation.state(), PlaybackState::Completed);
        assert_relative_eq!(animation.current_time(), 0.0);
        assert_relative_eq!(animation.progress(), 0.0);
    }

    #[test]
    fn test_looping_auto_reverse_clears_reversing_each_cycle() {
        let mut animation = playing(Animation::new(1.0).with_auto_reverse(true).with_loop(0));

        animation.advance(1.0);
        animation.advance(1.0);

        assert!(!animation.is_reversing());
        assert_eq!(animation.loops_completed(), 1);
    }

    #[test]
    fn test_completion_fires_exactly_once() {
        let fired = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&fired);
        let mut animation = playing(Animation::new(0.5).on_complete(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        animation.advance(1.0);
        animation.advance(1.0);
        for _ in 0..2 {
            if let Some(callback) = animation.take_completion() {
                callback();
            }
        }
        animation.restart();
        animation.advance(1.0);
        if let Some(callback) = animation.take_completion() {
            callback();
        }

        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_speed_scales_time() {
        let mut animation = playing(Animation::new(2.0).with_speed(2.0));

        animation.advance(0.5);

        assert_relative_eq!(animation.current_time(), 1.0);
    }

    #[test]
    fn test_pause_holds_time() {
        let mut animation = playing(Animation::new(2.0));
        animation.advance(0.5);

        animation.pause();
        assert_eq!(animation.advance(0.5), None);
        animation.resume();
        animation.advance(0.5);

        assert_relative_eq!(animation.current_time(), 1.0);
    }

    #[test]
    fn test_zero_duration_completes_immediately() {
        let mut animation = playing(Animation::new(0.0).with_easing(Easing::BounceOut));

        assert_eq!(animation.advance(0.016), Some(1.0));
        assert_eq!(animation.state(), PlaybackState::Completed);
    }

    #[test]
    fn test_tracks_write_their_property() {
        let mut transform = Transform::identity();

        AnimationTrack::Position {
            from: Vec3::zeros(),
            to: Vec3::new(2.0, 0.0, 0.0),
        }
        .apply(&mut transform, 0.5);
        AnimationTrack::Scale {
            from: Vec3::new(1.0, 1.0, 1.0),
            to: Vec3::new(3.0, 3.0, 3.0),
        }
        .apply(&mut transform, 0.5);

        assert_relative_eq!(transform.position, Vec3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(transform.scale, Vec3::new(2.0, 2.0, 2.0));
    }
}
