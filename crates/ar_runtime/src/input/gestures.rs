//! Gesture recognition
//!
//! Turns raw multi-touch samples into typed gesture events. Each
//! continuous gesture (pan, drag, long press, pinch, rotation) runs its own
//! `possible -> began -> changed -> ended` machine; discrete gestures (tap,
//! double tap, swipe) are emitted directly in the ended state.
//!
//! Touches are evaluated in the order they are delivered. All state lives in
//! the recognizer, so two recognizers never influence each other.

use std::collections::{BTreeMap, HashMap};

use super::touch::{Touch, TouchPhase, TouchPoint};
use crate::core::config::GestureConfig;
use crate::foundation::collections::RollingWindow;
use crate::foundation::math::utils::wrap_angle;
use crate::foundation::math::{Vec2, EPSILON};

/// Recognized gesture types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GestureKind {
    /// Short touch with little movement
    Tap,
    /// Second tap shortly after and near a first one
    DoubleTap,
    /// Touch held still beyond the long-press duration
    LongPress,
    /// Single finger moving beyond the tap threshold
    Pan,
    /// Two fingers changing their distance
    Pinch,
    /// Two fingers changing their angle
    Rotation,
    /// Fast, short pan
    Swipe,
    /// Movement after a long press
    Drag,
}

/// Lifecycle of one gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GestureState {
    /// Not recognized yet
    #[default]
    Possible,
    /// Just recognized
    Began,
    /// Recognized and updating
    Changed,
    /// Finished normally
    Ended,
    /// Interrupted by the system
    Cancelled,
    /// Could not be recognized
    Failed,
}

impl GestureState {
    /// Whether the gesture is in progress
    pub fn is_active(self) -> bool {
        matches!(self, Self::Began | Self::Changed)
    }
}

/// Cardinal direction of a swipe in screen space (Y grows downwards)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwipeDirection {
    /// Towards the top of the screen
    Up,
    /// Towards the bottom of the screen
    Down,
    /// Towards the left edge
    Left,
    /// Towards the right edge
    Right,
}

impl SwipeDirection {
    /// Dominant axis of `motion`
    pub fn from_motion(motion: Vec2) -> Self {
        if motion.x.abs() > motion.y.abs() {
            if motion.x > 0.0 {
                Self::Right
            } else {
                Self::Left
            }
        } else if motion.y > 0.0 {
            Self::Down
        } else {
            Self::Up
        }
    }
}

/// One recognized gesture transition
///
/// Only the payload fields relevant to `kind` carry meaning; the others keep
/// their neutral values (zero vectors, scale 1, rotation 0).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureEvent {
    /// What was recognized
    pub kind: GestureKind,
    /// Transition being reported
    pub state: GestureState,
    /// Touch location, or the centroid for two-finger gestures
    pub location: Vec2,
    /// Offset from the start location (pan, drag)
    pub translation: Vec2,
    /// Smoothed velocity in points per second (pan, drag, swipe)
    pub velocity: Vec2,
    /// Distance ratio since the pinch started
    pub scale: f32,
    /// Angle change in radians since the rotation started
    pub rotation: f32,
    /// Number of touches down when the event was produced
    pub touch_count: usize,
    /// Time of the touch sample that produced the event
    pub timestamp: f64,
    /// Direction of a swipe
    pub swipe_direction: Option<SwipeDirection>,
}

impl GestureEvent {
    /// Create an event with neutral payload
    pub fn new(kind: GestureKind, state: GestureState, location: Vec2, touch_count: usize, timestamp: f64) -> Self {
        Self {
            kind,
            state,
            location,
            translation: Vec2::zeros(),
            velocity: Vec2::zeros(),
            scale: 1.0,
            rotation: 0.0,
            touch_count,
            timestamp,
            swipe_direction: None,
        }
    }

    fn with_motion(mut self, translation: Vec2, velocity: Vec2) -> Self {
        self.translation = translation;
        self.velocity = velocity;
        self
    }
}

/// Reference geometry of the current two-finger pair
#[derive(Debug, Clone, Copy)]
struct TouchPair {
    ids: (u64, u64),
    start_distance: f32,
    start_angle: f32,
    scale: f32,
    rotation: f32,
}

/// Multi-touch gesture state machine
#[derive(Debug)]
pub struct GestureRecognizer {
    config: GestureConfig,
    touches: BTreeMap<u64, Touch>,
    states: HashMap<GestureKind, GestureState>,
    last_tap: Option<(f64, Vec2)>,
    velocity_samples: RollingWindow<Vec2>,
    pair: Option<TouchPair>,
    events: Vec<GestureEvent>,
}

impl Default for GestureRecognizer {
    fn default() -> Self {
        Self::new(GestureConfig::default())
    }
}

impl GestureRecognizer {
    /// Create a recognizer with the given thresholds
    pub fn new(config: GestureConfig) -> Self {
        let window = config.velocity_window.max(1);
        Self {
            config,
            touches: BTreeMap::new(),
            states: HashMap::new(),
            last_tap: None,
            velocity_samples: RollingWindow::new(window),
            pair: None,
            events: Vec::new(),
        }
    }

    /// Active thresholds
    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    /// Current state of a gesture
    pub fn state(&self, kind: GestureKind) -> GestureState {
        self.states.get(&kind).copied().unwrap_or_default()
    }

    /// Number of touches currently down
    pub fn touch_count(&self) -> usize {
        self.touches.len()
    }

    /// Look up a tracked touch
    pub fn touch(&self, id: u64) -> Option<&Touch> {
        self.touches.get(&id)
    }

    /// Whether events are waiting to be drained
    pub fn has_pending_events(&self) -> bool {
        !self.events.is_empty()
    }

    /// Take every event produced since the last drain, oldest first
    pub fn drain_events(&mut self) -> Vec<GestureEvent> {
        std::mem::take(&mut self.events)
    }

    /// Forget every touch, gesture and pending event
    pub fn reset(&mut self) {
        self.touches.clear();
        self.states.clear();
        self.last_tap = None;
        self.velocity_samples.clear();
        self.pair = None;
        self.events.clear();
    }

    // ---- ingestion ----

    /// Fingers went down
    pub fn touches_began(&mut self, points: &[TouchPoint]) {
        let Some(now) = points.iter().map(|p| p.timestamp).reduce(f64::max) else {
            return;
        };
        for point in points {
            if self.touches.contains_key(&point.id) {
                log::debug!("Ignoring duplicate touch begin for id {}", point.id);
                continue;
            }
            self.touches.insert(point.id, Touch::begin(point));
        }

        if self.touches.len() == 1 {
            self.velocity_samples.clear();
        } else if self.pair.is_none() {
            self.begin_two_finger(now);
        }
    }

    /// Fingers moved
    pub fn touches_moved(&mut self, points: &[TouchPoint]) {
        let mut latest = None;
        for point in points {
            let Some(touch) = self.touches.get_mut(&point.id) else {
                continue;
            };
            let dt = (point.timestamp - touch.last_time) as f32;
            let delta = point.location - touch.location;
            touch.advance(point);

            if self.touches.len() == 1 && dt > EPSILON {
                self.velocity_samples.push(delta / dt);
            }
            latest = Some((point.id, point.timestamp));
        }

        let Some((id, now)) = latest else {
            return;
        };
        if self.pair.is_some() {
            self.update_two_finger(now);
        } else if self.touches.len() == 1 {
            self.update_single_finger(id, now);
        }
    }

    /// Fingers lifted
    pub fn touches_ended(&mut self, points: &[TouchPoint]) {
        let mut latest = None;
        for point in points {
            let Some(mut touch) = self.touches.remove(&point.id) else {
                continue;
            };
            touch.advance(point);
            touch.phase = TouchPhase::Ended;
            latest = Some(point.timestamp);

            let in_pair = self
                .pair
                .map_or(false, |pair| pair.ids.0 == touch.id || pair.ids.1 == touch.id);
            if in_pair {
                self.end_two_finger(point.timestamp, GestureState::Ended);
            } else if self.touches.is_empty() && !touch.suppressed {
                self.finish_single_finger(&touch, point.timestamp);
            }
        }

        if self.touches.is_empty() {
            self.clear_gesture_state();
        } else if self.touches.len() >= 2 && self.pair.is_none() {
            if let Some(now) = latest {
                self.begin_two_finger(now);
            }
        }
    }

    /// The system took touches away
    ///
    /// Every active gesture reports a single cancelled event and all
    /// per-gesture state is cleared. Touches still down are suppressed
    /// until lifted.
    pub fn touches_cancelled(&mut self, points: &[TouchPoint]) {
        let Some(now) = points.iter().map(|p| p.timestamp).reduce(f64::max) else {
            return;
        };
        let mut removed = false;
        for point in points {
            removed |= self.touches.remove(&point.id).is_some();
        }
        if !removed {
            return;
        }

        let location = self.centroid().unwrap_or_else(|| points[0].location);
        let count = self.touches.len();
        let mut active: Vec<GestureKind> = self
            .states
            .iter()
            .filter(|(_, state)| state.is_active())
            .map(|(kind, _)| *kind)
            .collect();
        active.sort();
        for kind in active {
            self.events
                .push(GestureEvent::new(kind, GestureState::Cancelled, location, count, now));
        }

        self.clear_gesture_state();
        for touch in self.touches.values_mut() {
            touch.suppressed = true;
        }
    }

    /// Poll stationary touches; call once per frame
    pub fn update(&mut self, timestamp: f64) {
        if self.touches.len() == 1 {
            self.check_long_press(timestamp);
        }
    }

    // ---- single finger ----

    fn check_long_press(&mut self, now: f64) {
        let Some(touch) = self.touches.values().next() else {
            return;
        };
        if touch.suppressed
            || self.state(GestureKind::LongPress) != GestureState::Possible
            || self.state(GestureKind::Pan).is_active()
            || self.state(GestureKind::Drag).is_active()
            || touch.displacement().norm() > self.config.max_tap_movement
            || touch.duration(now) < self.config.long_press_duration
        {
            return;
        }

        let event = GestureEvent::new(GestureKind::LongPress, GestureState::Began, touch.location, 1, now);
        log::trace!("Long press at {:?}", touch.location);
        self.emit(event);
    }

    fn update_single_finger(&mut self, id: u64, now: f64) {
        self.check_long_press(now);

        let Some(touch) = self.touches.get(&id) else {
            return;
        };
        if touch.suppressed {
            return;
        }
        let location = touch.location;
        let translation = touch.displacement();
        let velocity = self.smoothed_velocity();
        let moved_far = translation.norm() > self.config.max_tap_movement;

        let continuing = [GestureKind::Pan, GestureKind::Drag]
            .into_iter()
            .find(|&kind| self.state(kind).is_active());

        let transitions: Vec<(GestureKind, GestureState)> = match continuing {
            Some(kind) => vec![(kind, GestureState::Changed)],
            None if !moved_far => Vec::new(),
            None if self.state(GestureKind::LongPress).is_active() => vec![
                (GestureKind::LongPress, GestureState::Ended),
                (GestureKind::Drag, GestureState::Began),
            ],
            None if self.state(GestureKind::Pan) == GestureState::Possible
                && self.state(GestureKind::Drag) == GestureState::Possible =>
            {
                vec![(GestureKind::Pan, GestureState::Began)]
            }
            None => Vec::new(),
        };

        for (kind, state) in transitions {
            let event = GestureEvent::new(kind, state, location, 1, now).with_motion(translation, velocity);
            self.emit(event);
        }
    }

    fn finish_single_finger(&mut self, touch: &Touch, now: f64) {
        let location = touch.location;
        let translation = touch.displacement();
        let velocity = self.smoothed_velocity();
        let duration = touch.duration(now);

        if self.state(GestureKind::Pan).is_active() {
            self.emit(
                GestureEvent::new(GestureKind::Pan, GestureState::Ended, location, 0, now)
                    .with_motion(translation, velocity),
            );
            if velocity.norm() >= self.config.swipe_min_velocity && duration <= self.config.swipe_max_duration {
                let motion = if translation.norm() > EPSILON { translation } else { velocity };
                let mut swipe = GestureEvent::new(GestureKind::Swipe, GestureState::Ended, location, 0, now)
                    .with_motion(translation, velocity);
                swipe.swipe_direction = Some(SwipeDirection::from_motion(motion));
                self.emit(swipe);
            }
            return;
        }

        if let Some(kind) = [GestureKind::Drag, GestureKind::LongPress]
            .into_iter()
            .find(|&kind| self.state(kind).is_active())
        {
            self.emit(
                GestureEvent::new(kind, GestureState::Ended, location, 0, now).with_motion(translation, velocity),
            );
            return;
        }

        let is_tap = duration <= self.config.max_tap_duration && translation.norm() <= self.config.max_tap_movement;
        if !is_tap {
            self.states.insert(GestureKind::Tap, GestureState::Failed);
            return;
        }

        let is_double = self.last_tap.map_or(false, |(time, previous)| {
            (touch.start_time - time) as f32 <= self.config.double_tap_interval
                && (location - previous).norm() <= self.config.double_tap_distance
        });
        if is_double {
            self.last_tap = None;
            self.emit(GestureEvent::new(GestureKind::DoubleTap, GestureState::Ended, location, 0, now));
        } else {
            self.last_tap = Some((now, location));
            self.emit(GestureEvent::new(GestureKind::Tap, GestureState::Ended, location, 0, now));
        }
    }

    fn smoothed_velocity(&self) -> Vec2 {
        if self.velocity_samples.is_empty() {
            return Vec2::zeros();
        }
        let sum = self.velocity_samples.iter().fold(Vec2::zeros(), |acc, v| acc + v);
        sum / self.velocity_samples.len() as f32
    }

    // ---- two fingers ----

    fn begin_two_finger(&mut self, now: f64) {
        let location = self.touches.values().next().map_or_else(Vec2::zeros, |t| t.location);
        let count = self.touches.len();
        for kind in [GestureKind::Pan, GestureKind::Drag, GestureKind::LongPress] {
            if self.state(kind).is_active() {
                self.emit(GestureEvent::new(kind, GestureState::Ended, location, count, now));
            }
        }
        for touch in self.touches.values_mut() {
            touch.suppressed = true;
        }

        let mut ids = self.touches.keys().copied();
        let (Some(a), Some(b)) = (ids.next(), ids.next()) else {
            return;
        };
        let Some((_, distance, angle)) = self.pair_geometry(a, b) else {
            return;
        };
        self.states.remove(&GestureKind::Pinch);
        self.states.remove(&GestureKind::Rotation);
        self.pair = Some(TouchPair {
            ids: (a, b),
            start_distance: distance,
            start_angle: angle,
            scale: 1.0,
            rotation: 0.0,
        });
    }

    fn update_two_finger(&mut self, now: f64) {
        let Some(mut pair) = self.pair else {
            return;
        };
        let Some((centroid, distance, angle)) = self.pair_geometry(pair.ids.0, pair.ids.1) else {
            return;
        };
        let count = self.touches.len();

        if pair.start_distance > EPSILON {
            pair.scale = distance / pair.start_distance;
            let past_gate = (pair.scale - 1.0).abs() > self.config.min_pinch_scale_delta;
            if let Some(state) = self.next_state(GestureKind::Pinch, past_gate) {
                let mut event = GestureEvent::new(GestureKind::Pinch, state, centroid, count, now);
                event.scale = pair.scale;
                self.emit(event);
            }
        }

        pair.rotation = wrap_angle(angle - pair.start_angle);
        let past_gate = pair.rotation.abs() > self.config.min_rotation_angle;
        if let Some(state) = self.next_state(GestureKind::Rotation, past_gate) {
            let mut event = GestureEvent::new(GestureKind::Rotation, state, centroid, count, now);
            event.rotation = pair.rotation;
            self.emit(event);
        }

        self.pair = Some(pair);
    }

    /// Transition for a gated continuous gesture, if any
    fn next_state(&self, kind: GestureKind, past_gate: bool) -> Option<GestureState> {
        match self.state(kind) {
            GestureState::Possible if past_gate => Some(GestureState::Began),
            GestureState::Began | GestureState::Changed => Some(GestureState::Changed),
            _ => None,
        }
    }

    fn end_two_finger(&mut self, now: f64, final_state: GestureState) {
        let Some(pair) = self.pair.take() else {
            return;
        };
        let location = self.centroid().unwrap_or_else(Vec2::zeros);
        let count = self.touches.len();

        if self.state(GestureKind::Pinch).is_active() {
            let mut event = GestureEvent::new(GestureKind::Pinch, final_state, location, count, now);
            event.scale = pair.scale;
            self.emit(event);
        }
        if self.state(GestureKind::Rotation).is_active() {
            let mut event = GestureEvent::new(GestureKind::Rotation, final_state, location, count, now);
            event.rotation = pair.rotation;
            self.emit(event);
        }
    }

    fn pair_geometry(&self, a: u64, b: u64) -> Option<(Vec2, f32, f32)> {
        let first = self.touches.get(&a)?.location;
        let second = self.touches.get(&b)?.location;
        let offset = second - first;
        Some(((first + second) * 0.5, offset.norm(), offset.y.atan2(offset.x)))
    }

    fn centroid(&self) -> Option<Vec2> {
        if self.touches.is_empty() {
            return None;
        }
        let sum = self.touches.values().fold(Vec2::zeros(), |acc, t| acc + t.location);
        Some(sum / self.touches.len() as f32)
    }

    // ---- bookkeeping ----

    fn emit(&mut self, event: GestureEvent) {
        self.states.insert(event.kind, event.state);
        self.events.push(event);
    }

    fn clear_gesture_state(&mut self) {
        self.states.clear();
        self.velocity_samples.clear();
        self.pair = None;
    }
}
