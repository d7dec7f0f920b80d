//! Raw touch samples and per-touch tracking

use crate::foundation::math::Vec2;

/// Phase of a tracked touch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TouchPhase {
    /// Finger went down this frame
    Began,
    /// Finger moved since the last sample
    Moved,
    /// Finger is down but did not move
    Stationary,
    /// Finger lifted
    Ended,
    /// System took the touch away
    Cancelled,
}

/// One touch sample delivered by the platform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchPoint {
    /// Identifier stable for the lifetime of the touch
    pub id: u64,
    /// Location in screen points
    pub location: Vec2,
    /// Sample time in seconds
    pub timestamp: f64,
}

impl TouchPoint {
    /// Create a new touch sample
    pub fn new(id: u64, location: Vec2, timestamp: f64) -> Self {
        Self {
            id,
            location,
            timestamp,
        }
    }
}

/// Everything the recognizer remembers about one active touch
#[derive(Debug, Clone, PartialEq)]
pub struct Touch {
    /// Touch identifier
    pub id: u64,
    /// Where the touch went down
    pub start_location: Vec2,
    /// When the touch went down
    pub start_time: f64,
    /// Latest location
    pub location: Vec2,
    /// Location before the latest sample
    pub previous_location: Vec2,
    /// Time of the latest sample
    pub last_time: f64,
    /// Latest phase
    pub phase: TouchPhase,
    /// Set once the touch took part in a two-finger gesture or a
    /// cancellation; such a touch never yields single-finger gestures
    pub suppressed: bool,
}

impl Touch {
    /// Start tracking a new touch
    pub fn begin(point: &TouchPoint) -> Self {
        Self {
            id: point.id,
            start_location: point.location,
            start_time: point.timestamp,
            location: point.location,
            previous_location: point.location,
            last_time: point.timestamp,
            phase: TouchPhase::Began,
            suppressed: false,
        }
    }

    /// Record a new sample
    pub fn advance(&mut self, point: &TouchPoint) {
        self.previous_location = self.location;
        self.phase = if point.location == self.location {
            TouchPhase::Stationary
        } else {
            TouchPhase::Moved
        };
        self.location = point.location;
        self.last_time = point.timestamp;
    }

    /// Offset from the start location
    pub fn displacement(&self) -> Vec2 {
        self.location - self.start_location
    }

    /// Seconds since the touch went down
    pub fn duration(&self, now: f64) -> f32 {
        (now - self.start_time).max(0.0) as f32
    }
}
