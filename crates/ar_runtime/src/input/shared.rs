//! Lock-guarded gesture recognizer handle
//!
//! Touches may be delivered on a different thread than the update loop.
//! Every ingestion call takes the lock before any transition is evaluated,
//! so gesture state never changes concurrently.

use std::sync::{Arc, Mutex, MutexGuard};

use super::gestures::{GestureEvent, GestureRecognizer};
use super::touch::TouchPoint;
use crate::core::config::GestureConfig;

/// Cloneable handle to a recognizer shared between threads
#[derive(Clone, Debug, Default)]
pub struct SharedGestureRecognizer {
    inner: Arc<Mutex<GestureRecognizer>>,
}

impl SharedGestureRecognizer {
    /// Create a handle around a new recognizer
    pub fn new(config: GestureConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(GestureRecognizer::new(config))),
        }
    }

    /// Take the lock, recovering from poisoning
    pub fn lock(&self) -> MutexGuard<'_, GestureRecognizer> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            log::warn!("Gesture recognizer lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// See [`GestureRecognizer::touches_began`]
    pub fn touches_began(&self, points: &[TouchPoint]) {
        self.lock().touches_began(points);
    }

    /// See [`GestureRecognizer::touches_moved`]
    pub fn touches_moved(&self, points: &[TouchPoint]) {
        self.lock().touches_moved(points);
    }

    /// See [`GestureRecognizer::touches_ended`]
    pub fn touches_ended(&self, points: &[TouchPoint]) {
        self.lock().touches_ended(points);
    }

    /// See [`GestureRecognizer::touches_cancelled`]
    pub fn touches_cancelled(&self, points: &[TouchPoint]) {
        self.lock().touches_cancelled(points);
    }

    /// Poll for time-based recognition, then drain the pending events
    pub fn poll(&self, timestamp: f64) -> Vec<GestureEvent> {
        let mut recognizer = self.lock();
        recognizer.update(timestamp);
        recognizer.drain_events()
    }

    /// See [`GestureRecognizer::reset`]
    pub fn reset(&self) {
        self.lock().reset();
    }
}
