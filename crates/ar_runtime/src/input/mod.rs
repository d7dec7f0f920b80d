//! Touch input and gesture recognition
//!
//! - [`touch`] - raw samples and per-touch tracking
//! - [`gestures`] - the multi-touch gesture state machine
//! - [`shared`] - thread-safe recognizer handle
//! - [`picking`] - screen points to world rays

pub mod gestures;
pub mod picking;
pub mod shared;
pub mod touch;

pub use gestures::{GestureEvent, GestureKind, GestureRecognizer, GestureState, SwipeDirection};
pub use picking::{CameraFrame, Viewport};
pub use shared::SharedGestureRecognizer;
pub use touch::{Touch, TouchPhase, TouchPoint};
