//! Property animation
//!
//! - [`easing`] - easing curves
//! - [`animation`] - a single animation and its clock
//! - [`controller`] - the registry that advances animations every tick

#[allow(clippy::module_inception)]
pub mod animation;
pub mod controller;
pub mod easing;

pub use animation::{Animation, AnimationTrack, CompletionCallback, PlaybackState, ProgressCallback};
pub use controller::AnimationController;
pub use easing::Easing;
