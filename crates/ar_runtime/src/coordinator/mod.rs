//! Session coordination
//!
//! - [`lifecycle`] - the session state machine
//! - [`session`] - the [`Coordinator`] driving every subsystem per tick
//! - [`picking`] - raycasts from touches into the scene
//! - [`anchors`] - entities mirroring tracked anchors

pub mod anchors;
pub mod lifecycle;
pub mod picking;
pub mod session;

pub use anchors::{AnchorRegistry, AnchorUpdate};
pub use lifecycle::{LifecycleEvent, SessionState};
pub use picking::{PickHit, PickTarget};
pub use session::{Coordinator, CoordinatorError};
