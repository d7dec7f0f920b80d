//! Scene management
//!
//! - [`entity_graph`] - the arena-backed entity tree
//! - [`shared`] - lock-guarded handle for multi-threaded access
//! - [`scene_graph`] - bounding boxes and the spatial index used for picking
//! - [`persistence`] - versioned records for saving and restoring content

pub mod entity_graph;
pub mod persistence;
pub mod scene_graph;
pub mod shared;

pub use entity_graph::{EntityGraph, EntityNode, ROOT_NAME};
pub use persistence::{EntityRecord, PersistenceError, SceneRecord, FORMAT_VERSION};
pub use scene_graph::{Aabb, ListSpatialIndex, SpatialIndex};
pub use shared::SharedEntityGraph;
