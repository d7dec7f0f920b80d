//! Plain records for saving and restoring scene content
//!
//! The runtime never touches files. It converts entities to versioned
//! records (and RON text) and rebuilds entities from them; where the text
//! goes is up to the host.
//!
//! Content below an anchor is stored relative to that anchor and restored
//! under the anchor with the same id, so it reappears in the right physical
//! place once tracking relocalizes. Anchor entities themselves are owned by
//! the tracking subsystem and are not captured.

use std::collections::BTreeMap;

use nalgebra::Quaternion;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::entity_graph::EntityGraph;
use crate::ecs::components::AnchorComponent;
use crate::foundation::collections::EntityId;
use crate::foundation::math::{normalize_quat, Transform, Vec3};

/// Record format written by this version of the runtime
pub const FORMAT_VERSION: u32 = 1;

/// Errors converting records to or from text
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// Serialization failed
    #[error("Failed to encode scene record: {0}")]
    Encode(String),

    /// Text is not a valid record
    #[error("Failed to decode scene record: {0}")]
    Decode(String),

    /// Record was written by an unknown format version
    #[error("Unsupported record format version {found} (supported: {supported})")]
    UnsupportedVersion {
        /// Version found in the record
        found: u32,
        /// Version this runtime reads
        supported: u32,
    },

    /// Record names a stable id the graph reserves for itself
    #[error("Stable id '{0}' cannot be restored")]
    ReservedStableId(String),
}

/// One saved entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Record format version
    pub format_version: u32,
    /// Stable identifier of the entity
    pub stable_id: String,
    /// Display name
    pub name: String,
    /// Position relative to the parent anchor (or the world)
    pub position: [f32; 3],
    /// Rotation quaternion as x, y, z, w
    pub rotation: [f32; 4],
    /// Component-wise scale
    pub scale: [f32; 3],
    /// Anchor the pose is relative to
    #[serde(default)]
    pub parent_anchor_id: Option<String>,
    /// Opaque string metadata
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl EntityRecord {
    /// Build a record from a transform
    pub fn new(stable_id: impl Into<String>, name: impl Into<String>, transform: &Transform) -> Self {
        let q = transform.normalized_rotation();
        Self {
            format_version: FORMAT_VERSION,
            stable_id: stable_id.into(),
            name: name.into(),
            position: transform.position.into(),
            rotation: [q.i, q.j, q.k, q.w],
            scale: transform.scale.into(),
            parent_anchor_id: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Attach the record to an anchor
    pub fn with_parent_anchor(mut self, anchor_id: impl Into<String>) -> Self {
        self.parent_anchor_id = Some(anchor_id.into());
        self
    }

    /// Transform stored in the record
    ///
    /// The quaternion is renormalized and scale clamped positive, so a
    /// hand-edited record cannot produce a degenerate pose.
    pub fn transform(&self) -> Transform {
        let [x, y, z, w] = self.rotation;
        Transform {
            position: Vec3::from(self.position),
            rotation: normalize_quat(Quaternion::new(w, x, y, z)),
            scale: Vec3::from(self.scale),
        }
        .sanitized()
    }

    /// Reject records from other format versions
    pub fn check_version(&self) -> Result<(), PersistenceError> {
        check_version(self.format_version)
    }
}

/// A saved scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneRecord {
    /// Record format version
    pub format_version: u32,
    /// Saved entities, parents before children
    pub entities: Vec<EntityRecord>,
}

impl Default for SceneRecord {
    fn default() -> Self {
        Self {
            format_version: FORMAT_VERSION,
            entities: Vec::new(),
        }
    }
}

impl SceneRecord {
    /// Encode as pretty RON
    pub fn to_ron_string(&self) -> Result<String, PersistenceError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| PersistenceError::Encode(e.to_string()))
    }

    /// Decode from RON, checking every version field
    pub fn from_ron_str(text: &str) -> Result<Self, PersistenceError> {
        let record: SceneRecord = ron::from_str(text).map_err(|e| PersistenceError::Decode(e.to_string()))?;
        check_version(record.format_version)?;
        for entity in &record.entities {
            entity.check_version()?;
        }
        Ok(record)
    }
}

fn check_version(found: u32) -> Result<(), PersistenceError> {
    if found == FORMAT_VERSION {
        Ok(())
    } else {
        Err(PersistenceError::UnsupportedVersion {
            found,
            supported: FORMAT_VERSION,
        })
    }
}

/// Nearest ancestor of `entity` carrying an anchor component
pub fn anchor_ancestor(graph: &EntityGraph, entity: EntityId) -> Option<(EntityId, String)> {
    graph.ancestors(entity).into_iter().find_map(|ancestor| {
        graph
            .get_component::<AnchorComponent>(ancestor)
            .map(|anchor| (ancestor, anchor.anchor_id.clone()))
    })
}

/// Find the entity mirroring the anchor `anchor_id`
pub fn find_anchor_entity(graph: &EntityGraph, anchor_id: &str) -> Option<EntityId> {
    graph
        .entities_with_component(crate::ecs::ComponentKind::Anchor)
        .into_iter()
        .find(|&entity| {
            graph
                .get_component::<AnchorComponent>(entity)
                .map_or(false, |anchor| anchor.anchor_id == anchor_id)
        })
}

/// Capture one entity
///
/// The pose is taken relative to the nearest anchor ancestor, or in world
/// space when there is none.
pub fn capture_entity(graph: &EntityGraph, entity: EntityId) -> Option<EntityRecord> {
    let node = graph.get(entity)?;
    let anchor = anchor_ancestor(graph, entity);

    let relative_to = anchor.as_ref().map_or(graph.root(), |(id, _)| *id);
    let transform = if node.parent() == Some(relative_to) {
        node.transform
    } else {
        let reference = match &anchor {
            Some((id, _)) => graph.world_matrix(*id)?,
            None => crate::foundation::math::Mat4::identity(),
        };
        let inverse = reference.try_inverse()?;
        Transform::from_matrix(inverse * graph.world_matrix(entity)?)
    };

    let mut record = EntityRecord::new(node.stable_id(), node.name.clone(), &transform);
    record.metadata = node.metadata().clone();
    if let Some((_, anchor_id)) = anchor {
        record = record.with_parent_anchor(anchor_id);
    }
    Some(record)
}

/// Capture every live content entity in depth-first order
pub fn capture_scene(graph: &EntityGraph) -> SceneRecord {
    let entities = graph
        .descendants(graph.root())
        .into_iter()
        .filter(|&entity| !graph.has_component(entity, crate::ecs::ComponentKind::Anchor))
        .filter_map(|entity| capture_entity(graph, entity))
        .collect();
    SceneRecord {
        format_version: FORMAT_VERSION,
        entities,
    }
}

/// Rebuild one entity
///
/// An entity with the same stable id is updated in place; otherwise a new
/// one is created. It is placed under its anchor when that anchor is known,
/// or under the root (treating the pose as a world pose) when it is not.
pub fn restore_entity(graph: &mut EntityGraph, record: &EntityRecord) -> Result<EntityId, PersistenceError> {
    record.check_version()?;

    let parent = match &record.parent_anchor_id {
        Some(anchor_id) => find_anchor_entity(graph, anchor_id).unwrap_or_else(|| {
            log::debug!(
                "Anchor {} not present, restoring {} under the root",
                anchor_id,
                record.stable_id
            );
            graph.root()
        }),
        None => graph.root(),
    };

    let entity = match graph.find_by_stable_id(&record.stable_id) {
        Some(existing) if existing == graph.root() => {
            return Err(PersistenceError::ReservedStableId(record.stable_id.clone()));
        }
        Some(existing) => existing,
        None => graph
            .create_entity_with_stable_id(record.name.clone(), record.stable_id.clone())
            .ok_or_else(|| PersistenceError::ReservedStableId(record.stable_id.clone()))?,
    };
    graph.add_child(parent, entity);

    if let Some(node) = graph.get_mut(entity) {
        node.name = record.name.clone();
        node.transform = record.transform();
    }
    for (key, value) in &record.metadata {
        graph.set_metadata(entity, key.clone(), value.clone());
    }
    Ok(entity)
}

/// Rebuild every entity of a scene record
pub fn restore_scene(graph: &mut EntityGraph, record: &SceneRecord) -> Result<Vec<EntityId>, PersistenceError> {
    check_version(record.format_version)?;
    record
        .entities
        .iter()
        .map(|entity| restore_entity(graph, entity))
        .collect()
}
