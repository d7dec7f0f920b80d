//! Asset load tracking
//!
//! Loading itself happens outside the runtime. The runtime only records
//! that an entity is waiting for content, and later attaches either the
//! loaded mesh bounds or a typed failure to it, so the scene graph stays
//! consistent when content is missing.

use std::collections::HashMap;

use thiserror::Error;

use crate::foundation::collections::EntityId;
use crate::foundation::math::Vec3;
use crate::physics::BoundingSphere;
use crate::scene::Aabb;

/// Why an asset failed to load
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssetLoadError {
    /// Source does not exist
    #[error("Asset not found: {0}")]
    NotFound(String),

    /// Source exists but could not be decoded
    #[error("Failed to decode asset: {0}")]
    Decode(String),

    /// Load was abandoned before completing
    #[error("Asset load cancelled")]
    Cancelled,
}

/// Identifier of one outstanding load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetRequestId(u64);

impl AssetRequestId {
    /// Raw numeric value
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Local-space bounds of a loaded mesh
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshBounds {
    /// Center relative to the entity origin
    pub center: Vec3,
    /// Half size along each axis
    pub half_extents: Vec3,
}

impl MeshBounds {
    /// Create bounds from a center and half extents
    pub fn new(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            center,
            half_extents: half_extents.abs(),
        }
    }

    /// Create bounds enclosing min / max corners
    pub fn from_min_max(min: Vec3, max: Vec3) -> Self {
        Self::new((min + max) * 0.5, (max - min) * 0.5)
    }

    /// Radius of the sphere around the entity origin enclosing the bounds
    pub fn radius(&self) -> f32 {
        self.center.norm() + self.half_extents.norm()
    }

    /// Sphere enclosing the bounds in local space
    pub fn bounding_sphere(&self) -> BoundingSphere {
        BoundingSphere::new(self.center, self.half_extents.norm())
    }

    /// Axis aligned box in local space
    pub fn aabb(&self) -> Aabb {
        Aabb::from_center_extents(self.center, self.half_extents)
    }
}

/// Where an entity's content is in its load lifecycle
#[derive(Debug, Clone, PartialEq, Default)]
pub enum AssetLoadState {
    /// Entity has no content to load
    #[default]
    NotRequested,
    /// Waiting for the host to finish a load
    Loading {
        /// Outstanding request
        request: AssetRequestId,
        /// Source passed to the loader
        source: String,
    },
    /// Content is available
    Loaded(MeshBounds),
    /// Content could not be loaded
    Failed(AssetLoadError),
}

impl AssetLoadState {
    /// Bounds of loaded content
    pub fn bounds(&self) -> Option<&MeshBounds> {
        match self {
            Self::Loaded(bounds) => Some(bounds),
            _ => None,
        }
    }

    /// Whether a load is in flight
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading { .. })
    }
}

/// A load handed out by [`AssetRequests::begin`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAsset {
    /// Entity waiting for the content
    pub entity: EntityId,
    /// Source passed to the loader
    pub source: String,
}

/// Outstanding asset loads keyed by request id
#[derive(Debug, Default)]
pub struct AssetRequests {
    pending: HashMap<AssetRequestId, PendingAsset>,
    next_id: u64,
}

impl AssetRequests {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new load for `entity`
    pub fn begin(&mut self, entity: EntityId, source: impl Into<String>) -> AssetRequestId {
        self.next_id += 1;
        let id = AssetRequestId(self.next_id);
        self.pending.insert(
            id,
            PendingAsset {
                entity,
                source: source.into(),
            },
        );
        id
    }

    /// Take a finished request; `None` when unknown or already finished
    pub fn finish(&mut self, id: AssetRequestId) -> Option<PendingAsset> {
        self.pending.remove(&id)
    }

    /// Drop every request belonging to `entity`
    pub fn cancel_for(&mut self, entity: EntityId) -> Vec<AssetRequestId> {
        let cancelled: Vec<AssetRequestId> = self
            .pending
            .iter()
            .filter(|(_, pending)| pending.entity == entity)
            .map(|(id, _)| *id)
            .collect();
        for id in &cancelled {
            self.pending.remove(id);
        }
        cancelled
    }

    /// Number of loads in flight
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether no load is in flight
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Forget every outstanding request
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
