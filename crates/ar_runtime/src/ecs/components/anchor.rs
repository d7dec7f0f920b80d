//! Anchor component
//!
//! Anchors are poses tracked in physical space by the external tracking
//! subsystem. Each known anchor is mirrored by one entity carrying this
//! component; content attached under it follows the anchor.

use serde::{Deserialize, Serialize};

use crate::ecs::{Component, ComponentKind, TypedComponent};
use crate::foundation::math::Vec2;

/// What the tracking subsystem anchored to
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AnchorKind {
    /// Arbitrary world-space pose
    World,
    /// Detected plane; `extent` is its size along local X and Z
    Plane {
        /// Full width and depth in meters
        extent: Vec2,
    },
    /// Detected reference image
    Image,
    /// Detected reference object
    Object,
    /// Tracked face
    Face,
}

impl AnchorKind {
    /// Whether the anchor describes a raycastable surface
    pub fn is_plane(&self) -> bool {
        matches!(self, Self::Plane { .. })
    }
}

/// Tracking quality reported for an anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackingState {
    /// Pose is reliable
    Tracking,
    /// Pose is available but degraded
    Limited,
    /// Tracking lost; the pose is stale
    NotTracking,
}

impl TrackingState {
    /// Whether anchored content should be shown
    pub fn is_visible(self) -> bool {
        !matches!(self, Self::NotTracking)
    }
}

/// Marks an entity as the scene node of a tracked anchor
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorComponent {
    /// Stable id assigned by the tracking subsystem
    pub anchor_id: String,
    /// What is being tracked
    pub kind: AnchorKind,
    /// Latest tracking quality
    pub tracking_state: TrackingState,
}

impl AnchorComponent {
    /// Create a new anchor component
    pub fn new(anchor_id: impl Into<String>, kind: AnchorKind) -> Self {
        Self {
            anchor_id: anchor_id.into(),
            kind,
            tracking_state: TrackingState::Tracking,
        }
    }
}

impl Component for AnchorComponent {
    fn kind(&self) -> ComponentKind {
        ComponentKind::Anchor
    }
}

impl TypedComponent for AnchorComponent {
    const KIND: ComponentKind = ComponentKind::Anchor;
}
