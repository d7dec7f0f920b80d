//! Anchor registry
//!
//! Mirrors every anchor reported by the tracking subsystem as an entity
//! directly under the root. Content attached below an anchor entity follows
//! its pose and is hidden while tracking is lost.

use std::collections::HashMap;

use log::{debug, warn};

use crate::ecs::components::{AnchorComponent, AnchorKind, TrackingState};
use crate::foundation::collections::EntityId;
use crate::foundation::math::{Mat4, Transform};
use crate::scene::persistence::find_anchor_entity;
use crate::scene::EntityGraph;

/// Pose update for one anchor
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorUpdate {
    /// Stable id assigned by the tracking subsystem
    pub anchor_id: String,
    /// What is being tracked
    pub kind: AnchorKind,
    /// Anchor-to-world matrix
    pub pose: Mat4,
    /// Tracking quality
    pub tracking_state: TrackingState,
}

impl AnchorUpdate {
    /// Create an update from a pose matrix
    pub fn new(anchor_id: impl Into<String>, kind: AnchorKind, pose: Mat4, tracking_state: TrackingState) -> Self {
        Self {
            anchor_id: anchor_id.into(),
            kind,
            pose,
            tracking_state,
        }
    }

    /// Create a tracking update from a transform
    pub fn tracking(anchor_id: impl Into<String>, kind: AnchorKind, pose: &Transform) -> Self {
        Self::new(anchor_id, kind, pose.to_matrix(), TrackingState::Tracking)
    }

    /// Pose decomposed into a transform
    pub fn transform(&self) -> Transform {
        Transform::from_matrix(self.pose)
    }
}

/// Anchor ids mapped to their entities
#[derive(Debug, Default)]
pub struct AnchorRegistry {
    entities: HashMap<String, EntityId>,
}

impl AnchorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Entity mirroring `anchor_id`
    pub fn get(&self, anchor_id: &str) -> Option<EntityId> {
        self.entities.get(anchor_id).copied()
    }

    /// Number of known anchors
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if no anchor is known
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Iterate `(anchor_id, entity)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, EntityId)> {
        self.entities.iter().map(|(id, entity)| (id.as_str(), *entity))
    }

    /// Forget every anchor, marking its entity as no longer tracked
    ///
    /// The entities stay in the graph, hidden, so attached content
    /// survives until the anchor is reported again.
    pub fn suspend(&mut self, graph: &mut EntityGraph) {
        for (anchor_id, entity) in self.entities.drain() {
            if let Some(anchor) = graph.get_component_mut::<AnchorComponent>(entity) {
                anchor.tracking_state = TrackingState::NotTracking;
            }
            graph.set_visible(entity, false);
            debug!("Anchor '{}' suspended", anchor_id);
        }
    }

    /// Create or update the entity for `update`
    ///
    /// Tracking state drives the anchor entity's visibility, which hides or
    /// shows everything attached below it.
    pub fn apply(&mut self, graph: &mut EntityGraph, update: &AnchorUpdate) -> EntityId {
        let known = self
            .get(&update.anchor_id)
            .filter(|&entity| graph.contains(entity))
            .or_else(|| self.adopt(graph, &update.anchor_id));
        let entity = match known {
            Some(entity) => entity,
            None => self.create(graph, update),
        };

        if let Some(node) = graph.get_mut(entity) {
            node.transform = update.transform();
        }
        if let Some(anchor) = graph.get_component_mut::<AnchorComponent>(entity) {
            if anchor.tracking_state != update.tracking_state {
                debug!(
                    "Anchor '{}' tracking {:?} -> {:?}",
                    update.anchor_id, anchor.tracking_state, update.tracking_state
                );
            }
            anchor.kind = update.kind;
            anchor.tracking_state = update.tracking_state;
        }
        graph.set_visible(entity, update.tracking_state.is_visible());
        entity
    }

    /// Take over an entity left in the graph by an earlier session
    fn adopt(&mut self, graph: &EntityGraph, anchor_id: &str) -> Option<EntityId> {
        let entity = find_anchor_entity(graph, anchor_id)?;
        self.entities.insert(anchor_id.to_string(), entity);
        debug!("Anchor '{}' re-adopted {:?}", anchor_id, entity);
        Some(entity)
    }

    fn create(&mut self, graph: &mut EntityGraph, update: &AnchorUpdate) -> EntityId {
        let name = format!("anchor:{}", update.anchor_id);
        let entity = match graph.create_entity_with_stable_id(name.clone(), format!("anchor-{}", update.anchor_id)) {
            Some(entity) => entity,
            None => graph.create_entity(name),
        };
        graph.add_child(graph.root(), entity);
        graph.add_component(entity, AnchorComponent::new(update.anchor_id.clone(), update.kind));
        self.entities.insert(update.anchor_id.clone(), entity);
        debug!("Anchor '{}' registered as {:?}", update.anchor_id, entity);
        entity
    }

    /// Reparent `entity` under the anchor, keeping its local transform
    pub fn attach(&self, graph: &mut EntityGraph, anchor_id: &str, entity: EntityId) -> bool {
        match self.get(anchor_id) {
            Some(anchor) => graph.add_child(anchor, entity),
            None => {
                warn!("Cannot attach {:?}: unknown anchor '{}'", entity, anchor_id);
                false
            }
        }
    }

    /// Destroy the anchor entity and its subtree
    ///
    /// Returns every destroyed entity.
    pub fn remove(&mut self, graph: &mut EntityGraph, anchor_id: &str) -> Vec<EntityId> {
        match self.entities.remove(anchor_id).or_else(|| find_anchor_entity(graph, anchor_id)) {
            Some(entity) => graph.destroy(entity),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Vec2, Vec3};
    use approx::assert_relative_eq;

    fn plane() -> AnchorKind {
        AnchorKind::Plane {
            extent: Vec2::new(2.0, 2.0),
        }
    }

    #[test]
    fn test_update_creates_then_moves_anchor() {
        let mut graph = EntityGraph::new();
        let mut anchors = AnchorRegistry::new();

        let first = anchors.apply(
            &mut graph,
            &AnchorUpdate::tracking("floor", plane(), &Transform::from_position(Vec3::new(0.0, -1.0, 0.0))),
        );
        let second = anchors.apply(
            &mut graph,
            &AnchorUpdate::tracking("floor", plane(), &Transform::from_position(Vec3::new(0.0, -1.5, 0.0))),
        );

        assert_eq!(first, second);
        assert_eq!(graph.parent(first), Some(graph.root()));
        assert_relative_eq!(
            graph.world_position(first).expect("live"),
            Vec3::new(0.0, -1.5, 0.0),
            epsilon = 1e-5
        );
    }

    #[test]
    fn test_tracking_loss_hides_attached_content() {
        let mut graph = EntityGraph::new();
        let mut anchors = AnchorRegistry::new();
        let pose = Transform::identity();
        anchors.apply(&mut graph, &AnchorUpdate::tracking("table", plane(), &pose));
        let cup = graph.create_entity("cup");
        assert!(anchors.attach(&mut graph, "table", cup));

        let mut lost = AnchorUpdate::tracking("table", plane(), &pose);
        lost.tracking_state = TrackingState::NotTracking;
        anchors.apply(&mut graph, &lost);
        assert!(!graph.is_visible_in_hierarchy(cup));

        anchors.apply(&mut graph, &AnchorUpdate::tracking("table", plane(), &pose));
        assert!(graph.is_visible_in_hierarchy(cup));
    }

    #[test]
    fn test_remove_destroys_subtree() {
        let mut graph = EntityGraph::new();
        let mut anchors = AnchorRegistry::new();
        let anchor = anchors.apply(&mut graph, &AnchorUpdate::tracking("a", AnchorKind::World, &Transform::identity()));
        let child = graph.create_entity("child");
        anchors.attach(&mut graph, "a", child);

        let removed = anchors.remove(&mut graph, "a");

        assert_eq!(removed.len(), 2);
        assert!(!graph.contains(anchor));
        assert!(!graph.contains(child));
        assert!(anchors.is_empty());
    }

    #[test]
    fn test_suspended_anchor_is_adopted_on_next_update() {
        let mut graph = EntityGraph::new();
        let mut anchors = AnchorRegistry::new();
        let pose = Transform::identity();
        let first = anchors.apply(&mut graph, &AnchorUpdate::tracking("floor", plane(), &pose));
        let rug = graph.create_entity("rug");
        anchors.attach(&mut graph, "floor", rug);

        anchors.suspend(&mut graph);
        assert!(anchors.is_empty());
        assert!(!graph.is_visible_in_hierarchy(rug));
        assert_eq!(
            graph.get_component::<AnchorComponent>(first).map(|a| a.tracking_state),
            Some(TrackingState::NotTracking)
        );

        let second = anchors.apply(&mut graph, &AnchorUpdate::tracking("floor", plane(), &pose));

        assert_eq!(first, second);
        assert_eq!(graph.entities_with_component(crate::ecs::ComponentKind::Anchor).len(), 1);
        assert!(graph.is_visible_in_hierarchy(rug));
    }

    #[test]
    fn test_attach_to_unknown_anchor_fails() {
        let mut graph = EntityGraph::new();
        let anchors = AnchorRegistry::new();
        let entity = graph.create_entity("lonely");

        assert!(!anchors.attach(&mut graph, "missing", entity));
    }
}
