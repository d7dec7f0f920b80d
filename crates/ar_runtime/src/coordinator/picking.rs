//! Raycast resolution against everything a touch can hit
//!
//! Three kinds of targets take part:
//! - rigid bodies, through the physics world's raycast
//! - entities with an [`InteractionComponent`], as bounding spheres built
//!   from an explicit radius or their loaded asset bounds
//! - detected plane anchors, as finite rectangles in the anchor's XZ plane
//!
//! Interaction spheres are pre-filtered through a [`SpatialIndex`] of their
//! AABBs before the exact sphere test.

use crate::ecs::components::{AnchorComponent, AnchorKind, InteractionComponent};
use crate::ecs::ComponentKind;
use crate::foundation::collections::EntityId;
use crate::foundation::math::{Point3, Transform, Vec2, Vec3, EPSILON};
use crate::physics::{BoundingSphere, PhysicsWorld, Ray};
use crate::scene::{Aabb, EntityGraph, SpatialIndex};

/// What a pick ray hit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickTarget {
    /// A scene entity
    Entity(EntityId),
    /// A detected surface; carries the plane anchor's entity
    Surface(EntityId),
}

/// One intersection along a pick ray
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickHit {
    /// What was hit
    pub target: PickTarget,
    /// World-space hit point
    pub point: Vec3,
    /// Surface normal facing the ray origin
    pub normal: Vec3,
    /// Distance from the ray origin
    pub distance: f32,
}

impl PickHit {
    /// Entity hit, if the target is an entity rather than a surface
    pub fn entity(&self) -> Option<EntityId> {
        match self.target {
            PickTarget::Entity(entity) => Some(entity),
            PickTarget::Surface(_) => None,
        }
    }
}

/// Entities a touch may interact with: live, visible and enabled
fn is_pickable(graph: &EntityGraph, entity: EntityId) -> bool {
    graph.is_live(entity) && graph.is_visible_in_hierarchy(entity) && graph.is_enabled_in_hierarchy(entity)
}

/// World-space hit sphere of an interaction target
pub fn interaction_sphere(graph: &EntityGraph, entity: EntityId) -> Option<BoundingSphere> {
    let component = graph.get_component::<InteractionComponent>(entity)?;
    if !component.enabled || !is_pickable(graph, entity) {
        return None;
    }
    let world = graph.world_matrix(entity)?;
    let scale = Transform::from_matrix(world).positive_scale().amax();

    let (local_center, local_radius) = match component.radius {
        Some(radius) => (Vec3::zeros(), radius),
        None => {
            let bounds = graph.get(entity)?.asset_state.bounds()?;
            (bounds.center, bounds.radius())
        }
    };
    let center = world.transform_point(&Point3::from(local_center)).coords;
    Some(BoundingSphere::new(center, local_radius * scale))
}

/// Rebuild `index` from the current interaction targets of `graph`
pub fn refresh_interaction_index(graph: &EntityGraph, index: &mut dyn SpatialIndex) {
    index.clear();
    for entity in graph.entities_with_component(ComponentKind::Interaction) {
        if let Some(sphere) = interaction_sphere(graph, entity) {
            index.insert(entity, Aabb::from_sphere(sphere.center, sphere.radius));
        }
    }
}

/// Every hit along `ray` within `max_distance`, nearest first
pub fn pick(
    graph: &EntityGraph,
    physics: &PhysicsWorld,
    index: &dyn SpatialIndex,
    ray: &Ray,
    max_distance: f32,
) -> Vec<PickHit> {
    let mut hits = Vec::new();

    for hit in physics.raycast_all(ray.origin, ray.direction, max_distance) {
        let is_trigger = physics.body(hit.body).map_or(true, |body| body.is_trigger);
        if is_trigger || !is_pickable(graph, hit.entity) {
            continue;
        }
        hits.push(PickHit {
            target: PickTarget::Entity(hit.entity),
            point: hit.point,
            normal: hit.normal,
            distance: hit.distance,
        });
    }

    for (entity, _) in index.query_ray(ray.origin, ray.direction, max_distance) {
        let Some(sphere) = interaction_sphere(graph, entity) else {
            continue;
        };
        let Some(distance) = sphere.intersect_ray(ray).filter(|&d| d <= max_distance) else {
            continue;
        };
        let point = ray.point_at(distance);
        hits.push(PickHit {
            target: PickTarget::Entity(entity),
            point,
            normal: (point - sphere.center)
                .try_normalize(EPSILON)
                .unwrap_or(-ray.direction),
            distance,
        });
    }

    for entity in graph.entities_with_component(ComponentKind::Anchor) {
        let Some(anchor) = graph.get_component::<AnchorComponent>(entity) else {
            continue;
        };
        let AnchorKind::Plane { extent } = anchor.kind else {
            continue;
        };
        if !anchor.tracking_state.is_visible() || !is_pickable(graph, entity) {
            continue;
        }
        if let Some(hit) = intersect_plane(graph, entity, extent, ray, max_distance) {
            hits.push(hit);
        }
    }

    hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    hits
}

/// Hit on the finite plane of an anchor, in the anchor's local XZ plane
fn intersect_plane(graph: &EntityGraph, entity: EntityId, extent: Vec2, ray: &Ray, max_distance: f32) -> Option<PickHit> {
    let world = graph.world_matrix(entity)?;
    let inverse = world.try_inverse()?;

    let local_ray = Ray::new(
        inverse.transform_point(&Point3::from(ray.origin)).coords,
        inverse.transform_vector(&ray.direction),
    )?;
    let t = local_ray.intersect_horizontal_plane(0.0)?;
    let local_point = local_ray.point_at(t);
    if local_point.x.abs() > extent.x * 0.5 || local_point.z.abs() > extent.y * 0.5 {
        return None;
    }

    let point = world.transform_point(&Point3::from(local_point)).coords;
    let distance = (point - ray.origin).norm();
    if distance > max_distance {
        return None;
    }

    let mut normal = world
        .transform_vector(&Vec3::y())
        .try_normalize(EPSILON)
        .unwrap_or_else(Vec3::y);
    if normal.dot(&ray.direction) > 0.0 {
        normal = -normal;
    }

    Some(PickHit {
        target: PickTarget::Surface(entity),
        point,
        normal,
        distance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{AssetLoadState, MeshBounds};
    use crate::core::PhysicsConfig;
    use crate::ecs::components::TrackingState;
    use crate::physics::{CollisionShape, RigidBodyDesc};
    use crate::scene::ListSpatialIndex;
    use approx::assert_relative_eq;

    fn forward_ray() -> Ray {
        Ray::new(Vec3::zeros(), Vec3::new(0.0, 0.0, -1.0)).expect("ray")
    }

    fn spawn_target(graph: &mut EntityGraph, name: &str, position: Vec3, radius: f32) -> EntityId {
        let root = graph.root();
        let entity = graph.spawn(root, name).expect("root exists");
        graph.set_local_transform(entity, Transform::from_position(position));
        graph.add_component(entity, InteractionComponent::new().with_radius(radius));
        entity
    }

    fn spawn_floor(graph: &mut EntityGraph, height: f32, size: f32) -> EntityId {
        let root = graph.root();
        let floor = graph.spawn(root, "floor").expect("root exists");
        graph.set_local_transform(floor, Transform::from_position(Vec3::new(0.0, height, 0.0)));
        graph.add_component(
            floor,
            AnchorComponent::new(
                "floor",
                AnchorKind::Plane {
                    extent: Vec2::new(size, size),
                },
            ),
        );
        floor
    }

    fn pick_with_index(graph: &EntityGraph, physics: &PhysicsWorld, ray: &Ray) -> Vec<PickHit> {
        let mut index = ListSpatialIndex::new();
        refresh_interaction_index(graph, &mut index);
        pick(graph, physics, &index, ray, 100.0)
    }

    #[test]
    fn test_nearest_interaction_target_first() {
        let mut graph = EntityGraph::new();
        let near = spawn_target(&mut graph, "near", Vec3::new(0.0, 0.0, -2.0), 0.5);
        let far = spawn_target(&mut graph, "far", Vec3::new(0.0, 0.0, -5.0), 0.5);
        let physics = PhysicsWorld::new(PhysicsConfig::default());

        let hits = pick_with_index(&graph, &physics, &forward_ray());

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].entity(), Some(near));
        assert_eq!(hits[1].entity(), Some(far));
        assert_relative_eq!(hits[0].distance, 1.5, epsilon = 1e-5);
        assert_relative_eq!(hits[0].normal, Vec3::new(0.0, 0.0, 1.0), epsilon = 1e-5);
    }

    #[test]
    fn test_hidden_or_disabled_targets_are_skipped() {
        let mut graph = EntityGraph::new();
        let hidden = spawn_target(&mut graph, "hidden", Vec3::new(0.0, 0.0, -2.0), 0.5);
        let visible = spawn_target(&mut graph, "visible", Vec3::new(0.0, 0.0, -4.0), 0.5);
        graph.set_visible(hidden, false);
        let physics = PhysicsWorld::new(PhysicsConfig::default());

        let hits = pick_with_index(&graph, &physics, &forward_ray());

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entity(), Some(visible));
    }

    #[test]
    fn test_asset_bounds_used_without_radius() {
        let mut graph = EntityGraph::new();
        let root = graph.root();
        let model = graph.spawn(root, "model").expect("root exists");
        graph.set_local_transform(model, Transform::from_position(Vec3::new(0.0, 0.0, -3.0)));
        graph.add_component(model, InteractionComponent::new());
        let physics = PhysicsWorld::new(PhysicsConfig::default());

        assert!(pick_with_index(&graph, &physics, &forward_ray()).is_empty());

        if let Some(node) = graph.get_mut(model) {
            node.asset_state = AssetLoadState::Loaded(MeshBounds::new(Vec3::zeros(), Vec3::new(0.5, 0.5, 0.5)));
        }
        let hits = pick_with_index(&graph, &physics, &forward_ray());

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entity(), Some(model));
    }

    #[test]
    fn test_physics_bodies_are_hit_but_triggers_are_not() {
        let mut graph = EntityGraph::new();
        let root = graph.root();
        let ball = graph.spawn(root, "ball").expect("root exists");
        let zone = graph.spawn(root, "zone").expect("root exists");
        let mut physics = PhysicsWorld::new(PhysicsConfig::default());
        physics.add_body(
            zone,
            RigidBodyDesc::fixed()
                .with_shape(CollisionShape::sphere(0.5))
                .with_position(Vec3::new(0.0, 0.0, -2.0))
                .with_trigger(true),
        );
        physics.add_body(
            ball,
            RigidBodyDesc::fixed()
                .with_shape(CollisionShape::sphere(0.5))
                .with_position(Vec3::new(0.0, 0.0, -4.0)),
        );

        let hits = pick_with_index(&graph, &physics, &forward_ray());

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entity(), Some(ball));
        assert_relative_eq!(hits[0].distance, 3.5, epsilon = 1e-4);
    }

    #[test]
    fn test_plane_anchor_is_a_surface() {
        let mut graph = EntityGraph::new();
        let floor = spawn_floor(&mut graph, -1.0, 4.0);
        let physics = PhysicsWorld::new(PhysicsConfig::default());
        let down = Ray::new(Vec3::zeros(), Vec3::new(0.0, -1.0, -1.0)).expect("ray");

        let hits = pick_with_index(&graph, &physics, &down);

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].target, PickTarget::Surface(floor));
        assert_eq!(hits[0].entity(), None);
        assert_relative_eq!(hits[0].point, Vec3::new(0.0, -1.0, -1.0), epsilon = 1e-5);
        assert_relative_eq!(hits[0].normal, Vec3::y(), epsilon = 1e-5);
    }

    #[test]
    fn test_plane_extent_and_tracking_limit_hits() {
        let mut graph = EntityGraph::new();
        let floor = spawn_floor(&mut graph, -1.0, 1.0);
        let physics = PhysicsWorld::new(PhysicsConfig::default());
        let far_down = Ray::new(Vec3::zeros(), Vec3::new(0.0, -1.0, -3.0)).expect("ray");
        let near_down = Ray::new(Vec3::zeros(), Vec3::new(0.0, -1.0, -0.2)).expect("ray");

        assert!(pick_with_index(&graph, &physics, &far_down).is_empty());
        assert_eq!(pick_with_index(&graph, &physics, &near_down).len(), 1);

        if let Some(anchor) = graph.get_component_mut::<AnchorComponent>(floor) {
            anchor.tracking_state = TrackingState::NotTracking;
        }
        assert!(pick_with_index(&graph, &physics, &near_down).is_empty());
    }
}
