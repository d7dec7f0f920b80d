//! Spatial index over entity bounds
//!
//! Raycasts against interaction targets first narrow the candidate set
//! through a spatial index of world-space boxes, then run the exact
//! per-target test. The index is a trait so a tree-based structure can
//! replace the flat list without touching callers.

use crate::foundation::collections::EntityId;
use crate::foundation::math::Vec3;

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner
    pub min: Vec3,
    /// Maximum corner
    pub max: Vec3,
}

impl Aabb {
    /// Create a box from its corners
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.inf(&max),
            max: min.sup(&max),
        }
    }

    /// Create a box centered at a point with given half extents
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        let extents = extents.abs();
        Self {
            min: center - extents,
            max: center + extents,
        }
    }

    /// Smallest box enclosing a sphere
    pub fn from_sphere(center: Vec3, radius: f32) -> Self {
        Self::from_center_extents(center, Vec3::repeat(radius.abs()))
    }

    /// Center of the box
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Half size along each axis
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Whether `point` lies inside or on the box
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// Slab test; distance to the entry point, or 0 when the origin is inside
    pub fn intersect_ray(&self, origin: Vec3, direction: Vec3) -> Option<f32> {
        let inverse = direction.map(|d| if d != 0.0 { 1.0 / d } else { f32::INFINITY });

        let t1 = (self.min - origin).component_mul(&inverse);
        let t2 = (self.max - origin).component_mul(&inverse);

        let near = t1.inf(&t2);
        let far = t1.sup(&t2);
        let t_min = near.x.max(near.y).max(near.z);
        let t_max = far.x.min(far.y).min(far.z);

        // NaN slabs (origin on a face with zero direction) count as hits
        if t_max >= t_min && t_max >= 0.0 {
            Some(t_min.max(0.0))
        } else if t_min.is_nan() || t_max.is_nan() {
            self.contains_point(origin).then_some(0.0)
        } else {
            None
        }
    }
}

/// Spatial data structure keyed by entity
pub trait SpatialIndex: Send {
    /// Insert or replace the bounds of `entity`
    fn insert(&mut self, entity: EntityId, bounds: Aabb);

    /// Remove `entity`; returns whether it was present
    fn remove(&mut self, entity: EntityId) -> bool;

    /// Entities whose bounds the ray enters within `max_distance`,
    /// with the entry distance, closest first
    fn query_ray(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Vec<(EntityId, f32)>;

    /// Number of indexed entities
    fn len(&self) -> usize;

    /// Whether the index is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every entity
    fn clear(&mut self);
}

/// Flat list index with linear queries
///
/// Plenty for the few dozen interactive objects of a typical AR scene.
#[derive(Debug, Default)]
pub struct ListSpatialIndex {
    entries: Vec<(EntityId, Aabb)>,
}

impl ListSpatialIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Bounds currently stored for `entity`
    pub fn bounds(&self, entity: EntityId) -> Option<Aabb> {
        self.entries
            .iter()
            .find(|(e, _)| *e == entity)
            .map(|(_, bounds)| *bounds)
    }
}

impl SpatialIndex for ListSpatialIndex {
    fn insert(&mut self, entity: EntityId, bounds: Aabb) {
        match self.entries.iter_mut().find(|(e, _)| *e == entity) {
            Some(entry) => entry.1 = bounds,
            None => self.entries.push((entity, bounds)),
        }
    }

    fn remove(&mut self, entity: EntityId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(e, _)| *e != entity);
        self.entries.len() != before
    }

    fn query_ray(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Vec<(EntityId, f32)> {
        let mut hits: Vec<(EntityId, f32)> = self
            .entries
            .iter()
            .filter_map(|(entity, bounds)| {
                bounds
                    .intersect_ray(origin, direction)
                    .filter(|&distance| distance <= max_distance)
                    .map(|distance| (*entity, distance))
            })
            .collect();
        hits.sort_by(|a, b| a.1.total_cmp(&b.1));
        hits
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::collections::SlotMap;
    use approx::assert_relative_eq;

    fn ids(count: usize) -> Vec<EntityId> {
        let mut map: SlotMap<EntityId, ()> = SlotMap::with_key();
        (0..count).map(|_| map.insert(())).collect()
    }

    #[test]
    fn test_aabb_creation() {
        let aabb = Aabb::new(Vec3::new(1.0, 1.0, 1.0), Vec3::new(-1.0, -1.0, -1.0));
        assert_eq!(aabb.min, Vec3::new(-1.0, -1.0, -1.0));
        assert_eq!(aabb.center(), Vec3::zeros());
        assert_eq!(aabb.extents(), Vec3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn test_aabb_contains_point() {
        let aabb = Aabb::from_center_extents(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0));

        assert!(aabb.contains_point(Vec3::new(0.0, 0.0, 0.0)));
        assert!(aabb.contains_point(Vec3::new(0.5, 0.5, 0.5)));
        assert!(!aabb.contains_point(Vec3::new(2.0, 0.0, 0.0)));
    }

    #[test]
    fn test_aabb_ray_entry_distance() {
        let aabb = Aabb::from_center_extents(Vec3::new(0.0, 0.0, -5.0), Vec3::new(1.0, 1.0, 1.0));

        let hit = aabb.intersect_ray(Vec3::zeros(), Vec3::new(0.0, 0.0, -1.0));
        assert_relative_eq!(hit.expect("hit"), 4.0);

        assert!(aabb.intersect_ray(Vec3::zeros(), Vec3::new(0.0, 0.0, 1.0)).is_none());
        assert_eq!(
            aabb.intersect_ray(Vec3::new(0.0, 0.0, -5.0), Vec3::new(1.0, 0.0, 0.0)),
            Some(0.0)
        );
    }

    #[test]
    fn test_index_insert_replaces_bounds() {
        let entity = ids(1)[0];
        let mut index = ListSpatialIndex::new();

        index.insert(entity, Aabb::from_sphere(Vec3::zeros(), 1.0));
        index.insert(entity, Aabb::from_sphere(Vec3::new(3.0, 0.0, 0.0), 1.0));

        assert_eq!(index.len(), 1);
        assert_eq!(index.bounds(entity).map(|b| b.center()), Some(Vec3::new(3.0, 0.0, 0.0)));
        assert!(index.remove(entity));
        assert!(!index.remove(entity));
        assert!(index.is_empty());
    }

    #[test]
    fn test_index_ray_query_is_sorted_and_bounded() {
        let entities = ids(3);
        let mut index = ListSpatialIndex::new();
        index.insert(entities[0], Aabb::from_sphere(Vec3::new(0.0, 0.0, -8.0), 0.5));
        index.insert(entities[1], Aabb::from_sphere(Vec3::new(0.0, 0.0, -3.0), 0.5));
        index.insert(entities[2], Aabb::from_sphere(Vec3::new(4.0, 0.0, -3.0), 0.5));

        let hits = index.query_ray(Vec3::zeros(), Vec3::new(0.0, 0.0, -1.0), 100.0);
        assert_eq!(hits.iter().map(|h| h.0).collect::<Vec<_>>(), vec![entities[1], entities[0]]);

        let near = index.query_ray(Vec3::zeros(), Vec3::new(0.0, 0.0, -1.0), 5.0);
        assert_eq!(near.len(), 1);
    }
}
