//! Lock-guarded entity graph handle
//!
//! Every read and write goes through one exclusive lock so concurrent
//! callers never observe a half-relinked subtree. A panic while the lock
//! is held poisons it; the graph's own operations keep it structurally
//! valid, so the poison is cleared and the graph used as is.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::entity_graph::EntityGraph;
use crate::ecs::Component;
use crate::foundation::collections::EntityId;
use crate::foundation::math::Transform;

/// Cloneable handle to an entity graph shared between threads
#[derive(Clone, Default)]
pub struct SharedEntityGraph {
    inner: Arc<Mutex<EntityGraph>>,
}

impl SharedEntityGraph {
    /// Create a handle around a fresh graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing graph
    pub fn from_graph(graph: EntityGraph) -> Self {
        Self {
            inner: Arc::new(Mutex::new(graph)),
        }
    }

    /// Take the lock for a sequence of operations
    pub fn lock(&self) -> MutexGuard<'_, EntityGraph> {
        self.inner.lock().unwrap_or_else(|poisoned: PoisonError<_>| {
            log::warn!("Entity graph lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Run `f` with the lock held
    pub fn with<R>(&self, f: impl FnOnce(&mut EntityGraph) -> R) -> R {
        f(&mut self.lock())
    }

    /// Handle of the root entity
    pub fn root(&self) -> EntityId {
        self.lock().root()
    }

    /// Create an entity under `parent`
    pub fn spawn(&self, parent: EntityId, name: impl Into<String>) -> Option<EntityId> {
        self.lock().spawn(parent, name)
    }

    /// See [`EntityGraph::add_child`]
    pub fn add_child(&self, parent: EntityId, child: EntityId) -> bool {
        self.lock().add_child(parent, child)
    }

    /// See [`EntityGraph::remove_child`]
    pub fn remove_child(&self, parent: EntityId, child: EntityId) -> bool {
        self.lock().remove_child(parent, child)
    }

    /// See [`EntityGraph::destroy`]
    pub fn destroy(&self, entity: EntityId) -> Vec<EntityId> {
        self.lock().destroy(entity)
    }

    /// See [`EntityGraph::find_child`]
    pub fn find_child(&self, start: EntityId, name: &str) -> Option<EntityId> {
        self.lock().find_child(start, name)
    }

    /// See [`EntityGraph::world_transform`]
    pub fn world_transform(&self, entity: EntityId) -> Option<Transform> {
        self.lock().world_transform(entity)
    }

    /// See [`EntityGraph::add_component`]
    pub fn add_component<C: Component>(&self, entity: EntityId, component: C) -> bool {
        self.lock().add_component(entity, component)
    }

    /// Number of handles sharing this graph
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl std::fmt::Debug for SharedEntityGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedEntityGraph")
            .field("handles", &self.handle_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use std::thread;

    #[test]
    fn test_concurrent_reparenting_keeps_tree_consistent() {
        let shared = SharedEntityGraph::new();
        let root = shared.root();
        let left = shared.spawn(root, "left").expect("left");
        let right = shared.spawn(root, "right").expect("right");
        let children: Vec<EntityId> = (0..16)
            .map(|i| shared.spawn(left, format!("child-{}", i)).expect("child"))
            .collect();

        let workers: Vec<_> = (0..4)
            .map(|worker| {
                let shared = shared.clone();
                let children = children.clone();
                thread::spawn(move || {
                    for round in 0..50 {
                        let child = children[(worker + round) % children.len()];
                        let target = if (worker + round) % 2 == 0 { left } else { right };
                        shared.add_child(target, child);
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().expect("worker");
        }

        let graph = shared.lock();
        for &child in &children {
            let parent = graph.parent(child).expect("parent");
            let listed = [left, right]
                .iter()
                .filter(|&&p| graph.children(p).contains(&child))
                .count();
            assert_eq!(listed, 1);
            assert!(graph.children(parent).contains(&child));
        }
    }

    #[test]
    fn test_poisoned_lock_is_recovered() {
        let shared = SharedEntityGraph::new();
        let root = shared.root();
        let entity = shared.spawn(root, "survivor").expect("entity");

        let poisoner = shared.clone();
        let _ = thread::spawn(move || {
            let _guard = poisoner.lock();
            panic!("poison the graph lock");
        })
        .join();

        shared.with(|graph| {
            graph.set_local_transform(entity, Transform::from_position(Vec3::new(1.0, 0.0, 0.0)));
        });
        let world = shared.world_transform(entity).expect("world");
        assert_eq!(world.position.x, 1.0);
    }
}
