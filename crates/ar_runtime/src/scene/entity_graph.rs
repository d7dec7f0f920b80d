//! Entity graph
//!
//! All entities live in one arena owned by the graph. A node's child list
//! holds the only strong references; the parent link is a plain handle
//! resolved by lookup, so the tree can never form a reference cycle.
//!
//! The graph has an implicit root. An entity is *live* while it is reachable
//! from the root; freshly created entities are standalone until added as a
//! child somewhere.
//!
//! World transforms are never stored. They are recomputed from the local
//! transforms on every query, so a mutation anywhere up the chain is
//! reflected immediately.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::assets::AssetLoadState;
use crate::ecs::{
    downcast_box, downcast_mut, downcast_ref, Component, ComponentContext, ComponentKind, TypedComponent,
};
use crate::foundation::collections::{EntityId, SlotMap};
use crate::foundation::math::{Mat4, Point3, Quat, Transform, Vec3};

/// Name and stable id of the implicit root entity
pub const ROOT_NAME: &str = "root";

/// One entity of the graph
pub struct EntityNode {
    stable_id: String,
    parent: Option<EntityId>,
    children: Vec<EntityId>,
    tags: BTreeSet<String>,
    metadata: BTreeMap<String, String>,
    components: BTreeMap<ComponentKind, Box<dyn Component>>,

    /// Display name, not required to be unique
    pub name: String,
    /// Transform relative to the parent
    pub transform: Transform,
    /// Disabled entities (and their subtrees) are skipped by `update`
    pub enabled: bool,
    /// Hidden entities (and their subtrees) are not shown or hit-tested
    pub visible: bool,
    /// Content load state
    pub asset_state: AssetLoadState,
}

impl EntityNode {
    fn new(name: String, stable_id: String) -> Self {
        Self {
            stable_id,
            parent: None,
            children: Vec::new(),
            tags: BTreeSet::new(),
            metadata: BTreeMap::new(),
            components: BTreeMap::new(),
            name,
            transform: Transform::identity(),
            enabled: true,
            visible: true,
            asset_state: AssetLoadState::NotRequested,
        }
    }

    /// Identifier that survives persistence round trips
    pub fn stable_id(&self) -> &str {
        &self.stable_id
    }

    /// Parent handle, `None` for the root and standalone entities
    pub fn parent(&self) -> Option<EntityId> {
        self.parent
    }

    /// Children in insertion order
    pub fn children(&self) -> &[EntityId] {
        &self.children
    }

    /// Tag set
    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    /// Opaque string metadata
    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    /// Kinds of the attached components
    pub fn component_kinds(&self) -> impl Iterator<Item = ComponentKind> + '_ {
        self.components.keys().copied()
    }
}

impl std::fmt::Debug for EntityNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityNode")
            .field("stable_id", &self.stable_id)
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("components", &self.components.keys().collect::<Vec<_>>())
            .field("enabled", &self.enabled)
            .field("visible", &self.visible)
            .finish_non_exhaustive()
    }
}

/// Arena-backed tree of entities
pub struct EntityGraph {
    nodes: SlotMap<EntityId, EntityNode>,
    root: EntityId,
    stable_ids: HashMap<String, EntityId>,
    next_stable_id: u64,
}

impl Default for EntityGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityGraph {
    /// Create a graph holding only the root entity
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(EntityNode::new(ROOT_NAME.to_string(), ROOT_NAME.to_string()));
        let mut stable_ids = HashMap::new();
        stable_ids.insert(ROOT_NAME.to_string(), root);
        Self {
            nodes,
            root,
            stable_ids,
            next_stable_id: 0,
        }
    }

    /// Handle of the implicit root
    pub fn root(&self) -> EntityId {
        self.root
    }

    /// Number of entities including the root and standalone ones
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph holds nothing but the root
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Whether `entity` exists (live or standalone)
    pub fn contains(&self, entity: EntityId) -> bool {
        self.nodes.contains_key(entity)
    }

    /// Look up a node
    pub fn get(&self, entity: EntityId) -> Option<&EntityNode> {
        self.nodes.get(entity)
    }

    /// Look up a node mutably
    pub fn get_mut(&mut self, entity: EntityId) -> Option<&mut EntityNode> {
        self.nodes.get_mut(entity)
    }

    // ---- creation and structure ----

    /// Create a standalone entity
    ///
    /// Generated stable ids skip any id already held, including ids that
    /// came in through restored records.
    pub fn create_entity(&mut self, name: impl Into<String>) -> EntityId {
        let stable_id = loop {
            self.next_stable_id += 1;
            let candidate = format!("entity-{}", self.next_stable_id);
            if !self.stable_ids.contains_key(&candidate) {
                break candidate;
            }
        };
        self.insert_node(name.into(), stable_id)
    }

    /// Create a standalone entity with a caller supplied stable id
    ///
    /// Returns `None` when another entity already holds `stable_id`.
    pub fn create_entity_with_stable_id(
        &mut self,
        name: impl Into<String>,
        stable_id: impl Into<String>,
    ) -> Option<EntityId> {
        let stable_id = stable_id.into();
        if let Some(&holder) = self.stable_ids.get(&stable_id) {
            log::warn!("Stable id '{}' is already held by {:?}", stable_id, holder);
            return None;
        }
        Some(self.insert_node(name.into(), stable_id))
    }

    fn insert_node(&mut self, name: String, stable_id: String) -> EntityId {
        let entity = self.nodes.insert(EntityNode::new(name, stable_id.clone()));
        self.stable_ids.insert(stable_id, entity);
        log::trace!("Created entity {:?}", entity);
        entity
    }

    /// Create an entity directly under `parent`
    pub fn spawn(&mut self, parent: EntityId, name: impl Into<String>) -> Option<EntityId> {
        if !self.contains(parent) {
            return None;
        }
        let entity = self.create_entity(name);
        self.add_child(parent, entity);
        Some(entity)
    }

    /// Attach `child` under `parent`, detaching it from its old parent first
    ///
    /// Re-adding a child to its current parent is a no-op. Adding an entity
    /// below one of its own descendants is rejected. Returns whether `child`
    /// ends up under `parent`.
    pub fn add_child(&mut self, parent: EntityId, child: EntityId) -> bool {
        if !self.contains(parent) || !self.contains(child) || child == self.root {
            return false;
        }
        if parent == child || self.is_ancestor_of(child, parent) {
            log::warn!("Rejected add_child: {:?} is an ancestor of {:?}", child, parent);
            return false;
        }

        let old_parent = self.nodes[child].parent;
        if old_parent == Some(parent) {
            return true;
        }
        if let Some(old_parent) = old_parent {
            if let Some(node) = self.nodes.get_mut(old_parent) {
                node.children.retain(|&c| c != child);
            }
        }

        self.nodes[parent].children.push(child);
        self.nodes[child].parent = Some(parent);
        true
    }

    /// Detach `child` from `parent` without destroying it
    ///
    /// Returns false when `child` was not a child of `parent`.
    pub fn remove_child(&mut self, parent: EntityId, child: EntityId) -> bool {
        match self.nodes.get(child) {
            Some(node) if node.parent == Some(parent) => {}
            _ => return false,
        }
        if let Some(node) = self.nodes.get_mut(parent) {
            node.children.retain(|&c| c != child);
        }
        self.nodes[child].parent = None;
        true
    }

    /// Detach `entity` from whatever parent it has
    pub fn detach(&mut self, entity: EntityId) -> bool {
        match self.parent(entity) {
            Some(parent) => self.remove_child(parent, entity),
            None => false,
        }
    }

    /// Release `entity` and its whole subtree
    ///
    /// Detach hooks of every component fire. Returns the released handles,
    /// children before their parents. The root cannot be destroyed.
    pub fn destroy(&mut self, entity: EntityId) -> Vec<EntityId> {
        if entity == self.root || !self.contains(entity) {
            return Vec::new();
        }
        self.detach(entity);

        let mut released = self.descendants(entity);
        released.reverse();
        released.push(entity);

        for &id in &released {
            if let Some(mut node) = self.nodes.remove(id) {
                self.stable_ids.remove(&node.stable_id);
                for (_, mut component) in std::mem::take(&mut node.components) {
                    component.on_detach(id);
                }
            }
        }
        log::debug!("Destroyed {} entities under {:?}", released.len(), entity);
        released
    }

    /// Parent of `entity`
    pub fn parent(&self, entity: EntityId) -> Option<EntityId> {
        self.nodes.get(entity).and_then(|node| node.parent)
    }

    /// Children of `entity` (empty for unknown handles)
    pub fn children(&self, entity: EntityId) -> &[EntityId] {
        self.nodes.get(entity).map_or(&[][..], |node| node.children.as_slice())
    }

    /// Ancestors of `entity`, nearest first
    pub fn ancestors(&self, entity: EntityId) -> Vec<EntityId> {
        let mut ancestors = Vec::new();
        let mut current = self.parent(entity);
        while let Some(id) = current {
            ancestors.push(id);
            current = self.parent(id);
        }
        ancestors
    }

    /// Every descendant of `entity` in depth-first pre-order
    pub fn descendants(&self, entity: EntityId) -> Vec<EntityId> {
        let mut result = Vec::new();
        let mut stack: Vec<EntityId> = self.children(entity).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            result.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        result
    }

    /// Whether `ancestor` appears on the parent chain of `entity`
    pub fn is_ancestor_of(&self, ancestor: EntityId, entity: EntityId) -> bool {
        let mut current = self.parent(entity);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Whether `entity` is reachable from the root
    pub fn is_live(&self, entity: EntityId) -> bool {
        entity == self.root || (self.contains(entity) && self.is_ancestor_of(self.root, entity))
    }

    /// Depth-first search below `start` for an entity called `name`
    ///
    /// With duplicate names any one of them may be returned.
    pub fn find_child(&self, start: EntityId, name: &str) -> Option<EntityId> {
        self.descendants(start)
            .into_iter()
            .find(|&id| self.nodes.get(id).map_or(false, |node| node.name == name))
    }

    /// Find an entity by name anywhere below the root
    pub fn find_by_name(&self, name: &str) -> Option<EntityId> {
        self.find_child(self.root, name)
    }

    /// Find an entity by its stable id
    pub fn find_by_stable_id(&self, stable_id: &str) -> Option<EntityId> {
        self.stable_ids.get(stable_id).copied()
    }

    // ---- transforms ----

    /// Local transform of `entity`
    pub fn local_transform(&self, entity: EntityId) -> Option<Transform> {
        self.nodes.get(entity).map(|node| node.transform)
    }

    /// Replace the local transform of `entity`
    pub fn set_local_transform(&mut self, entity: EntityId, transform: Transform) -> bool {
        match self.nodes.get_mut(entity) {
            Some(node) => {
                node.transform = transform;
                true
            }
            None => false,
        }
    }

    /// Product of local matrices from the top of the chain down to `entity`
    pub fn world_matrix(&self, entity: EntityId) -> Option<Mat4> {
        let node = self.nodes.get(entity)?;
        let mut matrix = node.transform.to_matrix();
        let mut current = node.parent;
        while let Some(id) = current {
            let ancestor = self.nodes.get(id)?;
            matrix = ancestor.transform.to_matrix() * matrix;
            current = ancestor.parent;
        }
        Some(matrix)
    }

    /// World transform of `entity`, decomposed from [`world_matrix`](Self::world_matrix)
    pub fn world_transform(&self, entity: EntityId) -> Option<Transform> {
        self.world_matrix(entity).map(Transform::from_matrix)
    }

    /// World position of `entity`
    pub fn world_position(&self, entity: EntityId) -> Option<Vec3> {
        self.world_matrix(entity)
            .map(|matrix| matrix.transform_point(&Point3::origin()).coords)
    }

    /// Move `entity` so its world pose becomes `position` / `rotation`
    ///
    /// The local scale is kept.
    pub fn set_world_pose(&mut self, entity: EntityId, position: Vec3, rotation: Quat) -> bool {
        let Some(node) = self.nodes.get(entity) else {
            return false;
        };

        let (local_position, local_rotation) = match node.parent.and_then(|parent| self.world_matrix(parent)) {
            Some(parent_matrix) => {
                let inverse = parent_matrix.try_inverse().unwrap_or_else(Mat4::identity);
                let parent_rotation = Transform::from_matrix(parent_matrix).rotation;
                (
                    inverse.transform_point(&Point3::from(position)).coords,
                    parent_rotation.inverse() * rotation,
                )
            }
            None => (position, rotation),
        };

        let node = &mut self.nodes[entity];
        node.transform.position = local_position;
        node.transform.rotation = local_rotation;
        true
    }

    // ---- flags ----

    /// Enable or disable updates for `entity` and its subtree
    pub fn set_enabled(&mut self, entity: EntityId, enabled: bool) -> bool {
        self.nodes.get_mut(entity).map(|node| node.enabled = enabled).is_some()
    }

    /// Show or hide `entity` and its subtree
    pub fn set_visible(&mut self, entity: EntityId, visible: bool) -> bool {
        self.nodes.get_mut(entity).map(|node| node.visible = visible).is_some()
    }

    /// Whether `entity` and all its ancestors are visible
    pub fn is_visible_in_hierarchy(&self, entity: EntityId) -> bool {
        self.nodes.get(entity).map_or(false, |node| node.visible)
            && self
                .ancestors(entity)
                .iter()
                .all(|&id| self.nodes.get(id).map_or(false, |node| node.visible))
    }

    /// Whether `entity` and all its ancestors are enabled
    pub fn is_enabled_in_hierarchy(&self, entity: EntityId) -> bool {
        self.nodes.get(entity).map_or(false, |node| node.enabled)
            && self
                .ancestors(entity)
                .iter()
                .all(|&id| self.nodes.get(id).map_or(false, |node| node.enabled))
    }

    // ---- tags and metadata ----

    /// Add a tag; returns false when already present or the entity is unknown
    pub fn add_tag(&mut self, entity: EntityId, tag: impl Into<String>) -> bool {
        self.nodes.get_mut(entity).map_or(false, |node| node.tags.insert(tag.into()))
    }

    /// Remove a tag
    pub fn remove_tag(&mut self, entity: EntityId, tag: &str) -> bool {
        self.nodes.get_mut(entity).map_or(false, |node| node.tags.remove(tag))
    }

    /// Whether `entity` carries `tag`
    pub fn has_tag(&self, entity: EntityId, tag: &str) -> bool {
        self.nodes.get(entity).map_or(false, |node| node.tags.contains(tag))
    }

    /// Live entities carrying `tag`, in depth-first order
    pub fn entities_with_tag(&self, tag: &str) -> Vec<EntityId> {
        self.descendants(self.root)
            .into_iter()
            .filter(|&id| self.has_tag(id, tag))
            .collect()
    }

    /// Set a metadata value, returning the previous one
    pub fn set_metadata(
        &mut self,
        entity: EntityId,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Option<String> {
        self.nodes
            .get_mut(entity)
            .and_then(|node| node.metadata.insert(key.into(), value.into()))
    }

    /// Read a metadata value
    pub fn metadata(&self, entity: EntityId, key: &str) -> Option<&str> {
        self.nodes
            .get(entity)
            .and_then(|node| node.metadata.get(key))
            .map(String::as_str)
    }

    /// Remove a metadata value
    pub fn remove_metadata(&mut self, entity: EntityId, key: &str) -> Option<String> {
        self.nodes.get_mut(entity).and_then(|node| node.metadata.remove(key))
    }

    // ---- components ----

    /// Attach a component, replacing any component of the same kind
    ///
    /// A replaced component is detached before the new one is attached.
    pub fn add_component<C: Component>(&mut self, entity: EntityId, component: C) -> bool {
        self.add_boxed_component(entity, Box::new(component))
    }

    /// Attach an already boxed component
    pub fn add_boxed_component(&mut self, entity: EntityId, mut component: Box<dyn Component>) -> bool {
        let Some(node) = self.nodes.get_mut(entity) else {
            log::debug!("Ignoring component for missing entity {:?}", entity);
            return false;
        };
        let kind = component.kind();
        if let Some(mut previous) = node.components.remove(&kind) {
            previous.on_detach(entity);
        }
        component.on_attach(entity);
        node.components.insert(kind, component);
        true
    }

    /// Borrow a component by kind
    pub fn component(&self, entity: EntityId, kind: ComponentKind) -> Option<&dyn Component> {
        self.nodes
            .get(entity)
            .and_then(|node| node.components.get(&kind))
            .map(|component| &**component)
    }

    /// Whether `entity` has a component of `kind`
    pub fn has_component(&self, entity: EntityId, kind: ComponentKind) -> bool {
        self.nodes
            .get(entity)
            .map_or(false, |node| node.components.contains_key(&kind))
    }

    /// Borrow a typed component
    pub fn get_component<T: TypedComponent>(&self, entity: EntityId) -> Option<&T> {
        self.component(entity, T::KIND).and_then(downcast_ref::<T>)
    }

    /// Mutably borrow a typed component
    pub fn get_component_mut<T: TypedComponent>(&mut self, entity: EntityId) -> Option<&mut T> {
        let component = self.nodes.get_mut(entity)?.components.get_mut(&T::KIND)?;
        downcast_mut::<T>(&mut **component)
    }

    /// Detach and return a typed component
    pub fn remove_component<T: TypedComponent>(&mut self, entity: EntityId) -> Option<T> {
        self.remove_component_kind(entity, T::KIND)
            .and_then(downcast_box::<T>)
            .map(|component| *component)
    }

    /// Detach and return the component occupying `kind`
    pub fn remove_component_kind(&mut self, entity: EntityId, kind: ComponentKind) -> Option<Box<dyn Component>> {
        let mut component = self.nodes.get_mut(entity)?.components.remove(&kind)?;
        component.on_detach(entity);
        Some(component)
    }

    /// Live entities with a component of `kind`, in depth-first order
    pub fn entities_with_component(&self, kind: ComponentKind) -> Vec<EntityId> {
        self.descendants(self.root)
            .into_iter()
            .filter(|&id| self.has_component(id, kind))
            .collect()
    }

    // ---- update ----

    /// Run component updates for every live, enabled entity
    ///
    /// Each entity updates its components, then its children in order. A
    /// disabled entity skips its whole subtree.
    pub fn update(&mut self, delta_time: f32) {
        let mut stack = vec![self.root];
        while let Some(entity) = stack.pop() {
            let Some(node) = self.nodes.get_mut(entity) else {
                continue;
            };
            if !node.enabled {
                continue;
            }

            let EntityNode {
                components,
                transform,
                children,
                ..
            } = node;
            for component in components.values_mut() {
                let mut context = ComponentContext {
                    entity,
                    transform: &mut *transform,
                    delta_time,
                };
                component.on_update(&mut context);
            }
            stack.extend(children.iter().rev().copied());
        }
    }
}
