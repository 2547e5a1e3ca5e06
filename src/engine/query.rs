//! Incrementally maintained component-intersection queries.
//!
//! This module provides the query engine: a cache of [`QueryNode`]s, each
//! holding the exact set of entities that carry every component kind along
//! its path. The root node for a kind mirrors that buffer's assigned
//! entities; a child node's set is the intersection of its parent's set with
//! its own buffer's assignments.
//!
//! ## Incremental maintenance
//!
//! Nodes are never rescanned between ticks. Instead, the world forwards
//! every structural assignment and removal to the cache:
//!
//! - On an **add** for kind `X`, the cache walks its nodes; a node whose
//!   kind path contains `X` inserts the entity only if every buffer on its
//!   path now contains it (checked by direct membership probes). The walk
//!   prunes a subtree as soon as one buffer on the path is missing the
//!   entity — no descendant intersection can contain it either.
//! - On a **remove** for kind `X`, every node whose path contains `X` drops
//!   the entity unconditionally: once any kind on the path is gone, no
//!   intersection below it can keep the entity.
//!
//! ## Determinism
//!
//! Result sets are ordered ([`BTreeSet`]), so iterating a query yields
//! entities in a canonical order that does not depend on insertion history.
//! A world restored from a snapshot therefore iterates its (lazily rebuilt)
//! queries in exactly the same order as the original run.
//!
//! ## Cache lifetime
//!
//! Nodes are created lazily by [`World::query`](crate::engine::world::World::query)
//! and [`Query::and`], memoized per world, and cleared wholesale whenever a
//! snapshot restore rewrites buffer state underneath them.

use std::collections::{BTreeSet, HashMap};

use crate::engine::error::SimResult;
use crate::engine::store::{Component, TypeErasedStore};
use crate::engine::types::{Entity, KindId};
use crate::engine::world::World;


/// One cached intersection node.
pub(crate) struct QueryNode {
    kind: KindId,
    entities: BTreeSet<Entity>,
    children: HashMap<KindId, QueryNode>,
}

/// The per-world cache of query nodes, keyed by root kind.
pub(crate) struct QueryCache {
    roots: HashMap<KindId, QueryNode>,
}

impl QueryCache {
    /// Creates an empty cache.
    pub(crate) fn new() -> Self {
        Self { roots: HashMap::new() }
    }

    /// Drops every cached node. Called on snapshot restore, after which
    /// queries are lazily recreated against the restored buffers.
    pub(crate) fn clear(&mut self) {
        self.roots.clear();
    }

    /// Ensures a root node for `kind` exists, seeding it from the buffer's
    /// currently assigned entities.
    pub(crate) fn ensure_root(&mut self, kind: KindId, stores: &[Box<dyn TypeErasedStore>]) {
        self.roots.entry(kind).or_insert_with(|| QueryNode {
            kind,
            entities: stores[kind as usize].assigned_entities().into_iter().collect(),
            children: HashMap::new(),
        });
    }

    /// Ensures the child of the node at `path` for `kind` exists, seeding it
    /// by intersecting the parent's set with the kind's buffer.
    pub(crate) fn ensure_child(
        &mut self,
        path: &[KindId],
        kind: KindId,
        stores: &[Box<dyn TypeErasedStore>],
    ) {
        let parent = self.node_mut(path).expect("parent query node exists");
        if parent.children.contains_key(&kind) {
            return;
        }

        let store = &stores[kind as usize];
        let entities = parent
            .entities
            .iter()
            .copied()
            .filter(|&entity| store.contains_entity(entity))
            .collect();

        parent.children.insert(kind, QueryNode { kind, entities, children: HashMap::new() });
    }

    /// Returns the entity set cached for the node at `path`, if present.
    pub(crate) fn entity_set(&self, path: &[KindId]) -> Option<&BTreeSet<Entity>> {
        self.node(path).map(|node| &node.entities)
    }

    fn node(&self, path: &[KindId]) -> Option<&QueryNode> {
        let (first, rest) = path.split_first()?;
        let mut node = self.roots.get(first)?;
        for kind in rest {
            node = node.children.get(kind)?;
        }
        Some(node)
    }

    fn node_mut(&mut self, path: &[KindId]) -> Option<&mut QueryNode> {
        let (first, rest) = path.split_first()?;
        let mut node = self.roots.get_mut(first)?;
        for kind in rest {
            node = node.children.get_mut(kind)?;
        }
        Some(node)
    }

    /// Applies an "assigned" notification for `kind`.
    ///
    /// The entity is already present in the buffer when this runs, so every
    /// path kind can be checked by a uniform membership probe.
    pub(crate) fn on_added(
        &mut self,
        kind: KindId,
        entity: Entity,
        stores: &[Box<dyn TypeErasedStore>],
    ) {
        for root in self.roots.values_mut() {
            add_walk(root, kind, entity, stores, false);
        }
    }

    /// Applies a "removed" notification for `kind`: the entity leaves every
    /// node whose path contains the kind.
    pub(crate) fn on_removed(&mut self, kind: KindId, entity: Entity) {
        for root in self.roots.values_mut() {
            remove_walk(root, kind, entity, false);
        }
    }
}

fn add_walk(
    node: &mut QueryNode,
    changed: KindId,
    entity: Entity,
    stores: &[Box<dyn TypeErasedStore>],
    seen_on_path: bool,
) {
    if !stores[node.kind as usize].contains_entity(entity) {
        // This kind is missing, so no intersection at or below here gains
        // the entity.
        return;
    }

    let seen_on_path = seen_on_path || node.kind == changed;
    if seen_on_path {
        node.entities.insert(entity);
    }
    for child in node.children.values_mut() {
        add_walk(child, changed, entity, stores, seen_on_path);
    }
}

fn remove_walk(node: &mut QueryNode, changed: KindId, entity: Entity, seen_on_path: bool) {
    let seen_on_path = seen_on_path || node.kind == changed;
    if seen_on_path {
        node.entities.remove(&entity);
    }
    for child in node.children.values_mut() {
        remove_walk(child, changed, entity, seen_on_path);
    }
}

/// A handle to a cached query node, created by
/// [`World::query`](crate::engine::world::World::query) and extended with
/// [`Query::and`].
///
/// The handle borrows the world mutably for its whole lifetime, so buffer
/// state cannot change underneath a live result set. To mutate components
/// while walking a result, collect the entities first:
///
/// ```ignore
/// let targets = world.query::<Position>()?.and::<Velocity>()?.collect_entities();
/// for entity in targets {
///     world.get_mut::<Position>(entity)?.x += 1;
/// }
/// ```
pub struct Query<'w> {
    world: &'w mut World,
    path: Vec<KindId>,
}

impl<'w> Query<'w> {
    pub(crate) fn new(world: &'w mut World, path: Vec<KindId>) -> Self {
        Self { world, path }
    }

    /// Narrows the query to entities that also hold component `B`.
    ///
    /// The child node is created (and cached) on first use by intersecting
    /// this node's set with `B`'s buffer; afterwards it is maintained
    /// incrementally like every other node.
    pub fn and<B: Component>(self) -> SimResult<Query<'w>> {
        let kind = self.world.kind_of::<B>()?;
        {
            let (cache, stores) = self.world.query_parts();
            cache.ensure_child(&self.path, kind, stores);
        }
        let mut path = self.path;
        path.push(kind);
        Ok(Query { world: self.world, path })
    }

    /// Returns the read-only set of entities currently satisfying the query.
    pub fn entity_set(&self) -> &BTreeSet<Entity> {
        self.world
            .query_cache()
            .entity_set(&self.path)
            .expect("cached query node outlives its handle")
    }

    /// Returns `true` if the entity currently satisfies the query.
    pub fn contains(&self, entity: Entity) -> bool {
        self.entity_set().contains(&entity)
    }

    /// Returns the number of entities currently satisfying the query.
    pub fn count(&self) -> usize {
        self.entity_set().len()
    }

    /// Copies the current result set into a vector, releasing the borrow on
    /// the world so the caller can mutate components while iterating.
    pub fn collect_entities(&self) -> Vec<Entity> {
        self.entity_set().iter().copied().collect()
    }
}
