//! Ordered, nested attribute containers forming a single-parent ownership
//! tree.
//!
//! A [`Scope`] maps string keys to [`Datum`]s in insertion order and knows its
//! parent. Nodes live in a [`ScopeHeap`]; everything that touches more than
//! one node - adoption, orphaning, upward search, cloning, relocation - is an
//! operation on the heap, keyed by [`ScopeId`] handles. A child is owned by
//! exactly one table slot of exactly one parent at a time; orphan-before-adopt
//! keeps that invariant, and an ancestor-chain walk keeps the tree acyclic.

use std::any::Any;
use std::fmt;

use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;

use crate::attributed::Attributed;
use crate::datum::Datum;
use crate::error::ScopeError;
use crate::heap::{ScopeHeap, ScopeId};
use crate::value::ValueKind;

/// Key of the self-reference entry installed first into every attributed
/// scope: a pointer datum holding the node's own handle.
pub const SELF_KEY: &str = "self";

/// An ordered map of named datums with a parent link.
pub struct Scope {
    entries: IndexMap<String, Datum, FxBuildHasher>,
    parent: Option<ScopeId>,
    id: ScopeId,
}

impl Scope {
    /// Create an empty, unparented scope.
    pub fn new() -> Self {
        Self {
            entries: IndexMap::default(),
            parent: None,
            id: ScopeId::NULL,
        }
    }

    /// Create an empty scope with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: IndexMap::with_capacity_and_hasher(capacity, FxBuildHasher),
            parent: None,
            id: ScopeId::NULL,
        }
    }

    /// The datum at `key`, inserting a fresh unset datum when absent.
    /// Insertion order is preserved; re-appending an existing key returns the
    /// original datum.
    pub fn append(&mut self, key: &str) -> Result<&mut Datum, ScopeError> {
        if key.is_empty() {
            return Err(ScopeError::EmptyKey);
        }
        Ok(self.entries.entry(key.to_string()).or_default())
    }

    /// Look up a datum by key. Never consults ancestors; see
    /// [`ScopeHeap::search`] for upward resolution.
    pub fn find(&self, key: &str) -> Option<&Datum> {
        self.entries.get(key)
    }

    pub fn find_mut(&mut self, key: &str) -> Option<&mut Datum> {
        self.entries.get_mut(key)
    }

    /// Position of `key` in insertion order.
    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.entries.get_index_of(key)
    }

    /// Entry at `index` in insertion order.
    pub fn datum_at(&self, index: usize) -> Option<(&str, &Datum)> {
        self.entries.get_index(index).map(|(k, d)| (k.as_str(), d))
    }

    pub fn datum_at_mut(&mut self, index: usize) -> Option<(&str, &mut Datum)> {
        self.entries
            .get_index_mut(index)
            .map(|(k, d)| (k.as_str(), d))
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Datum)> {
        self.entries.iter().map(|(k, d)| (k.as_str(), d))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The owning parent, if any.
    pub fn parent(&self) -> Option<ScopeId> {
        self.parent
    }

    /// This node's own handle. Null until the scope is inserted into a heap.
    pub fn id(&self) -> ScopeId {
        self.id
    }

    pub(crate) fn set_parent(&mut self, parent: Option<ScopeId>) {
        self.parent = parent;
    }

    pub(crate) fn stamp(&mut self, id: ScopeId) {
        self.id = id;
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloning a scope produces an unparented, unstamped shell: owned datums
/// deep-copy, external datums stay aliased, table datums keep their kind but
/// no children. [`ScopeHeap::clone_scope`] completes the picture by cloning
/// children with their dynamic types intact.
impl Clone for Scope {
    fn clone(&self) -> Self {
        let mut entries: IndexMap<String, Datum, FxBuildHasher> =
            IndexMap::with_capacity_and_hasher(self.entries.len(), FxBuildHasher);
        for (key, datum) in &self.entries {
            entries.insert(key.clone(), datum.clone());
        }
        Self {
            entries,
            parent: None,
            id: ScopeId::NULL,
        }
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.id)
            .field("parent", &self.parent)
            .field("len", &self.entries.len())
            .finish()
    }
}

/// A heap-resident scope node of any concrete type.
///
/// Implemented by [`Scope`] itself and by every type embedding an
/// [`Attributed`] base (see [`impl_scope_node!`](crate::impl_scope_node)).
pub trait ScopeNode: Any {
    /// The scope data of this node.
    fn scope(&self) -> &Scope;

    fn scope_mut(&mut self) -> &mut Scope;

    /// Allocate a copy of this node in `heap` with the correct dynamic type,
    /// children deep-cloned and reparented. The copy starts unparented.
    fn clone_node(&self, heap: &mut ScopeHeap) -> Result<ScopeId, ScopeError>;

    /// Re-establish identity-dependent state (self-reference, external
    /// aliases) after the node's handle or concrete instance changed.
    fn rebind(&mut self) -> Result<(), ScopeError> {
        Ok(())
    }

    /// The attributed base, for nodes that have one.
    fn attributed(&self) -> Option<&Attributed> {
        None
    }

    fn attributed_mut(&mut self) -> Option<&mut Attributed> {
        None
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Human-readable name of the node's concrete type.
    fn type_name(&self) -> &'static str {
        "scope"
    }
}

impl ScopeNode for Scope {
    fn scope(&self) -> &Scope {
        self
    }

    fn scope_mut(&mut self) -> &mut Scope {
        self
    }

    fn clone_node(&self, heap: &mut ScopeHeap) -> Result<ScopeId, ScopeError> {
        let id = heap.insert(self.clone());
        clone_children(heap, self, id)?;
        Ok(id)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Deep-clone `source`'s table children into the already-inserted node
/// `target`, preserving each child's dynamic type and parenting the clones.
///
/// Building block for [`ScopeNode::clone_node`] implementations; `source`
/// must be a node held outside the heap (see [`ScopeHeap::clone_scope`]).
pub fn clone_children(
    heap: &mut ScopeHeap,
    source: &Scope,
    target: ScopeId,
) -> Result<(), ScopeError> {
    for (key, datum) in source.iter() {
        if datum.kind() != ValueKind::Table {
            continue;
        }
        for &child in datum.scopes() {
            let new_child = heap.clone_scope(child)?;
            if let Some(node) = heap.get_mut(new_child) {
                node.scope_mut().set_parent(Some(target));
            }
            let parent_node = heap.get_mut(target).ok_or(ScopeError::Stale(target))?;
            let slot = parent_node.scope_mut().append(key)?;
            slot.set_type(ValueKind::Table)?;
            slot.push_scope(new_child)?;
        }
    }
    Ok(())
}

/// Tree operations over heap-resident scopes.
impl ScopeHeap {
    /// Allocate an empty base scope.
    pub fn new_scope(&mut self) -> ScopeId {
        self.insert(Scope::new())
    }

    /// Allocate an empty base scope as a child of `parent` under `key`.
    ///
    /// The datum at `key` must be table-kind or unset.
    pub fn append_scope(&mut self, parent: ScopeId, key: &str) -> Result<ScopeId, ScopeError> {
        if key.is_empty() {
            return Err(ScopeError::EmptyKey);
        }
        {
            let node = self.get(parent).ok_or(ScopeError::Stale(parent))?;
            if let Some(datum) = node.scope().find(key) {
                let kind = datum.kind();
                if kind != ValueKind::Table && kind != ValueKind::Unset {
                    return Err(ScopeError::NotATable {
                        key: key.to_string(),
                        found: kind,
                    });
                }
            }
        }
        let child = self.insert(Scope::new());
        if let Some(node) = self.get_mut(child) {
            node.scope_mut().set_parent(Some(parent));
        }
        let parent_node = self.get_mut(parent).ok_or(ScopeError::Stale(parent))?;
        let datum = parent_node.scope_mut().append(key)?;
        datum.set_type(ValueKind::Table)?;
        datum.push_scope(child)?;
        Ok(child)
    }

    /// Reparent `child` into `parent`'s table datum at `key`.
    ///
    /// Fails without mutating anything when the key is empty, the child is the
    /// parent itself or one of its ancestors, or the datum at `key` exists
    /// with a non-table kind. A child with a previous parent is orphaned
    /// first.
    pub fn adopt(&mut self, parent: ScopeId, child: ScopeId, key: &str) -> Result<(), ScopeError> {
        if key.is_empty() {
            return Err(ScopeError::EmptyKey);
        }
        if parent == child {
            return Err(ScopeError::AdoptSelf);
        }
        if !self.contains(child) {
            return Err(ScopeError::Stale(child));
        }
        {
            let node = self.get(parent).ok_or(ScopeError::Stale(parent))?;
            if let Some(datum) = node.scope().find(key) {
                let kind = datum.kind();
                if kind != ValueKind::Table && kind != ValueKind::Unset {
                    return Err(ScopeError::NotATable {
                        key: key.to_string(),
                        found: kind,
                    });
                }
            }
        }
        if self.is_descendant_of(parent, child) {
            return Err(ScopeError::AdoptAncestor);
        }

        self.orphan(child)?;
        if let Some(node) = self.get_mut(child) {
            node.scope_mut().set_parent(Some(parent));
        }
        let parent_node = self.get_mut(parent).ok_or(ScopeError::Stale(parent))?;
        let datum = parent_node.scope_mut().append(key)?;
        datum.set_type(ValueKind::Table)?;
        datum.push_scope(child)?;
        log::trace!("adopted {child} into {parent} at {key:?}");
        Ok(())
    }

    /// Detach a node from its parent. A no-op when already unparented.
    pub fn orphan(&mut self, id: ScopeId) -> Result<(), ScopeError> {
        let parent = {
            let node = self.get(id).ok_or(ScopeError::Stale(id))?;
            node.scope().parent()
        };
        let Some(parent) = parent else {
            return Ok(());
        };
        if let Some((entry, slot)) = self.find_contained(parent, id)
            && let Some(parent_node) = self.get_mut(parent)
            && let Some((_, datum)) = parent_node.scope_mut().datum_at_mut(entry)
        {
            datum.remove_at(slot)?;
        }
        if let Some(node) = self.get_mut(id) {
            node.scope_mut().set_parent(None);
        }
        log::trace!("orphaned {id} from {parent}");
        Ok(())
    }

    /// Scan `parent`'s own table datums (one level) for `target`.
    /// Returns the entry index and the slot index within that datum.
    pub fn find_contained(&self, parent: ScopeId, target: ScopeId) -> Option<(usize, usize)> {
        let node = self.get(parent)?;
        for (entry, (_, datum)) in node.scope().iter().enumerate() {
            if let Some(slot) = datum.scopes().iter().position(|&c| c == target) {
                return Some((entry, slot));
            }
        }
        None
    }

    /// Resolve `key` here or in the nearest ancestor that has it.
    /// Returns the owning scope's handle together with the datum.
    pub fn search(&self, from: ScopeId, key: &str) -> Option<(ScopeId, &Datum)> {
        let mut current = Some(from);
        while let Some(id) = current {
            let node = self.get(id)?;
            if node.scope().find(key).is_some() {
                return node.scope().find(key).map(|datum| (id, datum));
            }
            current = node.scope().parent();
        }
        None
    }

    /// True when `ancestor` appears on `node`'s parent chain.
    pub fn is_descendant_of(&self, node: ScopeId, ancestor: ScopeId) -> bool {
        let mut current = self.get(node).and_then(|n| n.scope().parent());
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.get(id).and_then(|n| n.scope().parent());
        }
        false
    }

    /// Deep equality of two trees, ignoring the self-reference entry.
    /// Stale handles compare by identity.
    pub fn scopes_equal(&self, a: ScopeId, b: ScopeId) -> bool {
        let (Some(node_a), Some(node_b)) = (self.get(a), self.get(b)) else {
            return a == b;
        };
        let (scope_a, scope_b) = (node_a.scope(), node_b.scope());
        if scope_a.len() != scope_b.len() {
            return false;
        }
        for (key, datum) in scope_a.iter() {
            if key == SELF_KEY {
                continue;
            }
            let Some(other) = scope_b.find(key) else {
                return false;
            };
            if !datum.equals_in(other, self) {
                return false;
            }
        }
        true
    }

    /// Clone the tree rooted at `id`, preserving the dynamic type of every
    /// node. The clone starts unparented.
    pub fn clone_scope(&mut self, id: ScopeId) -> Result<ScopeId, ScopeError> {
        let node = self.take(id).ok_or(ScopeError::Stale(id))?;
        let result = node.clone_node(self);
        self.restore(id, node);
        result
    }

    /// Move a node to a fresh handle, fixing up every reference to the old
    /// identity: children's parent links, the old parent's table slot, and
    /// the node's own identity-dependent state. The old handle goes stale.
    pub fn relocate(&mut self, id: ScopeId) -> Result<ScopeId, ScopeError> {
        let node = self.take(id).ok_or(ScopeError::Stale(id))?;
        let parent = node.scope().parent();
        self.release(id);
        let new_id = self.alloc(node);

        let children: Vec<ScopeId> = self
            .get(new_id)
            .map(|n| {
                n.scope()
                    .iter()
                    .flat_map(|(_, d)| d.scopes().iter().copied())
                    .collect()
            })
            .unwrap_or_default();
        for child in children {
            if let Some(node) = self.get_mut(child) {
                node.scope_mut().set_parent(Some(new_id));
            }
        }

        if let Some(parent) = parent
            && let Some((entry, slot)) = self.find_contained(parent, id)
            && let Some(parent_node) = self.get_mut(parent)
            && let Some((_, datum)) = parent_node.scope_mut().datum_at_mut(entry)
        {
            datum.set_scope(slot, new_id)?;
        }

        self.rebind_node(new_id)?;
        log::trace!("relocated {id} to {new_id}");
        Ok(new_id)
    }

    /// Run a node's [`ScopeNode::rebind`] hook in place.
    pub fn rebind_node(&mut self, id: ScopeId) -> Result<(), ScopeError> {
        match self.get_mut(id) {
            Some(node) => node.rebind(),
            None => Err(ScopeError::Stale(id)),
        }
    }

    /// Orphan a node and free its whole owned subtree. Handles into the
    /// subtree go stale.
    pub fn destroy(&mut self, id: ScopeId) -> Result<(), ScopeError> {
        if !self.contains(id) {
            return Err(ScopeError::Stale(id));
        }
        self.orphan(id)?;
        self.free_subtree(id);
        Ok(())
    }

    fn free_subtree(&mut self, id: ScopeId) {
        let Some(node) = self.take(id) else {
            return;
        };
        for (_, datum) in node.scope().iter() {
            for &child in datum.scopes() {
                self.free_subtree(child);
            }
        }
        self.release(id);
    }
}
