//! Projection of a concrete type's members onto its scope.
//!
//! A concrete type embeds an [`Attributed`] base next to its [`Field`]
//! members and declares itself through [`ReflectedType`]. Populating an
//! instance installs the self-reference entry, then walks the type's
//! registered signatures: table attributes become owned child scopes, field
//! attributes alias the instance's own member cells as external datum
//! storage. From then on generic code reads and writes the object purely
//! through scope and datum operations while the members observe the same
//! memory.
//!
//! [`Field`]: crate::Field

use std::any::Any;

use crate::error::{AttributeError, ScopeError};
use crate::heap::{ScopeHeap, ScopeId};
use crate::registry::TypeRegistry;
use crate::scope::{SELF_KEY, Scope, ScopeNode};
use crate::signature::{Binding, FieldBinder, Signature};
use crate::type_hash::TypeHash;
use crate::value::ValueKind;

/// A concrete type with a registered attribute layout.
///
/// Implementors embed an [`Attributed`] base field named `base`, derive
/// `Clone`, and generate their [`ScopeNode`] impl with
/// [`impl_scope_node!`](crate::impl_scope_node).
pub trait ReflectedType: Any + Sized {
    /// The registered type name; hashing it yields the type's identity.
    const TYPE_NAME: &'static str;

    /// The type's prescribed attribute layout, in declaration order.
    fn signatures() -> Vec<Signature>;

    /// The type's identity hash.
    fn type_hash() -> TypeHash {
        TypeHash::from_name(Self::TYPE_NAME)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct FieldBinding {
    pub(crate) key: String,
    pub(crate) binder: FieldBinder,
}

/// The scope base embedded by every attributed type.
///
/// Distinguishes prescribed attributes (dictated by the type's signature
/// list, installed first and never removed) from auxiliary attributes
/// (appended at runtime). The boundary between them is the signature count
/// plus one for the self-reference entry.
#[derive(Debug, Clone)]
pub struct Attributed {
    scope: Scope,
    type_hash: TypeHash,
    prescribed_len: usize,
    bindings: Vec<FieldBinding>,
}

impl Attributed {
    /// A fresh, unpopulated base for the given type identity.
    pub fn new(type_hash: TypeHash) -> Self {
        Self {
            scope: Scope::new(),
            type_hash,
            prescribed_len: 0,
            bindings: Vec::new(),
        }
    }

    /// A fresh base for a [`ReflectedType`].
    pub fn of<T: ReflectedType>() -> Self {
        Self::new(T::type_hash())
    }

    pub fn type_hash(&self) -> TypeHash {
        self.type_hash
    }

    pub fn as_scope(&self) -> &Scope {
        &self.scope
    }

    pub fn as_scope_mut(&mut self) -> &mut Scope {
        &mut self.scope
    }

    /// True when `key` names any attribute, prescribed or auxiliary.
    pub fn is_attribute(&self, key: &str) -> bool {
        self.scope.find(key).is_some()
    }

    /// True when `key` is the self-reference or named by the type's
    /// signature list.
    pub fn is_prescribed_attribute(&self, key: &str) -> bool {
        self.scope
            .index_of(key)
            .is_some_and(|index| index < self.prescribed_len)
    }

    /// True when `key` names an attribute appended outside the signature
    /// list.
    pub fn is_auxiliary_attribute(&self, key: &str) -> bool {
        self.is_attribute(key) && !self.is_prescribed_attribute(key)
    }

    /// Append a runtime attribute. Prescribed keys are rejected.
    pub fn append_auxiliary_attribute(&mut self, key: &str) -> Result<&mut crate::Datum, AttributeError> {
        if self.is_prescribed_attribute(key) {
            return Err(AttributeError::PrescribedKey {
                key: key.to_string(),
            });
        }
        Ok(self.scope.append(key)?)
    }

    /// Every attribute in insertion order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &crate::Datum)> {
        self.scope.iter()
    }

    /// The prescribed prefix of the insertion order, self-reference included.
    pub fn prescribed_attributes(&self) -> impl Iterator<Item = (&str, &crate::Datum)> {
        self.scope.iter().take(self.prescribed_len)
    }

    /// The auxiliary suffix of the insertion order.
    pub fn auxiliary_attributes(&self) -> impl Iterator<Item = (&str, &crate::Datum)> {
        self.scope.iter().skip(self.prescribed_len)
    }
}

/// Install the self-reference and the type's prescribed attributes into a
/// freshly inserted node.
///
/// The node must be empty: the self-reference entry is always the first entry
/// and the prescribed/auxiliary split relies on prescribed attributes
/// occupying the insertion-order prefix.
pub fn populate(
    heap: &mut ScopeHeap,
    registry: &TypeRegistry,
    id: ScopeId,
) -> Result<(), AttributeError> {
    let type_hash = {
        let node = heap.get(id).ok_or(ScopeError::Stale(id))?;
        let base = node.attributed().ok_or(AttributeError::NotAttributed)?;
        if !node.scope().is_empty() {
            return Err(AttributeError::AlreadyPopulated);
        }
        base.type_hash()
    };
    let signatures = registry.signatures(type_hash)?.to_vec();

    {
        let node = heap.get_mut(id).ok_or(ScopeError::Stale(id))?;
        let own = node.scope().id();
        let datum = node.scope_mut().append(SELF_KEY)?;
        datum.set_type(ValueKind::Pointer)?;
        datum.push_pointer(own)?;
    }

    let mut bindings = Vec::with_capacity(signatures.len());
    for signature in &signatures {
        match signature.binding() {
            Binding::Table => {
                {
                    let node = heap.get_mut(id).ok_or(ScopeError::Stale(id))?;
                    let datum = node.scope_mut().append(signature.name())?;
                    datum.set_type(ValueKind::Table)?;
                    datum.reserve(signature.count())?;
                }
                for _ in 0..signature.count() {
                    heap.append_scope(id, signature.name())?;
                }
            }
            Binding::Field(binder) => {
                let values = {
                    let node = heap.get(id).ok_or(ScopeError::Stale(id))?;
                    binder(node.as_any()).ok_or_else(|| AttributeError::Signature {
                        name: signature.name().to_string(),
                        detail: String::from("binder rejected the instance"),
                    })?
                };
                if values.kind() != signature.kind() {
                    return Err(AttributeError::Signature {
                        name: signature.name().to_string(),
                        detail: format!(
                            "binder exported {}, signature declares {}",
                            values.kind(),
                            signature.kind()
                        ),
                    });
                }
                if values.len() != signature.count() {
                    return Err(AttributeError::Signature {
                        name: signature.name().to_string(),
                        detail: format!(
                            "binder exported {} elements, signature declares {}",
                            values.len(),
                            signature.count()
                        ),
                    });
                }
                let node = heap.get_mut(id).ok_or(ScopeError::Stale(id))?;
                let datum = node.scope_mut().append(signature.name())?;
                datum.set_storage(values)?;
                bindings.push(FieldBinding {
                    key: signature.name().to_string(),
                    binder: *binder,
                });
            }
        }
    }

    let node = heap.get_mut(id).ok_or(ScopeError::Stale(id))?;
    let type_name = node.type_name();
    let base = node.attributed_mut().ok_or(AttributeError::NotAttributed)?;
    base.prescribed_len = signatures.len() + 1;
    base.bindings = bindings;
    log::debug!(
        "populated {type_name} with {} prescribed attributes",
        signatures.len() + 1
    );
    Ok(())
}

/// Insert a node into the heap and populate it from the registry.
/// On failure the node is removed again, leaving the heap unchanged.
pub fn spawn<N: ScopeNode>(
    heap: &mut ScopeHeap,
    registry: &TypeRegistry,
    node: N,
) -> Result<ScopeId, AttributeError> {
    let id = heap.insert(node);
    if let Err(error) = populate(heap, registry, id) {
        let _ = heap.destroy(id);
        return Err(error);
    }
    Ok(id)
}

/// Re-establish a node's identity-dependent entries: point the
/// self-reference at the node's current handle and re-run every cached field
/// binder so external datums alias this instance's cells.
///
/// No-op for nodes without an attributed base. Table attributes need no
/// fix-up; the scope layer keeps their children correct through clone and
/// relocation.
pub fn rebind_in_place<N: ScopeNode>(node: &mut N) -> Result<(), ScopeError> {
    let Some(base) = node.attributed() else {
        return Ok(());
    };
    let bindings = base.bindings.clone();
    let own = node.scope().id();

    let mut resolved = Vec::with_capacity(bindings.len());
    for binding in &bindings {
        let values = (binding.binder)(node.as_any()).ok_or_else(|| ScopeError::Binding {
            key: binding.key.clone(),
        })?;
        resolved.push((binding.key.clone(), values));
    }

    let scope = node.scope_mut();
    if let Some(datum) = scope.find_mut(SELF_KEY) {
        datum.set_pointer(0, own)?;
    }
    for (key, values) in resolved {
        match scope.find_mut(&key) {
            Some(datum) => datum.set_storage(values)?,
            None => return Err(ScopeError::Binding { key }),
        }
    }
    Ok(())
}

/// Generate the [`ScopeNode`] impl for an attributed concrete type.
///
/// The type must embed its [`Attributed`] base in a field named `base`,
/// derive `Clone` (fields deep-copy via [`Field`](crate::Field)), and
/// implement [`ReflectedType`].
#[macro_export]
macro_rules! impl_scope_node {
    ($ty:ty) => {
        impl $crate::ScopeNode for $ty {
            fn scope(&self) -> &$crate::Scope {
                self.base.as_scope()
            }

            fn scope_mut(&mut self) -> &mut $crate::Scope {
                self.base.as_scope_mut()
            }

            fn clone_node(
                &self,
                heap: &mut $crate::ScopeHeap,
            ) -> ::std::result::Result<$crate::ScopeId, $crate::ScopeError> {
                let id = heap.insert(::std::clone::Clone::clone(self));
                $crate::clone_children(heap, $crate::ScopeNode::scope(self), id)?;
                heap.rebind_node(id)?;
                ::std::result::Result::Ok(id)
            }

            fn rebind(&mut self) -> ::std::result::Result<(), $crate::ScopeError> {
                $crate::rebind_in_place(self)
            }

            fn attributed(&self) -> ::std::option::Option<&$crate::Attributed> {
                ::std::option::Option::Some(&self.base)
            }

            fn attributed_mut(&mut self) -> ::std::option::Option<&mut $crate::Attributed> {
                ::std::option::Option::Some(&mut self.base)
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
                self
            }

            fn type_name(&self) -> &'static str {
                <$ty as $crate::ReflectedType>::TYPE_NAME
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Field;

    #[derive(Clone)]
    struct Monster {
        base: Attributed,
        health: Field<i32>,
    }

    impl Monster {
        fn new() -> Self {
            Self {
                base: Attributed::of::<Monster>(),
                health: Field::new(100),
            }
        }
    }

    impl ReflectedType for Monster {
        const TYPE_NAME: &'static str = "Monster";

        fn signatures() -> Vec<Signature> {
            vec![
                Signature::field("health", ValueKind::Integer, 1, |any| {
                    any.downcast_ref::<Monster>().map(|m| m.health.export())
                }),
                Signature::table("actions", 0),
            ]
        }
    }

    impl_scope_node!(Monster);

    fn world() -> (ScopeHeap, TypeRegistry) {
        let mut registry = TypeRegistry::new();
        registry.register_type::<Monster>().unwrap();
        (ScopeHeap::new(), registry)
    }

    #[test]
    fn populate_installs_self_reference_first() {
        let (mut heap, registry) = world();
        let id = spawn(&mut heap, &registry, Monster::new()).unwrap();
        let node = heap.get(id).unwrap();
        let (key, datum) = node.scope().datum_at(0).unwrap();
        assert_eq!(key, SELF_KEY);
        assert_eq!(datum.kind(), ValueKind::Pointer);
        assert_eq!(datum.get_pointer(0), Ok(id));
    }

    #[test]
    fn fields_and_datums_share_memory() {
        let (mut heap, registry) = world();
        let id = spawn(&mut heap, &registry, Monster::new()).unwrap();

        heap.node::<Monster>(id).unwrap().health.set(7);
        let datum = heap.get(id).unwrap().scope().find("health").unwrap();
        assert!(datum.is_external());
        assert_eq!(datum.get_int(0), Ok(7));

        heap.get_mut(id)
            .unwrap()
            .scope_mut()
            .find_mut("health")
            .unwrap()
            .set_int(0, 55)
            .unwrap();
        assert_eq!(heap.node::<Monster>(id).unwrap().health.get(), 55);
    }

    #[test]
    fn table_signature_with_zero_count_starts_empty() {
        let (mut heap, registry) = world();
        let id = spawn(&mut heap, &registry, Monster::new()).unwrap();
        let datum = heap.get(id).unwrap().scope().find("actions").unwrap();
        assert_eq!(datum.kind(), ValueKind::Table);
        assert!(datum.is_empty());

        let action = heap.append_scope(id, "actions").unwrap();
        assert_eq!(heap.get(action).unwrap().scope().parent(), Some(id));
    }

    #[test]
    fn prescribed_and_auxiliary_partition() {
        let (mut heap, registry) = world();
        let id = spawn(&mut heap, &registry, Monster::new()).unwrap();

        let monster = heap.node_mut::<Monster>(id).unwrap();
        assert_eq!(monster.base.prescribed_attributes().count(), 3);
        assert_eq!(monster.base.auxiliary_attributes().count(), 0);
        assert!(monster.base.is_prescribed_attribute(SELF_KEY));
        assert!(monster.base.is_prescribed_attribute("health"));
        assert!(!monster.base.is_prescribed_attribute("extra"));

        monster
            .base
            .append_auxiliary_attribute("extra")
            .unwrap()
            .push_int(1)
            .unwrap();
        assert_eq!(monster.base.auxiliary_attributes().count(), 1);
        assert!(monster.base.is_auxiliary_attribute("extra"));

        assert_eq!(
            monster.base.append_auxiliary_attribute("health").unwrap_err(),
            AttributeError::PrescribedKey {
                key: String::from("health")
            }
        );
    }

    #[test]
    fn clone_rebinds_to_the_copy() {
        let (mut heap, registry) = world();
        let id = spawn(&mut heap, &registry, Monster::new()).unwrap();
        heap.node::<Monster>(id).unwrap().health.set(42);

        let copy = heap.clone_scope(id).unwrap();
        assert!(heap.scopes_equal(id, copy));

        // The copy's self entry names the copy, not the source.
        let datum = heap.get(copy).unwrap().scope().find(SELF_KEY).unwrap();
        assert_eq!(datum.get_pointer(0), Ok(copy));

        // The copy's field is independent of the source's.
        heap.node::<Monster>(copy).unwrap().health.set(1);
        assert_eq!(heap.node::<Monster>(id).unwrap().health.get(), 42);
        let copy_datum = heap.get(copy).unwrap().scope().find("health").unwrap();
        assert_eq!(copy_datum.get_int(0), Ok(1));
    }

    #[test]
    fn relocate_updates_the_self_reference() {
        let (mut heap, registry) = world();
        let id = spawn(&mut heap, &registry, Monster::new()).unwrap();
        heap.node::<Monster>(id).unwrap().health.set(9);

        let moved = heap.relocate(id).unwrap();
        let datum = heap.get(moved).unwrap().scope().find(SELF_KEY).unwrap();
        assert_eq!(datum.get_pointer(0), Ok(moved));

        // Field aliasing survives the move.
        assert_eq!(heap.node::<Monster>(moved).unwrap().health.get(), 9);
        heap.node::<Monster>(moved).unwrap().health.set(10);
        let datum = heap.get(moved).unwrap().scope().find("health").unwrap();
        assert_eq!(datum.get_int(0), Ok(10));
    }

    #[test]
    fn spawn_of_unregistered_type_rolls_back() {
        let mut heap = ScopeHeap::new();
        let registry = TypeRegistry::new();
        let error = spawn(&mut heap, &registry, Monster::new()).unwrap_err();
        assert!(matches!(error, AttributeError::Registry(_)));
        assert!(heap.is_empty());
    }

    #[test]
    fn populate_requires_an_attributed_node() {
        let mut heap = ScopeHeap::new();
        let registry = TypeRegistry::new();
        let error = spawn(&mut heap, &registry, Scope::new()).unwrap_err();
        assert_eq!(error, AttributeError::NotAttributed);
        assert!(heap.is_empty());
    }

    #[test]
    fn populate_rejects_non_empty_scopes() {
        let (mut heap, registry) = world();
        let mut monster = Monster::new();
        monster.base.as_scope_mut().append("junk").unwrap();
        let id = heap.insert(monster);
        assert_eq!(
            populate(&mut heap, &registry, id).unwrap_err(),
            AttributeError::AlreadyPopulated
        );
    }
}
