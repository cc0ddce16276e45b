//! Runtime reflection and dynamic attributes for hierarchical objects.
//!
//! scopekit lets statically-typed objects be addressed, enumerated, and
//! mutated through string keys at runtime, and lets such objects form
//! ownership trees that can be built, cloned, and searched generically -
//! independent of their concrete type.
//!
//! # Building blocks
//!
//! - [`Datum`] - a type-erased, kind-tagged value array with owned or
//!   externally-aliased storage.
//! - [`Scope`] - an ordered map of named datums; nodes nest into a
//!   single-parent ownership tree inside a [`ScopeHeap`], addressed by
//!   generational [`ScopeId`] handles.
//! - [`Attributed`] + [`Signature`] + [`TypeRegistry`] - project a concrete
//!   type's members onto its scope: field attributes alias the instance's
//!   [`Field`] cells, table attributes become owned child scopes.
//! - [`ScopeFactory`] - construct registered types by name.
//!
//! # Example
//!
//! ```
//! use scopekit::{
//!     Attributed, Field, ReflectedType, ScopeHeap, Signature, TypeRegistry, ValueKind,
//!     attributed::spawn, impl_scope_node,
//! };
//!
//! #[derive(Clone)]
//! struct Monster {
//!     base: Attributed,
//!     health: Field<i32>,
//! }
//!
//! impl ReflectedType for Monster {
//!     const TYPE_NAME: &'static str = "Monster";
//!
//!     fn signatures() -> Vec<Signature> {
//!         vec![
//!             Signature::field("health", ValueKind::Integer, 1, |any| {
//!                 any.downcast_ref::<Monster>().map(|m| m.health.export())
//!             }),
//!             Signature::table("actions", 0),
//!         ]
//!     }
//! }
//!
//! impl_scope_node!(Monster);
//!
//! let mut registry = TypeRegistry::new();
//! registry.register_type::<Monster>()?;
//!
//! let mut heap = ScopeHeap::new();
//! let monster = Monster { base: Attributed::of::<Monster>(), health: Field::new(100) };
//! let id = spawn(&mut heap, &registry, monster)?;
//!
//! // The compiled member and the reflective view share storage.
//! heap.node::<Monster>(id).unwrap().health.set(75);
//! let datum = heap.get(id).unwrap().scope().find("health").unwrap();
//! assert_eq!(datum.get_int(0), Ok(75));
//! # Ok::<(), scopekit::ScopekitError>(())
//! ```

pub mod attributed;
pub mod datum;
pub mod error;
pub mod factory;
pub mod field;
pub mod heap;
pub mod registry;
pub mod scope;
pub mod signature;
pub mod type_hash;
pub mod value;

pub use attributed::{Attributed, ReflectedType, populate, rebind_in_place, spawn};
pub use datum::{Datum, GrowthStrategy, double_or_one};
pub use error::{
    AttributeError, DatumError, FactoryError, RegistryError, ScopeError, ScopekitError,
};
pub use factory::{FactoryFn, ScopeFactory};
pub use field::{ExternalValues, Field, FieldCells, FieldValue};
pub use heap::{ScopeHeap, ScopeId};
pub use registry::{TypeEntry, TypeRegistry};
pub use scope::{SELF_KEY, Scope, ScopeNode, clone_children};
pub use signature::{Binding, FieldBinder, Signature};
pub use type_hash::TypeHash;
pub use value::{Matrix4, ValueKind, Vector4};
