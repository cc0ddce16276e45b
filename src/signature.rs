//! Attribute descriptors for registered types.
//!
//! A [`Signature`] describes one prescribed attribute of a concrete type:
//! its key, value kind, element count, and how it binds to the instance.
//! Field signatures carry a [`FieldBinder`] - the accessor handle that
//! exports a member's shared cells from a type-erased instance - while table
//! signatures describe nested child scopes owned by the tree.

use std::any::Any;

use crate::field::ExternalValues;
use crate::value::ValueKind;

/// Accessor projecting a reflected member out of a type-erased instance.
///
/// Returns `None` when the instance is not of the expected concrete type.
pub type FieldBinder = fn(&dyn Any) -> Option<ExternalValues>;

/// How a prescribed attribute binds to its instance.
#[derive(Debug, Clone, Copy)]
pub enum Binding {
    /// Nested child scopes, owned through the tree.
    Table,
    /// A compiled member aliased through shared cells.
    Field(FieldBinder),
}

/// Immutable descriptor of one prescribed attribute.
#[derive(Debug, Clone)]
pub struct Signature {
    name: String,
    kind: ValueKind,
    count: usize,
    binding: Binding,
}

impl Signature {
    /// A field attribute of `kind` with `count` elements, bound by `binder`.
    ///
    /// The binder's exported kind and length are validated against `kind` and
    /// `count` when the type is populated.
    pub fn field(
        name: impl Into<String>,
        kind: ValueKind,
        count: usize,
        binder: FieldBinder,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            count,
            binding: Binding::Field(binder),
        }
    }

    /// A table attribute with `count` pre-allocated child scopes.
    pub fn table(name: impl Into<String>, count: usize) -> Self {
        Self {
            name: name.into(),
            kind: ValueKind::Table,
            count,
            binding: Binding::Table,
        }
    }

    /// The attribute key.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Element count: field length for field attributes, pre-allocated
    /// children for table attributes.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn binding(&self) -> &Binding {
        &self.binding
    }
}
