//! Unified error types.
//!
//! Each subsystem reports misuse through its own error enum; [`ScopekitError`]
//! wraps them all for callers that want a single error type. Every condition
//! here is a programming error reported synchronously to the immediate caller:
//! there is no retry, and a failing operation leaves previously-established
//! invariants (tree shape, datum kind) unchanged.

use thiserror::Error;

use crate::heap::ScopeId;
use crate::type_hash::TypeHash;
use crate::value::ValueKind;

/// Errors raised by [`Datum`](crate::Datum) operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DatumError {
    /// The kind was already fixed and cannot be changed.
    #[error("datum kind already set to {current}, cannot change to {requested}")]
    KindAlreadySet {
        current: ValueKind,
        requested: ValueKind,
    },

    /// An accessor was called for a kind other than the datum's.
    #[error("expected {expected} datum, found {actual}")]
    KindMismatch {
        expected: ValueKind,
        actual: ValueKind,
    },

    /// The operation requires a kind to have been set first.
    #[error("datum kind is not set")]
    KindNotSet,

    /// Index past the end of the datum.
    #[error("index {index} out of bounds for size {size}")]
    OutOfBounds { index: usize, size: usize },

    /// A resizing mutator was called on externally-aliased storage.
    #[error("datum aliases external storage and cannot be resized")]
    ExternalStorage,

    /// `set_storage` was called while the datum owns allocated storage.
    #[error("datum already owns allocated storage")]
    OwnsStorage,

    /// A textual value could not be parsed as the datum's kind.
    #[error("cannot parse {text:?} as {kind}")]
    Parse { kind: ValueKind, text: String },

    /// The datum's kind has no textual form.
    #[error("{kind} values cannot be parsed from text")]
    ParseUnsupported { kind: ValueKind },
}

/// Errors raised by scope-tree operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScopeError {
    /// Attribute keys must be non-empty.
    #[error("attribute key cannot be empty")]
    EmptyKey,

    /// The handle does not refer to a live scope node.
    #[error("stale scope handle {0}")]
    Stale(ScopeId),

    /// The datum at the key exists but is not table-kind.
    #[error("datum at {key:?} is {found}, not a table")]
    NotATable { key: String, found: ValueKind },

    /// A scope cannot adopt itself.
    #[error("a scope cannot adopt itself")]
    AdoptSelf,

    /// Adopting an ancestor would create a cycle in the ownership tree.
    #[error("a scope cannot adopt its own ancestor")]
    AdoptAncestor,

    /// A cached field binder no longer matches the node's concrete type.
    #[error("field binder for {key:?} does not match the node")]
    Binding { key: String },

    #[error(transparent)]
    Datum(#[from] DatumError),
}

/// Errors raised by the [`TypeRegistry`](crate::TypeRegistry).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    /// A type with this identity was already registered.
    #[error("type {name:?} is already registered")]
    DuplicateType { name: String },

    /// The queried type was never registered.
    #[error("no signatures registered for type {0}")]
    UnknownType(TypeHash),
}

/// Errors raised while populating or mutating attributed scopes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AttributeError {
    /// The node does not embed an [`Attributed`](crate::Attributed) base.
    #[error("scope node is not attributed")]
    NotAttributed,

    /// Population must run on a freshly inserted, empty node.
    #[error("scope already has entries, populate must run on a fresh node")]
    AlreadyPopulated,

    /// The key belongs to a prescribed attribute and cannot be appended.
    #[error("key {key:?} names a prescribed attribute")]
    PrescribedKey { key: String },

    /// A signature's field binder rejected the instance or disagreed with
    /// the declared kind/count.
    #[error("signature {name:?} does not bind to the instance ({detail})")]
    Signature { name: String, detail: String },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Scope(#[from] ScopeError),
}

impl From<DatumError> for AttributeError {
    fn from(error: DatumError) -> Self {
        AttributeError::Scope(ScopeError::Datum(error))
    }
}

/// Errors raised by the by-name scope factory.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FactoryError {
    /// A factory with this name was already registered.
    #[error("factory {name:?} is already registered")]
    DuplicateFactory { name: String },

    /// No factory registered under the name.
    #[error("no factory registered for {name:?}")]
    UnknownFactory { name: String },
}

/// The unified error type for all scopekit operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScopekitError {
    #[error(transparent)]
    Datum(#[from] DatumError),

    #[error(transparent)]
    Scope(#[from] ScopeError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Attribute(#[from] AttributeError),

    #[error(transparent)]
    Factory(#[from] FactoryError),
}
