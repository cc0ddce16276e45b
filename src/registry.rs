//! Explicit registry of per-type attribute layouts.
//!
//! [`TypeRegistry`] maps a type's identity hash to its ordered signature
//! list. It is a plain owned value: initialize it by registering every
//! concrete type once before constructing instances, tear it down with
//! [`TypeRegistry::remove`] or [`TypeRegistry::clear`]. There is no reference
//! counting - callers must not remove a type while an instance of it is being
//! constructed.

use rustc_hash::FxHashMap;

use crate::attributed::ReflectedType;
use crate::error::RegistryError;
use crate::signature::Signature;
use crate::type_hash::TypeHash;

/// One registered type: its name and ordered signature list.
#[derive(Debug, Clone)]
pub struct TypeEntry {
    name: String,
    signatures: Vec<Signature>,
}

impl TypeEntry {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signatures(&self) -> &[Signature] {
        &self.signatures
    }
}

/// Registry mapping type identity to attribute layout.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: FxHashMap<TypeHash, TypeEntry>,
}

impl TypeRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type's signature list under its name hash.
    /// Registering the same identity twice is an error.
    pub fn register(
        &mut self,
        name: &str,
        signatures: Vec<Signature>,
    ) -> Result<TypeHash, RegistryError> {
        let hash = TypeHash::from_name(name);
        if self.types.contains_key(&hash) {
            return Err(RegistryError::DuplicateType {
                name: name.to_string(),
            });
        }
        log::debug!("registered type {name:?} with {} signatures", signatures.len());
        self.types.insert(
            hash,
            TypeEntry {
                name: name.to_string(),
                signatures,
            },
        );
        Ok(hash)
    }

    /// Register a [`ReflectedType`] from its own declaration.
    pub fn register_type<T: ReflectedType>(&mut self) -> Result<TypeHash, RegistryError> {
        self.register(T::TYPE_NAME, T::signatures())
    }

    /// The signature list of a registered type. Unregistered identities are
    /// an error, not an empty list.
    pub fn signatures(&self, hash: TypeHash) -> Result<&[Signature], RegistryError> {
        self.types
            .get(&hash)
            .map(|entry| entry.signatures.as_slice())
            .ok_or(RegistryError::UnknownType(hash))
    }

    /// The full entry of a registered type.
    pub fn entry(&self, hash: TypeHash) -> Option<&TypeEntry> {
        self.types.get(&hash)
    }

    pub fn contains(&self, hash: TypeHash) -> bool {
        self.types.contains_key(&hash)
    }

    /// Drop a registration. Returns whether it existed.
    pub fn remove(&mut self, hash: TypeHash) -> bool {
        self.types.remove(&hash).is_some()
    }

    /// Drop every registration.
    pub fn clear(&mut self) {
        self.types.clear();
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
