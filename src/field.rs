//! Shared storage cells binding compiled members to their reflective view.
//!
//! A concrete type declares each reflected member as a [`Field<T>`]: a
//! fixed-length block of shared, interior-mutable cells. Populating the type's
//! attributed scope exports the same block into the matching datum as external
//! storage, so the member and the reflective view observe the same memory.
//! The block's length is fixed at construction, which is what makes growth of
//! externally-aliased datums structurally impossible.

use std::cell::RefCell;
use std::rc::Rc;

use crate::heap::ScopeId;
use crate::value::{Matrix4, ValueKind, Vector4};

/// A fixed-length block of shared value cells.
///
/// Cloning the handle aliases the same cells; [`FieldCells::duplicate`] makes
/// an independent deep copy.
#[derive(Debug, Clone)]
pub struct FieldCells<T> {
    cells: Rc<[RefCell<T>]>,
}

impl<T> FieldCells<T> {
    /// Wrap a set of values into a shared cell block.
    pub fn from_values(values: Vec<T>) -> Self {
        Self {
            cells: values.into_iter().map(RefCell::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// True when both handles alias the same cell block.
    pub fn ptr_eq(&self, other: &FieldCells<T>) -> bool {
        Rc::ptr_eq(&self.cells, &other.cells)
    }
}

impl<T: Clone> FieldCells<T> {
    /// A block of `len` copies of `value`.
    pub fn filled(value: T, len: usize) -> Self {
        Self::from_values(vec![value; len])
    }

    /// Read the value at `index`, if in bounds.
    pub fn get(&self, index: usize) -> Option<T> {
        self.cells.get(index).map(|cell| cell.borrow().clone())
    }

    /// Write the value at `index`. Returns false when out of bounds.
    pub fn set(&self, index: usize, value: T) -> bool {
        match self.cells.get(index) {
            Some(cell) => {
                *cell.borrow_mut() = value;
                true
            }
            None => false,
        }
    }

    /// An independent copy of the block's current contents.
    pub fn duplicate(&self) -> Self {
        Self::from_values(self.cells.iter().map(|cell| cell.borrow().clone()).collect())
    }
}

/// A value type that can back a reflected member.
pub trait FieldValue: Clone + Default + 'static {
    /// The datum kind a member of this type projects to.
    const KIND: ValueKind;

    /// Wrap a cell block into the matching [`ExternalValues`] arm.
    fn export(cells: FieldCells<Self>) -> ExternalValues;
}

impl FieldValue for i32 {
    const KIND: ValueKind = ValueKind::Integer;
    fn export(cells: FieldCells<Self>) -> ExternalValues {
        ExternalValues::Integer(cells)
    }
}

impl FieldValue for f32 {
    const KIND: ValueKind = ValueKind::Float;
    fn export(cells: FieldCells<Self>) -> ExternalValues {
        ExternalValues::Float(cells)
    }
}

impl FieldValue for String {
    const KIND: ValueKind = ValueKind::String;
    fn export(cells: FieldCells<Self>) -> ExternalValues {
        ExternalValues::String(cells)
    }
}

impl FieldValue for Vector4 {
    const KIND: ValueKind = ValueKind::Vector4;
    fn export(cells: FieldCells<Self>) -> ExternalValues {
        ExternalValues::Vector4(cells)
    }
}

impl FieldValue for Matrix4 {
    const KIND: ValueKind = ValueKind::Matrix4;
    fn export(cells: FieldCells<Self>) -> ExternalValues {
        ExternalValues::Matrix4(cells)
    }
}

impl FieldValue for ScopeId {
    const KIND: ValueKind = ValueKind::Pointer;
    fn export(cells: FieldCells<Self>) -> ExternalValues {
        ExternalValues::Pointer(cells)
    }
}

/// A reflected member of a concrete type.
///
/// Always at least one element long; scalar members use the element-0 sugar,
/// array members the indexed accessors.
#[derive(Debug)]
pub struct Field<T: FieldValue> {
    cells: FieldCells<T>,
}

impl<T: FieldValue> Field<T> {
    /// A single-element field holding `value`.
    pub fn new(value: T) -> Self {
        Self {
            cells: FieldCells::from_values(vec![value]),
        }
    }

    /// A field of `len` default elements. Lengths below 1 are clamped to 1.
    pub fn with_len(len: usize) -> Self {
        Self {
            cells: FieldCells::filled(T::default(), len.max(1)),
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Read the first element.
    pub fn get(&self) -> T {
        self.cells.get(0).unwrap_or_default()
    }

    /// Write the first element.
    pub fn set(&self, value: T) {
        self.cells.set(0, value);
    }

    pub fn get_at(&self, index: usize) -> Option<T> {
        self.cells.get(index)
    }

    pub fn set_at(&self, index: usize, value: T) -> bool {
        self.cells.set(index, value)
    }

    /// Export the backing cells for use as a datum's external storage.
    pub fn export(&self) -> ExternalValues {
        T::export(self.cells.clone())
    }

    /// The shared cell block itself.
    pub fn share(&self) -> FieldCells<T> {
        self.cells.clone()
    }
}

impl<T: FieldValue> Default for Field<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Cloning a field deep-copies its cells: a copied instance gets members
/// independent of the source's.
impl<T: FieldValue> Clone for Field<T> {
    fn clone(&self) -> Self {
        Self {
            cells: self.cells.duplicate(),
        }
    }
}

/// Kind-tagged handle to externally-owned storage.
///
/// There is deliberately no `Table` arm: child scopes are always owned through
/// the tree, never aliased.
#[derive(Debug, Clone)]
pub enum ExternalValues {
    Integer(FieldCells<i32>),
    Float(FieldCells<f32>),
    String(FieldCells<String>),
    Vector4(FieldCells<Vector4>),
    Matrix4(FieldCells<Matrix4>),
    Pointer(FieldCells<ScopeId>),
}

impl ExternalValues {
    pub fn kind(&self) -> ValueKind {
        match self {
            ExternalValues::Integer(_) => ValueKind::Integer,
            ExternalValues::Float(_) => ValueKind::Float,
            ExternalValues::String(_) => ValueKind::String,
            ExternalValues::Vector4(_) => ValueKind::Vector4,
            ExternalValues::Matrix4(_) => ValueKind::Matrix4,
            ExternalValues::Pointer(_) => ValueKind::Pointer,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ExternalValues::Integer(c) => c.len(),
            ExternalValues::Float(c) => c.len(),
            ExternalValues::String(c) => c.len(),
            ExternalValues::Vector4(c) => c.len(),
            ExternalValues::Matrix4(c) => c.len(),
            ExternalValues::Pointer(c) => c.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
