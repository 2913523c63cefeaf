//! Wrapped dataset collaborator.
//!
//! The pipeline never touches dataset internals directly. Everything it needs
//! goes through the [`Dataset`] trait:
//!
//! - per-role (point/cell) attribute tables: array enumeration and
//!   "set active <kind>(name)"
//! - a "modified" notification with token-based subscriptions
//! - serialization to an opaque byte buffer, read back through a
//!   [`DatasetReader`]
//!
//! [`MemoryDataset`] is the in-process implementation used by the binary,
//! the tests and the benchmarks.

pub mod discovery;
pub mod memory;

pub use discovery::{candidate_names, discover};
pub use memory::{DataArray, MemoryDataset, MemoryDatasetReader};

use crate::pipeline::error::PipelineResult;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;

/// Which attribute table of a dataset an array lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttributeRole {
    Point,
    Cell,
}

impl AttributeRole {
    pub const ALL: [AttributeRole; 2] = [AttributeRole::Point, AttributeRole::Cell];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            AttributeRole::Point => 0,
            AttributeRole::Cell => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AttributeRole::Point => "point",
            AttributeRole::Cell => "cell",
        }
    }
}

impl fmt::Display for AttributeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of attribute an array can be designated as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttributeKind {
    Scalars,
    Vectors,
    Tensors,
}

impl AttributeKind {
    pub const ALL: [AttributeKind; 3] = [
        AttributeKind::Scalars,
        AttributeKind::Vectors,
        AttributeKind::Tensors,
    ];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            AttributeKind::Scalars => 0,
            AttributeKind::Vectors => 1,
            AttributeKind::Tensors => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AttributeKind::Scalars => "scalars",
            AttributeKind::Vectors => "vectors",
            AttributeKind::Tensors => "tensors",
        }
    }

    /// Whether an array with `components` components is a candidate for this kind.
    pub fn accepts(self, components: usize) -> bool {
        match self {
            AttributeKind::Scalars => components == 1,
            AttributeKind::Vectors => components == 3,
            AttributeKind::Tensors => components == 4 || components == 9,
        }
    }
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed table with one slot per `(role, kind)` pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeSlots<T> {
    slots: [[T; 3]; 2],
}

impl<T> AttributeSlots<T> {
    #[inline]
    pub fn get(&self, role: AttributeRole, kind: AttributeKind) -> &T {
        &self.slots[role.index()][kind.index()]
    }

    #[inline]
    pub fn get_mut(&mut self, role: AttributeRole, kind: AttributeKind) -> &mut T {
        &mut self.slots[role.index()][kind.index()]
    }

    pub fn set(&mut self, role: AttributeRole, kind: AttributeKind, value: T) {
        self.slots[role.index()][kind.index()] = value;
    }

    /// Iterate over all six slots, point data first.
    pub fn iter(&self) -> impl Iterator<Item = (AttributeRole, AttributeKind, &T)> {
        AttributeRole::ALL.into_iter().flat_map(move |role| {
            AttributeKind::ALL
                .into_iter()
                .map(move |kind| (role, kind, self.get(role, kind)))
        })
    }
}

/// Name and shape of a data array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrayInfo {
    pub name: String,
    pub components: usize,
}

impl ArrayInfo {
    pub fn new(name: impl Into<String>, components: usize) -> Self {
        Self {
            name: name.into(),
            components,
        }
    }
}

/// Identifies a live modification subscription on a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverToken(pub u64);

/// Callback invoked whenever a dataset reports a modification.
pub type Observer = Box<dyn FnMut()>;

/// Opaque dataset managed by a data source.
pub trait Dataset {
    /// Concrete dataset type, e.g. `"PolyData"`.
    fn type_name(&self) -> &str;

    /// Arrays of the given attribute table, in table order.
    fn arrays(&self, role: AttributeRole) -> Vec<ArrayInfo>;

    /// Currently active array of `kind` in the `role` table.
    fn active(&self, role: AttributeRole, kind: AttributeKind) -> Option<&str>;

    /// Mark `name` as the active `kind` of the `role` table, or deactivate it with `None`.
    fn set_active(
        &mut self,
        role: AttributeRole,
        kind: AttributeKind,
        name: Option<&str>,
    ) -> PipelineResult<()>;

    fn add_observer(&mut self, observer: Observer) -> ObserverToken;

    /// Returns false if the token was not subscribed.
    fn remove_observer(&mut self, token: ObserverToken) -> bool;

    fn observer_count(&self) -> usize;

    /// Bump the modification time and notify every observer.
    fn modified(&mut self);

    /// Export through the native writer.
    fn write(&self) -> PipelineResult<Vec<u8>>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Native reader turning writer output back into a dataset.
pub trait DatasetReader {
    fn read(&self, bytes: &[u8]) -> PipelineResult<Box<dyn Dataset>>;
}
