//! In-memory dataset.
//!
//! Holds named arrays per attribute table plus the active scalars/vectors/
//! tensors designation of each table. The writer output is the JSON form of
//! the contents, which is deterministic for a given dataset.

use super::{
    ArrayInfo, AttributeKind, AttributeRole, AttributeSlots, Dataset, DatasetReader, Observer,
    ObserverToken,
};
use crate::pipeline::error::{PipelineError, PipelineResult};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;

/// A named array of `components`-tuples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataArray {
    pub name: String,
    pub components: usize,
    pub values: Vec<f64>,
}

impl DataArray {
    pub fn new(name: impl Into<String>, components: usize, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            components,
            values,
        }
    }

    /// Number of tuples (values / components).
    pub fn tuples(&self) -> usize {
        if self.components == 0 {
            0
        } else {
            self.values.len() / self.components
        }
    }
}

/// One attribute table: ordered arrays plus active designations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct AttributeData {
    arrays: Vec<DataArray>,
    #[serde(default)]
    scalars: Option<String>,
    #[serde(default)]
    vectors: Option<String>,
    #[serde(default)]
    tensors: Option<String>,
}

impl AttributeData {
    fn active(&self, kind: AttributeKind) -> &Option<String> {
        match kind {
            AttributeKind::Scalars => &self.scalars,
            AttributeKind::Vectors => &self.vectors,
            AttributeKind::Tensors => &self.tensors,
        }
    }

    fn active_mut(&mut self, kind: AttributeKind) -> &mut Option<String> {
        match kind {
            AttributeKind::Scalars => &mut self.scalars,
            AttributeKind::Vectors => &mut self.vectors,
            AttributeKind::Tensors => &mut self.tensors,
        }
    }
}

/// Serialized form of a [`MemoryDataset`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Contents {
    type_name: String,
    point_data: AttributeData,
    cell_data: AttributeData,
}

/// Dataset kept entirely in process memory.
pub struct MemoryDataset {
    contents: Contents,
    observers: Vec<(ObserverToken, Observer)>,
    next_token: u64,
    mtime: u64,
}

impl MemoryDataset {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self::from_contents(Contents {
            type_name: type_name.into(),
            point_data: AttributeData::default(),
            cell_data: AttributeData::default(),
        })
    }

    fn from_contents(contents: Contents) -> Self {
        Self {
            contents,
            observers: Vec::new(),
            next_token: 0,
            mtime: 0,
        }
    }

    /// Builder-style [`MemoryDataset::add_array`].
    pub fn with_array(
        mut self,
        role: AttributeRole,
        name: impl Into<String>,
        components: usize,
        values: Vec<f64>,
    ) -> Self {
        self.add_array(role, DataArray::new(name, components, values));
        self
    }

    /// Append an array, replacing any existing array of the same name.
    ///
    /// Does not notify observers; call [`Dataset::modified`] afterwards.
    pub fn add_array(&mut self, role: AttributeRole, array: DataArray) {
        let table = self.table_mut(role);
        if let Some(existing) = table.arrays.iter_mut().find(|a| a.name == array.name) {
            *existing = array;
        } else {
            table.arrays.push(array);
        }
    }

    /// Remove an array, clearing any active designation that pointed at it.
    pub fn remove_array(&mut self, role: AttributeRole, name: &str) -> Option<DataArray> {
        let table = self.table_mut(role);
        let pos = table.arrays.iter().position(|a| a.name == name)?;
        for kind in AttributeKind::ALL {
            let active = table.active_mut(kind);
            if active.as_deref() == Some(name) {
                *active = None;
            }
        }
        Some(table.arrays.remove(pos))
    }

    pub fn array(&self, role: AttributeRole, name: &str) -> Option<&DataArray> {
        self.table(role).arrays.iter().find(|a| a.name == name)
    }

    /// Modification counter, bumped by every [`Dataset::modified`] call.
    pub fn mtime(&self) -> u64 {
        self.mtime
    }

    /// Snapshot of all active designations.
    pub fn active_attributes(&self) -> AttributeSlots<Option<String>> {
        let mut slots = AttributeSlots::default();
        for role in AttributeRole::ALL {
            for kind in AttributeKind::ALL {
                slots.set(role, kind, self.table(role).active(kind).clone());
            }
        }
        slots
    }

    fn table(&self, role: AttributeRole) -> &AttributeData {
        match role {
            AttributeRole::Point => &self.contents.point_data,
            AttributeRole::Cell => &self.contents.cell_data,
        }
    }

    fn table_mut(&mut self, role: AttributeRole) -> &mut AttributeData {
        match role {
            AttributeRole::Point => &mut self.contents.point_data,
            AttributeRole::Cell => &mut self.contents.cell_data,
        }
    }
}

impl fmt::Debug for MemoryDataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryDataset")
            .field("contents", &self.contents)
            .field("observers", &self.observers.len())
            .field("mtime", &self.mtime)
            .finish()
    }
}

impl Dataset for MemoryDataset {
    fn type_name(&self) -> &str {
        &self.contents.type_name
    }

    fn arrays(&self, role: AttributeRole) -> Vec<ArrayInfo> {
        self.table(role)
            .arrays
            .iter()
            .map(|a| ArrayInfo::new(a.name.clone(), a.components))
            .collect()
    }

    fn active(&self, role: AttributeRole, kind: AttributeKind) -> Option<&str> {
        self.table(role).active(kind).as_deref()
    }

    fn set_active(
        &mut self,
        role: AttributeRole,
        kind: AttributeKind,
        name: Option<&str>,
    ) -> PipelineResult<()> {
        let table = self.table_mut(role);
        match name {
            None | Some("") => {
                *table.active_mut(kind) = None;
            }
            Some(name) => {
                if !table.arrays.iter().any(|a| a.name == name) {
                    return Err(PipelineError::UnknownArray {
                        role,
                        name: name.to_string(),
                    });
                }
                *table.active_mut(kind) = Some(name.to_string());
            }
        }
        Ok(())
    }

    fn add_observer(&mut self, observer: Observer) -> ObserverToken {
        let token = ObserverToken(self.next_token);
        self.next_token += 1;
        self.observers.push((token, observer));
        token
    }

    fn remove_observer(&mut self, token: ObserverToken) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(t, _)| *t != token);
        self.observers.len() != before
    }

    fn observer_count(&self) -> usize {
        self.observers.len()
    }

    fn modified(&mut self) {
        self.mtime += 1;
        for (_, observer) in self.observers.iter_mut() {
            observer();
        }
    }

    fn write(&self) -> PipelineResult<Vec<u8>> {
        Ok(serde_json::to_vec(&self.contents)?)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Reader for [`MemoryDataset`] writer output.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryDatasetReader;

impl DatasetReader for MemoryDatasetReader {
    fn read(&self, bytes: &[u8]) -> PipelineResult<Box<dyn Dataset>> {
        let contents: Contents = serde_json::from_slice(bytes)?;
        Ok(Box::new(MemoryDataset::from_contents(contents)))
    }
}
