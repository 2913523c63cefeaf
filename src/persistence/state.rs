//! Persisted node records and the save/restore passes over a `Pipeline`.
//!
//! Derived state (candidate lists, outputs, running flags, observer tokens)
//! is never written; it is recomputed when the dataset is reassigned.
//!
//! Restoration order for one node:
//! 1. scalar fields (name, type label, component);
//! 2. dataset, through the replacement hook;
//! 3. remaining non-child state (saved name, selectors through the change hook);
//! 4. children, each restored recursively and attached through the
//!    structural-change hook.

use crate::config::PersistenceConfig;
use crate::dataset::{AttributeKind, AttributeRole, AttributeSlots, DatasetReader};
use crate::persistence::codec::{self, base64_bytes};
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::factory::ComponentFactory;
use crate::pipeline::id::NodeId;
use crate::pipeline::node::Component;
use crate::pipeline::node_type::NodeCategory;
use crate::pipeline::tree::Pipeline;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Saved filter or module behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentState {
    pub type_name: String,
    #[serde(default)]
    pub state: Value,
}

/// The six selector names of a data source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorState {
    pub point_scalars: String,
    pub point_vectors: String,
    pub point_tensors: String,
    pub cell_scalars: String,
    pub cell_vectors: String,
    pub cell_tensors: String,
}

impl SelectorState {
    pub fn from_slots(slots: &AttributeSlots<String>) -> Self {
        let mut state = Self::default();
        for (role, kind, name) in slots.iter() {
            *state.slot_mut(role, kind) = name.clone();
        }
        state
    }

    pub fn get(&self, role: AttributeRole, kind: AttributeKind) -> &str {
        match (role, kind) {
            (AttributeRole::Point, AttributeKind::Scalars) => &self.point_scalars,
            (AttributeRole::Point, AttributeKind::Vectors) => &self.point_vectors,
            (AttributeRole::Point, AttributeKind::Tensors) => &self.point_tensors,
            (AttributeRole::Cell, AttributeKind::Scalars) => &self.cell_scalars,
            (AttributeRole::Cell, AttributeKind::Vectors) => &self.cell_vectors,
            (AttributeRole::Cell, AttributeKind::Tensors) => &self.cell_tensors,
        }
    }

    fn slot_mut(&mut self, role: AttributeRole, kind: AttributeKind) -> &mut String {
        match (role, kind) {
            (AttributeRole::Point, AttributeKind::Scalars) => &mut self.point_scalars,
            (AttributeRole::Point, AttributeKind::Vectors) => &mut self.point_vectors,
            (AttributeRole::Point, AttributeKind::Tensors) => &mut self.point_tensors,
            (AttributeRole::Cell, AttributeKind::Scalars) => &mut self.cell_scalars,
            (AttributeRole::Cell, AttributeKind::Vectors) => &mut self.cell_vectors,
            (AttributeRole::Cell, AttributeKind::Tensors) => &mut self.cell_tensors,
        }
    }
}

/// Persisted form of one node and its subtree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeState {
    pub category: NodeCategory,
    pub name: String,
    #[serde(default)]
    pub type_label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<ComponentState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selectors: Option<SelectorState>,
    /// Gzip-compressed writer output, base64 in JSON.
    #[serde(default, with = "base64_bytes", skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<u8>>,
    #[serde(default)]
    pub children: Vec<NodeState>,
}

impl NodeState {
    /// Decompressed dataset bytes, if a dataset was saved.
    pub fn dataset_bytes(&self) -> PipelineResult<Option<Vec<u8>>> {
        self.data.as_deref().map(codec::decompress).transpose()
    }

    /// Number of records in this subtree, including this one.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(NodeState::node_count).sum::<usize>()
    }
}

/// Collaborators needed to rebuild nodes from records.
pub struct RestoreContext<'a> {
    pub reader: &'a dyn DatasetReader,
    pub components: &'a ComponentFactory,
}

impl<'a> RestoreContext<'a> {
    pub fn new(reader: &'a dyn DatasetReader, components: &'a ComponentFactory) -> Self {
        Self { reader, components }
    }

    fn component(&self, state: &NodeState) -> PipelineResult<Box<dyn Component>> {
        let saved = state.component.as_ref().ok_or_else(|| {
            PipelineError::Serialization(format!(
                "{} '{}' has no component record",
                state.category, state.name
            ))
        })?;
        self.components.create(&saved.type_name, &saved.state)
    }
}

impl Pipeline {
    /// Capture `id` and its subtree.
    pub fn save_state(&self, id: NodeId, config: &PersistenceConfig) -> PipelineResult<NodeState> {
        let node = self.get(id)?;

        let component = node.kind().component().map(|c| ComponentState {
            type_name: c.type_name().to_string(),
            state: c.save_state(),
        });

        let (selectors, data) = match node.data_source() {
            Some(source) => {
                let data = match source.dataset() {
                    Some(dataset) => Some(codec::compress(
                        &dataset.write()?,
                        config.compression_level,
                    )?),
                    None => None,
                };
                (Some(SelectorState::from_slots(source.selectors())), data)
            }
            None => (None, None),
        };

        let children = node
            .children()
            .iter()
            .map(|&child| self.save_state(child, config))
            .collect::<PipelineResult<Vec<_>>>()?;

        Ok(NodeState {
            category: node.category(),
            name: node.name().to_string(),
            type_label: node.type_label().to_string(),
            component,
            selectors,
            data,
            children,
        })
    }

    /// Build a fresh, detached, stopped subtree from `state`.
    pub fn restore(&mut self, state: &NodeState, ctx: &RestoreContext<'_>) -> PipelineResult<NodeId> {
        let id = match state.category {
            NodeCategory::Scene => self.create_scene(state.name.clone()),
            NodeCategory::Source => self.create_source(state.name.clone()),
            NodeCategory::DataSource => self.create_data_source(None)?,
            NodeCategory::Filter => {
                let component = ctx.component(state)?;
                self.create_filter(state.name.clone(), component)
            }
            NodeCategory::ModuleManager => self.create_module_manager(),
            NodeCategory::Module => {
                let component = ctx.component(state)?;
                self.create_module(state.name.clone(), component)
            }
        };

        if let Err(err) = self.restore_fields(id, state, ctx) {
            if let Err(cleanup) = self.discard(id) {
                tracing::warn!("Could not discard partial restore {:?}: {}", id, cleanup);
            }
            return Err(err);
        }
        tracing::debug!("Restored {} '{}' as {:?}", state.category, state.name, id);
        Ok(id)
    }

    /// Everything after node creation: fields, dataset, selectors, children.
    fn restore_fields(
        &mut self,
        id: NodeId,
        state: &NodeState,
        ctx: &RestoreContext<'_>,
    ) -> PipelineResult<()> {
        let node = self.get_mut(id)?;
        node.name = state.name.clone();
        if !state.type_label.is_empty() {
            node.type_label = state.type_label.clone();
        }

        if let Some(bytes) = state.dataset_bytes()? {
            let dataset = ctx.reader.read(&bytes)?;
            self.set_data(id, dataset)?;
            self.set_name(id, state.name.clone())?;
        }

        if let Some(selectors) = &state.selectors {
            self.restore_selectors(id, selectors)?;
        }

        for child_state in &state.children {
            let child = self.restore(child_state, ctx)?;
            if let Err(err) = self.append_child(id, child) {
                self.discard(child)?;
                return Err(err);
            }
        }
        Ok(())
    }

    fn restore_selectors(&mut self, id: NodeId, saved: &SelectorState) -> PipelineResult<()> {
        if self.dataset(id).is_none() {
            return Ok(());
        }
        for role in AttributeRole::ALL {
            for kind in AttributeKind::ALL {
                let name = saved.get(role, kind);
                let source = self.data_source(id)?;
                if source.selector(role, kind) == name {
                    continue;
                }
                if !source.candidates(role, kind).iter().any(|c| c == name) {
                    tracing::warn!(
                        "Saved {} {} '{}' is not available on {:?}, skipping",
                        role,
                        kind,
                        name,
                        id
                    );
                    continue;
                }
                self.set_selector(id, role, kind, name)?;
            }
        }
        Ok(())
    }
}
