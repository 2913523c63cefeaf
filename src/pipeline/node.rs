//! Node abstraction for the pipeline tree.
//!
//! Two-layer design:
//! - **`Component` trait**: pluggable behaviour of filters and modules
//!   (start/stop hooks, input notifications, persisted settings).
//! - **`NodeKind` enum**: the closed set of node variants. Routing and
//!   lifecycle code match on it instead of inspecting types at runtime.
//!
//! `PipelineNode` carries what every variant shares: name, children,
//! back-references and the running flag.

use crate::pipeline::assigner::DataOutput;
use crate::pipeline::data_source::DataSourceState;
use crate::pipeline::error::PipelineResult;
use crate::pipeline::id::NodeId;
use crate::pipeline::node_type::NodeCategory;
use serde_json::Value;
use std::fmt;

/// Behaviour attached to a filter or module.
pub trait Component {
    /// Type name used to recreate the component on restore.
    fn type_name(&self) -> &str;

    /// Called when the owning node starts. An error leaves the node stopped.
    fn on_start(&mut self) -> PipelineResult<()> {
        Ok(())
    }

    /// Called when the owning node stops.
    fn on_stop(&mut self) -> PipelineResult<()> {
        Ok(())
    }

    /// Called when the upstream source fires `data_changed`.
    fn on_input_changed(&mut self, _input: Option<&DataOutput>) {}

    /// Settings to persist.
    fn save_state(&self) -> Value {
        Value::Null
    }
}

/// Component restored from a type name nobody registered.
///
/// Keeps the saved settings verbatim so a save/restore cycle is lossless.
#[derive(Debug, Clone, PartialEq)]
pub struct OpaqueComponent {
    type_name: String,
    state: Value,
}

impl OpaqueComponent {
    pub fn new(type_name: impl Into<String>, state: Value) -> Self {
        Self {
            type_name: type_name.into(),
            state,
        }
    }
}

impl Component for OpaqueComponent {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn save_state(&self) -> Value {
        self.state.clone()
    }
}

/// Filter-specific state.
pub struct FilterNode {
    /// Upstream nodes feeding this filter.
    pub inputs: Vec<NodeId>,
    pub component: Box<dyn Component>,
}

/// Module-manager-specific state.
pub struct ModuleManagerNode {
    /// The source whose modules this manager groups.
    pub source: NodeId,
}

/// Module-specific state.
pub struct ModuleNode {
    pub component: Box<dyn Component>,
}

/// Closed set of node variants.
pub enum NodeKind {
    Scene,
    Source,
    DataSource(Box<DataSourceState>),
    Filter(FilterNode),
    ModuleManager(ModuleManagerNode),
    Module(ModuleNode),
}

impl NodeKind {
    pub fn category(&self) -> NodeCategory {
        match self {
            NodeKind::Scene => NodeCategory::Scene,
            NodeKind::Source => NodeCategory::Source,
            NodeKind::DataSource(_) => NodeCategory::DataSource,
            NodeKind::Filter(_) => NodeCategory::Filter,
            NodeKind::ModuleManager(_) => NodeCategory::ModuleManager,
            NodeKind::Module(_) => NodeCategory::Module,
        }
    }

    pub fn component(&self) -> Option<&dyn Component> {
        match self {
            NodeKind::Filter(f) => Some(f.component.as_ref()),
            NodeKind::Module(m) => Some(m.component.as_ref()),
            _ => None,
        }
    }

    pub fn component_mut(&mut self) -> Option<&mut (dyn Component + 'static)> {
        match self {
            NodeKind::Filter(f) => Some(f.component.as_mut()),
            NodeKind::Module(m) => Some(m.component.as_mut()),
            _ => None,
        }
    }
}

/// A node in the pipeline arena.
pub struct PipelineNode {
    pub(crate) id: NodeId,
    pub(crate) name: String,
    /// Human-readable type label.
    pub(crate) type_label: String,
    pub(crate) kind: NodeKind,
    /// Ordered children; order determines update order.
    pub(crate) children: Vec<NodeId>,
    pub(crate) parent: NodeId,
    pub(crate) scene: NodeId,
    pub(crate) running: bool,
    pub(crate) outputs: Vec<DataOutput>,
    pub(crate) data_changed_count: u64,
}

impl PipelineNode {
    pub(crate) fn new(id: NodeId, name: impl Into<String>, kind: NodeKind) -> Self {
        let type_label = default_type_label(kind.category()).to_string();
        Self {
            id,
            name: name.into(),
            type_label,
            kind,
            children: Vec::new(),
            parent: NodeId::INVALID,
            scene: NodeId::INVALID,
            running: false,
            outputs: Vec::new(),
            data_changed_count: 0,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_label(&self) -> &str {
        &self.type_label
    }

    pub fn category(&self) -> NodeCategory {
        self.kind.category()
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Owning parent, if attached.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent.valid()
    }

    pub fn scene(&self) -> Option<NodeId> {
        self.scene.valid()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn outputs(&self) -> &[DataOutput] {
        &self.outputs
    }

    /// How many times this node fired `data_changed`.
    pub fn data_changed_count(&self) -> u64 {
        self.data_changed_count
    }

    /// Upstream inputs of a filter; empty for other variants.
    pub fn inputs(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Filter(f) => &f.inputs,
            _ => &[],
        }
    }

    /// Owning source of a module manager.
    pub fn source(&self) -> Option<NodeId> {
        match &self.kind {
            NodeKind::ModuleManager(mm) => mm.source.valid(),
            _ => None,
        }
    }

    pub fn data_source(&self) -> Option<&DataSourceState> {
        match &self.kind {
            NodeKind::DataSource(state) => Some(state.as_ref()),
            _ => None,
        }
    }

    pub(crate) fn data_source_mut(&mut self) -> Option<&mut DataSourceState> {
        match &mut self.kind {
            NodeKind::DataSource(state) => Some(state.as_mut()),
            _ => None,
        }
    }
}

impl fmt::Debug for PipelineNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineNode")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("category", &self.category())
            .field("children", &self.children)
            .field("parent", &self.parent)
            .field("scene", &self.scene)
            .field("running", &self.running)
            .finish()
    }
}

fn default_type_label(category: NodeCategory) -> &'static str {
    match category {
        NodeCategory::Scene => " scene",
        NodeCategory::Source | NodeCategory::DataSource => " data source",
        NodeCategory::Filter => " filter",
        NodeCategory::ModuleManager => " module manager",
        NodeCategory::Module => " module",
    }
}
