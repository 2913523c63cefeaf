//! Pipeline tree: node arena, structural edits and lifecycle.
//!
//! Every node lives in `Pipeline::nodes`, indexed by `NodeId`. A parent owns
//! its children through its ordered `children` list; `scene`, `parent`,
//! module-manager `source` and filter `inputs` are plain IDs.
//!
//! All edits of a child list funnel into `handle_children`, the
//! structural-change hook:
//! 1. Removed children are detached, then stopped. A failed stop is
//!    reported after the remaining edits are applied.
//! 2. Added children inherit the parent's scene, get their back-references
//!    wired, and are started if the parent is running. A child that fails to
//!    start is logged and recorded, the remaining additions go on.

use crate::dataset::{AttributeKind, AttributeRole, Dataset};
use crate::pipeline::assigner::DataOutput;
use crate::pipeline::data_source::{display_name, DataSourceState};
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::events::{EventBus, PipelineEvent};
use crate::pipeline::id::NodeId;
use crate::pipeline::node::{
    Component, FilterNode, ModuleManagerNode, ModuleNode, NodeKind, PipelineNode,
};
use crate::pipeline::node_type::NodeCategory;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::collections::HashSet;

/// Outcome of a start that did not fail outright.
#[derive(Debug, Default)]
pub struct StartReport {
    /// Nodes that transitioned to running, in start order.
    pub started: Vec<NodeId>,
    /// Descendants whose start failed and was swallowed.
    pub failures: Vec<(NodeId, PipelineError)>,
}

impl StartReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failed_nodes(&self) -> Vec<NodeId> {
        self.failures.iter().map(|(id, _)| *id).collect()
    }

    pub fn merge(&mut self, other: StartReport) {
        self.started.extend(other.started);
        self.failures.extend(other.failures);
    }
}

/// What a tree editor wants to drop onto a node: a category or an existing node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropCandidate {
    Category(NodeCategory),
    Node(NodeId),
}

/// The node arena.
pub struct Pipeline {
    nodes: Vec<Option<PipelineNode>>,
    events: EventBus,
    /// Dataset observers post the owning node here.
    modified_tx: Sender<NodeId>,
    modified_rx: Receiver<NodeId>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    pub fn new() -> Self {
        let (modified_tx, modified_rx) = unbounded();
        Self {
            nodes: Vec::new(),
            events: EventBus::new(),
            modified_tx,
            modified_rx,
        }
    }

    // ── Node creation ──

    fn insert(&mut self, name: impl Into<String>, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Some(PipelineNode::new(id, name, kind)));
        id
    }

    /// Create a scene. A scene is its own scene reference.
    pub fn create_scene(&mut self, name: impl Into<String>) -> NodeId {
        let id = self.insert(name, NodeKind::Scene);
        if let Some(node) = self.nodes[id.index()].as_mut() {
            node.scene = id;
        }
        id
    }

    pub fn create_source(&mut self, name: impl Into<String>) -> NodeId {
        self.insert(name, NodeKind::Source)
    }

    /// Create a data source, running the dataset replacement hook if `data` is given.
    pub fn create_data_source(&mut self, data: Option<Box<dyn Dataset>>) -> PipelineResult<NodeId> {
        let id = self.insert(
            display_name(None, ""),
            NodeKind::DataSource(Box::new(DataSourceState::new())),
        );
        if let Some(data) = data {
            self.set_data(id, data)?;
        }
        Ok(id)
    }

    pub fn create_filter(&mut self, name: impl Into<String>, component: Box<dyn Component>) -> NodeId {
        self.insert(
            name,
            NodeKind::Filter(FilterNode {
                inputs: Vec::new(),
                component,
            }),
        )
    }

    pub fn create_module_manager(&mut self) -> NodeId {
        self.insert(
            "Modules",
            NodeKind::ModuleManager(ModuleManagerNode {
                source: NodeId::INVALID,
            }),
        )
    }

    pub fn create_module(&mut self, name: impl Into<String>, component: Box<dyn Component>) -> NodeId {
        self.insert(name, NodeKind::Module(ModuleNode { component }))
    }

    // ── Lookup ──

    pub fn node(&self, id: NodeId) -> Option<&PipelineNode> {
        self.nodes.get(id.index()).and_then(Option::as_ref)
    }

    pub fn get(&self, id: NodeId) -> PipelineResult<&PipelineNode> {
        self.node(id).ok_or(PipelineError::UnknownNode(id))
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> PipelineResult<&mut PipelineNode> {
        self.nodes
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(PipelineError::UnknownNode(id))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &PipelineNode> {
        self.nodes.iter().filter_map(Option::as_ref)
    }

    /// Nodes without a parent (scenes and detached subtrees).
    pub fn roots(&self) -> impl Iterator<Item = &PipelineNode> {
        self.iter().filter(|n| !n.parent.is_valid())
    }

    /// Module managers among the direct children of `id`.
    pub fn module_managers(&self, id: NodeId) -> Vec<NodeId> {
        self.node(id)
            .map(|n| {
                n.children
                    .iter()
                    .copied()
                    .filter(|&c| self.category_of(c) == Some(NodeCategory::ModuleManager))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn subscribe(&mut self) -> Receiver<PipelineEvent> {
        self.events.subscribe()
    }

    pub fn set_name(&mut self, id: NodeId, name: impl Into<String>) -> PipelineResult<()> {
        self.get_mut(id)?.name = name.into();
        Ok(())
    }

    fn category_of(&self, id: NodeId) -> Option<NodeCategory> {
        self.node(id).map(PipelineNode::category)
    }

    fn component_mut(&mut self, id: NodeId) -> Option<&mut (dyn Component + 'static)> {
        self.nodes
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .and_then(|n| n.kind.component_mut())
    }

    /// True if `candidate` is `of` or one of its ancestors.
    fn is_ancestor(&self, candidate: NodeId, of: NodeId) -> bool {
        let mut current = of;
        while let Some(node) = self.node(current) {
            if current == candidate {
                return true;
            }
            current = node.parent;
        }
        false
    }

    // ── Structural edits ──

    /// Attach `child` to `parent`, routing it by category:
    ///
    /// - filters are appended;
    /// - a source of the parent's own category goes to the parent's scene;
    /// - modules go through [`Pipeline::add_module`];
    /// - anything else is appended.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> PipelineResult<StartReport> {
        let parent_category = self.get(parent)?.category();
        let child_category = self.get(child)?.category();
        let invalid = PipelineError::InvalidChild {
            parent,
            child,
            category: child_category,
        };

        match parent_category {
            NodeCategory::Scene => {
                if child_category.is_source() {
                    self.append_child(parent, child)
                } else {
                    Err(invalid)
                }
            }
            NodeCategory::ModuleManager => {
                if child_category == NodeCategory::Module {
                    self.append_child(parent, child)
                } else {
                    Err(invalid)
                }
            }
            NodeCategory::Module => Err(invalid),
            NodeCategory::Source | NodeCategory::DataSource | NodeCategory::Filter => {
                if child_category.is_filter() {
                    self.append_child(parent, child)
                } else if parent_category.is_sibling_category(child_category) {
                    let scene = self
                        .get(parent)?
                        .scene
                        .valid()
                        .ok_or(PipelineError::NoScene(parent))?;
                    tracing::debug!("Forwarding {:?} from {:?} to scene {:?}", child, parent, scene);
                    self.add_child(scene, child)
                } else if child_category == NodeCategory::Module {
                    self.add_module(parent, child)
                } else if child_category == NodeCategory::Scene {
                    Err(invalid)
                } else {
                    self.append_child(parent, child)
                }
            }
        }
    }

    /// Add a module under the last module manager of `parent`, creating one
    /// (started if `parent` is running) when there is none.
    pub fn add_module(&mut self, parent: NodeId, module: NodeId) -> PipelineResult<StartReport> {
        let parent_node = self.get(parent)?;
        let module_category = self.get(module)?.category();
        if !matches!(
            parent_node.category(),
            NodeCategory::Source | NodeCategory::DataSource | NodeCategory::Filter
        ) || module_category != NodeCategory::Module
        {
            return Err(PipelineError::InvalidChild {
                parent,
                child: module,
                category: module_category,
            });
        }

        let existing = parent_node
            .children
            .iter()
            .rev()
            .copied()
            .find(|&c| self.category_of(c) == Some(NodeCategory::ModuleManager));

        let mut report = StartReport::default();
        let manager = match existing {
            Some(manager) => manager,
            None => {
                let (scene, running) = (parent_node.scene, parent_node.running);
                let manager = self.create_module_manager();
                let node = self.get_mut(manager)?;
                node.scene = scene;
                if let NodeKind::ModuleManager(mm) = &mut node.kind {
                    mm.source = parent;
                }
                if running {
                    report.merge(self.start(manager)?);
                }
                report.merge(self.append_child(parent, manager)?);
                tracing::info!("Created module manager {:?} for {:?}", manager, parent);
                manager
            }
        };

        report.merge(self.append_child(manager, module)?);
        Ok(report)
    }

    /// Append `child` to the end of `parent`'s children without routing.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> PipelineResult<StartReport> {
        let index = self.get(parent)?.children.len();
        self.insert_child(parent, index, child)
    }

    /// Insert `child` at `index` (clamped) in `parent`'s children.
    pub fn insert_child(
        &mut self,
        parent: NodeId,
        index: usize,
        child: NodeId,
    ) -> PipelineResult<StartReport> {
        self.check_attachable(parent, child)?;
        let node = self.get_mut(parent)?;
        let index = index.min(node.children.len());
        node.children.insert(index, child);
        self.get_mut(child)?.parent = parent;
        self.handle_children(parent, &[], &[child])
    }

    /// Remove `child` from `parent`. The child is stopped and left detached,
    /// also when its stop fails.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> PipelineResult<()> {
        let node = self.get_mut(parent)?;
        let pos = node
            .children
            .iter()
            .position(|&c| c == child)
            .ok_or(PipelineError::NotAChild(child, parent))?;
        node.children.remove(pos);
        self.handle_children(parent, &[child], &[])?;
        Ok(())
    }

    /// Replace `parent`'s children wholesale.
    ///
    /// Children missing from `children` are removed, new ones added; kept
    /// children are untouched apart from their new position.
    pub fn set_children(
        &mut self,
        parent: NodeId,
        children: Vec<NodeId>,
    ) -> PipelineResult<StartReport> {
        let old = self.get(parent)?.children.clone();

        let mut seen = HashSet::new();
        for &child in &children {
            if !seen.insert(child) {
                return Err(PipelineError::InvalidChild {
                    parent,
                    child,
                    category: self.get(child)?.category(),
                });
            }
            if !old.contains(&child) {
                self.check_attachable(parent, child)?;
            }
        }

        let removed: Vec<NodeId> = old.iter().copied().filter(|c| !children.contains(c)).collect();
        let added: Vec<NodeId> = children.iter().copied().filter(|c| !old.contains(c)).collect();

        self.get_mut(parent)?.children = children;
        for &child in &added {
            self.get_mut(child)?.parent = parent;
        }
        self.handle_children(parent, &removed, &added)
    }

    fn check_attachable(&self, parent: NodeId, child: NodeId) -> PipelineResult<()> {
        let parent_node = self.get(parent)?;
        let child_node = self.get(child)?;
        let category = child_node.category();
        if child_node.parent.is_valid() {
            return Err(PipelineError::AlreadyAttached(child));
        }
        if !parent_node.category().has_children()
            || category == NodeCategory::Scene
            || self.is_ancestor(child, parent)
        {
            return Err(PipelineError::InvalidChild {
                parent,
                child,
                category,
            });
        }
        Ok(())
    }

    /// Structural-change hook.
    fn handle_children(
        &mut self,
        parent: NodeId,
        removed: &[NodeId],
        added: &[NodeId],
    ) -> PipelineResult<StartReport> {
        // Detach first; a failed stop still leaves the child detached.
        let mut stop_error = None;
        for &child in removed {
            let node = self.get_mut(child)?;
            node.parent = NodeId::INVALID;
            match &mut node.kind {
                NodeKind::Filter(f) => f.inputs.retain(|&input| input != parent),
                NodeKind::ModuleManager(mm) if mm.source == parent => mm.source = NodeId::INVALID,
                _ => {}
            }
            if let Err(err) = self.stop(child) {
                tracing::error!("Failed to stop removed {:?}: {}", child, err);
                stop_error.get_or_insert(err);
            }
            tracing::info!("Removed {:?} from {:?}", child, parent);
            self.events.emit(PipelineEvent::ChildRemoved { parent, child });
        }

        let (scene, running) = {
            let node = self.get(parent)?;
            (node.scene, node.running)
        };

        let mut report = StartReport::default();
        for &child in added {
            self.set_scene(child, scene)?;
            match &mut self.get_mut(child)?.kind {
                NodeKind::ModuleManager(mm) => mm.source = parent,
                NodeKind::Filter(f) => {
                    if !f.inputs.contains(&parent) {
                        f.inputs.push(parent);
                    }
                }
                _ => {}
            }
            tracing::info!("Added {:?} to {:?}", child, parent);
            self.events.emit(PipelineEvent::ChildAdded { parent, child });

            if running {
                self.start_child(child, &mut report);
            }
        }

        match stop_error {
            Some(err) => Err(err),
            None => Ok(report),
        }
    }

    /// Scene-change hook: set the scene of `id` and all of its descendants.
    ///
    /// Scenes keep referring to themselves.
    pub fn set_scene(&mut self, id: NodeId, scene: NodeId) -> PipelineResult<()> {
        let node = self.get_mut(id)?;
        if matches!(node.kind, NodeKind::Scene) || node.scene == scene {
            return Ok(());
        }
        node.scene = scene;
        let children = node.children.clone();
        for child in children {
            self.set_scene(child, scene)?;
        }
        Ok(())
    }

    /// Drop a detached subtree, stopping it first and releasing dataset observers.
    pub fn discard(&mut self, id: NodeId) -> PipelineResult<()> {
        if self.get(id)?.parent.is_valid() {
            return Err(PipelineError::AlreadyAttached(id));
        }
        self.stop(id)?;

        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(mut node) = self.nodes.get_mut(current.index()).and_then(Option::take) else {
                continue;
            };
            stack.extend(node.children.iter().copied());
            if let Some(state) = node.data_source_mut() {
                if let (Some(token), Some(data)) = (state.observer.take(), state.data.as_deref_mut()) {
                    data.remove_observer(token);
                }
            }
        }
        tracing::info!("Discarded subtree {:?}", id);
        Ok(())
    }

    // ── Drop target ──

    /// Whether a tree editor may drop `candidate` onto `target`: only
    /// filters and module managers, onto sources and filters.
    pub fn can_accept_drop(&self, target: NodeId, candidate: DropCandidate) -> bool {
        let Some(target) = self.node(target) else {
            return false;
        };
        if !matches!(
            target.category(),
            NodeCategory::Source | NodeCategory::DataSource | NodeCategory::Filter
        ) {
            return false;
        }
        let category = match candidate {
            DropCandidate::Category(category) => Some(category),
            DropCandidate::Node(id) => self.category_of(id),
        };
        category.is_some_and(|c| c.is_droppable())
    }

    /// The droppable version of `dropped`, if it can be dropped at all.
    pub fn coerce_dropped_object(&self, target: NodeId, dropped: NodeId) -> Option<NodeId> {
        self.can_accept_drop(target, DropCandidate::Node(dropped))
            .then_some(dropped)
    }

    // ── Lifecycle ──

    /// Start `id` and its subtree. No-op if already running.
    ///
    /// A data source refreshes its attributes first. Children that fail to
    /// start are logged and collected in the report; only this node's own
    /// failure is returned as an error.
    pub fn start(&mut self, id: NodeId) -> PipelineResult<StartReport> {
        let (running, category) = {
            let node = self.get(id)?;
            (node.running, node.category())
        };
        if running {
            return Ok(StartReport::default());
        }

        if category == NodeCategory::DataSource {
            self.refresh_data(id)?;
        }
        if let Some(component) = self.component_mut(id) {
            component.on_start()?;
        }

        let mut report = StartReport::default();
        let children = self.get(id)?.children.clone();
        for child in children {
            self.start_child(child, &mut report);
        }

        let node = self.get_mut(id)?;
        node.running = true;
        tracing::info!("Started {:?} '{}'", id, node.name);
        report.started.push(id);
        self.events.emit(PipelineEvent::Started(id));
        Ok(report)
    }

    fn start_child(&mut self, child: NodeId, report: &mut StartReport) {
        match self.start(child) {
            Ok(child_report) => report.merge(child_report),
            Err(err) => {
                let name = self.node(child).map(|n| n.name.clone()).unwrap_or_default();
                tracing::error!("Failed to start {:?} '{}': {}", child, name, err);
                self.events.emit(PipelineEvent::StartFailed {
                    node: child,
                    message: err.to_string(),
                });
                report.failures.push((child, err));
            }
        }
    }

    /// Stop `id` and its subtree. No-op if not running; child failures propagate.
    pub fn stop(&mut self, id: NodeId) -> PipelineResult<()> {
        if !self.get(id)?.running {
            return Ok(());
        }

        let children = self.get(id)?.children.clone();
        for child in children {
            self.stop(child)?;
        }
        if let Some(component) = self.component_mut(id) {
            component.on_stop()?;
        }

        let node = self.get_mut(id)?;
        node.running = false;
        tracing::info!("Stopped {:?} '{}'", id, node.name);
        self.events.emit(PipelineEvent::Stopped(id));
        Ok(())
    }

    // ── Data changes ──

    /// Fire `data_changed` on `id` and notify its direct consumers.
    pub fn fire_data_changed(&mut self, id: NodeId) -> PipelineResult<()> {
        let node = self.get_mut(id)?;
        node.data_changed_count += 1;
        let output = node.outputs.first().cloned();
        let children = node.children.clone();
        self.events.emit(PipelineEvent::DataChanged(id));

        let mut consumers = Vec::new();
        for child in children {
            match self.category_of(child) {
                Some(NodeCategory::Filter) => consumers.push(child),
                Some(NodeCategory::ModuleManager) => {
                    consumers.extend(self.get(child)?.children.iter().copied());
                }
                _ => {}
            }
        }
        for consumer in consumers {
            if let Some(component) = self.component_mut(consumer) {
                component.on_input_changed(output.as_ref());
            }
        }
        Ok(())
    }

    /// Replace the outputs of a node and fire `data_changed`.
    pub fn set_outputs(&mut self, id: NodeId, outputs: Vec<DataOutput>) -> PipelineResult<()> {
        self.get_mut(id)?.outputs = outputs;
        self.fire_data_changed(id)
    }

    // ── Data sources ──

    pub fn data_source(&self, id: NodeId) -> PipelineResult<&DataSourceState> {
        self.get(id)?
            .data_source()
            .ok_or(PipelineError::NotADataSource(id))
    }

    fn data_source_mut(&mut self, id: NodeId) -> PipelineResult<&mut DataSourceState> {
        self.get_mut(id)?
            .data_source_mut()
            .ok_or(PipelineError::NotADataSource(id))
    }

    pub fn dataset(&self, id: NodeId) -> Option<&dyn Dataset> {
        self.node(id)?.data_source()?.dataset()
    }

    /// Mutable access for in-place edits. Follow up with [`Pipeline::update`].
    pub fn dataset_mut(&mut self, id: NodeId) -> Option<&mut (dyn Dataset + 'static)> {
        self.nodes
            .get_mut(id.index())?
            .as_mut()?
            .data_source_mut()?
            .data
            .as_deref_mut()
    }

    /// Dataset replacement hook. Returns the previous dataset, already
    /// unsubscribed.
    pub fn set_data(
        &mut self,
        id: NodeId,
        data: Box<dyn Dataset>,
    ) -> PipelineResult<Option<Box<dyn Dataset>>> {
        let state = self.data_source_mut(id)?;
        let mut old = state.data.replace(data);
        // The token belongs to `old` and must not outlive it on the node.
        let old_token = state.observer.take();
        state.assigner.set_input(state.data.as_deref());

        self.refresh_data(id)?;
        self.publish_output(id)?;
        self.fire_data_changed(id)?;

        let tx = self.modified_tx.clone();
        let state = self.data_source_mut(id)?;
        if let (Some(token), Some(old)) = (old_token, old.as_deref_mut()) {
            old.remove_observer(token);
        }
        if let Some(data) = state.data.as_deref_mut() {
            let token = data.add_observer(Box::new(move || {
                let _ = tx.send(id);
            }));
            state.observer = Some(token);
        }

        let node = self.get_mut(id)?;
        node.name = display_name(node.data_source().and_then(|s| s.dataset()), &node.name);
        tracing::info!("Dataset of {:?} replaced, now '{}'", id, node.name);
        Ok(old)
    }

    /// Attribute discovery plus `data_changed`, if there is a dataset.
    fn refresh_data(&mut self, id: NodeId) -> PipelineResult<()> {
        if self.data_source_mut(id)?.refresh()? {
            self.publish_output(id)?;
            self.fire_data_changed(id)?;
        }
        Ok(())
    }

    fn publish_output(&mut self, id: NodeId) -> PipelineResult<()> {
        let node = self.get_mut(id)?;
        let output = node.data_source().and_then(|s| s.output()).cloned();
        node.outputs = output.into_iter().collect();
        Ok(())
    }

    /// Flush in-place dataset changes: marks the dataset modified, then
    /// dispatches the resulting notification.
    pub fn update(&mut self, id: NodeId) -> PipelineResult<()> {
        self.data_source_mut(id)?
            .data
            .as_deref_mut()
            .ok_or(PipelineError::NoDataset(id))?
            .modified();
        self.dispatch_pending()?;
        Ok(())
    }

    /// Deliver queued dataset modification notifications. Returns how many
    /// turned into `data_changed`.
    pub fn dispatch_pending(&mut self) -> PipelineResult<usize> {
        let mut fired = 0;
        while let Ok(id) = self.modified_rx.try_recv() {
            let live = match self
                .nodes
                .get_mut(id.index())
                .and_then(Option::as_mut)
                .and_then(PipelineNode::data_source_mut)
            {
                Some(state) if state.observer.is_some() => match state.data.as_deref() {
                    Some(data) => {
                        state.assigner.refresh_input(data);
                        true
                    }
                    None => false,
                },
                _ => false,
            };
            if !live {
                tracing::warn!("Ignoring modification event for {:?}", id);
                continue;
            }
            self.publish_output(id)?;
            self.fire_data_changed(id)?;
            fired += 1;
        }
        Ok(fired)
    }

    pub fn selector(
        &self,
        id: NodeId,
        role: AttributeRole,
        kind: AttributeKind,
    ) -> PipelineResult<&str> {
        Ok(self.data_source(id)?.selector(role, kind))
    }

    /// Selector change hook: activate `name` (or deactivate with `""`).
    pub fn set_selector(
        &mut self,
        id: NodeId,
        role: AttributeRole,
        kind: AttributeKind,
        name: &str,
    ) -> PipelineResult<()> {
        self.data_source_mut(id)?
            .apply_selection(id, role, kind, name)?;
        tracing::debug!("{:?} {} {} set to '{}'", id, role, kind, name);
        self.publish_output(id)?;
        self.fire_data_changed(id)
    }

    // ── Presentation ──

    /// Indented outline of the subtree under `id`.
    pub fn render_tree(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.render_into(id, 0, &mut out);
        out
    }

    fn render_into(&self, id: NodeId, depth: usize, out: &mut String) {
        let Some(node) = self.node(id) else {
            return;
        };
        let state = if node.running { "running" } else { "stopped" };
        out.push_str(&format!(
            "{}{} [{}] ({})\n",
            "  ".repeat(depth),
            node.name,
            node.category(),
            state
        ));
        for &child in &node.children {
            self.render_into(child, depth + 1, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{ArrayInfo, MemoryDataset, Observer, ObserverToken};
    use crate::pipeline::node::OpaqueComponent;
    use mockall::mock;
    use proptest::prelude::*;
    use serde_json::Value;
    use std::any::Any;

    mock! {
        pub Hooks {
            fn on_start(&self) -> PipelineResult<()>;
            fn on_stop(&self) -> PipelineResult<()>;
        }
    }

    struct Mocked(MockHooks);

    impl Component for Mocked {
        fn type_name(&self) -> &str {
            "Mocked"
        }

        fn on_start(&mut self) -> PipelineResult<()> {
            self.0.on_start()
        }

        fn on_stop(&mut self) -> PipelineResult<()> {
            self.0.on_stop()
        }
    }

    fn plain() -> Box<dyn Component> {
        Box::new(OpaqueComponent::new("Plain", Value::Null))
    }

    fn failing_start() -> Box<dyn Component> {
        let mut hooks = MockHooks::new();
        hooks
            .expect_on_start()
            .returning(|| Err(PipelineError::component("Mocked", "no renderer")));
        hooks.expect_on_stop().never();
        Box::new(Mocked(hooks))
    }

    fn scene_with_source(p: &mut Pipeline) -> (NodeId, NodeId) {
        let scene = p.create_scene("scene");
        let source = p.create_source("source");
        p.add_child(scene, source).unwrap();
        (scene, source)
    }

    #[test]
    fn test_filter_lifecycle_scenario() {
        let mut p = Pipeline::new();
        let s = p.create_source("S");
        let f = p.create_filter("F", plain());

        p.add_child(s, f).unwrap();
        assert_eq!(p.get(s).unwrap().children(), &[f]);
        assert!(!p.get(f).unwrap().is_running());
        assert_eq!(p.get(f).unwrap().inputs(), &[s]);

        p.start(s).unwrap();
        assert!(p.get(f).unwrap().is_running());

        p.remove_child(s, f).unwrap();
        assert!(!p.get(f).unwrap().is_running());
        assert!(p.get(s).unwrap().children().is_empty());
        assert_eq!(p.get(f).unwrap().parent(), None);
        assert!(p.get(f).unwrap().inputs().is_empty());
    }

    #[test]
    fn test_add_module_groups_under_one_manager() {
        let mut p = Pipeline::new();
        let (_, s) = scene_with_source(&mut p);
        let modules: Vec<_> = (0..3)
            .map(|i| p.create_module(format!("m{}", i), plain()))
            .collect();
        for &m in &modules {
            p.add_module(s, m).unwrap();
        }

        let managers = p.module_managers(s);
        assert_eq!(managers.len(), 1);
        assert_eq!(p.get(managers[0]).unwrap().children(), modules.as_slice());
        assert_eq!(p.get(managers[0]).unwrap().source(), Some(s));
    }

    #[test]
    fn test_add_module_uses_last_manager() {
        let mut p = Pipeline::new();
        let s = p.create_source("S");
        let first = p.create_module_manager();
        let second = p.create_module_manager();
        p.add_child(s, first).unwrap();
        p.add_child(s, second).unwrap();

        let m = p.create_module("m", plain());
        p.add_module(s, m).unwrap();
        assert!(p.get(first).unwrap().children().is_empty());
        assert_eq!(p.get(second).unwrap().children(), &[m]);
    }

    #[test]
    fn test_add_module_on_running_source_starts_manager() {
        let mut p = Pipeline::new();
        let (scene, s) = scene_with_source(&mut p);
        p.start(scene).unwrap();

        let m = p.create_module("m", plain());
        let report = p.add_child(s, m).unwrap();
        assert!(report.is_clean());

        let manager = p.module_managers(s)[0];
        assert!(p.get(manager).unwrap().is_running());
        assert!(p.get(m).unwrap().is_running());
        assert_eq!(p.get(m).unwrap().scene(), Some(scene));
        assert_eq!(p.get(manager).unwrap().scene(), Some(scene));
    }

    #[test]
    fn test_failing_child_does_not_block_siblings() {
        let mut p = Pipeline::new();
        let s = p.create_source("S");
        let bad = p.create_filter("bad", failing_start());
        let good = p.create_filter("good", plain());
        p.add_child(s, bad).unwrap();
        p.add_child(s, good).unwrap();

        let report = p.start(s).unwrap();
        assert_eq!(report.failed_nodes(), vec![bad]);
        assert!(report.started.contains(&good));
        assert!(report.started.contains(&s));
        assert!(p.get(s).unwrap().is_running());
        assert!(p.get(good).unwrap().is_running());
        assert!(!p.get(bad).unwrap().is_running());
    }

    #[test]
    fn test_failing_addition_is_reported_not_raised() {
        let mut p = Pipeline::new();
        let s = p.create_source("S");
        p.start(s).unwrap();
        let bad = p.create_filter("bad", failing_start());
        let report = p.add_child(s, bad).unwrap();
        assert_eq!(report.failed_nodes(), vec![bad]);
        assert_eq!(p.get(s).unwrap().children(), &[bad]);
    }

    #[test]
    fn test_stop_failure_propagates() {
        let mut hooks = MockHooks::new();
        hooks.expect_on_start().times(1).returning(|| Ok(()));
        hooks
            .expect_on_stop()
            .times(1)
            .returning(|| Err(PipelineError::component("Mocked", "stuck")));

        let mut p = Pipeline::new();
        let s = p.create_source("S");
        let f = p.create_filter("F", Box::new(Mocked(hooks)));
        p.add_child(s, f).unwrap();
        p.start(s).unwrap();

        assert!(p.stop(s).is_err());
        assert!(p.get(s).unwrap().is_running());
    }

    #[test]
    fn test_start_and_stop_call_hooks_once() {
        let mut hooks = MockHooks::new();
        hooks.expect_on_start().times(1).returning(|| Ok(()));
        hooks.expect_on_stop().times(1).returning(|| Ok(()));

        let mut p = Pipeline::new();
        let s = p.create_source("S");
        let f = p.create_filter("F", Box::new(Mocked(hooks)));
        p.add_child(s, f).unwrap();

        p.start(s).unwrap();
        p.start(s).unwrap();
        p.stop(s).unwrap();
        p.stop(s).unwrap();
    }

    #[test]
    fn test_same_category_source_goes_to_scene() {
        let mut p = Pipeline::new();
        let (scene, s) = scene_with_source(&mut p);
        let other = p.create_source("other");
        p.add_child(s, other).unwrap();

        assert!(p.get(s).unwrap().children().is_empty());
        assert_eq!(p.get(scene).unwrap().children(), &[s, other]);
        assert_eq!(p.get(other).unwrap().parent(), Some(scene));
    }

    #[test]
    fn test_data_source_under_plain_source_goes_to_scene() {
        let mut p = Pipeline::new();
        let (scene, s) = scene_with_source(&mut p);
        let ds = p.create_data_source(None).unwrap();
        p.add_child(s, ds).unwrap();
        assert_eq!(p.get(ds).unwrap().parent(), Some(scene));
    }

    #[test]
    fn test_plain_source_under_data_source_is_appended() {
        let mut p = Pipeline::new();
        let ds = p.create_data_source(None).unwrap();
        let s = p.create_source("s");
        p.add_child(ds, s).unwrap();
        assert_eq!(p.get(ds).unwrap().children(), &[s]);
    }

    #[test]
    fn test_forward_without_scene_fails() {
        let mut p = Pipeline::new();
        let a = p.create_source("a");
        let b = p.create_source("b");
        assert!(matches!(p.add_child(a, b), Err(PipelineError::NoScene(id)) if id == a));
    }

    #[test]
    fn test_attach_rules() {
        let mut p = Pipeline::new();
        let s = p.create_source("S");
        let f = p.create_filter("F", plain());
        p.add_child(s, f).unwrap();

        // Already attached.
        let s2 = p.create_source("S2");
        assert!(matches!(p.append_child(s2, f), Err(PipelineError::AlreadyAttached(_))));

        // An ancestor cannot become a descendant.
        assert!(matches!(
            p.append_child(f, s),
            Err(PipelineError::InvalidChild { .. })
        ));

        // Modules have no children, scenes are never children.
        let m = p.create_module("m", plain());
        let f2 = p.create_filter("F2", plain());
        assert!(p.append_child(m, f2).is_err());
        let scene = p.create_scene("scene");
        assert!(p.append_child(s2, scene).is_err());
    }

    #[test]
    fn test_scene_change_propagates() {
        let mut p = Pipeline::new();
        let s = p.create_source("S");
        let f = p.create_filter("F", plain());
        let m = p.create_module("m", plain());
        p.add_child(s, f).unwrap();
        p.add_child(f, m).unwrap();
        let manager = p.module_managers(f)[0];

        let scene = p.create_scene("scene");
        p.add_child(scene, s).unwrap();
        for id in [s, f, manager, m] {
            assert_eq!(p.get(id).unwrap().scene(), Some(scene));
        }
    }

    #[test]
    fn test_set_children_diffs_old_and_new() {
        let mut p = Pipeline::new();
        let s = p.create_source("S");
        let a = p.create_filter("a", plain());
        let b = p.create_filter("b", plain());
        let c = p.create_filter("c", plain());
        p.add_child(s, a).unwrap();
        p.add_child(s, b).unwrap();
        p.start(s).unwrap();

        p.set_children(s, vec![c, a]).unwrap();
        assert_eq!(p.get(s).unwrap().children(), &[c, a]);
        assert!(!p.get(b).unwrap().is_running());
        assert_eq!(p.get(b).unwrap().parent(), None);
        assert!(p.get(c).unwrap().is_running());
        assert!(p.get(a).unwrap().is_running());

        assert!(p.set_children(s, vec![a, a]).is_err());
    }

    #[test]
    fn test_drop_target_queries() {
        let mut p = Pipeline::new();
        let s = p.create_source("S");
        let f = p.create_filter("F", plain());
        let mm = p.create_module_manager();
        let m = p.create_module("m", plain());

        assert!(p.can_accept_drop(s, DropCandidate::Category(NodeCategory::Filter)));
        assert!(p.can_accept_drop(s, DropCandidate::Category(NodeCategory::ModuleManager)));
        assert!(!p.can_accept_drop(s, DropCandidate::Category(NodeCategory::Module)));
        assert!(!p.can_accept_drop(s, DropCandidate::Category(NodeCategory::Source)));
        assert!(p.can_accept_drop(s, DropCandidate::Node(f)));
        assert!(!p.can_accept_drop(s, DropCandidate::Node(m)));

        assert_eq!(p.coerce_dropped_object(s, mm), Some(mm));
        assert_eq!(p.coerce_dropped_object(s, m), None);
    }

    #[test]
    fn test_events_are_broadcast() {
        let mut p = Pipeline::new();
        let rx = p.subscribe();
        let s = p.create_source("S");
        let f = p.create_filter("F", plain());
        p.add_child(s, f).unwrap();
        p.start(s).unwrap();

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![
                PipelineEvent::ChildAdded { parent: s, child: f },
                PipelineEvent::Started(f),
                PipelineEvent::Started(s),
            ]
        );
    }

    /// Dataset whose native `set_active` always fails.
    struct Refusing(MemoryDataset);

    impl Dataset for Refusing {
        fn type_name(&self) -> &str {
            self.0.type_name()
        }
        fn arrays(&self, role: AttributeRole) -> Vec<ArrayInfo> {
            self.0.arrays(role)
        }
        fn active(&self, role: AttributeRole, kind: AttributeKind) -> Option<&str> {
            self.0.active(role, kind)
        }
        fn set_active(&mut self, _: AttributeRole, _: AttributeKind, _: Option<&str>) -> PipelineResult<()> {
            Err(PipelineError::component("Refusing", "read-only"))
        }
        fn add_observer(&mut self, observer: Observer) -> ObserverToken {
            self.0.add_observer(observer)
        }
        fn remove_observer(&mut self, token: ObserverToken) -> bool {
            self.0.remove_observer(token)
        }
        fn observer_count(&self) -> usize {
            self.0.observer_count()
        }
        fn modified(&mut self) {
            self.0.modified()
        }
        fn write(&self) -> PipelineResult<Vec<u8>> {
            self.0.write()
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    #[test]
    fn test_failed_replacement_forgets_old_observer() {
        let mut p = Pipeline::new();
        let ds = p
            .create_data_source(Some(Box::new(MemoryDataset::new("PolyData"))))
            .unwrap();
        assert!(p.data_source(ds).unwrap().observer().is_some());

        let mut refusing = Refusing(
            MemoryDataset::new("ImageData").with_array(AttributeRole::Point, "density", 1, vec![1.0]),
        );
        refusing.add_observer(Box::new(|| {}));
        assert!(p.set_data(ds, Box::new(refusing)).is_err());
        assert!(p.data_source(ds).unwrap().observer().is_none());

        // The next replacement leaves the outside subscription alone.
        let old = p
            .set_data(ds, Box::new(MemoryDataset::new("PolyData")))
            .unwrap()
            .unwrap();
        assert_eq!(old.observer_count(), 1);
        assert!(p.data_source(ds).unwrap().observer().is_some());
    }

    #[test]
    fn test_discard_releases_observers() {
        let mut p = Pipeline::new();
        let s = p.create_source("S");
        let ds = p
            .create_data_source(Some(Box::new(MemoryDataset::new("PolyData"))))
            .unwrap();
        let f = p.create_filter("F", plain());
        p.add_child(ds, f).unwrap();

        assert!(p.discard(f).is_err());
        p.discard(ds).unwrap();
        assert!(!p.contains(ds));
        assert!(!p.contains(f));
        assert!(p.contains(s));
    }

    #[test]
    fn test_render_tree() {
        let mut p = Pipeline::new();
        let (scene, s) = scene_with_source(&mut p);
        let f = p.create_filter("clip", plain());
        p.add_child(s, f).unwrap();
        p.start(scene).unwrap();

        assert_eq!(
            p.render_tree(scene),
            "scene [Scene] (running)\n  source [Source] (running)\n    clip [Filter] (running)\n"
        );
    }

    proptest! {
        #[test]
        fn test_start_stop_idempotent(ops in prop::collection::vec(any::<bool>(), 1..20)) {
            let mut p = Pipeline::new();
            let s = p.create_source("S");
            let f = p.create_filter("F", plain());
            let m = p.create_module("m", plain());
            p.add_child(s, f).unwrap();
            p.add_module(f, m).unwrap();

            for start in ops.iter().copied() {
                let before: Vec<bool> = [s, f, m].iter().map(|&id| p.get(id).unwrap().is_running()).collect();
                if start {
                    p.start(s).unwrap();
                    p.start(s).unwrap();
                } else {
                    p.stop(s).unwrap();
                    p.stop(s).unwrap();
                }
                let after: Vec<bool> = [s, f, m].iter().map(|&id| p.get(id).unwrap().is_running()).collect();
                prop_assert!(after.iter().all(|&r| r == start));
                if before.iter().all(|&r| r == start) {
                    prop_assert_eq!(before, after);
                }
            }
        }

        #[test]
        fn test_children_follow_running_parent(
            kinds in prop::collection::vec(0u8..3, 1..15),
            running in any::<bool>(),
        ) {
            let mut p = Pipeline::new();
            let scene = p.create_scene("scene");
            let s = p.create_source("S");
            p.add_child(scene, s).unwrap();
            if running {
                p.start(scene).unwrap();
            }

            let mut modules = Vec::new();
            for kind in kinds {
                match kind {
                    0 => {
                        let f = p.create_filter("f", plain());
                        p.add_child(s, f).unwrap();
                    }
                    1 => {
                        let m = p.create_module("m", plain());
                        p.add_child(s, m).unwrap();
                        modules.push(m);
                    }
                    _ => {
                        let m = p.create_module("m", plain());
                        p.add_module(s, m).unwrap();
                        modules.push(m);
                    }
                }
            }

            for node in p.iter().filter(|n| n.id() != scene) {
                prop_assert_eq!(node.is_running(), running);
            }
            let managers = p.module_managers(s);
            if modules.is_empty() {
                prop_assert!(managers.is_empty());
            } else {
                prop_assert_eq!(managers.len(), 1);
                prop_assert_eq!(p.get(managers[0]).unwrap().children(), modules.as_slice());
            }
        }
    }
}
