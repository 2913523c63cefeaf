//! Dataset-backed source state.
//!
//! A data source owns exactly one dataset and publishes six active-attribute
//! selectors, `{point, cell} x {scalars, vectors, tensors}`. Each selector is
//! either `""` (deactivated) or one of the candidates discovered on the
//! dataset.
//!
//! Two paths write selectors:
//! - the refresh pass ([`DataSourceState::refresh`]) synchronizes them from
//!   the dataset and never runs the user-facing change hook;
//! - [`DataSourceState::apply_selection`] is the change hook for a user edit.
//!
//! Event firing and output publication are done by `Pipeline`, which owns
//! the node.

use crate::dataset::{
    discover, AttributeKind, AttributeRole, AttributeSlots, Dataset, ObserverToken,
};
use crate::pipeline::assigner::{AttributeAssigner, DataOutput};
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::id::NodeId;

/// Marker kept across display-name recomputation.
pub const HIDDEN_MARKER: &str = "[Hidden]";

/// Name shown for a data source.
pub fn display_name(dataset: Option<&dyn Dataset>, previous: &str) -> String {
    let mut name = match dataset {
        Some(data) => format!("VTK Data ({})", data.type_name()),
        None => "VTK Data (uninitialized)".to_string(),
    };
    if previous.contains(HIDDEN_MARKER) {
        name.push(' ');
        name.push_str(HIDDEN_MARKER);
    }
    name
}

/// State of a dataset-backed source.
pub struct DataSourceState {
    pub(crate) data: Option<Box<dyn Dataset>>,
    selectors: AttributeSlots<String>,
    /// Candidate lists including the trailing `""` sentinel.
    candidates: AttributeSlots<Vec<String>>,
    pub(crate) assigner: AttributeAssigner,
    pub(crate) observer: Option<ObserverToken>,
    first_update: bool,
}

impl Default for DataSourceState {
    fn default() -> Self {
        Self::new()
    }
}

impl DataSourceState {
    pub fn new() -> Self {
        Self {
            data: None,
            selectors: AttributeSlots::default(),
            candidates: AttributeSlots::default(),
            assigner: AttributeAssigner::new(),
            observer: None,
            first_update: true,
        }
    }

    pub fn dataset(&self) -> Option<&dyn Dataset> {
        self.data.as_deref()
    }

    /// Current selector value; `""` means deactivated.
    pub fn selector(&self, role: AttributeRole, kind: AttributeKind) -> &str {
        self.selectors.get(role, kind)
    }

    pub fn selectors(&self) -> &AttributeSlots<String> {
        &self.selectors
    }

    /// Candidates of the last refresh, ending with the `""` sentinel.
    /// Empty before the first refresh.
    pub fn candidates(&self, role: AttributeRole, kind: AttributeKind) -> &[String] {
        self.candidates.get(role, kind)
    }

    /// True until the first refresh pass over a dataset completed.
    pub fn is_first_update(&self) -> bool {
        self.first_update
    }

    /// Token of the live modification subscription.
    pub fn observer(&self) -> Option<ObserverToken> {
        self.observer
    }

    pub fn output(&self) -> Option<&DataOutput> {
        self.assigner.output()
    }

    /// Attribute discovery and selector synchronization.
    ///
    /// Returns `Ok(false)` without touching anything when there is no
    /// dataset. Native and assigner failures propagate and may leave the
    /// pass half-applied.
    pub(crate) fn refresh(&mut self) -> PipelineResult<bool> {
        let Self {
            data,
            selectors,
            candidates,
            assigner,
            first_update,
            ..
        } = self;
        let Some(data) = data.as_deref_mut() else {
            return Ok(false);
        };

        let mut discovered = discover(data);
        for role in AttributeRole::ALL {
            for kind in AttributeKind::ALL {
                let mut values = std::mem::take(discovered.get_mut(role, kind));
                values.push(String::new());

                let current = selectors.get(role, kind);
                let selected = if values.len() > 1 {
                    let mut default = current.clone();
                    if !default.is_empty() && !values.contains(&default) {
                        tracing::debug!(
                            "{} {} '{}' no longer present, deactivating",
                            role,
                            kind,
                            default
                        );
                        default.clear();
                    }
                    if *first_update && default.is_empty() {
                        default = values[0].clone();
                    }

                    if default.is_empty() {
                        data.set_active(role, kind, None)?;
                        assigner.clear(kind, role);
                    } else {
                        data.set_active(role, kind, Some(&default))?;
                        assigner.assign(&default, kind, role)?;
                    }
                    assigner.update();
                    default
                } else {
                    String::new()
                };

                selectors.set(role, kind, selected);
                candidates.set(role, kind, values);
            }
        }

        *first_update = false;
        tracing::debug!(
            "Refreshed attributes of {} dataset",
            data.type_name()
        );
        Ok(true)
    }

    /// Change hook for a user edit of one selector.
    pub(crate) fn apply_selection(
        &mut self,
        node: NodeId,
        role: AttributeRole,
        kind: AttributeKind,
        name: &str,
    ) -> PipelineResult<()> {
        let data = self
            .data
            .as_deref_mut()
            .ok_or(PipelineError::NoDataset(node))?;

        if !name.is_empty() && !self.candidates.get(role, kind).iter().any(|c| c == name) {
            return Err(PipelineError::InvalidSelection {
                role,
                kind,
                name: name.to_string(),
            });
        }

        if name.is_empty() {
            data.set_active(role, kind, None)?;
            self.assigner.clear(kind, role);
        } else {
            data.set_active(role, kind, Some(name))?;
            self.assigner.assign(name, kind, role)?;
        }
        self.assigner.update();
        self.selectors.set(role, kind, name.to_string());
        Ok(())
    }
}
