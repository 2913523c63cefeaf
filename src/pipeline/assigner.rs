//! Attribute assignment stage.
//!
//! Sits between a data source's dataset and downstream consumers. It takes a
//! snapshot of its input, applies "make array X the active scalars/vectors/
//! tensors of the point/cell data" requests, and on `update()` publishes a
//! [`DataOutput`] describing what consumers will see.

use crate::dataset::{ArrayInfo, AttributeKind, AttributeRole, AttributeSlots, Dataset};
use crate::pipeline::error::{PipelineError, PipelineResult};

/// What a source publishes to its consumers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DataOutput {
    pub type_name: String,
    pub point_arrays: Vec<ArrayInfo>,
    pub cell_arrays: Vec<ArrayInfo>,
    pub active: AttributeSlots<Option<String>>,
}

impl DataOutput {
    pub fn arrays(&self, role: AttributeRole) -> &[ArrayInfo] {
        match role {
            AttributeRole::Point => &self.point_arrays,
            AttributeRole::Cell => &self.cell_arrays,
        }
    }

    pub fn active(&self, role: AttributeRole, kind: AttributeKind) -> Option<&str> {
        self.active.get(role, kind).as_deref()
    }

    fn has_array(&self, role: AttributeRole, name: &str) -> bool {
        self.arrays(role).iter().any(|a| a.name == name)
    }
}

/// What the assigner does with one `(role, kind)` slot of its input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
enum Assignment {
    /// Pass the input's own designation through.
    #[default]
    Inherit,
    Active(String),
    /// No active array, whatever the input says.
    Deactivated,
}

/// Stateful wrapper around the "assign active attribute" operation.
#[derive(Debug, Default)]
pub struct AttributeAssigner {
    /// Snapshot of the input taken by `set_input`.
    input: Option<DataOutput>,
    /// Assignments made since the input was set.
    assigned: AttributeSlots<Assignment>,
    output: Option<DataOutput>,
}

impl AttributeAssigner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the input. Pending assignments are discarded.
    pub fn set_input(&mut self, input: Option<&dyn Dataset>) {
        self.input = input.map(snapshot);
        self.assigned = AttributeSlots::default();
        self.output = None;
    }

    /// Re-read the same input after an in-place modification, keeping the
    /// assignments that still name an existing array.
    pub fn refresh_input(&mut self, input: &dyn Dataset) {
        let snap = snapshot(input);
        for role in AttributeRole::ALL {
            for kind in AttributeKind::ALL {
                let slot = self.assigned.get_mut(role, kind);
                if matches!(slot, Assignment::Active(name) if !snap.has_array(role, name)) {
                    *slot = Assignment::Inherit;
                }
            }
        }
        self.input = Some(snap);
        self.update();
    }

    /// Mark `name` as the active `kind` of the `role` data.
    pub fn assign(
        &mut self,
        name: &str,
        kind: AttributeKind,
        role: AttributeRole,
    ) -> PipelineResult<()> {
        let input = self.input.as_ref().ok_or_else(|| {
            PipelineError::component("AttributeAssigner", "assign called without an input")
        })?;
        if !input.has_array(role, name) {
            return Err(PipelineError::UnknownArray {
                role,
                name: name.to_string(),
            });
        }
        self.assigned
            .set(role, kind, Assignment::Active(name.to_string()));
        Ok(())
    }

    /// Deactivate one slot. Overrides any designation the input carries.
    pub fn clear(&mut self, kind: AttributeKind, role: AttributeRole) {
        self.assigned.set(role, kind, Assignment::Deactivated);
    }

    /// Recompute the output from the input and the assignments.
    pub fn update(&mut self) {
        self.output = self.input.as_ref().map(|input| {
            let mut output = input.clone();
            for (role, kind, assignment) in self.assigned.iter() {
                match assignment {
                    Assignment::Inherit => {}
                    Assignment::Active(name) => output.active.set(role, kind, Some(name.clone())),
                    Assignment::Deactivated => output.active.set(role, kind, None),
                }
            }
            output
        });
    }

    pub fn output(&self) -> Option<&DataOutput> {
        self.output.as_ref()
    }
}

fn snapshot(dataset: &dyn Dataset) -> DataOutput {
    let mut active = AttributeSlots::default();
    for role in AttributeRole::ALL {
        for kind in AttributeKind::ALL {
            active.set(role, kind, dataset.active(role, kind).map(str::to_string));
        }
    }
    DataOutput {
        type_name: dataset.type_name().to_string(),
        point_arrays: dataset.arrays(AttributeRole::Point),
        cell_arrays: dataset.arrays(AttributeRole::Cell),
        active,
    }
}
