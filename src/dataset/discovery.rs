//! Attribute discovery: which arrays can serve as scalars, vectors or tensors.
//!
//! Arrays are classified by component count (1 = scalars, 3 = vectors,
//! 4 or 9 = tensors). Unnamed arrays are never candidates.

use super::{AttributeKind, AttributeRole, AttributeSlots, Dataset};

/// Candidate array names for one `(role, kind)` pair, in table order.
pub fn candidate_names(
    dataset: &dyn Dataset,
    role: AttributeRole,
    kind: AttributeKind,
) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for array in dataset.arrays(role) {
        if array.name.is_empty() || !kind.accepts(array.components) {
            continue;
        }
        if !names.contains(&array.name) {
            names.push(array.name);
        }
    }
    names
}

/// Candidates for all six `(role, kind)` pairs.
pub fn discover(dataset: &dyn Dataset) -> AttributeSlots<Vec<String>> {
    let mut slots = AttributeSlots::default();
    for role in AttributeRole::ALL {
        for kind in AttributeKind::ALL {
            slots.set(role, kind, candidate_names(dataset, role, kind));
        }
    }
    slots
}
