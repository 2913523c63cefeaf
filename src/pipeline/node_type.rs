//! Node category enumeration.
//!
//! The closed set of objects that can live in the pipeline tree. Routing in
//! `Pipeline::add_child` and the drop-target queries dispatch on this tag.

use serde::{Deserialize, Serialize};

/// Category of a pipeline node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeCategory {
    /// Top-level container for the sources of one visualization context.
    Scene,
    /// A plain data source.
    Source,
    /// A source that manages one dataset and its active attributes.
    DataSource,
    /// Consumes an upstream dataset and produces a transformed one.
    Filter,
    /// Groups modules under a single upstream source.
    ModuleManager,
    /// Terminal consumer: renders or analyzes data, produces no output.
    Module,
}

impl NodeCategory {
    /// Get the display name for this category.
    pub fn display_name(&self) -> &'static str {
        match self {
            NodeCategory::Scene => "Scene",
            NodeCategory::Source => "Source",
            NodeCategory::DataSource => "Data Source",
            NodeCategory::Filter => "Filter",
            NodeCategory::ModuleManager => "Module Manager",
            NodeCategory::Module => "Module",
        }
    }

    /// Get all categories.
    pub fn all() -> &'static [NodeCategory] {
        &[
            NodeCategory::Scene,
            NodeCategory::Source,
            NodeCategory::DataSource,
            NodeCategory::Filter,
            NodeCategory::ModuleManager,
            NodeCategory::Module,
        ]
    }

    /// Whether nodes of this category consume and re-emit data.
    pub fn is_filter(&self) -> bool {
        matches!(self, NodeCategory::Filter)
    }

    /// Whether nodes of this category are sources (plain or dataset-backed).
    pub fn is_source(&self) -> bool {
        matches!(self, NodeCategory::Source | NodeCategory::DataSource)
    }

    /// Whether nodes of this category hold an ordered child list.
    pub fn has_children(&self) -> bool {
        !matches!(self, NodeCategory::Module)
    }

    /// True if a child of category `child` belongs next to a parent of this
    /// category rather than under it.
    ///
    /// A plain source treats every source as a sibling; a data source only
    /// treats other data sources that way.
    pub fn is_sibling_category(&self, child: NodeCategory) -> bool {
        match self {
            NodeCategory::Source => child.is_source(),
            NodeCategory::DataSource => child == NodeCategory::DataSource,
            _ => false,
        }
    }

    /// Whether a tree editor may drop an object of this category onto a source.
    pub fn is_droppable(&self) -> bool {
        matches!(self, NodeCategory::Filter | NodeCategory::ModuleManager)
    }

    /// Get a detailed description of what this category does.
    pub fn description(&self) -> &'static str {
        match self {
            NodeCategory::Scene =>
                "Top-level container of a visualization context.\n\
                 Owns the root sources and starts them with the scene.",

            NodeCategory::Source =>
                "Produces data for downstream nodes.\n\
                 Children receive its output.",

            NodeCategory::DataSource =>
                "Manages a single dataset.\n\
                 Publishes active scalars, vectors and tensors\n\
                 for point and cell data.",

            NodeCategory::Filter =>
                "Transforms the data of its upstream source.\n\
                 Registered as a consumer of its parent.",

            NodeCategory::ModuleManager =>
                "Groups modules attached to one source.\n\
                 Created on demand by add_module.",

            NodeCategory::Module =>
                "Renders or analyzes data.\n\
                 Terminal node without pipeline output.",
        }
    }
}

impl std::fmt::Display for NodeCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
