//! Visualization pipeline tree.
//!
//! Scenes own sources, sources own filters and module managers, module
//! managers own modules. Data flows from a source to its consumers; starting
//! a node starts its subtree.
//!
//! # Architecture
//!
//! ```text
//! [Scene] ──► [DataSource] ──► [Filter] ──► [ModuleManager] ──► [Module]
//!                         └──► [ModuleManager] ──► [Module]
//! ```
//!
//! # Design
//!
//! - **Arena** — nodes live in one `Vec` indexed by `NodeId`; back-references
//!   are IDs, never owning pointers.
//! - **Closed variants** — `NodeKind` enum; filter and module behaviour plugs
//!   in through the `Component` trait.
//! - **One structural hook** — every child-list edit runs the same attach /
//!   detach / start logic.
//! - **Channels** — dataset observers and event subscribers talk through
//!   crossbeam channels, so no callback holds a reference into the tree.

pub mod assigner;
pub mod data_source;
pub mod error;
pub mod events;
pub mod factory;
pub mod id;
pub mod node;
pub mod node_type;
pub mod tree;

pub use assigner::{AttributeAssigner, DataOutput};
pub use data_source::{display_name, DataSourceState, HIDDEN_MARKER};
pub use error::{PipelineError, PipelineResult};
pub use events::{EventBus, PipelineEvent};
pub use factory::{ComponentConstructor, ComponentFactory};
pub use id::NodeId;
pub use node::{
    Component, FilterNode, ModuleManagerNode, ModuleNode, NodeKind, OpaqueComponent, PipelineNode,
};
pub use node_type::NodeCategory;
pub use tree::{DropCandidate, Pipeline, StartReport};
