//! Pipeline-specific error types.

use crate::dataset::{AttributeKind, AttributeRole};
use crate::pipeline::id::NodeId;
use crate::pipeline::node_type::NodeCategory;
use thiserror::Error;

/// Errors that can occur within the pipeline system.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Unknown node: {0:?}")]
    UnknownNode(NodeId),

    #[error("Node {child:?} ({category}) cannot be a child of {parent:?}")]
    InvalidChild {
        parent: NodeId,
        child: NodeId,
        category: NodeCategory,
    },

    #[error("Node {0:?} is already attached to a parent")]
    AlreadyAttached(NodeId),

    #[error("Node {0:?} is not a child of {1:?}")]
    NotAChild(NodeId, NodeId),

    #[error("Node {0:?} has no scene to forward to")]
    NoScene(NodeId),

    #[error("Node {0:?} is not a data source")]
    NotADataSource(NodeId),

    #[error("Node {0:?} has no dataset")]
    NoDataset(NodeId),

    #[error("Unknown {role} array '{name}'")]
    UnknownArray { role: AttributeRole, name: String },

    #[error("'{name}' is not a candidate for {role} {kind}")]
    InvalidSelection {
        role: AttributeRole,
        kind: AttributeKind,
        name: String,
    },

    #[error("Component '{component}' failed: {message}")]
    Component { component: String, message: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Compression error: {0}")]
    Compression(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Convenience constructor for component hook failures.
    pub fn component(component: impl Into<String>, message: impl Into<String>) -> Self {
        PipelineError::Component {
            component: component.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Serialization(err.to_string())
    }
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
