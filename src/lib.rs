//! # vispipe: visualization pipeline lifecycle manager
//!
//! Maintains a tree of visualization objects (scenes, sources, filters,
//! module managers, modules), propagates structural changes through
//! start/stop transitions, and keeps a managed dataset's active attributes
//! synchronized with downstream consumers.
//!
//! ## Architecture
//!
//! - **Pipeline**: node arena with the structural-change hook and lifecycle
//! - **Dataset**: opaque dataset collaborator plus an in-memory implementation
//! - **Persistence**: node records, gzip payloads, pipeline files
//! - **Communication**: crossbeam channels for events and dataset modifications
//!
//! ## Example
//!
//! ```
//! use vispipe::dataset::{AttributeKind, AttributeRole, MemoryDataset};
//! use vispipe::pipeline::Pipeline;
//!
//! let mut pipeline = Pipeline::new();
//! let scene = pipeline.create_scene("scene");
//! let data = MemoryDataset::new("PolyData")
//!     .with_array(AttributeRole::Point, "temperature", 1, vec![1.0, 2.0]);
//! let source = pipeline.create_data_source(Some(Box::new(data))).unwrap();
//! pipeline.add_child(scene, source).unwrap();
//! pipeline.start(scene).unwrap();
//!
//! assert_eq!(
//!     pipeline.selector(source, AttributeRole::Point, AttributeKind::Scalars).unwrap(),
//!     "temperature"
//! );
//! ```

pub mod config;
pub mod dataset;
pub mod error;
pub mod persistence;
pub mod pipeline;

// Re-export commonly used types
pub use config::PipelineConfig;
pub use dataset::{Dataset, DatasetReader, MemoryDataset, MemoryDatasetReader};
pub use error::{Result, VisError};
pub use persistence::{NodeState, PipelineFile, RestoreContext};
pub use pipeline::{Component, NodeId, Pipeline, PipelineError, PipelineEvent, PipelineResult};
