//! Saving and restoring pipeline trees.
//!
//! - [`state`]: per-node records and `Pipeline::save_state` / `Pipeline::restore`.
//! - [`codec`]: gzip + base64 for dataset payloads.
//! - [`project`]: whole-pipeline files on disk.

pub mod codec;
pub mod project;
pub mod state;

pub use codec::{compress, decompress};
pub use project::{PipelineFile, PIPELINE_FILE_EXTENSION, PIPELINE_FILE_VERSION};
pub use state::{ComponentState, NodeState, RestoreContext, SelectorState};
