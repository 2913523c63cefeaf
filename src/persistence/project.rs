//! Pipeline files: every scene of a `Pipeline` in one JSON document.

use crate::config::PersistenceConfig;
use crate::error::{Result, ResultExt, VisError};
use crate::persistence::state::{NodeState, RestoreContext};
use crate::pipeline::error::PipelineResult;
use crate::pipeline::id::NodeId;
use crate::pipeline::node_type::NodeCategory;
use crate::pipeline::tree::Pipeline;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Pipeline file extension
pub const PIPELINE_FILE_EXTENSION: &str = "vispipe.json";

/// Current pipeline file format version
pub const PIPELINE_FILE_VERSION: u32 = 1;

/// Saved pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineFile {
    /// File format version for future compatibility
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub name: String,

    /// When the file was captured
    pub saved_at: DateTime<Utc>,

    /// One record per scene, in creation order
    #[serde(default)]
    pub scenes: Vec<NodeState>,
}

fn default_version() -> u32 {
    PIPELINE_FILE_VERSION
}

impl PipelineFile {
    /// Capture every scene of `pipeline`.
    pub fn capture(
        name: impl Into<String>,
        pipeline: &Pipeline,
        config: &PersistenceConfig,
    ) -> PipelineResult<Self> {
        let scenes = pipeline
            .roots()
            .filter(|n| n.category() == NodeCategory::Scene)
            .map(|n| pipeline.save_state(n.id(), config))
            .collect::<PipelineResult<Vec<_>>>()?;

        Ok(Self {
            version: PIPELINE_FILE_VERSION,
            name: name.into(),
            saved_at: Utc::now(),
            scenes,
        })
    }

    /// Restore every scene into `pipeline`. Scenes come back stopped.
    pub fn restore_into(&self, pipeline: &mut Pipeline, ctx: &RestoreContext<'_>) -> Result<Vec<NodeId>> {
        self.scenes
            .iter()
            .map(|scene| {
                pipeline
                    .restore(scene, ctx)
                    .with_context(|| format!("Failed to restore scene '{}'", scene.name))
            })
            .collect()
    }

    /// Total number of node records across all scenes.
    pub fn node_count(&self) -> usize {
        self.scenes.iter().map(NodeState::node_count).sum()
    }

    /// Load a pipeline file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            VisError::Config(format!("Failed to read pipeline file {:?}: {}", path, e))
        })?;

        let file: Self = serde_json::from_str(&content).map_err(|e| {
            VisError::Config(format!("Failed to parse pipeline file {:?}: {}", path, e))
        })?;

        if file.version > PIPELINE_FILE_VERSION {
            return Err(VisError::Config(format!(
                "Pipeline file {:?} has version {}, newest supported is {}",
                path, file.version, PIPELINE_FILE_VERSION
            )));
        }
        Ok(file)
    }

    /// Save the pipeline file to disk as JSON
    pub fn save(&self, path: impl AsRef<Path>, config: &PersistenceConfig) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                VisError::Config(format!("Failed to create pipeline directory: {}", e))
            })?;
        }

        let content = if config.pretty_json {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
        .map_err(|e| VisError::Serialization(format!("Failed to serialize pipeline: {}", e)))?;

        std::fs::write(path, content).map_err(|e| {
            VisError::Config(format!("Failed to write pipeline file {:?}: {}", path, e))
        })?;
        tracing::info!("Saved pipeline '{}' to {:?}", self.name, path);
        Ok(())
    }
}
