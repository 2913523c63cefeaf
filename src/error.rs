//! Error handling for vispipe
//!
//! Pipeline operations report [`PipelineError`]; file-level work (configs,
//! pipeline files) reports [`VisError`], which wraps it.

use crate::pipeline::error::PipelineError;
use thiserror::Error;

/// Main error type for vispipe operations
#[derive(Error, Debug)]
pub enum VisError {
    /// Errors related to configuration or pipeline files
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Errors raised by the pipeline tree
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<VisError>,
    },
}

impl VisError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        VisError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

impl From<serde_json::Error> for VisError {
    fn from(err: serde_json::Error) -> Self {
        VisError::Serialization(err.to_string())
    }
}

/// Result type alias for vispipe operations
pub type Result<T> = std::result::Result<T, VisError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, PipelineError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| VisError::from(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| VisError::from(e).with_context(f()))
    }
}
