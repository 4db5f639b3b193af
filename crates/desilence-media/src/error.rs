//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

use crate::template::TemplateError;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while driving the external media tools.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("{0} not found in PATH")]
    ToolNotFound(String),

    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid command template: {0}")]
    Template(#[from] TemplateError),

    #[error("Invalid preset file {path}: {message}")]
    PresetFile { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl MediaError {
    /// Create a tool-not-found error.
    pub fn tool_not_found(program: impl Into<String>) -> Self {
        Self::ToolNotFound(program.into())
    }

    /// Create a preset file error.
    pub fn preset_file(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::PresetFile {
            path: path.into(),
            message: message.into(),
        }
    }
}
