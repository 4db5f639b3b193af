//! Worker error types.

use desilence_media::{MediaError, SilenceParseError, ToolOutput};
use desilence_models::JobIndex;
use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

/// Lines of captured stderr included in adapter errors.
const STDERR_TAIL_LINES: usize = 20;

/// External pass that produced an adapter error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stage {
    Detect,
    Encode { index: JobIndex, start: f64 },
    Concat,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Detect => write!(f, "silence detection"),
            Stage::Encode { index, start } => {
                write!(f, "encoding segment {} at {:.3} seconds", index, start)
            }
            Stage::Concat => write!(f, "reassembly"),
        }
    }
}

/// Fatal errors of a desilence run.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Input error: {0}")]
    Input(String),

    #[error("Could not interpret silence detection output: {0}")]
    Parse(#[from] SilenceParseError),

    #[error("{stage} failed: {message}{}", stderr_suffix(.stderr))]
    Adapter {
        stage: Stage,
        message: String,
        stderr: String,
    },

    #[error("Nothing to assemble: {0}")]
    EmptyManifest(String),

    #[error("Run cancelled")]
    Cancelled,

    #[error("Segment task failed: {0}")]
    Task(String),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn stderr_suffix(stderr: &str) -> String {
    if stderr.trim().is_empty() {
        String::new()
    } else {
        format!("\n{}", stderr)
    }
}

impl WorkerError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input(msg.into())
    }

    pub fn empty_manifest(msg: impl Into<String>) -> Self {
        Self::EmptyManifest(msg.into())
    }

    /// Adapter error for a tool run that exited unsuccessfully.
    pub fn adapter(stage: Stage, output: &ToolOutput) -> Self {
        let message = match output.exit_code {
            Some(code) => format!("exited with code {}", code),
            None => "terminated by signal".to_string(),
        };
        Self::Adapter {
            stage,
            message,
            stderr: output.stderr_tail(STDERR_TAIL_LINES),
        }
    }

    /// Check if error was raised before any external tool ran.
    pub fn is_startup_error(&self) -> bool {
        matches!(self, WorkerError::Config(_) | WorkerError::Input(_))
    }
}
