//! Silence removal pipeline.
//!
//! This crate wires the media adapters into a run:
//! - Preset registry and run configuration
//! - Segment planning, bounded encoding and clip validation
//! - Reassembly of the valid clips
//! - Progress reporting and log setup for the `desilence` binary

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod presets;
pub mod progress;

pub use cli::Args;
pub use config::RunConfig;
pub use error::{Stage, WorkerError, WorkerResult};
pub use pipeline::{Pipeline, RunSummary};
pub use presets::PresetRegistry;
pub use progress::{ProgressEvent, ProgressTracker};
