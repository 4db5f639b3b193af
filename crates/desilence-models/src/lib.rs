//! Shared data models for the desilence pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Audible/inaudible intervals and the parsed timeline
//! - Encode jobs planned from audible intervals
//! - Clip results and the per-segment state machine
//! - The ordered manifest fed to the final concatenation

pub mod clip;
pub mod interval;
pub mod job;
pub mod manifest;

// Re-export common types
pub use clip::{ClipResult, ClipValidity, InvalidTransition, RejectReason, SegmentState};
pub use interval::{Interval, IntervalKind, Timeline};
pub use job::{EncodeJob, JobIndex};
pub use manifest::Manifest;
