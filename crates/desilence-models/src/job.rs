//! Encode jobs planned from audible intervals.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Position of an interval in the full timeline.
///
/// Silent gaps keep their numbers, so job indices are sparse.
pub type JobIndex = usize;

/// One audible interval to be extracted into its own clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodeJob {
    /// Index of the source interval in the timeline
    pub index: JobIndex,
    /// Start offset in seconds
    pub start: f64,
    /// Length in seconds; `None` extracts to the end of the input
    pub duration: Option<f64>,
    /// Clip file written by the encoder
    pub output_path: PathBuf,
}

impl EncodeJob {
    /// File name used for the clip of the given index.
    pub fn clip_file_name(index: JobIndex) -> String {
        format!("seg_{}.nut", index)
    }

    /// Build a job writing into `work_dir`.
    pub fn new(index: JobIndex, start: f64, duration: Option<f64>, work_dir: &Path) -> Self {
        Self {
            index,
            start,
            duration,
            output_path: work_dir.join(Self::clip_file_name(index)),
        }
    }

    pub fn is_open_ended(&self) -> bool {
        self.duration.is_none()
    }
}
