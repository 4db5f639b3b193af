//! Adapter seam between the pipeline and the external media tools.
//!
//! Every adapter returns the captured [`ToolOutput`] and leaves the decision
//! of what a non-zero exit means to the caller: an encode failure aborts a
//! run, a probe failure only rejects one clip.

use std::path::Path;

use async_trait::async_trait;
use desilence_models::EncodeJob;
use tracing::debug;

use crate::command::{check_tool, run_captured, ToolOutput};
use crate::concat::concat_args;
use crate::error::MediaResult;
use crate::preset::Preset;
use crate::probe::probe_args;
use crate::template::Bindings;

/// External tools used by a desilence run.
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Verify that the tools can be found before any work starts.
    async fn ensure_available(&self) -> MediaResult<()> {
        Ok(())
    }

    /// Run the silence detection pass; diagnostics are in `stderr`.
    async fn detect_silence(&self, input: &Path) -> MediaResult<ToolOutput>;

    /// Extract `job` from `input` into `job.output_path`.
    async fn encode_segment(&self, input: &Path, job: &EncodeJob) -> MediaResult<ToolOutput>;

    /// Print per-stream metadata with counted frames as JSON on `stdout`.
    async fn probe_streams(&self, clip: &Path) -> MediaResult<ToolOutput>;

    /// Concatenate the clips listed in `list_path` into `output`.
    async fn concat(&self, list_path: &Path, output: &Path) -> MediaResult<ToolOutput>;
}

/// [`MediaBackend`] driving ffmpeg and ffprobe.
#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    preset: Preset,
    ffmpeg: String,
    ffprobe: String,
}

impl FfmpegBackend {
    /// Create a backend for the given preset.
    pub fn new(preset: Preset) -> Self {
        Self {
            preset,
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
        }
    }

    /// Override the programs used for concatenation and probing.
    pub fn with_programs(mut self, ffmpeg: impl Into<String>, ffprobe: impl Into<String>) -> Self {
        self.ffmpeg = ffmpeg.into();
        self.ffprobe = ffprobe.into();
        self
    }
}

#[async_trait]
impl MediaBackend for FfmpegBackend {
    async fn ensure_available(&self) -> MediaResult<()> {
        for program in [
            self.preset.silencedetect.program(),
            self.preset.segment_encoder.program(),
            self.ffprobe.as_str(),
            self.ffmpeg.as_str(),
        ] {
            let path = check_tool(program)?;
            debug!(program = program, path = %path.display(), "Found tool");
        }
        Ok(())
    }

    async fn detect_silence(&self, input: &Path) -> MediaResult<ToolOutput> {
        let args = self
            .preset
            .silencedetect
            .resolve(&Bindings::new().input(input))?;
        run_captured(&args).await
    }

    async fn encode_segment(&self, input: &Path, job: &EncodeJob) -> MediaResult<ToolOutput> {
        let args = self.preset.segment_encoder.resolve(
            &Bindings::new()
                .input(input)
                .output(&job.output_path)
                .start(job.start)
                .duration(job.duration),
        )?;
        run_captured(&args).await
    }

    async fn probe_streams(&self, clip: &Path) -> MediaResult<ToolOutput> {
        run_captured(&probe_args(&self.ffprobe, clip)).await
    }

    async fn concat(&self, list_path: &Path, output: &Path) -> MediaResult<ToolOutput> {
        run_captured(&concat_args(&self.ffmpeg, list_path, output)).await
    }
}
