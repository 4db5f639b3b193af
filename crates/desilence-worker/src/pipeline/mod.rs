//! The desilence pipeline.
//!
//! Detect silence, plan one job per audible interval, encode and validate
//! clips in a bounded pool, then concatenate the valid clips in timeline
//! order into the output file.

pub mod planner;
pub mod pool;
pub mod reassembler;
pub mod validator;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use desilence_media::{parse_silencedetect, MediaBackend};
use desilence_models::{JobIndex, Manifest, RejectReason};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::RunConfig;
use crate::error::{Stage, WorkerError, WorkerResult};
use crate::progress::{spawn_reporter, ProgressTracker};

pub use planner::plan_jobs;
pub use pool::EncoderPool;
pub use reassembler::{assemble, ensure_output_absent};
pub use validator::{classify_probe, validate_clip};

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub output: PathBuf,
    /// Intervals found by silence detection
    pub intervals: usize,
    /// Encode jobs that were planned
    pub jobs: usize,
    /// Clips written to the output
    pub kept: usize,
    /// Clips left out, with the reason
    pub rejected: Vec<(JobIndex, RejectReason)>,
    /// Seconds of silence reported by the detector
    pub silence_removed: f64,
    pub elapsed: Duration,
}

/// Runs the desilence pipeline for one input.
pub struct Pipeline {
    config: RunConfig,
    backend: Arc<dyn MediaBackend>,
    cancel_rx: Option<watch::Receiver<bool>>,
    writing_output: AtomicBool,
}

impl Pipeline {
    pub fn new(config: RunConfig, backend: Arc<dyn MediaBackend>) -> Self {
        Self {
            config,
            backend,
            cancel_rx: None,
            writing_output: AtomicBool::new(false),
        }
    }

    /// Abort the run once `true` is sent on the channel.
    pub fn with_cancel(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.cancel_rx = Some(cancel_rx);
        self
    }

    /// Run the pipeline to completion or the first fatal error.
    ///
    /// On cancellation every in-flight process is killed and an output the
    /// run had started writing is removed.
    pub async fn run(&self) -> WorkerResult<RunSummary> {
        let Some(mut cancel_rx) = self.cancel_rx.clone() else {
            return self.execute().await;
        };

        tokio::select! {
            result = self.execute() => result,
            _ = wait_for_cancel(&mut cancel_rx) => {
                warn!("Cancellation requested, stopping");
                if self.writing_output.load(Ordering::SeqCst) {
                    reassembler::remove_partial_output(&self.config.output).await;
                }
                Err(WorkerError::Cancelled)
            }
        }
    }

    async fn execute(&self) -> WorkerResult<RunSummary> {
        let started = Instant::now();
        let config = &self.config;

        if !config.input.is_file() {
            return Err(WorkerError::input(format!(
                "input file not found: {}",
                config.input.display()
            )));
        }
        ensure_output_absent(&config.output)?;

        self.backend.ensure_available().await?;

        info!(input = %config.input.display(), "Detecting silence, this may take a while");
        let detection = self.backend.detect_silence(&config.input).await?;
        if !detection.is_success() {
            return Err(WorkerError::adapter(Stage::Detect, &detection));
        }

        let timeline = parse_silencedetect(&detection.stderr)?;
        info!(
            intervals = timeline.len(),
            "Found {} segments, {:.2} seconds of silence",
            timeline.len(),
            timeline.total_silence
        );

        let work_dir = match &config.work_root {
            Some(root) => tempfile::Builder::new()
                .prefix("desilence-")
                .tempdir_in(root)?,
            None => tempfile::Builder::new().prefix("desilence-").tempdir()?,
        };
        // Concat list entries must not be relative to the list file
        let work_path = std::fs::canonicalize(work_dir.path())?;
        debug!(dir = %work_path.display(), "Created working directory");

        let jobs = plan_jobs(&timeline, &work_path);
        let planned = jobs.len();
        if planned == 0 {
            return Err(WorkerError::empty_manifest("no audible segments found"));
        }
        info!(
            jobs = planned,
            parallel = config.parallel,
            "Encoding segments"
        );

        let (progress, progress_rx) = ProgressTracker::channel();
        let reporter = spawn_reporter(progress_rx, planned, timeline.len());

        let pool = EncoderPool::new(
            Arc::clone(&self.backend),
            config.input.clone(),
            config.parallel,
        );
        let pooled = pool.run(jobs, progress).await;
        // All trackers are gone once the pool returns
        if let Err(e) = reporter.await {
            debug!("Progress reporter ended abnormally: {}", e);
        }
        let clips = pooled?;

        let manifest = Manifest::from_clips(&clips);
        let mut rejected: Vec<(JobIndex, RejectReason)> = clips
            .iter()
            .filter_map(|clip| clip.reject_reason().map(|r| (clip.index, r.clone())))
            .collect();
        rejected.sort_by_key(|(index, _)| *index);

        if manifest.is_empty() {
            return Err(WorkerError::empty_manifest(format!(
                "all {} segments were rejected",
                planned
            )));
        }
        if !rejected.is_empty() {
            warn!(
                rejected = rejected.len(),
                "Some segments were rejected and will be missing from the output"
            );
        }

        assemble(
            self.backend.as_ref(),
            &manifest,
            &work_path,
            &config.output,
            &self.writing_output,
        )
        .await?;

        let summary = RunSummary {
            output: config.output.clone(),
            intervals: timeline.len(),
            jobs: planned,
            kept: manifest.len(),
            rejected,
            silence_removed: timeline.total_silence,
            elapsed: started.elapsed(),
        };

        drop(work_dir);
        Ok(summary)
    }
}

async fn wait_for_cancel(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            // Sender dropped without cancelling
            std::future::pending::<()>().await;
        }
    }
}
