//! Bounded pool encoding and validating segments.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use desilence_media::MediaBackend;
use desilence_models::{ClipResult, EncodeJob, SegmentState};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info_span, warn, Instrument};

use crate::error::{Stage, WorkerError, WorkerResult};
use crate::progress::ProgressTracker;

use super::validator::validate_clip;

/// Runs encode jobs with at most `limit` in flight.
pub struct EncoderPool {
    backend: Arc<dyn MediaBackend>,
    input: Arc<PathBuf>,
    limit: usize,
}

impl EncoderPool {
    pub fn new(backend: Arc<dyn MediaBackend>, input: impl Into<PathBuf>, limit: usize) -> Self {
        Self {
            backend,
            input: Arc::new(input.into()),
            limit: limit.max(1),
        }
    }

    /// Encode and validate every job.
    ///
    /// Jobs start in the order given. The first encode failure closes the
    /// pool: no further job starts and in-flight tasks are aborted, which
    /// kills their processes. Returned clips are in completion order.
    pub async fn run(
        &self,
        jobs: Vec<EncodeJob>,
        progress: Arc<ProgressTracker>,
    ) -> WorkerResult<Vec<ClipResult>> {
        let total = jobs.len();
        let semaphore = Arc::new(Semaphore::new(self.limit));
        let mut tasks = JoinSet::new();

        for job in jobs {
            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                debug!(index = job.index, "Pool closed, not starting remaining jobs");
                break;
            };

            let backend = Arc::clone(&self.backend);
            let input = Arc::clone(&self.input);
            let progress = Arc::clone(&progress);
            let slots = Arc::clone(&semaphore);
            let span = info_span!("segment", index = job.index);

            tasks.spawn(
                async move {
                    let result = process_segment(backend.as_ref(), &input, job, &progress).await;
                    if result.is_err() {
                        slots.close();
                    }
                    drop(permit);
                    result
                }
                .instrument(span),
            );
        }

        let mut clips = Vec::with_capacity(total);
        while let Some(joined) = tasks.join_next().await {
            let outcome = joined
                .map_err(|e| WorkerError::Task(e.to_string()))
                .and_then(|result| result);

            match outcome {
                Ok(clip) => clips.push(clip),
                Err(e) => {
                    semaphore.close();
                    let in_flight = tasks.len();
                    if in_flight > 0 {
                        warn!(in_flight = in_flight, "Cancelling in-flight segments");
                    }
                    tasks.abort_all();
                    while tasks.join_next().await.is_some() {}
                    return Err(e);
                }
            }
        }

        Ok(clips)
    }
}

fn advance(state: SegmentState, next: SegmentState) -> WorkerResult<SegmentState> {
    state
        .advance(next)
        .map_err(|e| WorkerError::Task(e.to_string()))
}

/// Encode one job, then validate the clip while still holding the slot.
async fn process_segment(
    backend: &dyn MediaBackend,
    input: &Path,
    job: EncodeJob,
    progress: &ProgressTracker,
) -> WorkerResult<ClipResult> {
    let mut state = advance(SegmentState::Planned, SegmentState::Encoding)?;
    progress.segment_started(job.index, job.start);
    debug!(
        start_sec = job.start,
        duration_sec = ?job.duration,
        state = %state,
        "Encoding segment"
    );

    let output = backend.encode_segment(input, &job).await?;
    if !output.is_success() {
        state = advance(state, SegmentState::Failed)?;
        debug!(state = %state, "Segment encode failed");
        return Err(WorkerError::adapter(
            Stage::Encode {
                index: job.index,
                start: job.start,
            },
            &output,
        ));
    }
    state = advance(state, SegmentState::Encoded)?;

    let clip = ClipResult::pending(job.index, job.output_path);
    state = advance(state, SegmentState::Validating)?;
    let clip = validate_clip(backend, clip).await?;

    let verdict = if clip.is_valid() {
        SegmentState::Valid
    } else {
        SegmentState::Rejected
    };
    state = advance(state, verdict)?;
    progress.segment_finished(clip.index, clip.is_valid());
    debug!(state = %state, "Segment finished");

    Ok(clip)
}
