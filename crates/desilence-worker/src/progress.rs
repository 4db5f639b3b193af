//! Segment progress reporting.
//!
//! Workers bump an atomic counter and send [`ProgressEvent`]s over a channel;
//! a single reporter task turns them into log lines.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use desilence_models::JobIndex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Progress event emitted by the encoder pool.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// Encoding of a segment started
    SegmentStarted { index: JobIndex, start_sec: f64 },

    /// A segment reached a terminal state
    SegmentFinished {
        index: JobIndex,
        valid: bool,
        completed: usize,
    },
}

/// Shared progress counter feeding the reporter task.
#[derive(Debug)]
pub struct ProgressTracker {
    completed: AtomicUsize,
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ProgressTracker {
    /// Create a tracker and the receiving end for [`spawn_reporter`].
    pub fn channel() -> (Arc<Self>, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let tracker = Self {
            completed: AtomicUsize::new(0),
            tx,
        };
        (Arc::new(tracker), rx)
    }

    pub fn segment_started(&self, index: JobIndex, start_sec: f64) {
        self.send(ProgressEvent::SegmentStarted { index, start_sec });
    }

    /// Count a finished segment and return the new total.
    pub fn segment_finished(&self, index: JobIndex, valid: bool) -> usize {
        let completed = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        self.send(ProgressEvent::SegmentFinished {
            index,
            valid,
            completed,
        });
        completed
    }

    fn send(&self, event: ProgressEvent) {
        // Reporter gone means nobody is listening anymore
        let _ = self.tx.send(event);
    }
}

/// Spawn the reporter task.
///
/// Segment numbers are reported against `timeline_len`, so silent gaps show
/// up as skipped numbers. The task ends once every tracker is dropped and
/// returns the number of events it handled.
pub fn spawn_reporter(
    mut rx: mpsc::UnboundedReceiver<ProgressEvent>,
    total_jobs: usize,
    timeline_len: usize,
) -> JoinHandle<usize> {
    tokio::spawn(async move {
        let mut handled = 0;
        while let Some(event) = rx.recv().await {
            handled += 1;
            match event {
                ProgressEvent::SegmentStarted { index, start_sec } => {
                    info!(
                        index = index,
                        start_sec = start_sec,
                        "Processing segment {}/{}",
                        index,
                        timeline_len
                    );
                }
                ProgressEvent::SegmentFinished {
                    index,
                    valid,
                    completed,
                } => {
                    debug!(
                        index = index,
                        valid = valid,
                        "Completed {}/{} clips",
                        completed,
                        total_jobs
                    );
                }
            }
        }
        handled
    })
}
