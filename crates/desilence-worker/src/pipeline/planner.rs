//! Turning a timeline into encode jobs.

use std::path::Path;

use desilence_models::{EncodeJob, Timeline};

/// One job per audible interval with a positive or open length.
///
/// Job indices are positions in the full timeline; clips are written to
/// `work_dir/seg_<index>.nut`.
pub fn plan_jobs(timeline: &Timeline, work_dir: &Path) -> Vec<EncodeJob> {
    timeline
        .intervals
        .iter()
        .enumerate()
        .filter(|(_, interval)| interval.is_audible())
        .filter_map(|(index, interval)| match interval.end {
            None => Some(EncodeJob::new(index, interval.start, None, work_dir)),
            Some(end) if end > interval.start => Some(EncodeJob::new(
                index,
                interval.start,
                Some(end - interval.start),
                work_dir,
            )),
            Some(_) => None,
        })
        .collect()
}
