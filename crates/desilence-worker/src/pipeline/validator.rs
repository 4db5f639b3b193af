//! Probing encoded clips before they are reassembled.

use desilence_media::{frameless_streams, parse_probe_output, MediaBackend, ToolOutput};
use desilence_models::{ClipResult, ClipValidity, RejectReason};
use tracing::{debug, warn};

use crate::error::WorkerResult;

/// Classify a clip from its probe output.
pub fn classify_probe(output: &ToolOutput) -> ClipValidity {
    if !output.is_success() {
        let detail = match output.exit_code {
            Some(code) => format!("ffprobe exited with code {}", code),
            None => "ffprobe terminated by signal".to_string(),
        };
        return ClipValidity::Rejected(RejectReason::corrupt(detail));
    }

    let streams = match parse_probe_output(&output.stdout) {
        Ok(streams) => streams,
        Err(e) => return ClipValidity::Rejected(RejectReason::corrupt(e.to_string())),
    };

    let empty = frameless_streams(&streams);
    if empty.is_empty() {
        ClipValidity::Valid
    } else {
        ClipValidity::Rejected(RejectReason::EmptyStreams { streams: empty })
    }
}

/// Probe `clip` and record the verdict.
///
/// Rejections are not errors; only a probe that cannot be run fails.
pub async fn validate_clip(
    backend: &dyn MediaBackend,
    mut clip: ClipResult,
) -> WorkerResult<ClipResult> {
    let output = backend.probe_streams(&clip.path).await?;
    clip.validity = classify_probe(&output);

    match &clip.validity {
        ClipValidity::Rejected(reason) => {
            for message in reason.messages() {
                warn!(
                    index = clip.index,
                    path = %clip.path.display(),
                    "Segment rejected: {}",
                    message
                );
            }
            if let RejectReason::Corrupt { detail } = reason {
                debug!(index = clip.index, detail = %detail, "Probe failure detail");
            }
        }
        _ => debug!(index = clip.index, "Segment valid"),
    }

    Ok(clip)
}
