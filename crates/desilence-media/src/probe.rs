//! FFprobe stream inspection for extracted clips.

use std::path::Path;

use serde::Deserialize;

use crate::error::MediaResult;

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

/// Per-stream metadata requested with `-count_frames -show_streams`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProbeStream {
    pub index: u32,
    pub codec_type: Option<String>,
    pub codec_name: Option<String>,
    /// Counted frames; ffprobe reports `"N/A"` when nothing could be decoded
    pub nb_read_frames: Option<String>,
}

impl ProbeStream {
    /// Human readable identity, e.g. `stream 1: audio (opus)`.
    pub fn identity(&self) -> String {
        format!(
            "stream {}: {} ({})",
            self.index,
            self.codec_type.as_deref().unwrap_or("unknown"),
            self.codec_name.as_deref().unwrap_or("unknown")
        )
    }

    /// Whether the stream reported a numeric frame count.
    pub fn has_frame_count(&self) -> bool {
        self.nb_read_frames
            .as_deref()
            .is_some_and(|frames| frames.trim().parse::<u64>().is_ok())
    }
}

/// Arguments for probing a clip.
pub fn probe_args(ffprobe: &str, clip: &Path) -> Vec<String> {
    vec![
        ffprobe.to_string(),
        "-hide_banner".to_string(),
        "-count_frames".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-print_format".to_string(),
        "json".to_string(),
        "-show_streams".to_string(),
        clip.to_string_lossy().to_string(),
    ]
}

/// Parse the JSON printed by ffprobe.
pub fn parse_probe_output(stdout: &str) -> MediaResult<Vec<ProbeStream>> {
    let probe: FfprobeOutput = serde_json::from_str(stdout)?;
    Ok(probe.streams)
}

/// Identities of the streams without a usable frame count.
pub fn frameless_streams(streams: &[ProbeStream]) -> Vec<String> {
    streams
        .iter()
        .filter(|stream| !stream.has_frame_count())
        .map(ProbeStream::identity)
        .collect()
}
