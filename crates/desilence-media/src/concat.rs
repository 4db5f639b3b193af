//! Concat demuxer list files and the stream-copy concatenation command.

use std::path::Path;

use desilence_models::Manifest;

/// Quote a path for a concat list entry.
///
/// The demuxer reads single-quoted strings; an embedded quote closes the
/// string, emits an escaped quote and reopens it.
pub fn quote_concat_path(path: &Path) -> String {
    format!("'{}'", path.to_string_lossy().replace('\'', r"'\''"))
}

/// Render the list file, one `file '<path>'` line per clip.
pub fn render_concat_list(manifest: &Manifest) -> String {
    manifest
        .paths()
        .map(|path| format!("file {}\n", quote_concat_path(path)))
        .collect()
}

/// Write the list file for `manifest` to `list_path`.
pub async fn write_concat_list(manifest: &Manifest, list_path: &Path) -> std::io::Result<()> {
    tokio::fs::write(list_path, render_concat_list(manifest)).await
}

/// Arguments for lossless concatenation with regenerated timestamps.
///
/// Never passes `-y`, so ffmpeg refuses to replace an existing output.
pub fn concat_args(ffmpeg: &str, list_path: &Path, output: &Path) -> Vec<String> {
    vec![
        ffmpeg.to_string(),
        "-fflags".to_string(),
        "+genpts".to_string(),
        "-hide_banner".to_string(),
        "-nostdin".to_string(),
        "-f".to_string(),
        "concat".to_string(),
        "-safe".to_string(),
        "0".to_string(),
        "-i".to_string(),
        list_path.to_string_lossy().to_string(),
        "-c".to_string(),
        "copy".to_string(),
        output.to_string_lossy().to_string(),
    ]
}
