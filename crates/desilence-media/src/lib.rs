//! FFmpeg CLI adapters for silence removal.
//!
//! This crate provides:
//! - Structured command templates resolved without a shell
//! - Presets bundling the detect and encode templates
//! - Parsing of `silencedetect` diagnostics into a timeline
//! - FFprobe frame-count inspection of extracted clips
//! - Concat demuxer list files for lossless reassembly
//! - The [`MediaBackend`] seam with an ffmpeg implementation

pub mod backend;
pub mod command;
pub mod concat;
pub mod error;
pub mod preset;
pub mod probe;
pub mod silence;
pub mod template;

pub use backend::{FfmpegBackend, MediaBackend};
pub use command::{check_tool, run_captured, ToolOutput};
pub use concat::{render_concat_list, write_concat_list};
pub use error::{MediaError, MediaResult};
pub use preset::{load_preset_file, Preset, DEFAULT_OUTPUT_TEMPLATE, DEFAULT_PRESET};
pub use probe::{frameless_streams, parse_probe_output, ProbeStream};
pub use silence::{parse_silencedetect, SilenceEvent, SilenceParseError};
pub use template::{ArgSlot, Bindings, CommandTemplate, Placeholder, TemplateError};
