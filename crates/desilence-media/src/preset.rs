//! Presets: named bundles of command templates.
//!
//! A preset file is JSON:
//!
//! ```json
//! {
//!   "presets": {
//!     "fast": {
//!       "output": "{base}_short{ext}",
//!       "silencedetect": ["ffmpeg", "-hide_banner", "-nostdin", "-i", "{input}",
//!                         "-af", "silencedetect=n=-40dB:d=0.3", "-vn", "-f", "null", "-"],
//!       "segment_encoder": ["ffmpeg", "-hide_banner", "-nostdin", "-ss", "{start}",
//!                           "-i", "{input}", ["-t", "{duration}"], "-c", "copy", "-y", "{output}"]
//!     }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{MediaError, MediaResult};
use crate::template::{ArgSlot, CommandTemplate, Placeholder, TemplateError};

/// Output file name template used when a preset does not name one.
pub const DEFAULT_OUTPUT_TEMPLATE: &str = "{base}_desilenced.mkv";

/// Name of the built-in preset.
pub const DEFAULT_PRESET: &str = "default";

fn default_output_template() -> String {
    DEFAULT_OUTPUT_TEMPLATE.to_string()
}

/// Command templates for the detect and encode passes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    /// Output file name template supporting `{base}` and `{ext}`
    #[serde(default = "default_output_template")]
    pub output: String,
    /// Silence detection pass; diagnostics are read from stderr
    pub silencedetect: CommandTemplate,
    /// Extraction of one audible interval into a clip
    pub segment_encoder: CommandTemplate,
}

impl Preset {
    /// The preset shipped with the binary.
    ///
    /// Detects silence below -50dB lasting at least half a second and encodes
    /// clips with x264/opus into NUT.
    pub fn builtin() -> MediaResult<Self> {
        let silencedetect = CommandTemplate::new(
            literals(&["ffmpeg", "-hide_banner", "-nostdin", "-i"])
                .into_iter()
                .chain([ArgSlot::Placeholder(Placeholder::Input)])
                .chain(literals(&[
                    "-af",
                    "silencedetect=n=-50dB:d=0.5",
                    "-vn",
                    "-f",
                    "null",
                    "-",
                ]))
                .collect(),
        )?;

        let segment_encoder = CommandTemplate::new(
            literals(&["ffmpeg", "-hide_banner", "-nostdin", "-ss"])
                .into_iter()
                .chain([ArgSlot::Placeholder(Placeholder::Start)])
                .chain(literals(&["-i"]))
                .chain([ArgSlot::Placeholder(Placeholder::Input)])
                .chain([ArgSlot::Optional(vec![
                    ArgSlot::literal("-t"),
                    ArgSlot::Placeholder(Placeholder::Duration),
                ])])
                .chain(literals(&[
                    "-c:v", "libx264", "-crf", "26", "-preset", "slow", "-c:a", "libopus", "-b:a",
                    "96k", "-y",
                ]))
                .chain([ArgSlot::Placeholder(Placeholder::Output)])
                .collect(),
        )?;

        Ok(Self {
            output: default_output_template(),
            silencedetect,
            segment_encoder,
        })
    }

    /// Check that each template binds what the pipeline supplies.
    pub fn validate(&self) -> Result<(), TemplateError> {
        self.silencedetect.require(&[Placeholder::Input])?;
        for unsupported in [Placeholder::Output, Placeholder::Start, Placeholder::Duration] {
            if self.silencedetect.uses(unsupported) {
                return Err(TemplateError::Unbound(unsupported));
            }
        }

        self.segment_encoder
            .require(&[Placeholder::Input, Placeholder::Output, Placeholder::Start])?;
        self.segment_encoder.require_optional(Placeholder::Duration)?;

        Ok(())
    }
}

fn literals(args: &[&str]) -> Vec<ArgSlot> {
    args.iter().map(|arg| ArgSlot::literal(*arg)).collect()
}

#[derive(Debug, Deserialize)]
struct PresetFile {
    presets: BTreeMap<String, Preset>,
}

/// Load and validate every preset in a JSON preset file.
pub fn load_preset_file(path: &Path) -> MediaResult<BTreeMap<String, Preset>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| MediaError::preset_file(path, e.to_string()))?;
    let file: PresetFile =
        serde_json::from_str(&content).map_err(|e| MediaError::preset_file(path, e.to_string()))?;

    for (name, preset) in &file.presets {
        preset
            .validate()
            .map_err(|e| MediaError::preset_file(path, format!("preset {}: {}", name, e)))?;
    }

    Ok(file.presets)
}
