//! Command line arguments.

use std::path::PathBuf;

use clap::Parser;
use desilence_media::DEFAULT_PRESET;

/// Remove silent sections from a media file.
#[derive(Debug, Clone, Parser)]
#[command(name = "desilence", version, about)]
pub struct Args {
    /// Media file to process
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output file name template; `{base}` and `{ext}` come from the input
    /// file name. Defaults to the preset's output template.
    #[arg(short, long)]
    pub output: Option<String>,

    /// JSON file with additional presets
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Preset to use
    #[arg(short, long, default_value = DEFAULT_PRESET)]
    pub preset: String,

    /// Maximum number of segments encoded at the same time
    #[arg(short = 'j', long)]
    pub parallel: Option<usize>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}
