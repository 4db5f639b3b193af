//! Run configuration.

use std::path::{Path, PathBuf};

use desilence_media::Preset;

use crate::cli::Args;
use crate::error::{WorkerError, WorkerResult};

/// Environment variable overriding the default concurrency limit.
pub const PARALLEL_ENV: &str = "DESILENCE_PARALLEL";

/// Environment variable naming the parent of the working directory.
pub const WORK_DIR_ENV: &str = "DESILENCE_WORK_DIR";

/// Settings for one desilence run, resolved once at startup.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Media file to process
    pub input: PathBuf,
    /// File the reassembled result is written to
    pub output: PathBuf,
    /// Maximum number of simultaneous encodes
    pub parallel: usize,
    /// Parent of the scoped working directory; system temp dir when unset
    pub work_root: Option<PathBuf>,
}

impl RunConfig {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            parallel: default_parallelism(),
            work_root: None,
        }
    }

    pub fn with_parallel(mut self, parallel: usize) -> Self {
        self.parallel = parallel.max(1);
        self
    }

    pub fn with_work_root(mut self, work_root: impl Into<PathBuf>) -> Self {
        self.work_root = Some(work_root.into());
        self
    }

    /// Resolve the configuration from CLI arguments, environment and preset.
    pub fn from_args(args: &Args, preset: &Preset) -> WorkerResult<Self> {
        let template = args.output.as_deref().unwrap_or(&preset.output);
        let output = render_output_path(template, &args.input)?;

        let env_parallel = std::env::var(PARALLEL_ENV).ok();
        let parallel = resolve_parallel(args.parallel, env_parallel.as_deref())?;

        let work_root = std::env::var(WORK_DIR_ENV)
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            input: args.input.clone(),
            output,
            parallel,
            work_root,
        })
    }
}

/// A quarter of the available cores, at least one.
///
/// Each encoder is itself multi-threaded.
pub fn default_parallelism() -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    (cores / 4).max(1)
}

/// Pick the concurrency limit: CLI first, then environment, then default.
pub fn resolve_parallel(cli: Option<usize>, env: Option<&str>) -> WorkerResult<usize> {
    let parallel = match (cli, env) {
        (Some(n), _) => n,
        (None, Some(raw)) => raw.trim().parse().map_err(|_| {
            WorkerError::config(format!(
                "{} must be a positive integer, got {:?}",
                PARALLEL_ENV, raw
            ))
        })?,
        (None, None) => default_parallelism(),
    };

    if parallel == 0 {
        return Err(WorkerError::config("parallel limit must be at least 1"));
    }
    Ok(parallel)
}

/// Render an output file name template for `input`.
///
/// `{base}` is the input file name without its extension, `{ext}` the
/// extension including the leading dot (empty when there is none).
pub fn render_output_path(template: &str, input: &Path) -> WorkerResult<PathBuf> {
    let file_name = input
        .file_name()
        .ok_or_else(|| WorkerError::input(format!("not a file path: {}", input.display())))?;

    let base = Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = input
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let rendered = template.replace("{base}", &base).replace("{ext}", &ext);
    if rendered.trim().is_empty() {
        return Err(WorkerError::config("output template renders to an empty path"));
    }
    Ok(PathBuf::from(rendered))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_default_template() {
        let output =
            render_output_path("{base}_desilenced.mkv", Path::new("/videos/talk.mp4")).unwrap();
        assert_eq!(output, PathBuf::from("talk_desilenced.mkv"));
    }

    #[test]
    fn test_render_keeps_extension_dot() {
        let output =
            render_output_path("{base}_short{ext}", Path::new("lecture.final.webm")).unwrap();
        assert_eq!(output, PathBuf::from("lecture.final_short.webm"));

        let output = render_output_path("{base}_short{ext}", Path::new("recording")).unwrap();
        assert_eq!(output, PathBuf::from("recording_short"));
    }

    #[test]
    fn test_render_rejects_bad_input() {
        assert!(render_output_path("{base}.mkv", Path::new("/")).is_err());
        assert!(render_output_path("", Path::new("a.mp4")).is_err());
    }

    #[test]
    fn test_resolve_parallel_precedence() {
        assert_eq!(resolve_parallel(Some(3), Some("8")).unwrap(), 3);
        assert_eq!(resolve_parallel(None, Some(" 8 ")).unwrap(), 8);
        assert_eq!(resolve_parallel(None, None).unwrap(), default_parallelism());
    }

    #[test]
    fn test_resolve_parallel_rejects_invalid() {
        assert!(resolve_parallel(Some(0), None).is_err());
        assert!(resolve_parallel(None, Some("many")).is_err());
        assert!(resolve_parallel(None, Some("0")).is_err());
    }

    #[test]
    fn test_default_parallelism_is_positive() {
        assert!(default_parallelism() >= 1);
    }

    #[test]
    fn test_builder() {
        let config = RunConfig::new("in.mp4", "out.mkv")
            .with_parallel(0)
            .with_work_root("/scratch");
        assert_eq!(config.parallel, 1);
        assert_eq!(config.work_root, Some(PathBuf::from("/scratch")));
    }
}
