//! Lossless reassembly of the valid clips.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use desilence_media::{write_concat_list, MediaBackend};
use desilence_models::Manifest;
use tracing::{debug, info, warn};

use crate::error::{Stage, WorkerError, WorkerResult};

/// Name of the concat list inside the working directory.
pub const CONCAT_LIST_NAME: &str = "concat.txt";

/// Stem of the concatenated file inside the working directory.
pub const STAGED_OUTPUT_STEM: &str = "assembled";

/// Fail if anything already exists at `output`.
pub fn ensure_output_absent(output: &Path) -> WorkerResult<()> {
    if std::fs::symlink_metadata(output).is_ok() {
        return Err(WorkerError::input(format!(
            "output file already exists: {}",
            output.display()
        )));
    }
    Ok(())
}

/// Remove a partially written output, logging instead of failing.
pub async fn remove_partial_output(output: &Path) {
    match tokio::fs::remove_file(output).await {
        Ok(()) => warn!(path = %output.display(), "Removed partial output"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %output.display(), "Failed to remove partial output: {}", e),
    }
}

fn output_appeared(output: &Path) -> WorkerError {
    WorkerError::input(format!(
        "output file appeared during the run: {}",
        output.display()
    ))
}

/// Path the concat tool writes to, keeping the output's extension so the
/// muxer is chosen the same way.
pub fn staged_output_path(work_dir: &Path, output: &Path) -> PathBuf {
    match output.extension() {
        Some(ext) => work_dir.join(format!("{}.{}", STAGED_OUTPUT_STEM, ext.to_string_lossy())),
        None => work_dir.join(STAGED_OUTPUT_STEM),
    }
}

/// Move `staged` to `output` without replacing anything already there.
///
/// Hard links publish atomically; where they are unavailable (another file
/// system) the file is copied into a newly created output. `writing` is set
/// only once this run owns a file at `output`.
pub async fn publish(staged: &Path, output: &Path, writing: &AtomicBool) -> WorkerResult<()> {
    match tokio::fs::hard_link(staged, output).await {
        Ok(()) => return Ok(()),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => return Err(output_appeared(output)),
        Err(e) => debug!("Cannot hard link output ({}), copying instead", e),
    }

    let mut target = match tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(output)
        .await
    {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => return Err(output_appeared(output)),
        Err(e) => return Err(e.into()),
    };
    writing.store(true, Ordering::SeqCst);

    let copied = async {
        let mut source = tokio::fs::File::open(staged).await?;
        tokio::io::copy(&mut source, &mut target).await?;
        target.sync_all().await
    }
    .await;

    if let Err(e) = copied {
        drop(target);
        remove_partial_output(output).await;
        return Err(e.into());
    }
    Ok(())
}

/// Concatenate the manifest and publish the result at `output`.
///
/// The concat tool writes into `work_dir`, so a file that appears at
/// `output` during the run is neither overwritten nor removed.
pub async fn assemble(
    backend: &dyn MediaBackend,
    manifest: &Manifest,
    work_dir: &Path,
    output: &Path,
    writing: &AtomicBool,
) -> WorkerResult<()> {
    if manifest.is_empty() {
        return Err(WorkerError::empty_manifest("no valid segments to assemble"));
    }

    let list_path = work_dir.join(CONCAT_LIST_NAME);
    write_concat_list(manifest, &list_path).await?;

    ensure_output_absent(output)?;
    let staged = staged_output_path(work_dir, output);

    info!(
        clips = manifest.len(),
        output = %output.display(),
        "Reassembling segments"
    );

    let result = backend.concat(&list_path, &staged).await?;
    if !result.is_success() {
        return Err(WorkerError::adapter(Stage::Concat, &result));
    }

    publish(&staged, output, writing).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_existing_output_is_refused() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("out.mkv");
        assert!(ensure_output_absent(&output).is_ok());

        std::fs::write(&output, b"keep me").unwrap();
        let err = ensure_output_absent(&output).unwrap_err();
        assert!(matches!(err, WorkerError::Input(_)));
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn test_staged_output_keeps_extension() {
        let work = Path::new("/work");
        assert_eq!(
            staged_output_path(work, Path::new("talk_desilenced.mkv")),
            PathBuf::from("/work/assembled.mkv")
        );
        assert_eq!(
            staged_output_path(work, Path::new("out")),
            PathBuf::from("/work/assembled")
        );
    }

    #[tokio::test]
    async fn test_publish_moves_staged_file() {
        let dir = TempDir::new().unwrap();
        let staged = dir.path().join("assembled.mkv");
        let output = dir.path().join("out.mkv");
        std::fs::write(&staged, b"joined").unwrap();

        let writing = AtomicBool::new(false);
        tokio_test::assert_ok!(publish(&staged, &output, &writing).await);
        assert_eq!(std::fs::read(&output).unwrap(), b"joined");
    }

    #[tokio::test]
    async fn test_publish_never_replaces_existing_output() {
        let dir = TempDir::new().unwrap();
        let staged = dir.path().join("assembled.mkv");
        let output = dir.path().join("out.mkv");
        std::fs::write(&staged, b"joined").unwrap();
        std::fs::write(&output, b"someone else").unwrap();

        let writing = AtomicBool::new(false);
        let err = tokio_test::assert_err!(publish(&staged, &output, &writing).await);

        assert!(matches!(err, WorkerError::Input(_)));
        assert!(!writing.load(Ordering::SeqCst));
        assert_eq!(std::fs::read(&output).unwrap(), b"someone else");
    }

    #[tokio::test]
    async fn test_remove_partial_output() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("out.mkv");
        std::fs::write(&output, b"partial").unwrap();

        remove_partial_output(&output).await;
        assert!(!output.exists());

        // Missing file is not an error
        remove_partial_output(&output).await;
    }
}
