//! End-to-end pipeline runs against an instrumented media backend.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use desilence_media::{MediaBackend, MediaResult, ToolOutput};
use desilence_models::{EncodeJob, RejectReason};
use desilence_worker::{Pipeline, RunConfig, Stage, WorkerError};
use tempfile::TempDir;
use tokio::sync::watch;
use tokio_test::{assert_err, assert_ok};

const VALID_PROBE: &str = r#"{"streams": [
    {"index": 0, "codec_type": "video", "codec_name": "h264", "nb_read_frames": "120"},
    {"index": 1, "codec_type": "audio", "codec_name": "opus", "nb_read_frames": "240"}
]}"#;

const SILENT_AUDIO_PROBE: &str = r#"{"streams": [
    {"index": 0, "codec_type": "video", "codec_name": "h264", "nb_read_frames": "120"},
    {"index": 1, "codec_type": "audio", "codec_name": "opus", "nb_read_frames": "N/A"}
]}"#;

/// `silencedetect` stderr for the given `(start, end)` silences.
fn detect_stderr(silences: &[(f64, f64)]) -> String {
    let mut out = String::from("Input #0, matroska,webm, from 'input.mkv':\n");
    for (start, end) in silences {
        out.push_str(&format!(
            "[silencedetect @ 0x55d0c8] silence_start: {:.6}\n",
            start
        ));
        out.push_str(&format!(
            "[silencedetect @ 0x55d0c8] silence_end: {:.6} | silence_duration: {:.6}\n",
            end,
            end - start
        ));
    }
    out.push_str("size=N/A time=00:00:30.00 bitrate=N/A speed= 512x\n");
    out
}

#[derive(Default)]
struct StubBackend {
    detect: ToolOutput,
    encode_delay: Duration,
    failing_encodes: HashSet<usize>,
    hanging_encodes: HashSet<usize>,
    probes: HashMap<usize, ToolOutput>,
    concat_failure: bool,
    /// Written by another process while the concat runs
    output_appears: Option<PathBuf>,

    invocations: AtomicUsize,
    active_encodes: AtomicUsize,
    peak_encodes: AtomicUsize,
    encoded: Mutex<Vec<EncodeJob>>,
    concat_list: Mutex<Option<String>>,
}

impl StubBackend {
    fn new(silences: &[(f64, f64)]) -> Self {
        Self {
            detect: ToolOutput::success("", detect_stderr(silences)),
            ..Default::default()
        }
    }

    fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    fn encoded_jobs(&self) -> Vec<EncodeJob> {
        let mut jobs = self.encoded.lock().unwrap().clone();
        jobs.sort_by_key(|j| j.index);
        jobs
    }

    fn concat_list(&self) -> Option<String> {
        self.concat_list.lock().unwrap().clone()
    }
}

fn clip_index(path: &Path) -> usize {
    path.file_stem()
        .and_then(|s| s.to_str())
        .and_then(|s| s.strip_prefix("seg_"))
        .and_then(|s| s.parse().ok())
        .unwrap()
}

#[async_trait]
impl MediaBackend for StubBackend {
    async fn detect_silence(&self, _input: &Path) -> MediaResult<ToolOutput> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        Ok(self.detect.clone())
    }

    async fn encode_segment(&self, _input: &Path, job: &EncodeJob) -> MediaResult<ToolOutput> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        let active = self.active_encodes.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_encodes.fetch_max(active, Ordering::SeqCst);

        if self.hanging_encodes.contains(&job.index) {
            std::future::pending::<()>().await;
        }
        tokio::time::sleep(self.encode_delay).await;
        self.active_encodes.fetch_sub(1, Ordering::SeqCst);
        self.encoded.lock().unwrap().push(job.clone());

        if self.failing_encodes.contains(&job.index) {
            return Ok(ToolOutput::failure(1, "Conversion failed!"));
        }
        tokio::fs::write(&job.output_path, b"clip").await?;
        Ok(ToolOutput::success("", ""))
    }

    async fn probe_streams(&self, clip: &Path) -> MediaResult<ToolOutput> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .probes
            .get(&clip_index(clip))
            .cloned()
            .unwrap_or_else(|| ToolOutput::success(VALID_PROBE, "")))
    }

    async fn concat(&self, list_path: &Path, output: &Path) -> MediaResult<ToolOutput> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        let list = tokio::fs::read_to_string(list_path).await?;
        *self.concat_list.lock().unwrap() = Some(list);

        tokio::fs::write(output, b"joined").await?;
        if let Some(foreign) = &self.output_appears {
            tokio::fs::write(foreign, b"other").await?;
        }
        if self.concat_failure {
            return Ok(ToolOutput::failure(1, "Non-monotonous DTS in output stream"));
        }
        Ok(ToolOutput::success("", ""))
    }
}

struct Fixture {
    _dir: TempDir,
    input: PathBuf,
    output: PathBuf,
    work_root: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("input.mkv");
        std::fs::write(&input, b"media").unwrap();
        let work_root = dir.path().join("work");
        std::fs::create_dir(&work_root).unwrap();
        Self {
            output: dir.path().join("input_desilenced.mkv"),
            input,
            work_root,
            _dir: dir,
        }
    }

    fn config(&self, parallel: usize) -> RunConfig {
        RunConfig::new(&self.input, &self.output)
            .with_parallel(parallel)
            .with_work_root(&self.work_root)
    }

    fn work_root_is_empty(&self) -> bool {
        std::fs::read_dir(&self.work_root).unwrap().next().is_none()
    }
}

fn pipeline(fixture: &Fixture, parallel: usize, backend: &Arc<StubBackend>) -> Pipeline {
    let backend: Arc<dyn MediaBackend> = backend.clone();
    Pipeline::new(fixture.config(parallel), backend)
}

#[tokio::test]
async fn test_successful_run_concatenates_in_timeline_order() {
    let fixture = Fixture::new();
    let backend = Arc::new(StubBackend {
        encode_delay: Duration::from_millis(5),
        ..StubBackend::new(&[(1.0, 2.0), (3.0, 4.5)])
    });

    let summary = assert_ok!(pipeline(&fixture, 3, &backend).run().await);

    assert_eq!(summary.intervals, 5);
    assert_eq!(summary.jobs, 3);
    assert_eq!(summary.kept, 3);
    assert!(summary.rejected.is_empty());
    assert!((summary.silence_removed - 2.5).abs() < 1e-6);
    assert!(fixture.output.exists());

    let list = backend.concat_list().unwrap();
    let lines: Vec<&str> = list.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("file '/") && lines[0].ends_with("seg_0.nut'"));
    assert!(lines[1].ends_with("seg_2.nut'"));
    assert!(lines[2].ends_with("seg_4.nut'"));

    assert!(fixture.work_root_is_empty(), "working directory was not removed");
}

#[tokio::test]
async fn test_last_segment_is_open_ended() {
    let fixture = Fixture::new();
    let backend = Arc::new(StubBackend::new(&[(2.0, 3.0)]));

    assert_ok!(pipeline(&fixture, 2, &backend).run().await);

    let jobs = backend.encoded_jobs();
    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0].start, 0.0);
    assert_eq!(jobs[0].duration, Some(2.0));
    assert_eq!(jobs[1].index, 2);
    assert_eq!(jobs[1].start, 3.0);
    assert!(jobs[1].is_open_ended());
}

#[tokio::test]
async fn test_concurrency_never_exceeds_limit() {
    let fixture = Fixture::new();
    let backend = Arc::new(StubBackend {
        encode_delay: Duration::from_millis(40),
        ..StubBackend::new(&[(1.0, 2.0), (3.0, 4.0), (5.0, 6.0), (7.0, 8.0)])
    });

    let summary = assert_ok!(pipeline(&fixture, 2, &backend).run().await);

    assert_eq!(summary.jobs, 5);
    let peak = backend.peak_encodes.load(Ordering::SeqCst);
    assert!(peak <= 2, "peak of {} simultaneous encodes", peak);
    assert!(peak >= 1);
}

#[tokio::test]
async fn test_clip_without_audio_frames_is_left_out() {
    let fixture = Fixture::new();
    let mut backend = StubBackend::new(&[(1.0, 2.0), (3.0, 4.0)]);
    backend
        .probes
        .insert(2, ToolOutput::success(SILENT_AUDIO_PROBE, ""));
    let backend = Arc::new(backend);

    let summary = assert_ok!(pipeline(&fixture, 2, &backend).run().await);

    assert_eq!(summary.kept, 2);
    assert_eq!(
        summary.rejected,
        vec![(
            2,
            RejectReason::EmptyStreams {
                streams: vec!["stream 1: audio (opus)".to_string()]
            }
        )]
    );

    let list = backend.concat_list().unwrap();
    assert!(!list.contains("seg_2.nut"));
    assert!(list.contains("seg_0.nut") && list.contains("seg_4.nut"));
}

#[tokio::test]
async fn test_existing_output_fails_before_any_tool_runs() {
    let fixture = Fixture::new();
    std::fs::write(&fixture.output, b"precious").unwrap();
    let backend = Arc::new(StubBackend::new(&[(1.0, 2.0)]));

    let err = assert_err!(pipeline(&fixture, 2, &backend).run().await);

    assert!(matches!(err, WorkerError::Input(_)));
    assert_eq!(backend.invocations(), 0);
    assert_eq!(std::fs::read(&fixture.output).unwrap(), b"precious");
}

#[tokio::test]
async fn test_missing_input_fails_before_any_tool_runs() {
    let fixture = Fixture::new();
    std::fs::remove_file(&fixture.input).unwrap();
    let backend = Arc::new(StubBackend::new(&[]));

    let err = assert_err!(pipeline(&fixture, 2, &backend).run().await);

    assert!(err.is_startup_error());
    assert_eq!(backend.invocations(), 0);
}

#[tokio::test]
async fn test_encode_failure_aborts_run() {
    let fixture = Fixture::new();
    let mut backend = StubBackend::new(&[(1.0, 2.0), (3.0, 4.0)]);
    backend.failing_encodes.insert(2);
    let backend = Arc::new(backend);

    let err = assert_err!(pipeline(&fixture, 1, &backend).run().await);

    match &err {
        WorkerError::Adapter { stage, stderr, .. } => {
            assert_eq!(
                *stage,
                Stage::Encode {
                    index: 2,
                    start: 2.0
                }
            );
            assert!(stderr.contains("Conversion failed!"));
        }
        other => panic!("unexpected error: {}", other),
    }

    // Serial pool: the job after the failure never starts
    let started: Vec<usize> = backend.encoded_jobs().iter().map(|j| j.index).collect();
    assert_eq!(started, vec![0, 2]);
    assert!(backend.concat_list().is_none());
    assert!(!fixture.output.exists());
    assert!(fixture.work_root_is_empty());
}

#[tokio::test]
async fn test_detect_failure_surfaces_stderr() {
    let fixture = Fixture::new();
    let backend = Arc::new(StubBackend {
        detect: ToolOutput::failure(1, "input.mkv: Invalid data found when processing input"),
        ..Default::default()
    });

    let err = assert_err!(pipeline(&fixture, 2, &backend).run().await);

    assert!(matches!(
        err,
        WorkerError::Adapter {
            stage: Stage::Detect,
            ..
        }
    ));
    assert!(err.to_string().contains("Invalid data found"));
    assert_eq!(backend.invocations(), 1);
}

#[tokio::test]
async fn test_malformed_marker_is_a_parse_error() {
    let fixture = Fixture::new();
    let backend = Arc::new(StubBackend {
        detect: ToolOutput::success("", "[silencedetect @ 0x1] silence_start: soon\n"),
        ..Default::default()
    });

    let err = assert_err!(pipeline(&fixture, 2, &backend).run().await);

    assert!(matches!(err, WorkerError::Parse(_)));
    assert_eq!(backend.invocations(), 1);
}

#[tokio::test]
async fn test_all_clips_rejected_is_an_error() {
    let fixture = Fixture::new();
    let mut backend = StubBackend::new(&[(1.0, 2.0)]);
    backend.probes.insert(0, ToolOutput::failure(1, "moov atom not found"));
    backend.probes.insert(2, ToolOutput::success(SILENT_AUDIO_PROBE, ""));
    let backend = Arc::new(backend);

    let err = assert_err!(pipeline(&fixture, 2, &backend).run().await);

    assert!(matches!(err, WorkerError::EmptyManifest(_)));
    assert!(backend.concat_list().is_none());
    assert!(!fixture.output.exists());
}

#[tokio::test]
async fn test_zero_length_interval_is_not_encoded() {
    let fixture = Fixture::new();
    // Silence right at the start leaves a zero-length leading interval
    let backend = Arc::new(StubBackend::new(&[(0.0, 1.5)]));

    let summary = assert_ok!(pipeline(&fixture, 2, &backend).run().await);

    assert_eq!(summary.intervals, 3);
    assert_eq!(summary.jobs, 1);
    let jobs = backend.encoded_jobs();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].index, 2);
    assert_eq!(jobs[0].start, 1.5);
}

#[tokio::test]
async fn test_concat_failure_leaves_no_output() {
    let fixture = Fixture::new();
    let backend = Arc::new(StubBackend {
        concat_failure: true,
        ..StubBackend::new(&[(1.0, 2.0)])
    });

    let err = assert_err!(pipeline(&fixture, 2, &backend).run().await);

    assert!(matches!(
        err,
        WorkerError::Adapter {
            stage: Stage::Concat,
            ..
        }
    ));
    assert!(!fixture.output.exists());
    assert!(fixture.work_root_is_empty());
}

#[tokio::test]
async fn test_output_created_during_run_is_left_alone() {
    let fixture = Fixture::new();
    let backend = Arc::new(StubBackend {
        output_appears: Some(fixture.output.clone()),
        ..StubBackend::new(&[(1.0, 2.0)])
    });

    let err = assert_err!(pipeline(&fixture, 2, &backend).run().await);

    assert!(matches!(err, WorkerError::Input(_)));
    assert!(err.to_string().contains("appeared during the run"));
    assert!(backend.concat_list().is_some());
    assert_eq!(std::fs::read(&fixture.output).unwrap(), b"other");
    assert!(fixture.work_root_is_empty());
}

#[tokio::test]
async fn test_encode_failure_cancels_running_siblings() {
    let fixture = Fixture::new();
    let mut backend = StubBackend {
        encode_delay: Duration::from_millis(30),
        ..StubBackend::new(&[(1.0, 2.0), (3.0, 4.0)])
    };
    backend.failing_encodes.insert(0);
    backend.hanging_encodes.insert(2);
    let backend = Arc::new(backend);

    let run = pipeline(&fixture, 2, &backend);
    let result = tokio::time::timeout(Duration::from_secs(5), run.run())
        .await
        .expect("failed encode did not stop the hanging sibling");
    let err = assert_err!(result);

    match &err {
        WorkerError::Adapter { stage, .. } => {
            assert_eq!(
                *stage,
                Stage::Encode {
                    index: 0,
                    start: 0.0
                }
            );
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(backend.peak_encodes.load(Ordering::SeqCst), 2);
    // detect plus the two encodes; the last job never starts
    assert_eq!(backend.invocations(), 3);
    assert!(backend.concat_list().is_none());
    assert!(!fixture.output.exists());
    assert!(fixture.work_root_is_empty());
}

#[tokio::test]
async fn test_cancellation_stops_in_flight_encodes() {
    let fixture = Fixture::new();
    let mut backend = StubBackend::new(&[(1.0, 2.0), (3.0, 4.0)]);
    backend.hanging_encodes.extend([0, 2, 4]);
    let backend = Arc::new(backend);

    let (cancel_tx, cancel_rx) = watch::channel(false);
    let run = pipeline(&fixture, 2, &backend).with_cancel(cancel_rx);

    let handle = tokio::spawn(async move { run.run().await });
    while backend.peak_encodes.load(Ordering::SeqCst) < 2 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    cancel_tx.send(true).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("pipeline did not stop after cancellation")
        .unwrap();

    assert!(matches!(result, Err(WorkerError::Cancelled)));
    assert!(backend.concat_list().is_none());
    assert!(!fixture.output.exists());
    assert!(fixture.work_root_is_empty());
}
