//! Job processing around the transform core.
//!
//! A [`Job`] names a source blob and a (possibly partial) [`TransformRequest`].
//! [`process_job`] runs one job end to end:
//!
//! ```text
//! resolve request ─► fetch source ─► transform ─► store result ─► record
//! ```
//!
//! - Fetch and store failures are reported but never recorded; the transform
//!   itself did not produce a terminal result worth persisting.
//! - A request that does not resolve (zero or negative size, bad color) fails
//!   as a validation error before the source is fetched.
//! - Recorder errors are logged and otherwise ignored.
//!
//! ## Parallel Processing
//!
//! [`process_batch`] runs jobs in parallel with [rayon](https://docs.rs/rayon).
//! Reports come back in job order regardless of completion order, and progress
//! events stream through an optional channel as jobs finish.

use crate::config::DefaultsConfig;
use crate::imaging::{
    FitPolicy, ImageBackend, ResultImage, TransformFailure, TransformRequest, transform_with,
};
use crate::store::{BlobStore, MetadataRecorder, TransformRecord};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One unit of work from a job file.
///
/// Serialized flat: `source` next to the request fields. Unknown keys are
/// rejected, so a misspelled field fails the load instead of silently falling
/// back to a default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "JobEntry")]
pub struct Job {
    /// Blob reference of the source image.
    pub source: String,
    #[serde(flatten)]
    pub request: TransformRequest,
}

/// Wire shape of a [`Job`]. `flatten` cannot be combined with
/// `deny_unknown_fields`, so the request fields are spelled out here.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct JobEntry {
    source: String,
    #[serde(default)]
    width: Option<i64>,
    #[serde(default)]
    height: Option<i64>,
    #[serde(default)]
    policy: Option<FitPolicy>,
    #[serde(default)]
    preserve_aspect_ratio: Option<bool>,
    #[serde(default)]
    fill_color: Option<String>,
}

impl From<JobEntry> for Job {
    fn from(entry: JobEntry) -> Self {
        Job {
            source: entry.source,
            request: TransformRequest {
                width: entry.width,
                height: entry.height,
                policy: entry.policy,
                preserve_aspect_ratio: entry.preserve_aspect_ratio,
                fill_color: entry.fill_color,
            },
        }
    }
}

impl Job {
    pub fn new(source: impl Into<String>, request: TransformRequest) -> Self {
        Self {
            source: source.into(),
            request,
        }
    }
}

/// Read a JSON array of jobs.
pub fn load_jobs(path: &Path) -> Result<Vec<Job>, ProcessError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    /// Transformed and persisted.
    Stored {
        result_reference: String,
        width: u32,
        height: u32,
    },
    /// The transform ran (or the request was rejected) and failed.
    Failed(TransformFailure),
    /// The source could not be fetched.
    FetchFailed(String),
    /// The transform succeeded but the result could not be persisted.
    StoreFailed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobReport {
    pub source: String,
    pub outcome: JobOutcome,
}

impl JobReport {
    fn new(source: &str, outcome: JobOutcome) -> Self {
        Self {
            source: source.to_string(),
            outcome,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, JobOutcome::Stored { .. })
    }
}

/// Progress events streamed while a batch runs.
#[derive(Debug, Clone)]
pub enum ProcessEvent {
    BatchStarted { job_count: usize },
    JobFinished { index: usize, report: JobReport },
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchSummary {
    pub reports: Vec<JobReport>,
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchSummary {
    fn from_reports(reports: Vec<JobReport>) -> Self {
        let succeeded = reports.iter().filter(|r| r.is_success()).count();
        Self {
            failed: reports.len() - succeeded,
            succeeded,
            reports,
        }
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

/// Run one job end to end. Never panics on bad input; every failure becomes
/// a [`JobOutcome`].
pub fn process_job(
    backend: &impl ImageBackend,
    store: &impl BlobStore,
    recorder: &impl MetadataRecorder,
    job: &Job,
    defaults: &DefaultsConfig,
) -> JobReport {
    let spec = match job.request.resolve(defaults) {
        Ok(spec) => spec,
        Err(e) => {
            warn!(source = %job.source, error = %e, "request rejected");
            let failure = TransformFailure {
                kind: e.kind(),
                reason: e.to_string(),
            };
            return JobReport::new(&job.source, JobOutcome::Failed(failure));
        }
    };

    let source = match store.fetch(&job.source) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(source = %job.source, error = %e, "fetch failed");
            return JobReport::new(&job.source, JobOutcome::FetchFailed(e.to_string()));
        }
    };

    let result = transform_with(backend, &source, &spec);

    let (outcome, result_reference) = match &result {
        ResultImage::Success(image) => match store.store(&image.bytes) {
            Ok(reference) => (
                JobOutcome::Stored {
                    result_reference: reference.clone(),
                    width: image.width,
                    height: image.height,
                },
                Some(reference),
            ),
            Err(e) => {
                warn!(source = %job.source, error = %e, "store failed");
                return JobReport::new(&job.source, JobOutcome::StoreFailed(e.to_string()));
            }
        },
        ResultImage::Failed(failure) => (JobOutcome::Failed(failure.clone()), None),
    };

    let record = TransformRecord::new(&job.source, &spec, &result, result_reference);
    if let Err(e) = recorder.record(&record) {
        warn!(source = %job.source, error = %e, "recording transform failed");
    }

    info!(
        source = %job.source,
        target = %spec.target,
        policy = %spec.policy,
        status = ?result.status(),
        "job finished"
    );
    JobReport::new(&job.source, outcome)
}

/// Run `jobs` in parallel. The returned reports are in job order.
pub fn process_batch(
    backend: &impl ImageBackend,
    store: &impl BlobStore,
    recorder: &impl MetadataRecorder,
    jobs: &[Job],
    defaults: &DefaultsConfig,
    events: Option<Sender<ProcessEvent>>,
) -> BatchSummary {
    if let Some(tx) = &events {
        tx.send(ProcessEvent::BatchStarted {
            job_count: jobs.len(),
        })
        .ok();
    }

    let reports: Vec<JobReport> = jobs
        .par_iter()
        .enumerate()
        .map(|(index, job)| {
            let report = process_job(backend, store, recorder, job, defaults);
            if let Some(tx) = &events {
                tx.send(ProcessEvent::JobFinished {
                    index,
                    report: report.clone(),
                })
                .ok();
            }
            report
        })
        .collect();

    let summary = BatchSummary::from_reports(reports);
    info!(
        succeeded = summary.succeeded,
        failed = summary.failed,
        "batch finished"
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::{ErrorKind, RustBackend, Status};
    use crate::store::{MemoryBlobStore, MemoryRecorder, StoreError};
    use crate::test_helpers::{checkerboard, encode_png};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use tempfile::TempDir;

    fn request(width: i64, height: i64, policy: FitPolicy) -> TransformRequest {
        TransformRequest {
            width: Some(width),
            height: Some(height),
            policy: Some(policy),
            ..Default::default()
        }
    }

    fn seeded_store() -> MemoryBlobStore {
        let store = MemoryBlobStore::new();
        store.insert("wide.png", encode_png(&checkerboard(100, 50, 10)));
        store.insert("garbage.png", b"not an image".to_vec());
        store
    }

    struct FailingRecorder;

    impl MetadataRecorder for FailingRecorder {
        fn record(&self, _record: &TransformRecord) -> Result<(), StoreError> {
            Err(StoreError::NotFound("records".into()))
        }
    }

    struct ReadOnlyStore(MemoryBlobStore);

    impl BlobStore for ReadOnlyStore {
        fn fetch(&self, reference: &str) -> Result<Vec<u8>, StoreError> {
            self.0.fetch(reference)
        }

        fn store(&self, _bytes: &[u8]) -> Result<String, StoreError> {
            Err(StoreError::Io(std::io::Error::other("read-only")))
        }
    }

    #[test]
    fn successful_job_is_stored_and_recorded_once() {
        let store = seeded_store();
        let recorder = MemoryRecorder::new();
        let job = Job::new("wide.png", request(64, 64, FitPolicy::PadToFit));

        let report = process_job(
            &RustBackend::new(),
            &store,
            &recorder,
            &job,
            &DefaultsConfig::default(),
        );

        let JobOutcome::Stored {
            result_reference,
            width,
            height,
        } = &report.outcome
        else {
            panic!("expected stored, got {:?}", report.outcome);
        };
        assert_eq!((*width, *height), (64, 64));
        assert!(store.fetch(result_reference).is_ok());

        let records = recorder.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, Status::Success);
        assert_eq!(records[0].result_reference.as_ref(), Some(result_reference));
        assert_eq!(records[0].policy, FitPolicy::PadToFit);
    }

    #[test]
    fn missing_source_is_fetch_failure_without_record() {
        let recorder = MemoryRecorder::new();
        let job = Job::new("nope.png", request(10, 10, FitPolicy::Stretch));

        let report = process_job(
            &RustBackend::new(),
            &seeded_store(),
            &recorder,
            &job,
            &DefaultsConfig::default(),
        );

        assert!(matches!(report.outcome, JobOutcome::FetchFailed(_)));
        assert!(recorder.records().is_empty());
    }

    #[test]
    fn undecodable_source_is_recorded_as_failed() {
        let store = seeded_store();
        let recorder = MemoryRecorder::new();
        let job = Job::new("garbage.png", request(10, 10, FitPolicy::CropToFill));

        let report = process_job(
            &RustBackend::new(),
            &store,
            &recorder,
            &job,
            &DefaultsConfig::default(),
        );

        match &report.outcome {
            JobOutcome::Failed(failure) => assert_eq!(failure.kind, ErrorKind::Decode),
            other => panic!("expected decode failure, got {other:?}"),
        }
        let records = recorder.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, Status::Failed);
        assert_eq!(records[0].error_kind, Some(ErrorKind::Decode));
        assert_eq!(records[0].result_reference, None);
        // Only the two seeded blobs; nothing was stored.
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn invalid_request_fails_validation() {
        let recorder = MemoryRecorder::new();
        let job = Job::new("wide.png", request(0, -5, FitPolicy::PadToFit));

        let report = process_job(
            &RustBackend::new(),
            &seeded_store(),
            &recorder,
            &job,
            &DefaultsConfig::default(),
        );

        match &report.outcome {
            JobOutcome::Failed(failure) => assert_eq!(failure.kind, ErrorKind::Validation),
            other => panic!("expected validation failure, got {other:?}"),
        }
        assert!(recorder.records().is_empty());
    }

    struct CountingStore {
        inner: MemoryBlobStore,
        fetches: AtomicUsize,
    }

    impl BlobStore for CountingStore {
        fn fetch(&self, reference: &str) -> Result<Vec<u8>, StoreError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.inner.fetch(reference)
        }

        fn store(&self, bytes: &[u8]) -> Result<String, StoreError> {
            self.inner.store(bytes)
        }
    }

    #[test]
    fn invalid_request_is_rejected_before_fetching() {
        let store = CountingStore {
            inner: seeded_store(),
            fetches: AtomicUsize::new(0),
        };
        let bad = TransformRequest {
            fill_color: Some("not-a-color".into()),
            ..request(10, 10, FitPolicy::PadToFit)
        };

        for job in [
            Job::new("wide.png", request(-1, 10, FitPolicy::Stretch)),
            Job::new("wide.png", bad),
        ] {
            let report = process_job(
                &RustBackend::new(),
                &store,
                &MemoryRecorder::new(),
                &job,
                &DefaultsConfig::default(),
            );
            assert!(matches!(report.outcome, JobOutcome::Failed(_)));
        }
        assert_eq!(store.fetches.load(Ordering::SeqCst), 0);

        let job = Job::new("wide.png", request(10, 10, FitPolicy::Stretch));
        process_job(&RustBackend::new(), &store, &MemoryRecorder::new(), &job, &DefaultsConfig::default());
        assert_eq!(store.fetches.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn missing_fields_come_from_defaults() {
        let store = seeded_store();
        let defaults = DefaultsConfig {
            width: 40,
            height: 30,
            ..DefaultsConfig::default()
        };
        let job = Job::new("wide.png", TransformRequest::default());

        let report = process_job(&RustBackend::new(), &store, &MemoryRecorder::new(), &job, &defaults);

        assert!(matches!(
            report.outcome,
            JobOutcome::Stored {
                width: 40,
                height: 30,
                ..
            }
        ));
    }

    #[test]
    fn recorder_failure_does_not_fail_the_job() {
        let job = Job::new("wide.png", request(20, 20, FitPolicy::CropToFill));
        let report = process_job(
            &RustBackend::new(),
            &seeded_store(),
            &FailingRecorder,
            &job,
            &DefaultsConfig::default(),
        );
        assert!(report.is_success());
    }

    #[test]
    fn store_failure_is_reported_without_record() {
        let recorder = MemoryRecorder::new();
        let job = Job::new("wide.png", request(20, 20, FitPolicy::Stretch));
        let report = process_job(
            &RustBackend::new(),
            &ReadOnlyStore(seeded_store()),
            &recorder,
            &job,
            &DefaultsConfig::default(),
        );
        assert!(matches!(report.outcome, JobOutcome::StoreFailed(_)));
        assert!(recorder.records().is_empty());
    }

    #[test]
    fn batch_preserves_job_order_and_streams_events() {
        let store = seeded_store();
        let recorder = MemoryRecorder::new();
        let jobs = vec![
            Job::new("wide.png", request(30, 30, FitPolicy::PadToFit)),
            Job::new("nope.png", request(30, 30, FitPolicy::PadToFit)),
            Job::new("garbage.png", request(30, 30, FitPolicy::PadToFit)),
            Job::new("wide.png", request(10, 40, FitPolicy::CropToFill)),
        ];
        let (tx, rx) = mpsc::channel();

        let summary = process_batch(
            &RustBackend::new(),
            &store,
            &recorder,
            &jobs,
            &DefaultsConfig::default(),
            Some(tx),
        );

        let sources: Vec<&str> = summary.reports.iter().map(|r| r.source.as_str()).collect();
        assert_eq!(sources, ["wide.png", "nope.png", "garbage.png", "wide.png"]);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 2);
        assert!(!summary.all_succeeded());
        // The fetch failure is not recorded.
        assert_eq!(recorder.records().len(), 3);

        let events: Vec<ProcessEvent> = rx.iter().collect();
        assert!(matches!(events[0], ProcessEvent::BatchStarted { job_count: 4 }));
        let mut finished: Vec<usize> = events
            .iter()
            .filter_map(|e| match e {
                ProcessEvent::JobFinished { index, .. } => Some(*index),
                _ => None,
            })
            .collect();
        finished.sort_unstable();
        assert_eq!(finished, [0, 1, 2, 3]);
    }

    #[test]
    fn load_jobs_reads_flattened_requests() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("jobs.json");
        std::fs::write(
            &path,
            r##"[
                {"source": "a.jpg", "width": 300, "height": 200, "policy": "crop-to-fill"},
                {"source": "b.png", "fill_color": "#000"}
            ]"##,
        )
        .unwrap();

        let jobs = load_jobs(&path).unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].source, "a.jpg");
        assert_eq!(jobs[0].request.width, Some(300));
        assert_eq!(jobs[0].request.policy, Some(FitPolicy::CropToFill));
        assert_eq!(jobs[1].request.fill_color.as_deref(), Some("#000"));
        assert_eq!(jobs[1].request.width, None);
    }

    #[test]
    fn load_jobs_rejects_misspelled_fields() {
        let tmp = TempDir::new().unwrap();
        for entry in [
            r#"[{"source": "a.jpg", "widht": 300}]"#,
            r#"[{"source": "a.jpg", "crop": true}]"#,
        ] {
            let path = tmp.path().join("jobs.json");
            std::fs::write(&path, entry).unwrap();

            let err = load_jobs(&path).unwrap_err();
            assert!(matches!(err, ProcessError::Json(_)), "{entry}: {err}");
        }
    }

    #[test]
    fn job_serializes_flat_and_reloads() {
        let job = Job::new("a.jpg", request(300, 200, FitPolicy::CropToFill));
        let json = serde_json::to_string(&job).unwrap();
        assert!(json.contains(r#""width":300"#), "{json}");

        let back: Job = serde_json::from_str(&json).unwrap();
        assert_eq!(back, job);
    }
}
