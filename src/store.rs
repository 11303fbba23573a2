//! Collaborator contracts around the transform core.
//!
//! The core never touches storage. Whoever wraps it supplies a [`BlobStore`]
//! (raw bytes in and out by opaque reference) and a [`MetadataRecorder`]
//! (one [`TransformRecord`] per finished transform). Both are plain traits so
//! a web service can plug in object storage and a database, while the CLI
//! and tests use the filesystem and in-memory versions here.
//!
//! Stored blobs are content-addressed: the reference is the SHA-256 of the
//! encoded bytes plus `.png`, so storing the same result twice is idempotent.

use crate::imaging::{ErrorKind, FillColor, FitPolicy, ResultImage, Status, TransformSpec};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Blob not found: {0}")]
    NotFound(String),
    #[error("Invalid blob reference: {0}")]
    InvalidReference(String),
}

/// Raw byte storage addressed by opaque string references.
pub trait BlobStore: Sync {
    fn fetch(&self, reference: &str) -> Result<Vec<u8>, StoreError>;

    /// Persist `bytes` and return the reference to fetch them back.
    fn store(&self, bytes: &[u8]) -> Result<String, StoreError>;
}

/// Durable log of finished transforms.
///
/// Called at most once per transform. Failures are logged by the caller and
/// otherwise ignored.
pub trait MetadataRecorder: Sync {
    fn record(&self, record: &TransformRecord) -> Result<(), StoreError>;
}

/// What was asked for, and what came out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformRecord {
    pub source_reference: String,
    pub target_width: u32,
    pub target_height: u32,
    pub policy: FitPolicy,
    pub preserve_aspect_ratio: bool,
    pub fill_color: FillColor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_reference: Option<String>,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl TransformRecord {
    pub fn new(
        source_reference: &str,
        spec: &TransformSpec,
        result: &ResultImage,
        result_reference: Option<String>,
    ) -> Self {
        let (error_kind, reason) = match result {
            ResultImage::Success(_) => (None, None),
            ResultImage::Failed(failure) => (Some(failure.kind), Some(failure.reason.clone())),
        };
        Self {
            source_reference: source_reference.to_string(),
            target_width: spec.target.width,
            target_height: spec.target.height,
            policy: spec.policy,
            preserve_aspect_ratio: spec.preserve_aspect_ratio,
            fill_color: spec.fill_color,
            result_reference,
            status: result.status(),
            error_kind,
            reason,
        }
    }
}

/// Content-derived reference for an encoded result.
pub fn content_reference(bytes: &[u8]) -> String {
    format!("{:x}.png", Sha256::digest(bytes))
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Blob store rooted at a directory. References are paths relative to the
/// root and may not escape it.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Open a store at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, reference: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(reference);
        let is_plain = !reference.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !is_plain {
            return Err(StoreError::InvalidReference(reference.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

impl BlobStore for FsBlobStore {
    fn fetch(&self, reference: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.resolve(reference)?;
        fs::read(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => StoreError::NotFound(reference.to_string()),
            _ => StoreError::Io(e),
        })
    }

    fn store(&self, bytes: &[u8]) -> Result<String, StoreError> {
        let reference = content_reference(bytes);
        let path = self.resolve(&reference)?;
        if !path.exists() {
            fs::write(&path, bytes)?;
        }
        Ok(reference)
    }
}

/// In-memory blob store.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a blob under a caller-chosen reference.
    pub fn insert(&self, reference: impl Into<String>, bytes: Vec<u8>) {
        lock(&self.blobs).insert(reference.into(), bytes);
    }

    pub fn len(&self) -> usize {
        lock(&self.blobs).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BlobStore for MemoryBlobStore {
    fn fetch(&self, reference: &str) -> Result<Vec<u8>, StoreError> {
        lock(&self.blobs)
            .get(reference)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(reference.to_string()))
    }

    fn store(&self, bytes: &[u8]) -> Result<String, StoreError> {
        let reference = content_reference(bytes);
        lock(&self.blobs)
            .entry(reference.clone())
            .or_insert_with(|| bytes.to_vec());
        Ok(reference)
    }
}

/// Appends one JSON object per line to a file.
#[derive(Debug)]
pub struct JsonlRecorder {
    file: Mutex<File>,
}

impl JsonlRecorder {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl MetadataRecorder for JsonlRecorder {
    fn record(&self, record: &TransformRecord) -> Result<(), StoreError> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        lock(&self.file).write_all(line.as_bytes())?;
        Ok(())
    }
}

/// Collects records in memory.
#[derive(Debug, Default)]
pub struct MemoryRecorder {
    records: Mutex<Vec<TransformRecord>>,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<TransformRecord> {
        lock(&self.records).clone()
    }
}

impl MetadataRecorder for MemoryRecorder {
    fn record(&self, record: &TransformRecord) -> Result<(), StoreError> {
        lock(&self.records).push(record.clone());
        Ok(())
    }
}

/// Discards every record.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRecorder;

impl MetadataRecorder for NullRecorder {
    fn record(&self, _record: &TransformRecord) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::{TransformFailure, TransformedImage};
    use image::RgbaImage;
    use tempfile::TempDir;

    fn spec() -> TransformSpec {
        TransformSpec::new(64, 32, FitPolicy::PadToFit)
    }

    fn success() -> ResultImage {
        ResultImage::Success(TransformedImage {
            bytes: vec![1, 2, 3],
            width: 64,
            height: 32,
            pixels: RgbaImage::new(64, 32),
        })
    }

    fn failure() -> ResultImage {
        ResultImage::Failed(TransformFailure {
            kind: ErrorKind::Decode,
            reason: "bad bytes".into(),
        })
    }

    #[test]
    fn content_reference_is_sha256_hex() {
        let reference = content_reference(b"");
        assert_eq!(
            reference,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855.png"
        );
    }

    #[test]
    fn fs_store_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let store = FsBlobStore::open(tmp.path().join("blobs")).unwrap();

        let reference = store.store(b"png bytes").unwrap();
        assert_eq!(reference, content_reference(b"png bytes"));
        assert_eq!(store.fetch(&reference).unwrap(), b"png bytes");
        assert!(store.root().join(&reference).exists());
    }

    #[test]
    fn fs_store_same_bytes_same_reference() {
        let tmp = TempDir::new().unwrap();
        let store = FsBlobStore::open(tmp.path()).unwrap();
        assert_eq!(store.store(b"abc").unwrap(), store.store(b"abc").unwrap());
    }

    #[test]
    fn fs_fetch_missing_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let store = FsBlobStore::open(tmp.path()).unwrap();
        assert!(matches!(store.fetch("nope.jpg"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn fs_store_rejects_references_escaping_root() {
        let tmp = TempDir::new().unwrap();
        let store = FsBlobStore::open(tmp.path().join("root")).unwrap();
        for reference in ["../secret", "/etc/passwd", "a/../../b", "", "./x"] {
            assert!(
                matches!(store.fetch(reference), Err(StoreError::InvalidReference(_))),
                "{reference:?} should be rejected"
            );
        }
    }

    #[test]
    fn fs_store_allows_nested_relative_references() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("uploads")).unwrap();
        fs::write(tmp.path().join("uploads/cat.jpg"), b"meow").unwrap();

        let store = FsBlobStore::open(tmp.path()).unwrap();
        assert_eq!(store.fetch("uploads/cat.jpg").unwrap(), b"meow");
    }

    #[test]
    fn memory_store_roundtrip_and_seed() {
        let store = MemoryBlobStore::new();
        store.insert("source.png", vec![7, 7]);
        assert_eq!(store.fetch("source.png").unwrap(), vec![7, 7]);

        let reference = store.store(&[1, 2]).unwrap();
        assert_eq!(store.fetch(&reference).unwrap(), vec![1, 2]);
        assert_eq!(store.len(), 2);
        assert!(matches!(store.fetch("missing"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn record_from_success_has_no_error_fields() {
        let record = TransformRecord::new("in.jpg", &spec(), &success(), Some("out.png".into()));
        assert_eq!(record.status, Status::Success);
        assert_eq!(record.result_reference.as_deref(), Some("out.png"));
        assert_eq!(record.error_kind, None);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["policy"], "pad-to-fit");
        assert_eq!(json["fill_color"], "#ffffffff");
        assert_eq!(json["status"], "success");
        assert!(json.get("error_kind").is_none());
    }

    #[test]
    fn record_from_failure_carries_kind_and_reason() {
        let record = TransformRecord::new("in.jpg", &spec(), &failure(), None);
        assert_eq!(record.status, Status::Failed);
        assert_eq!(record.error_kind, Some(ErrorKind::Decode));
        assert_eq!(record.reason.as_deref(), Some("bad bytes"));

        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("result_reference").is_none());
        assert_eq!(json["error_kind"], "decode");
    }

    #[test]
    fn jsonl_recorder_appends_one_line_per_record() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("logs/records.jsonl");
        let recorder = JsonlRecorder::open(&path).unwrap();

        recorder
            .record(&TransformRecord::new("a.png", &spec(), &success(), Some("r.png".into())))
            .unwrap();
        recorder
            .record(&TransformRecord::new("b.png", &spec(), &failure(), None))
            .unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let records: Vec<TransformRecord> = content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].source_reference, "a.png");
        assert_eq!(records[1].status, Status::Failed);
    }

    #[test]
    fn memory_recorder_collects() {
        let recorder = MemoryRecorder::new();
        recorder
            .record(&TransformRecord::new("a", &spec(), &failure(), None))
            .unwrap();
        assert_eq!(recorder.records().len(), 1);
    }
}
