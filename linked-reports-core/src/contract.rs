//! # contract: interfaces between the sync pipeline and the outside world
//!
//! This module defines the two seams of the pipeline:
//! - [`ReportStore`]: an object-storage location that reports are listed from,
//!   downloaded from and uploaded to (an S3 bucket in production, a mock or an
//!   in-memory fake in tests).
//! - [`SyncObserver`]: receives progress callbacks from the planner. The
//!   production implementation forwards them to `tracing`.
//!
//! ## Mocking & Testing
//! - Both traits are annotated for `mockall`; the mocks are exported behind the
//!   default `test-export-mocks` feature so integration tests can use them.
//!
//! ## Adding New Storage Backends
//! - Implement [`ReportStore`] for your client.
//! - Convert every backend error into a [`StoreError`]; the planner wraps it with
//!   the key or prefix that failed.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;

use crate::row_filter::FilterSummary;

/// Boxed error returned by storage implementations.
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// A single object returned by listing a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Full object key, including the listed prefix.
    pub key: String,
    pub last_modified: DateTime<Utc>,
}

impl StoredObject {
    pub fn new(key: impl Into<String>, last_modified: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            last_modified,
        }
    }
}

/// One object-storage location holding reports.
///
/// Implementations are addressed by bucket at construction time; every method
/// takes full object keys.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// List every object whose key starts with `prefix`.
    async fn list_objects(&self, prefix: &str) -> Result<Vec<StoredObject>, StoreError>;

    /// Download the object at `key` into the local file `dest`, creating or truncating it.
    async fn download(&self, key: &str, dest: &Path) -> Result<(), StoreError>;

    /// Upload the local file `src` to `key`, replacing any existing object.
    async fn upload(&self, src: &Path, key: &str) -> Result<(), StoreError>;
}

/// Progress callbacks emitted by the planner during a synchronisation pass.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait SyncObserver: Send + Sync {
    /// Both catalogs have been listed.
    fn catalogs_loaded(&self, source_reports: usize, target_reports: usize);

    /// A source report is about to be compared against the target catalog.
    fn report_checked(&self, source_relative_path: &str);

    /// A source report is missing or stale in the target and will be transcoded.
    fn report_processing(&self, source_relative_path: &str);

    /// The row filter finished for the report currently being processed.
    fn rows_filtered(&self, summary: &FilterSummary);

    /// The filtered report was uploaded under `target_relative_path`.
    fn report_saved(&self, target_relative_path: &str);

    /// The target already holds an up-to-date copy at `target_relative_path`.
    fn report_skipped(&self, target_relative_path: &str);
}
