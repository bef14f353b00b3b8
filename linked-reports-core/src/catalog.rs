//! Report catalog: the reports stored under one prefix, keyed by relative path.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::{debug, trace};

use crate::contract::ReportStore;
use crate::error::SyncError;

/// File-name suffix shared by every report archive.
pub const REPORT_SUFFIX: &str = ".csv.zip";

/// A report object found under a catalog prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportEntry {
    /// Full object key.
    pub key: String,
    /// Key with the catalog prefix removed.
    pub relative_path: String,
    pub last_modified: DateTime<Utc>,
}

/// Reports under one prefix, keyed by their path relative to that prefix.
pub type ReportCatalog = BTreeMap<String, ReportEntry>;

/// Lists `prefix` in `store` and keeps every object whose relative path ends in `.csv.zip`.
pub async fn find_reports<S>(store: &S, prefix: &str) -> Result<ReportCatalog, SyncError>
where
    S: ReportStore + ?Sized,
{
    let objects = store
        .list_objects(prefix)
        .await
        .map_err(|source| SyncError::Listing {
            prefix: prefix.to_string(),
            source,
        })?;

    let listed = objects.len();
    let mut reports = ReportCatalog::new();
    for object in objects {
        let Some(relative_path) = object.key.strip_prefix(prefix) else {
            trace!(key = %object.key, "Ignoring object outside of prefix");
            continue;
        };
        if !relative_path.ends_with(REPORT_SUFFIX) {
            continue;
        }
        let relative_path = relative_path.to_string();
        reports.insert(
            relative_path.clone(),
            ReportEntry {
                key: object.key,
                relative_path,
                last_modified: object.last_modified,
            },
        );
    }

    debug!(prefix, listed, reports = reports.len(), "Built report catalog");
    Ok(reports)
}
