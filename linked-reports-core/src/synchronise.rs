//! High-level pipeline: catalog both buckets, then download → transcode → upload every stale report.
//!
//! This module provides the planner that mirrors reports from a source location
//! into a target location. One pass:
//!   - Lists the source and target prefixes into [`ReportCatalog`]s
//!   - Maps each source report to its target path by renaming the report name
//!   - Processes a report when the target copy is missing or strictly older
//!   - Skips it otherwise, and never touches objects that exist only in the target
//!
//! # Responsibilities
//! - Strictly sequential: a report is fully uploaded before the next one starts
//! - Fail-fast: the first download, transcode or upload error aborts the pass.
//!   Reports already uploaded stay uploaded, and the next run picks up the rest
//!   because the catalog comparison only selects unfinished work
//! - Progress is reported through the injected [`SyncObserver`]
//!
//! # Navigation
//! - Main entrypoint: [`synchronise`]
//! - Staleness rule: [`needs_processing`]

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::catalog::{find_reports, ReportCatalog, ReportEntry};
use crate::config::{ReportNames, SyncConfig, UsageAccountSet};
use crate::contract::{ReportStore, SyncObserver};
use crate::error::SyncError;
use crate::row_filter::FilterSummary;
use crate::transcode::transcode_report;

/// Outcome of one synchronisation pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SynchroniseReport {
    pub processed: Vec<ProcessedReport>,
    /// Target relative paths that were already up to date.
    pub skipped: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessedReport {
    pub source_relative_path: String,
    pub target_relative_path: String,
    pub source_last_modified: DateTime<Utc>,
    pub summary: FilterSummary,
}

/// A report needs processing when the target has no copy, or its copy is strictly older.
pub fn needs_processing(source: &ReportEntry, target: Option<&ReportEntry>) -> bool {
    target.map_or(true, |target| target.last_modified < source.last_modified)
}

pub async fn synchronise<S, T, O>(
    config: &SyncConfig,
    source_store: &S,
    target_store: &T,
    observer: &O,
) -> Result<SynchroniseReport, SyncError>
where
    S: ReportStore + ?Sized,
    T: ReportStore + ?Sized,
    O: SyncObserver + ?Sized,
{
    info!("[SYNC] Starting report synchronisation");

    let source_prefix = config.source.prefix();
    let target_prefix = config.target.prefix();
    let names = config.report_names();

    let source_reports: ReportCatalog = find_reports(source_store, &source_prefix).await?;
    let target_reports: ReportCatalog = find_reports(target_store, &target_prefix).await?;
    observer.catalogs_loaded(source_reports.len(), target_reports.len());

    let mut report = SynchroniseReport::default();
    for (source_relative_path, source_entry) in &source_reports {
        let target_relative_path = names.rename(source_relative_path);
        observer.report_checked(source_relative_path);

        if !needs_processing(source_entry, target_reports.get(&target_relative_path)) {
            observer.report_skipped(&target_relative_path);
            report.skipped.push(target_relative_path);
            continue;
        }

        observer.report_processing(source_relative_path);
        let target_key = format!("{target_prefix}{target_relative_path}");
        let summary = process_report(
            source_store,
            &source_entry.key,
            target_store,
            &target_key,
            &names,
            &config.usage_account_ids,
            observer,
        )
        .await?;
        observer.report_saved(&target_relative_path);

        report.processed.push(ProcessedReport {
            source_relative_path: source_relative_path.clone(),
            target_relative_path,
            source_last_modified: source_entry.last_modified,
            summary,
        });
    }

    info!(
        processed = report.processed.len(),
        skipped = report.skipped.len(),
        "[SYNC] Synchronisation complete"
    );
    Ok(report)
}

/// Downloads one report, filters it on the blocking pool and uploads the result.
async fn process_report<S, T, O>(
    source_store: &S,
    source_key: &str,
    target_store: &T,
    target_key: &str,
    names: &ReportNames,
    accounts: &UsageAccountSet,
    observer: &O,
) -> Result<FilterSummary, SyncError>
where
    S: ReportStore + ?Sized,
    T: ReportStore + ?Sized,
    O: SyncObserver + ?Sized,
{
    // Removed when dropped, including on every early return below.
    let work_dir = tempfile::tempdir()?;
    let source_zip = work_dir.path().join("report.zip");
    let target_zip = work_dir.path().join("new_report.zip");

    source_store
        .download(source_key, &source_zip)
        .await
        .map_err(|source| SyncError::Download {
            key: source_key.to_string(),
            source,
        })?;
    debug!(key = source_key, "[SYNC] Downloaded source report");

    let transcoded = {
        let source_zip = source_zip.clone();
        let target_zip = target_zip.clone();
        let names = names.clone();
        let accounts = accounts.clone();
        tokio::task::spawn_blocking(move || {
            transcode_report(&source_zip, &target_zip, &names, &accounts)
        })
        .await?
    }
    .map_err(|source| SyncError::Transcode {
        key: source_key.to_string(),
        source,
    })?;
    observer.rows_filtered(&transcoded.summary);

    target_store
        .upload(&target_zip, target_key)
        .await
        .map_err(|source| SyncError::Upload {
            key: target_key.to_string(),
            source,
        })?;
    debug!(key = target_key, member = %transcoded.member_name, "[SYNC] Uploaded filtered report");

    Ok(transcoded.summary)
}
