//! [`SyncObserver`] implementation that reports progress as `tracing` events.

use tracing::info;

use crate::contract::SyncObserver;
use crate::row_filter::FilterSummary;

/// Emits one `info` event per planner callback.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl SyncObserver for TracingObserver {
    fn catalogs_loaded(&self, source_reports: usize, target_reports: usize) {
        info!(source_reports, target_reports, "[SYNC] Found source and target reports");
    }

    fn report_checked(&self, source_relative_path: &str) {
        info!(source_relative_path, "[SYNC] Checking report");
    }

    fn report_processing(&self, source_relative_path: &str) {
        info!(source_relative_path, "[SYNC] Processing report");
    }

    fn rows_filtered(&self, summary: &FilterSummary) {
        info!(
            rows_read = summary.rows_read,
            rows_dropped = summary.rows_dropped,
            rows_kept = summary.rows_kept,
            "[SYNC] Filtered report rows"
        );
    }

    fn report_saved(&self, target_relative_path: &str) {
        info!(target_relative_path, "[SYNC] Saved processed report");
    }

    fn report_skipped(&self, target_relative_path: &str) {
        info!(target_relative_path, "[SYNC] Report is already processed");
    }
}
