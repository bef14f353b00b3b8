//! Every transcode and planner exit path must leave the system temp directory as it found it.
//!
//! Each test points `TMPDIR` at its own scratch directory, so they all run serially.

use std::env;
use std::ffi::OsString;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{TimeZone, Utc};
use linked_reports_core::config::{ReportLocation, ReportNames, SyncConfig, UsageAccountSet};
use linked_reports_core::contract::{MockReportStore, StoredObject};
use linked_reports_core::error::{SyncError, TranscodeError};
use linked_reports_core::observer::TracingObserver;
use linked_reports_core::synchronise::synchronise;
use linked_reports_core::transcode::transcode_report;
use serial_test::serial;
use tempfile::{tempdir, TempDir};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const REPORT_CSV: &str = "identity/LineItemId,lineItem/UsageAccountId\r\na1,111\r\na2,222\r\n";

/// Redirects `TMPDIR` to a fresh directory until dropped.
struct ScratchTmpDir {
    dir: TempDir,
    previous: Option<OsString>,
}

impl ScratchTmpDir {
    fn install() -> Self {
        let dir = tempdir().unwrap();
        let previous = env::var_os("TMPDIR");
        env::set_var("TMPDIR", dir.path());
        Self { dir, previous }
    }

    fn leftovers(&self) -> Vec<PathBuf> {
        std::fs::read_dir(self.dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect()
    }
}

impl Drop for ScratchTmpDir {
    fn drop(&mut self) {
        match &self.previous {
            Some(value) => env::set_var("TMPDIR", value),
            None => env::remove_var("TMPDIR"),
        }
    }
}

fn write_zip(path: &Path, members: &[(&str, &str)]) {
    let mut zip = ZipWriter::new(File::create(path).unwrap());
    for (name, content) in members {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

/// Runs `transcode_report` on an archive with `members` and returns its result plus any temp leftovers.
fn transcode_in_scratch(
    members: &[(&str, &str)],
) -> (Result<(), TranscodeError>, Vec<PathBuf>) {
    // Fixtures live outside the scratch directory.
    let fixtures = tempdir().unwrap();
    let source = fixtures.path().join("source.zip");
    let target = fixtures.path().join("target.zip");
    write_zip(&source, members);

    let scratch = ScratchTmpDir::install();
    let result = transcode_report(
        &source,
        &target,
        &ReportNames::new("master", "linked"),
        &UsageAccountSet::parse("111"),
    )
    .map(|_| ());
    let leftovers = scratch.leftovers();
    (result, leftovers)
}

#[test]
#[serial]
fn test_transcode_success_removes_work_dir() {
    let (result, leftovers) = transcode_in_scratch(&[("master-1.csv", REPORT_CSV)]);

    assert!(result.is_ok(), "got {result:?}");
    assert!(leftovers.is_empty(), "Leftover temp entries: {leftovers:?}");
}

#[test]
#[serial]
fn test_transcode_missing_header_removes_work_dir() {
    let (result, leftovers) = transcode_in_scratch(&[("master-1.csv", "")]);

    assert!(matches!(result, Err(TranscodeError::MissingHeader)), "got {result:?}");
    assert!(leftovers.is_empty(), "Leftover temp entries: {leftovers:?}");
}

#[test]
#[serial]
fn test_transcode_archive_shape_failure_removes_work_dir() {
    let (result, leftovers) =
        transcode_in_scratch(&[("master-1.csv", REPORT_CSV), ("master-2.csv", REPORT_CSV)]);

    assert!(
        matches!(result, Err(TranscodeError::UnexpectedArchiveContents(2))),
        "got {result:?}"
    );
    assert!(leftovers.is_empty(), "Leftover temp entries: {leftovers:?}");
}

#[tokio::test]
#[serial]
async fn test_synchronise_download_failure_removes_work_dir() {
    let mut source = MockReportStore::new();
    source.expect_list_objects().returning(|_| {
        Ok(vec![StoredObject::new(
            "cur/master/20230101-20230201/master-1.csv.zip",
            Utc.with_ymd_and_hms(2023, 2, 2, 0, 0, 0).unwrap(),
        )])
    });
    source.expect_download().times(1).returning(|_, dest| {
        // Leave a partial file behind, as an interrupted transfer would.
        std::fs::write(dest, b"PK")?;
        Err("connection reset".into())
    });
    let mut target = MockReportStore::new();
    target.expect_list_objects().returning(|_| Ok(vec![]));
    target.expect_upload().never();

    let config = SyncConfig {
        source: ReportLocation::new("cur", "master"),
        target: ReportLocation::new("cur", "linked"),
        usage_account_ids: UsageAccountSet::parse("111"),
    };

    let scratch = ScratchTmpDir::install();
    let result = synchronise(&config, &source, &target, &TracingObserver).await;
    let leftovers = scratch.leftovers();
    drop(scratch);

    assert!(matches!(result, Err(SyncError::Download { .. })), "got {result:?}");
    assert!(leftovers.is_empty(), "Leftover temp entries: {leftovers:?}");
}
