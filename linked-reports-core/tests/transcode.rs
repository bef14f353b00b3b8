use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use linked_reports_core::config::{ReportNames, UsageAccountSet};
use linked_reports_core::error::TranscodeError;
use linked_reports_core::transcode::transcode_report;
use tempfile::tempdir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const REPORT_CSV: &str = "identity/LineItemId,lineItem/UsageAccountId,lineItem/UnblendedCost\r\n\
                          a1,111,1.0\r\n\
                          a2,222,2.0\r\n\
                          a3,333,3.0\r\n";

fn write_zip(path: &Path, members: &[(&str, &str)]) {
    let mut zip = ZipWriter::new(File::create(path).unwrap());
    for (name, content) in members {
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        zip.start_file(*name, options).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

fn read_members(path: &Path) -> Vec<(String, CompressionMethod, String)> {
    let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
    let mut members = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).unwrap();
        let mut content = String::new();
        entry.read_to_string(&mut content).unwrap();
        members.push((entry.name().to_string(), entry.compression(), content));
    }
    members
}

#[test]
fn test_transcode_filters_rows_and_renames_member() {
    let tmp = tempdir().unwrap();
    let source = tmp.path().join("source.zip");
    let target = tmp.path().join("target.zip");
    write_zip(&source, &[("prefix-Manifest.csv", REPORT_CSV)]);

    let transcoded = transcode_report(
        &source,
        &target,
        &ReportNames::new("prefix", "linked"),
        &UsageAccountSet::parse("111,333"),
    )
    .expect("Transcode should succeed");

    assert_eq!(transcoded.member_name, "linked-Manifest.csv");
    assert_eq!(transcoded.summary.rows_read, 3);
    assert_eq!(transcoded.summary.rows_kept, 2);
    assert_eq!(transcoded.summary.rows_dropped, 1);

    let members = read_members(&target);
    assert_eq!(members.len(), 1, "Exactly one member expected");
    let (name, compression, content) = &members[0];
    assert_eq!(name, "linked-Manifest.csv");
    assert_eq!(*compression, CompressionMethod::Deflated);
    assert_eq!(
        content,
        "identity/LineItemId,lineItem/UsageAccountId,lineItem/UnblendedCost\r\n\
         a1,111,1.0\r\n\
         a3,333,3.0\r\n"
    );
}

#[test]
fn test_transcode_uses_base_name_of_nested_member() {
    let tmp = tempdir().unwrap();
    let source = tmp.path().join("source.zip");
    let target = tmp.path().join("target.zip");
    write_zip(&source, &[("exports/prefix-00001.csv", REPORT_CSV)]);

    let transcoded = transcode_report(
        &source,
        &target,
        &ReportNames::new("prefix", "linked"),
        &UsageAccountSet::parse("222"),
    )
    .expect("Transcode should succeed");

    assert_eq!(transcoded.member_name, "linked-00001.csv");
    assert_eq!(read_members(&target)[0].0, "linked-00001.csv");
}

#[test]
fn test_transcode_rejects_empty_archive() {
    let tmp = tempdir().unwrap();
    let source = tmp.path().join("source.zip");
    let target = tmp.path().join("target.zip");
    write_zip(&source, &[]);

    let err = transcode_report(
        &source,
        &target,
        &ReportNames::new("prefix", "linked"),
        &UsageAccountSet::parse("111"),
    )
    .unwrap_err();

    assert!(
        matches!(err, TranscodeError::UnexpectedArchiveContents(0)),
        "got {err:?}"
    );
    assert!(err.to_string().contains("unexpected archive contents"));
    assert!(!target.exists(), "No output archive should be written");
}

#[test]
fn test_transcode_rejects_archive_with_two_members() {
    let tmp = tempdir().unwrap();
    let source = tmp.path().join("source.zip");
    let target = tmp.path().join("target.zip");
    write_zip(
        &source,
        &[("prefix-1.csv", REPORT_CSV), ("prefix-2.csv", REPORT_CSV)],
    );

    let err = transcode_report(
        &source,
        &target,
        &ReportNames::new("prefix", "linked"),
        &UsageAccountSet::parse("111"),
    )
    .unwrap_err();

    assert!(
        matches!(err, TranscodeError::UnexpectedArchiveContents(2)),
        "got {err:?}"
    );
    assert!(!target.exists(), "No output archive should be written");
}

#[test]
fn test_transcode_fails_on_report_without_header() {
    let tmp = tempdir().unwrap();
    let source = tmp.path().join("source.zip");
    let target = tmp.path().join("target.zip");
    write_zip(&source, &[("prefix-1.csv", "")]);

    let err = transcode_report(
        &source,
        &target,
        &ReportNames::new("prefix", "linked"),
        &UsageAccountSet::parse("111"),
    )
    .unwrap_err();

    assert!(matches!(err, TranscodeError::MissingHeader), "got {err:?}");
    assert!(!target.exists(), "No output archive should be written");
}

#[test]
fn test_transcode_fails_on_non_zip_input() {
    let tmp = tempdir().unwrap();
    let source = tmp.path().join("source.zip");
    let target = tmp.path().join("target.zip");
    std::fs::write(&source, b"definitely not a zip archive").unwrap();

    let err = transcode_report(
        &source,
        &target,
        &ReportNames::new("prefix", "linked"),
        &UsageAccountSet::parse("111"),
    )
    .unwrap_err();

    assert!(matches!(err, TranscodeError::Zip(_)), "got {err:?}");
}
