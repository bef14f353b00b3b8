//! Archive transcoder: unpack a single-member report archive, filter its CSV,
//! and pack the result into a new single-member archive under a renamed entry.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

use tracing::{debug, instrument};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::config::{ReportNames, UsageAccountSet};
use crate::error::TranscodeError;
use crate::row_filter::{filter_rows, FilterSummary};

/// Outcome of transcoding one report archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodedReport {
    /// Entry name written into the output archive.
    pub member_name: String,
    pub summary: FilterSummary,
}

/// Filters the report inside `source_zip` and writes the result to `target_zip`.
///
/// The source archive must hold exactly one file. Its base name, with the first
/// occurrence of the source report name replaced by the target one, becomes the
/// entry name of the output archive. Intermediate files live in a temporary
/// directory that is removed on every return path; `target_zip` is only created
/// once filtering has succeeded.
#[instrument(level = "debug", skip(names, accounts), fields(source = %source_zip.display()))]
pub fn transcode_report(
    source_zip: &Path,
    target_zip: &Path,
    names: &ReportNames,
    accounts: &UsageAccountSet,
) -> Result<TranscodedReport, TranscodeError> {
    let work_dir = tempfile::tempdir()?;
    let extracted = work_dir.path().join("source.csv");
    let filtered = work_dir.path().join("filtered.csv");

    let source_member = extract_single_member(source_zip, &extracted)?;
    debug!(member = %source_member, "Extracted report member");

    let summary = {
        let input = BufReader::new(File::open(&extracted)?);
        let output = BufWriter::new(File::create(&filtered)?);
        filter_rows(input, output, accounts)?
    };

    let member_name = names.rename(&source_member);
    write_single_member(&filtered, target_zip, &member_name)?;
    debug!(member = %member_name, target = %target_zip.display(), "Wrote filtered archive");

    Ok(TranscodedReport {
        member_name,
        summary,
    })
}

/// Streams the only member of `archive_path` into `dest` and returns its base file name.
fn extract_single_member(archive_path: &Path, dest: &Path) -> Result<String, TranscodeError> {
    let mut archive = ZipArchive::new(BufReader::new(File::open(archive_path)?))?;
    if archive.len() != 1 {
        return Err(TranscodeError::UnexpectedArchiveContents(archive.len()));
    }

    let mut entry = archive.by_index(0)?;
    if !entry.is_file() {
        return Err(TranscodeError::UnexpectedArchiveContents(0));
    }
    let file_name = entry
        .enclosed_name()
        .and_then(|path| path.file_name().map(|name| name.to_string_lossy().into_owned()))
        .ok_or_else(|| TranscodeError::UnsafeMemberName(entry.name().to_string()))?;

    let mut out = BufWriter::new(File::create(dest)?);
    io::copy(&mut entry, &mut out)?;
    out.flush()?;
    Ok(file_name)
}

/// Packs `src` as the single deflated entry `member_name` of a new archive at `archive_path`.
fn write_single_member(
    src: &Path,
    archive_path: &Path,
    member_name: &str,
) -> Result<(), TranscodeError> {
    let mut zip = ZipWriter::new(BufWriter::new(File::create(archive_path)?));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .large_file(true);
    zip.start_file(member_name, options)?;

    let mut input = BufReader::new(File::open(src)?);
    io::copy(&mut input, &mut zip)?;

    let mut inner = zip.finish()?;
    inner.flush()?;
    Ok(())
}
