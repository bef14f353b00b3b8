//! Streaming row filter over a report's CSV payload.
//!
//! Rows are kept when their `lineItem/UsageAccountId` value is in the
//! [`UsageAccountSet`]. The header is copied verbatim and every other field
//! passes through untouched.

use std::io::{BufRead, BufReader, Read, Write};

use csv::{ByteRecord, ReaderBuilder, Terminator, WriterBuilder};
use serde::Serialize;
use tracing::debug;

use crate::config::UsageAccountSet;
use crate::error::TranscodeError;

/// Header of the column holding the account that incurred a line item.
pub const USAGE_ACCOUNT_COLUMN: &str = "lineItem/UsageAccountId";

/// Row counts produced by one run of [`filter_rows`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FilterSummary {
    pub rows_read: u64,
    pub rows_kept: u64,
    pub rows_dropped: u64,
}

/// Leading byte-order mark of UTF-8 encoded exports.
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Copies the header and every allowed row from `input` to `output`, in order.
///
/// Fails with [`TranscodeError::MissingHeader`] on empty input and with
/// [`TranscodeError::MissingColumn`] when the header lacks the account column.
/// Rows whose field count differs from the header are a CSV error, and an
/// account field that is not valid UTF-8 is [`TranscodeError::InvalidAccountId`].
/// A byte-order mark at the start of the input is written back to the output.
pub fn filter_rows<R: Read, W: Write>(
    input: R,
    mut output: W,
    accounts: &UsageAccountSet,
) -> Result<FilterSummary, TranscodeError> {
    let mut input = BufReader::new(input);
    let has_bom = input.fill_buf()?.starts_with(UTF8_BOM);

    // The reader drops the BOM itself, so header names compare cleanly.
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(input);

    let headers = reader.byte_headers()?.clone();
    if headers.is_empty() {
        return Err(TranscodeError::MissingHeader);
    }
    let account_index = headers
        .iter()
        .position(|name| name == USAGE_ACCOUNT_COLUMN.as_bytes())
        .ok_or_else(|| TranscodeError::MissingColumn(USAGE_ACCOUNT_COLUMN.to_string()))?;

    if has_bom {
        output.write_all(UTF8_BOM)?;
    }
    let mut writer = WriterBuilder::new()
        .terminator(Terminator::CRLF)
        .from_writer(output);
    writer.write_byte_record(&headers)?;

    let mut summary = FilterSummary::default();
    let mut record = ByteRecord::new();
    while reader.read_byte_record(&mut record)? {
        summary.rows_read += 1;
        let field = record.get(account_index).unwrap_or_default();
        let account_id = std::str::from_utf8(field).map_err(|_| TranscodeError::InvalidAccountId {
            line: record.position().map_or(0, |pos| pos.line()),
        })?;
        if accounts.contains(account_id) {
            writer.write_byte_record(&record)?;
            summary.rows_kept += 1;
        }
    }
    writer.flush()?;

    summary.rows_dropped = summary.rows_read - summary.rows_kept;
    debug!(
        rows_read = summary.rows_read,
        rows_dropped = summary.rows_dropped,
        rows_kept = summary.rows_kept,
        "Filtered report rows"
    );
    Ok(summary)
}
