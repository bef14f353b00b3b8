//! Error types for the transcoding and synchronisation steps.

use thiserror::Error;

use crate::contract::StoreError;

/// Errors raised while filtering a single report archive.
#[derive(Error, Debug)]
pub enum TranscodeError {
    /// The archive does not hold exactly one member.
    #[error("unexpected archive contents: expected exactly one file, found {0}")]
    UnexpectedArchiveContents(usize),

    /// The member's path escapes the archive root or has no file name.
    #[error("unexpected archive contents: unsafe member name `{0}`")]
    UnsafeMemberName(String),

    #[error("report has no parseable header")]
    MissingHeader,

    #[error("report header has no `{0}` column")]
    MissingColumn(String),

    #[error("usage account id on line {line} is not valid UTF-8")]
    InvalidAccountId { line: u64 },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that abort a synchronisation pass.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("failed to list reports under `{prefix}`: {source}")]
    Listing { prefix: String, source: StoreError },

    #[error("failed to download `{key}`: {source}")]
    Download { key: String, source: StoreError },

    #[error("failed to upload `{key}`: {source}")]
    Upload { key: String, source: StoreError },

    #[error("failed to transcode `{key}`: {source}")]
    Transcode {
        key: String,
        #[source]
        source: TranscodeError,
    },

    #[error("transcode task did not complete: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
