use std::borrow::Cow;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StdfError>;

/// Canonical error surface for the summarization engine.
#[derive(Debug, Error)]
pub enum StdfError {
    #[error("I/O error: {source}")]
    Io {
        source: std::io::Error,
        path: Option<PathBuf>,
    },

    #[error("Not a valid STDF file: {reason}")]
    InvalidStdf { reason: Cow<'static, str> },

    #[error("Unsupported STDF version {version} (only version 4 is supported)")]
    WrongVersion { version: u8 },

    #[error("Payload allocation of {bytes} bytes failed")]
    NoMemory { bytes: usize },

    #[error("Ingestion stopped by caller request")]
    Terminated,

    #[error("Record at offset {offset} references {scope} before it was opened")]
    MapMissing { offset: u64, scope: String },

    #[error("{name} record is truncated (missing {field})")]
    TruncatedRecord {
        name: &'static str,
        field: &'static str,
    },

    #[error("Record code {code} has no parametric decoder")]
    UnsupportedRecord { code: u16 },

    #[error("Offset and length arrays differ in length ({offsets} vs {lengths})")]
    MismatchedArrays { offsets: usize, lengths: usize },

    #[error("Reader thread panicked: {payload}")]
    ReaderPanic { payload: String },

    #[error("SQL error: {0}")]
    Sql(#[from] rusqlite::Error),
}

impl From<std::io::Error> for StdfError {
    fn from(source: std::io::Error) -> Self {
        Self::Io { source, path: None }
    }
}
