use reqwest::StatusCode;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("file info probe failed: {0}")]
    ProbeFailed(String),

    #[error("transfer failed: {0}")]
    TransferFailed(#[from] reqwest::Error),

    /// The server answered a range request with something other than the
    /// requested slice, so the body cannot be written into a part file.
    #[error("server did not honor range {range} (status {status})")]
    RangeIgnored { status: StatusCode, range: String },

    #[error("merging parts into {path:?} failed: {source}")]
    MergeFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("moving {from:?} to {to:?} failed: {source}")]
    MoveFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("digest of {path:?} does not match the expected value")]
    ValidationFailed { path: PathBuf },

    #[error("file I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("download cancelled")]
    Cancelled,
}

impl DownloadError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DownloadError::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, DownloadError>;
