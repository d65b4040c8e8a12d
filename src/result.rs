use serde::Serialize;
use std::path::PathBuf;

use crate::error::DownloadError;
use crate::progress::Progress;

/// One event of a download's result sequence.
///
/// Zero or more `ProgressUpdate`s are followed by at most one `Completed` or
/// `Failed`. A cancelled download ends without a terminal event.
#[derive(Debug)]
pub enum DownloadResult {
    ProgressUpdate { progress: Progress, url: String },
    Completed { file_path: PathBuf, url: String },
    Failed { error: DownloadError, url: String },
}

impl DownloadResult {
    pub fn url(&self) -> &str {
        match self {
            DownloadResult::ProgressUpdate { url, .. }
            | DownloadResult::Completed { url, .. }
            | DownloadResult::Failed { url, .. } => url,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, DownloadResult::ProgressUpdate { .. })
    }

    /// Flat, serializable view used for line-oriented output.
    pub fn to_record(&self) -> EventRecord<'_> {
        match self {
            DownloadResult::ProgressUpdate { progress, url } => EventRecord {
                event: "progress",
                url,
                downloaded: Some(progress.downloaded),
                total: Some(progress.total),
                file_path: None,
                error: None,
            },
            DownloadResult::Completed { file_path, url } => EventRecord {
                event: "completed",
                url,
                downloaded: None,
                total: None,
                file_path: Some(file_path.display().to_string()),
                error: None,
            },
            DownloadResult::Failed { error, url } => EventRecord {
                event: "failed",
                url,
                downloaded: None,
                total: None,
                file_path: None,
                error: Some(error.to_string()),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EventRecord<'a> {
    pub event: &'static str,
    pub url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub downloaded: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
