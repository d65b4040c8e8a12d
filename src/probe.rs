use reqwest::header::{ACCEPT_RANGES, CONTENT_LENGTH};
use reqwest::Client;
use tracing::{debug, info};

use crate::error::{DownloadError, Result};

/// Files at or below this size are fetched with a single stream.
pub const CHUNK_THRESHOLD: u64 = 5 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileInfo {
    pub file_size: u64,
    /// Server advertises byte ranges and the file is worth slicing.
    pub accept_range: bool,
}

/// Issues a HEAD request and reads size and range support from its headers.
pub async fn probe(client: &Client, url: &str) -> Result<FileInfo> {
    info!(url, "probing file info");
    let response = client
        .head(url)
        .send()
        .await
        .map_err(|e| DownloadError::ProbeFailed(format!("HEAD {url} failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(DownloadError::ProbeFailed(format!(
            "HEAD {url} returned {status}"
        )));
    }

    // The body size hint of a HEAD response is empty, so read the header.
    let file_size = response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .ok_or_else(|| DownloadError::ProbeFailed("content-length not found".to_string()))?;

    let ranges_advertised = response
        .headers()
        .get(ACCEPT_RANGES)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_ascii_lowercase().contains("bytes"))
        .unwrap_or(false);

    let info = FileInfo {
        file_size,
        accept_range: ranges_advertised && file_size > CHUNK_THRESHOLD,
    };
    debug!(
        url,
        file_size,
        ranges_advertised,
        accept_range = info.accept_range,
        "probe finished"
    );
    Ok(info)
}
