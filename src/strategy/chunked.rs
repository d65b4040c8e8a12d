use futures::StreamExt;
use reqwest::header::RANGE;
use reqwest::StatusCode;
use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{cancellable, Dependencies};
use crate::error::{DownloadError, Result};
use crate::files::part_file_name;
use crate::probe::{FileInfo, CHUNK_THRESHOLD};
use crate::progress::{Progress, ProgressReporter, SliceProgress};

pub const MAX_THREAD_COUNT: usize = 5;
const FIFTY_MB: u64 = 50 * 1024 * 1024;
const ONE_HUNDRED_MB: u64 = 100 * 1024 * 1024;

/// Number of concurrent slices for a file of `file_size` bytes.
pub fn calculate_threads(file_size: u64) -> usize {
    if file_size < CHUNK_THRESHOLD {
        1
    } else if file_size < FIFTY_MB {
        2.min(MAX_THREAD_COUNT)
    } else if file_size < ONE_HUNDRED_MB {
        3.min(MAX_THREAD_COUNT)
    } else {
        MAX_THREAD_COUNT
    }
}

/// Inclusive byte range of one slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceRange {
    pub index: usize,
    pub start: u64,
    pub end: u64,
}

impl SliceRange {
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }
}

/// Splits `file_size` bytes into `thread_count` slices of `ceil(size / n)`.
/// Slices that would start past the end are left out.
pub fn plan_slices(file_size: u64, thread_count: usize) -> Vec<SliceRange> {
    if file_size == 0 || thread_count == 0 {
        return Vec::new();
    }
    let chunk_size = file_size.div_ceil(thread_count as u64);
    (0..thread_count)
        .filter_map(|index| {
            let start = chunk_size * index as u64;
            if start >= file_size {
                return None;
            }
            let end = (start + chunk_size - 1).min(file_size - 1);
            Some(SliceRange { index, start, end })
        })
        .collect()
}

/// Everything one slice task needs besides the shared handles.
#[derive(Debug, Clone)]
pub struct PartJob {
    pub url: String,
    pub path: PathBuf,
    pub range: SliceRange,
    pub file_size: u64,
}

/// Resource split into byte ranges fetched concurrently into part files.
#[derive(Debug)]
pub struct ChunkedStrategy {
    deps: Dependencies,
    file_info: FileInfo,
    output_path: PathBuf,
    thread_count: usize,
}

impl ChunkedStrategy {
    pub fn new(deps: Dependencies, file_info: FileInfo, output_path: PathBuf) -> Self {
        Self {
            deps,
            file_info,
            output_path,
            thread_count: calculate_threads(file_info.file_size),
        }
    }

    pub fn thread_count(&self) -> usize {
        self.thread_count
    }

    pub fn slices(&self) -> Vec<SliceRange> {
        plan_slices(self.file_info.file_size, self.thread_count)
    }

    pub async fn download_to_temp(
        &self,
        url: &str,
        temp_dir: &Path,
        reporter: ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<()> {
        info!(
            url,
            thread_count = self.thread_count,
            file_size = self.file_info.file_size,
            "downloading with chunked strategy"
        );

        let mut tasks = JoinSet::new();
        for range in self.slices() {
            let job = PartJob {
                url: url.to_string(),
                path: temp_dir.join(part_file_name(range.index)),
                range,
                file_size: self.file_info.file_size,
            };
            let deps = self.deps.clone();
            let reporter = reporter.clone();
            let cancel = cancel.clone();
            tasks.spawn(async move { download_file_part(&deps, &job, &reporter, &cancel).await });
        }
        drop(reporter);

        while let Some(joined) = tasks.join_next().await {
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(e) if e.is_cancelled() => Err(DownloadError::Cancelled),
                Err(e) => Err(DownloadError::Io(io::Error::new(io::ErrorKind::Other, e))),
            };
            if let Err(e) = outcome {
                if !e.is_cancelled() {
                    warn!(url, error = %e, "slice failed, stopping remaining slices");
                }
                tasks.shutdown().await;
                return Err(e);
            }
        }
        Ok(())
    }

    /// Merges the parts into the destination in index order.
    pub async fn save_file(&self, temp_dir: &Path) -> Result<()> {
        let size = self
            .deps
            .files
            .merge_parts(temp_dir, &self.output_path, self.thread_count)
            .await?;
        info!(path = %self.output_path.display(), size, "merged parts");
        Ok(())
    }
}

/// Downloads one slice into its part file, resuming from a shorter part.
pub async fn download_file_part(
    deps: &Dependencies,
    job: &PartJob,
    reporter: &ProgressReporter,
    cancel: &CancellationToken,
) -> Result<()> {
    let files = &deps.files;
    let index = job.range.index;
    let slice_len = job.range.len();

    let mut exist_size = files.part_size(&job.path).await;
    if exist_size == 0 || exist_size >= slice_len {
        files.remove_file_if_exists(&job.path).await?;
        exist_size = 0;
    }
    let start_location = job.range.start + exist_size;
    let range_value = format!("bytes={}-{}", start_location, job.range.end);
    debug!(
        url = %job.url,
        slice = index,
        exist_size,
        range = %range_value,
        "requesting slice"
    );

    let mut file = files.open_random_access(&job.path).await?;

    let response = cancellable(cancel, async {
        let response = deps
            .client
            .get(&job.url)
            .header(RANGE, range_value.as_str())
            .send()
            .await?;
        Ok::<_, DownloadError>(response.error_for_status()?)
    })
    .await?;

    let status = response.status();
    let covers_whole = start_location == 0 && job.range.end + 1 == job.file_size;
    if status != StatusCode::PARTIAL_CONTENT && !(status == StatusCode::OK && covers_whole) {
        return Err(DownloadError::RangeIgnored {
            status,
            range: range_value,
        });
    }

    let content_length = response.content_length().unwrap_or(0);
    let mut stream = response.bytes_stream();
    let mut offset = exist_size;
    let mut received: u64 = 0;

    loop {
        let chunk = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(DownloadError::Cancelled),
            next = stream.next() => match next {
                Some(chunk) => chunk?,
                None => break,
            },
        };

        if cancel.is_cancelled() {
            return Err(DownloadError::Cancelled);
        }
        if offset + chunk.len() as u64 > slice_len {
            return Err(DownloadError::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("slice {index} body exceeds its {slice_len} byte range"),
            )));
        }
        file.seek(SeekFrom::Start(offset)).await?;
        file.write_all(&chunk).await?;
        offset += chunk.len() as u64;
        received += chunk.len() as u64;

        reporter
            .report(SliceProgress::new(
                job.url.as_str(),
                Progress::new(received + exist_size, content_length + exist_size),
                index,
            ))
            .await;
    }
    file.flush().await?;

    if offset < slice_len {
        return Err(DownloadError::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("slice {index} ended after {offset} of {slice_len} bytes"),
        )));
    }
    debug!(url = %job.url, slice = index, received, "slice finished");
    Ok(())
}
