pub mod chunked;
pub mod normal;

use reqwest::Client;
use std::future::Future;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

use crate::error::{DownloadError, Result};
use crate::files::FileOps;
use crate::probe::FileInfo;
use crate::progress::ProgressReporter;

pub use chunked::{calculate_threads, ChunkedStrategy, SliceRange, MAX_THREAD_COUNT};
pub use normal::NormalStrategy;

/// Size of one write burst into a part file.
pub const BUFFER_SIZE: usize = 8192;

/// Transport and filesystem handles shared by every strategy.
#[derive(Debug, Clone)]
pub struct Dependencies {
    pub client: Client,
    pub files: FileOps,
}

impl Dependencies {
    pub fn new(client: Client, files: FileOps) -> Self {
        Self { client, files }
    }
}

#[derive(Debug)]
pub enum Strategy {
    Normal(NormalStrategy),
    Chunked(ChunkedStrategy),
}

impl Strategy {
    pub fn select(deps: Dependencies, file_info: FileInfo, output_path: PathBuf) -> Self {
        if file_info.accept_range {
            Strategy::Chunked(ChunkedStrategy::new(deps, file_info, output_path))
        } else {
            Strategy::Normal(NormalStrategy::new(deps, file_info.file_size, output_path))
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Normal(_) => "normal",
            Strategy::Chunked(_) => "chunked",
        }
    }

    /// Fetches the resource into part files under `temp_dir`.
    pub async fn download_to_temp(
        &self,
        url: &str,
        temp_dir: &Path,
        reporter: ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<()> {
        match self {
            Strategy::Normal(s) => s.download_to_temp(url, temp_dir, reporter, cancel).await,
            Strategy::Chunked(s) => s.download_to_temp(url, temp_dir, reporter, cancel).await,
        }
    }

    /// Produces the destination file from the parts and clears `temp_dir`.
    pub async fn save_file(&self, temp_dir: &Path) -> Result<()> {
        match self {
            Strategy::Normal(s) => s.save_file(temp_dir).await,
            Strategy::Chunked(s) => s.save_file(temp_dir).await,
        }
    }
}

/// Runs `fut` unless `cancel` fires first.
pub(crate) async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(DownloadError::Cancelled),
        res = fut => res,
    }
}
