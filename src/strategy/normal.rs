use futures::StreamExt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{cancellable, Dependencies, BUFFER_SIZE};
use crate::error::{DownloadError, Result};
use crate::files::part_file_name;
use crate::progress::{Progress, ProgressReporter, SliceProgress, SINGLE_SLICE};

/// Whole resource in one sequential stream.
#[derive(Debug)]
pub struct NormalStrategy {
    deps: Dependencies,
    file_size: u64,
    output_path: PathBuf,
}

impl NormalStrategy {
    pub fn new(deps: Dependencies, file_size: u64, output_path: PathBuf) -> Self {
        Self {
            deps,
            file_size,
            output_path,
        }
    }

    pub fn temp_file(temp_dir: &Path) -> PathBuf {
        temp_dir.join(part_file_name(SINGLE_SLICE))
    }

    pub async fn download_to_temp(
        &self,
        url: &str,
        temp_dir: &Path,
        reporter: ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<()> {
        info!(url, "downloading with normal strategy");
        let files = &self.deps.files;
        let temp_file = Self::temp_file(temp_dir);

        // Size is the only resume signal for a single stream.
        let exist_size = files.part_size(&temp_file).await;
        if exist_size > 0 && exist_size == self.file_size {
            info!(url, exist_size, "temp file already complete, skipping transfer");
            return Ok(());
        }
        debug!(url, exist_size, path = %temp_file.display(), "restarting temp file");
        files.remove_file_if_exists(&temp_file).await?;
        let mut file = files.open_random_access(&temp_file).await?;

        let response = cancellable(cancel, async {
            let response = self.deps.client.get(url).send().await?;
            Ok::<_, DownloadError>(response.error_for_status()?)
        })
        .await?;
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;

        loop {
            let chunk = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(DownloadError::Cancelled),
                next = stream.next() => match next {
                    Some(chunk) => chunk?,
                    None => break,
                },
            };

            for burst in chunk.chunks(BUFFER_SIZE) {
                if cancel.is_cancelled() {
                    return Err(DownloadError::Cancelled);
                }
                file.write_all(burst).await?;
                written += burst.len() as u64;
                reporter
                    .report(SliceProgress::single(url, Progress::new(written, self.file_size)))
                    .await;
            }
        }

        file.flush().await?;
        debug!(url, written, "normal transfer finished");
        Ok(())
    }

    pub async fn save_file(&self, temp_dir: &Path) -> Result<()> {
        let temp_file = Self::temp_file(temp_dir);
        info!(
            from = %temp_file.display(),
            to = %self.output_path.display(),
            "moving temp file into place"
        );
        self.deps.files.move_file(&temp_file, &self.output_path).await?;
        self.deps
            .files
            .remove_dir_if_exists(temp_dir)
            .await
            .map_err(|source| DownloadError::MoveFailed {
                from: temp_dir.to_path_buf(),
                to: self.output_path.clone(),
                source,
            })
    }
}
