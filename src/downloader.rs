use futures::Stream;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::config::DownloaderConfig;
use crate::error::{DownloadError, Result};
use crate::files::FileOps;
use crate::probe::probe;
use crate::progress::{ProgressReporter, ProgressState, SliceProgress};
use crate::result::DownloadResult;
use crate::strategy::{cancellable, Dependencies, Strategy};
use crate::throttle::Throttle;
use crate::validator::FileValidator;

/// Handle to a running download.
///
/// Yields [`DownloadResult`]s until the pipeline finishes. Dropping the handle
/// cancels the download.
#[derive(Debug)]
pub struct Download {
    events: mpsc::Receiver<DownloadResult>,
    cancel: CancellationToken,
}

impl Download {
    pub async fn next_event(&mut self) -> Option<DownloadResult> {
        self.events.recv().await
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl Stream for Download {
    type Item = DownloadResult;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.events.poll_recv(cx)
    }
}

impl Drop for Download {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[derive(Debug, Clone)]
pub struct FileDownloader {
    deps: Dependencies,
    config: DownloaderConfig,
    validator: Option<FileValidator>,
}

impl FileDownloader {
    pub fn new(config: DownloaderConfig) -> Result<Self> {
        let client = config.build_client()?;
        Ok(Self::with_client(config, client))
    }

    pub fn with_client(config: DownloaderConfig, client: Client) -> Self {
        Self {
            deps: Dependencies::new(client, FileOps::new()),
            config,
            validator: None,
        }
    }

    pub fn with_validator(mut self, validator: FileValidator) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Starts downloading `url` into `output_dir/file_name` on a spawned task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn download_file(&self, url: impl Into<String>, file_name: &str) -> Download {
        let url = url.into();
        let output_path = self.config.output_dir.join(file_name);
        let (events_tx, events_rx) = mpsc::channel(self.config.progress_buffer.max(1));
        let cancel = CancellationToken::new();

        let pipeline = self.clone();
        let token = cancel.clone();
        tokio::spawn(async move { pipeline.run(url, output_path, events_tx, token).await });

        Download {
            events: events_rx,
            cancel,
        }
    }

    async fn run(
        self,
        url: String,
        output_path: PathBuf,
        events: mpsc::Sender<DownloadResult>,
        cancel: CancellationToken,
    ) {
        let outcome = self.execute(&url, &output_path, &events, &cancel).await;
        if cancel.is_cancelled() {
            info!(url, "download cancelled");
            return;
        }

        let terminal = match outcome {
            Ok(()) => {
                info!(url, path = %output_path.display(), "download completed");
                DownloadResult::Completed {
                    file_path: output_path,
                    url,
                }
            }
            Err(e) if e.is_cancelled() => {
                info!(url, "download cancelled");
                return;
            }
            Err(error) => {
                warn!(url, error = %error, "download failed");
                DownloadResult::Failed { error, url }
            }
        };
        if events.send(terminal).await.is_err() {
            debug!("result receiver dropped before terminal event");
        }
    }

    async fn execute(
        &self,
        url: &str,
        output_path: &Path,
        events: &mpsc::Sender<DownloadResult>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let file_info = cancellable(cancel, probe(&self.deps.client, url)).await?;
        let temp_dir = self.deps.files.create_temp_dir(output_path).await?;

        let state = Arc::new(ProgressState::new(file_info.file_size));
        let (throttle, updates) =
            Throttle::new(self.config.progress_buffer, self.config.progress_interval);
        let forwarder = tokio::spawn(forward_progress(
            updates,
            state.clone(),
            events.clone(),
            url.to_string(),
        ));
        let reporter = ProgressReporter::new(state, throttle);

        let strategy = Strategy::select(self.deps.clone(), file_info, output_path.to_path_buf());
        info!(
            url,
            strategy = strategy.name(),
            file_size = file_info.file_size,
            temp_dir = %temp_dir.display(),
            "starting transfer"
        );

        // Every reporter clone is gone once the strategy returns, which closes
        // the progress channel and lets the forwarder drain.
        match strategy.download_to_temp(url, &temp_dir, reporter, cancel).await {
            Ok(()) => {
                let _ = forwarder.await;
            }
            Err(e) => {
                forwarder.abort();
                let _ = forwarder.await;
                return Err(e);
            }
        }
        if cancel.is_cancelled() {
            return Err(DownloadError::Cancelled);
        }

        strategy.save_file(&temp_dir).await?;

        if let Some(validator) = &self.validator {
            if !validator.verify(output_path).await? {
                warn!(
                    url,
                    path = %output_path.display(),
                    algorithm = validator.algorithm(),
                    "digest mismatch, leaving file on disk"
                );
                return Err(DownloadError::ValidationFailed {
                    path: output_path.to_path_buf(),
                });
            }
            debug!(url, algorithm = validator.algorithm(), "digest verified");
        }
        Ok(())
    }
}

/// Turns throttled slice updates into aggregate `ProgressUpdate` events.
async fn forward_progress(
    mut updates: broadcast::Receiver<SliceProgress>,
    state: Arc<ProgressState>,
    events: mpsc::Sender<DownloadResult>,
    url: String,
) {
    loop {
        match updates.recv().await {
            Ok(_) => {
                let progress = state.get().await;
                let update = DownloadResult::ProgressUpdate {
                    progress,
                    url: url.clone(),
                };
                if events.send(update).await.is_err() {
                    break;
                }
            }
            Err(RecvError::Lagged(skipped)) => trace!(url, skipped, "skipped stale progress"),
            Err(RecvError::Closed) => break,
        }
    }
}
