use anyhow::{bail, Context, Result};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs;
use tracing::debug;

use slicedl::{DownloadResult, DownloaderConfig, FileDownloader, FileValidator};

use crate::utils::{get_filename_from_url, sanitize_filename};

const BAR_TEMPLATE: &str = concat!(
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] ",
    "{bytes:>12}/{total_bytes:<12} {bytes_per_sec:>12} {eta:>4} {msg}"
);

pub struct SingleDownload {
    pub url: String,
    pub file_name: Option<String>,
    pub download_dir: PathBuf,
    pub validator: Option<FileValidator>,
    pub progress_interval: Duration,
    pub json: bool,
}

pub async fn run_single_download(job: SingleDownload) -> Result<()> {
    if !job.download_dir.exists() {
        fs::create_dir_all(&job.download_dir)
            .await
            .context("Failed to create output directory")?;
    }

    let file_name = match job.file_name {
        Some(name) => sanitize_filename(&name),
        None => sanitize_filename(&get_filename_from_url(&job.url)?),
    };

    let config = DownloaderConfig::default()
        .with_output_dir(&job.download_dir)
        .with_progress_interval(job.progress_interval);
    let mut downloader = FileDownloader::new(config).context("Failed to build HTTP client")?;
    if let Some(validator) = job.validator {
        downloader = downloader.with_validator(validator);
    }

    let mut download = downloader.download_file(job.url.clone(), &file_name);

    let cancel = download.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("interrupt received, cancelling download");
            cancel.cancel();
        }
    });

    let pb = if job.json { None } else { Some(progress_bar(&file_name)?) };
    let mut outcome = None;

    while let Some(event) = download.next().await {
        if job.json {
            println!("{}", serde_json::to_string(&event.to_record())?);
        }
        match event {
            DownloadResult::ProgressUpdate { progress, .. } => {
                if let Some(pb) = &pb {
                    pb.set_length(progress.total);
                    pb.set_position(progress.downloaded);
                }
            }
            DownloadResult::Completed { file_path, .. } => {
                if let Some(pb) = &pb {
                    pb.finish_with_message(format!("Saved to {}", file_path.display()));
                }
                outcome = Some(Ok(()));
            }
            DownloadResult::Failed { error, url } => {
                if let Some(pb) = &pb {
                    pb.abandon_with_message("Failed");
                }
                let error = anyhow::Error::new(error).context(format!("Failed to download {url}"));
                outcome = Some(Err(error));
            }
        }
    }

    match outcome {
        Some(result) => result,
        None => {
            if let Some(pb) = &pb {
                pb.abandon_with_message("Cancelled");
            }
            bail!("Download of {} was cancelled", job.url)
        }
    }
}

fn progress_bar(file_name: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(BAR_TEMPLATE)?
            .progress_chars("=>-"),
    );
    pb.set_message(file_name.to_string());
    Ok(pb)
}
