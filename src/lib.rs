//! Resumable HTTP file downloads.
//!
//! A [`FileDownloader`] probes the resource with `HEAD`, then either streams
//! it in one request or splits it into up to five byte-range slices fetched
//! concurrently into part files. Parts are merged in order, optionally
//! verified against a digest, and the caller observes the whole run as a
//! stream of [`DownloadResult`]s.
//!
//! ```no_run
//! use futures::StreamExt;
//! use slicedl::{DownloadResult, DownloaderConfig, FileDownloader};
//!
//! # async fn run() -> slicedl::Result<()> {
//! let downloader = FileDownloader::new(DownloaderConfig::default().with_output_dir("downloads"))?;
//! let mut download = downloader.download_file("https://example.com/data.bin", "data.bin");
//! while let Some(event) = download.next().await {
//!     if let DownloadResult::Completed { file_path, .. } = event {
//!         println!("saved to {}", file_path.display());
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod downloader;
pub mod error;
pub mod files;
pub mod hashing;
pub mod probe;
pub mod progress;
pub mod result;
pub mod strategy;
pub mod throttle;
pub mod validator;

pub use config::DownloaderConfig;
pub use downloader::{Download, FileDownloader};
pub use error::{DownloadError, Result};
pub use files::FileOps;
pub use hashing::{FileHasher, Md5Hasher, Sha256Hasher};
pub use probe::{probe, FileInfo};
pub use progress::{Progress, SliceProgress};
pub use result::DownloadResult;
pub use strategy::Strategy;
pub use validator::{DigestEncoding, FileValidator};
