mod cli;
mod commands;
mod utils;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use crate::cli::{build_validator, DigestFormat, HashAlgorithm};
use crate::commands::SingleDownload;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// URL to download
    #[arg(index = 1)]
    url: String,

    /// File name to save as (defaults to the last path segment of the URL)
    #[arg(short = 'o', long = "output")]
    output: Option<String>,

    /// Directory to save the downloaded file
    #[arg(short = 'd', long = "download-dir", default_value = "downloads")]
    download_dir: PathBuf,

    /// Expected digest of the finished file; enables verification
    #[arg(long)]
    digest: Option<String>,

    /// Digest algorithm used with --digest
    #[arg(long = "hash-algorithm", value_enum, default_value = "md5")]
    hash_algorithm: HashAlgorithm,

    /// How the --digest value is written
    #[arg(long = "digest-encoding", value_enum, default_value = "hex")]
    digest_encoding: DigestFormat,

    /// Minimum milliseconds between progress updates (0 disables throttling)
    #[arg(long = "progress-interval-ms", default_value_t = 100)]
    progress_interval_ms: u64,

    /// Print one JSON object per event instead of a progress bar
    #[arg(long)]
    json: bool,

    /// Log debug output to stderr
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let mut args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    // Output dir might not exist yet, so we resolve it relative to current dir
    if args.download_dir.is_relative() {
        if let Ok(cwd) = std::env::current_dir() {
            args.download_dir = cwd.join(&args.download_dir);
        }
    }

    let job = SingleDownload {
        validator: build_validator(args.digest, args.hash_algorithm, args.digest_encoding),
        url: args.url,
        file_name: args.output,
        download_dir: args.download_dir,
        progress_interval: Duration::from_millis(args.progress_interval_ms),
        json: args.json,
    };

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(crate::commands::run_single_download(job))
}
