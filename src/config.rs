use std::path::PathBuf;
use std::time::Duration;

/// Minimum interval between two progress updates delivered to the caller.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

/// Slots in the progress channel before the oldest points are skipped.
pub const DEFAULT_PROGRESS_BUFFER: usize = 100;

#[derive(Debug, Clone)]
pub struct DownloaderConfig {
    /// Directory the finished file (and its temp directory) is placed in.
    pub output_dir: PathBuf,
    pub progress_interval: Duration,
    pub progress_buffer: usize,
    pub user_agent: String,
    pub connect_timeout: Duration,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            output_dir: std::env::temp_dir(),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            progress_buffer: DEFAULT_PROGRESS_BUFFER,
            user_agent: concat!("slicedl/", env!("CARGO_PKG_VERSION")).to_string(),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl DownloaderConfig {
    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    pub(crate) fn build_client(&self) -> reqwest::Result<reqwest::Client> {
        reqwest::Client::builder()
            .user_agent(self.user_agent.as_str())
            .connect_timeout(self.connect_timeout)
            .build()
    }
}
