//! Part-file and temp-directory lifecycle.
//!
//! Layout on disk, next to the destination file:
//!
//! ```text
//! <output_dir>/<md5 hex of file name>/0.part
//!                                     1.part
//!                                     ...
//! <output_dir>/<file name>
//! ```

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::debug;

use crate::error::{DownloadError, Result};
use crate::hashing::md5_hex;

pub fn part_file_name(index: usize) -> String {
    format!("{index}.part")
}

/// Filesystem capability handed to every component that touches disk.
#[derive(Debug, Clone, Default)]
pub struct FileOps;

impl FileOps {
    pub fn new() -> Self {
        Self
    }

    /// Size of an existing part file, `0` when it is missing.
    pub async fn part_size(&self, path: &Path) -> u64 {
        fs::metadata(path).await.map(|m| m.len()).unwrap_or(0)
    }

    pub async fn exists(&self, path: &Path) -> io::Result<bool> {
        fs::try_exists(path).await
    }

    /// Returns the temp directory for `output_path`, creating it when needed.
    ///
    /// The name only depends on the destination file name, so a second call
    /// for the same destination finds the parts left by the first.
    pub async fn create_temp_dir(&self, output_path: &Path) -> io::Result<PathBuf> {
        let parent = output_path.parent().unwrap_or(output_path);
        let name = output_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let temp_dir = parent.join(md5_hex(&name));
        if !self.exists(&temp_dir).await? {
            debug!(path = %temp_dir.display(), "creating temp directory");
            fs::create_dir_all(&temp_dir).await?;
        }
        Ok(temp_dir)
    }

    pub async fn remove_file_if_exists(&self, path: &Path) -> io::Result<()> {
        match fs::remove_file(path).await {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    pub async fn remove_dir_if_exists(&self, path: &Path) -> io::Result<()> {
        match fs::remove_dir_all(path).await {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    /// Opens (creating if needed) a file for positioned writes without
    /// truncating what is already there.
    pub async fn open_random_access(&self, path: &Path) -> io::Result<File> {
        OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)
            .await
    }

    /// Concatenates `0.part .. {count-1}.part` into `output_path` in index
    /// order, then deletes `temp_dir`. Missing parts are skipped.
    pub async fn merge_parts(
        &self,
        temp_dir: &Path,
        output_path: &Path,
        count: usize,
    ) -> Result<u64> {
        self.try_merge_parts(temp_dir, output_path, count)
            .await
            .map_err(|source| DownloadError::MergeFailed {
                path: output_path.to_path_buf(),
                source,
            })
    }

    async fn try_merge_parts(
        &self,
        temp_dir: &Path,
        output_path: &Path,
        count: usize,
    ) -> io::Result<u64> {
        self.remove_file_if_exists(output_path).await?;
        let mut output = BufWriter::new(File::create(output_path).await?);
        let mut written = 0;

        for index in 0..count {
            let part = temp_dir.join(part_file_name(index));
            if !self.exists(&part).await? {
                debug!(path = %part.display(), "part missing, skipping");
                continue;
            }
            let mut input = File::open(&part).await?;
            let size = tokio::io::copy(&mut input, &mut output).await?;
            debug!(path = %part.display(), size, "appended part");
            written += size;
        }

        output.flush().await?;
        drop(output);
        self.remove_dir_if_exists(temp_dir).await?;
        Ok(written)
    }

    /// Moves `from` onto `to`, replacing any previous file at `to`.
    pub async fn move_file(&self, from: &Path, to: &Path) -> Result<()> {
        let moved = async {
            if !self.exists(from).await? {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    "temp file does not exist",
                ));
            }
            self.remove_file_if_exists(to).await?;
            fs::rename(from, to).await
        }
        .await;

        moved.map_err(|source| DownloadError::MoveFailed {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            source,
        })
    }
}
