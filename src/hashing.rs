use async_trait::async_trait;
use md5::Md5;
use sha2::{Digest, Sha256};
use std::io;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

const READ_BUFFER: usize = 8192;

/// Digest algorithm applied to a file on disk.
#[async_trait]
pub trait FileHasher: Send + Sync {
    fn name(&self) -> &'static str;

    /// Lower-case hex digest of the file's contents.
    async fn hash_file(&self, path: &Path) -> io::Result<String>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Md5Hasher;

#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

#[async_trait]
impl FileHasher for Md5Hasher {
    fn name(&self) -> &'static str {
        "md5"
    }

    async fn hash_file(&self, path: &Path) -> io::Result<String> {
        stream_digest::<Md5>(path).await
    }
}

#[async_trait]
impl FileHasher for Sha256Hasher {
    fn name(&self) -> &'static str {
        "sha256"
    }

    async fn hash_file(&self, path: &Path) -> io::Result<String> {
        stream_digest::<Sha256>(path).await
    }
}

/// Feeds the file through `D` in fixed reads; the file is never held in memory.
pub async fn stream_digest<D: Digest>(path: &Path) -> io::Result<String> {
    let mut file = File::open(path).await?;
    let mut hasher = D::new();
    let mut buffer = [0; READ_BUFFER];

    loop {
        let n = file.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Hex MD5 of a string, used to name per-destination temp directories.
pub fn md5_hex(value: &str) -> String {
    hex::encode(Md5::digest(value.as_bytes()))
}
