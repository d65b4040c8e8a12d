//! Post-download integrity check.
//!
//! A [`FileValidator`] pairs a [`FileHasher`] with the expected digest and the
//! encoding that digest is written in. Both sides are lower-cased before
//! comparing. A failed check is reported, never retried.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::io;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::hashing::{FileHasher, Md5Hasher, Sha256Hasher};

/// How the expected digest is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DigestEncoding {
    #[default]
    Hex,
    /// Base64 of the raw digest bytes, as in `Content-MD5` style headers.
    Base64,
}

#[derive(Clone)]
pub struct FileValidator {
    hasher: Arc<dyn FileHasher>,
    expected: String,
    encoding: DigestEncoding,
}

impl FileValidator {
    pub fn new(hasher: Arc<dyn FileHasher>, expected: impl Into<String>) -> Self {
        Self {
            hasher,
            expected: expected.into(),
            encoding: DigestEncoding::Hex,
        }
    }

    pub fn md5(expected: impl Into<String>) -> Self {
        Self::new(Arc::new(Md5Hasher), expected)
    }

    pub fn sha256(expected: impl Into<String>) -> Self {
        Self::new(Arc::new(Sha256Hasher), expected)
    }

    pub fn with_encoding(mut self, encoding: DigestEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn algorithm(&self) -> &'static str {
        self.hasher.name()
    }

    /// Returns `false` when the file does not exist or its digest differs.
    pub async fn verify(&self, path: &Path) -> io::Result<bool> {
        if !tokio::fs::try_exists(path).await? {
            return Ok(false);
        }
        let hex_digest = self.hasher.hash_file(path).await?;
        let computed = match self.encoding {
            DigestEncoding::Hex => hex_digest,
            DigestEncoding::Base64 => hex_to_base64(&hex_digest)?,
        };
        debug!(
            algorithm = self.hasher.name(),
            path = %path.display(),
            computed = %computed,
            "computed file digest"
        );
        Ok(computed.to_lowercase() == self.expected.to_lowercase())
    }
}

impl std::fmt::Debug for FileValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileValidator")
            .field("algorithm", &self.hasher.name())
            .field("expected", &self.expected)
            .field("encoding", &self.encoding)
            .finish()
    }
}

/// Re-encodes a hex digest as base64 of its bytes.
pub fn hex_to_base64(hex_digest: &str) -> io::Result<String> {
    let bytes =
        hex::decode(hex_digest).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    Ok(STANDARD.encode(bytes))
}
