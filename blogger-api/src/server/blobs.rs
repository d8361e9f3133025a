//! Storage for uploaded post images.

use async_trait::async_trait;
use axum::body::Bytes;
use std::path::PathBuf;
use thiserror::Error;
use tokio::fs;
use tracing::debug;
use url::Url;

/// Route prefix [`FsBlobStore`] files are served under.
pub const BLOB_ROUTE: &str = "/blobs";

const MAX_EXTENSION_LEN: usize = 5;

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("Blob could not be written: {0}")]
    Io(#[from] std::io::Error),
    #[error("Blob url could not be built: {0}")]
    Url(#[from] url::ParseError),
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Persists `bytes` and returns the absolute URL they can be fetched from.
    async fn store(&self, file_name: Option<&str>, bytes: Bytes) -> Result<String, BlobError>;
}

/// Writes blobs as files below one directory under random names.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct FsBlobStore {
    dir: PathBuf,
    base_url: Url,
}

impl FsBlobStore {
    /// `public_url` is the site root. The directory is created if missing.
    pub async fn new(dir: PathBuf, public_url: &Url) -> Result<Self, BlobError> {
        fs::create_dir_all(&dir).await?;
        let base_url = public_url.join(&format!("{}/", BLOB_ROUTE.trim_start_matches('/')))?;

        Ok(Self { dir, base_url })
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn store(&self, file_name: Option<&str>, bytes: Bytes) -> Result<String, BlobError> {
        let key = blob_key(rand::random(), file_name);
        fs::write(self.dir.join(&key), &bytes).await?;
        debug!(%key, len = bytes.len(), "Stored blob");

        Ok(self.base_url.join(&key)?.to_string())
    }
}

/// Hex of `random`, keeping a short alphanumeric extension of `file_name`.
fn blob_key(random: u128, file_name: Option<&str>) -> String {
    let extension = file_name
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, extension)| extension)
        .filter(|extension| {
            (1..=MAX_EXTENSION_LEN).contains(&extension.len())
                && extension.chars().all(|c| c.is_ascii_alphanumeric())
        });

    match extension {
        Some(extension) => format!("{random:032x}.{extension}"),
        None => format!("{random:032x}"),
    }
}
