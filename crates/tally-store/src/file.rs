//! Local filesystem counter store.
//!
//! All counts live in one JSON object (`{"DE": 4, "DE.0": 2}`). Writes
//! go to a sibling temporary file which then replaces the document, so a
//! crash mid-write leaves the previous document intact.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use tally_core::error::{AppError, ErrorKind};
use tally_core::result::AppResult;
use tally_core::traits::store::CounterStore;

/// JSON document store on the local filesystem.
#[derive(Debug)]
pub struct FileStore {
    /// Path of the JSON document.
    path: PathBuf,
    /// Last successfully written document.
    document: Mutex<BTreeMap<String, u64>>,
    /// Opened for inspection only; writes are refused.
    read_only: bool,
}

impl FileStore {
    /// Open (or create) the document at `path`.
    pub async fn open(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to create store directory: {}", parent.display()),
                    e,
                )
            })?;
        }

        let document = read_document(&path).await?;
        debug!(path = %path.display(), keys = document.len(), "Opened file store");

        Ok(Self {
            path,
            document: Mutex::new(document),
            read_only: false,
        })
    }

    /// Open the document at `path` for reading only.
    ///
    /// Nothing is created on disk; a missing document reads as empty.
    pub async fn open_read_only(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref().to_path_buf();
        let document = read_document(&path).await?;
        debug!(path = %path.display(), keys = document.len(), "Opened file store read-only");

        Ok(Self {
            path,
            document: Mutex::new(document),
            read_only: true,
        })
    }

    /// Write `document` to a temporary file and move it over the real one.
    async fn persist(&self, document: &BTreeMap<String, u64>) -> AppResult<()> {
        let json = serde_json::to_vec_pretty(document)?;
        let tmp = self.path.with_extension("json.tmp");

        let mut file = fs::File::create(&tmp).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create temp file: {}", tmp.display()),
                e,
            )
        })?;
        file.write_all(&json).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&tmp, &self.path).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to replace store file: {}", self.path.display()),
                e,
            )
        })
    }
}

/// Read the document, treating a missing file as an empty store.
async fn read_document(path: &Path) -> AppResult<BTreeMap<String, u64>> {
    match fs::read(path).await {
        Ok(bytes) if bytes.is_empty() => Ok(BTreeMap::new()),
        Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Corrupt store file: {}", path.display()),
                e,
            )
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
        Err(e) => Err(AppError::with_source(
            ErrorKind::Storage,
            format!("Failed to read store file: {}", path.display()),
            e,
        )),
    }
}

#[async_trait]
impl CounterStore for FileStore {
    fn provider_type(&self) -> &str {
        "file"
    }

    async fn get(&self, key: &str) -> AppResult<Option<u64>> {
        Ok(self.document.lock().await.get(key).copied())
    }

    async fn put(&self, key: &str, value: u64) -> AppResult<()> {
        self.put_many(&[(key.to_string(), value)]).await
    }

    async fn put_many(&self, entries: &[(String, u64)]) -> AppResult<()> {
        if self.read_only {
            return Err(AppError::storage(format!(
                "Store file is open read-only: {}",
                self.path.display()
            )));
        }
        let mut document = self.document.lock().await;
        let mut next = document.clone();
        for (key, value) in entries {
            next.insert(key.clone(), *value);
        }

        self.persist(&next).await?;
        *document = next;
        debug!(count = entries.len(), "Wrote counts to file store");
        Ok(())
    }

    async fn list(&self) -> AppResult<BTreeMap<String, u64>> {
        Ok(self.document.lock().await.clone())
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(self.path.parent().is_none_or(|p| p.as_os_str().is_empty() || p.is_dir()))
    }
}
