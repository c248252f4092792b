//! JSON-file token store.
//!
//! The whole record is a single JSON object of string values. Every write
//! rewrites the file through a sibling temp file and a rename, so a crash
//! mid-write leaves either the old or the new record on disk.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::{StorageError, TokenStore};

type Record = BTreeMap<String, String>;

/// [`TokenStore`] persisted to a JSON file.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl FileTokenStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write_lock: Mutex::new(()) }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Record, StorageError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Record::new()),
            Err(e) => return Err(e.into()),
        };
        if raw.trim().is_empty() {
            return Ok(Record::new());
        }
        serde_json::from_str(&raw).map_err(|e| StorageError::Corrupt(e.to_string()))
    }

    async fn save(&self, record: &Record) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let body = serde_json::to_vec_pretty(record).map_err(|e| StorageError::Corrupt(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        // A leftover temp file may carry wider permissions; never reuse it.
        match tokio::fs::remove_file(&tmp).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let mut file = owner_only_options().open(&tmp).await?;
        file.write_all(&body).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

/// Options for a fresh file that is owner read/write from the moment it exists.
fn owner_only_options() -> tokio::fs::OpenOptions {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);
    options
}

#[async_trait::async_trait]
impl TokenStore for FileTokenStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut record = self.load().await?;
        Ok(record.remove(key))
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut record = self.load().await?;
        record.insert(key.to_owned(), value.to_owned());
        self.save(&record).await
    }

    async fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut record = self.load().await?;
        if record.remove(key).is_none() {
            return Ok(());
        }
        self.save(&record).await
    }
}

#[cfg(test)]
#[path = "file_test.rs"]
mod file_test;
