//! File-backed slot store.
//!
//! Each key lives in its own file under the store directory, so a write to
//! one key never touches another. Writes go to a uniquely named temp file in
//! the same directory that is then renamed over the key's file: readers in
//! other processes see the old or the new value, never a partial one, and
//! concurrent writers to the same key resolve to last rename wins.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::traits::SlotStore;

const SLOT_EXTENSION: &str = "slot";

/// Persisted key-value store in a directory, one file per key.
///
/// Shared by every process that opens the same directory. Individual
/// `get`/`set` calls are atomic with respect to each other; there is no
/// cross-process compare-and-set.
pub struct FileSlotStore {
    dir: PathBuf,
    max_value_len: Option<usize>,
}

impl FileSlotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            max_value_len: None,
        }
    }

    /// Reject values longer than `limit` bytes.
    pub fn with_max_value_len(mut self, limit: usize) -> Self {
        self.max_value_len = Some(limit);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding `key`. Bytes outside `[A-Za-z0-9_.-]` are `%XX`-escaped.
    pub fn key_path(&self, key: &str) -> PathBuf {
        let mut name = String::with_capacity(key.len() + SLOT_EXTENSION.len() + 1);
        for byte in key.bytes() {
            if byte.is_ascii_alphanumeric() || matches!(byte, b'_' | b'-' | b'.') {
                name.push(char::from(byte));
            } else {
                name.push_str(&format!("%{byte:02X}"));
            }
        }
        name.push('.');
        name.push_str(SLOT_EXTENSION);
        self.dir.join(name)
    }
}

fn write_atomically(dir: &Path, path: &Path, value: &str) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)?;
    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    temp.write_all(value.as_bytes())?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|err| err.error)?;
    Ok(())
}

#[async_trait]
impl SlotStore for FileSlotStore {
    async fn get(&self, key: &str) -> Result<String> {
        match tokio::fs::read_to_string(self.key_path(key)).await {
            Ok(value) => Ok(value),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        if let Some(limit) = self.max_value_len {
            if value.len() > limit {
                return Err(StoreError::CapacityExceeded {
                    key: key.to_string(),
                    len: value.len(),
                    limit,
                });
            }
        }

        let dir = self.dir.clone();
        let path = self.key_path(key);
        let owned = value.to_string();
        tokio::task::spawn_blocking(move || write_atomically(&dir, &path, &owned))
            .await
            .map_err(std::io::Error::other)??;

        debug!(dir = %self.dir.display(), key, bytes = value.len(), "Slot file written");
        Ok(())
    }
}
