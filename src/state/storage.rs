//! Durable key-value storage for session fields.
//!
//! Values are plain strings under logical keys. `set_many` commits every pair in a
//! single durable write so related fields can never be persisted half-way.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::errors::{MoodsError, MoodsResult};

pub const CURRENT_USER_KEY: &str = "moods_current_user";
pub const AUTH_TOKEN_KEY: &str = "moods_auth_token";
pub const LOGIN_EMAIL_KEY: &str = "moods_email";

#[async_trait]
pub trait KeyValueStorage: Send + Sync {
    async fn get(&self, key: &str) -> MoodsResult<Option<String>>;

    /// Writes every pair in one commit.
    async fn set_many(&self, pairs: &[(&str, &str)]) -> MoodsResult<()>;

    async fn remove_many(&self, keys: &[&str]) -> MoodsResult<()>;
}

/// A single TOML document of string keys, replaced atomically on every write.
pub struct FileStorage {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> MoodsResult<BTreeMap<String, String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => toml::from_str(&content).map_err(|e| {
                MoodsError::Storage(format!("corrupt session file {}: {e}", self.path.display()))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Current contents for a read-modify-write. A file that no longer parses is
    /// dropped so the next write replaces it.
    async fn read_for_write(&self) -> MoodsResult<BTreeMap<String, String>> {
        match self.read_all().await {
            Err(MoodsError::Storage(reason)) => {
                tracing::warn!(reason = %reason, "discarding unreadable session file");
                Ok(BTreeMap::new())
            }
            other => other,
        }
    }

    async fn write_all(&self, values: &BTreeMap<String, String>) -> MoodsResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = toml::to_string_pretty(values)?;
        let tmp_path = self.path.with_extension("toml.tmp");

        let mut file = tokio::fs::File::create(&tmp_path).await?;
        file.write_all(content.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp_path, &self.path).await?;
        tracing::debug!(path = %self.path.display(), keys = values.len(), "session file written");
        Ok(())
    }
}

#[async_trait]
impl KeyValueStorage for FileStorage {
    async fn get(&self, key: &str) -> MoodsResult<Option<String>> {
        let values = self.read_all().await?;
        Ok(values.get(key).cloned())
    }

    async fn set_many(&self, pairs: &[(&str, &str)]) -> MoodsResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut values = self.read_for_write().await?;
        for (key, value) in pairs {
            values.insert((*key).to_string(), (*value).to_string());
        }
        self.write_all(&values).await
    }

    async fn remove_many(&self, keys: &[&str]) -> MoodsResult<()> {
        let _guard = self.write_lock.lock().await;
        let (mut values, corrupt) = match self.read_all().await {
            Err(MoodsError::Storage(reason)) => {
                tracing::warn!(reason = %reason, "discarding unreadable session file");
                (BTreeMap::new(), true)
            }
            other => (other?, false),
        };
        let before = values.len();
        for key in keys {
            values.remove(*key);
        }
        if values.len() == before && !corrupt {
            return Ok(());
        }
        self.write_all(&values).await
    }
}

/// Process-local storage. Used for `backend = "memory"` and by tests, which can make
/// reads or writes fail on demand.
#[derive(Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<String, String>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl KeyValueStorage for MemoryStorage {
    async fn get(&self, key: &str) -> MoodsResult<Option<String>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(MoodsError::Storage(format!("read of {key} failed")));
        }
        Ok(self.values.lock().await.get(key).cloned())
    }

    async fn set_many(&self, pairs: &[(&str, &str)]) -> MoodsResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(MoodsError::Storage("write failed".into()));
        }
        let mut values = self.values.lock().await;
        for (key, value) in pairs {
            values.insert((*key).to_string(), (*value).to_string());
        }
        Ok(())
    }

    async fn remove_many(&self, keys: &[&str]) -> MoodsResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(MoodsError::Storage("remove failed".into()));
        }
        let mut values = self.values.lock().await;
        for key in keys {
            values.remove(*key);
        }
        Ok(())
    }
}
