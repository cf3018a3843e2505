//! Key/value stores backing the cache resolver.
//!
//! A store only needs `get` and `put`. Both are infallible from the caller's
//! point of view: I/O problems are logged and surface as a miss or a `false`
//! from `put`, since caching is strictly best-effort.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

use crate::config::CacheConfig;
use crate::error::{Result, StencilError};

/// External cache store boundary.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Return the stored value, or `None` on a miss.
    async fn get(&self, key: &str) -> Option<Vec<u8>>;

    /// Store `value` under `key`, overwriting any previous value.
    /// Returns whether the store accepted the write.
    async fn put(&self, key: &str, value: &[u8]) -> bool;
}

/// Process-local store.
#[derive(Default)]
pub struct MemoryStore {
    data: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.data.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.data.read().await.is_empty()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.data.read().await.get(key).cloned()
    }

    async fn put(&self, key: &str, value: &[u8]) -> bool {
        self.data.write().await.insert(key.to_string(), value.to_vec());
        true
    }
}

static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// One file per key under a directory.
///
/// File names are the SHA-256 of the key, so any key is a valid file name.
pub struct FilesystemStore {
    base_path: PathBuf,
}

impl FilesystemStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn key_path(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.base_path.join(format!("{}.cache", hex::encode(digest)))
    }

    async fn write(&self, key: &str, value: &[u8]) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.base_path).await?;
        let path = self.key_path(key);
        // Each write owns its temp file; readers never observe a partial entry.
        let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
        let tmp = path.with_extension(format!("tmp.{}.{seq}", std::process::id()));
        let written = match tokio::fs::write(&tmp, value).await {
            Ok(()) => tokio::fs::rename(&tmp, &path).await,
            Err(e) => Err(e),
        };
        if written.is_err() {
            let _ = tokio::fs::remove_file(&tmp).await;
        }
        written
    }
}

#[async_trait]
impl CacheStore for FilesystemStore {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        match tokio::fs::read(self.key_path(key)).await {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!("cache read failed for '{key}': {e}");
                None
            }
        }
    }

    async fn put(&self, key: &str, value: &[u8]) -> bool {
        match self.write(key, value).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("cache write failed for '{key}': {e}");
                false
            }
        }
    }
}

/// Store that never keeps anything.
pub struct BlackholeStore;

#[async_trait]
impl CacheStore for BlackholeStore {
    async fn get(&self, _key: &str) -> Option<Vec<u8>> {
        None
    }

    async fn put(&self, _key: &str, _value: &[u8]) -> bool {
        false
    }
}

/// Build a store from the `cache` config section.
pub fn from_config(config: Option<&CacheConfig>) -> Result<Arc<dyn CacheStore>> {
    let config = config.ok_or_else(|| {
        StencilError::Configuration("cannot find cache configuration".into())
    })?;
    let adapter = config
        .adapter
        .as_deref()
        .ok_or_else(|| StencilError::Configuration("cache configuration has no adapter".into()))?;

    match adapter {
        "memory" => Ok(Arc::new(MemoryStore::new())),
        "blackhole" => Ok(Arc::new(BlackholeStore)),
        "filesystem" => {
            let dir = config.options.cache_dir.clone().ok_or_else(|| {
                StencilError::Configuration(
                    "filesystem cache adapter requires options.cache-dir".into(),
                )
            })?;
            Ok(Arc::new(FilesystemStore::new(dir)))
        }
        other => Err(StencilError::Configuration(format!(
            "unknown cache adapter: {other} (supported: memory, filesystem, blackhole)"
        ))),
    }
}
