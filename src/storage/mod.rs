
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::PathBuf;
use tracing::debug;

/// Durable object store for pipeline artifacts.
///
/// Writes are best-effort from the pipeline's point of view: the caller
/// logs a failed `put` and moves on, it never aborts the invocation.
pub trait ObjectStore: Send + Sync {
    fn put(&self, key: &str, value: &str) -> Result<()>;
    fn get(&self, key: &str) -> Option<String>;
}

/// Fast cache for QA pairs. Write-only from the core's perspective.
pub trait QaCache: Send + Sync {
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Replace path separators so a URL can serve as a single key segment.
#[inline]
pub fn sanitize_url_key(url: &str) -> String {
    url.replace('/', "_")
}

/// Object-store key for the extracted text of a URL.
#[inline]
pub fn text_key(url: &str) -> String {
    format!("texts/{}.txt", sanitize_url_key(url))
}

/// Object-store key for the chunk embeddings of a URL.
///
/// The URL is always passed in explicitly by the caller; nothing is
/// captured ambiently.
#[inline]
pub fn embeddings_key(url: &str) -> String {
    format!("embeddings/{}.json", sanitize_url_key(url))
}

/// Object-store key for a QA record created at `time`.
#[inline]
pub fn qa_pair_key(time: DateTime<Utc>) -> String {
    format!("qa_pairs/{}.json", time.format("%Y%m%d%H%M%S"))
}

/// Cache key for a QA record created at `time`.
#[inline]
pub fn qa_cache_key(time: DateTime<Utc>) -> String {
    format!("qa:{}", time.timestamp())
}

/// Filesystem-backed [`ObjectStore`]. Keys map to paths under the root;
/// the namespace prefix (`texts/`, `embeddings/`, `qa_pairs/`) becomes a
/// subdirectory.
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    #[inline]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

impl ObjectStore for FsObjectStore {
    #[inline]
    fn put(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create store directory for key {}", key))?;
        }
        fs::write(&path, value).with_context(|| format!("Failed to write object {}", key))?;
        debug!("Stored object: {}", key);
        Ok(())
    }

    #[inline]
    fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path_for(key)).ok()
    }
}

/// Filesystem-backed [`QaCache`].
pub struct FsCache {
    root: PathBuf,
}

impl FsCache {
    #[inline]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

impl QaCache for FsCache {
    #[inline]
    fn set(&self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.root).context("Failed to create cache directory")?;
        // Cache keys use ':' separators; keep them filename-safe.
        let file_name = key.replace(':', "_");
        fs::write(self.root.join(file_name), value)
            .with_context(|| format!("Failed to write cache entry {}", key))?;
        debug!("Cached entry: {}", key);
        Ok(())
    }
}
