//! Process-wide dependency bundle, built once at the composition root.
//!
//! Replaces the source's global singletons (a module-level `config` object and a
//! process-wide thread pool read from call sites) with an explicit value threaded
//! through constructors.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::RuntimeOptions;

struct RuntimeInner {
    data_dir: PathBuf,
    http: reqwest::Client,
    options: RuntimeOptions,
}

/// Shared dependencies for catalog fetches, image fetches, and the fetch pool.
///
/// Cheap to clone: all state lives behind an `Arc`.
#[derive(Clone)]
pub struct Runtime {
    inner: Arc<RuntimeInner>,
}

impl Runtime {
    /// Build a Runtime rooted at `data_dir`, creating it if missing.
    pub fn new(data_dir: impl Into<PathBuf>, options: RuntimeOptions) -> crate::error::Result<Self> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)?;

        let http = reqwest::Client::builder()
            .build()
            .map_err(crate::error::Error::Network)?;

        Ok(Self {
            inner: Arc::new(RuntimeInner {
                data_dir,
                http,
                options,
            }),
        })
    }

    /// The application data folder (catalog cache + `app_state.json`).
    pub fn data_dir(&self) -> &Path {
        &self.inner.data_dir
    }

    /// Shared HTTP client, reused across catalog and image fetches for connection pooling.
    pub fn http(&self) -> &reqwest::Client {
        &self.inner.http
    }

    /// Configured timeouts and fetch-pool size.
    pub fn options(&self) -> &RuntimeOptions {
        &self.inner.options
    }

    /// Path to the cached category index (`word_net_ids.txt`).
    pub fn category_index_path(&self) -> PathBuf {
        self.inner.data_dir.join("word_net_ids.txt")
    }

    /// Path to the cached URL list for a category (`synset_urls_<categoryId>.txt`).
    pub fn category_urls_path(&self, category_id: &str) -> PathBuf {
        self.inner
            .data_dir
            .join(format!("synset_urls_{category_id}.txt"))
    }

    /// Path to the persisted `AppState` document.
    pub fn app_state_path(&self) -> PathBuf {
        self.inner.data_dir.join("app_state.json")
    }

    /// Path to the optional append-only failures log.
    pub fn failures_log_path(&self) -> PathBuf {
        self.inner.data_dir.join("failures.log")
    }

    /// Truncate the failures log, called on `configure`/`reset`.
    pub async fn clear_failures_log(&self) -> crate::error::Result<()> {
        tokio::fs::write(self.failures_log_path(), b"").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_on_disk_paths_from_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let rt = Runtime::new(dir.path(), RuntimeOptions::default()).unwrap();
        assert_eq!(rt.category_index_path(), dir.path().join("word_net_ids.txt"));
        assert_eq!(
            rt.category_urls_path("n392093"),
            dir.path().join("synset_urls_n392093.txt")
        );
        assert_eq!(rt.app_state_path(), dir.path().join("app_state.json"));
    }

    #[test]
    fn creates_missing_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested").join("data");
        let rt = Runtime::new(&nested, RuntimeOptions::default()).unwrap();
        assert!(rt.data_dir().exists());
    }

    #[tokio::test]
    async fn clear_failures_log_truncates_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let rt = Runtime::new(dir.path(), RuntimeOptions::default()).unwrap();
        tokio::fs::write(rt.failures_log_path(), b"http://example.com/a.jpg\n")
            .await
            .unwrap();

        rt.clear_failures_log().await.unwrap();

        let contents = tokio::fs::read_to_string(rt.failures_log_path()).await.unwrap();
        assert!(contents.is_empty());
    }
}
