//! `CatalogStore` — downloads and caches the category index and per-category URL lists.
//!
//! Grounded on `ImageNetUrls.fetch_wordnet_ids`/`fetch_url_list` in the source's
//! `image_net/iterators.py`.

use std::path::{Path, PathBuf};

use futures::TryStreamExt;
use tokio::io::AsyncWriteExt;
use tokio_util::io::StreamReader;

use crate::error::{Error, Result};
use crate::runtime::Runtime;

/// "Download if not present, else reuse" cache over the two catalog HTTP endpoints.
pub struct CatalogStore {
    runtime: Runtime,
    catalog_base_url: String,
}

impl CatalogStore {
    /// `catalog_base_url` is the catalog HTTP origin; the index lives at
    /// `{base}/word_net_ids` and a category's URLs at `{base}/synset/{categoryId}`.
    pub fn new(runtime: Runtime, catalog_base_url: impl Into<String>) -> Self {
        Self {
            runtime,
            catalog_base_url: catalog_base_url.into(),
        }
    }

    /// The Runtime this store fetches through, exposed so callers (the state
    /// machine, the download manager) can reach `failures_log_path()` without
    /// threading a second Runtime handle alongside the store.
    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Ensure the cached category index exists locally, downloading it if missing.
    ///
    /// Fails with [`Error::CatalogUnavailable`] if the file is absent and the
    /// download fails; a pre-existing cached file is never re-validated.
    pub async fn fetch_category_index(&self) -> Result<PathBuf> {
        let dest = self.runtime.category_index_path();
        if dest.is_file() {
            return Ok(dest);
        }

        let url = format!("{}/word_net_ids", self.catalog_base_url);
        self.download_to(&url, &dest, self.runtime.options().catalog_timeout)
            .await
            .map_err(|e| Error::CatalogUnavailable(e.to_string()))?;
        Ok(dest)
    }

    /// Ensure the cached URL list for `category_id` exists locally, downloading it
    /// if missing.
    pub async fn fetch_category_urls(&self, category_id: &str) -> Result<PathBuf> {
        let dest = self.runtime.category_urls_path(category_id);
        if dest.is_file() {
            return Ok(dest);
        }

        let url = format!("{}/synset/{category_id}", self.catalog_base_url);
        self.download_to(&url, &dest, self.runtime.options().category_timeout)
            .await
            .map_err(|e| Error::CategoryUrlsUnavailable {
                category_id: category_id.to_string(),
                source: e.to_string(),
            })?;
        Ok(dest)
    }

    /// Stream the response body straight to `dest`, never buffering it as text.
    async fn download_to(&self, url: &str, dest: &Path, timeout: std::time::Duration) -> Result<()> {
        tracing::debug!(url, "fetching catalog resource");

        let response = self
            .runtime
            .http()
            .get(url)
            .timeout(timeout)
            .send()
            .await?
            .error_for_status()?;

        let stream = response
            .bytes_stream()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e));
        let mut reader = StreamReader::new(stream);

        let mut file = tokio::fs::File::create(dest).await?;
        tokio::io::copy(&mut reader, &mut file).await?;
        file.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeOptions;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn test_runtime() -> (Runtime, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let rt = Runtime::new(dir.path(), RuntimeOptions::default()).unwrap();
        (rt, dir)
    }

    #[tokio::test]
    async fn downloads_category_index_when_missing() {
        let (rt, _dir) = test_runtime().await;
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/word_net_ids"))
            .respond_with(ResponseTemplate::new(200).set_body_string("n1\nn2\n"))
            .mount(&server)
            .await;

        let store = CatalogStore::new(rt.clone(), server.uri());
        let path = store.fetch_category_index().await.unwrap();
        let contents = tokio::fs::read_to_string(path).await.unwrap();
        assert_eq!(contents, "n1\nn2\n");
    }

    #[tokio::test]
    async fn reuses_cached_index_without_refetching() {
        let (rt, _dir) = test_runtime().await;
        tokio::fs::write(rt.category_index_path(), "cached\n")
            .await
            .unwrap();

        // No mock server mounted at all — any request would fail with a connect error.
        let store = CatalogStore::new(rt.clone(), "http://127.0.0.1:1".to_string());
        let path = store.fetch_category_index().await.unwrap();
        let contents = tokio::fs::read_to_string(path).await.unwrap();
        assert_eq!(contents, "cached\n");
    }

    #[tokio::test]
    async fn category_urls_unavailable_is_non_fatal_variant() {
        let (rt, _dir) = test_runtime().await;
        let store = CatalogStore::new(rt, "http://127.0.0.1:1".to_string());
        let err = store.fetch_category_urls("n392093").await.unwrap_err();
        assert!(matches!(err, Error::CategoryUrlsUnavailable { .. }));
    }
}
