//! `Fetcher` — downloads a single URL to a file path.
//!
//! Grounded on `FileDownloader`/`DummyDownloader` in the source's
//! `image_net/downloader.py`.

use std::future::Future;
use std::path::Path;

use futures::TryStreamExt;
use tokio::io::AsyncWriteExt;
use tokio_util::io::StreamReader;

use crate::runtime::Runtime;

/// A pluggable single-URL downloader.
///
/// Implementations open the destination only after a successful response,
/// stream the body, and treat any non-success response or transport error as
/// `Ok(false)` rather than an `Err` — failures here are routine and handled by
/// the caller, not exceptional.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, url: &str, dest: &Path) -> impl Future<Output = bool> + Send;
}

/// Streams the HTTP response body directly to `dest` via the shared [`Runtime`]
/// client, honoring the runtime's configured fetch timeout.
pub struct HttpFetcher {
    runtime: Runtime,
}

impl HttpFetcher {
    pub fn new(runtime: Runtime) -> Self {
        Self { runtime }
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> bool {
        match self.try_fetch(url, dest).await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(url, error = %err, "fetch failed");
                let _ = tokio::fs::remove_file(dest).await;
                false
            }
        }
    }
}

impl HttpFetcher {
    async fn try_fetch(&self, url: &str, dest: &Path) -> crate::error::Result<()> {
        let response = self
            .runtime
            .http()
            .get(url)
            .timeout(self.runtime.options().fetch_timeout)
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

/// Writes a fixed literal instead of performing any network I/O. Used in tests
/// that exercise BatchWorker/BatchAccumulator wiring without a mock server.
pub struct StubFetcher;

impl Fetcher for StubFetcher {
    async fn fetch(&self, _url: &str, dest: &Path) -> bool {
        tokio::fs::write(dest, b"stub fetcher output").await.is_ok()
    }
}
