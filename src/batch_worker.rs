//! `BatchWorker` — fetches and validates a set of `(url, destPath)` pairs in
//! parallel through a bounded pool.
//!
//! Grounded on `ThreadingDownloader` in the source's `image_net/downloader.py`;
//! the bounded-concurrency stream mirrors `download_all_batches` in the teacher
//! crate's `downloader/download_task/batching.rs`.

use std::path::PathBuf;
use std::sync::Arc;

use futures::stream::{self, StreamExt};

use crate::fetcher::Fetcher;
use crate::validator::Validator;

/// The outcome of running one batch: every input URL appears in exactly one
/// of the two sets.
pub struct BatchOutcome {
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
}

/// Runs `Fetcher` then `Validator` for each `(url, destPath)` pair, bounded to
/// `pool_size` concurrent tasks. Results are associated back to inputs by
/// index, not completion order, though the outcome itself only needs the URL.
pub struct BatchWorker<F, V> {
    fetcher: Arc<F>,
    validator: Arc<V>,
    pool_size: usize,
}

impl<F, V> BatchWorker<F, V>
where
    F: Fetcher + 'static,
    V: Validator + 'static,
{
    pub fn new(fetcher: Arc<F>, validator: Arc<V>, pool_size: usize) -> Self {
        Self {
            fetcher,
            validator,
            pool_size,
        }
    }

    /// `urls` and `dest_paths` must be the same length; duplicate URLs are
    /// fetched independently and each occurrence is classified on its own.
    pub async fn run(&self, urls: &[String], dest_paths: &[PathBuf]) -> BatchOutcome {
        debug_assert_eq!(urls.len(), dest_paths.len());

        let tasks = urls.iter().cloned().zip(dest_paths.iter().cloned());
        let results: Vec<(String, bool)> = stream::iter(tasks)
            .map(|(url, dest)| {
                let fetcher = Arc::clone(&self.fetcher);
                let validator = Arc::clone(&self.validator);
                async move {
                    let ok = Self::fetch_and_validate(&*fetcher, &*validator, &url, &dest).await;
                    (url, ok)
                }
            })
            .buffer_unordered(self.pool_size.max(1))
            .collect()
            .await;

        let mut succeeded = Vec::new();
        let mut failed = Vec::new();
        for (url, ok) in results {
            if ok {
                succeeded.push(url);
            } else {
                failed.push(url);
            }
        }
        BatchOutcome { succeeded, failed }
    }

    async fn fetch_and_validate(
        fetcher: &F,
        validator: &V,
        url: &str,
        dest: &std::path::Path,
    ) -> bool {
        if !fetcher.fetch(url, dest).await {
            return false;
        }
        if validator.valid_image(dest) {
            true
        } else {
            let _ = tokio::fs::remove_file(dest).await;
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::StubFetcher;
    use crate::validator::{StubValidator, Validator as _};

    #[tokio::test]
    async fn every_input_url_lands_in_exactly_one_set() {
        let dir = tempfile::tempdir().unwrap();
        let urls = vec!["u1".to_string(), "u2".to_string(), "u3".to_string()];
        let dests = vec![
            dir.path().join("1"),
            dir.path().join("2"),
            dir.path().join("3"),
        ];

        let worker = BatchWorker::new(Arc::new(StubFetcher), Arc::new(StubValidator::default()), 2);
        let outcome = worker.run(&urls, &dests).await;

        assert_eq!(outcome.succeeded.len() + outcome.failed.len(), 3);
    }

    #[tokio::test]
    async fn failed_validation_deletes_the_file() {
        struct AlwaysInvalid;
        impl Validator for AlwaysInvalid {
            fn valid_image(&self, _path: &std::path::Path) -> bool {
                false
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out");
        let worker = BatchWorker::new(Arc::new(StubFetcher), Arc::new(AlwaysInvalid), 4);
        let outcome = worker.run(&["u1".to_string()], &[dest.clone()]).await;

        assert_eq!(outcome.failed, vec!["u1".to_string()]);
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn duplicate_urls_are_classified_independently() {
        let dir = tempfile::tempdir().unwrap();
        let urls = vec!["dup".to_string(), "dup".to_string()];
        let dests = vec![dir.path().join("a"), dir.path().join("b")];

        let worker = BatchWorker::new(Arc::new(StubFetcher), Arc::new(StubValidator::default()), 2);
        let outcome = worker.run(&urls, &dests).await;

        assert_eq!(outcome.succeeded.len() + outcome.failed.len(), 2);
    }
}
