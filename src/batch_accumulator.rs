//! `BatchAccumulator` — buffers `(categoryId, url)` pairs, enforces the
//! per-category quota, and flushes through a [`BatchWorker`].
//!
//! Grounded on `BatchDownload`/`DownloadLocation` in the source's
//! `image_net/batch_download.py`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::batch_worker::{BatchOutcome, BatchWorker};
use crate::error::Result;
use crate::fetcher::Fetcher;
use crate::url_namer::UrlNamer;
use crate::validator::Validator;

/// Result of one [`BatchAccumulator::flush`]: the raw fetch outcome plus
/// whether this flush pushed the run's total over `max_images` for the first
/// time.
pub struct FlushResult {
    pub outcome: BatchOutcome,
    pub newly_complete: bool,
}

pub struct BatchAccumulator<F, V> {
    worker: Arc<BatchWorker<F, V>>,
    dataset_root: PathBuf,
    batch_size: usize,
    max_images: i64,
    images_per_category: i64,
    namer: UrlNamer,
    category_counts: HashMap<String, i64>,
    total_downloaded: i64,
    pending: Vec<(String, String)>,
}

impl<F, V> BatchAccumulator<F, V>
where
    F: Fetcher + 'static,
    V: Validator + 'static,
{
    pub fn new(
        worker: Arc<BatchWorker<F, V>>,
        dataset_root: PathBuf,
        batch_size: usize,
        max_images: i64,
        images_per_category: i64,
        starting_index: i64,
        category_counts: HashMap<String, i64>,
        total_downloaded: i64,
    ) -> Self {
        Self {
            worker,
            dataset_root,
            batch_size,
            max_images,
            images_per_category,
            namer: UrlNamer::new(starting_index),
            category_counts,
            total_downloaded,
            pending: Vec::new(),
        }
    }

    pub fn category_counts(&self) -> &HashMap<String, i64> {
        &self.category_counts
    }

    pub fn total_downloaded(&self) -> i64 {
        self.total_downloaded
    }

    pub fn file_index(&self) -> i64 {
        self.namer.file_index()
    }

    pub fn ready(&self) -> bool {
        self.pending.len() >= self.batch_size
    }

    pub fn complete(&self) -> bool {
        self.total_downloaded >= self.max_images
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Queue `(category_id, url)` if the category hasn't yet hit its quota;
    /// silently dropped otherwise. This is the sole quota enforcement point —
    /// it happens before any network I/O.
    pub fn add(&mut self, category_id: &str, url: &str) {
        let count = self.category_counts.entry(category_id.to_string()).or_insert(0);
        if *count < self.images_per_category {
            self.pending.push((category_id.to_string(), url.to_string()));
        }
    }

    /// Fetch+validate every pending pair, update counters, and clear the
    /// buffer. Fails only if a destination path cannot be computed (malformed
    /// URL) or a category directory cannot be created — both are treated as
    /// fatal, matching the source's unguarded `os.mkdir`/`convert` calls.
    pub async fn flush(&mut self) -> Result<FlushResult> {
        let mut urls = Vec::with_capacity(self.pending.len());
        let mut dest_paths = Vec::with_capacity(self.pending.len());

        for (category_id, url) in &self.pending {
            let folder = self.dataset_root.join(category_id);
            tokio::fs::create_dir_all(&folder).await?;
            let file_name = self.namer.convert(url)?;
            dest_paths.push(folder.join(file_name));
            urls.push(url.clone());
        }

        let outcome = self.worker.run(&urls, &dest_paths).await;

        self.total_downloaded += outcome.succeeded.len() as i64;
        let newly_complete = self.complete();

        self.update_category_counts(&outcome.succeeded);
        self.pending.clear();

        Ok(FlushResult {
            outcome,
            newly_complete,
        })
    }

    /// Build `url -> [categoryId, ...]` over the full pending list in a single
    /// unguarded pass, then credit every paired category for each succeeded
    /// URL — not just the first category it was queued under.
    fn update_category_counts(&mut self, succeeded: &[String]) {
        let mut url_to_categories: HashMap<&str, Vec<&str>> = HashMap::new();
        for (category_id, url) in &self.pending {
            url_to_categories
                .entry(url.as_str())
                .or_default()
                .push(category_id.as_str());
        }

        for url in succeeded {
            if let Some(categories) = url_to_categories.get(url.as_str()) {
                for category_id in categories {
                    *self
                        .category_counts
                        .entry((*category_id).to_string())
                        .or_insert(0) += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::StubFetcher;
    use crate::validator::StubValidator;

    fn worker() -> Arc<BatchWorker<StubFetcher, StubValidator>> {
        Arc::new(BatchWorker::new(Arc::new(StubFetcher), Arc::new(StubValidator::default()), 4))
    }

    #[tokio::test]
    async fn quota_drops_excess_adds_silently() {
        let dir = tempfile::tempdir().unwrap();
        let mut acc = BatchAccumulator::new(worker(), dir.path().to_path_buf(), 100, 1000, 2, 1, HashMap::new(), 0);
        acc.add("catA", "u1");
        acc.add("catA", "u2");
        acc.add("catA", "u3"); // quota is 2, dropped
        assert_eq!(acc.pending.len(), 2);
    }

    #[tokio::test]
    async fn flush_attributes_success_to_every_paired_category() {
        let dir = tempfile::tempdir().unwrap();
        let mut acc = BatchAccumulator::new(worker(), dir.path().to_path_buf(), 100, 1000, 100, 1, HashMap::new(), 0);
        // same url queued under two categories within one batch
        acc.add("catA", "http://x/shared.jpg");
        acc.add("catB", "http://x/shared.jpg");

        let result = acc.flush().await.unwrap();
        // StubFetcher always succeeds; with two pending entries sharing the
        // url and a validator that alternates, at least check attribution math:
        let succeeded: std::collections::HashSet<_> = result.outcome.succeeded.into_iter().collect();
        if succeeded.contains("http://x/shared.jpg") {
            assert_eq!(acc.category_counts().get("catA"), Some(&1));
            assert_eq!(acc.category_counts().get("catB"), Some(&1));
        }
    }

    #[tokio::test]
    async fn ready_and_complete_thresholds() {
        let dir = tempfile::tempdir().unwrap();
        let mut acc = BatchAccumulator::new(worker(), dir.path().to_path_buf(), 2, 1, 100, 1, HashMap::new(), 0);
        assert!(!acc.ready());
        acc.add("catA", "u1");
        acc.add("catA", "u2");
        assert!(acc.ready());
        assert!(!acc.complete());

        let result = acc.flush().await.unwrap();
        assert!(acc.is_empty());
        if !result.outcome.succeeded.is_empty() {
            assert!(acc.complete());
        }
    }
}
