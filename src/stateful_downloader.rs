//! `StatefulDownloader` — drives one configured run: pulls from
//! [`CatalogIterator`], feeds a [`BatchAccumulator`], persists [`AppState`]
//! after each flush, and yields per-batch results.
//!
//! Grounded on `StatefulDownloader` in the source's
//! `image_net/stateful_downloader.py`.

use std::collections::HashMap;
use std::sync::Arc;

use crate::app_state::{AppState, BatchResult};
use crate::batch_accumulator::BatchAccumulator;
use crate::batch_worker::BatchWorker;
use crate::catalog::CatalogStore;
use crate::catalog_iterator::CatalogIterator;
use crate::cursor::Cursor;
use crate::error::{Error, Result};
use crate::fetcher::Fetcher;
use crate::validator::Validator;

/// Supplies wall-clock seconds for the throughput estimator, injected so
/// tests can drive deterministic timelines.
pub trait Clock: Send + Sync {
    fn now_seconds(&self) -> f64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_seconds(&self) -> f64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64()
    }
}

pub struct StatefulDownloader<F, V> {
    app_state: AppState,
    accumulator: BatchAccumulator<F, V>,
    catalog_iter: CatalogIterator,
    clock: Arc<dyn Clock>,
    done: bool,
}

impl<F, V> StatefulDownloader<F, V>
where
    F: Fetcher + 'static,
    V: Validator + 'static,
{
    /// Begin (or resume) a run. `app_state.configured` must already be
    /// `true`; the accumulator is seeded with the saved file index and
    /// category counts, and the catalog iterator resumes strictly after the
    /// saved cursor.
    pub async fn new(
        mut app_state: AppState,
        catalog_store: Arc<CatalogStore>,
        worker: Arc<BatchWorker<F, V>>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        if !app_state.configured {
            return Err(Error::NotConfigured);
        }

        let conf = app_state.download_configuration.clone();
        let images_left = conf.number_of_images - app_state.progress_info.total_downloaded;

        if images_left <= 0 {
            app_state.mark_finished();
            app_state.save().await?;
        }

        let saved_cursor = Cursor::from_json(&app_state.internal_state.iterator_position_json)
            .unwrap_or(Cursor::NULL);
        let catalog_iter = CatalogIterator::new(catalog_store, saved_cursor).await?;

        let accumulator = BatchAccumulator::new(
            worker,
            std::path::PathBuf::from(&conf.download_destination),
            conf.batch_size,
            images_left.max(0),
            conf.images_per_category,
            app_state.internal_state.file_index,
            app_state.internal_state.category_counts.clone(),
            0,
        );

        Ok(Self {
            app_state,
            accumulator,
            catalog_iter,
            clock,
            done: images_left <= 0,
        })
    }

    pub fn app_state(&self) -> &AppState {
        &self.app_state
    }

    /// Pull and process catalog entries until a flush happens or the catalog
    /// is exhausted, returning that flush's result. `Ok(None)` means the run
    /// has terminated (target met or catalog exhausted with nothing pending).
    pub async fn next_batch(&mut self) -> Result<Option<BatchResult>> {
        if self.done {
            return Ok(None);
        }

        loop {
            match self.catalog_iter.next().await? {
                Some((category_id, url, position)) => {
                    self.accumulator.add(&category_id, &url);

                    if self.accumulator.ready() {
                        let result = self.flush_and_persist().await?;
                        if self.accumulator.complete() {
                            self.app_state.mark_finished();
                            self.app_state.save().await?;
                            self.done = true;
                        }
                        // Cursor/category-count advance regardless of flush,
                        // matching the source: on crash the system resumes
                        // from the last *persisted* cursor, losing at most
                        // one in-flight batch's progress.
                        self.app_state.internal_state.iterator_position_json = position.to_json();
                        return Ok(Some(result));
                    }

                    self.app_state.internal_state.iterator_position_json = position.to_json();
                }
                None => {
                    self.done = true;
                    if !self.accumulator.is_empty() {
                        let result = self.flush_and_persist().await?;
                        self.app_state.mark_finished();
                        self.app_state.save().await?;
                        return Ok(Some(result));
                    }
                    self.app_state.mark_finished();
                    self.app_state.save().await?;
                    return Ok(None);
                }
            }
        }
    }

    async fn flush_and_persist(&mut self) -> Result<BatchResult> {
        let flush = self.accumulator.flush().await?;

        let result = BatchResult {
            failed_urls: flush.outcome.failed,
            succeeded_urls: flush.outcome.succeeded,
        };
        self.app_state
            .update_progress(self.clock.now_seconds(), result.clone());
        self.app_state.internal_state.file_index = self.accumulator.file_index();
        self.app_state.internal_state.category_counts =
            self.accumulator.category_counts().clone();
        self.app_state.save().await?;

        Ok(result)
    }
}
