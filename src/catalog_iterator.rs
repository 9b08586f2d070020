//! `CatalogIterator` — a restartable pull-stream over `(categoryId, url, cursor)` triples.
//!
//! Modeled as an explicit pull-stream rather than a generator or `Iterator` impl:
//! `next()` is `async` and fallible, because fetching a category's URL list can fail
//! independently of fetching the next item. Grounded on `ImageNetUrls.__iter__` in the
//! source's `image_net/iterators.py`.

use std::sync::Arc;

use crate::catalog::CatalogStore;
use crate::cursor::Cursor;
use crate::error::{Error, Result};

/// Lazy, restartable iteration over the catalog's category → url cross product.
pub struct CatalogIterator {
    store: Arc<CatalogStore>,
    start_after: Cursor,
    categories: Vec<String>,
    category_idx: usize,
    current: Option<CurrentCategory>,
}

struct CurrentCategory {
    category_id: String,
    urls: Vec<String>,
    url_idx: usize,
}

impl CatalogIterator {
    /// Fetch the category index and construct an iterator that will yield only
    /// positions strictly after `start_after`.
    ///
    /// Fetching the category index is fatal: failure here propagates
    /// [`Error::CatalogUnavailable`] rather than skipping anything.
    pub async fn new(store: Arc<CatalogStore>, start_after: Cursor) -> Result<Self> {
        let index_path = store.fetch_category_index().await?;
        let contents = tokio::fs::read_to_string(&index_path).await?;
        let categories = non_blank_lines(&contents);

        Ok(Self {
            store,
            start_after,
            categories,
            category_idx: 0,
            current: None,
        })
    }

    /// Produce the next `(categoryId, url, cursor)` triple, or `None` once the
    /// catalog is exhausted.
    pub async fn next(&mut self) -> Result<Option<(String, String, Cursor)>> {
        loop {
            if self.category_idx >= self.categories.len() {
                return Ok(None);
            }

            if self.current.is_none() {
                if (self.category_idx as i64) < self.start_after.category_index() {
                    // Entirely behind the resume point; skip without fetching.
                    self.category_idx += 1;
                    continue;
                }

                let category_id = self.categories[self.category_idx].clone();
                match self.store.fetch_category_urls(&category_id).await {
                    Ok(path) => {
                        let contents = tokio::fs::read_to_string(&path).await?;
                        self.current = Some(CurrentCategory {
                            category_id,
                            urls: non_blank_lines(&contents),
                            url_idx: 0,
                        });
                    }
                    Err(err) if err.is_recoverable() => {
                        tracing::warn!(category = %category_id, error = %err, "skipping category");
                        self.category_idx += 1;
                        continue;
                    }
                    Err(err) => return Err(err),
                }
            }

            let current = self.current.as_mut().expect("just ensured Some");
            if current.url_idx >= current.urls.len() {
                self.current = None;
                self.category_idx += 1;
                continue;
            }

            let position = Cursor::new(self.category_idx as i64, current.url_idx as i64);
            let url = current.urls[current.url_idx].clone();
            let category_id = current.category_id.clone();
            current.url_idx += 1;

            if position <= self.start_after {
                continue;
            }

            return Ok(Some((category_id, url, position)));
        }
    }
}

/// Split into lines, trimming whitespace and dropping lines empty after trimming —
/// the "stripped of blank lines on read" contract shared by both catalog file kinds.
fn non_blank_lines(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
