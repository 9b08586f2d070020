//! `Cursor` — a totally ordered position in the catalog stream.
//!
//! Grounded on `Position` in the source's `image_net/iterators.py`.

use serde::{Deserialize, Serialize};

/// A `(categoryIndex, urlIndex)` position identifying one URL in the catalog stream.
///
/// `NULL` (`(-1, -1)`) sorts strictly before any real position and is the default
/// starting point for a fresh iteration.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Cursor {
    category_index: i64,
    url_index: i64,
}

impl Cursor {
    /// The sentinel position preceding any real cursor.
    pub const NULL: Cursor = Cursor {
        category_index: -1,
        url_index: -1,
    };

    /// A real position at the given offsets.
    pub fn new(category_index: i64, url_index: i64) -> Self {
        Self {
            category_index,
            url_index,
        }
    }

    /// The category offset.
    pub fn category_index(&self) -> i64 {
        self.category_index
    }

    /// The url-within-category offset.
    pub fn url_index(&self) -> i64 {
        self.url_index
    }

    /// Advance to the next url within the same category.
    pub fn advance_url(&mut self) {
        self.url_index += 1;
    }

    /// Advance to the first url of the next category, zeroing the url offset.
    pub fn advance_category(&mut self) {
        self.category_index += 1;
        self.url_index = 0;
    }

    /// Encode as the nested-JSON string format `app_state.json` stores
    /// (`internal_state.iterator_position_json`): a JSON string whose contents are
    /// themselves a JSON object with `word_id_offset`/`url_offset` keys.
    pub fn to_json(&self) -> String {
        serde_json::json!({
            "word_id_offset": self.category_index,
            "url_offset": self.url_index,
        })
        .to_string()
    }

    /// Decode the nested-JSON string format produced by [`Cursor::to_json`].
    pub fn from_json(s: &str) -> crate::error::Result<Self> {
        #[derive(Deserialize)]
        struct Raw {
            word_id_offset: i64,
            url_offset: i64,
        }
        let raw: Raw = serde_json::from_str(s)?;
        Ok(Self {
            category_index: raw.word_id_offset,
            url_index: raw.url_offset,
        })
    }
}

impl Default for Cursor {
    fn default() -> Self {
        Cursor::NULL
    }
}
