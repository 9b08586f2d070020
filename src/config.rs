//! Configuration types for imageset-dl
//!
//! User-facing download configuration lives on [`crate::app_state::DownloadConfiguration`]
//! instead of here, since it's validated and persisted as part of `AppState`.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Process-wide runtime options: timeouts and the fetch-pool size.
///
/// Bundled into a [`crate::runtime::Runtime`] at the composition root rather than
/// read from global/env state at each call site.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RuntimeOptions {
    /// Timeout for downloading the master category index.
    #[serde(default = "default_catalog_timeout", with = "duration_secs")]
    pub catalog_timeout: Duration,

    /// Timeout for downloading a single category's URL list.
    #[serde(default = "default_category_timeout", with = "duration_secs")]
    pub category_timeout: Duration,

    /// Timeout for a single image fetch.
    ///
    /// The source's `file_download_timeout=1` is a per-chunk read timeout from an
    /// early-2010s `requests` usage pattern, not a whole-request budget; inheriting
    /// it literally would fail every real fetch, so this defaults to 30s instead.
    #[serde(default = "default_fetch_timeout", with = "duration_secs")]
    pub fetch_timeout: Duration,

    /// Size of the bounded worker pool used by BatchWorker.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            catalog_timeout: default_catalog_timeout(),
            category_timeout: default_category_timeout(),
            fetch_timeout: default_fetch_timeout(),
            pool_size: default_pool_size(),
        }
    }
}

fn default_catalog_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_category_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_fetch_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_pool_size() -> usize {
    100
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_options_default_pool_matches_source() {
        assert_eq!(RuntimeOptions::default().pool_size, 100);
    }
}
