//! Error types for imageset-dl
//!
//! This module provides the error taxonomy for the library: catalog I/O failures,
//! per-URL naming/fetch/validation failures, and state machine / configuration errors.

use thiserror::Error;

/// Result type alias for imageset-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for imageset-dl
#[derive(Debug, Error)]
pub enum Error {
    /// The category index could not be fetched and no cached copy exists.
    ///
    /// Fatal at iterator start; terminates the run.
    #[error("catalog unavailable: {0}")]
    CatalogUnavailable(String),

    /// A single category's URL list could not be fetched and no cached copy exists.
    ///
    /// Non-fatal: the iterator skips the category and continues.
    #[error("category urls unavailable for {category_id}: {source}")]
    CategoryUrlsUnavailable {
        /// The category whose URL list could not be fetched
        category_id: String,
        /// Underlying cause
        source: String,
    },

    /// A URL carries trailing whitespace or a newline and was rejected by UrlNamer.
    #[error("malformed url (trailing whitespace): {0}")]
    MalformedUrl(String),

    /// Attempted to iterate or run a StatefulDownloader before configuration.
    #[error("downloader is not configured")]
    NotConfigured,

    /// Configuration failed validation; human-readable messages in listed order.
    #[error("configuration invalid: {}", .0.join("; "))]
    ConfigurationInvalid(Vec<String>),

    /// `app_state.json` could not be parsed as JSON at all.
    ///
    /// Never returned from a public function — swallowed at the load call
    /// site, which restores defaults. Kept on the enum so the swallow can
    /// still carry a `tracing::warn!` message.
    #[error("corrupt state file: {0}")]
    CorruptState(String),

    /// `app_state.json` parsed but was missing a required field.
    ///
    /// Same swallowed-to-defaults treatment as [`Error::CorruptState`].
    #[error("state file missing fields: {0}")]
    MissingFields(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True for errors that the StatefulDownloader recovers from locally (skip the
    /// category, fail the URL) rather than propagating to the state machine.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::CategoryUrlsUnavailable { .. } | Error::MalformedUrl(_)
        )
    }
}
