//! # imageset-dl
//!
//! Resumable, concurrent bulk downloader for two-level image catalogs
//! (category → image URL list, e.g. WordNet synsets and their image URLs).
//!
//! ## Design Philosophy
//!
//! imageset-dl is designed to be:
//! - **Resumable** - every batch is persisted before the next begins; a crash
//!   loses at most one in-flight batch
//! - **Library-first** - no CLI or UI, purely a Rust crate for embedding
//! - **Event-driven** - consumers subscribe to `DownloadManager` events, no
//!   polling required for progress, though `StateMachine::poll` exists for
//!   callers that prefer to drive transitions explicitly
//! - **Pluggable I/O** - `Fetcher` and `Validator` are capability traits;
//!   swap in stubs for tests without touching the network
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use imageset_dl::{
//!     AppState, BatchWorker, CatalogStore, DownloadConfiguration, HttpFetcher,
//!     ImageValidator, Runtime, RuntimeOptions, StateMachine, SystemClock,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runtime = Runtime::new("./imageset-data", RuntimeOptions::default())?;
//!     let catalog = Arc::new(CatalogStore::new(runtime.clone(), "https://example.com/catalog"));
//!     let worker = Arc::new(BatchWorker::new(
//!         Arc::new(HttpFetcher::new(runtime.clone())),
//!         Arc::new(ImageValidator),
//!         runtime.options().pool_size,
//!     ));
//!
//!     let mut machine =
//!         StateMachine::new(runtime.app_state_path(), catalog, worker, Arc::new(SystemClock)).await;
//!
//!     machine
//!         .configure(DownloadConfiguration {
//!             number_of_images: 500,
//!             images_per_category: 50,
//!             download_destination: "./dataset".to_string(),
//!             batch_size: 100,
//!         })
//!         .await?;
//!     machine.start().await?;
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Persisted aggregate: configuration, progress, cursor, per-category counts.
pub mod app_state;
/// Buffers `(categoryId, url)` pairs and flushes them through `BatchWorker`.
pub mod batch_accumulator;
/// Bounded-parallelism fetch+validate pool.
pub mod batch_worker;
/// Downloads and caches the category index and per-category URL lists.
pub mod catalog;
/// Restartable pull-stream over the catalog's category/url cross product.
pub mod catalog_iterator;
/// Typed configuration and runtime options.
pub mod config;
/// Totally ordered position in the catalog stream.
pub mod cursor;
/// Background run loop, event broadcast, cooperative pause/resume.
pub mod download_manager;
/// Error taxonomy.
pub mod error;
/// Single-URL download capability (real + stub implementations).
pub mod fetcher;
/// Process-wide dependency bundle (data dir, HTTP client, timeouts).
pub mod runtime;
/// 5-sample sliding-window throughput estimator.
pub mod running_average;
/// Translates configure/start/pause/resume/reset into manager control.
pub mod state_machine;
/// Drives one configured run end to end.
pub mod stateful_downloader;
/// Converts a URL into a dataset-unique, monotonically numbered filename.
pub mod url_namer;
/// Decodable-image validation capability (real + stub implementations).
pub mod validator;

pub use app_state::{AppState, BatchResult, DownloadConfiguration};
pub use batch_accumulator::{BatchAccumulator, FlushResult};
pub use batch_worker::{BatchOutcome, BatchWorker};
pub use catalog::CatalogStore;
pub use catalog_iterator::CatalogIterator;
pub use config::RuntimeOptions;
pub use cursor::Cursor;
pub use download_manager::{DownloadManager, Event};
pub use error::{Error, Result};
pub use fetcher::{Fetcher, HttpFetcher, StubFetcher};
pub use runtime::Runtime;
pub use running_average::RunningAverage;
pub use state_machine::{State, StateMachine};
pub use stateful_downloader::{Clock, StatefulDownloader, SystemClock};
pub use url_namer::UrlNamer;
pub use validator::{ImageValidator, StubValidator, Validator};

/// Wait for a termination signal, then request a cooperative pause.
///
/// The last completed batch is always persisted before the next begins, so
/// this never discards progress — it simply stops issuing new batches.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal
///   registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
pub async fn run_with_shutdown(manager: &DownloadManager) {
    wait_for_signal().await;
    manager.shutdown().await;
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("received SIGTERM");
                }
                _ = sigint.recv() => {
                    tracing::info!("received SIGINT (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("received SIGINT (Ctrl+C)");
            } else {
                tracing::error!("could not register any signal handlers, falling back to ctrl_c");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("received SIGTERM");
            } else {
                tracing::error!("could not register any signal handlers, falling back to ctrl_c");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("received Ctrl+C"),
        Err(e) => tracing::error!(error = %e, "failed to listen for Ctrl+C"),
    }
}
