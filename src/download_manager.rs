//! `DownloadManager` — runs a [`StatefulDownloader`] on a background task,
//! broadcasting events and honoring cooperative pause/resume.
//!
//! Grounded on `util/download_manager.py`'s `QThread` worker (signals →
//! broadcast channel, `QMutex`+`QWaitCondition` → `Mutex`+`Notify`) and on the
//! teacher crate's `UsenetDownloader` event/shutdown plumbing in
//! `downloader/mod.rs`/`downloader/lifecycle.rs`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::sync::{broadcast, Mutex, Notify};
use tokio::task::JoinHandle;

use crate::app_state::BatchResult;
use crate::batch_worker::BatchWorker;
use crate::fetcher::Fetcher;
use crate::stateful_downloader::StatefulDownloader;
use crate::validator::Validator;

const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Clone, Debug, Serialize)]
pub enum Event {
    BatchSucceeded { succeeded: Vec<String> },
    BatchFailed { failed: Vec<String> },
    Paused,
    Resumed,
    AllDone,
}

/// Cooperative pause/resume signal shared between the public handle and the
/// background loop. A pause is honoured only between batches — never by
/// aborting an in-flight fetch.
struct PauseGate {
    paused: Mutex<bool>,
    notify: Notify,
}

impl PauseGate {
    fn new() -> Self {
        Self {
            paused: Mutex::new(false),
            notify: Notify::new(),
        }
    }

    async fn wait_while_paused(&self) {
        loop {
            if !*self.paused.lock().await {
                return;
            }
            self.notify.notified().await;
        }
    }

    async fn set_paused(&self, value: bool) {
        *self.paused.lock().await = value;
        self.notify.notify_waiters();
    }
}

pub struct DownloadManager {
    event_tx: broadcast::Sender<Event>,
    gate: Arc<PauseGate>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl DownloadManager {
    /// Spawn the run loop immediately. The caller keeps driving subsequent
    /// runs by constructing a new `StatefulDownloader` from the persisted
    /// `AppState` and calling [`DownloadManager::spawn`] again.
    ///
    /// `failures_log_path` receives one failed URL per line, appended after
    /// every batch that has failures.
    pub fn spawn<F, V>(mut downloader: StatefulDownloader<F, V>, failures_log_path: PathBuf) -> Self
    where
        F: Fetcher + 'static,
        V: Validator + 'static,
    {
        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let gate = Arc::new(PauseGate::new());

        let loop_tx = event_tx.clone();
        let loop_gate = Arc::clone(&gate);
        let task = tokio::spawn(async move {
            loop {
                let was_paused = *loop_gate.paused.lock().await;
                if was_paused {
                    loop_tx.send(Event::Paused).ok();
                    loop_gate.wait_while_paused().await;
                    loop_tx.send(Event::Resumed).ok();
                }

                match downloader.next_batch().await {
                    Ok(Some(result)) => {
                        if !result.failed_urls.is_empty() {
                            append_failures(&failures_log_path, &result.failed_urls).await;
                        }
                        emit_batch_events(&loop_tx, &result);
                    }
                    Ok(None) => {
                        loop_tx.send(Event::AllDone).ok();
                        break;
                    }
                    Err(err) => {
                        tracing::error!(error = %err, "download run terminated with an error");
                        break;
                    }
                }
            }
        });

        Self {
            event_tx,
            gate,
            task: Mutex::new(Some(task)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    pub async fn pause(&self) {
        self.gate.set_paused(true).await;
    }

    pub async fn resume(&self) {
        self.gate.set_paused(false).await;
    }

    /// Wait for the background run to finish (normal completion or error).
    pub async fn join(&self) {
        let handle = self.task.lock().await.take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    /// Request a pause (honored at the next batch boundary, never mid-fetch)
    /// and stop waiting. The last flush is already persisted, so the run can
    /// be resumed later from a freshly loaded `AppState`; this does not abort
    /// the background task outright.
    pub async fn shutdown(&self) {
        self.gate.set_paused(true).await;
    }
}

/// Best-effort; a failures.log write failure is logged but never aborts the run.
async fn append_failures(path: &Path, urls: &[String]) {
    let file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await;
    let mut file = match file {
        Ok(file) => file,
        Err(e) => {
            tracing::warn!(error = %e, path = %path.display(), "could not open failures.log");
            return;
        }
    };
    for url in urls {
        if let Err(e) = file.write_all(format!("{url}\n").as_bytes()).await {
            tracing::warn!(error = %e, path = %path.display(), "could not append to failures.log");
            return;
        }
    }
}

fn emit_batch_events(tx: &broadcast::Sender<Event>, result: &BatchResult) {
    if !result.succeeded_urls.is_empty() {
        tx.send(Event::BatchSucceeded {
            succeeded: result.succeeded_urls.clone(),
        })
        .ok();
    }
    if !result.failed_urls.is_empty() {
        tx.send(Event::BatchFailed {
            failed: result.failed_urls.clone(),
        })
        .ok();
    }
}
