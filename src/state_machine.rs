//! `StateMachine` — translates configure/start/pause/resume/reset actions
//! into `DownloadManager` control and `AppState` mutations, rejecting
//! illegal transitions.
//!
//! Grounded on the teacher crate's status-match style in
//! `downloader/control.rs`, adapted to this crate's six-state table.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::broadcast;

use crate::app_state::{AppState, DownloadConfiguration};
use crate::batch_worker::BatchWorker;
use crate::catalog::CatalogStore;
use crate::download_manager::{DownloadManager, Event};
use crate::error::{Error, Result};
use crate::fetcher::Fetcher;
use crate::stateful_downloader::{Clock, StatefulDownloader};
use crate::validator::Validator;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum State {
    Initial,
    Ready,
    Running,
    Pausing,
    Paused,
    Finished,
}

pub struct StateMachine<F, V> {
    state: State,
    app_state_path: PathBuf,
    catalog_store: Arc<CatalogStore>,
    worker: Arc<BatchWorker<F, V>>,
    clock: Arc<dyn Clock>,
    manager: Option<DownloadManager>,
    events: Option<broadcast::Receiver<Event>>,
}

impl<F, V> StateMachine<F, V>
where
    F: Fetcher + 'static,
    V: Validator + 'static,
{
    pub async fn new(
        app_state_path: PathBuf,
        catalog_store: Arc<CatalogStore>,
        worker: Arc<BatchWorker<F, V>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let state = match AppState::load(app_state_path.clone()).await {
            Ok(app_state) if app_state.progress_info.finished => State::Finished,
            Ok(app_state) if app_state.configured => State::Ready,
            Ok(_) => State::Initial,
            Err(e) => {
                let corrupt = Error::CorruptState(e.to_string());
                tracing::warn!(error = %corrupt, "app_state.json missing or unreadable; starting from Initial");
                State::Initial
            }
        };

        Self {
            state,
            app_state_path,
            catalog_store,
            worker,
            clock,
            manager: None,
            events: None,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Drain any pending `DownloadManager` events, advancing `Pausing ->
    /// Paused` and `Running -> Finished` as they arrive. Callers should poll
    /// periodically while `Running` or `Pausing`.
    pub fn poll(&mut self) {
        let Some(rx) = self.events.as_mut() else {
            return;
        };
        while let Ok(event) = rx.try_recv() {
            match event {
                Event::Paused => self.state = State::Paused,
                Event::Resumed => self.state = State::Running,
                Event::AllDone => self.state = State::Finished,
                Event::BatchSucceeded { .. } | Event::BatchFailed { .. } => {}
            }
        }
    }

    /// Validate and persist `conf`. Valid input moves `Initial`/`Ready` to
    /// `Ready`; invalid input reverts to `Initial` with the validation
    /// errors appended, in the fixed order
    /// destination/path-exists/numberOfImages/imagesPerCategory. Ignored
    /// from every other state.
    pub async fn configure(&mut self, conf: DownloadConfiguration) -> Result<()> {
        if !matches!(self.state, State::Initial | State::Ready) {
            return Ok(());
        }

        self.catalog_store.runtime().clear_failures_log().await?;

        let errors = conf.errors();
        let mut app_state = match AppState::load(self.app_state_path.clone()).await {
            Ok(app_state) => app_state,
            Err(e) => {
                let corrupt = Error::CorruptState(e.to_string());
                tracing::warn!(error = %corrupt, "app_state.json missing or unreadable; starting from defaults");
                AppState::new(self.app_state_path.clone())
            }
        };

        if errors.is_empty() {
            app_state.set_configuration(conf);
            self.state = State::Ready;
        } else {
            app_state.reset();
            for error in errors {
                app_state.add_error(error);
            }
            self.state = State::Initial;
        }
        app_state.save().await
    }

    /// `Ready -> Running`, spawning the background run. Ignored otherwise.
    pub async fn start(&mut self) -> Result<()> {
        if self.state != State::Ready {
            return Ok(());
        }

        let app_state = AppState::load(self.app_state_path.clone()).await?;
        let downloader = StatefulDownloader::new(
            app_state,
            Arc::clone(&self.catalog_store),
            Arc::clone(&self.worker),
            Arc::clone(&self.clock),
        )
        .await?;

        let failures_log_path = self.catalog_store.runtime().failures_log_path();
        let manager = DownloadManager::spawn(downloader, failures_log_path);
        self.events = Some(manager.subscribe());
        self.manager = Some(manager);
        self.state = State::Running;
        Ok(())
    }

    /// `Running -> Pausing` (request sent; `Pausing -> Paused` happens via
    /// [`StateMachine::poll`] once the manager acknowledges). A no-op from
    /// `Ready`, ignored elsewhere.
    pub async fn pause(&mut self) {
        match self.state {
            State::Running => {
                if let Some(manager) = &self.manager {
                    manager.pause().await;
                }
                self.state = State::Pausing;
            }
            State::Ready => {}
            _ => {}
        }
    }

    /// `Paused -> Running`. Ignored otherwise.
    pub async fn resume(&mut self) {
        if self.state == State::Paused {
            if let Some(manager) = &self.manager {
                manager.resume().await;
            }
            self.state = State::Running;
        }
    }

    /// `Paused -> Initial` or `Finished -> Initial`, discarding the manager
    /// and resetting `AppState` to defaults. Rejected while actively
    /// downloading (`Running`/`Pausing`).
    pub async fn reset(&mut self) -> Result<()> {
        if !matches!(self.state, State::Paused | State::Finished) {
            return Ok(());
        }

        self.catalog_store.runtime().clear_failures_log().await?;

        let app_state = AppState::new(self.app_state_path.clone());
        app_state.save().await?;
        self.manager = None;
        self.events = None;
        self.state = State::Initial;
        Ok(())
    }
}
