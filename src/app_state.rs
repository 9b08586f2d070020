//! `AppState` — the persisted aggregate: configuration, progress, cursor,
//! per-category counts, file index, error log, finished flag.
//!
//! Grounded on `AppState`/`DownloadConfiguration`/`ProgressInfo`/`InternalState`
//! in the source's `util/app_state.py`. The on-disk key structure (snake_case,
//! nested `iterator_position_json` string) matches that module's `as_dict`
//! methods exactly so a file written by one implementation is readable by the
//! other.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::cursor::Cursor;
use crate::error::Result;
use crate::running_average::RunningAverage;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfiguration {
    pub number_of_images: i64,
    pub images_per_category: i64,
    pub download_destination: String,
    pub batch_size: usize,
}

impl DownloadConfiguration {
    /// Validation errors in the exact order the source reports them:
    /// destination, then path-exists, then the two quota fields.
    pub fn errors(&self) -> Vec<String> {
        let mut errors = Vec::new();

        let trimmed = self.download_destination.trim();
        if trimmed.is_empty() {
            errors.push("Destination folder for ImageNet was not specified".to_string());
        } else if !Path::new(trimmed).exists() {
            errors.push(format!("Path \"{trimmed}\" does not exist"));
        }

        if self.number_of_images <= 0 {
            errors.push("Number of images must be greater than 0".to_string());
        }
        if self.images_per_category <= 0 {
            errors.push("Images per category must be greater than 0".to_string());
        }

        errors
    }

    pub fn is_valid(&self) -> bool {
        self.errors().is_empty()
    }
}

impl Default for DownloadConfiguration {
    fn default() -> Self {
        Self {
            number_of_images: 100,
            images_per_category: 90,
            download_destination: String::new(),
            batch_size: 100,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BatchResult {
    pub failed_urls: Vec<String>,
    pub succeeded_urls: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProgressInfo {
    pub total_downloaded: i64,
    pub total_failed: i64,
    pub finished: bool,
    pub failed_urls: Vec<String>,
    pub succeeded_urls: Vec<String>,
}

impl Default for ProgressInfo {
    fn default() -> Self {
        Self {
            total_downloaded: 0,
            total_failed: 0,
            finished: false,
            failed_urls: Vec::new(),
            succeeded_urls: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InternalState {
    pub iterator_position_json: String,
    pub category_counts: HashMap<String, i64>,
    pub file_index: i64,
}

impl Default for InternalState {
    fn default() -> Self {
        Self {
            iterator_position_json: Cursor::NULL.to_json(),
            category_counts: HashMap::new(),
            file_index: 1,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct PersistedState {
    download_configuration: DownloadConfiguration,
    progress_info: ProgressInfo,
    internal_state: InternalState,
    configured: bool,
    errors: Vec<String>,
}

/// The full in-memory aggregate, mirroring the on-disk document plus the
/// running-average throughput estimator (never persisted — recomputed from
/// scratch on restart, same as the source).
pub struct AppState {
    pub download_configuration: DownloadConfiguration,
    pub progress_info: ProgressInfo,
    pub internal_state: InternalState,
    pub configured: bool,
    errors: Vec<String>,
    running_average: RunningAverage,
    path: PathBuf,
}

impl AppState {
    pub fn new(path: PathBuf) -> Self {
        Self {
            download_configuration: DownloadConfiguration::default(),
            progress_info: ProgressInfo::default(),
            internal_state: InternalState::default(),
            configured: false,
            errors: Vec::new(),
            running_average: RunningAverage::new(),
            path,
        }
    }

    pub fn reset(&mut self) {
        self.download_configuration = DownloadConfiguration::default();
        self.progress_info = ProgressInfo::default();
        self.internal_state = InternalState::default();
        self.configured = false;
        self.errors.clear();
        self.running_average = RunningAverage::new();
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn set_configuration(&mut self, configuration: DownloadConfiguration) {
        self.reset();
        self.download_configuration = configuration;
        self.configured = true;
    }

    /// Fold one batch's outcome into progress counters and feed the
    /// throughput estimator. `now` is seconds since an arbitrary monotonic
    /// epoch, supplied by the caller (kept out of this type for testability).
    pub fn update_progress(&mut self, now: f64, result: BatchResult) {
        self.progress_info.total_failed += result.failed_urls.len() as i64;
        self.progress_info.total_downloaded += result.succeeded_urls.len() as i64;
        self.running_average
            .add_sample(now, result.succeeded_urls.len() as u64);
        self.progress_info.failed_urls = result.failed_urls;
        self.progress_info.succeeded_urls = result.succeeded_urls;
    }

    pub fn mark_finished(&mut self) {
        self.progress_info.finished = true;
    }

    pub fn inprogress(&self) -> bool {
        self.progress_info.total_failed > 0 || self.progress_info.total_downloaded > 0
    }

    pub fn calculate_progress(&self) -> f64 {
        let total = self.download_configuration.number_of_images;
        if total == 0 {
            0.0
        } else {
            self.progress_info.total_downloaded as f64 / total as f64
        }
    }

    /// `"Eternity"` with no throughput data yet, otherwise `"{n} seconds"` /
    /// `"minutes"` / `"hours"` / `"days"` depending on magnitude.
    pub fn time_remaining(&self) -> String {
        let rate = self.running_average.units_per_second();
        if rate == 0.0 {
            return "Eternity".to_string();
        }

        let images_left =
            self.download_configuration.number_of_images - self.progress_info.total_downloaded;
        if images_left <= 0 {
            return format_time(0);
        }

        let seconds = (images_left as f64 / rate).round() as i64;
        format_time(seconds)
    }

    /// External view exposed to UIs/status endpoints: camelCase keys, none of
    /// which are the on-disk persistence shape.
    pub fn to_json(&self) -> String {
        serde_json::json!({
            "downloadPath": self.download_configuration.download_destination,
            "numberOfImages": self.download_configuration.number_of_images,
            "imagesPerCategory": self.download_configuration.images_per_category,
            "timeLeft": self.time_remaining(),
            "imagesLoaded": self.progress_info.total_downloaded,
            "failures": self.progress_info.total_failed,
            "failedUrls": self.progress_info.failed_urls,
            "succeededUrls": self.progress_info.succeeded_urls,
            "errors": self.errors,
            "progress": self.calculate_progress(),
        })
        .to_string()
    }

    /// Atomic write-then-rename, matching the data-folder-creation-on-demand
    /// contract of the source's `save()`.
    pub async fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let persisted = PersistedState {
            download_configuration: self.download_configuration.clone(),
            progress_info: self.progress_info.clone(),
            internal_state: self.internal_state.clone(),
            configured: self.configured,
            errors: self.errors.clone(),
        };
        let body = serde_json::to_string(&persisted)?;

        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, body).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }

    pub async fn load(path: PathBuf) -> Result<Self> {
        let body = tokio::fs::read_to_string(&path).await?;
        let persisted: PersistedState = serde_json::from_str(&body)?;
        Ok(Self {
            download_configuration: persisted.download_configuration,
            progress_info: persisted.progress_info,
            internal_state: persisted.internal_state,
            configured: persisted.configured,
            errors: persisted.errors,
            running_average: RunningAverage::new(),
            path,
        })
    }
}

fn format_time(seconds: i64) -> String {
    if seconds < 60 {
        format!("{seconds} seconds")
    } else if seconds < 3600 {
        format!("{} minutes", (seconds as f64 / 60.0).round() as i64)
    } else if seconds < 3600 * 24 {
        format!("{} hours", (seconds as f64 / 3600.0).round() as i64)
    } else {
        format!("{} days", (seconds as f64 / (3600.0 * 24.0)).round() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_in_order() {
        let conf = DownloadConfiguration {
            number_of_images: 0,
            images_per_category: 0,
            download_destination: String::new(),
            batch_size: 1,
        };
        assert_eq!(
            conf.errors(),
            vec![
                "Destination folder for ImageNet was not specified",
                "Number of images must be greater than 0",
                "Images per category must be greater than 0",
            ]
        );
    }

    #[test]
    fn valid_configuration_scenario_from_fixtures() {
        let dir = tempfile::tempdir().unwrap();
        let conf = DownloadConfiguration {
            number_of_images: 10,
            images_per_category: 5,
            download_destination: dir.path().to_string_lossy().to_string(),
            batch_size: 100,
        };
        assert!(conf.is_valid());
    }

    #[test]
    fn progress_fraction() {
        let mut state = AppState::new(PathBuf::from("/tmp/unused"));
        state.download_configuration.number_of_images = 100;
        state.progress_info.total_downloaded = 25;
        assert_eq!(state.calculate_progress(), 0.25);
    }

    #[test]
    fn time_remaining_is_eternity_without_samples() {
        let state = AppState::new(PathBuf::from("/tmp/unused"));
        assert_eq!(state.time_remaining(), "Eternity");
    }

    #[test]
    fn time_remaining_formats_by_magnitude() {
        assert_eq!(format_time(30), "30 seconds");
        assert_eq!(format_time(90), "2 minutes");
        assert_eq!(format_time(7200), "2 hours");
        assert_eq!(format_time(3600 * 24 * 3), "3 days");
    }

    #[tokio::test]
    async fn save_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app_state.json");

        let mut state = AppState::new(path.clone());
        state.set_configuration(DownloadConfiguration {
            number_of_images: 50,
            images_per_category: 10,
            download_destination: dir.path().to_string_lossy().to_string(),
            batch_size: 20,
        });
        state.update_progress(
            1.0,
            BatchResult {
                failed_urls: vec!["f1".into()],
                succeeded_urls: vec!["s1".into(), "s2".into()],
            },
        );
        state.internal_state.iterator_position_json = Cursor::new(1, 2).to_json();
        state.save().await.unwrap();

        let loaded = AppState::load(path).await.unwrap();
        assert_eq!(loaded.progress_info.total_downloaded, 2);
        assert_eq!(loaded.progress_info.total_failed, 1);
        assert_eq!(
            Cursor::from_json(&loaded.internal_state.iterator_position_json).unwrap(),
            Cursor::new(1, 2)
        );
        assert!(loaded.configured);
    }
}
