//! Editor settings and their JSON persistence.

use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use crate::constants::{
    CAPTURE_TIME_FLOOR_SECONDS, DEFAULT_LARGE_SEEK_SECONDS, DEFAULT_METADATA_WAIT_MS,
    DEFAULT_SMALL_SEEK_SECONDS, SETTINGS_FILE_NAME, THUMBNAIL_HEIGHT,
};
use crate::error::{EditorError, Result};

/// Tunables for a marker editing session, stored in `editor.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorSettings {
    /// Seek step for the bare arrow keys
    #[serde(default = "default_small_seek_seconds")]
    pub small_seek_seconds: f64,
    /// Seek step for shift + arrow keys
    #[serde(default = "default_large_seek_seconds")]
    pub large_seek_seconds: f64,
    /// How long a seek waits for media metadata
    #[serde(default = "default_metadata_wait_ms")]
    pub metadata_wait_ms: u64,
    /// Smallest time a thumbnail capture will seek to
    #[serde(default = "default_capture_floor_seconds")]
    pub capture_floor_seconds: f64,
    /// Thumbnail height in pixels (width follows the frame's aspect ratio)
    #[serde(default = "default_thumbnail_height")]
    pub thumbnail_height: u32,
}

fn default_small_seek_seconds() -> f64 {
    DEFAULT_SMALL_SEEK_SECONDS
}

fn default_large_seek_seconds() -> f64 {
    DEFAULT_LARGE_SEEK_SECONDS
}

fn default_metadata_wait_ms() -> u64 {
    DEFAULT_METADATA_WAIT_MS
}

fn default_capture_floor_seconds() -> f64 {
    CAPTURE_TIME_FLOOR_SECONDS
}

fn default_thumbnail_height() -> u32 {
    THUMBNAIL_HEIGHT
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            small_seek_seconds: default_small_seek_seconds(),
            large_seek_seconds: default_large_seek_seconds(),
            metadata_wait_ms: default_metadata_wait_ms(),
            capture_floor_seconds: default_capture_floor_seconds(),
            thumbnail_height: default_thumbnail_height(),
        }
    }
}

impl EditorSettings {
    pub fn metadata_wait(&self) -> Duration {
        Duration::from_millis(self.metadata_wait_ms)
    }

    /// Replace out-of-range values with their defaults.
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if !(self.small_seek_seconds.is_finite() && self.small_seek_seconds > 0.0) {
            self.small_seek_seconds = defaults.small_seek_seconds;
        }
        if !(self.large_seek_seconds.is_finite() && self.large_seek_seconds > 0.0) {
            self.large_seek_seconds = defaults.large_seek_seconds;
        }
        if !(self.capture_floor_seconds.is_finite() && self.capture_floor_seconds >= 0.0) {
            self.capture_floor_seconds = defaults.capture_floor_seconds;
        }
        if self.thumbnail_height == 0 {
            self.thumbnail_height = defaults.thumbnail_height;
        }
        self
    }

    /// Settings stored in `folder`, or defaults when there are none.
    ///
    /// An interrupted save leaves `editor.json.tmp` behind; it is read when
    /// the main file is missing or does not parse.
    pub async fn load(folder: &Path) -> Result<Self> {
        let tmp_path = temp_settings_path(folder);
        let settings = match read_settings(&settings_path(folder)).await {
            Ok(Some(settings)) => settings,
            Ok(None) => read_settings(&tmp_path).await.ok().flatten().unwrap_or_default(),
            Err(err @ EditorError::Json(_)) => match read_settings(&tmp_path).await {
                Ok(Some(settings)) => {
                    warn!(folder = %folder.display(), %err, "editor settings unreadable; using unsaved copy");
                    settings
                }
                _ => return Err(err),
            },
            Err(err) => return Err(err),
        };
        Ok(settings.sanitized())
    }

    /// Write `editor.json` through a temp file so readers never see half a file.
    pub async fn save(&self, folder: &Path) -> Result<()> {
        tokio::fs::create_dir_all(folder).await?;
        let tmp_path = temp_settings_path(folder);
        tokio::fs::write(&tmp_path, serde_json::to_vec_pretty(self)?).await?;
        tokio::fs::rename(&tmp_path, settings_path(folder)).await?;
        debug!(folder = %folder.display(), "editor settings saved");
        Ok(())
    }
}

async fn read_settings(path: &Path) -> Result<Option<EditorSettings>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

fn settings_path(folder: &Path) -> PathBuf {
    folder.join(SETTINGS_FILE_NAME)
}

fn temp_settings_path(folder: &Path) -> PathBuf {
    folder.join(format!("{}.tmp", SETTINGS_FILE_NAME))
}
