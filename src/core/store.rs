//! Marker persistence.
//!
//! The authoritative marker list lives behind [`MarkerStore`]. Every call is
//! idempotent for a retried identical request: creating an existing id
//! overwrites it, deleting or repositioning an unknown id does nothing.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::error::Result;
use crate::state::{sort_markers, Marker, MarkerPosition};

#[async_trait]
pub trait MarkerStore: Send + Sync {
    /// Markers for a video, ordered by time then creation.
    async fn list(&self, video_id: Uuid) -> Result<Vec<Marker>>;

    async fn create(&self, video_id: Uuid, marker: &Marker) -> Result<()>;

    async fn delete(&self, video_id: Uuid, ids: &[Uuid]) -> Result<()>;

    /// Set time and creation timestamp for a batch of markers, so the stored
    /// tie-break follows a reorder.
    async fn reposition(&self, video_id: Uuid, positions: &[MarkerPosition]) -> Result<()>;

    async fn update_label(&self, video_id: Uuid, id: Uuid, label: Option<&str>) -> Result<()>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    videos: BTreeMap<Uuid, Vec<Marker>>,
}

/// Marker store backed by a single JSON file, keyed by video id.
#[derive(Debug)]
pub struct JsonMarkerStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonMarkerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Videos that have at least one stored marker.
    pub async fn video_ids(&self) -> Result<Vec<Uuid>> {
        let _guard = self.lock.lock().await;
        let file = self.read().await?;
        Ok(file
            .videos
            .into_iter()
            .filter(|(_, markers)| !markers.is_empty())
            .map(|(id, _)| id)
            .collect())
    }

    async fn read(&self) -> Result<StoreFile> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(json) => Ok(serde_json::from_str(&json)?),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(StoreFile::default()),
            Err(err) => Err(err.into()),
        }
    }

    async fn write(&self, file: &StoreFile) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(file)?;
        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, json).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }

    async fn mutate(&self, video_id: Uuid, f: impl FnOnce(&mut Vec<Marker>) + Send) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut file = self.read().await?;
        let markers = file.videos.entry(video_id).or_default();
        f(markers);
        sort_markers(markers);
        self.write(&file).await
    }
}

#[async_trait]
impl MarkerStore for JsonMarkerStore {
    async fn list(&self, video_id: Uuid) -> Result<Vec<Marker>> {
        let _guard = self.lock.lock().await;
        let mut file = self.read().await?;
        let mut markers = file.videos.remove(&video_id).unwrap_or_default();
        sort_markers(&mut markers);
        Ok(markers)
    }

    async fn create(&self, video_id: Uuid, marker: &Marker) -> Result<()> {
        debug!(%video_id, marker_id = %marker.id, time = marker.time, "storing marker");
        let marker = marker.clone();
        self.mutate(video_id, move |markers| {
            markers.retain(|existing| existing.id != marker.id);
            markers.push(marker);
        })
        .await
    }

    async fn delete(&self, video_id: Uuid, ids: &[Uuid]) -> Result<()> {
        let ids = ids.to_vec();
        self.mutate(video_id, move |markers| {
            markers.retain(|marker| !ids.contains(&marker.id));
        })
        .await
    }

    async fn reposition(&self, video_id: Uuid, positions: &[MarkerPosition]) -> Result<()> {
        let positions = positions.to_vec();
        self.mutate(video_id, move |markers| {
            for position in positions {
                if let Some(marker) = markers.iter_mut().find(|marker| marker.id == position.id) {
                    marker.time = position.time;
                    marker.created_at = position.created_at;
                }
            }
        })
        .await
    }

    async fn update_label(&self, video_id: Uuid, id: Uuid, label: Option<&str>) -> Result<()> {
        let label = label.map(str::to_string);
        self.mutate(video_id, move |markers| {
            if let Some(marker) = markers.iter_mut().find(|marker| marker.id == id) {
                marker.label = label;
            }
        })
        .await
    }
}
