//! Lazy per-marker thumbnails.
//!
//! A single video element backs every capture, so at most one capture run is
//! active per scheduler and captures inside a run are strictly sequential.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::constants::CAPTURE_TIME_FLOOR_SECONDS;
use crate::core::playback::{PlaybackController, SeekOptions};
use crate::state::Marker;

/// Encoded still images (data URIs) keyed by marker id.
pub type ThumbnailCache = HashMap<Uuid, String>;

/// Grabs the frame currently shown by the shared video element.
#[async_trait]
pub trait FrameCapture: Send + Sync {
    /// Encoded still for the element positioned at `time`, or `None` when
    /// no frame could be produced. Must not panic on transient failures.
    async fn capture_frame_at(&self, time: f64) -> Option<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every marker already has a thumbnail.
    UpToDate,
    /// No capture capability is bound.
    Unavailable,
    /// Another run is in progress.
    Busy,
    Completed { captured: usize, failed: usize },
    /// Stopped early; images captured before the stop were kept.
    Cancelled { captured: usize, failed: usize },
}

impl RunOutcome {
    pub fn captured(&self) -> usize {
        match self {
            RunOutcome::Completed { captured, .. } | RunOutcome::Cancelled { captured, .. } => {
                *captured
            }
            _ => 0,
        }
    }
}

/// Resets the capturing flag however the run ends.
struct CaptureGuard<'a>(&'a AtomicBool);

impl<'a> CaptureGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for CaptureGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct ThumbnailScheduler {
    playback: Arc<PlaybackController>,
    capture: Option<Arc<dyn FrameCapture>>,
    cache: RwLock<ThumbnailCache>,
    capturing: AtomicBool,
    capture_floor: f64,
}

impl ThumbnailScheduler {
    pub fn new(playback: Arc<PlaybackController>, capture: Option<Arc<dyn FrameCapture>>) -> Self {
        Self {
            playback,
            capture,
            cache: RwLock::new(ThumbnailCache::new()),
            capturing: AtomicBool::new(false),
            capture_floor: CAPTURE_TIME_FLOOR_SECONDS,
        }
    }

    pub fn with_capture_floor(mut self, seconds: f64) -> Self {
        self.capture_floor = seconds.max(0.0);
        self
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::Acquire)
    }

    pub fn get(&self, marker_id: Uuid) -> Option<String> {
        self.cache
            .read()
            .ok()
            .and_then(|cache| cache.get(&marker_id).cloned())
    }

    pub fn cache(&self) -> ThumbnailCache {
        self.cache
            .read()
            .map(|cache| cache.clone())
            .unwrap_or_default()
    }

    /// Markers without a cached thumbnail, in the given order.
    pub fn missing(&self, markers: &[Marker]) -> Vec<Marker> {
        let Ok(cache) = self.cache.read() else {
            return Vec::new();
        };
        markers
            .iter()
            .filter(|marker| !cache.contains_key(&marker.id))
            .cloned()
            .collect()
    }

    /// Capture thumbnails for every marker that lacks one.
    ///
    /// `cancel` is checked before each seek, after each seek, and after each
    /// capture. Images captured before cancellation are written to the cache
    /// together with the rest of the run, in one update.
    pub async fn sync(&self, markers: &[Marker], cancel: &CancellationToken) -> RunOutcome {
        let missing = self.missing(markers);
        if missing.is_empty() {
            return RunOutcome::UpToDate;
        }
        let Some(capture) = self.capture.clone() else {
            return RunOutcome::Unavailable;
        };
        let Some(_guard) = CaptureGuard::acquire(&self.capturing) else {
            debug!(missing = missing.len(), "thumbnail run already in progress");
            return RunOutcome::Busy;
        };

        debug!(missing = missing.len(), "thumbnail run started");
        let mut staged = Vec::with_capacity(missing.len());
        let mut failed = 0;
        let mut cancelled = false;
        for marker in &missing {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            let time = marker.time.max(self.capture_floor);
            self.playback.seek_to(time, SeekOptions::paused()).await;
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            match capture.capture_frame_at(time).await {
                Some(image) => staged.push((marker.id, image)),
                None => {
                    failed += 1;
                    debug!(marker_id = %marker.id, time, "no frame captured; will retry on a later run");
                }
            }
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }
        }

        let captured = staged.len();
        if !staged.is_empty() {
            if let Ok(mut cache) = self.cache.write() {
                cache.extend(staged);
            }
        }

        if cancelled {
            info!(captured, failed, "thumbnail run cancelled");
            RunOutcome::Cancelled { captured, failed }
        } else {
            debug!(captured, failed, "thumbnail run finished");
            RunOutcome::Completed { captured, failed }
        }
    }

    /// Drop thumbnails for markers that no longer exist.
    ///
    /// Does nothing while a run is in flight, so a capture can never race
    /// the removal of its own entry. Returns the number of entries removed.
    pub fn prune(&self, live_ids: &[Uuid]) -> usize {
        let Some(_guard) = CaptureGuard::acquire(&self.capturing) else {
            debug!("thumbnail run in progress; prune skipped");
            return 0;
        };
        let live: HashSet<&Uuid> = live_ids.iter().collect();
        let Ok(mut cache) = self.cache.write() else {
            return 0;
        };
        let before = cache.len();
        cache.retain(|id, _| live.contains(id));
        before - cache.len()
    }
}
