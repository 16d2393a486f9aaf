//! Fakes for the host capabilities, shared by the unit tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::core::{FrameCapture, MarkerStore, MediaElement, MetadataSignal};
use crate::error::{EditorError, Result};
use crate::state::{sort_markers, Marker, MarkerPosition};

/// In-memory media element that records every position write.
pub struct FakeElement {
    duration: Mutex<f64>,
    loaded: AtomicBool,
    playing: AtomicBool,
    time: Mutex<f64>,
    writes: Mutex<Vec<f64>>,
    signal: Mutex<MetadataSignal>,
}

impl FakeElement {
    pub fn unloaded() -> Arc<Self> {
        Arc::new(Self {
            duration: Mutex::new(f64::NAN),
            loaded: AtomicBool::new(false),
            playing: AtomicBool::new(false),
            time: Mutex::new(0.0),
            writes: Mutex::new(Vec::new()),
            signal: Mutex::new(MetadataSignal::new()),
        })
    }

    pub fn loaded(duration: f64) -> Arc<Self> {
        let element = Self::unloaded();
        element.load_metadata(duration);
        element
    }

    pub fn load_metadata(&self, duration: f64) {
        *self.duration.lock().unwrap() = duration;
        self.loaded.store(true, Ordering::SeqCst);
        self.signal.lock().unwrap().fire();
    }

    /// Simulate the element being torn down: waiters on the old signal are released.
    pub fn drop_signal(&self) {
        *self.signal.lock().unwrap() = MetadataSignal::new();
    }

    pub fn time(&self) -> f64 {
        *self.time.lock().unwrap()
    }

    pub fn writes(&self) -> Vec<f64> {
        self.writes.lock().unwrap().clone()
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }
}

impl MediaElement for FakeElement {
    fn duration(&self) -> f64 {
        *self.duration.lock().unwrap()
    }

    fn has_metadata(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    fn current_time(&self) -> f64 {
        self.time()
    }

    fn set_current_time(&self, time: f64) {
        *self.time.lock().unwrap() = time;
        self.writes.lock().unwrap().push(time);
    }

    fn play(&self) {
        self.playing.store(true, Ordering::SeqCst);
    }

    fn pause(&self) {
        self.playing.store(false, Ordering::SeqCst);
    }

    fn metadata_signal(&self) -> MetadataSignal {
        self.signal.lock().unwrap().clone()
    }
}

/// Capture fake that yields once per call and tracks overlap.
#[derive(Default)]
pub struct FakeCapture {
    times: Mutex<Vec<f64>>,
    fail_at: Mutex<Vec<f64>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    cancel_after: Option<(usize, CancellationToken)>,
}

impl FakeCapture {
    /// Cancel `token` as the `calls`-th capture completes.
    pub fn cancelling_after(calls: usize, token: CancellationToken) -> Self {
        Self {
            cancel_after: Some((calls, token)),
            ..Default::default()
        }
    }

    pub fn fail_at(&self, time: f64) {
        self.fail_at.lock().unwrap().push(time);
    }

    pub fn clear_failures(&self) {
        self.fail_at.lock().unwrap().clear();
    }

    pub fn times(&self) -> Vec<f64> {
        self.times.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.times.lock().unwrap().len()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FrameCapture for FakeCapture {
    async fn capture_frame_at(&self, time: f64) -> Option<String> {
        let in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(in_flight, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let calls = {
            let mut times = self.times.lock().unwrap();
            times.push(time);
            times.len()
        };
        if let Some((after, token)) = &self.cancel_after {
            if calls >= *after {
                token.cancel();
            }
        }
        if self.fail_at.lock().unwrap().contains(&time) {
            return None;
        }
        Some(format!("data:image/png;base64,frame-{time}"))
    }
}

/// In-memory marker store with a failure switch and a call log.
#[derive(Default)]
pub struct MemoryStore {
    videos: Mutex<HashMap<Uuid, Vec<Marker>>>,
    failing: AtomicBool,
    calls: Mutex<Vec<&'static str>>,
}

impl MemoryStore {
    pub fn with_markers(video_id: Uuid, markers: Vec<Marker>) -> Self {
        let store = Self::default();
        store.videos.lock().unwrap().insert(video_id, markers);
        store
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn markers(&self, video_id: Uuid) -> Vec<Marker> {
        let mut markers = self
            .videos
            .lock()
            .unwrap()
            .get(&video_id)
            .cloned()
            .unwrap_or_default();
        sort_markers(&mut markers);
        markers
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: &'static str) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        if self.failing.load(Ordering::SeqCst) {
            return Err(EditorError::Store(format!("{call} rejected")));
        }
        Ok(())
    }

    fn edit(&self, video_id: Uuid, f: impl FnOnce(&mut Vec<Marker>)) {
        let mut videos = self.videos.lock().unwrap();
        f(videos.entry(video_id).or_default());
    }
}

#[async_trait]
impl MarkerStore for MemoryStore {
    async fn list(&self, video_id: Uuid) -> Result<Vec<Marker>> {
        self.record("list")?;
        Ok(self.markers(video_id))
    }

    async fn create(&self, video_id: Uuid, marker: &Marker) -> Result<()> {
        self.record("create")?;
        let marker = marker.clone();
        self.edit(video_id, |markers| {
            markers.retain(|m| m.id != marker.id);
            markers.push(marker);
        });
        Ok(())
    }

    async fn delete(&self, video_id: Uuid, ids: &[Uuid]) -> Result<()> {
        self.record("delete")?;
        self.edit(video_id, |markers| markers.retain(|m| !ids.contains(&m.id)));
        Ok(())
    }

    async fn reposition(&self, video_id: Uuid, positions: &[MarkerPosition]) -> Result<()> {
        self.record("reposition")?;
        self.edit(video_id, |markers| {
            for position in positions {
                if let Some(marker) = markers.iter_mut().find(|m| m.id == position.id) {
                    marker.time = position.time;
                    marker.created_at = position.created_at;
                }
            }
        });
        Ok(())
    }

    async fn update_label(&self, video_id: Uuid, id: Uuid, label: Option<&str>) -> Result<()> {
        self.record("update_label")?;
        self.edit(video_id, |markers| {
            if let Some(marker) = markers.iter_mut().find(|m| m.id == id) {
                marker.label = label.map(str::to_string);
            }
        });
        Ok(())
    }
}
