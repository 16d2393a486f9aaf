//! Playback transport for the video element under review.
//!
//! Every write to the element's position goes through
//! [`PlaybackController::seek_to`], including the capture seeks issued by the
//! thumbnail scheduler, so user seeks and capture seeks never interleave
//! mid-frame.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::state::EditorSettings;
use crate::utils::clamp_seek_time;

/// One-shot "metadata loaded" signal owned by a media element.
///
/// Firing is idempotent. Waiters on a signal whose element has been dropped
/// resolve as "not ready" instead of hanging.
#[derive(Debug, Clone)]
pub struct MetadataSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for MetadataSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn fire(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_fired(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

/// Host media element (an HTML video element, a native player surface, ...).
///
/// Methods take `&self`: the element is a handle into host-owned state.
pub trait MediaElement: Send + Sync {
    /// Duration in seconds; NaN or infinite while unknown.
    fn duration(&self) -> f64;
    /// Whether the element has loaded enough to know its duration.
    fn has_metadata(&self) -> bool;
    fn current_time(&self) -> f64;
    fn set_current_time(&self, time: f64);
    fn play(&self);
    fn pause(&self);
    fn metadata_signal(&self) -> MetadataSignal;
}

/// Snapshot of the transport state.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlaybackState {
    pub playing: bool,
    /// Known once the element reports metadata.
    pub duration: Option<f64>,
    pub current_time: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeekOptions {
    /// Stop playback once the seek is applied.
    pub pause: bool,
}

impl SeekOptions {
    pub fn paused() -> Self {
        Self { pause: true }
    }
}

/// Single source of truth for one video element's transport state.
pub struct PlaybackController {
    element: RwLock<Option<Arc<dyn MediaElement>>>,
    state: Mutex<PlaybackState>,
    seek_generation: AtomicU64,
    /// Bumped on every attach/detach; wakes seeks waiting on the old element.
    attached: watch::Sender<u64>,
    metadata_wait: Duration,
}

impl PlaybackController {
    pub fn new(metadata_wait: Duration) -> Self {
        Self {
            element: RwLock::new(None),
            state: Mutex::new(PlaybackState::default()),
            seek_generation: AtomicU64::new(0),
            attached: watch::channel(0).0,
            metadata_wait,
        }
    }

    pub fn from_settings(settings: &EditorSettings) -> Self {
        Self::new(settings.metadata_wait())
    }

    /// Bind the controller to a (new) element.
    pub fn attach(&self, element: Arc<dyn MediaElement>) {
        let duration = known_duration(element.as_ref());
        if let Ok(mut slot) = self.element.write() {
            *slot = Some(element);
        }
        self.update_state(|state| state.duration = duration);
        self.attached.send_modify(|epoch| *epoch += 1);
    }

    /// Unbind the current element; later operations become no-ops.
    pub fn detach(&self) -> Option<Arc<dyn MediaElement>> {
        let previous = self.element.write().ok().and_then(|mut slot| slot.take());
        self.update_state(|state| {
            state.playing = false;
            state.duration = None;
        });
        self.attached.send_modify(|epoch| *epoch += 1);
        previous
    }

    pub fn has_element(&self) -> bool {
        self.element().is_some()
    }

    /// Seek to `time` seconds.
    ///
    /// The requested time is recorded immediately. If the element has not
    /// loaded its metadata yet, this call waits (up to the configured bound)
    /// for the metadata signal and then applies the seek to whatever element
    /// is attached at that moment. Attaching another element during the wait
    /// moves the wait over to it for the time that is left. A newer seek
    /// issued during the wait wins; the older request is dropped. Never fails:
    /// a missing element, a timed out wait, or a removed element all resolve
    /// without effect.
    pub async fn seek_to(&self, time: f64, options: SeekOptions) {
        let generation = self.seek_generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.update_state(|state| state.current_time = clamp_seek_time(time, f64::NAN));
        let deadline = Instant::now() + self.metadata_wait;

        loop {
            if self.seek_generation.load(Ordering::SeqCst) != generation {
                debug!(time, "deferred seek superseded by a newer request");
                return;
            }
            // Subscribe before reading the slot so a swap in between is not missed.
            let mut swapped = self.attached.subscribe();
            let Some(element) = self.element() else {
                debug!(time, "seek requested without a media element");
                return;
            };
            if element.has_metadata() {
                self.apply_seek(element.as_ref(), time, options);
                return;
            }

            let mut ready = element.metadata_signal().subscribe();
            drop(element);
            let woke = tokio::time::timeout_at(deadline, async {
                tokio::select! {
                    loaded = ready.wait_for(|loaded| *loaded) => loaded.is_ok(),
                    _ = swapped.changed() => true,
                }
            })
            .await;
            match woke {
                Ok(true) => {}
                Ok(false) => {
                    debug!(time, "media element went away before metadata loaded");
                    return;
                }
                Err(_) => {
                    warn!(
                        time,
                        wait = ?self.metadata_wait,
                        "timed out waiting for media metadata; seek dropped"
                    );
                    return;
                }
            }
        }
    }

    /// Seek relative to the current position.
    pub async fn seek_by(&self, delta: f64, options: SeekOptions) {
        let target = self.current_time() + delta;
        self.seek_to(target, options).await;
    }

    pub fn set_playing(&self, playing: bool) {
        let Some(element) = self.element() else {
            return;
        };
        if playing {
            element.play();
        } else {
            element.pause();
        }
        self.update_state(|state| state.playing = playing);
    }

    pub fn toggle_playing(&self) {
        self.set_playing(!self.is_playing());
    }

    pub fn is_playing(&self) -> bool {
        self.state().playing
    }

    /// Duration in seconds, once the element has reported it.
    pub fn duration(&self) -> Option<f64> {
        if let Some(duration) = self.element().and_then(|element| known_duration(element.as_ref())) {
            return Some(duration);
        }
        self.state().duration
    }

    /// The controller's notion of the current position (optimistic after a seek).
    pub fn current_time(&self) -> f64 {
        self.state().current_time
    }

    pub fn state(&self) -> PlaybackState {
        self.state.lock().map(|state| *state).unwrap_or_default()
    }

    /// Host callback for the element's `loadedmetadata` event.
    pub fn on_metadata_loaded(&self) {
        let duration = self.element().and_then(|element| known_duration(element.as_ref()));
        self.update_state(|state| state.duration = duration);
    }

    /// Host callback for playback progress.
    pub fn on_time_update(&self, time: f64) {
        self.update_state(|state| state.current_time = clamp_seek_time(time, f64::NAN));
    }

    /// Host callback for the element reaching its end.
    pub fn on_ended(&self) {
        self.update_state(|state| state.playing = false);
    }

    fn element(&self) -> Option<Arc<dyn MediaElement>> {
        self.element.read().ok().and_then(|slot| slot.clone())
    }

    fn apply_seek(&self, element: &dyn MediaElement, time: f64, options: SeekOptions) {
        let duration = element.duration();
        let target = clamp_seek_time(time, duration);
        element.set_current_time(target);
        if options.pause {
            element.pause();
        }
        self.update_state(|state| {
            state.current_time = target;
            if duration.is_finite() && duration > 0.0 {
                state.duration = Some(duration);
            }
            if options.pause {
                state.playing = false;
            }
        });
    }

    fn update_state(&self, f: impl FnOnce(&mut PlaybackState)) {
        if let Ok(mut state) = self.state.lock() {
            f(&mut state);
        }
    }
}

fn known_duration(element: &dyn MediaElement) -> Option<f64> {
    let duration = element.duration();
    (element.has_metadata() && duration.is_finite() && duration >= 0.0).then_some(duration)
}
