//! One marker editing session for a single video.
//!
//! Wires playback, the marker timeline, thumbnails, and the command surface
//! around one shared video element.

use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::core::{
    FrameCapture, MarkerStore, MarkerTimeline, PlaybackController, ReconcileFailure, Reconciler,
    RunOutcome, ThumbnailScheduler,
};
use crate::error::Result;
use crate::hotkeys::CommandDispatcher;
use crate::state::{EditorSettings, Marker, SelectionState};

pub struct MarkerEditor {
    video_id: Uuid,
    playback: Arc<PlaybackController>,
    timeline: Arc<Mutex<MarkerTimeline>>,
    selection: Arc<Mutex<SelectionState>>,
    thumbnails: Arc<ThumbnailScheduler>,
    dispatcher: CommandDispatcher,
    reconciler: Reconciler,
}

impl MarkerEditor {
    /// Load a video's markers and start its reconciler.
    ///
    /// Must be called inside a tokio runtime. The returned receiver yields
    /// edits the store did not confirm; pass them to [`Reconciler::retry`]
    /// via [`MarkerEditor::retry`] to try again.
    pub async fn open(
        video_id: Uuid,
        store: Arc<dyn MarkerStore>,
        capture: Option<Arc<dyn FrameCapture>>,
        settings: EditorSettings,
    ) -> Result<(Self, mpsc::UnboundedReceiver<ReconcileFailure>)> {
        let timeline = MarkerTimeline::load(store.as_ref(), video_id).await?;
        let (reconciler, failures) = Reconciler::spawn(store, video_id);
        let timeline = Arc::new(Mutex::new(timeline.with_reconciler(reconciler.clone())));

        let playback = Arc::new(PlaybackController::from_settings(&settings));
        let selection = Arc::new(Mutex::new(SelectionState::default()));
        let thumbnails = Arc::new(
            ThumbnailScheduler::new(Arc::clone(&playback), capture)
                .with_capture_floor(settings.capture_floor_seconds),
        );
        let dispatcher = CommandDispatcher::new(
            Arc::clone(&playback),
            Arc::clone(&timeline),
            Arc::clone(&selection),
            &settings,
        );

        let editor = Self {
            video_id,
            playback,
            timeline,
            selection,
            thumbnails,
            dispatcher,
            reconciler,
        };
        info!(%video_id, markers = editor.markers().len(), "marker editor opened");
        Ok((editor, failures))
    }

    pub fn video_id(&self) -> Uuid {
        self.video_id
    }

    pub fn playback(&self) -> &Arc<PlaybackController> {
        &self.playback
    }

    pub fn timeline(&self) -> &Arc<Mutex<MarkerTimeline>> {
        &self.timeline
    }

    pub fn selection(&self) -> &Arc<Mutex<SelectionState>> {
        &self.selection
    }

    pub fn thumbnails(&self) -> &Arc<ThumbnailScheduler> {
        &self.thumbnails
    }

    pub fn dispatcher(&self) -> &CommandDispatcher {
        &self.dispatcher
    }

    /// Markers in display order.
    pub fn markers(&self) -> Vec<Marker> {
        self.timeline
            .lock()
            .map(|timeline| timeline.to_vec())
            .unwrap_or_default()
    }

    /// Bring thumbnails up to date with the current markers.
    ///
    /// Orphans are pruned first. A run that added images is followed by
    /// another pass, so markers added mid-run are picked up. Returns the
    /// number of thumbnails captured.
    pub async fn refresh_thumbnails(&self, cancel: &CancellationToken) -> usize {
        let mut captured = 0;
        loop {
            let markers = self.markers();
            let ids: Vec<Uuid> = markers.iter().map(|marker| marker.id).collect();
            let pruned = self.thumbnails.prune(&ids);
            if pruned > 0 {
                debug!(pruned, "dropped thumbnails of deleted markers");
            }
            if let Ok(mut selection) = self.selection.lock() {
                selection.retain_existing(ids.iter().copied());
            }

            let outcome = self.thumbnails.sync(&markers, cancel).await;
            captured += outcome.captured();
            match outcome {
                RunOutcome::Completed { captured: 1.., .. } if !cancel.is_cancelled() => continue,
                _ => break,
            }
        }
        captured
    }

    /// Resubmit an edit the store did not confirm.
    pub fn retry(&self, failure: ReconcileFailure) {
        self.reconciler.retry(failure);
    }

    /// Wait until every edit made so far was attempted against the store.
    pub async fn flush(&self) {
        self.reconciler.flush().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SeekOptions;
    use crate::hotkeys::HotkeyAction;
    use crate::testing::{FakeCapture, FakeElement, MemoryStore};

    async fn open_with(
        store: Arc<MemoryStore>,
        capture: Arc<FakeCapture>,
        video_id: Uuid,
    ) -> (MarkerEditor, mpsc::UnboundedReceiver<ReconcileFailure>) {
        MarkerEditor::open(video_id, store, Some(capture), EditorSettings::default())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn open_loads_markers_in_display_order() {
        let video = Uuid::new_v4();
        let late = Marker::new(8.0);
        let early = Marker::new(2.0);
        let store = Arc::new(MemoryStore::with_markers(video, vec![late.clone(), early.clone()]));
        let (editor, _failures) = open_with(store, Arc::new(FakeCapture::default()), video).await;

        let ids: Vec<Uuid> = editor.markers().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![early.id, late.id]);
    }

    #[tokio::test]
    async fn hotkey_edits_are_persisted_and_thumbnailed() {
        let video = Uuid::new_v4();
        let store = Arc::new(MemoryStore::default());
        let capture = Arc::new(FakeCapture::default());
        let (editor, _failures) = open_with(store.clone(), capture.clone(), video).await;
        let element = FakeElement::loaded(30.0);
        editor.playback().attach(element.clone());

        editor.playback().seek_to(3.0, SeekOptions::default()).await;
        editor.dispatcher().execute(HotkeyAction::AddMarker).await;
        editor.playback().seek_to(0.0, SeekOptions::default()).await;
        editor.dispatcher().execute(HotkeyAction::AddMarker).await;
        editor.flush().await;

        assert_eq!(store.markers(video), editor.markers());

        let captured = editor.refresh_thumbnails(&CancellationToken::new()).await;
        assert_eq!(captured, 2);
        assert_eq!(capture.times(), vec![0.01, 3.0]);
        assert_eq!(editor.thumbnails().cache().len(), 2);
    }

    #[tokio::test]
    async fn deleting_a_marker_prunes_its_thumbnail() {
        let video = Uuid::new_v4();
        let doomed = Marker::new(4.0);
        let store = Arc::new(MemoryStore::with_markers(video, vec![doomed.clone(), Marker::new(1.0)]));
        let (editor, _failures) = open_with(store, Arc::new(FakeCapture::default()), video).await;
        editor.refresh_thumbnails(&CancellationToken::new()).await;
        assert!(editor.thumbnails().get(doomed.id).is_some());

        editor.selection().lock().unwrap().select_marker(doomed.id);
        assert!(editor.dispatcher().execute(HotkeyAction::DeleteSelection).await);
        editor.refresh_thumbnails(&CancellationToken::new()).await;

        assert!(editor.thumbnails().get(doomed.id).is_none());
        assert_eq!(editor.thumbnails().cache().len(), 1);
    }

    #[tokio::test]
    async fn unconfirmed_edit_can_be_retried() {
        let video = Uuid::new_v4();
        let store = Arc::new(MemoryStore::default());
        let (editor, mut failures) = open_with(store.clone(), Arc::new(FakeCapture::default()), video).await;

        store.set_failing(true);
        let marker = editor.timeline().lock().unwrap().add_at(6.0, Some("Pricing".to_string()));
        let failure = failures.recv().await.unwrap();
        assert_eq!(editor.markers(), vec![marker.clone()]);

        store.set_failing(false);
        editor.retry(failure);
        editor.flush().await;
        assert_eq!(store.markers(video), vec![marker]);
    }
}
