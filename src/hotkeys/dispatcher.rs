//! Binds the editor's hotkeys to playback and marker operations.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{default_bindings, handle_hotkey, normalize_case, HotkeyAction, HotkeyContext, HotkeyResult, KeyCombo, KeyEvent};
use crate::core::{MarkerTimeline, PlaybackController, SeekOptions};
use crate::state::{EditorSettings, SelectionState};

/// Handler invoked by the keybinding library. Returns true when the event
/// was consumed.
pub type KeyHandler = Box<dyn Fn(&KeyEvent) -> bool + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingOptions {
    pub enabled: bool,
    pub suppress_in_form_fields: bool,
}

/// Host keybinding library.
pub trait KeyBindings {
    fn register(&mut self, combo: KeyCombo, handler: KeyHandler, options: BindingOptions);
}

#[derive(Debug)]
struct DispatchFlags {
    enabled: AtomicBool,
    enable_reorder: AtomicBool,
}

impl DispatchFlags {
    fn context(&self, event: &KeyEvent) -> HotkeyContext {
        HotkeyContext {
            enabled: self.enabled.load(Ordering::Acquire),
            enable_reorder: self.enable_reorder.load(Ordering::Acquire),
            input_focused: event.target.is_form_field(),
        }
    }
}

pub struct CommandDispatcher {
    playback: Arc<PlaybackController>,
    timeline: Arc<Mutex<MarkerTimeline>>,
    selection: Arc<Mutex<SelectionState>>,
    flags: Arc<DispatchFlags>,
    small_step: f64,
    large_step: f64,
}

impl CommandDispatcher {
    pub fn new(
        playback: Arc<PlaybackController>,
        timeline: Arc<Mutex<MarkerTimeline>>,
        selection: Arc<Mutex<SelectionState>>,
        settings: &EditorSettings,
    ) -> Self {
        Self {
            playback,
            timeline,
            selection,
            flags: Arc::new(DispatchFlags {
                enabled: AtomicBool::new(true),
                enable_reorder: AtomicBool::new(true),
            }),
            small_step: settings.small_seek_seconds,
            large_step: settings.large_seek_seconds,
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.flags.enabled.store(enabled, Ordering::Release);
    }

    pub fn set_reorder_enabled(&self, enabled: bool) {
        self.flags.enable_reorder.store(enabled, Ordering::Release);
    }

    pub fn is_enabled(&self) -> bool {
        self.flags.enabled.load(Ordering::Acquire)
    }

    /// Hotkey context for an event under the current flags.
    pub fn context(&self, event: &KeyEvent) -> HotkeyContext {
        self.flags.context(event)
    }

    /// Register every default binding with the host library.
    ///
    /// Handlers only enqueue the action; feed the returned receiver to
    /// [`CommandDispatcher::run`]. A handler ignores events whose modifiers
    /// differ from its combo, so a bare-arrow handler leaves Shift+arrow to
    /// the large-step handler. Bindings are registered as enabled; the
    /// handlers read [`CommandDispatcher::set_enabled`] on every press.
    pub fn bind(&self, bindings: &mut dyn KeyBindings) -> mpsc::UnboundedReceiver<HotkeyAction> {
        let (tx, rx) = mpsc::unbounded_channel();
        for (combo, expected) in default_bindings() {
            let flags = Arc::clone(&self.flags);
            let tx = tx.clone();
            let bound = combo.clone();
            let handler: KeyHandler = Box::new(move |event| {
                if !bound.matches(&normalize_case(event)) {
                    return false;
                }
                match handle_hotkey(event, &flags.context(event)) {
                    HotkeyResult::Action(action) if action == expected => tx.send(action).is_ok(),
                    _ => false,
                }
            });
            let options = BindingOptions {
                enabled: true,
                suppress_in_form_fields: true,
            };
            debug!(combo = %combo, action = ?expected, "registering hotkey");
            bindings.register(combo, handler, options);
        }
        rx
    }

    /// Apply queued actions in order until every handler is gone.
    pub async fn run(&self, mut actions: mpsc::UnboundedReceiver<HotkeyAction>) {
        while let Some(action) = actions.recv().await {
            let applied = self.execute(action).await;
            debug!(?action, applied, "hotkey action");
        }
    }

    /// Apply one action. Returns false when it was gated off or had nothing to act on.
    pub async fn execute(&self, action: HotkeyAction) -> bool {
        if !self.is_enabled() {
            return false;
        }
        if action.is_reorder() && !self.flags.enable_reorder.load(Ordering::Acquire) {
            return false;
        }
        match action {
            HotkeyAction::PlayPause => {
                if !self.playback.has_element() {
                    return false;
                }
                self.playback.toggle_playing();
                true
            }
            HotkeyAction::SeekBackward => self.seek(-self.small_step).await,
            HotkeyAction::SeekForward => self.seek(self.small_step).await,
            HotkeyAction::SeekBackwardLarge => self.seek(-self.large_step).await,
            HotkeyAction::SeekForwardLarge => self.seek(self.large_step).await,
            HotkeyAction::AddMarker => self.add_marker(),
            HotkeyAction::DeleteSelection => self.delete_selection(),
            HotkeyAction::MoveSelectionUp => {
                self.with_selection(|timeline, ids| timeline.move_selected_up(ids))
            }
            HotkeyAction::MoveSelectionDown => {
                self.with_selection(|timeline, ids| timeline.move_selected_down(ids))
            }
        }
    }

    async fn seek(&self, delta: f64) -> bool {
        if !self.playback.has_element() {
            return false;
        }
        self.playback.seek_by(delta, SeekOptions::default()).await;
        true
    }

    fn add_marker(&self) -> bool {
        let time = self.playback.current_time();
        let Ok(mut timeline) = self.timeline.lock() else {
            warn!("marker timeline lock poisoned");
            return false;
        };
        let marker = timeline.add_at(time, None);
        if let Ok(mut selection) = self.selection.lock() {
            selection.select_marker(marker.id);
        }
        true
    }

    fn delete_selection(&self) -> bool {
        let ids = self.selected_ids();
        if ids.is_empty() {
            return false;
        }
        let Ok(mut timeline) = self.timeline.lock() else {
            warn!("marker timeline lock poisoned");
            return false;
        };
        let removed = timeline.delete_selected(&ids);
        if let Ok(mut selection) = self.selection.lock() {
            selection.remove_markers(&ids);
        }
        removed > 0
    }

    fn with_selection(&self, f: impl FnOnce(&mut MarkerTimeline, &[uuid::Uuid]) -> bool) -> bool {
        let ids = self.selected_ids();
        if ids.is_empty() {
            return false;
        }
        let Ok(mut timeline) = self.timeline.lock() else {
            warn!("marker timeline lock poisoned");
            return false;
        };
        f(&mut timeline, &ids)
    }

    fn selected_ids(&self) -> Vec<uuid::Uuid> {
        self.selection
            .lock()
            .map(|selection| selection.marker_ids.clone())
            .unwrap_or_default()
    }
}
