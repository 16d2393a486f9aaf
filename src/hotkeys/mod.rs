//! Hotkey system
//!
//! Keyboard surface for the marker editor.
//!
//! # Architecture
//!
//! - **Key / Modifiers / KeyEvent**: symbolic input, independent of key codes
//! - **HotkeyAction**: Enum of all actions that can be triggered by hotkeys
//! - **HotkeyContext**: Whether hotkeys are active right now
//! - **handle_hotkey()**: Maps a key event to an action using [`default_bindings`]
//! - **CommandDispatcher**: Registers the bindings with the host's keybinding
//!   library and applies actions to playback and the marker timeline
//!
//! # Adding New Hotkeys
//!
//! 1. Add a variant to `HotkeyAction`
//! 2. Add the key binding in `default_bindings()`
//! 3. Handle the action in `CommandDispatcher::execute`

mod dispatcher;

pub use dispatcher::*;

use std::fmt;

/// Symbolic key, independent of layout and input method.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Space,
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    Delete,
    Backspace,
    Character(String),
}

impl Key {
    /// Same key, ignoring letter case.
    pub fn eq_ignore_case(&self, other: &Key) -> bool {
        match (self, other) {
            (Key::Character(a), Key::Character(b)) => a.to_lowercase() == b.to_lowercase(),
            (a, b) => a == b,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };
    pub const SHIFT: Modifiers = Modifiers {
        shift: true,
        ..Modifiers::NONE
    };
    pub const ALT: Modifiers = Modifiers {
        alt: true,
        ..Modifiers::NONE
    };

    pub fn any(self) -> bool {
        self != Modifiers::NONE
    }
}

/// Where keyboard focus was when the key was pressed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FocusTarget {
    #[default]
    Document,
    TextInput,
    ContentEditable,
}

impl FocusTarget {
    pub fn is_form_field(self) -> bool {
        matches!(self, FocusTarget::TextInput | FocusTarget::ContentEditable)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub modifiers: Modifiers,
    pub target: FocusTarget,
}

impl KeyEvent {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::NONE,
            target: FocusTarget::Document,
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn in_target(mut self, target: FocusTarget) -> Self {
        self.target = target;
        self
    }
}

/// A key plus the exact set of modifiers that must be held.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyCombo {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyCombo {
    pub fn bare(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn with(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    /// Exact match: a bare combo does not match the same key with a modifier held.
    pub fn matches(&self, event: &KeyEvent) -> bool {
        self.key == event.key && self.modifiers == event.modifiers
    }
}

impl fmt::Display for KeyCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (held, name) in [
            (self.modifiers.ctrl, "Ctrl"),
            (self.modifiers.alt, "Alt"),
            (self.modifiers.shift, "Shift"),
            (self.modifiers.meta, "Meta"),
        ] {
            if held {
                write!(f, "{}+", name)?;
            }
        }
        match &self.key {
            Key::Character(c) => write!(f, "{}", c),
            other => write!(f, "{:?}", other),
        }
    }
}

/// All possible actions that can be triggered by hotkeys.
///
/// Each variant represents a semantic action, not a key binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HotkeyAction {
    /// Toggle playback.
    PlayPause,
    /// Seek back by the small step.
    SeekBackward,
    /// Seek forward by the small step.
    SeekForward,
    /// Seek back by the large step.
    SeekBackwardLarge,
    /// Seek forward by the large step.
    SeekForwardLarge,
    /// Drop a marker at the current playback time.
    AddMarker,
    /// Delete the selected markers.
    DeleteSelection,
    /// Move the selected markers one position earlier.
    MoveSelectionUp,
    /// Move the selected markers one position later.
    MoveSelectionDown,
}

impl HotkeyAction {
    /// Reordering has its own enable flag (off in read-only views).
    pub fn is_reorder(self) -> bool {
        matches!(self, HotkeyAction::MoveSelectionUp | HotkeyAction::MoveSelectionDown)
    }
}

/// Context information that decides whether hotkeys are active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HotkeyContext {
    /// Master switch, e.g. false while the marker dialog is closed
    pub enabled: bool,
    /// Whether move up/down may run
    pub enable_reorder: bool,
    /// Whether a text field or content-editable region has focus
    pub input_focused: bool,
}

impl Default for HotkeyContext {
    fn default() -> Self {
        Self {
            enabled: true,
            enable_reorder: true,
            input_focused: false,
        }
    }
}

/// Result of processing a key event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HotkeyResult {
    /// A hotkey action was matched and should be executed
    Action(HotkeyAction),
    /// No matching hotkey for this key/modifier combination
    NoMatch,
    /// Hotkey would match but is suppressed (disabled, or input focused)
    Suppressed,
}

/// The editor's key bindings.
pub fn default_bindings() -> Vec<(KeyCombo, HotkeyAction)> {
    vec![
        (KeyCombo::bare(Key::Space), HotkeyAction::PlayPause),
        (KeyCombo::bare(Key::ArrowLeft), HotkeyAction::SeekBackward),
        (KeyCombo::bare(Key::ArrowRight), HotkeyAction::SeekForward),
        (
            KeyCombo::with(Key::ArrowLeft, Modifiers::SHIFT),
            HotkeyAction::SeekBackwardLarge,
        ),
        (
            KeyCombo::with(Key::ArrowRight, Modifiers::SHIFT),
            HotkeyAction::SeekForwardLarge,
        ),
        (KeyCombo::bare(Key::Character("m".to_string())), HotkeyAction::AddMarker),
        (KeyCombo::bare(Key::Delete), HotkeyAction::DeleteSelection),
        (KeyCombo::bare(Key::Backspace), HotkeyAction::DeleteSelection),
        (
            KeyCombo::with(Key::ArrowUp, Modifiers::ALT),
            HotkeyAction::MoveSelectionUp,
        ),
        (
            KeyCombo::with(Key::ArrowDown, Modifiers::ALT),
            HotkeyAction::MoveSelectionDown,
        ),
    ]
}

/// Maps a key event to an action, considering the current context.
///
/// # Returns
/// * `HotkeyResult::Action(action)` if a hotkey matched
/// * `HotkeyResult::NoMatch` if no binding exists
/// * `HotkeyResult::Suppressed` if hotkeys are disabled, an input is focused,
///   or the action is a reorder while reordering is off
pub fn handle_hotkey(event: &KeyEvent, context: &HotkeyContext) -> HotkeyResult {
    if !context.enabled || context.input_focused {
        return HotkeyResult::Suppressed;
    }

    let event = normalize_case(event);
    let Some(action) = default_bindings()
        .into_iter()
        .find(|(combo, _)| combo.matches(&event))
        .map(|(_, action)| action)
    else {
        return HotkeyResult::NoMatch;
    };

    if action.is_reorder() && !context.enable_reorder {
        return HotkeyResult::Suppressed;
    }
    HotkeyResult::Action(action)
}

/// Letter keys compare case-insensitively (caps lock must not disable "m").
pub(crate) fn normalize_case(event: &KeyEvent) -> KeyEvent {
    match &event.key {
        Key::Character(c) if !event.modifiers.shift => KeyEvent {
            key: Key::Character(c.to_lowercase()),
            ..event.clone()
        },
        _ => event.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(key: Key, modifiers: Modifiers) -> HotkeyResult {
        handle_hotkey(
            &KeyEvent::new(key).with_modifiers(modifiers),
            &HotkeyContext::default(),
        )
    }

    #[test]
    fn test_space_toggles_playback() {
        assert_eq!(
            press(Key::Space, Modifiers::NONE),
            HotkeyResult::Action(HotkeyAction::PlayPause)
        );
    }

    #[test]
    fn test_bare_and_shifted_arrows_are_distinct() {
        assert_eq!(
            press(Key::ArrowLeft, Modifiers::NONE),
            HotkeyResult::Action(HotkeyAction::SeekBackward)
        );
        assert_eq!(
            press(Key::ArrowLeft, Modifiers::SHIFT),
            HotkeyResult::Action(HotkeyAction::SeekBackwardLarge)
        );
        assert_eq!(
            press(Key::ArrowRight, Modifiers::SHIFT),
            HotkeyResult::Action(HotkeyAction::SeekForwardLarge)
        );
    }

    #[test]
    fn test_bare_combo_ignores_modified_event() {
        let combo = KeyCombo::bare(Key::ArrowLeft);
        let shifted = KeyEvent::new(Key::ArrowLeft).with_modifiers(Modifiers::SHIFT);
        assert!(!combo.matches(&shifted));
    }

    #[test]
    fn test_marker_keys() {
        assert_eq!(
            press(Key::Character("M".to_string()), Modifiers::NONE),
            HotkeyResult::Action(HotkeyAction::AddMarker)
        );
        assert_eq!(
            press(Key::Backspace, Modifiers::NONE),
            HotkeyResult::Action(HotkeyAction::DeleteSelection)
        );
        assert_eq!(
            press(Key::ArrowUp, Modifiers::ALT),
            HotkeyResult::Action(HotkeyAction::MoveSelectionUp)
        );
        assert_eq!(press(Key::ArrowUp, Modifiers::NONE), HotkeyResult::NoMatch);
    }

    #[test]
    fn test_suppressed_when_input_focused_or_disabled() {
        let event = KeyEvent::new(Key::Space);
        let focused = HotkeyContext {
            input_focused: true,
            ..Default::default()
        };
        let disabled = HotkeyContext {
            enabled: false,
            ..Default::default()
        };
        assert_eq!(handle_hotkey(&event, &focused), HotkeyResult::Suppressed);
        assert_eq!(handle_hotkey(&event, &disabled), HotkeyResult::Suppressed);
    }

    #[test]
    fn test_reorder_has_its_own_guard() {
        let read_only = HotkeyContext {
            enable_reorder: false,
            ..Default::default()
        };
        let up = KeyEvent::new(Key::ArrowDown).with_modifiers(Modifiers::ALT);
        assert_eq!(handle_hotkey(&up, &read_only), HotkeyResult::Suppressed);
        assert_eq!(
            handle_hotkey(&KeyEvent::new(Key::Space), &read_only),
            HotkeyResult::Action(HotkeyAction::PlayPause)
        );
    }

    #[test]
    fn test_combo_display() {
        let combo = KeyCombo::with(Key::ArrowLeft, Modifiers::SHIFT);
        assert_eq!(combo.to_string(), "Shift+ArrowLeft");
        assert_eq!(KeyCombo::bare(Key::Character("m".to_string())).to_string(), "m");
    }
}
