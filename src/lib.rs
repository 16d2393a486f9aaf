//! Marker Review
//!
//! Editing core for point-in-time markers on a single video: a playback
//! controller that tolerates not-yet-loaded media, an ordered marker timeline
//! reconciled against a store, a cancellable thumbnail scheduler, and a
//! keyboard command surface.

pub mod constants;
pub mod core;
pub mod editor;
pub mod error;
pub mod hotkeys;
pub mod state;
pub mod utils;

#[cfg(test)]
mod testing;

pub use editor::MarkerEditor;
pub use error::{EditorError, Result};
