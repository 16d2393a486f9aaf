//! State management module
//!
//! Plain data owned by an editing session:
//! - Marker: Point-in-time annotations on the reviewed video
//! - SelectionState: Which markers the command surface acts on
//! - EditorSettings: Seek steps, wait bounds, and thumbnail sizing

mod marker;
mod selection;
mod settings;

pub use marker::*;
pub use selection::*;
pub use settings::*;
