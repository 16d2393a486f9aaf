//! Shared defaults for playback, thumbnails, and persistence.

/// Bare arrow-key seek step.
pub const DEFAULT_SMALL_SEEK_SECONDS: f64 = 1.0;
/// Shift + arrow-key seek step.
pub const DEFAULT_LARGE_SEEK_SECONDS: f64 = 5.0;
/// Upper bound on how long a seek waits for media metadata before giving up.
pub const DEFAULT_METADATA_WAIT_MS: u64 = 5_000;
/// Some decoders cannot produce a frame at exactly zero.
pub const CAPTURE_TIME_FLOOR_SECONDS: f64 = 0.01;
pub const THUMBNAIL_HEIGHT: u32 = 120;
pub const THUMBNAIL_DATA_URI_PREFIX: &str = "data:image/png;base64,";

pub const SETTINGS_FILE_NAME: &str = "editor.json";
