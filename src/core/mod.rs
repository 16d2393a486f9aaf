pub mod frame;
pub mod playback;
pub mod reconcile;
pub mod store;
pub mod thumbnailer;
pub mod timeline;

pub use frame::{encode_data_uri, FrameSource, SurfaceFrameCapture};
pub use playback::{MediaElement, MetadataSignal, PlaybackController, PlaybackState, SeekOptions};
pub use reconcile::{MarkerChange, ReconcileFailure, Reconciler};
pub use store::{JsonMarkerStore, MarkerStore};
pub use thumbnailer::{FrameCapture, RunOutcome, ThumbnailCache, ThumbnailScheduler};
pub use timeline::MarkerTimeline;
