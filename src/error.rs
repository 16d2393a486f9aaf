//! Crate-wide error type.
//!
//! Only store and reconciliation failures ever reach a caller. Missing media
//! elements, media that is not ready yet, and failed thumbnail captures are
//! handled inside the component that hits them.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum EditorError {
    /// The marker store rejected or failed a call.
    #[error("marker store error: {0}")]
    Store(String),

    /// A local edit could not be confirmed against the marker store.
    /// The local working copy keeps the edit; resubmitting the change is safe.
    #[error("failed to reconcile {op} for video {video_id}: {message}")]
    Reconcile {
        op: &'static str,
        video_id: Uuid,
        message: String,
    },

    #[error("invalid id: {0}")]
    InvalidId(#[from] uuid::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

impl EditorError {
    /// Whether resubmitting the same operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EditorError::Store(_) | EditorError::Reconcile { .. } | EditorError::Io(_))
    }
}

pub type Result<T> = std::result::Result<T, EditorError>;
