use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use uuid::Uuid;

use crate::utils::{normalize_label, sanitize_marker_time};

/// A marker (point-in-time annotation on the reviewed video)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Marker {
    /// Unique identifier
    pub id: Uuid,
    /// Time position in seconds
    pub time: f64,
    /// Optional label
    #[serde(default)]
    pub label: Option<String>,
    /// Creation timestamp; the store's tie-break for markers sharing a time
    #[serde(default = "chrono::Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Marker {
    /// Create a new marker at the given time
    pub fn new(time: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            time: sanitize_marker_time(time),
            label: None,
            created_at: Utc::now(),
        }
    }

    /// Create a marker with a label
    pub fn with_label(time: f64, label: impl Into<String>) -> Self {
        Self {
            label: normalize_label(Some(label.into())),
            ..Self::new(time)
        }
    }

    /// Label for display, falling back to a placeholder.
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or("(untitled)")
    }

    /// The fields that decide where this marker sorts.
    pub fn position(&self) -> MarkerPosition {
        MarkerPosition {
            id: self.id,
            time: self.time,
            created_at: self.created_at,
        }
    }
}

/// Sort key of one marker, as sent to the store after a reorder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarkerPosition {
    pub id: Uuid,
    pub time: f64,
    pub created_at: DateTime<Utc>,
}

/// Display and persisted ordering: by time, then creation timestamp, then id.
pub fn compare_markers(a: &Marker, b: &Marker) -> Ordering {
    a.time
        .total_cmp(&b.time)
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Stable sort into persisted order.
pub fn sort_markers(markers: &mut [Marker]) {
    markers.sort_by(compare_markers);
}
