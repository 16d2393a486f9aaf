//! Marker selection shared by the command surface and the marker list.

use std::collections::HashSet;
use uuid::Uuid;

/// Tracks which markers are selected, in selection order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionState {
    /// Selected marker IDs; the first entry is the primary selection.
    pub marker_ids: Vec<Uuid>,
}

impl SelectionState {
    /// Clear the selection.
    pub fn clear(&mut self) {
        self.marker_ids.clear();
    }

    /// Replace the selection with a single marker.
    pub fn select_marker(&mut self, marker_id: Uuid) {
        self.marker_ids.clear();
        self.marker_ids.push(marker_id);
    }

    /// Add or remove a marker (ctrl/cmd-click behaviour).
    pub fn toggle_marker(&mut self, marker_id: Uuid) {
        if self.contains(marker_id) {
            self.remove_marker(marker_id);
        } else {
            self.marker_ids.push(marker_id);
        }
    }

    /// Remove a marker from selection, if present.
    pub fn remove_marker(&mut self, marker_id: Uuid) {
        self.marker_ids.retain(|id| *id != marker_id);
    }

    pub fn remove_markers(&mut self, marker_ids: &[Uuid]) {
        let removed: HashSet<&Uuid> = marker_ids.iter().collect();
        self.marker_ids.retain(|id| !removed.contains(id));
    }

    /// Drop selected ids that no longer exist.
    pub fn retain_existing(&mut self, existing: impl IntoIterator<Item = Uuid>) {
        let existing: HashSet<Uuid> = existing.into_iter().collect();
        self.marker_ids.retain(|id| existing.contains(id));
    }

    pub fn contains(&self, marker_id: Uuid) -> bool {
        self.marker_ids.contains(&marker_id)
    }

    pub fn is_empty(&self) -> bool {
        self.marker_ids.is_empty()
    }

    /// Return the primary selected marker, if any.
    pub fn primary_marker(&self) -> Option<Uuid> {
        self.marker_ids.first().copied()
    }
}
