//! Ordered working copy of one video's markers.
//!
//! Display order is the store's order: by `time`, then `created_at`, then id.
//! Structural edits update the working copy first and then hand a
//! [`MarkerChange`] to the reconciler, which confirms it against the store.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use tracing::debug;
use uuid::Uuid;

use crate::core::reconcile::{MarkerChange, Reconciler};
use crate::core::store::MarkerStore;
use crate::error::Result;
use crate::state::{compare_markers, sort_markers, Marker, MarkerPosition};
use crate::utils::normalize_label;

#[derive(Debug)]
pub struct MarkerTimeline {
    video_id: Uuid,
    markers: Vec<Marker>,
    reconciler: Option<Reconciler>,
}

impl MarkerTimeline {
    /// An empty timeline that is not connected to a store.
    pub fn new(video_id: Uuid) -> Self {
        Self {
            video_id,
            markers: Vec::new(),
            reconciler: None,
        }
    }

    /// Build a timeline from markers in any order.
    pub fn from_markers(video_id: Uuid, markers: Vec<Marker>) -> Self {
        let mut timeline = Self::new(video_id);
        timeline.replace_all(markers);
        timeline
    }

    /// Load the working copy from the store.
    pub async fn load(store: &dyn MarkerStore, video_id: Uuid) -> Result<Self> {
        let markers = store.list(video_id).await?;
        debug!(%video_id, count = markers.len(), "loaded markers");
        Ok(Self::from_markers(video_id, markers))
    }

    /// Send every later edit through `reconciler`.
    pub fn with_reconciler(mut self, reconciler: Reconciler) -> Self {
        self.reconciler = Some(reconciler);
        self
    }

    /// Replace the working copy, e.g. after a remote refresh. Nothing is
    /// sent to the store.
    pub fn replace_all(&mut self, mut markers: Vec<Marker>) {
        sort_markers(&mut markers);
        self.markers = markers;
    }

    pub fn video_id(&self) -> Uuid {
        self.video_id
    }

    /// Markers in display order.
    pub fn markers(&self) -> impl Iterator<Item = &Marker> + '_ {
        self.markers.iter()
    }

    pub fn to_vec(&self) -> Vec<Marker> {
        self.markers.clone()
    }

    pub fn ids(&self) -> Vec<Uuid> {
        self.markers().map(|marker| marker.id).collect()
    }

    pub fn get(&self, id: Uuid) -> Option<&Marker> {
        self.markers().find(|marker| marker.id == id)
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Add a marker at `time`; its position follows from the sort order.
    pub fn add_at(&mut self, time: f64, label: Option<String>) -> Marker {
        let mut marker = Marker::new(time);
        marker.label = normalize_label(label);
        marker.created_at = self.next_created_at();

        let index = self
            .markers
            .partition_point(|existing| compare_markers(existing, &marker).is_lt());
        self.markers.insert(index, marker.clone());
        debug!(video_id = %self.video_id, marker_id = %marker.id, time = marker.time, index, "marker added");
        self.reconcile(MarkerChange::Create(marker.clone()));
        marker
    }

    /// Remove every marker whose id is in `ids`; unknown ids are ignored.
    /// Returns how many markers were removed.
    pub fn delete_selected(&mut self, ids: &[Uuid]) -> usize {
        let selected: HashSet<Uuid> = ids.iter().copied().collect();
        let mut removed = Vec::new();
        self.markers.retain(|marker| {
            let keep = !selected.contains(&marker.id);
            if !keep {
                removed.push(marker.id);
            }
            keep
        });
        if removed.is_empty() {
            return 0;
        }
        debug!(video_id = %self.video_id, count = removed.len(), "markers deleted");
        let count = removed.len();
        self.reconcile(MarkerChange::Delete(removed));
        count
    }

    /// Move each selected marker one position earlier.
    ///
    /// Returns false when nothing moved (selection already at the top).
    pub fn move_selected_up(&mut self, ids: &[Uuid]) -> bool {
        let selected: HashSet<Uuid> = ids.iter().copied().collect();
        let mut touched = Vec::new();
        for index in 1..self.markers.len() {
            let moves = selected.contains(&self.markers[index].id)
                && !selected.contains(&self.markers[index - 1].id);
            if moves && self.swap_adjacent(index - 1) {
                touched.extend([self.markers[index - 1].id, self.markers[index].id]);
            }
        }
        self.finish_move(touched)
    }

    /// Move each selected marker one position later.
    pub fn move_selected_down(&mut self, ids: &[Uuid]) -> bool {
        let selected: HashSet<Uuid> = ids.iter().copied().collect();
        let mut touched = Vec::new();
        for index in (1..self.markers.len()).rev() {
            let moves = selected.contains(&self.markers[index - 1].id)
                && !selected.contains(&self.markers[index].id);
            if moves && self.swap_adjacent(index - 1) {
                touched.extend([self.markers[index - 1].id, self.markers[index].id]);
            }
        }
        self.finish_move(touched)
    }

    /// Update a marker label (blank clears it).
    pub fn set_label(&mut self, id: Uuid, label: Option<String>) -> bool {
        let Some(marker) = self.markers.iter_mut().find(|marker| marker.id == id) else {
            return false;
        };
        marker.label = normalize_label(label);
        let label = marker.label.clone();
        self.reconcile(MarkerChange::Relabel { id, label });
        true
    }

    /// Strictly later than every existing marker, so a new marker sorts
    /// after others at the same time.
    fn next_created_at(&self) -> DateTime<Utc> {
        let now = Utc::now();
        match self.markers.iter().map(|marker| marker.created_at).max() {
            Some(latest) if latest >= now => latest + Duration::microseconds(1),
            _ => now,
        }
    }

    /// Exchange the markers at `upper` and `upper + 1`.
    ///
    /// The pair trades `time` and `created_at`, so each position keeps its
    /// sort key and the store orders the pair the same way.
    fn swap_adjacent(&mut self, upper: usize) -> bool {
        let lower = upper + 1;
        let (head, tail) = self.markers.split_at_mut(lower);
        let (a, b) = (&mut head[upper], &mut tail[0]);
        if a.time == b.time && a.created_at == b.created_at {
            return false;
        }
        std::mem::swap(&mut a.time, &mut b.time);
        std::mem::swap(&mut a.created_at, &mut b.created_at);
        self.markers.swap(upper, lower);
        true
    }

    fn finish_move(&mut self, touched: Vec<Uuid>) -> bool {
        if touched.is_empty() {
            return false;
        }
        // Only the id tie-break can differ from the swapped layout.
        sort_markers(&mut self.markers);
        let mut seen = HashSet::new();
        let positions: Vec<MarkerPosition> = touched
            .into_iter()
            .filter(|id| seen.insert(*id))
            .filter_map(|id| self.get(id).map(Marker::position))
            .collect();
        debug!(video_id = %self.video_id, count = positions.len(), "markers repositioned by move");
        self.reconcile(MarkerChange::Reposition(positions));
        true
    }

    fn reconcile(&self, change: MarkerChange) {
        if let Some(reconciler) = &self.reconciler {
            reconciler.submit(change);
        }
    }
}
