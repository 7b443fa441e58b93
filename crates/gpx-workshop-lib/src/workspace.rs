//! Track workspace: the segments of an open document and their selection
//!
//! The workspace exclusively owns its segments. Everything outside refers to
//! them by [`SegmentId`] and looks them up again when needed. State changes go
//! through [`Command`](crate::Command)s so they can be undone; the mutators
//! here are crate-private and report every change to the observer.

use crate::observer::{SegmentStyle, WorkspaceChange, WorkspaceObserver};
use crate::segment::{GeoBounds, SegmentId, TrackSegment};
use crate::spatial;

use geo::Point;
use indexmap::IndexMap;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Summary of the workspace contents
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WorkspaceInfo {
    /// Number of segments loaded
    pub segment_count: usize,
    /// Number of selected segments
    pub selected_count: usize,
    /// Total number of track points
    pub total_points: usize,
    /// Total length in meters
    pub total_distance_meters: f64,
}

/// Segments in insertion order plus the set of selected ids
///
/// Every selected id refers to a segment in the workspace.
#[derive(Default)]
pub struct Workspace {
    segments: IndexMap<SegmentId, TrackSegment>,
    selected: BTreeSet<SegmentId>,
    observer: Option<Box<dyn WorkspaceObserver>>,
}

impl fmt::Debug for Workspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workspace")
            .field("segments", &self.segments.keys().collect::<Vec<_>>())
            .field("selected", &self.selected)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a workspace that reports every change to `observer`
    pub fn with_observer(observer: Box<dyn WorkspaceObserver>) -> Self {
        Self {
            observer: Some(observer),
            ..Self::default()
        }
    }

    // --- queries ---

    #[inline]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    #[inline]
    pub fn contains(&self, id: SegmentId) -> bool {
        self.segments.contains_key(&id)
    }

    #[inline]
    pub fn segment(&self, id: SegmentId) -> Option<&TrackSegment> {
        self.segments.get(&id)
    }

    /// All segments in insertion order
    pub fn segments(&self) -> impl Iterator<Item = &TrackSegment> {
        self.segments.values()
    }

    #[inline]
    pub fn is_selected(&self, id: SegmentId) -> bool {
        self.selected.contains(&id)
    }

    /// Selected ids in ascending order
    pub fn selected_ids(&self) -> Vec<SegmentId> {
        self.selected.iter().copied().collect()
    }

    /// Segment closest to a projected `point`, strictly within `tolerance` meters
    pub fn closest(&self, point: Point<f64>, tolerance: f64) -> Option<SegmentId> {
        spatial::closest(self.segments.values(), point, tolerance)
    }

    pub fn info(&self) -> WorkspaceInfo {
        WorkspaceInfo {
            segment_count: self.segments.len(),
            selected_count: self.selected.len(),
            total_points: self.segments.values().map(TrackSegment::len).sum(),
            total_distance_meters: self.segments.values().map(TrackSegment::length_meters).sum(),
        }
    }

    /// Latitude/longitude extent of all segments, `None` when empty
    pub fn bounds_wgs84(&self) -> Option<GeoBounds> {
        self.segments
            .values()
            .map(TrackSegment::bounds)
            .reduce(|acc, bounds| acc.union(&bounds))
    }

    /// Center of [`Self::bounds_wgs84`] as (latitude, longitude)
    pub fn center_wgs84(&self) -> Option<(f64, f64)> {
        self.bounds_wgs84().map(|bounds| bounds.center())
    }

    /// Stroke for drawing the segment, `None` for unknown ids
    pub fn style_of(&self, id: SegmentId) -> Option<SegmentStyle> {
        self.contains(id)
            .then(|| SegmentStyle::for_selection(self.is_selected(id)))
    }

    // --- mutators used by commands ---

    /// Add segments whose ids are not yet present, returning the added ids
    pub(crate) fn insert_segments(&mut self, segments: Vec<TrackSegment>) -> Vec<SegmentId> {
        let mut added = Vec::with_capacity(segments.len());
        for segment in segments {
            let id = segment.id();
            if self.segments.contains_key(&id) {
                tracing::debug!("Ignoring {} already in workspace", id);
                continue;
            }
            self.segments.insert(id, segment);
            added.push(id);
        }
        self.notify(WorkspaceChange::Added(added.clone()));
        added
    }

    /// Put segments back at the positions they were removed from
    ///
    /// `items` pairs each segment with its former index; ids already present
    /// are skipped. Returns the restored ids in position order.
    pub(crate) fn restore_segments(&mut self, mut items: Vec<(usize, TrackSegment)>) -> Vec<SegmentId> {
        items.sort_by_key(|(index, _)| *index);
        let mut restored = Vec::with_capacity(items.len());
        for (index, segment) in items {
            let id = segment.id();
            if self.segments.contains_key(&id) {
                continue;
            }
            let index = index.min(self.segments.len());
            self.segments.shift_insert(index, id, segment);
            restored.push(id);
        }
        self.notify(WorkspaceChange::Added(restored.clone()));
        restored
    }

    /// Remove the present ids
    ///
    /// Returns the removed segments paired with their former index, in
    /// workspace order, and the ids among them that were selected.
    pub(crate) fn remove_segments(
        &mut self,
        ids: &[SegmentId],
    ) -> (Vec<(usize, TrackSegment)>, Vec<SegmentId>) {
        let wanted: BTreeSet<SegmentId> = ids.iter().copied().collect();
        let was_selected: Vec<SegmentId> = wanted
            .iter()
            .copied()
            .filter(|id| self.selected.contains(id))
            .collect();
        self.deselect_ids(&was_selected);

        let positions: Vec<(usize, SegmentId)> = self
            .segments
            .keys()
            .enumerate()
            .filter(|(_, id)| wanted.contains(*id))
            .map(|(index, id)| (index, *id))
            .collect();
        let removed: Vec<(usize, TrackSegment)> = positions
            .iter()
            .filter_map(|(index, id)| self.segments.shift_remove(id).map(|s| (*index, s)))
            .collect();

        self.notify(WorkspaceChange::Removed(positions.into_iter().map(|(_, id)| id).collect()));
        (removed, was_selected)
    }

    /// Select present, unselected ids, returning those that changed
    pub(crate) fn select_ids(&mut self, ids: &[SegmentId]) -> Vec<SegmentId> {
        let mut changed = Vec::new();
        for &id in ids {
            if self.segments.contains_key(&id) && self.selected.insert(id) {
                changed.push(id);
            }
        }
        self.notify(WorkspaceChange::Selected(changed.clone()));
        changed
    }

    /// Deselect selected ids, returning those that changed
    pub(crate) fn deselect_ids(&mut self, ids: &[SegmentId]) -> Vec<SegmentId> {
        let mut changed = Vec::new();
        for id in ids {
            if self.selected.remove(id) {
                changed.push(*id);
            }
        }
        self.notify(WorkspaceChange::Deselected(changed.clone()));
        changed
    }

    /// Make the selection exactly `ids` intersected with the present segments,
    /// returning the previous selection
    pub(crate) fn replace_selection(&mut self, ids: &[SegmentId]) -> Vec<SegmentId> {
        let previous = self.selected_ids();
        let next: BTreeSet<SegmentId> = ids
            .iter()
            .copied()
            .filter(|id| self.segments.contains_key(id))
            .collect();

        let dropped: Vec<SegmentId> = self.selected.difference(&next).copied().collect();
        let added: Vec<SegmentId> = next.difference(&self.selected).copied().collect();
        self.deselect_ids(&dropped);
        self.select_ids(&added);
        previous
    }

    /// Drop everything without notifying per segment
    pub(crate) fn clear(&mut self) {
        let ids: Vec<SegmentId> = self.segments.keys().copied().collect();
        let selected = self.selected_ids();
        self.selected.clear();
        self.segments.clear();
        self.notify(WorkspaceChange::Deselected(selected));
        self.notify(WorkspaceChange::Removed(ids));
    }

    fn notify(&mut self, change: WorkspaceChange) {
        if change.ids().is_empty() {
            return;
        }
        if let Some(observer) = self.observer.as_mut() {
            observer.on_change(&change);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::GeoPoint;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn segment_at(latitude: f64) -> TrackSegment {
        TrackSegment::new(vec![
            GeoPoint::new(latitude, 0.0),
            GeoPoint::new(latitude, 0.01),
        ])
        .unwrap()
    }

    fn recording_workspace() -> (Workspace, Rc<RefCell<Vec<WorkspaceChange>>>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        let workspace = Workspace::with_observer(Box::new(move |change: &WorkspaceChange| {
            sink.borrow_mut().push(change.clone())
        }));
        (workspace, log)
    }

    #[test]
    fn test_insert_keeps_order_and_skips_duplicates() {
        let mut workspace = Workspace::new();
        let a = segment_at(0.0);
        let b = segment_at(1.0);
        let (a_id, b_id) = (a.id(), b.id());
        let duplicate = a.clone();

        let added = workspace.insert_segments(vec![a, b, duplicate]);
        assert_eq!(added, vec![a_id, b_id]);
        let order: Vec<_> = workspace.segments().map(|s| s.id()).collect();
        assert_eq!(order, vec![a_id, b_id]);
    }

    #[test]
    fn test_remove_deselects_first() {
        let (mut workspace, log) = recording_workspace();
        let a = segment_at(0.0);
        let b = segment_at(1.0);
        let (a_id, b_id) = (a.id(), b.id());
        workspace.insert_segments(vec![a, b]);
        workspace.select_ids(&[a_id]);

        let (removed, was_selected) = workspace.remove_segments(&[b_id, a_id]);
        // Removed segments come back in workspace order
        let removed: Vec<(usize, SegmentId)> = removed.iter().map(|(i, s)| (*i, s.id())).collect();
        assert_eq!(removed, vec![(0, a_id), (1, b_id)]);
        assert_eq!(was_selected, vec![a_id]);
        assert!(workspace.selected_ids().is_empty());
        assert!(workspace.is_empty());

        let log = log.borrow();
        assert_eq!(log[log.len() - 2], WorkspaceChange::Deselected(vec![a_id]));
        assert_eq!(log[log.len() - 1], WorkspaceChange::Removed(vec![a_id, b_id]));
    }

    #[test]
    fn test_select_requires_presence() {
        let mut workspace = Workspace::new();
        let stranger = SegmentId::next();
        assert!(workspace.select_ids(&[stranger]).is_empty());
        assert!(!workspace.is_selected(stranger));
    }

    #[test]
    fn test_replace_selection_intersects_and_reports_previous() {
        let mut workspace = Workspace::new();
        let a = segment_at(0.0);
        let b = segment_at(1.0);
        let (a_id, b_id) = (a.id(), b.id());
        workspace.insert_segments(vec![a, b]);
        workspace.select_ids(&[a_id]);

        let previous = workspace.replace_selection(&[b_id, SegmentId::next()]);
        assert_eq!(previous, vec![a_id]);
        assert_eq!(workspace.selected_ids(), vec![b_id]);
    }

    #[test]
    fn test_no_notification_without_change() {
        let (mut workspace, log) = recording_workspace();
        workspace.deselect_ids(&[SegmentId::next()]);
        workspace.insert_segments(Vec::new());
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_info_bounds_and_style() {
        let mut workspace = Workspace::new();
        assert!(workspace.bounds_wgs84().is_none());
        assert!(workspace.center_wgs84().is_none());

        let a = segment_at(0.0);
        let b = segment_at(2.0);
        let a_id = a.id();
        workspace.insert_segments(vec![a, b]);
        workspace.select_ids(&[a_id]);

        let info = workspace.info();
        assert_eq!(info.segment_count, 2);
        assert_eq!(info.selected_count, 1);
        assert_eq!(info.total_points, 4);
        assert!(info.total_distance_meters > 2000.0);

        let (lat, lon) = workspace.center_wgs84().unwrap();
        assert!((lat - 1.0).abs() < 1e-12);
        assert!((lon - 0.005).abs() < 1e-12);

        assert_eq!(workspace.style_of(a_id), Some(SegmentStyle::for_selection(true)));
        assert_eq!(workspace.style_of(SegmentId::next()), None);
    }
}
