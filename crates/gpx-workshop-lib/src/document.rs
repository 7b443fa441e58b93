//! Document - the single owner of a workspace and its undo history
//!
//! Every mutating operation is applied as a [`Command`] whose inverse is
//! recorded on the [`UndoStack`]. Callers on other threads (such as a
//! background import) hand plain values back to the document owner, which is
//! the only place mutation happens.

use crate::command::Command;
use crate::history::UndoStack;
use crate::hit_test::{DEFAULT_HIT_RADIUS_PX, Viewport};
use crate::import::FileImport;
use crate::observer::{SegmentStyle, WorkspaceObserver};
use crate::segment::{GeoBounds, SegmentId, TrackSegment};
use crate::workspace::{Workspace, WorkspaceInfo};
use crate::{DataError, Result, builder};

use geo::Point;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for a document
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    /// Click radius in pixels used by [`Document::select_at_screen`] (default 10)
    pub hit_radius_pixels: f64,
    /// Maximum number of undo steps kept, 0 for unlimited (default 0)
    pub undo_levels: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hit_radius_pixels: DEFAULT_HIT_RADIUS_PX,
            undo_levels: 0,
        }
    }
}

/// Per-file summary of [`Document::apply_import`]
#[derive(Debug, Default)]
pub struct ImportReport {
    /// Ids appended from each successful file, in input order
    pub appended: Vec<(PathBuf, Vec<SegmentId>)>,
    /// Files that failed to import
    pub failures: Vec<(PathBuf, DataError)>,
}

impl ImportReport {
    pub fn segment_count(&self) -> usize {
        self.appended.iter().map(|(_, ids)| ids.len()).sum()
    }
}

/// An open GPX document: segments, selection and undo history
#[derive(Debug)]
pub struct Document {
    workspace: Workspace,
    history: UndoStack,
    config: Config,
}

impl Default for Document {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Document {
    pub fn new(config: Config) -> Self {
        Self {
            workspace: Workspace::new(),
            history: UndoStack::with_limit(config.undo_levels),
            config,
        }
    }

    /// Create a document that reports workspace changes to `observer`
    pub fn with_observer(config: Config, observer: Box<dyn WorkspaceObserver>) -> Self {
        Self {
            workspace: Workspace::with_observer(observer),
            history: UndoStack::with_limit(config.undo_levels),
            config,
        }
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    #[inline]
    pub fn history(&self) -> &UndoStack {
        &self.history
    }

    /// Apply `command` and record its inverse
    ///
    /// Returns false when the command changed nothing; such commands are not
    /// recorded and keep the redo stack.
    pub fn execute(&mut self, command: Command) -> bool {
        let inverse = command.apply(&mut self.workspace);
        let changed = !inverse.is_noop();
        self.history.record(inverse);
        changed
    }

    // --- editing operations ---

    pub fn append(&mut self, segments: Vec<TrackSegment>) -> bool {
        self.execute(Command::Append(segments))
    }

    pub fn delete(&mut self, ids: Vec<SegmentId>) -> bool {
        self.execute(Command::Delete(ids))
    }

    pub fn select(&mut self, id: SegmentId) -> bool {
        self.execute(Command::Select(id))
    }

    pub fn deselect(&mut self, id: SegmentId) -> bool {
        self.execute(Command::Deselect(id))
    }

    pub fn select_all(&mut self, ids: Vec<SegmentId>) -> bool {
        self.execute(Command::SelectAll(ids))
    }

    /// Select every segment in the workspace
    pub fn select_everything(&mut self) -> bool {
        let ids = self.workspace.segments().map(TrackSegment::id).collect();
        self.select_all(ids)
    }

    pub fn deselect_all(&mut self) -> bool {
        self.execute(Command::DeselectAll)
    }

    pub fn insert_selected(&mut self, segments: Vec<TrackSegment>) -> bool {
        self.execute(Command::InsertSelected(segments))
    }

    /// Remove every selected segment; false when nothing is selected
    pub fn delete_selected(&mut self) -> bool {
        self.execute(Command::DeleteSelected {
            restore: Vec::new(),
        })
    }

    /// Select `id` if unselected, deselect it otherwise
    pub fn toggle_selection(&mut self, id: SegmentId) -> bool {
        if !self.workspace.contains(id) {
            return false;
        }
        if self.workspace.is_selected(id) {
            self.deselect(id)
        } else {
            self.select(id)
        }
    }

    /// Replace the selection with the segment closest to `point`, as one undo step
    ///
    /// The selection is cleared even when nothing is hit. Returns the hit segment.
    pub fn select_at(&mut self, point: Point<f64>, tolerance: f64) -> Option<SegmentId> {
        #[cfg(feature = "profiling")]
        profiling::scope!("document::select_at");

        let hit = self.workspace.closest(point, tolerance);

        self.history.begin_group();
        self.deselect_all();
        if let Some(id) = hit {
            self.toggle_selection(id);
        }
        self.history.end_group();

        tracing::debug!("select_at hit {:?}", hit);
        hit
    }

    /// Toggle the segment closest to `point`, keeping the rest of the selection
    ///
    /// A miss changes nothing and records nothing. Returns the hit segment.
    pub fn toggle_selection_at(&mut self, point: Point<f64>, tolerance: f64) -> Option<SegmentId> {
        let hit = self.workspace.closest(point, tolerance);
        if let Some(id) = hit {
            self.toggle_selection(id);
        }
        tracing::debug!("toggle_selection_at hit {:?}", hit);
        hit
    }

    /// [`Self::select_at`] for a click at `position` on `viewport`
    pub fn select_at_screen(&mut self, viewport: &Viewport, position: (f64, f64)) -> Option<SegmentId> {
        let query = viewport.hit_query(position, self.config.hit_radius_pixels);
        self.select_at(query.point, query.tolerance)
    }

    /// [`Self::toggle_selection_at`] for a modified click at `position` on `viewport`
    pub fn toggle_selection_at_screen(
        &mut self,
        viewport: &Viewport,
        position: (f64, f64),
    ) -> Option<SegmentId> {
        let query = viewport.hit_query(position, self.config.hit_radius_pixels);
        self.toggle_selection_at(query.point, query.tolerance)
    }

    pub fn undo(&mut self) -> bool {
        self.history.undo(&mut self.workspace)
    }

    pub fn redo(&mut self) -> bool {
        self.history.redo(&mut self.workspace)
    }

    // --- loading ---

    /// Parse GPX bytes and append the segments as one undo step
    pub fn import_bytes(&mut self, bytes: &[u8]) -> Result<Vec<SegmentId>> {
        let segments = builder::build_from_bytes(bytes)?;
        let ids: Vec<SegmentId> = segments.iter().map(TrackSegment::id).collect();
        self.append(segments);
        Ok(ids)
    }

    /// Append the results of a file import, one append per successful file,
    /// all undone together
    pub fn apply_import(&mut self, imports: Vec<FileImport>) -> ImportReport {
        let mut report = ImportReport::default();

        self.history.begin_group();
        for FileImport { path, outcome } in imports {
            match outcome {
                Ok(segments) => {
                    let ids = segments.iter().map(TrackSegment::id).collect();
                    self.append(segments);
                    report.appended.push((path, ids));
                }
                Err(e) => report.failures.push((path, e)),
            }
        }
        self.history.end_group();

        tracing::info!(
            "Applied import: {} segments from {} files, {} failures",
            report.segment_count(),
            report.appended.len(),
            report.failures.len()
        );
        report
    }

    /// Empty the workspace and forget all history
    pub fn close(&mut self) {
        self.workspace.clear();
        self.history.clear();
    }

    /// Alias of [`Self::close`] for reusing the document
    pub fn reset(&mut self) {
        self.close();
    }

    // --- queries ---

    pub fn closest(&self, point: Point<f64>, tolerance: f64) -> Option<SegmentId> {
        self.workspace.closest(point, tolerance)
    }

    pub fn is_selected(&self, id: SegmentId) -> bool {
        self.workspace.is_selected(id)
    }

    pub fn segment(&self, id: SegmentId) -> Option<&TrackSegment> {
        self.workspace.segment(id)
    }

    pub fn segments(&self) -> impl Iterator<Item = &TrackSegment> {
        self.workspace.segments()
    }

    pub fn selected_ids(&self) -> Vec<SegmentId> {
        self.workspace.selected_ids()
    }

    pub fn info(&self) -> WorkspaceInfo {
        self.workspace.info()
    }

    pub fn bounds_wgs84(&self) -> Option<GeoBounds> {
        self.workspace.bounds_wgs84()
    }

    pub fn center_wgs84(&self) -> Option<(f64, f64)> {
        self.workspace.center_wgs84()
    }

    pub fn style_of(&self, id: SegmentId) -> Option<SegmentStyle> {
        self.workspace.style_of(id)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }
}
