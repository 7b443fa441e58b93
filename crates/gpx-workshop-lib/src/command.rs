//! Invertible workspace commands
//!
//! Applying a command consumes it and returns its exact inverse, built from
//! the state that actually changed. Segments travel inside the commands that
//! can restore them, so each segment lives in exactly one place: the
//! workspace or a command on the undo/redo stacks.

use crate::segment::{SegmentId, TrackSegment};
use crate::workspace::Workspace;

/// A single undoable change to a [`Workspace`]
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Add segments not yet present
    Append(Vec<TrackSegment>),
    /// Remove present segments, dropping them from the selection
    Delete(Vec<SegmentId>),
    /// Put removed segments back at their former index
    Restore(Vec<(usize, TrackSegment)>),
    /// Select a present, unselected segment
    Select(SegmentId),
    /// Deselect a selected segment
    Deselect(SegmentId),
    /// Replace the selection with the given ids that are present
    SelectAll(Vec<SegmentId>),
    /// Clear the selection
    DeselectAll,
    /// Add the segments not yet present, then select exactly the given segments
    InsertSelected(Vec<TrackSegment>),
    /// Remove every selected segment, then select `restore` where present
    ///
    /// With nothing selected and an empty `restore` this changes nothing.
    DeleteSelected { restore: Vec<SegmentId> },
    /// Apply in order; the inverse undoes in reverse order
    Group(Vec<Command>),
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Command {
    /// The command that changes nothing
    pub fn noop() -> Self {
        Command::Group(Vec::new())
    }

    /// Whether applying this command would leave every workspace untouched
    pub fn is_noop(&self) -> bool {
        match self {
            Command::Group(commands) => commands.iter().all(Command::is_noop),
            _ => false,
        }
    }

    /// Apply to `workspace` and return the inverse
    ///
    /// A command whose precondition fails entirely returns [`Command::noop`].
    /// Partial preconditions apply to the valid subset only.
    pub fn apply(self, workspace: &mut Workspace) -> Command {
        match self {
            Command::Append(segments) => {
                let added = workspace.insert_segments(segments);
                if added.is_empty() {
                    Command::noop()
                } else {
                    Command::Delete(added)
                }
            }
            Command::Delete(ids) => {
                let (removed, was_selected) = workspace.remove_segments(&ids);
                if removed.is_empty() {
                    Command::noop()
                } else if was_selected.is_empty() {
                    Command::Restore(removed)
                } else {
                    let mut restore = Vec::with_capacity(was_selected.len() + 1);
                    restore.push(Command::Restore(removed));
                    restore.extend(was_selected.into_iter().map(Command::Select));
                    Command::Group(restore)
                }
            }
            Command::Restore(items) => {
                let restored = workspace.restore_segments(items);
                if restored.is_empty() {
                    Command::noop()
                } else {
                    Command::Delete(restored)
                }
            }
            Command::Select(id) => {
                if workspace.select_ids(&[id]).is_empty() {
                    Command::noop()
                } else {
                    Command::Deselect(id)
                }
            }
            Command::Deselect(id) => {
                if workspace.deselect_ids(&[id]).is_empty() {
                    Command::noop()
                } else {
                    Command::Select(id)
                }
            }
            Command::SelectAll(ids) => Command::SelectAll(workspace.replace_selection(&ids)),
            Command::DeselectAll => Command::SelectAll(workspace.replace_selection(&[])),
            Command::InsertSelected(segments) => {
                // Present segments stay where they are but still join the selection
                let ids: Vec<SegmentId> = segments.iter().map(TrackSegment::id).collect();
                Command::Group(vec![Command::Append(segments), Command::SelectAll(ids)])
                    .apply(workspace)
            }
            Command::DeleteSelected { restore } => {
                let selected = workspace.selected_ids();
                if selected.is_empty() {
                    return if restore.is_empty() {
                        Command::noop()
                    } else {
                        Command::SelectAll(workspace.replace_selection(&restore))
                    };
                }
                let (removed, _) = workspace.remove_segments(&selected);
                workspace.replace_selection(&restore);
                // Reinsert in place, then reselect exactly the removed segments
                Command::Group(vec![
                    Command::Restore(removed),
                    Command::SelectAll(selected),
                ])
            }
            Command::Group(commands) => {
                let mut inverses: Vec<Command> = commands
                    .into_iter()
                    .map(|command| command.apply(workspace))
                    .filter(|inverse| !inverse.is_noop())
                    .collect();
                inverses.reverse();
                Command::Group(inverses)
            }
        }
    }
}
