//! Undo/redo stacks of inverse commands

use crate::command::Command;
use crate::workspace::Workspace;
use std::collections::VecDeque;

/// Records the inverses of applied commands
///
/// `applied` holds what undo will run, most recent last; `undone` holds what
/// redo will run. Commands recorded between [`UndoStack::begin_group`] and
/// [`UndoStack::end_group`] are undone as a single step.
#[derive(Debug, Default)]
pub struct UndoStack {
    applied: VecDeque<Command>,
    undone: Vec<Command>,
    open_groups: Vec<Vec<Command>>,
    /// Maximum undo depth, 0 for unlimited
    limit: usize,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl UndoStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a stack keeping at most `limit` undo steps (0 for unlimited)
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    /// Record the inverse of a command that was just applied
    ///
    /// No-op inverses are ignored and leave the redo stack intact.
    pub fn record(&mut self, inverse: Command) {
        if inverse.is_noop() {
            return;
        }
        self.undone.clear();

        match self.open_groups.last_mut() {
            Some(group) => group.push(inverse),
            None => self.push_applied(inverse),
        }
    }

    /// Start collecting recorded inverses into one undo step
    pub fn begin_group(&mut self) {
        self.open_groups.push(Vec::new());
    }

    /// Close the innermost group; an empty group records nothing
    pub fn end_group(&mut self) {
        let Some(mut inverses) = self.open_groups.pop() else {
            tracing::warn!("end_group called without a matching begin_group");
            return;
        };
        inverses.reverse();
        self.record(Command::Group(inverses));
    }

    /// Undo the most recent step, returning whether anything happened
    ///
    /// Any group still open is closed first.
    pub fn undo(&mut self, workspace: &mut Workspace) -> bool {
        self.close_open_groups();
        let Some(inverse) = self.applied.pop_back() else {
            return false;
        };
        let redo = inverse.apply(workspace);
        tracing::debug!("Undo applied, {} steps left", self.applied.len());
        self.undone.push(redo);
        true
    }

    /// Redo the most recently undone step, returning whether anything happened
    pub fn redo(&mut self, workspace: &mut Workspace) -> bool {
        self.close_open_groups();
        let Some(command) = self.undone.pop() else {
            return false;
        };
        let inverse = command.apply(workspace);
        tracing::debug!("Redo applied, {} steps left", self.undone.len());
        self.push_applied(inverse);
        true
    }

    #[inline]
    pub fn can_undo(&self) -> bool {
        !self.applied.is_empty()
    }

    #[inline]
    pub fn can_redo(&self) -> bool {
        !self.undone.is_empty()
    }

    #[inline]
    pub fn undo_depth(&self) -> usize {
        self.applied.len()
    }

    #[inline]
    pub fn redo_depth(&self) -> usize {
        self.undone.len()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Forget all history
    pub fn clear(&mut self) {
        self.applied.clear();
        self.undone.clear();
        self.open_groups.clear();
    }

    fn push_applied(&mut self, inverse: Command) {
        self.applied.push_back(inverse);
        if self.limit > 0 && self.applied.len() > self.limit {
            self.applied.pop_front();
            tracing::trace!("Undo limit {} reached, dropped oldest step", self.limit);
        }
    }

    fn close_open_groups(&mut self) {
        while !self.open_groups.is_empty() {
            self.end_group();
        }
    }
}
