//! Change notifications and stroke styles for a rendering collaborator

use crate::segment::SegmentId;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single mutation of workspace state, reported after it happened
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum WorkspaceChange {
    Added(Vec<SegmentId>),
    Removed(Vec<SegmentId>),
    Selected(Vec<SegmentId>),
    Deselected(Vec<SegmentId>),
}

impl WorkspaceChange {
    pub fn ids(&self) -> &[SegmentId] {
        match self {
            Self::Added(ids) | Self::Removed(ids) | Self::Selected(ids) | Self::Deselected(ids) => {
                ids
            }
        }
    }
}

/// Receives every workspace change, e.g. to restyle or drop map overlays
pub trait WorkspaceObserver {
    fn on_change(&mut self, change: &WorkspaceChange);
}

impl<F> WorkspaceObserver for F
where
    F: FnMut(&WorkspaceChange),
{
    fn on_change(&mut self, change: &WorkspaceChange) {
        self(change)
    }
}

/// Stroke used to draw a segment
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SegmentStyle {
    /// RGBA
    pub color: [u8; 4],
    pub line_width: f32,
}

impl SegmentStyle {
    pub const SELECTED_COLOR: [u8; 4] = [255, 0, 0, 255];
    pub const UNSELECTED_COLOR: [u8; 4] = [0, 0, 255, 255];
    pub const LINE_WIDTH: f32 = 3.0;

    pub fn for_selection(selected: bool) -> Self {
        Self {
            color: if selected {
                Self::SELECTED_COLOR
            } else {
                Self::UNSELECTED_COLOR
            },
            line_width: Self::LINE_WIDTH,
        }
    }
}
