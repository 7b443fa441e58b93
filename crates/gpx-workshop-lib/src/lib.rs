//! GPX Workshop Library - Parsing, Hit Testing and Undoable Editing of GPS Tracks
//!
//! This library turns GPX files into track segments, finds the segment under a
//! click on a Web Mercator map, and manages a document whose segments can be
//! appended, deleted and selected with full undo/redo.
//!
//! # Architecture
//!
//! - **[`xml::parse`]**: Generic element tree with line-accurate errors
//! - **[`builder::build`]**: Track segments from a parsed GPX tree
//! - **[`spatial::closest`]**: Nearest segment within a tolerance
//! - **[`Command`]** / **[`UndoStack`]**: Invertible edits and their history
//! - **[`Document`]**: Owner of the [`Workspace`], the only place mutation happens
//! - **[`import`]**: Parallel and cancellable multi-file loading
//!
//! # Example
//! ```ignore
//! let mut document = Document::new(Config::default());
//! document.import_bytes(&std::fs::read("ride.gpx")?)?;
//! let hit = document.select_at_screen(&viewport, (320.0, 240.0));
//! document.undo();
//! ```

pub mod builder;
mod command;
mod document;
mod history;
pub mod import;
mod observer;
mod segment;
pub mod spatial;
pub mod utils;
mod workspace;
pub mod xml;

// Public API exports
pub use command::Command;
pub use document::{Config, Document, ImportReport};
pub use history::UndoStack;
pub use hit_test::{HitQuery, Viewport};
pub use import::{FileImport, ImportHandle, ImportStatus, import_files, spawn_import};
pub use observer::{SegmentStyle, WorkspaceChange, WorkspaceObserver};
pub use segment::{GeoBounds, GeoPoint, SegmentId, TrackSegment};
pub use workspace::{Workspace, WorkspaceInfo};
pub use xml::{Node, ParseError};

use std::path::PathBuf;

/// Error types for the library
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("GPX parsing error: {0}")]
    Parse(#[from] ParseError),

    #[error("Cannot read {}: {source}", path.display())]
    UnreadableSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Empty segment")]
    EmptySegment,
}

pub type Result<T> = std::result::Result<T, DataError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_exports() {
        // Verify that all public types are accessible
        let _: fn(Config) -> Document = Document::new;
        let _: fn() -> Config = Config::default;
        let _: fn(&[u8]) -> std::result::Result<Node, ParseError> = xml::parse;
    }

    #[test]
    fn test_error_messages() {
        let parse: DataError = ParseError::EmptyContent.into();
        assert!(parse.to_string().starts_with("GPX parsing error"));

        let unreadable = DataError::UnreadableSource {
            path: PathBuf::from("/nowhere/ride.gpx"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert_eq!(unreadable.to_string(), "Cannot read /nowhere/ride.gpx: gone");
    }
}
