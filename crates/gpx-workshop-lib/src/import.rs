//! Multi-file GPX import off the document's mutation path
//!
//! Files are read, parsed and built in parallel with rayon. The results are
//! plain values: nothing touches a workspace until the document owner hands
//! them to [`Document::apply_import`](crate::Document::apply_import).

use crate::builder::build_from_bytes;
use crate::segment::TrackSegment;
use crate::{DataError, Result};

use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;
use tokio_util::sync::CancellationToken;

/// Outcome of importing one file
#[derive(Debug)]
pub struct FileImport {
    pub path: PathBuf,
    pub outcome: Result<Vec<TrackSegment>>,
}

/// Read, parse and build a single GPX file
pub fn import_file(path: &Path) -> Result<Vec<TrackSegment>> {
    let bytes = std::fs::read(path).map_err(|source| DataError::UnreadableSource {
        path: path.to_path_buf(),
        source,
    })?;
    build_from_bytes(&bytes)
}

/// Import files in parallel, one outcome per path in input order
///
/// A failing file never aborts its siblings.
pub fn import_files<P: AsRef<Path> + Send + Sync>(paths: Vec<P>) -> Vec<FileImport> {
    #[cfg(feature = "profiling")]
    profiling::scope!("import::import_files");

    tracing::info!("Importing {} files", paths.len());
    paths
        .into_par_iter()
        .map(|path| load(path.as_ref()))
        .collect()
}

/// Start importing `paths` on tokio's blocking pool
///
/// # Panics
/// Panics when called outside a tokio runtime.
pub fn spawn_import(paths: Vec<PathBuf>) -> ImportHandle {
    let cancel = CancellationToken::new();
    let (sender, receiver) = oneshot::channel();
    let token = cancel.clone();

    tokio::task::spawn_blocking(move || {
        #[cfg(feature = "profiling")]
        profiling::scope!("import::spawn_import");

        let count = paths.len();
        let imports: Option<Vec<FileImport>> = paths
            .into_par_iter()
            .map(|path| (!token.is_cancelled()).then(|| load(&path)))
            .collect();

        match imports {
            Some(imports) if !token.is_cancelled() => {
                tracing::info!("Background import of {} files finished", count);
                // The receiver may already be gone; nobody is left to tell
                let _ = sender.send(imports);
            }
            _ => tracing::info!("Background import of {} files cancelled", count),
        }
    });

    ImportHandle {
        cancel,
        receiver: Some(receiver),
    }
}

fn load(path: &Path) -> FileImport {
    let outcome = import_file(path);
    match &outcome {
        Ok(segments) => {
            tracing::debug!("Imported {} segments from {}", segments.len(), path.display())
        }
        Err(e) => tracing::warn!("Failed to import {}: {}", path.display(), e),
    }
    FileImport {
        path: path.to_path_buf(),
        outcome,
    }
}

/// State of a background import
#[derive(Debug)]
pub enum ImportStatus {
    /// Still running
    Pending,
    /// Cancelled, or the worker stopped without producing results
    Cancelled,
    /// Results, handed out exactly once
    Finished(Vec<FileImport>),
    /// Results were already returned by an earlier poll
    Delivered,
}

/// Handle to an import started with [`spawn_import`]
///
/// A cancelled handle never yields results.
#[derive(Debug)]
pub struct ImportHandle {
    cancel: CancellationToken,
    receiver: Option<oneshot::Receiver<Vec<FileImport>>>,
}

impl ImportHandle {
    /// Stop the import; files not yet started are skipped
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Check for results without blocking, e.g. once per frame
    pub fn poll(&mut self) -> ImportStatus {
        if self.cancel.is_cancelled() {
            self.receiver = None;
            return ImportStatus::Cancelled;
        }
        let Some(receiver) = self.receiver.as_mut() else {
            return ImportStatus::Delivered;
        };
        match receiver.try_recv() {
            Ok(imports) => {
                self.receiver = None;
                ImportStatus::Finished(imports)
            }
            Err(TryRecvError::Empty) => ImportStatus::Pending,
            Err(TryRecvError::Closed) => {
                self.receiver = None;
                ImportStatus::Cancelled
            }
        }
    }

    /// Wait for the results; `None` if cancelled first
    pub async fn wait(self) -> Option<Vec<FileImport>> {
        let receiver = self.receiver?;
        tokio::select! {
            biased;

            _ = self.cancel.cancelled() => None,
            result = receiver => result.ok().filter(|_| !self.cancel.is_cancelled()),
        }
    }
}
