//! Best-effort removal of request-scoped files.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Removes every path in `paths`, returning how many were deleted.
///
/// Missing files are skipped quietly; other failures are logged and never
/// returned.
///
/// Removal is synchronous even on a runtime worker: this runs from `Drop`,
/// which cannot await, and callers rely on the files being gone once the
/// owning [`ArtifactSet`] has been dropped. Each call is a single unlink.
pub fn cleanup(paths: &[PathBuf]) -> usize {
    let mut removed = 0;
    for path in paths {
        match std::fs::remove_file(path) {
            Ok(()) => removed += 1,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "Artifact already gone");
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to remove artifact");
            }
        }
    }
    removed
}

/// Files created on behalf of one request.
///
/// Paths are tracked as soon as they are created (or about to be created by
/// an external process). Whatever is still tracked when the set is dropped is
/// removed, so success, handled errors and unwinding all clean up the same
/// way.
#[derive(Debug, Default)]
pub struct ArtifactSet {
    paths: Vec<PathBuf>,
}

impl ArtifactSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking `path`.
    pub fn track(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if !self.paths.contains(&path) {
            self.paths.push(path);
        }
    }

    /// Stops tracking `path` so it outlives the set. Returns whether it was
    /// tracked.
    pub fn persist(&mut self, path: &Path) -> bool {
        let before = self.paths.len();
        self.paths.retain(|p| p != path);
        self.paths.len() != before
    }

    /// Currently tracked paths, in creation order.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Removes everything now instead of at drop. Returns how many files
    /// were deleted.
    pub fn release(mut self) -> usize {
        let paths = std::mem::take(&mut self.paths);
        cleanup(&paths)
    }
}

impl Drop for ArtifactSet {
    fn drop(&mut self) {
        if !self.paths.is_empty() {
            let removed = cleanup(&self.paths);
            debug!(removed, tracked = self.paths.len(), "Artifacts cleaned up");
        }
    }
}
