//! Per-invocation scratch storage.
//!
//! Each invocation gets its own temporary directory holding a `source` and a
//! `target` slot. The directory is removed when the `ScratchSpace` is
//! dropped, whichever stage the invocation ended in.

use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

pub struct ScratchSpace {
    dir: TempDir,
    source: PathBuf,
    target: PathBuf,
}

impl ScratchSpace {
    /// Create a fresh, uniquely named scratch directory under `parent`.
    pub fn create_in(parent: &Path) -> io::Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("edge-image-")
            .tempdir_in(parent)?;
        let source = dir.path().join("source");
        let target = dir.path().join("target");
        Ok(Self { dir, source, target })
    }

    /// Where the origin body is written.
    pub fn source_path(&self) -> &Path {
        &self.source
    }

    /// Where the transformer writes its output.
    pub fn target_path(&self) -> &Path {
        &self.target
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }
}

impl std::fmt::Debug for ScratchSpace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScratchSpace").field("root", &self.root()).finish()
    }
}
