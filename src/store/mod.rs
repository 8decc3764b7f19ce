// src/store/mod.rs

//! Durable record of which cells are solved.
//!
//! The solver writes two artifacts per cell under a store root:
//!
//! ```text
//! <root>/scores/<a>_<b>_<t>.dat
//! <root>/strats/<a>_<b>_<t>.dat
//! ```
//!
//! Presence of the scores artifact *is* the completion marker. Nothing in
//! this crate keeps a separate in-memory "done" flag, so a restarted
//! scheduler resumes from whatever is on disk.

use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::dag::Cell;
use crate::fs::FileSystem;

pub const SCORES_DIR: &str = "scores";
pub const STRATS_DIR: &str = "strats";
pub const ARTIFACT_EXT: &str = "dat";

/// The two artifacts a solver run produces for a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Scores,
    Strats,
}

impl ArtifactKind {
    pub fn dir_name(&self) -> &'static str {
        match self {
            ArtifactKind::Scores => SCORES_DIR,
            ArtifactKind::Strats => STRATS_DIR,
        }
    }
}

/// Path of an artifact relative to a store root.
pub fn relative_artifact_path(kind: ArtifactKind, cell: Cell) -> PathBuf {
    PathBuf::from(kind.dir_name()).join(format!("{}.{}", cell.artifact_stem(), ARTIFACT_EXT))
}

/// Query side of the store: has this cell been solved?
///
/// Implementations must answer from durable state on every call; answers
/// may flip from `false` to `true` between calls but never back.
pub trait CompletionStore: Send + Sync + Debug {
    fn is_done(&self, cell: Cell) -> bool;
}

/// Filesystem-backed artifact store.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(fs: Arc<dyn FileSystem>, root: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            root: root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn fs(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    pub fn artifact_path(&self, kind: ArtifactKind, cell: Cell) -> PathBuf {
        self.root.join(relative_artifact_path(kind, cell))
    }

    pub fn scores_path(&self, cell: Cell) -> PathBuf {
        self.artifact_path(ArtifactKind::Scores, cell)
    }

    pub fn strats_path(&self, cell: Cell) -> PathBuf {
        self.artifact_path(ArtifactKind::Strats, cell)
    }

    /// Staging path used while an artifact is being pulled; renamed onto
    /// [`ArtifactStore::artifact_path`] once complete.
    pub fn staging_path(&self, kind: ArtifactKind, cell: Cell) -> PathBuf {
        let mut p = self.artifact_path(kind, cell).into_os_string();
        p.push(".part");
        PathBuf::from(p)
    }

    /// Make sure `scores/` and `strats/` exist under the root.
    pub fn ensure_layout(&self) -> anyhow::Result<()> {
        self.fs.create_dir_all(&self.root.join(SCORES_DIR))?;
        self.fs.create_dir_all(&self.root.join(STRATS_DIR))?;
        Ok(())
    }

    /// Move a fully transferred staging file into its final place.
    pub fn publish(&self, kind: ArtifactKind, cell: Cell) -> anyhow::Result<()> {
        self.fs
            .rename(&self.staging_path(kind, cell), &self.artifact_path(kind, cell))
    }

    /// Drop a partial transfer so it cannot be mistaken for a result later.
    pub fn discard_staging(&self, kind: ArtifactKind, cell: Cell) -> anyhow::Result<()> {
        self.fs.remove_file(&self.staging_path(kind, cell))
    }
}

impl CompletionStore for ArtifactStore {
    fn is_done(&self, cell: Cell) -> bool {
        self.fs.is_file(&self.scores_path(cell))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::GridBounds;
    use crate::fs::mock::MockFileSystem;

    fn store() -> (MockFileSystem, ArtifactStore) {
        let fs = MockFileSystem::new();
        let store = ArtifactStore::new(Arc::new(fs.clone()), "/cache/6x");
        (fs, store)
    }

    #[test]
    fn layout_matches_solver_naming() {
        let (_fs, store) = store();
        let c = GridBounds::default().cell(2, 13, 30).unwrap();
        assert_eq!(store.scores_path(c), PathBuf::from("/cache/6x/scores/2_13_30.dat"));
        assert_eq!(store.strats_path(c), PathBuf::from("/cache/6x/strats/2_13_30.dat"));
        assert_eq!(
            store.staging_path(ArtifactKind::Scores, c),
            PathBuf::from("/cache/6x/scores/2_13_30.dat.part")
        );
    }

    #[test]
    fn only_scores_artifact_marks_done() {
        let (fs, store) = store();
        let c = GridBounds::default().cell(0, 0, 0).unwrap();
        assert!(!store.is_done(c));

        fs.add_file(store.strats_path(c), b"s".to_vec());
        assert!(!store.is_done(c));

        fs.add_file(store.staging_path(ArtifactKind::Scores, c), b"partial".to_vec());
        assert!(!store.is_done(c));

        store.publish(ArtifactKind::Scores, c).unwrap();
        assert!(store.is_done(c));
    }
}
