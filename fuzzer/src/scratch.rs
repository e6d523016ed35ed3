use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tlafuzz_graph::TestCase;

use crate::error::FuzzError;

/// A fresh directory owned by one trial. Removed on [`TrialDir::discard`]
/// (or drop) unless [`TrialDir::keep`] is called first.
#[derive(Debug)]
pub struct TrialDir {
    dir: TempDir,
}

impl TrialDir {
    pub fn create(root: Option<&Path>, case: &TestCase, trial: u32) -> Result<Self, FuzzError> {
        let fingerprint = case.fingerprint();
        let prefix = format!(
            "tlafuzz-{}-{:04}-{}-",
            case.variant.label(),
            trial,
            &fingerprint[..12]
        );
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix);
        let dir = match root {
            Some(root) => {
                std::fs::create_dir_all(root).map_err(FuzzError::Scratch)?;
                builder.tempdir_in(root)
            }
            None => builder.tempdir(),
        }
        .map_err(FuzzError::Scratch)?;
        Ok(TrialDir { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Subdirectory handed to one strategy.
    pub fn strategy_dir(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Persist the directory and return its path.
    pub fn keep(self) -> PathBuf {
        self.dir.keep()
    }

    pub fn discard(self) {
        let path = self.dir.path().to_path_buf();
        if let Err(e) = self.dir.close() {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove scratch directory");
        }
    }
}
