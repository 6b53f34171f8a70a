//! Where generated files go.
//!
//! All paths are fixed relative to one output root. Writes replace the whole
//! file; parent directories are created on demand.

use crate::types::ArtifactRole;
use std::path::{Path, PathBuf};
use verbforge_model::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    root: PathBuf,
}

impl Default for OutputLayout {
    fn default() -> Self {
        Self::new(".")
    }
}

impl OutputLayout {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn conjugator_dir(&self) -> PathBuf {
        self.root.join("generated").join("conjugator")
    }

    pub fn tests_dir(&self) -> PathBuf {
        self.root.join("generated").join("tests")
    }

    pub fn usage_report_path(&self) -> PathBuf {
        self.root.join("usage_report.json")
    }

    pub fn path_for(&self, role: ArtifactRole) -> PathBuf {
        match role {
            ArtifactRole::Conjugator | ArtifactRole::Ui => self.conjugator_dir().join(role.filename()),
            ArtifactRole::Tests => self.tests_dir().join(role.filename()),
        }
    }

    /// Overwrite `path` with `content`
    pub fn write(&self, path: &Path, content: &str) -> Result<()> {
        write_file(path, content)
    }

    pub fn read(&self, path: &Path) -> Result<String> {
        std::fs::read_to_string(path).map_err(|e| {
            Error::from(e)
                .with_operation("layout::read")
                .with_context("path", path.display().to_string())
        })
    }
}

/// Replace `path` with `content`, creating parent directories first.
///
/// Errors name the path that could not be created or written.
pub(crate) fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            Error::from(e)
                .with_operation("layout::write")
                .with_context("path", parent.display().to_string())
        })?;
    }
    std::fs::write(path, content).map_err(|e| {
        Error::from(e)
            .with_operation("layout::write")
            .with_context("path", path.display().to_string())
    })?;
    tracing::debug!(path = %path.display(), bytes = content.len(), "wrote file");
    Ok(())
}
