//! Output writer with dry-run support.
//!
//! Every file the generator produces goes through [`OutputWriter`], which
//! enforces the ownership rules: generated files may only replace files that
//! carry the generated marker, scaffolds are written once and never again.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::clean::{
    dir_marker_contents, dir_marker_origin, is_generated_file, spec_origin, DIR_MARKER,
    GENERATED_MARKER,
};
use crate::error::{GenError, Result};

/// What happened to one output path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Generated content written (or would be, in a dry run).
    Written(PathBuf),
    /// An existing file without the generated marker was left alone.
    SkippedUserFile(PathBuf),
    /// A user-owned scaffold was created.
    Scaffolded(PathBuf),
    /// The scaffold target already exists; nothing written.
    ScaffoldKept(PathBuf),
}

impl WriteOutcome {
    pub fn path(&self) -> &Path {
        match self {
            WriteOutcome::Written(p)
            | WriteOutcome::SkippedUserFile(p)
            | WriteOutcome::Scaffolded(p)
            | WriteOutcome::ScaffoldKept(p) => p,
        }
    }
}

/// Writes generated output, recording every outcome.
#[derive(Debug, Default)]
pub struct OutputWriter {
    dry_run: bool,
    outcomes: Vec<WriteOutcome>,
}

impl OutputWriter {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            outcomes: Vec::new(),
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Outcomes in write order.
    pub fn outcomes(&self) -> &[WriteOutcome] {
        &self.outcomes
    }

    pub fn into_outcomes(self) -> Vec<WriteOutcome> {
        self.outcomes
    }

    /// Write generator-owned content to `path`.
    ///
    /// An existing file that lacks the generated marker is never replaced.
    ///
    /// # Errors
    ///
    /// Returns `Filesystem` if the parent directory or file cannot be written.
    pub fn write_generated(&mut self, path: &Path, content: &str) -> Result<()> {
        if path.exists() && !is_generated_file(path) {
            warn!(path = %path.display(), "not overwriting file without generated marker");
            self.outcomes
                .push(WriteOutcome::SkippedUserFile(path.to_path_buf()));
            return Ok(());
        }
        self.put(path, content)?;
        debug!(path = %path.display(), bytes = content.len(), "generated");
        self.outcomes.push(WriteOutcome::Written(path.to_path_buf()));
        Ok(())
    }

    /// Write a user-owned scaffold if nothing exists at `path` yet.
    pub fn write_scaffold(&mut self, path: &Path, content: &str) -> Result<()> {
        if path.exists() {
            debug!(path = %path.display(), "scaffold already present");
            self.outcomes
                .push(WriteOutcome::ScaffoldKept(path.to_path_buf()));
            return Ok(());
        }
        self.put(path, content)?;
        debug!(path = %path.display(), "scaffolded");
        self.outcomes
            .push(WriteOutcome::Scaffolded(path.to_path_buf()));
        Ok(())
    }

    /// Make `dir` a Python package: create it and a marker-stamped
    /// `__init__.py` unless one already exists.
    pub fn ensure_package(&mut self, dir: &Path) -> Result<()> {
        let init = dir.join("__init__.py");
        if init.exists() {
            return Ok(());
        }
        self.write_generated(&init, &format!("{GENERATED_MARKER}\n"))
    }

    /// Stamp `dir` as generator-owned for the spec at `spec_path`.
    ///
    /// A directory already stamped by another spec keeps its owner.
    pub fn mark_dir(&mut self, dir: &Path, spec_path: &Path) -> Result<()> {
        let origin = spec_origin(spec_path);
        if let Some(owner) = dir_marker_origin(dir) {
            if owner != origin {
                warn!(
                    dir = %dir.display(),
                    owner = %owner,
                    spec = %origin,
                    "directory owned by another spec, keeping its marker"
                );
                return Ok(());
            }
        }
        let marker = dir.join(DIR_MARKER);
        self.put(&marker, &dir_marker_contents(spec_path))?;
        self.outcomes.push(WriteOutcome::Written(marker));
        Ok(())
    }

    fn put(&self, path: &Path, content: &str) -> Result<()> {
        if self.dry_run {
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| GenError::fs(parent, e))?;
            }
        }
        fs::write(path, content).map_err(|e| GenError::fs(path, e))
    }
}
