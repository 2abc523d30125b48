//! Output directory management
//!
//! Prepares the output directory before a pipeline run: creates it on first
//! use, reclaims debug-symbol artifacts left by earlier runs, and optionally
//! clears every prior output. Deletion failures are never fatal; a file still
//! held open by a debugger is skipped and reclaimed on a later run.

use crate::error::{BuildError, BuildResult};
use crate::reload::LOCK_FILE_NAME;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Extension of debug-symbol artifacts
pub const SYMBOL_EXTENSION: &str = "pdb";

/// Why an entry could not be deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalFailureKind {
    /// Permission denied, or the file is held open by another process
    PermissionOrInUse,
    /// Anything else
    Other,
}

impl RemovalFailureKind {
    /// Classify an I/O error
    pub fn classify(error: &io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::PermissionDenied => Self::PermissionOrInUse,
            // ERROR_SHARING_VIOLATION (32) and ERROR_LOCK_VIOLATION (33) have no dedicated kind
            _ if cfg!(windows) && matches!(error.raw_os_error(), Some(32 | 33)) => {
                Self::PermissionOrInUse
            }
            _ => Self::Other,
        }
    }
}

/// An entry that survived a deletion attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalFailure {
    pub path: PathBuf,
    pub kind: RemovalFailureKind,
    pub message: String,
}

/// What `prepare` did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrepareReport {
    /// The output directory did not exist and was created
    pub created: bool,
    /// Entries deleted
    pub removed: Vec<PathBuf>,
    /// Entries that could not be deleted
    pub skipped: Vec<RemovalFailure>,
    /// A reload lock from an interrupted run was found
    pub stale_lock: bool,
}

/// Deletes one directory entry
pub type Remover = Box<dyn Fn(&Path) -> io::Result<()>>;

/// Output directory owner
pub struct Workspace {
    output_dir: PathBuf,
    symbol_prefix: String,
    remover: Remover,
}

impl Workspace {
    /// Create a workspace for `output_dir`; `symbol_prefix` names the module's symbol artifacts
    pub fn new(output_dir: impl Into<PathBuf>, symbol_prefix: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            symbol_prefix: symbol_prefix.into(),
            remover: Box::new(remove_entry),
        }
    }

    /// Replace the function used to delete entries
    pub fn with_remover(mut self, remover: impl Fn(&Path) -> io::Result<()> + 'static) -> Self {
        self.remover = Box::new(remover);
        self
    }

    /// Output directory
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Prepare the output directory for a run
    ///
    /// With `clean`, every existing entry is removed; otherwise only stale
    /// symbol artifacts are. A reload lock left by an interrupted run is
    /// reclaimed either way.
    pub fn prepare(&self, clean: bool) -> BuildResult<PrepareReport> {
        let mut report = PrepareReport::default();

        if !self.output_dir.exists() {
            fs::create_dir_all(&self.output_dir)
                .map_err(|e| BuildError::workspace(&self.output_dir, e))?;
            debug!(dir = %self.output_dir.display(), "created output directory");
            report.created = true;
            return Ok(report);
        }

        if !self.output_dir.is_dir() {
            return Err(BuildError::workspace(
                &self.output_dir,
                io::Error::new(io::ErrorKind::AlreadyExists, "not a directory"),
            ));
        }

        let lock_path = self.output_dir.join(LOCK_FILE_NAME);
        if lock_path.exists() {
            warn!(
                path = %lock_path.display(),
                "reload lock left by an interrupted build, reclaiming it"
            );
            report.stale_lock = true;
            self.remove_into(&lock_path, &mut report, false);
        }

        for path in self.entries()? {
            if path == lock_path {
                continue;
            }
            if clean {
                self.remove_into(&path, &mut report, true);
            } else if self.is_stale_symbol_artifact(&path) {
                self.remove_into(&path, &mut report, false);
            }
        }

        Ok(report)
    }

    /// Check if `path` is a symbol artifact of the module
    ///
    /// Matches `<prefix>*.pdb`, ignoring case.
    pub fn is_stale_symbol_artifact(&self, path: &Path) -> bool {
        if !path.is_file() {
            return false;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        let name = name.to_lowercase();
        name.starts_with(&self.symbol_prefix.to_lowercase())
            && name.ends_with(&format!(".{}", SYMBOL_EXTENSION))
    }

    /// Top-level entries of the output directory
    fn entries(&self) -> BuildResult<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in WalkDir::new(&self.output_dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| {
                let path = e
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| self.output_dir.clone());
                BuildError::workspace(path, io::Error::other(e.to_string()))
            })?;
            entries.push(entry.into_path());
        }
        Ok(entries)
    }

    fn remove_into(&self, path: &Path, report: &mut PrepareReport, loud: bool) {
        match (self.remover)(path) {
            Ok(()) => report.removed.push(path.to_path_buf()),
            Err(error) => {
                let failure = RemovalFailure {
                    path: path.to_path_buf(),
                    kind: RemovalFailureKind::classify(&error),
                    message: error.to_string(),
                };
                if loud {
                    warn!(path = %path.display(), error = %error, "could not remove entry");
                } else {
                    debug!(path = %path.display(), error = %error, "could not remove entry (probably in use)");
                }
                report.skipped.push(failure);
            }
        }
    }
}

/// Default remover: files are unlinked, directories removed recursively
fn remove_entry(path: &Path) -> io::Result<()> {
    let metadata = fs::symlink_metadata(path)?;
    if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}
