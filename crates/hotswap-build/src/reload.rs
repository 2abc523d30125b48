//! Hot-reload coordination
//!
//! While the module is being rewritten, a lock artifact sits in the output
//! directory; the running host polls for it and defers loading until it is
//! gone. Each module build also links against a freshly named debug-symbol
//! file so the host's debugger can keep the previous one mapped.

use crate::error::{BuildError, BuildResult};
use crate::workspace::SYMBOL_EXTENSION;
use rand::RngExt;
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// File name of the reload lock artifact
pub const LOCK_FILE_NAME: &str = "dll.lock";

/// Largest symbol token drawn
pub const MAX_SYMBOL_TOKEN: u32 = 100_000;

/// Marker telling the host not to load the module
///
/// Removed when released or dropped, whichever comes first.
#[derive(Debug)]
pub struct ReloadLock {
    path: PathBuf,
    released: bool,
}

impl ReloadLock {
    /// Create the lock artifact in `dir` (create-if-absent)
    pub fn acquire(dir: &Path) -> BuildResult<Self> {
        let path = dir.join(LOCK_FILE_NAME);
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|error| BuildError::LockCreation {
                path: path.clone(),
                error,
            })?;
        debug!(path = %path.display(), "reload lock acquired");
        Ok(Self {
            path,
            released: false,
        })
    }

    /// Remove the lock artifact
    pub fn release(mut self) -> BuildResult<()> {
        self.remove()
    }

    fn remove(&mut self) -> BuildResult<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "reload lock released");
                Ok(())
            }
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(BuildError::LockRelease {
                path: self.path.clone(),
                error,
            }),
        }
    }
}

impl Drop for ReloadLock {
    fn drop(&mut self) {
        if let Err(err) = self.remove() {
            warn!("{}", err);
        }
    }
}

/// Per-run debug-symbol file of the module
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SymbolArtifact {
    prefix: String,
    token: u32,
}

impl SymbolArtifact {
    pub fn new(prefix: impl Into<String>, token: u32) -> Self {
        Self {
            prefix: prefix.into(),
            token,
        }
    }

    /// Run token
    pub fn token(&self) -> u32 {
        self.token
    }

    /// File name, `<prefix>_<token>.pdb`
    pub fn file_name(&self) -> String {
        format!("{}_{}.{}", self.prefix, self.token, SYMBOL_EXTENSION)
    }
}

/// Lock and symbol artifact held for the duration of one module compile
#[derive(Debug)]
pub struct ModuleBuildGuard {
    lock: ReloadLock,
    symbols: SymbolArtifact,
}

impl ModuleBuildGuard {
    /// Symbol artifact chosen for this build
    pub fn symbols(&self) -> &SymbolArtifact {
        &self.symbols
    }
}

/// Brackets module compiles with the reload lock
#[derive(Debug)]
pub struct ReloadCoordinator {
    output_dir: PathBuf,
    prefix: String,
    /// Tokens of earlier builds, including artifacts seen before a prepare removed them
    used_tokens: HashSet<u32>,
}

impl ReloadCoordinator {
    /// Create a coordinator for the module named `prefix` in `output_dir`
    pub fn new(output_dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            prefix: prefix.into(),
            used_tokens: HashSet::new(),
        }
    }

    /// Remember the symbol artifacts currently in the output directory
    ///
    /// Called before the directory is prepared, so the artifact of a run in
    /// an earlier process stays excluded even once it has been deleted.
    pub fn record_existing_artifacts(&mut self) {
        let existing = self.taken_tokens();
        if !existing.is_empty() {
            debug!(count = existing.len(), "recorded existing symbol artifacts");
        }
        self.used_tokens.extend(existing);
    }

    /// Acquire the reload lock and pick a fresh symbol artifact
    ///
    /// Fails only when the lock cannot be created; the compile must not run then.
    pub fn begin_module_build(&mut self) -> BuildResult<ModuleBuildGuard> {
        let lock = ReloadLock::acquire(&self.output_dir)?;
        let taken = self.taken_tokens();
        let token = draw_token(&mut rand::rng(), |t| {
            self.used_tokens.contains(&t) || taken.contains(&t)
        });
        self.used_tokens.insert(token);

        let symbols = SymbolArtifact::new(self.prefix.clone(), token);
        debug!(symbols = %symbols.file_name(), "module symbol artifact");
        Ok(ModuleBuildGuard { lock, symbols })
    }

    /// Release the reload lock after the module compile, whatever its outcome
    pub fn end_module_build(&mut self, guard: ModuleBuildGuard) -> BuildResult<()> {
        guard.lock.release()
    }

    /// Tokens of symbol artifacts already present in the output directory
    fn taken_tokens(&self) -> HashSet<u32> {
        let Ok(entries) = fs::read_dir(&self.output_dir) else {
            return HashSet::new();
        };
        let prefix = format!("{}_", self.prefix.to_lowercase());
        let suffix = format!(".{}", SYMBOL_EXTENSION);
        entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().to_str().map(str::to_lowercase))
            .filter_map(|name| {
                name.strip_prefix(&prefix)?
                    .strip_suffix(&suffix)?
                    .parse::<u32>()
                    .ok()
            })
            .collect()
    }
}

/// Draw a token in `0..=MAX_SYMBOL_TOKEN` for which `is_taken` is false
fn draw_token<R: RngExt>(rng: &mut R, is_taken: impl Fn(u32) -> bool) -> u32 {
    loop {
        let token = rng.random_range(0..=MAX_SYMBOL_TOKEN);
        if !is_taken(token) {
            return token;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_lock_lifecycle() {
        let temp = TempDir::new().unwrap();
        let lock_path = temp.path().join(LOCK_FILE_NAME);

        let lock = ReloadLock::acquire(temp.path()).unwrap();
        assert!(lock_path.exists());
        lock.release().unwrap();
        assert!(!lock_path.exists());
    }

    #[test]
    fn test_lock_removed_on_drop() {
        let temp = TempDir::new().unwrap();
        {
            let _lock = ReloadLock::acquire(temp.path()).unwrap();
            assert!(temp.path().join(LOCK_FILE_NAME).exists());
        }
        assert!(!temp.path().join(LOCK_FILE_NAME).exists());
    }

    #[test]
    fn test_existing_lock_is_reused() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(LOCK_FILE_NAME), b"").unwrap();

        let lock = ReloadLock::acquire(temp.path()).unwrap();
        lock.release().unwrap();
        assert!(!temp.path().join(LOCK_FILE_NAME).exists());
    }

    #[test]
    fn test_lock_creation_failure() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("does-not-exist");

        let result = ReloadLock::acquire(&missing);
        assert!(matches!(result, Err(BuildError::LockCreation { .. })));
    }

    #[test]
    fn test_symbol_file_name() {
        assert_eq!(SymbolArtifact::new("robotrider", 42).file_name(), "robotrider_42.pdb");
    }

    #[test]
    fn test_consecutive_builds_use_new_tokens() {
        let temp = TempDir::new().unwrap();
        let mut coordinator = ReloadCoordinator::new(temp.path(), "game");

        let mut previous: Option<String> = None;
        for _ in 0..200 {
            let guard = coordinator.begin_module_build().unwrap();
            let name = guard.symbols().file_name();
            assert_ne!(previous.as_deref(), Some(name.as_str()));
            previous = Some(name);
            coordinator.end_module_build(guard).unwrap();
        }
    }

    #[test]
    fn test_token_avoids_existing_artifacts() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("GAME_7.pdb"), b"").unwrap();
        let coordinator = ReloadCoordinator::new(temp.path(), "game");
        assert!(coordinator.taken_tokens().contains(&7));
    }

    #[test]
    fn test_recorded_artifacts_stay_excluded_after_removal() {
        let temp = TempDir::new().unwrap();
        let previous = temp.path().join("game_3.pdb");
        fs::write(&previous, b"").unwrap();

        let mut coordinator = ReloadCoordinator::new(temp.path(), "game");
        coordinator.record_existing_artifacts();
        fs::remove_file(&previous).unwrap();

        assert!(coordinator.used_tokens.contains(&3));
        let guard = coordinator.begin_module_build().unwrap();
        assert_ne!(guard.symbols().token(), 3);
        coordinator.end_module_build(guard).unwrap();
    }

    #[test]
    fn test_draw_token_skips_taken() {
        let mut rng = rand::rng();
        let token = draw_token(&mut rng, |t| t != 5);
        assert_eq!(token, 5);
    }
}
