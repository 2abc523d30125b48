//! Run report
//!
//! Written once per run into the output directory so the exact compiler
//! arguments of the last build can be inspected after the fact.

use crate::builder::{RunOutcome, TargetStatus};
use crate::error::{BuildError, BuildResult};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the run report
pub const REPORT_FILE_NAME: &str = "build_report.txt";

/// Plain-text record of a run
pub struct RunReport<'a> {
    outcome: &'a RunOutcome,
}

impl<'a> RunReport<'a> {
    pub fn new(outcome: &'a RunOutcome) -> Self {
        Self { outcome }
    }

    /// Render the report
    ///
    /// One `key = value` pair per line; each target opens a `[<label> <name>]`
    /// section and lists its arguments one per line, program first.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "platform = {}", self.outcome.platform);
        let _ = writeln!(out, "configuration = {}", self.outcome.configuration);

        for target in &self.outcome.targets {
            let _ = writeln!(out, "[{} {}]", target.kind.label(), target.name);
            let _ = writeln!(out, "status = {}", target.status.code());
            if let TargetStatus::Failed { reason } = &target.status {
                let _ = writeln!(out, "error = {}", reason);
            }
            if let Some(invocation) = &target.invocation {
                for arg in invocation.command_line() {
                    let _ = writeln!(out, "arg = {}", arg);
                }
            }
        }

        out
    }

    /// Write the report into `dir`, replacing any previous one
    pub fn write_to(&self, dir: &Path) -> BuildResult<PathBuf> {
        let path = dir.join(REPORT_FILE_NAME);
        fs::write(&path, self.render()).map_err(|e| BuildError::io(&path, e))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{BuildStats, TargetOutcome};
    use crate::targets::{Invocation, TargetKind};
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use tempfile::TempDir;

    fn outcome() -> RunOutcome {
        RunOutcome {
            platform: "win".to_string(),
            configuration: "Release".to_string(),
            targets: vec![
                TargetOutcome {
                    kind: TargetKind::Module,
                    name: "game".to_string(),
                    status: TargetStatus::Failed {
                        reason: "lock".to_string(),
                    },
                    elapsed: Duration::ZERO,
                    invocation: None,
                },
                TargetOutcome {
                    kind: TargetKind::Executable,
                    name: "launcher".to_string(),
                    status: TargetStatus::Exited { code: 0 },
                    elapsed: Duration::from_millis(5),
                    invocation: Some(Invocation {
                        program: "cl.exe".to_string(),
                        args: vec!["-O2".to_string(), "host.cpp".to_string()],
                        cwd: PathBuf::from("bin"),
                    }),
                },
            ],
            stats: BuildStats::default(),
        }
    }

    #[test]
    fn test_render() {
        let outcome = outcome();
        assert_eq!(
            RunReport::new(&outcome).render(),
            "platform = win\n\
             configuration = Release\n\
             [module game]\n\
             status = 1\n\
             error = lock\n\
             [host launcher]\n\
             status = 0\n\
             arg = cl.exe\n\
             arg = -O2\n\
             arg = host.cpp\n"
        );
    }

    #[test]
    fn test_write_replaces_previous_report() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(REPORT_FILE_NAME), "stale").unwrap();

        let outcome = outcome();
        let path = RunReport::new(&outcome).write_to(temp.path()).unwrap();

        let written = fs::read_to_string(path).unwrap();
        assert!(written.starts_with("platform = win\n"));
    }

    #[test]
    fn test_write_failure_is_an_error() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("missing");

        let outcome = outcome();
        let result = RunReport::new(&outcome).write_to(&missing);
        assert!(matches!(result, Err(BuildError::IoError { .. })));
    }
}
