//! Build orchestration and pipeline management
//!
//! One run prepares the output directory, then compiles the reloadable
//! module, the host executable and the test suite, strictly in that order.
//! A failing target never stops the ones after it; the per-target statuses
//! are folded into a single [`RunOutcome`].

use crate::error::{BuildError, BuildResult};
use crate::profile::Resolved;
use crate::reload::ReloadCoordinator;
use crate::report::RunReport;
use crate::targets::{BuildTarget, Invocation, TargetKind};
use crate::toolchain::Toolchain;
use crate::workspace::{PrepareReport, Workspace};
use hotswap_config::Config;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Build configuration
///
/// Every path and name a run needs; nothing is looked up from globals.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Project root directory
    pub project_root: PathBuf,
    /// Directory holding the translation units
    pub source_dir: PathBuf,
    /// Directory the compiler runs in and writes to
    pub output_dir: PathBuf,
    /// Module name, also the prefix of its symbol artifacts
    pub module_name: String,
    /// Module source, relative to `source_dir`
    pub module_source: PathBuf,
    /// Host source, relative to `source_dir`
    pub host_source: PathBuf,
    /// Host executable file name
    pub host_output: String,
    /// Test suite source, relative to `source_dir`
    pub test_source: PathBuf,
    /// Remove every prior output before building
    pub clean: bool,
    /// Platform and configuration to build with
    pub resolved: Resolved,
}

impl BuildConfig {
    /// Create a configuration with the default project layout under `project_root`
    pub fn new(project_root: impl Into<PathBuf>, resolved: Resolved) -> Self {
        let project_root = project_root.into();
        Self {
            source_dir: project_root.join("src"),
            output_dir: project_root.join("bin"),
            project_root,
            module_name: "robotrider".to_string(),
            module_source: PathBuf::from("robotrider.cpp"),
            host_source: PathBuf::from("win32_platform.cpp"),
            host_output: "launcher.exe".to_string(),
            test_source: PathBuf::from("testsuite.cpp"),
            clean: false,
            resolved,
        }
    }

    /// Create a configuration from a loaded hotswap.toml
    pub fn from_config(config: &Config, resolved: Resolved) -> Self {
        let project = &config.project;
        Self {
            project_root: config.project_root.clone(),
            source_dir: config.source_dir(),
            output_dir: config.output_dir(),
            module_name: project.module_name().to_string(),
            module_source: project.module_source(),
            host_source: project.host_source(),
            host_output: project.host_output().to_string(),
            test_source: project.test_source(),
            clean: false,
            resolved,
        }
    }

    /// Set the clean flag
    pub fn with_clean(mut self, clean: bool) -> Self {
        self.clean = clean;
        self
    }

    /// The reloadable module, without its per-run symbol artifact
    pub fn module_target(&self) -> BuildTarget {
        BuildTarget::new(
            self.module_name.clone(),
            TargetKind::Module,
            self.source_dir.join(&self.module_source),
        )
    }

    /// The host executable
    pub fn host_target(&self) -> BuildTarget {
        let toolset = self.resolved.platform.toolset;
        BuildTarget::new(
            file_stem(&self.host_output),
            TargetKind::Executable,
            self.source_dir.join(&self.host_source),
        )
        .with_compile_flag(toolset.output_name_flag(&self.host_output))
        .with_link_flag(toolset.console_subsystem_flag())
        .with_system_libs(true)
    }

    /// The test suite
    pub fn test_target(&self) -> BuildTarget {
        let toolset = self.resolved.platform.toolset;
        BuildTarget::new(
            file_stem(&self.test_source.to_string_lossy()),
            TargetKind::TestSuite,
            self.source_dir.join(&self.test_source),
        )
        .with_link_flag(toolset.console_subsystem_flag())
    }
}

fn file_stem(name: &str) -> String {
    Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string())
}

/// Pipeline position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineState {
    NotStarted,
    ModuleBuild,
    HostBuild,
    TestBuild,
    Done,
}

impl PipelineState {
    /// Next state; `Done` is terminal
    pub fn next(self) -> Self {
        match self {
            Self::NotStarted => Self::ModuleBuild,
            Self::ModuleBuild => Self::HostBuild,
            Self::HostBuild => Self::TestBuild,
            Self::TestBuild | Self::Done => Self::Done,
        }
    }

    /// Target built in this state
    pub fn target_kind(self) -> Option<TargetKind> {
        match self {
            Self::ModuleBuild => Some(TargetKind::Module),
            Self::HostBuild => Some(TargetKind::Executable),
            Self::TestBuild => Some(TargetKind::TestSuite),
            Self::NotStarted | Self::Done => None,
        }
    }
}

/// How a target ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TargetStatus {
    /// The compiler ran and exited with `code`
    Exited { code: i32 },
    /// The compiler never ran
    Failed { reason: String },
}

impl TargetStatus {
    /// Whether the target built cleanly
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Exited { code: 0 })
    }

    /// Exit code; a target that never ran counts as 1
    pub fn code(&self) -> i32 {
        match self {
            Self::Exited { code } => *code,
            Self::Failed { .. } => 1,
        }
    }
}

/// Result of one target
#[derive(Debug, Clone, Serialize)]
pub struct TargetOutcome {
    pub kind: TargetKind,
    pub name: String,
    pub status: TargetStatus,
    pub elapsed: Duration,
    /// Absent when the compiler was never invoked
    pub invocation: Option<Invocation>,
}

impl TargetOutcome {
    fn not_run(target: &BuildTarget, reason: impl Into<String>) -> Self {
        Self {
            kind: target.kind,
            name: target.name.clone(),
            status: TargetStatus::Failed {
                reason: reason.into(),
            },
            elapsed: Duration::ZERO,
            invocation: None,
        }
    }
}

/// Build statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildStats {
    /// Wall time of the whole run
    pub total_time: Duration,
    /// Time spent preparing the output directory
    pub prepare_time: Duration,
    /// Entries removed while preparing
    pub removed_entries: usize,
    /// Entries that could not be removed
    pub skipped_entries: usize,
}

/// Result of a pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    /// Resolved platform name
    pub platform: String,
    /// Resolved configuration name
    pub configuration: String,
    /// Per-target results in pipeline order
    pub targets: Vec<TargetOutcome>,
    pub stats: BuildStats,
}

impl RunOutcome {
    /// Whether every target exited 0
    pub fn is_success(&self) -> bool {
        self.targets.iter().all(|t| t.status.is_success())
    }

    /// Process exit code for the run
    ///
    /// Bitwise OR of the per-target codes. A non-zero result whose low byte
    /// is zero gets bit 0 set, so truncation to 8 bits still reports failure.
    pub fn exit_code(&self) -> i32 {
        let code = self
            .targets
            .iter()
            .fold(0, |acc, target| acc | target.status.code());
        if code != 0 && code & 0xff == 0 {
            code | 1
        } else {
            code
        }
    }

    /// Outcome of the target of `kind`
    pub fn target(&self, kind: TargetKind) -> Option<&TargetOutcome> {
        self.targets.iter().find(|t| t.kind == kind)
    }
}

/// Receives pipeline progress
///
/// The library never prints; front ends implement this to show progress.
pub trait BuildObserver {
    /// A compiler is about to run
    fn target_started(&mut self, _target: &BuildTarget, _invocation: &Invocation) {}

    /// A target finished, whether or not its compiler ran
    fn target_finished(&mut self, _outcome: &TargetOutcome) {}
}

/// Observer that ignores everything
#[derive(Debug, Default)]
pub struct SilentObserver;

impl BuildObserver for SilentObserver {}

/// Main builder for orchestrating builds
pub struct Builder {
    config: BuildConfig,
    toolchain: Box<dyn Toolchain>,
    observer: Box<dyn BuildObserver>,
    workspace: Workspace,
    coordinator: ReloadCoordinator,
    state: PipelineState,
}

impl Builder {
    /// Create a builder running compilers through `toolchain`
    pub fn new(config: BuildConfig, toolchain: impl Toolchain + 'static) -> Self {
        let workspace = Workspace::new(&config.output_dir, &config.module_name);
        let coordinator = ReloadCoordinator::new(&config.output_dir, &config.module_name);
        Self {
            config,
            toolchain: Box::new(toolchain),
            observer: Box::new(SilentObserver),
            workspace,
            coordinator,
            state: PipelineState::NotStarted,
        }
    }

    /// Set the progress observer
    pub fn with_observer(mut self, observer: impl BuildObserver + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    /// Replace the output directory manager
    pub fn with_workspace(mut self, workspace: Workspace) -> Self {
        self.workspace = workspace;
        self
    }

    /// Build configuration
    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Current pipeline position
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Execute the pipeline
    ///
    /// Errors only when the output directory cannot be prepared; target
    /// failures are reported through the returned [`RunOutcome`].
    pub fn run(&mut self) -> BuildResult<RunOutcome> {
        let run_start = Instant::now();
        self.state = PipelineState::NotStarted;

        info!(
            platform = %self.config.resolved.platform.name,
            configuration = %self.config.resolved.configuration.name,
            "starting build"
        );

        let prepare_start = Instant::now();
        self.coordinator.record_existing_artifacts();
        let prepared = self.workspace.prepare(self.config.clean)?;
        let prepare_time = prepare_start.elapsed();
        log_prepare(&prepared);

        let mut targets = Vec::with_capacity(TargetKind::all().len());
        loop {
            self.state = self.state.next();
            let outcome = match self.state {
                PipelineState::ModuleBuild => self.build_module(),
                PipelineState::HostBuild => {
                    let target = self.config.host_target();
                    self.compile(&target)
                }
                PipelineState::TestBuild => {
                    let target = self.config.test_target();
                    self.compile(&target)
                }
                PipelineState::NotStarted | PipelineState::Done => break,
            };
            targets.push(outcome);
        }

        let outcome = RunOutcome {
            platform: self.config.resolved.platform.name.clone(),
            configuration: self.config.resolved.configuration.name.clone(),
            targets,
            stats: BuildStats {
                total_time: run_start.elapsed(),
                prepare_time,
                removed_entries: prepared.removed.len(),
                skipped_entries: prepared.skipped.len(),
            },
        };

        if let Err(err) = RunReport::new(&outcome).write_to(&self.config.output_dir) {
            warn!("could not write run report: {}", err);
        }

        info!(
            exit_code = outcome.exit_code(),
            elapsed_ms = outcome.stats.total_time.as_millis() as u64,
            "build finished"
        );
        Ok(outcome)
    }

    /// Compile the module while holding the reload lock
    fn build_module(&mut self) -> TargetOutcome {
        let target = self.config.module_target();

        let guard = match self.coordinator.begin_module_build() {
            Ok(guard) => guard,
            Err(err) => {
                warn!("{}; skipping {}", err, target.kind);
                let outcome = TargetOutcome::not_run(&target, err.to_string());
                self.observer.target_finished(&outcome);
                return outcome;
            }
        };

        let symbols = guard.symbols().file_name();
        let target = target.with_link_flag(
            self.config
                .resolved
                .platform
                .toolset
                .symbol_file_flag(&symbols),
        );
        let outcome = self.compile(&target);

        if let Err(err) = self.coordinator.end_module_build(guard) {
            warn!("{}", err);
        }
        outcome
    }

    /// Run the compiler for one target
    fn compile(&mut self, target: &BuildTarget) -> TargetOutcome {
        if let Err(reason) = target.validate() {
            warn!("{}", reason);
            let outcome = TargetOutcome::not_run(target, reason);
            self.observer.target_finished(&outcome);
            return outcome;
        }

        let invocation = Invocation::for_target(
            &self.config.resolved.platform,
            &self.config.resolved.configuration,
            target,
            &self.config.output_dir,
        );

        info!(name = %target.name, kind = target.kind.label(), "building {}", target.kind);
        debug!(args = ?invocation.command_line(), "compiler invocation");
        self.observer.target_started(target, &invocation);

        let started = Instant::now();
        let status = match self.toolchain.invoke(&invocation) {
            Ok(code) => TargetStatus::Exited { code },
            Err(error) => {
                let err = BuildError::ToolchainLaunch {
                    program: invocation.program.clone(),
                    error,
                };
                warn!("{}", err);
                TargetStatus::Failed {
                    reason: err.to_string(),
                }
            }
        };

        let outcome = TargetOutcome {
            kind: target.kind,
            name: target.name.clone(),
            status,
            elapsed: started.elapsed(),
            invocation: Some(invocation),
        };
        info!(
            name = %outcome.name,
            code = outcome.status.code(),
            elapsed_ms = outcome.elapsed.as_millis() as u64,
            "target finished"
        );
        self.observer.target_finished(&outcome);
        outcome
    }
}

fn log_prepare(report: &PrepareReport) {
    if report.created {
        info!("created output directory");
    }
    debug!(
        removed = report.removed.len(),
        skipped = report.skipped.len(),
        "output directory prepared"
    );
}
