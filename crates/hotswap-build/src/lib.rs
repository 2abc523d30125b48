//! Hotswap build orchestration
//!
//! Builds a hot-reloadable application made of:
//! - a reloadable logic module (dynamic library)
//! - the host executable that loads it
//! - a test suite
//!
//! and coordinates with a running host through a lock artifact in the output
//! directory, so the host never loads a half-written module.

pub mod builder;
pub mod error;
pub mod platform;
pub mod profile;
pub mod reload;
pub mod report;
pub mod targets;
pub mod toolchain;
pub mod workspace;

// Re-export main types
pub use builder::{
    BuildConfig, BuildObserver, BuildStats, Builder, PipelineState, RunOutcome, SilentObserver,
    TargetOutcome, TargetStatus,
};
pub use error::{BuildError, BuildResult};
pub use platform::{PlatformOverrides, PlatformProfile, Toolset};
pub use profile::{BuildConfiguration, ConfigurationSelector, DescriptorStore, Resolved};
pub use reload::{ModuleBuildGuard, ReloadCoordinator, ReloadLock, SymbolArtifact, LOCK_FILE_NAME};
pub use report::{RunReport, REPORT_FILE_NAME};
pub use targets::{assemble_arguments, BuildTarget, Invocation, TargetKind};
pub use toolchain::{ProcessToolchain, Toolchain};
pub use workspace::{PrepareReport, RemovalFailure, RemovalFailureKind, Workspace};
