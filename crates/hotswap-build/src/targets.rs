//! Build target types and argument assembly

use crate::platform::PlatformProfile;
use crate::profile::BuildConfiguration;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Kind of build target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetKind {
    /// Dynamically loadable logic module
    Module,
    /// Long-running host executable
    Executable,
    /// Test binary
    TestSuite,
}

impl TargetKind {
    /// All kinds in pipeline order
    pub fn all() -> [TargetKind; 3] {
        [Self::Module, Self::Executable, Self::TestSuite]
    }

    /// Short label used in logs and the run report
    pub fn label(&self) -> &'static str {
        match self {
            Self::Module => "module",
            Self::Executable => "host",
            Self::TestSuite => "tests",
        }
    }
}

impl std::fmt::Display for TargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Module => write!(f, "game library"),
            Self::Executable => write!(f, "platform executable"),
            Self::TestSuite => write!(f, "test suite"),
        }
    }
}

/// A build target specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildTarget {
    /// Target name
    pub name: String,
    /// Target kind
    pub kind: TargetKind,
    /// Source file
    pub source: PathBuf,
    /// Target-specific compiler flags
    pub compile_flags: Vec<String>,
    /// Target-specific linker flags
    pub link_flags: Vec<String>,
    /// Link the platform's system libraries
    pub link_system_libs: bool,
}

impl BuildTarget {
    /// Create a new build target
    pub fn new(name: impl Into<String>, kind: TargetKind, source: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            kind,
            source: source.into(),
            compile_flags: Vec::new(),
            link_flags: Vec::new(),
            link_system_libs: false,
        }
    }

    /// Add a target-specific compiler flag
    pub fn with_compile_flag(mut self, flag: impl Into<String>) -> Self {
        self.compile_flags.push(flag.into());
        self
    }

    /// Add a target-specific linker flag
    pub fn with_link_flag(mut self, flag: impl Into<String>) -> Self {
        self.link_flags.push(flag.into());
        self
    }

    /// Link the platform's system libraries
    pub fn with_system_libs(mut self, link: bool) -> Self {
        self.link_system_libs = link;
        self
    }

    /// Output-kind directive for this target, if any
    pub fn output_kind_directive(&self, platform: &PlatformProfile) -> Option<&'static str> {
        match self.kind {
            TargetKind::Module => Some(platform.toolset.dynamic_library_directive()),
            TargetKind::Executable | TargetKind::TestSuite => None,
        }
    }

    /// Validate the target configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("Target name cannot be empty".to_string());
        }

        if self.source.as_os_str().is_empty() {
            return Err(format!("Target '{}' has no source file", self.name));
        }

        Ok(())
    }
}

/// Assemble the compiler arguments for `target`
///
/// Order: platform compiler flags, configuration compiler flags, target
/// compiler flags, source, output-kind directive, then the link phase
/// (separator, platform linker flags, configuration linker flags, target
/// linker flags, system libraries). Flags are neither reordered nor
/// deduplicated; later duplicates are resolved by the toolchain.
pub fn assemble_arguments(
    platform: &PlatformProfile,
    configuration: &BuildConfiguration,
    target: &BuildTarget,
) -> Vec<String> {
    let mut args = Vec::new();
    args.extend(platform.common_compiler_flags.iter().cloned());
    args.extend(configuration.compiler_flags.iter().cloned());
    args.extend(target.compile_flags.iter().cloned());
    args.push(target.source.to_string_lossy().into_owned());
    if let Some(directive) = target.output_kind_directive(platform) {
        args.push(directive.to_string());
    }
    args.push(platform.toolset.link_separator().to_string());
    args.extend(platform.common_linker_flags.iter().cloned());
    args.extend(configuration.linker_flags.iter().cloned());
    args.extend(target.link_flags.iter().cloned());
    if target.link_system_libs {
        args.extend(platform.libs.iter().cloned());
    }
    args
}

/// One external compiler call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    /// Compiler executable
    pub program: String,
    /// Arguments, in order
    pub args: Vec<String>,
    /// Working directory
    pub cwd: PathBuf,
}

impl Invocation {
    /// Build the invocation for `target`, run from `cwd`
    pub fn for_target(
        platform: &PlatformProfile,
        configuration: &BuildConfiguration,
        target: &BuildTarget,
        cwd: &Path,
    ) -> Self {
        Self {
            program: platform.compiler.clone(),
            args: assemble_arguments(platform, configuration, target),
            cwd: cwd.to_path_buf(),
        }
    }

    /// Program followed by its arguments
    pub fn command_line(&self) -> Vec<&str> {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::Toolset;
    use pretty_assertions::assert_eq;

    fn tiny_platform() -> PlatformProfile {
        PlatformProfile::new("tiny", "cl.exe", Toolset::Cl)
            .with_compiler_flags(["-P1", "-P2"])
            .with_libs(["sys.lib"])
            .with_linker_flags(["/PL"])
    }

    fn tiny_configuration() -> BuildConfiguration {
        BuildConfiguration::new("Tiny", "tiny")
            .with_aliases(["t"])
            .with_compiler_flags(["-C1"])
            .with_linker_flags(["/CL"])
    }

    #[test]
    fn test_module_arguments_order() {
        let target = BuildTarget::new("game", TargetKind::Module, "src/game.cpp")
            .with_compile_flag("-T1")
            .with_link_flag("/PDB:game_1.pdb");

        let args = assemble_arguments(&tiny_platform(), &tiny_configuration(), &target);

        assert_eq!(
            args,
            vec![
                "-P1", "-P2", "-C1", "-T1", "src/game.cpp", "-LD", "/link", "/PL", "/CL",
                "/PDB:game_1.pdb",
            ]
        );
    }

    #[test]
    fn test_executable_links_system_libs() {
        let target = BuildTarget::new("host", TargetKind::Executable, "src/host.cpp")
            .with_compile_flag("-Fehost.exe")
            .with_link_flag("-subsystem:console,5.2")
            .with_system_libs(true);

        let args = assemble_arguments(&tiny_platform(), &tiny_configuration(), &target);

        assert_eq!(
            args,
            vec![
                "-P1", "-P2", "-C1", "-Fehost.exe", "src/host.cpp", "/link", "/PL", "/CL",
                "-subsystem:console,5.2", "sys.lib",
            ]
        );
    }

    #[test]
    fn test_duplicates_are_kept() {
        let platform = tiny_platform().with_compiler_flags(["-O2"]);
        let configuration = tiny_configuration().with_compiler_flags(["-O2", "-Od"]);
        let target = BuildTarget::new("tests", TargetKind::TestSuite, "t.cpp");

        let args = assemble_arguments(&platform, &configuration, &target);
        assert_eq!(&args[..3], &["-O2", "-O2", "-Od"]);
    }

    #[test]
    fn test_invocation_command_line() {
        let target = BuildTarget::new("tests", TargetKind::TestSuite, "t.cpp");
        let invocation = Invocation::for_target(
            &tiny_platform(),
            &tiny_configuration(),
            &target,
            Path::new("bin"),
        );
        assert_eq!(invocation.command_line()[0], "cl.exe");
        assert_eq!(invocation.cwd, PathBuf::from("bin"));
    }

    #[test]
    fn test_target_validation() {
        assert!(BuildTarget::new("", TargetKind::Module, "a.cpp").validate().is_err());
        assert!(BuildTarget::new("m", TargetKind::Module, "").validate().is_err());
        assert!(BuildTarget::new("m", TargetKind::Module, "a.cpp").validate().is_ok());
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(TargetKind::Module.label(), "module");
        assert_eq!(TargetKind::Executable.to_string(), "platform executable");
    }
}
