//! Project Configuration (hotswap.toml)
//!
//! Handles project-level configuration stored in `hotswap.toml` at the project root.

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Default module name, also the prefix of its debug-symbol artifacts
pub const DEFAULT_MODULE_NAME: &str = "robotrider";
/// Default platform name
pub const DEFAULT_PLATFORM: &str = "win";
/// Default configuration alias
pub const DEFAULT_CONFIGURATION: &str = "develop";

/// Project configuration from hotswap.toml
///
/// Platforms and configurations are kept in ordered maps so that registering
/// them into a descriptor store is deterministic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Project layout and default selections
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<ProjectSection>,

    /// Translation targets
    #[serde(skip_serializing_if = "Option::is_none")]
    pub targets: Option<TargetsSection>,

    /// Additional platform profiles
    #[serde(default)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub platforms: BTreeMap<String, PlatformSection>,

    /// Additional build configurations
    #[serde(default)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub configurations: BTreeMap<String, ConfigurationSection>,
}

/// `[project]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectSection {
    /// Module name (default: "robotrider")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Source directory (default: "src")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_dir: Option<PathBuf>,

    /// Output directory (default: "bin")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,

    /// Platform to build for (default: "win")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,

    /// Configuration alias used when none is given (default: "develop")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configuration: Option<String>,
}

/// `[targets]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct TargetsSection {
    /// Reloadable module source (default: "<name>.cpp")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<PathBuf>,

    /// Host executable source (default: "win32_platform.cpp")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<PathBuf>,

    /// Host executable file name (default: "launcher.exe")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_output: Option<String>,

    /// Test suite source (default: "testsuite.cpp")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tests: Option<PathBuf>,
}

/// `[platforms.<name>]` section
///
/// A platform either derives from `base` (flag lists are appended to the
/// base's lists) or stands alone, in which case `compiler` and `toolset` are
/// required.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct PlatformSection {
    /// Platform this one derives from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,

    /// Compiler executable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compiler: Option<String>,

    /// Toolset family tag (e.g. "CL")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub toolset: Option<String>,

    /// Compiler flags common to every configuration
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub compiler_flags: Vec<String>,

    /// System libraries linked into the host
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub libs: Vec<String>,

    /// Linker flags common to every configuration
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub linker_flags: Vec<String>,
}

/// `[configurations.<key>]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigurationSection {
    /// Human-readable name (default: the table key)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Owning platform (default: the inherited configuration's platform)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,

    /// Alias of a configuration whose flags are used as a starting point
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inherits: Option<String>,

    /// Accepted command-line aliases
    #[serde(default)]
    pub aliases: Vec<String>,

    /// Configuration compiler flags
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub compiler_flags: Vec<String>,

    /// Configuration linker flags
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub linker_flags: Vec<String>,
}

impl ProjectConfig {
    /// Load project configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the project configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(project) = &self.project {
            if let Some(name) = &project.name {
                if name.is_empty() {
                    return Err(ConfigError::invalid("project.name", "name cannot be empty"));
                }
                if name.contains(['/', '\\']) {
                    return Err(ConfigError::invalid(
                        "project.name",
                        format!("'{}' must not contain path separators", name),
                    ));
                }
            }
            validate_optional_name("project.platform", project.platform.as_deref())?;
            validate_optional_name("project.configuration", project.configuration.as_deref())?;
        }

        if let Some(targets) = &self.targets {
            validate_optional_path("targets.module", targets.module.as_deref())?;
            validate_optional_path("targets.host", targets.host.as_deref())?;
            validate_optional_path("targets.tests", targets.tests.as_deref())?;
            validate_optional_name("targets.host_output", targets.host_output.as_deref())?;
        }

        for (name, platform) in &self.platforms {
            let field = format!("platforms.{}", name);
            if platform.base.is_none() && (platform.compiler.is_none() || platform.toolset.is_none())
            {
                return Err(ConfigError::invalid(
                    field,
                    "a platform without 'base' must set both 'compiler' and 'toolset'",
                ));
            }
            validate_flags(&field, &platform.compiler_flags)?;
            validate_flags(&field, &platform.linker_flags)?;
        }

        for (key, configuration) in &self.configurations {
            let field = format!("configurations.{}", key);
            if configuration.platform.is_none() && configuration.inherits.is_none() {
                return Err(ConfigError::invalid(
                    field,
                    "must set 'platform' or 'inherits'",
                ));
            }
            if configuration.aliases.is_empty() {
                return Err(ConfigError::invalid(field, "at least one alias is required"));
            }
            if configuration.aliases.iter().any(|a| a.trim().is_empty()) {
                return Err(ConfigError::invalid(field, "aliases cannot be blank"));
            }
            validate_flags(&field, &configuration.compiler_flags)?;
            validate_flags(&field, &configuration.linker_flags)?;
        }

        Ok(())
    }

    /// Module name; prefix of the module's symbol artifacts
    pub fn module_name(&self) -> &str {
        self.project
            .as_ref()
            .and_then(|p| p.name.as_deref())
            .unwrap_or(DEFAULT_MODULE_NAME)
    }

    /// Source directory, relative to the project root
    pub fn source_dir(&self) -> PathBuf {
        self.project
            .as_ref()
            .and_then(|p| p.source_dir.clone())
            .unwrap_or_else(|| PathBuf::from("src"))
    }

    /// Output directory, relative to the project root
    pub fn output_dir(&self) -> PathBuf {
        self.project
            .as_ref()
            .and_then(|p| p.output_dir.clone())
            .unwrap_or_else(|| PathBuf::from("bin"))
    }

    /// Selected platform name
    pub fn platform(&self) -> &str {
        self.project
            .as_ref()
            .and_then(|p| p.platform.as_deref())
            .unwrap_or(DEFAULT_PLATFORM)
    }

    /// Default configuration alias
    pub fn configuration(&self) -> &str {
        self.project
            .as_ref()
            .and_then(|p| p.configuration.as_deref())
            .unwrap_or(DEFAULT_CONFIGURATION)
    }

    /// Module source file, relative to the source directory
    pub fn module_source(&self) -> PathBuf {
        self.targets
            .as_ref()
            .and_then(|t| t.module.clone())
            .unwrap_or_else(|| PathBuf::from(format!("{}.cpp", self.module_name())))
    }

    /// Host source file, relative to the source directory
    pub fn host_source(&self) -> PathBuf {
        self.targets
            .as_ref()
            .and_then(|t| t.host.clone())
            .unwrap_or_else(|| PathBuf::from("win32_platform.cpp"))
    }

    /// Host executable file name
    pub fn host_output(&self) -> &str {
        self.targets
            .as_ref()
            .and_then(|t| t.host_output.as_deref())
            .unwrap_or("launcher.exe")
    }

    /// Test suite source file, relative to the source directory
    pub fn test_source(&self) -> PathBuf {
        self.targets
            .as_ref()
            .and_then(|t| t.tests.clone())
            .unwrap_or_else(|| PathBuf::from("testsuite.cpp"))
    }

    /// Mutable access to the `[project]` section, creating it if absent
    pub fn project_mut(&mut self) -> &mut ProjectSection {
        self.project.get_or_insert_with(ProjectSection::default)
    }
}

fn validate_optional_name(field: &str, value: Option<&str>) -> ConfigResult<()> {
    match value {
        Some(v) if v.trim().is_empty() => Err(ConfigError::invalid(field, "cannot be empty")),
        _ => Ok(()),
    }
}

fn validate_optional_path(field: &str, value: Option<&Path>) -> ConfigResult<()> {
    match value {
        Some(p) if p.as_os_str().is_empty() => Err(ConfigError::invalid(field, "path cannot be empty")),
        _ => Ok(()),
    }
}

fn validate_flags(field: &str, flags: &[String]) -> ConfigResult<()> {
    if flags.iter().any(|f| f.is_empty()) {
        return Err(ConfigError::invalid(field, "flags cannot be empty strings"));
    }
    Ok(())
}
