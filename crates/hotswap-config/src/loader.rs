//! Configuration Loader
//!
//! Handles loading configuration and applying environment overrides with proper precedence.

use crate::project::ProjectConfig;
use crate::{ConfigError, ConfigResult, CONFIG_FILE_NAME};
use std::env;
use std::path::{Path, PathBuf};

/// Environment variable overriding the platform
pub const ENV_PLATFORM: &str = "HOTSWAP_PLATFORM";
/// Environment variable overriding the default configuration alias
pub const ENV_CONFIGURATION: &str = "HOTSWAP_CONFIGURATION";
/// Environment variable overriding the output directory
pub const ENV_OUTPUT_DIR: &str = "HOTSWAP_OUTPUT_DIR";

/// Configuration loader
///
/// Loads configuration and merges it with proper precedence:
/// 1. Built-in defaults - lowest priority
/// 2. Project config (./hotswap.toml) - overrides defaults
/// 3. Environment variables (HOTSWAP_*) - overrides project
/// 4. CLI flags - highest priority (handled by caller)
#[derive(Debug, Default)]
pub struct ConfigLoader {
    /// Skip environment overrides (tests and tooling)
    ignore_env: bool,
}

/// Loaded configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Project configuration
    pub project: ProjectConfig,

    /// Directory the configuration applies to
    ///
    /// The directory holding hotswap.toml, or the start directory when no
    /// file was found.
    pub project_root: PathBuf,

    /// Path of the loaded hotswap.toml, if any
    pub config_file: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self { ignore_env: false }
    }

    /// Disable environment variable overrides
    pub fn without_env(mut self) -> Self {
        self.ignore_env = true;
        self
    }

    /// Load configuration starting from the given directory
    ///
    /// Walks up the directory tree to find hotswap.toml. Without one, the
    /// built-in defaults apply to `start_dir`.
    pub fn load_from_directory(&self, start_dir: &Path) -> ConfigResult<Config> {
        let (config_file, project) = match find_config_file(start_dir) {
            Some(path) => {
                let project = ProjectConfig::load_from_file(&path)?;
                (Some(path), project)
            }
            None => (None, ProjectConfig::default()),
        };

        let project_root = config_file
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_else(|| start_dir.to_path_buf());

        Ok(Config {
            project: self.apply_env_overrides(project)?,
            project_root,
            config_file,
        })
    }

    /// Load configuration from a specific hotswap.toml
    pub fn load_from_file(&self, config_path: &Path) -> ConfigResult<Config> {
        let project = ProjectConfig::load_from_file(config_path)?;
        let project_root = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Config {
            project: self.apply_env_overrides(project)?,
            project_root,
            config_file: Some(config_path.to_path_buf()),
        })
    }

    /// Apply environment variable overrides to project config
    fn apply_env_overrides(&self, mut config: ProjectConfig) -> ConfigResult<ProjectConfig> {
        if self.ignore_env {
            return Ok(config);
        }

        if let Some(platform) = read_env(ENV_PLATFORM)? {
            config.project_mut().platform = Some(platform);
        }

        if let Some(configuration) = read_env(ENV_CONFIGURATION)? {
            config.project_mut().configuration = Some(configuration);
        }

        if let Some(output_dir) = read_env(ENV_OUTPUT_DIR)? {
            config.project_mut().output_dir = Some(PathBuf::from(output_dir));
        }

        Ok(config)
    }
}

/// Read a non-empty environment variable
fn read_env(name: &str) -> ConfigResult<Option<String>> {
    match env::var(name) {
        Ok(value) if value.trim().is_empty() => {
            Err(ConfigError::invalid(name, "environment override cannot be empty"))
        }
        Ok(value) => Ok(Some(value)),
        Err(_) => Ok(None),
    }
}

/// Find hotswap.toml by walking up from `start_dir`
fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
    start_dir
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find(|candidate| candidate.is_file())
}

impl Config {
    /// Absolute (project-rooted) source directory
    pub fn source_dir(&self) -> PathBuf {
        self.project_root.join(self.project.source_dir())
    }

    /// Absolute (project-rooted) output directory
    pub fn output_dir(&self) -> PathBuf {
        self.project_root.join(self.project.output_dir())
    }

    /// Check if a hotswap.toml was found
    pub fn has_config_file(&self) -> bool {
        self.config_file.is_some()
    }
}
