//! Build orchestration error types

use std::path::PathBuf;
use thiserror::Error;

pub type BuildResult<T> = Result<T, BuildError>;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Unknown platform: {name}")]
    UnknownPlatform { name: String },

    #[error("Unsupported toolset '{toolset}'")]
    UnsupportedToolset { toolset: String },

    #[error("Unknown configuration '{alias}' (known aliases: {known})")]
    UnknownConfiguration { alias: String, known: String },

    #[error("Configuration '{configuration}' does not apply to platform '{platform}'")]
    ConfigurationPlatformMismatch {
        configuration: String,
        platform: String,
    },

    #[error("Alias '{alias}' of configuration '{configuration}' is already claimed by '{existing}'")]
    AliasConflict {
        alias: String,
        configuration: String,
        existing: String,
    },

    #[error("Platform '{name}' is already defined")]
    DuplicatePlatform { name: String },

    #[error("Invalid descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("Cannot prepare output directory {path}: {error}")]
    Workspace {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("Cannot create reload lock {path}: {error}")]
    LockCreation {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("Cannot remove reload lock {path}: {error}")]
    LockRelease {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("Failed to launch '{program}': {error}")]
    ToolchainLaunch {
        program: String,
        error: std::io::Error,
    },

    #[error("I/O error at {path}: {error}")]
    IoError {
        path: PathBuf,
        error: std::io::Error,
    },
}

impl BuildError {
    /// Create an unknown platform error
    pub fn unknown_platform(name: impl Into<String>) -> Self {
        Self::UnknownPlatform { name: name.into() }
    }

    /// Create an unknown configuration error listing the accepted aliases
    pub fn unknown_configuration<'a>(
        alias: impl Into<String>,
        known: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        Self::UnknownConfiguration {
            alias: alias.into(),
            known: known.into_iter().collect::<Vec<_>>().join(", "),
        }
    }

    /// Create a workspace error with path context
    pub fn workspace(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::Workspace {
            path: path.into(),
            error,
        }
    }

    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            error,
        }
    }
}
