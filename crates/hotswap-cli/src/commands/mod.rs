//! CLI command implementations

pub mod build;
pub mod configs;

use anyhow::{Context, Result};
use hotswap_build::DescriptorStore;
use hotswap_config::{Config, ConfigLoader};
use std::env;
use std::path::PathBuf;
use tracing::debug;

/// Load hotswap.toml and the descriptor tables it extends
///
/// `project_dir` defaults to the current directory; relative paths are made
/// absolute so compiler invocations stay valid from the output directory.
pub(crate) fn load_project(project_dir: Option<PathBuf>) -> Result<(Config, DescriptorStore)> {
    let cwd = env::current_dir().context("Failed to read the current directory")?;
    let project_dir = project_dir.map_or_else(|| cwd.clone(), |dir| cwd.join(dir));

    let config = ConfigLoader::new()
        .load_from_directory(&project_dir)
        .with_context(|| format!("Failed to load configuration for {}", project_dir.display()))?;
    let store = DescriptorStore::from_project(&config.project)
        .context("Invalid platform or configuration table")?;
    debug!(
        root = %config.project_root.display(),
        platforms = store.platforms().len(),
        configurations = store.configurations().len(),
        "loaded project"
    );
    Ok((config, store))
}
