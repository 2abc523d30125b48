//! Configs command - list platforms and build configurations

use anyhow::{bail, Result};
use colored::Colorize;
use hotswap_build::{BuildConfiguration, DescriptorStore};
use std::path::PathBuf;

/// Run the configs command
pub fn run(platform: Option<&str>, json: bool, project_dir: Option<PathBuf>) -> Result<()> {
    let (config, store) = super::load_project(project_dir)?;
    let default_alias = config.project.configuration();

    let configurations: Vec<&BuildConfiguration> = match platform {
        Some(name) => {
            if store.platform(name).is_none() {
                bail!("Unknown platform: {}", name);
            }
            store.configurations_for(name)
        }
        None => store.configurations().iter().collect(),
    };

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "platforms": store.platforms(),
                "configurations": configurations,
                "default_platform": config.project.platform(),
                "default_configuration": default_alias,
            }))?
        );
        return Ok(());
    }

    print_platforms(&store, config.project.platform());
    println!();
    println!("{}", "Configurations:".bold());
    for configuration in configurations {
        let marker = if configuration.accepts(default_alias) {
            "*"
        } else {
            " "
        };
        println!(
            "  {} {:<10} {:<10} [{}]",
            marker,
            configuration.name,
            configuration.platform,
            configuration.aliases.join(", ").cyan()
        );
    }

    Ok(())
}

fn print_platforms(store: &DescriptorStore, default_platform: &str) {
    println!("{}", "Platforms:".bold());
    for platform in store.platforms() {
        let marker = if platform.name == default_platform { "*" } else { " " };
        let base = platform
            .base
            .as_deref()
            .map(|b| format!(" (from {})", b))
            .unwrap_or_default();
        println!(
            "  {} {:<10} {} [{}]{}",
            marker, platform.name, platform.compiler, platform.toolset, base
        );
    }
}
