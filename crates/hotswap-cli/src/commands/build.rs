//! Build command - compile the module, host and test suite

use anyhow::{Context, Result};
use colored::Colorize;
use hotswap_build::{
    BuildConfig, BuildObserver, BuildTarget, Builder, ConfigurationSelector, Invocation,
    ProcessToolchain, RunOutcome, TargetOutcome, TargetStatus,
};
use std::path::PathBuf;
use tracing::debug;

/// Build command arguments
#[derive(Debug, Default)]
pub struct BuildArgs {
    /// Configuration from the command line; falls back to the project default
    pub selector: Option<ConfigurationSelector>,
    /// Platform from the command line; falls back to the project default
    pub platform: Option<String>,
    /// Remove every prior output first
    pub clean: bool,
    /// Print compiler arguments
    pub verbose: bool,
    /// JSON output
    pub json: bool,
    /// Project directory (defaults to current directory)
    pub project_dir: Option<PathBuf>,
}

/// Run the build command, returning the process exit code
pub fn run(args: BuildArgs) -> Result<i32> {
    let (config, store) = super::load_project(args.project_dir.clone())?;

    let platform = args
        .platform
        .as_deref()
        .unwrap_or_else(|| config.project.platform());
    let selector = args
        .selector
        .clone()
        .unwrap_or_else(|| ConfigurationSelector::from_str(config.project.configuration()));
    let resolved = store.resolve_selector(platform, &selector)?;
    debug!(
        platform = %resolved.platform.name,
        configuration = %resolved.configuration.name,
        "resolved selection"
    );

    let build_config = BuildConfig::from_config(&config, resolved).with_clean(args.clean);
    let observer = ConsoleObserver {
        verbose: args.verbose,
        quiet: args.json,
    };
    let mut builder = Builder::new(build_config, ProcessToolchain::new()).with_observer(observer);

    let outcome = builder.run().context("Build failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_summary(&outcome);
    }

    Ok(outcome.exit_code())
}

/// Prints per-target progress to stdout
struct ConsoleObserver {
    verbose: bool,
    /// Stdout is reserved for machine-readable output
    quiet: bool,
}

impl BuildObserver for ConsoleObserver {
    fn target_started(&mut self, target: &BuildTarget, invocation: &Invocation) {
        if self.quiet {
            return;
        }
        println!("{:>12} {} ({})", "Building".cyan().bold(), target.kind, target.name);
        if self.verbose {
            println!("{}", invocation.command_line().join(" ").bright_black());
        }
    }

    fn target_finished(&mut self, outcome: &TargetOutcome) {
        if self.quiet {
            return;
        }
        match &outcome.status {
            TargetStatus::Exited { code: 0 } => println!(
                "{:>12} {} in {:.2}s",
                "Finished".green().bold(),
                outcome.kind,
                outcome.elapsed.as_secs_f64()
            ),
            TargetStatus::Exited { code } => println!(
                "{:>12} {} (exit code {})",
                "Failed".red().bold(),
                outcome.kind,
                code
            ),
            TargetStatus::Failed { reason } => println!(
                "{:>12} {}: {}",
                "Failed".red().bold(),
                outcome.kind,
                reason
            ),
        }
    }
}

fn print_summary(outcome: &RunOutcome) {
    println!("{}", "=".repeat(60));
    if outcome.is_success() {
        println!(
            "Build succeeded in {:.2}s",
            outcome.stats.total_time.as_secs_f64()
        );
    } else {
        println!(
            "{} (exit code {})",
            "Build failed".red().bold(),
            outcome.exit_code()
        );
    }
    println!("  Platform:      {}", outcome.platform);
    println!("  Configuration: {}", outcome.configuration);
    if outcome.stats.skipped_entries > 0 {
        println!(
            "  {} output entries could not be removed (still in use?)",
            outcome.stats.skipped_entries
        );
    }
    println!("{}", "=".repeat(60));
}
