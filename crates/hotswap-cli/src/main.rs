use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use hotswap_build::ConfigurationSelector;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

/// Build orchestrator for hot-reloadable applications.
///
/// Compiles the reloadable game module, the platform executable that hosts
/// it, and the test suite. While the module is being rebuilt a lock file sits
/// in the output directory so a running host does not load it too early.
///
/// EXAMPLES:
///     hotswap build                 Build with the default configuration
///     hotswap build -r              Release build
///     hotswap build -c dbg --clean  Clean debug build
///     hotswap configs               List configurations and their aliases
///
/// ENVIRONMENT VARIABLES:
///     HOTSWAP_PLATFORM        Platform to build for
///     HOTSWAP_CONFIGURATION   Configuration alias used when none is given
///     HOTSWAP_OUTPUT_DIR      Output directory, relative to the project root
///     HOTSWAP_JSON            Set to 'true' for JSON output by default
///     NO_COLOR                Set to disable colored output
///     RUST_LOG                Log filter (e.g. 'hotswap_build=debug')
#[derive(Parser)]
#[command(name = "hotswap")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the module, the host and the test suite
    ///
    /// Targets are built in that order; a failing target does not stop the
    /// ones after it. The exit status is non-zero if any target failed.
    ///
    /// EXAMPLES:
    ///     hotswap build                 Develop build
    ///     hotswap build -d -v           Debug build, print compiler arguments
    ///     hotswap build --platform win_clang
    #[command(visible_alias = "b")]
    Build {
        /// Debug configuration (alias 'debug')
        #[arg(long, short = 'd', conflicts_with_all = ["release", "config"])]
        debug: bool,
        /// Release configuration (alias 'release')
        #[arg(long, short = 'r', conflicts_with = "config")]
        release: bool,
        /// Configuration selected by alias
        #[arg(long, short = 'c', value_name = "ALIAS")]
        config: Option<String>,
        /// Platform to build for
        #[arg(long, value_name = "NAME")]
        platform: Option<String>,
        /// Remove every prior output before building
        #[arg(long)]
        clean: bool,
        /// Print compiler arguments and progress logs
        #[arg(long, short = 'v')]
        verbose: bool,
        /// Print the run outcome as JSON
        #[arg(long, env = "HOTSWAP_JSON")]
        json: bool,
        /// Project directory (defaults to the current directory)
        #[arg(long, value_name = "DIR")]
        project_dir: Option<PathBuf>,
    },

    /// List platforms and configurations
    ///
    /// EXAMPLES:
    ///     hotswap configs
    ///     hotswap configs --platform win_clang --json
    Configs {
        /// Only show configurations usable with this platform
        #[arg(long, value_name = "NAME")]
        platform: Option<String>,
        /// Output as JSON
        #[arg(long, env = "HOTSWAP_JSON")]
        json: bool,
        /// Project directory (defaults to the current directory)
        #[arg(long, value_name = "DIR")]
        project_dir: Option<PathBuf>,
    },
}

impl Commands {
    fn verbose(&self) -> bool {
        matches!(self, Commands::Build { verbose: true, .. })
    }
}

/// Exit status for errors raised before any target was built
const SETUP_FAILURE: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let cli_config = config::Config::from_env();
    if cli_config.no_color {
        colored::control::set_override(false);
    }
    init_logging(cli.command.verbose());

    match run(cli) {
        Ok(code) => ExitCode::from((code & 0xff) as u8),
        Err(err) => {
            eprintln!("{} {:#}", "error:".red().bold(), err);
            ExitCode::from(SETUP_FAILURE)
        }
    }
}

/// Install the log subscriber; `RUST_LOG` wins over `--verbose`
fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "info" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Build {
            debug,
            release,
            config,
            platform,
            clean,
            verbose,
            json,
            project_dir,
        } => {
            let selector = if debug {
                Some(ConfigurationSelector::Debug)
            } else if release {
                Some(ConfigurationSelector::Release)
            } else {
                config.as_deref().map(ConfigurationSelector::from_str)
            };
            commands::build::run(commands::build::BuildArgs {
                selector,
                platform,
                clean,
                verbose,
                json,
                project_dir,
            })
        }
        Commands::Configs {
            platform,
            json,
            project_dir,
        } => {
            commands::configs::run(platform.as_deref(), json, project_dir)?;
            Ok(0)
        }
    }
}
