//! CLI configuration via environment variables

use std::env;
use std::io::IsTerminal;

/// CLI configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Disable colored output (NO_COLOR, HOTSWAP_NO_COLOR, or stdout not a terminal)
    pub no_color: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            no_color: env::var_os("NO_COLOR").is_some()
                || env::var_os("HOTSWAP_NO_COLOR").is_some()
                || !std::io::stdout().is_terminal(),
        }
    }
}
