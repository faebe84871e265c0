//! CLI configuration via environment variables
//!
//! astest takes all optional settings from the environment so the command
//! line stays a single file argument plus a few flags.

use std::env;
use std::path::PathBuf;

/// CLI configuration loaded from environment variables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Disable colored output (ASTEST_NO_COLOR=1 or NO_COLOR=1)
    pub no_color: bool,
    /// Fixed output width instead of the terminal's (ASTEST_TERM_WIDTH=100)
    pub term_width: Option<usize>,
    /// Custom debug console history file (ASTEST_HISTORY_FILE=/path/to/file)
    pub history_file: Option<PathBuf>,
    /// Don't persist debug console history (ASTEST_NO_HISTORY=1)
    pub no_history: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            no_color: env::var_os("ASTEST_NO_COLOR").is_some() || env::var_os("NO_COLOR").is_some(),
            term_width: env::var("ASTEST_TERM_WIDTH")
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .filter(|&width: &usize| width > 0),
            history_file: env::var("ASTEST_HISTORY_FILE").ok().map(PathBuf::from),
            no_history: env::var_os("ASTEST_NO_HISTORY").is_some(),
        }
    }

    /// Get the history file path
    ///
    /// Returns:
    /// 1. None if history is disabled
    /// 2. ASTEST_HISTORY_FILE if set
    /// 3. ~/.astest/debug_history if home directory exists
    pub fn history_path(&self) -> Option<PathBuf> {
        if self.no_history {
            return None;
        }
        if let Some(ref path) = self.history_file {
            return Some(path.clone());
        }
        dirs::home_dir().map(|home| home.join(".astest").join("debug_history"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
