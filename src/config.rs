//! Options for terminal control
//!
//! Config precedence: env > file > defaults. Files are JSON:
//!
//! ```json
//! { "apply_mode": "drain", "restore_on_drop": true, "wait_poll_interval_ms": 20 }
//! ```

use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use nix::sys::termios::SetArg;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// When a raw-mode attribute change takes effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ApplyMode {
    /// Immediately
    Now,
    /// After pending output is written
    Drain,
    /// After pending output is written, discarding unread input
    #[default]
    Flush,
}

impl ApplyMode {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "now" => Some(ApplyMode::Now),
            "drain" => Some(ApplyMode::Drain),
            "flush" => Some(ApplyMode::Flush),
            _ => None,
        }
    }

    pub(crate) fn set_arg(self) -> SetArg {
        match self {
            ApplyMode::Now => SetArg::TCSANOW,
            ApplyMode::Drain => SetArg::TCSADRAIN,
            ApplyMode::Flush => SetArg::TCSAFLUSH,
        }
    }
}

/// Terminal control options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// How `Terminal::prepare` applies raw mode
    pub apply_mode: ApplyMode,
    /// Whether a `RawMode` guard restores the terminal when dropped
    pub restore_on_drop: bool,
    /// How often a cancellable wait checks for cancellation
    pub wait_poll_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            apply_mode: ApplyMode::Flush,
            restore_on_drop: true,
            wait_poll_interval_ms: 50,
        }
    }
}

impl Config {
    /// Load configuration: defaults, then `path` if it exists, then
    /// `TERMSHIM_*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) if path.exists() => Self::load_from_file(path)?,
            _ => Config::default(),
        };

        config.apply_env_vars();
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;

        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    pub fn apply_env_vars(&mut self) {
        self.apply_vars(|key| env::var(key).ok());
    }

    fn apply_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("TERMSHIM_APPLY_MODE") {
            match ApplyMode::from_str(&val) {
                Some(mode) => self.apply_mode = mode,
                None => tracing::warn!("Ignoring unknown TERMSHIM_APPLY_MODE {:?}", val),
            }
        }
        if let Some(val) = lookup("TERMSHIM_RESTORE_ON_DROP") {
            self.restore_on_drop = val == "1" || val.eq_ignore_ascii_case("true");
        }
        if let Some(val) = lookup("TERMSHIM_WAIT_POLL_MS") {
            if let Ok(ms) = val.parse() {
                self.wait_poll_interval_ms = ms;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.wait_poll_interval_ms == 0 {
            return Err(Error::Config(
                "wait_poll_interval_ms must be at least 1".to_string(),
            ));
        }
        if self.wait_poll_interval_ms > 60_000 {
            return Err(Error::Config(
                "wait_poll_interval_ms must be at most 60000".to_string(),
            ));
        }
        Ok(())
    }

    pub fn wait_poll_interval(&self) -> Duration {
        Duration::from_millis(self.wait_poll_interval_ms)
    }
}
