//! Configuration for the dashboard client
//!
//! Configuration is loaded in order of precedence:
//! 1. Environment variables (highest priority)
//! 2. Config file (~/.config/clawdash/config.toml)
//! 3. Built-in defaults (lowest priority)
//!
//! Command-line flags are applied on top by `main`.

use serde::Deserialize;
use std::path::PathBuf;

// ─────────────────────────────────────────────────────────────────────────────
// Submodules
// ─────────────────────────────────────────────────────────────────────────────

mod features;
mod observability;
mod serialization;

#[cfg(test)]
mod tests;

// ─────────────────────────────────────────────────────────────────────────────
// Re-exports
// ─────────────────────────────────────────────────────────────────────────────

pub use features::{Features, FileFeatures};
pub use observability::{FileLogging, LogRotation, LoggingConfig};

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_SERVER_URL: &str = "http://localhost:8080";
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 2000;
pub const DEFAULT_REFRESH_DEBOUNCE_MS: u64 = 1500;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

// ─────────────────────────────────────────────────────────────────────────────
// Application Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the dashboard server (REST and WebSocket)
    pub server_url: String,

    /// Fixed delay before reconnecting a dropped socket
    pub reconnect_delay_ms: u64,

    /// Quiet period before a burst of data events triggers a refresh
    pub refresh_debounce_ms: u64,

    /// Fallback polling period for projects and metrics (0 disables)
    pub poll_interval_secs: u64,

    /// Where the saved project/view live; `None` uses ~/.config/clawdash/state.toml
    pub state_file: Option<PathBuf>,

    /// Feature flags for optional modules
    pub features: Features,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
            refresh_debounce_ms: DEFAULT_REFRESH_DEBOUNCE_MS,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            state_file: None,
            features: Features::default(),
            logging: LoggingConfig::default(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// File Configuration (deserialization layer)
// ─────────────────────────────────────────────────────────────────────────────

/// Config file structure
#[derive(Debug, Deserialize, Default)]
pub(crate) struct FileConfig {
    pub server_url: Option<String>,
    pub reconnect_delay_ms: Option<u64>,
    pub refresh_debounce_ms: Option<u64>,
    pub poll_interval_secs: Option<u64>,
    pub state_file: Option<String>,

    /// Optional [features] section
    pub features: Option<FileFeatures>,

    /// Optional [logging] section
    pub logging: Option<FileLogging>,
}

/// Environment overrides, read once so the merge itself stays pure
#[derive(Debug, Default)]
pub(crate) struct EnvOverrides {
    pub server_url: Option<String>,
    pub log_level: Option<String>,
    pub state_file: Option<String>,
}

impl EnvOverrides {
    fn read() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            server_url: var("CLAWDASH_SERVER"),
            log_level: var("CLAWDASH_LOG_LEVEL"),
            state_file: var("CLAWDASH_STATE_FILE"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration Loading
// ─────────────────────────────────────────────────────────────────────────────

impl Config {
    /// Get the config file path: ~/.config/clawdash/config.toml
    /// Uses Unix-style ~/.config on all platforms for consistency
    pub fn config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|p| p.join(".config").join("clawdash").join("config.toml"))
    }

    /// Create config file with defaults if it doesn't exist
    pub fn ensure_config_exists() {
        let Some(path) = Self::config_path() else {
            return;
        };

        if path.exists() {
            return;
        }

        if let Some(parent) = path.parent() {
            if std::fs::create_dir_all(parent).is_err() {
                return; // Config is optional
            }
        }

        let _ = std::fs::write(&path, Self::default().to_toml());
    }

    /// Load file config if it exists
    ///
    /// A config file that exists but can't be parsed is fatal: the process
    /// prints what went wrong and exits rather than running on defaults.
    fn load_file_config() -> FileConfig {
        let Some(path) = Self::config_path() else {
            return FileConfig::default();
        };

        match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("\n╔══════════════════════════════════════════════════════════════╗");
                    eprintln!("║  CONFIG ERROR - Failed to parse configuration file          ║");
                    eprintln!("╚══════════════════════════════════════════════════════════════╝\n");
                    eprintln!("  File: {}\n", path.display());
                    eprintln!("  Error: {}\n", e);
                    eprintln!("  Tip: Check for:\n");
                    eprintln!("    - Missing quotes around string values");
                    eprintln!("    - Invalid boolean values (use true/false)");
                    eprintln!("    - Negative or fractional numbers for *_ms / *_secs keys");
                    eprintln!("    - Typos in section names\n");
                    eprintln!("  To reset, run `clawdash config --reset`.\n");
                    std::process::exit(1);
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => FileConfig::default(),
            Err(e) => {
                eprintln!("\n╔══════════════════════════════════════════════════════════════╗");
                eprintln!("║  CONFIG ERROR - Cannot read configuration file              ║");
                eprintln!("╚══════════════════════════════════════════════════════════════╝\n");
                eprintln!("  File: {}\n", path.display());
                eprintln!("  Error: {}\n", e);
                std::process::exit(1);
            }
        }
    }

    /// Load configuration: env vars > file > defaults
    pub fn from_env() -> Self {
        Self::merge(Self::load_file_config(), EnvOverrides::read())
    }

    pub(crate) fn merge(file: FileConfig, env: EnvOverrides) -> Self {
        let defaults = Self::default();

        // Server URL: env > file > default
        let server_url = env
            .server_url
            .or(file.server_url)
            .unwrap_or(defaults.server_url);

        // State file: env > file > default location
        let state_file = env.state_file.or(file.state_file).map(PathBuf::from);

        // Log level: env > file > default (RUST_LOG still wins at init time)
        let mut logging = LoggingConfig::from_file(file.logging);
        if let Some(level) = env.log_level {
            logging.level = level;
        }

        Self {
            server_url,
            reconnect_delay_ms: file
                .reconnect_delay_ms
                .unwrap_or(defaults.reconnect_delay_ms),
            refresh_debounce_ms: file
                .refresh_debounce_ms
                .unwrap_or(defaults.refresh_debounce_ms),
            poll_interval_secs: file
                .poll_interval_secs
                .unwrap_or(defaults.poll_interval_secs),
            state_file,
            features: Features::from_file(file.features),
            logging,
        }
    }
}
