//! Feature flags configuration
//!
//! Feature flags for optional modules (opt-out: default enabled).

use serde::Deserialize;

/// Feature flags for optional modules (opt-out: default enabled)
#[derive(Debug, Clone)]
pub struct Features {
    /// Agent activity grid: per-agent status from the live event stream
    pub activity: bool,

    /// Fallback polling of projects and LLM metrics
    pub polling: bool,
}

impl Default for Features {
    fn default() -> Self {
        Self {
            activity: true,
            polling: true,
        }
    }
}

/// Feature flags as loaded from config file
#[derive(Debug, Deserialize, Default)]
pub struct FileFeatures {
    pub activity: Option<bool>,
    pub polling: Option<bool>,
}

impl Features {
    /// Create from file config with defaults
    pub fn from_file(file: Option<FileFeatures>) -> Self {
        let file = file.unwrap_or_default();

        Self {
            activity: file.activity.unwrap_or(true),
            polling: file.polling.unwrap_or(true),
        }
    }
}
