//! Config serialization to TOML
//!
//! Single source of truth for config file format.

use super::Config;

impl Config {
    /// Render the config as a commented TOML file
    pub fn to_toml(&self) -> String {
        let state_file = match &self.state_file {
            Some(path) => format!("state_file = \"{}\"", toml_escape(&path.display().to_string())),
            None => "# state_file = \"~/.config/clawdash/state.toml\"".to_string(),
        };

        format!(
            r#"# clawdash configuration

# Dashboard server (REST under /api, live events on /ws)
server_url = "{server_url}"

# Delay before reconnecting a dropped socket (milliseconds)
reconnect_delay_ms = {reconnect}

# Quiet period before a burst of data events refreshes the view (milliseconds)
refresh_debounce_ms = {debounce}

# Fallback polling for projects and LLM metrics (seconds, 0 disables)
poll_interval_secs = {poll}

# Saved project and view (CLAWDASH_STATE_FILE overrides)
{state_file}

# Feature flags
[features]
activity = {activity}
polling = {polling}

# Logging configuration (RUST_LOG env var overrides)
[logging]
level = "{log_level}"
# File logging (JSON, in addition to stderr)
file_enabled = {log_file_enabled}
file_dir = "{log_file_dir}"
file_rotation = "{log_file_rotation}"  # hourly, daily, never
file_prefix = "{log_file_prefix}"
"#,
            server_url = toml_escape(&self.server_url),
            reconnect = self.reconnect_delay_ms,
            debounce = self.refresh_debounce_ms,
            poll = self.poll_interval_secs,
            state_file = state_file,
            activity = self.features.activity,
            polling = self.features.polling,
            log_level = toml_escape(&self.logging.level),
            log_file_enabled = self.logging.file_enabled,
            log_file_dir = toml_escape(&self.logging.file_dir.display().to_string()),
            log_file_rotation = self.logging.file_rotation.as_str(),
            log_file_prefix = toml_escape(&self.logging.file_prefix),
        )
    }
}

/// Escape a value for a basic (double-quoted) TOML string
fn toml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            // TOML forbids raw control characters in basic strings
            c if c.is_control() => out.push_str(&format!("\\u{:04X}", c as u32)),
            c => out.push(c),
        }
    }
    out
}
