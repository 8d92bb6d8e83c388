//! Configuration tests
//!
//! These guard the template: every field `Config` carries must be written by
//! `to_toml()` and read back by `FileConfig`. When you add a field, these
//! tests fail until both sides know about it.

use super::*;
use std::path::PathBuf;

fn parse(toml_str: &str) -> FileConfig {
    toml::from_str(toml_str).unwrap_or_else(|e| panic!("TOML failed to parse: {e}\n{toml_str}"))
}

// ─────────────────────────────────────────────────────────────────────────────
// Round-trip tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_config_roundtrip_default() {
    let config = Config::default();
    let toml_str = config.to_toml();

    let merged = Config::merge(parse(&toml_str), EnvOverrides::default());
    assert_eq!(merged.server_url, "http://localhost:8080");
    assert_eq!(merged.reconnect_delay_ms, 2000);
    assert_eq!(merged.refresh_debounce_ms, 1500);
    assert_eq!(merged.poll_interval_secs, 10);
    assert_eq!(merged.state_file, None);
    assert!(merged.features.activity);
    assert!(merged.features.polling);
    assert_eq!(merged.logging.level, "info");
    assert_eq!(merged.logging.file_rotation, LogRotation::Daily);
}

#[test]
fn test_all_fields_have_toml_serialization() {
    // ─────────────────────────────────────────────────────────────────────
    // Every field set to a non-default value. When you add a field, ADD IT HERE.
    // ─────────────────────────────────────────────────────────────────────
    let config = Config {
        server_url: "https://claw.example.com".to_string(),
        reconnect_delay_ms: 500,
        refresh_debounce_ms: 250,
        poll_interval_secs: 0,
        state_file: Some(PathBuf::from("/tmp/claw state.toml")),
        features: Features {
            activity: false,
            polling: false,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
            file_enabled: true,
            file_dir: PathBuf::from("/var/log/clawdash"),
            file_rotation: LogRotation::Hourly,
            file_prefix: "dash".to_string(),
        },
    };

    let toml_str = config.to_toml();
    assert!(toml_str.contains("[features]"));
    assert!(toml_str.contains("[logging]"));

    let file = parse(&toml_str);
    assert_eq!(file.server_url.as_deref(), Some("https://claw.example.com"));
    assert_eq!(file.reconnect_delay_ms, Some(500));
    assert_eq!(file.refresh_debounce_ms, Some(250));
    assert_eq!(file.poll_interval_secs, Some(0));
    assert_eq!(file.state_file.as_deref(), Some("/tmp/claw state.toml"));

    let features = file.features.expect("features should be present");
    assert_eq!(features.activity, Some(false));
    assert_eq!(features.polling, Some(false));

    let logging = file.logging.expect("logging should be present");
    assert_eq!(logging.level.as_deref(), Some("debug"));
    assert_eq!(logging.file_enabled, Some(true));
    assert_eq!(logging.file_dir, Some(PathBuf::from("/var/log/clawdash")));
    assert_eq!(logging.file_rotation, Some(LogRotation::Hourly));
    assert_eq!(logging.file_prefix.as_deref(), Some("dash"));
}

#[test]
fn test_quotes_in_values_are_escaped() {
    let config = Config {
        server_url: r#"http://host/"quoted"\path"#.to_string(),
        ..Config::default()
    };
    let file = parse(&config.to_toml());
    assert_eq!(file.server_url.as_deref(), Some(r#"http://host/"quoted"\path"#));
}

#[test]
fn test_control_characters_in_values_survive_the_template() {
    let mut config = Config {
        server_url: "http://host/\nline\ttab\u{1b}esc".to_string(),
        ..Config::default()
    };
    config.logging.file_prefix = "dash\r\n".to_string();

    let file = parse(&config.to_toml());
    assert_eq!(file.server_url.as_deref(), Some("http://host/\nline\ttab\u{1b}esc"));
    assert_eq!(
        file.logging.and_then(|l| l.file_prefix).as_deref(),
        Some("dash\r\n")
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Precedence
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_partial_file_falls_back_to_defaults() {
    let file = parse(
        r#"
server_url = "http://dash:9000"

[features]
polling = false
"#,
    );
    let config = Config::merge(file, EnvOverrides::default());

    assert_eq!(config.server_url, "http://dash:9000");
    assert_eq!(config.reconnect_delay_ms, 2000);
    assert!(config.features.activity);
    assert!(!config.features.polling);
    assert_eq!(config.logging.file_prefix, "clawdash");
}

#[test]
fn test_env_overrides_file() {
    let file = parse(
        r#"
server_url = "http://from-file:8080"
state_file = "/from/file.toml"

[logging]
level = "warn"
"#,
    );
    let env = EnvOverrides {
        server_url: Some("http://from-env:8080".to_string()),
        log_level: Some("trace".to_string()),
        state_file: Some("/from/env.toml".to_string()),
    };
    let config = Config::merge(file, env);

    assert_eq!(config.server_url, "http://from-env:8080");
    assert_eq!(config.logging.level, "trace");
    assert_eq!(config.state_file, Some(PathBuf::from("/from/env.toml")));
}

#[test]
fn test_malformed_values_fail_to_parse() {
    assert!(toml::from_str::<FileConfig>("reconnect_delay_ms = \"soon\"").is_err());
    assert!(toml::from_str::<FileConfig>("[features]\nactivity = maybe").is_err());
}

#[test]
fn test_log_rotation_values() {
    let file = parse("[logging]\nfile_rotation = \"never\"");
    let logging = LoggingConfig::from_file(file.logging);
    assert_eq!(logging.file_rotation, LogRotation::Never);
    assert_eq!(logging.file_rotation.to_string(), "never");
}

#[test]
fn test_misspelled_log_rotation_is_rejected() {
    let err = toml::from_str::<FileConfig>("[logging]\nfile_rotation = \"dayly\"").unwrap_err();
    assert!(err.to_string().contains("dayly"));
}
