// Startup module - displays banner and module loading status
//
// Shows, before the first log line:
// - Version info and branding
// - Configuration loaded from file
// - Module status with checkmarks
// - Where the dashboard is going to connect

use crate::config::{Config, Features, VERSION};

/// ANSI color codes for terminal output
mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const MAGENTA: &str = "\x1b[35m";
}

/// Module loading result for display
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleStatus {
    pub name: &'static str,
    pub enabled: bool,
    pub description: &'static str,
}

/// What the banner needs besides `Config`
#[derive(Debug, Clone)]
pub struct StartupInfo<'a> {
    pub config: &'a Config,
    pub socket_url: &'a str,
    /// `None` when persistence is off for this run
    pub state_file: Option<&'a std::path::Path>,
}

/// Print the startup banner and module status to stderr
pub fn print_startup(info: &StartupInfo<'_>) {
    use colors::*;

    eprintln!();
    eprintln!("  {BOLD}{CYAN}clawdash{RESET} {DIM}v{VERSION}{RESET}");
    eprintln!("  {DIM}Live client for the JavaClaw project dashboard{RESET}");
    eprintln!();

    if let Some(path) = Config::config_path() {
        if path.exists() {
            eprintln!("  {DIM}Config:{RESET} {GREEN}\u{2713}{RESET} {}", path.display());
        } else {
            eprintln!("  {DIM}Config:{RESET} {DIM}(using defaults){RESET}");
        }
    }
    match info.state_file {
        Some(path) => eprintln!("  {DIM}State:{RESET}  {}", path.display()),
        None => eprintln!("  {DIM}State:{RESET}  {YELLOW}not persisted{RESET}"),
    }
    eprintln!();

    eprintln!("  {DIM}Loading modules...{RESET}");
    for module in &module_status(info) {
        print_module_status(module);
    }
    eprintln!();

    eprintln!(
        "  {MAGENTA}\u{25B8}{RESET} Server {BOLD}{}{RESET}",
        info.config.server_url
    );
    eprintln!(
        "  {MAGENTA}\u{25B8}{RESET} Live events {BOLD}{}{RESET}",
        info.socket_url
    );
    eprintln!();
}

/// Status of all modules based on config
pub fn module_status(info: &StartupInfo<'_>) -> Vec<ModuleStatus> {
    let Features { activity, polling } = &info.config.features;

    vec![
        ModuleStatus {
            name: "state",
            enabled: true,
            description: "UI state store",
        },
        ModuleStatus {
            name: "socket",
            enabled: true,
            description: "Live event stream",
        },
        ModuleStatus {
            name: "views",
            enabled: true,
            description: "View dispatcher",
        },
        ModuleStatus {
            name: "refresh",
            enabled: true,
            description: "Debounced refresh",
        },
        ModuleStatus {
            name: "activity",
            enabled: *activity,
            description: "Agent activity",
        },
        ModuleStatus {
            name: "polling",
            enabled: *polling && info.config.poll_interval_secs > 0,
            description: "Fallback polling",
        },
        ModuleStatus {
            name: "persistence",
            enabled: info.state_file.is_some(),
            description: "Saved project/view",
        },
    ]
}

/// Print a single module's status
fn print_module_status(module: &ModuleStatus) {
    use colors::*;

    let (icon, style) = if module.enabled {
        (format!("{GREEN}\u{2713}{RESET}"), "")
    } else {
        (format!("{DIM}\u{25CB}{RESET}"), DIM)
    };

    eprintln!(
        "    {icon} {style}{:<12}{RESET} {DIM}{}{RESET}",
        module.name, module.description
    );
}

/// Same information through tracing, for the log file
pub fn log_startup(info: &StartupInfo<'_>) {
    tracing::info!("clawdash v{}", VERSION);
    for module in &module_status(info) {
        let icon = if module.enabled { "\u{2713}" } else { "\u{25CB}" };
        tracing::info!("  {} {} - {}", icon, module.name, module.description);
    }
    tracing::info!("\u{25B8} Server {}", info.config.server_url);
    tracing::info!("\u{25B8} Live events {}", info.socket_url);
}
