// clawdash - live client for the JavaClaw project dashboard
//
// Headless runner: loads config, sets up logging, restores the saved
// project/view and keeps the dashboard core running until Ctrl-C.
// Rendered content goes to the log under the `clawdash::view` target.

use anyhow::Result;
use clap::Parser;
use clawdash::app::{Dashboard, DashboardOptions};
use clawdash::cli::{self, Cli};
use clawdash::config::Config;
use clawdash::logging;
use clawdash::startup::{self, StartupInfo};
use clawdash::state::{
    FileStatePersistence, MemoryStatePersistence, StatePersistence, StateStore,
};
use std::path::PathBuf;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // config --show, --reset, --edit, --path
    if cli::handle_command(&cli) {
        return Ok(());
    }

    // Ensure config template exists (helps users discover options)
    Config::ensure_config_exists();

    // Precedence: flags > env > file > defaults
    let mut config = Config::from_env();
    cli.apply(&mut config);

    let options = DashboardOptions::from_config(&config)?;

    let state_file: Option<PathBuf> = if cli.no_persist {
        None
    } else {
        config
            .state_file
            .clone()
            .or_else(FileStatePersistence::default_path)
    };

    let info = StartupInfo {
        config: &config,
        socket_url: &options.socket_url,
        state_file: state_file.as_deref(),
    };
    startup::print_startup(&info);

    // The guard must outlive the runtime so file logs flush
    let _log_guard = logging::init_tracing(&config.logging);
    startup::log_startup(&info);

    let persistence: Box<dyn StatePersistence> = match &state_file {
        Some(path) => Box::new(FileStatePersistence::new(path.clone())),
        None => Box::new(MemoryStatePersistence::default()),
    };
    let store = Arc::new(StateStore::load(cli.project.clone(), cli.view, persistence));

    let dashboard = Dashboard::new(options, store)?;
    dashboard.run().await
}
