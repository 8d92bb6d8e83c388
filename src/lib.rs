// clawdash - live client for the JavaClaw project dashboard
//
// The reactive core of the dashboard as a library:
// - State store (state): current project/view/selection, persisted across runs
// - Socket client (socket): reconnecting WebSocket with project/session subscriptions
// - View dispatcher (views): renders the current view, containing renderer failures
// - Debounced refresher (refresh): collapses bursts of data events into one refresh
//
// `app::Dashboard` wires them together; `main` adds config, logging and the CLI.

pub mod activity;
pub mod api;
pub mod app;
pub mod cli;
pub mod config;
pub mod events;
pub mod listeners;
pub mod logging;
pub mod nav;
pub mod refresh;
pub mod socket;
pub mod startup;
pub mod state;
pub mod timer;
pub mod views;
