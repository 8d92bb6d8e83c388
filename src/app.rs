//! Dashboard composition
//!
//! Wires the state store, socket client, view dispatcher, debounced refresher,
//! nav badges and activity tracker together the way the dashboard needs them:
//!
//! - socket status → store flag, plus re-subscribing the current project
//! - view change → render
//! - project change → render, badges, project subscription
//! - data events (debounced) → render, badges, projects, metrics
//! - agent status change → activity line
//! - fallback polling → projects, metrics, provider badge

use crate::activity::ActivityTracker;
use crate::api::{provider_badge, ApiClient, LlmMetrics, ProjectSummary, DEFAULT_TIMEOUT};
use crate::config::Config;
use crate::events::SocketEvent;
use crate::listeners::Subscription;
use crate::nav::NavBadges;
use crate::refresh::{DebouncedRefresher, RefreshTarget};
use crate::socket::{socket_url, SocketClient};
use crate::state::{ChangeKind, StateStore};
use crate::views::{ContentSnapshot, ViewDispatcher};
use anyhow::{Context, Result};
use futures::future::BoxFuture;
use std::sync::{Arc, Mutex, RwLock, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Runtime knobs, resolved from `Config`
#[derive(Debug, Clone)]
pub struct DashboardOptions {
    pub server_url: String,
    pub socket_url: String,
    pub reconnect_delay: Duration,
    pub refresh_debounce: Duration,
    /// `None` disables fallback polling
    pub poll_interval: Option<Duration>,
    pub activity: bool,
}

impl DashboardOptions {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            server_url: config.server_url.clone(),
            socket_url: socket_url(&config.server_url)?,
            reconnect_delay: Duration::from_millis(config.reconnect_delay_ms),
            refresh_debounce: Duration::from_millis(config.refresh_debounce_ms),
            poll_interval: (config.features.polling && config.poll_interval_secs > 0)
                .then(|| Duration::from_secs(config.poll_interval_secs)),
            activity: config.features.activity,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Shared core
// ─────────────────────────────────────────────────────────────────────────────

/// Everything the listeners and background tasks need
struct Core {
    store: Arc<StateStore>,
    socket: SocketClient,
    dispatcher: Arc<ViewDispatcher>,
    api: ApiClient,
    badges: NavBadges,
    projects: RwLock<Vec<ProjectSummary>>,
    metrics: RwLock<Option<LlmMetrics>>,
    provider: RwLock<Option<String>>,
}

impl Core {
    async fn render_current(&self) {
        self.dispatcher.render_current(&self.store).await;
    }

    async fn refresh_badges(&self) {
        let project = self.store.get().current_project_id;
        self.badges.refresh(&self.api, project.as_deref()).await;
    }

    async fn load_projects(&self) -> Result<Vec<ProjectSummary>> {
        let projects = self.api.projects().await.context("Failed to load projects")?;

        // The saved selection may be an id or a project name
        if let Some(saved) = self.store.get().current_project_id {
            let found = projects
                .iter()
                .find(|p| p.project_id == saved || p.name.as_deref() == Some(saved.as_str()));
            if let Some(found) = found {
                if found.project_id != saved {
                    tracing::info!("Resolved project '{}' to {}", saved, found.project_id);
                    self.store.set_project(Some(found.project_id.clone()));
                }
            }
        }

        *self.projects.write().unwrap_or_else(|e| e.into_inner()) = projects.clone();
        Ok(projects)
    }

    async fn refresh_metrics(&self) {
        match self.api.metrics().await {
            Ok(metrics) => {
                tracing::debug!("{}", metrics.status_line());
                *self.metrics.write().unwrap_or_else(|e| e.into_inner()) = Some(metrics);
            }
            // The metrics endpoint is optional on the server side
            Err(e) => tracing::debug!("Metrics unavailable: {:#}", e),
        }
    }

    async fn refresh_provider(&self) {
        let provider = match self.api.provider().await {
            Ok(provider) => Some(provider),
            Err(e) => {
                tracing::debug!("Provider unavailable: {:#}", e);
                None
            }
        };
        let badge = provider_badge(provider.as_deref());
        let previous = self
            .provider
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .replace(badge.clone());
        if previous.as_deref() != Some(badge.as_str()) {
            tracing::info!("LLM {}", badge);
        }
    }

    async fn poll(&self) {
        if let Err(e) = self.load_projects().await {
            tracing::warn!("{:#}", e);
        }
        self.refresh_metrics().await;
        self.refresh_provider().await;
    }

    fn on_socket_event(&self, event: &SocketEvent) {
        let SocketEvent::Status { connected } = event else {
            return;
        };
        self.store.set_connected(*connected);
        if *connected {
            // Subscriptions don't survive a reconnect
            if let Some(project) = self.store.get().current_project_id {
                self.socket.subscribe_project(&project);
            }
        }
    }

    fn on_state_change(self: &Arc<Self>, change: ChangeKind) {
        match change {
            ChangeKind::Project => {
                let state = self.store.get();
                if let Some(project) = state.current_project_id.as_deref() {
                    self.socket.subscribe_project(project);
                }
                tracing::debug!("Link: {}", state.share_url(self.api.base_url()));
                let core = self.clone();
                tokio::spawn(async move { core.refresh_badges().await });
            }
            ChangeKind::View => {
                let state = self.store.get();
                tracing::debug!("Link: {}", state.share_url(self.api.base_url()));
            }
            ChangeKind::Step => {
                tracing::info!("STEP {}", self.store.get().step_count);
            }
            ChangeKind::Ws => {
                let live = self.store.get().ws_connected;
                tracing::info!("{}", if live { "WS LIVE" } else { "WS OFF" });
            }
            ChangeKind::Selected => {}
        }
    }
}

impl RefreshTarget for Core {
    fn refresh(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            self.render_current().await;
            self.refresh_badges().await;
            if let Err(e) = self.load_projects().await {
                tracing::warn!("{:#}", e);
            }
            self.refresh_metrics().await;
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Dashboard
// ─────────────────────────────────────────────────────────────────────────────

pub struct Dashboard {
    core: Arc<Core>,
    refresher: DebouncedRefresher,
    activity: Option<ActivityTracker>,
    options: DashboardOptions,
    subscriptions: Mutex<Vec<Subscription>>,
    poller: Mutex<Option<JoinHandle<()>>>,
}

impl Dashboard {
    pub fn new(options: DashboardOptions, store: Arc<StateStore>) -> Result<Self> {
        let api = ApiClient::new(&options.server_url, DEFAULT_TIMEOUT)?;
        let socket = SocketClient::new(options.socket_url.clone(), options.reconnect_delay);
        let dispatcher = Arc::new(ViewDispatcher::with_standard_views(
            Default::default(),
            api.clone(),
        ));

        let core = Arc::new(Core {
            store,
            socket,
            dispatcher,
            api,
            badges: NavBadges::new(),
            projects: RwLock::new(Vec::new()),
            metrics: RwLock::new(None),
            provider: RwLock::new(None),
        });
        let refresher = DebouncedRefresher::new(core.clone(), options.refresh_debounce);
        let activity = options.activity.then(ActivityTracker::new);

        Ok(Self {
            core,
            refresher,
            activity,
            options,
            subscriptions: Mutex::new(Vec::new()),
            poller: Mutex::new(None),
        })
    }

    pub fn store(&self) -> &Arc<StateStore> {
        &self.core.store
    }

    pub fn socket(&self) -> &SocketClient {
        &self.core.socket
    }

    pub fn dispatcher(&self) -> &Arc<ViewDispatcher> {
        &self.core.dispatcher
    }

    pub fn badges(&self) -> &NavBadges {
        &self.core.badges
    }

    pub fn activity(&self) -> Option<&ActivityTracker> {
        self.activity.as_ref()
    }

    pub fn refresher(&self) -> &DebouncedRefresher {
        &self.refresher
    }

    pub fn projects(&self) -> Vec<ProjectSummary> {
        self.core
            .projects
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn metrics(&self) -> Option<LlmMetrics> {
        self.core
            .metrics
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Provider badge text, `None` until the first lookup finishes
    pub fn provider(&self) -> Option<String> {
        self.core
            .provider
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Re-read the project list and resolve the saved selection against it
    pub async fn load_projects(&self) -> Result<Vec<ProjectSummary>> {
        self.core.load_projects().await
    }

    /// Register every listener, connect, then do the initial load
    pub async fn start(&self) {
        self.wire();
        self.core.socket.connect();

        if let Err(e) = self.core.load_projects().await {
            tracing::warn!("{:#}", e);
        }

        if let Some(activity) = self.activity.clone() {
            let api = self.core.api.clone();
            tokio::spawn(async move {
                match api.running_executions().await {
                    Ok(running) => activity.seed_running(&running),
                    Err(e) => tracing::debug!("Could not seed agent activity: {:#}", e),
                }
            });
        }

        self.core.refresh_metrics().await;
        self.core.refresh_provider().await;
        self.core.render_current().await;
        self.core.refresh_badges().await;

        if let Some(interval) = self.options.poll_interval {
            let core = Arc::downgrade(&self.core);
            let handle = tokio::spawn(poll_loop(core, interval));
            if let Some(previous) = self.poller_lock().replace(handle) {
                previous.abort();
            }
        }
    }

    /// Run until Ctrl-C
    pub async fn run(&self) -> Result<()> {
        self.start().await;
        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl-C")?;
        tracing::info!("Shutting down");
        self.shutdown();
        Ok(())
    }

    pub fn shutdown(&self) {
        self.core.socket.shutdown();
        self.refresher.cancel();
        if let Some(poller) = self.poller_lock().take() {
            poller.abort();
        }
        for subscription in self
            .subscriptions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .drain(..)
        {
            subscription.unsubscribe();
        }
    }

    fn wire(&self) {
        let mut subs = self.subscriptions.lock().unwrap_or_else(|e| e.into_inner());
        if !subs.is_empty() {
            return;
        }

        let weak = Arc::downgrade(&self.core);
        subs.push(self.core.socket.on_event(move |event| {
            if let Some(core) = weak.upgrade() {
                core.on_socket_event(event);
            }
        }));
        subs.push(self.refresher.attach(&self.core.socket));
        if let Some(activity) = &self.activity {
            subs.push(activity.attach(&self.core.socket));
            subs.push(activity.on_change(log_activity));
        }

        subs.push(self.core.dispatcher.attach(&self.core.store));
        let weak = Arc::downgrade(&self.core);
        subs.push(self.core.store.on_change(move |change| {
            if let Some(core) = weak.upgrade() {
                core.on_state_change(*change);
            }
        }));
        subs.push(self.core.dispatcher.on_rendered(log_content));
    }

    fn poller_lock(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.poller.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn poll_loop(core: Weak<Core>, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    // The first tick completes immediately; start() already loaded once
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let Some(core) = core.upgrade() else {
            return;
        };
        core.poll().await;
    }
}

fn log_content(content: &ContentSnapshot) {
    tracing::info!(target: "clawdash::view", "{} | {}", content.title, content.subtitle);
    for line in &content.body {
        tracing::info!(target: "clawdash::view", "  {}", line);
    }
}

fn log_activity(activity: &ActivityTracker) {
    tracing::info!(target: "clawdash::view", "AGENTS {}", activity.summary());
}
