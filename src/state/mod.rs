//! UI state store
//!
//! One `UiState` record per dashboard, mutated only through the setters on
//! `StateStore`. Every setter notifies listeners synchronously with just the
//! kind of change; listeners read the data back with `get()`.
//!
//! Changing the project or the view always clears the selected entity, so a
//! detail pane can never show something that belongs to another project/view.

mod persist;

pub use persist::{FileStatePersistence, MemoryStatePersistence, PersistedState, StatePersistence};

use crate::listeners::{ListenerRegistry, Subscription};
use reqwest::Url;
use std::fmt;
use std::str::FromStr;
use std::sync::RwLock;

// ─────────────────────────────────────────────────────────────────────────────
// View keys
// ─────────────────────────────────────────────────────────────────────────────

/// Tabs the dashboard can show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ViewKey {
    #[default]
    Intake,
    Threads,
    Tickets,
    Resources,
    Objectives,
    SprintHealth,
    Plans,
    Reminders,
    Checklists,
    Reconcile,
    Blindspots,
    Links,
    Scheduler,
}

impl ViewKey {
    /// All views in navigation order
    pub const ALL: [ViewKey; 13] = [
        ViewKey::Intake,
        ViewKey::Threads,
        ViewKey::Tickets,
        ViewKey::Resources,
        ViewKey::Objectives,
        ViewKey::SprintHealth,
        ViewKey::Plans,
        ViewKey::Reminders,
        ViewKey::Checklists,
        ViewKey::Reconcile,
        ViewKey::Blindspots,
        ViewKey::Links,
        ViewKey::Scheduler,
    ];

    /// Key used on the command line, in persisted state and in share links
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewKey::Intake => "intake",
            ViewKey::Threads => "threads",
            ViewKey::Tickets => "tickets",
            ViewKey::Resources => "resources",
            ViewKey::Objectives => "objectives",
            ViewKey::SprintHealth => "sprinthealth",
            ViewKey::Plans => "plans",
            ViewKey::Reminders => "reminders",
            ViewKey::Checklists => "checklists",
            ViewKey::Reconcile => "reconcile",
            ViewKey::Blindspots => "blindspots",
            ViewKey::Links => "links",
            ViewKey::Scheduler => "scheduler",
        }
    }

    /// Display name for navigation
    pub fn label(&self) -> &'static str {
        match self {
            ViewKey::Intake => "Intake",
            ViewKey::Threads => "Threads",
            ViewKey::Tickets => "Tickets",
            ViewKey::Resources => "Resources",
            ViewKey::Objectives => "Objectives",
            ViewKey::SprintHealth => "Sprint Health",
            ViewKey::Plans => "Plans",
            ViewKey::Reminders => "Reminders",
            ViewKey::Checklists => "Checklists",
            ViewKey::Reconcile => "Reconcile",
            ViewKey::Blindspots => "Blindspots",
            ViewKey::Links => "LinkHub",
            ViewKey::Scheduler => "Scheduler",
        }
    }
}

impl fmt::Display for ViewKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ViewKey::ALL
            .into_iter()
            .find(|key| key.as_str() == wanted)
            .ok_or_else(|| anyhow::anyhow!("unknown view '{}'", s))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Selection
// ─────────────────────────────────────────────────────────────────────────────

/// Domain kinds that can be selected for inspection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Thread,
    Ticket,
    Objective,
    Phase,
    Reminder,
    Checklist,
    Resource,
    Blindspot,
    Link,
    Reconciliation,
    Session,
}

/// The entity shown in the detail pane
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedEntity {
    pub kind: EntityKind,
    pub id: String,
    pub data: serde_json::Value,
}

// ─────────────────────────────────────────────────────────────────────────────
// State
// ─────────────────────────────────────────────────────────────────────────────

/// Current UI selection and status flags
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UiState {
    pub current_project_id: Option<String>,
    pub current_view: ViewKey,
    pub selected_entity: Option<SelectedEntity>,
    /// Count of user-triggered actions, only shown in the status line
    pub step_count: u64,
    pub ws_connected: bool,
}

impl UiState {
    /// Initial state: launch parameters win over persisted values, then defaults
    pub fn initial(
        launch_project: Option<String>,
        launch_view: Option<ViewKey>,
        persisted: &PersistedState,
    ) -> Self {
        Self {
            current_project_id: launch_project
                .filter(|p| !p.is_empty())
                .or_else(|| persisted.project_id.clone()),
            current_view: launch_view
                .or_else(|| {
                    persisted
                        .view
                        .as_deref()
                        .and_then(|v| v.parse::<ViewKey>().ok())
                })
                .unwrap_or_default(),
            ..Self::default()
        }
    }

    /// Link that reopens this project/view: `?project=<id>&view=<key>`
    ///
    /// The view is omitted when it is the default intake view.
    pub fn share_url(&self, base: &Url) -> Url {
        let mut url = base.clone();
        url.set_query(None);
        {
            let mut query = url.query_pairs_mut();
            if let Some(project) = &self.current_project_id {
                query.append_pair("project", project);
            }
            if self.current_view != ViewKey::Intake {
                query.append_pair("view", self.current_view.as_str());
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }
        url
    }
}

/// What changed, passed to listeners
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Project,
    View,
    Selected,
    Step,
    Ws,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Project => "project",
            ChangeKind::View => "view",
            ChangeKind::Selected => "selected",
            ChangeKind::Step => "step",
            ChangeKind::Ws => "ws",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Store
// ─────────────────────────────────────────────────────────────────────────────

/// Owner of the `UiState` record
///
/// Shared as `Arc<StateStore>` and injected into whatever needs it.
pub struct StateStore {
    state: RwLock<UiState>,
    listeners: ListenerRegistry<ChangeKind>,
    persistence: Box<dyn StatePersistence>,
}

impl StateStore {
    pub fn new(initial: UiState, persistence: Box<dyn StatePersistence>) -> Self {
        Self {
            state: RwLock::new(initial),
            listeners: ListenerRegistry::new("state"),
            persistence,
        }
    }

    /// Build the initial state from launch parameters and persisted keys
    pub fn load(
        launch_project: Option<String>,
        launch_view: Option<ViewKey>,
        persistence: Box<dyn StatePersistence>,
    ) -> Self {
        let persisted = persistence.load();
        let initial = UiState::initial(launch_project, launch_view, &persisted);
        tracing::debug!(
            "Initial state: project={:?} view={}",
            initial.current_project_id,
            initial.current_view
        );
        Self::new(initial, persistence)
    }

    /// Snapshot of the current state
    pub fn get(&self) -> UiState {
        self.read().clone()
    }

    pub fn set_project(&self, project_id: Option<String>) {
        {
            let mut state = self.write();
            state.current_project_id = project_id.clone();
            state.selected_entity = None;
        }
        if let Err(e) = self.persistence.save_project(project_id.as_deref()) {
            tracing::warn!("Failed to persist project selection: {:#}", e);
        }
        self.notify(ChangeKind::Project);
    }

    pub fn set_view(&self, view: ViewKey) {
        {
            let mut state = self.write();
            state.current_view = view;
            state.selected_entity = None;
        }
        if let Err(e) = self.persistence.save_view(view) {
            tracing::warn!("Failed to persist view selection: {:#}", e);
        }
        self.notify(ChangeKind::View);
    }

    pub fn set_selected(&self, entity: Option<SelectedEntity>) {
        self.write().selected_entity = entity;
        self.notify(ChangeKind::Selected);
    }

    pub fn increment_step(&self) {
        self.write().step_count += 1;
        self.notify(ChangeKind::Step);
    }

    pub fn set_connected(&self, connected: bool) {
        self.write().ws_connected = connected;
        self.notify(ChangeKind::Ws);
    }

    /// Register a change listener
    pub fn on_change(&self, f: impl Fn(&ChangeKind) + Send + Sync + 'static) -> Subscription {
        self.listeners.register(f)
    }

    fn notify(&self, change: ChangeKind) {
        tracing::trace!("state change: {}", change.as_str());
        self.listeners.emit(&change);
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, UiState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, UiState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}
