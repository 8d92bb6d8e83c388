//! Agent activity tracker
//!
//! Keeps a status per known agent from the live event stream. Finished and
//! failed agents fade back to idle after a while, unless something newer has
//! happened to them in the meantime.

use crate::api::Execution;
use crate::events::SocketEvent;
use crate::listeners::{ListenerRegistry, Subscription};
use crate::socket::SocketClient;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

/// Known agents as (id, label), in display order
pub const AGENTS: [(&str, &str); 15] = [
    ("reconcile-agent", "Reconcile"),
    ("resource-agent", "Resource"),
    ("objective-agent", "Objective"),
    ("checklist-agent", "Checklist"),
    ("plan-agent", "Plan"),
    ("thread-extractor", "Extractor"),
    ("thread-agent", "Thread"),
    ("intake-triage", "Intake"),
    ("pm", "PM"),
    ("coder", "Coder"),
    ("generalist", "Generalist"),
    ("distiller", "Distiller"),
    ("controller", "Controller"),
    ("reviewer", "Reviewer"),
    ("reminder", "Reminder"),
];

pub const DONE_FADE: Duration = Duration::from_secs(8);
pub const ERROR_FADE: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentStatus {
    Idle,
    Running,
    Done,
    Error,
}

impl AgentStatus {
    pub fn symbol(&self) -> char {
        match self {
            AgentStatus::Idle => '\u{25CF}',
            AgentStatus::Running => '\u{2699}',
            AgentStatus::Done => '\u{2713}',
            AgentStatus::Error => '\u{2717}',
        }
    }
}

#[derive(Debug, Clone)]
struct AgentEntry {
    status: AgentStatus,
    since: Option<DateTime<Utc>>,
    // Bumped on every transition so a stale fade can tell it lost
    generation: u64,
}

impl Default for AgentEntry {
    fn default() -> Self {
        Self {
            status: AgentStatus::Idle,
            since: None,
            generation: 0,
        }
    }
}

struct Inner {
    agents: Mutex<HashMap<&'static str, AgentEntry>>,
    done_fade: Duration,
    error_fade: Duration,
    // Fired after every status change, fades included
    changed: ListenerRegistry<ActivityTracker>,
}

#[derive(Clone)]
pub struct ActivityTracker {
    inner: Arc<Inner>,
}

impl Default for ActivityTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivityTracker {
    pub fn new() -> Self {
        Self::with_fades(DONE_FADE, ERROR_FADE)
    }

    pub fn with_fades(done_fade: Duration, error_fade: Duration) -> Self {
        let agents = AGENTS
            .iter()
            .map(|(id, _)| (*id, AgentEntry::default()))
            .collect();
        Self {
            inner: Arc::new(Inner {
                agents: Mutex::new(agents),
                done_fade,
                error_fade,
                changed: ListenerRegistry::new("activity"),
            }),
        }
    }

    pub fn attach(&self, socket: &SocketClient) -> Subscription {
        let tracker = self.clone();
        socket.on_event(move |event| tracker.handle_event(event))
    }

    /// Called after any agent changes status
    pub fn on_change(&self, f: impl Fn(&ActivityTracker) + Send + Sync + 'static) -> Subscription {
        self.inner.changed.register(f)
    }

    pub fn handle_event(&self, event: &SocketEvent) {
        let Some(domain) = event.domain_event() else {
            return;
        };
        let Some(agent_id) = domain.agent_id() else {
            return;
        };

        match domain.event_type() {
            "AGENT_STEP_STARTED" | "AGENT_DELEGATED" => {
                self.transition(agent_id, AgentStatus::Running, Some(Utc::now()));
            }
            "AGENT_STEP_COMPLETED" | "AGENT_RESPONSE" => {
                if let Some(generation) = self.transition(agent_id, AgentStatus::Done, Some(Utc::now())) {
                    self.fade(agent_id, AgentStatus::Done, generation, self.inner.done_fade);
                }
            }
            "ERROR" => {
                if let Some(generation) = self.transition(agent_id, AgentStatus::Error, Some(Utc::now())) {
                    self.fade(agent_id, AgentStatus::Error, generation, self.inner.error_fade);
                }
            }
            _ => {}
        }
    }

    /// Mark agents with running executions as running
    pub fn seed_running(&self, executions: &[Execution]) {
        for execution in executions {
            let Some(agent_id) = execution.agent_id.as_deref() else {
                continue;
            };
            let since = execution
                .scheduled_at
                .as_deref()
                .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
                .map(|ts| ts.with_timezone(&Utc));
            self.transition(agent_id, AgentStatus::Running, since);
        }
    }

    /// `None` for agents outside the catalog
    pub fn status(&self, agent_id: &str) -> Option<AgentStatus> {
        self.lock().get(agent_id).map(|entry| entry.status)
    }

    pub fn since(&self, agent_id: &str) -> Option<DateTime<Utc>> {
        self.lock().get(agent_id).and_then(|entry| entry.since)
    }

    /// (label, status) in display order
    pub fn snapshot(&self) -> Vec<(&'static str, AgentStatus)> {
        let agents = self.lock();
        AGENTS
            .iter()
            .map(|(id, label)| {
                let status = agents.get(*id).map(|e| e.status).unwrap_or(AgentStatus::Idle);
                (*label, status)
            })
            .collect()
    }

    /// One-line grid, e.g. `● Reconcile  ⚙ PM  ✓ Coder`
    pub fn summary(&self) -> String {
        self.snapshot()
            .into_iter()
            .map(|(label, status)| format!("{} {}", status.symbol(), label))
            .collect::<Vec<_>>()
            .join("  ")
    }

    /// Returns the new generation, or `None` for unknown agents
    fn transition(
        &self,
        agent_id: &str,
        status: AgentStatus,
        since: Option<DateTime<Utc>>,
    ) -> Option<u64> {
        let generation = {
            let mut agents = self.lock();
            let entry = agents.get_mut(agent_id)?;
            entry.status = status;
            entry.since = since;
            entry.generation += 1;
            entry.generation
        };
        tracing::debug!("agent {} -> {:?}", agent_id, status);
        self.inner.changed.emit(self);
        Some(generation)
    }

    fn fade(&self, agent_id: &str, from: AgentStatus, generation: u64, after: Duration) {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let agent_id = agent_id.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let faded = {
                let mut agents = inner.agents.lock().unwrap_or_else(|e| e.into_inner());
                match agents.get_mut(agent_id.as_str()) {
                    Some(entry) if entry.status == from && entry.generation == generation => {
                        entry.status = AgentStatus::Idle;
                        entry.since = None;
                        entry.generation += 1;
                        true
                    }
                    _ => false,
                }
            };
            if faded {
                tracing::debug!("agent {} -> Idle", agent_id);
                let tracker = ActivityTracker { inner };
                tracker.inner.changed.emit(&tracker);
            }
        });
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<&'static str, AgentEntry>> {
        self.inner.agents.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::domain_event_message;
    use serde_json::json;
    use tokio::time::sleep;

    fn agent_event(kind: &str, agent: &str) -> SocketEvent {
        SocketEvent::Message(domain_event_message(kind, json!({"agentId": agent})))
    }

    #[test]
    fn test_all_agents_start_idle() {
        let tracker = ActivityTracker::new();
        assert_eq!(tracker.snapshot().len(), 15);
        assert!(tracker
            .snapshot()
            .iter()
            .all(|(_, status)| *status == AgentStatus::Idle));
        assert_eq!(tracker.status("nobody"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_started_then_completed_fades_to_idle() {
        let tracker = ActivityTracker::new();

        tracker.handle_event(&agent_event("AGENT_STEP_STARTED", "coder"));
        assert_eq!(tracker.status("coder"), Some(AgentStatus::Running));

        tracker.handle_event(&agent_event("AGENT_STEP_COMPLETED", "coder"));
        assert_eq!(tracker.status("coder"), Some(AgentStatus::Done));

        sleep(Duration::from_millis(7900)).await;
        assert_eq!(tracker.status("coder"), Some(AgentStatus::Done));
        sleep(Duration::from_millis(200)).await;
        assert_eq!(tracker.status("coder"), Some(AgentStatus::Idle));
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_fades_after_ten_seconds() {
        let tracker = ActivityTracker::new();
        tracker.handle_event(&agent_event("ERROR", "pm"));

        sleep(Duration::from_millis(9900)).await;
        assert_eq!(tracker.status("pm"), Some(AgentStatus::Error));
        sleep(Duration::from_millis(200)).await;
        assert_eq!(tracker.status("pm"), Some(AgentStatus::Idle));
    }

    #[tokio::test(start_paused = true)]
    async fn test_restarted_agent_is_not_faded() {
        let tracker = ActivityTracker::new();
        tracker.handle_event(&agent_event("AGENT_RESPONSE", "reviewer"));
        sleep(Duration::from_secs(2)).await;
        tracker.handle_event(&agent_event("AGENT_DELEGATED", "reviewer"));

        sleep(Duration::from_secs(20)).await;
        assert_eq!(tracker.status("reviewer"), Some(AgentStatus::Running));
    }

    #[tokio::test]
    async fn test_agent_id_from_outer_payload_and_unknown_agents() {
        let tracker = ActivityTracker::new();
        let mut msg = domain_event_message("AGENT_STEP_STARTED", json!(""));
        msg.payload.as_mut().unwrap()["agentId"] = json!("distiller");
        tracker.handle_event(&SocketEvent::Message(msg));
        assert_eq!(tracker.status("distiller"), Some(AgentStatus::Running));

        tracker.handle_event(&agent_event("AGENT_STEP_STARTED", "ghost"));
        tracker.handle_event(&agent_event("TICKET_UPDATED", "pm"));
        tracker.handle_event(&SocketEvent::Status { connected: true });
        assert_eq!(tracker.status("pm"), Some(AgentStatus::Idle));
        assert_eq!(tracker.status("ghost"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_on_change_fires_for_transitions_and_fades() {
        let tracker = ActivityTracker::new();
        let changes = Arc::new(Mutex::new(Vec::new()));
        let seen = changes.clone();
        tracker.on_change(move |t| seen.lock().unwrap().push(t.status("coder")));

        tracker.handle_event(&agent_event("AGENT_STEP_STARTED", "coder"));
        tracker.handle_event(&agent_event("AGENT_RESPONSE", "coder"));
        tracker.handle_event(&agent_event("TICKET_UPDATED", "coder"));
        tracker.handle_event(&agent_event("AGENT_STEP_STARTED", "ghost"));
        sleep(DONE_FADE + Duration::from_millis(100)).await;

        assert_eq!(
            *changes.lock().unwrap(),
            vec![
                Some(AgentStatus::Running),
                Some(AgentStatus::Done),
                Some(AgentStatus::Idle),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_fade_does_not_fire_on_change() {
        let tracker = ActivityTracker::new();
        tracker.handle_event(&agent_event("ERROR", "pm"));
        tracker.handle_event(&agent_event("AGENT_DELEGATED", "pm"));

        let fired = Arc::new(Mutex::new(0));
        let count = fired.clone();
        tracker.on_change(move |_| *count.lock().unwrap() += 1);
        sleep(ERROR_FADE * 2).await;

        assert_eq!(*fired.lock().unwrap(), 0);
    }

    #[test]
    fn test_seed_running_from_executions() {
        let tracker = ActivityTracker::new();
        tracker.seed_running(&[
            Execution {
                agent_id: Some("plan-agent".into()),
                scheduled_at: Some("2026-02-01T09:30:00Z".into()),
            },
            Execution {
                agent_id: Some("unknown".into()),
                scheduled_at: None,
            },
            Execution {
                agent_id: None,
                scheduled_at: None,
            },
        ]);

        assert_eq!(tracker.status("plan-agent"), Some(AgentStatus::Running));
        assert_eq!(
            tracker.since("plan-agent").unwrap().to_rfc3339(),
            "2026-02-01T09:30:00+00:00"
        );
        assert!(tracker.summary().contains("\u{2699} Plan"));
    }
}
