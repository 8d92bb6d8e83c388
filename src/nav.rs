// Navigation badges - one short label per view, derived from collection sizes
//
// Most views show a plain count. A few show a marker instead: intake is always
// READY, sprint health shows a heart once objectives exist, reconcile shows a
// delta once reconciliations exist, and the scheduler only counts enabled
// schedules.

use crate::api::{ApiClient, Collection};
use crate::state::ViewKey;
use futures::future::join_all;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::RwLock;

/// Collections the badges are computed from
pub const BADGE_SOURCES: [Collection; 11] = [
    Collection::Threads,
    Collection::Tickets,
    Collection::Resources,
    Collection::Objectives,
    Collection::Phases,
    Collection::Reminders,
    Collection::Checklists,
    Collection::Links,
    Collection::Reconciliations,
    Collection::Blindspots,
    Collection::Schedules,
];

pub type CollectionCounts = HashMap<Collection, Vec<Value>>;

#[derive(Default)]
pub struct NavBadges {
    badges: RwLock<HashMap<ViewKey, String>>,
}

impl NavBadges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Badge text for every view
    pub fn compute(counts: &CollectionCounts) -> HashMap<ViewKey, String> {
        let len = |c: Collection| counts.get(&c).map(Vec::len).unwrap_or(0);
        let marker = |c: Collection, symbol: &str| {
            if len(c) > 0 {
                symbol.to_string()
            } else {
                "0".to_string()
            }
        };
        let enabled_schedules = counts
            .get(&Collection::Schedules)
            .map(|items| {
                items
                    .iter()
                    .filter(|s| s.get("enabled").and_then(Value::as_bool) == Some(true))
                    .count()
            })
            .unwrap_or(0);

        HashMap::from([
            (ViewKey::Intake, "READY".to_string()),
            (ViewKey::Threads, len(Collection::Threads).to_string()),
            (ViewKey::Tickets, len(Collection::Tickets).to_string()),
            (ViewKey::Resources, len(Collection::Resources).to_string()),
            (ViewKey::Objectives, len(Collection::Objectives).to_string()),
            (ViewKey::SprintHealth, marker(Collection::Objectives, "\u{2661}")),
            (ViewKey::Plans, len(Collection::Phases).to_string()),
            (ViewKey::Reminders, len(Collection::Reminders).to_string()),
            (ViewKey::Checklists, len(Collection::Checklists).to_string()),
            (ViewKey::Links, len(Collection::Links).to_string()),
            (ViewKey::Reconcile, marker(Collection::Reconciliations, "\u{0394}")),
            (ViewKey::Blindspots, len(Collection::Blindspots).to_string()),
            (ViewKey::Scheduler, enabled_schedules.to_string()),
        ])
    }

    /// Load every badge source concurrently. A failed fetch counts as empty.
    pub async fn fetch_counts(api: &ApiClient, project_id: &str) -> CollectionCounts {
        let fetches = BADGE_SOURCES.iter().map(|&collection| async move {
            let items = match api.list(collection, Some(project_id)).await {
                Ok(items) => items,
                Err(e) => {
                    tracing::debug!("Badge source {} unavailable: {:#}", collection.label(), e);
                    Vec::new()
                }
            };
            (collection, items)
        });
        join_all(fetches).await.into_iter().collect()
    }

    /// Recompute from the server. Without a project the badges are left alone.
    pub async fn refresh(&self, api: &ApiClient, project_id: Option<&str>) {
        let Some(project_id) = project_id else {
            return;
        };
        let counts = Self::fetch_counts(api, project_id).await;
        let badges = Self::compute(&counts);
        *self.badges.write().unwrap_or_else(|e| e.into_inner()) = badges;
        tracing::debug!("Nav badges: {}", self.summary());
    }

    pub fn get(&self, view: ViewKey) -> Option<String> {
        self.badges
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&view)
            .cloned()
    }

    /// `Label badge` pairs in navigation order
    pub fn summary(&self) -> String {
        ViewKey::ALL
            .iter()
            .filter_map(|view| self.get(*view).map(|badge| format!("{} {}", view.label(), badge)))
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;
    use std::time::Duration;

    fn items(n: usize) -> Vec<Value> {
        (0..n).map(|i| json!({"id": i})).collect()
    }

    #[test]
    fn test_compute_counts_and_markers() {
        let counts: CollectionCounts = HashMap::from([
            (Collection::Threads, items(3)),
            (Collection::Tickets, items(5)),
            (Collection::Objectives, items(2)),
            (Collection::Phases, items(1)),
            (Collection::Reconciliations, items(0)),
            (
                Collection::Schedules,
                vec![
                    json!({"enabled": true}),
                    json!({"enabled": false}),
                    json!({"enabled": true}),
                    json!({}),
                ],
            ),
        ]);

        let badges = NavBadges::compute(&counts);

        assert_eq!(badges.len(), ViewKey::ALL.len());
        assert_eq!(badges[&ViewKey::Intake], "READY");
        assert_eq!(badges[&ViewKey::Threads], "3");
        assert_eq!(badges[&ViewKey::Tickets], "5");
        assert_eq!(badges[&ViewKey::Objectives], "2");
        assert_eq!(badges[&ViewKey::SprintHealth], "\u{2661}");
        assert_eq!(badges[&ViewKey::Plans], "1");
        assert_eq!(badges[&ViewKey::Reconcile], "0");
        assert_eq!(badges[&ViewKey::Resources], "0");
        assert_eq!(badges[&ViewKey::Scheduler], "2");
    }

    #[test]
    fn test_empty_objectives_and_reconciliations() {
        let counts: CollectionCounts = HashMap::from([(Collection::Reconciliations, items(4))]);
        let badges = NavBadges::compute(&counts);
        assert_eq!(badges[&ViewKey::SprintHealth], "0");
        assert_eq!(badges[&ViewKey::Reconcile], "\u{0394}");
    }

    #[tokio::test]
    async fn test_refresh_treats_failed_fetches_as_empty() {
        let router = Router::new()
            .route(
                "/api/projects/:pid/tickets",
                get(|| async { Json(json!([{"id": 1}, {"id": 2}])) }),
            )
            .route("/api/schedules", get(|| async { Json(json!([{"enabled": true}])) }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
        let api = ApiClient::new(&format!("http://{}", addr), Duration::from_secs(5)).unwrap();

        let badges = NavBadges::new();
        badges.refresh(&api, None).await;
        assert_eq!(badges.get(ViewKey::Tickets), None);

        badges.refresh(&api, Some("p-1")).await;
        assert_eq!(badges.get(ViewKey::Tickets).as_deref(), Some("2"));
        assert_eq!(badges.get(ViewKey::Threads).as_deref(), Some("0"));
        assert_eq!(badges.get(ViewKey::Scheduler).as_deref(), Some("1"));
        assert!(badges.summary().starts_with("Intake READY | Threads 0 | Tickets 2"));
    }
}
