// Built-in views
//
// Every list view has the same shape: a heading, then one line per item of a
// REST collection. Only intake is static.

use super::{View, ViewContext};
use crate::api::Collection;
use crate::state::ViewKey;
use futures::future::BoxFuture;
use serde_json::Value;
use std::sync::Arc;

/// Fields tried, in order, for an item's display text
const TEXT_FIELDS: [&str; 7] = ["title", "name", "label", "summary", "text", "url", "message"];
const STATUS_FIELDS: [&str; 3] = ["status", "severity", "state"];

/// Lists one collection
pub struct CollectionView {
    pub title: &'static str,
    pub subtitle: &'static str,
    pub collection: Collection,
}

impl CollectionView {
    pub fn new(title: &'static str, subtitle: &'static str, collection: Collection) -> Self {
        Self {
            title,
            subtitle,
            collection,
        }
    }

    async fn render_into(&self, ctx: &ViewContext) -> anyhow::Result<()> {
        ctx.content.set_header(self.title, self.subtitle);

        let project = ctx.state.current_project_id.as_deref();
        if self.collection.is_project_scoped() && project.is_none() {
            ctx.content.set_body(vec!["Select a project first.".to_string()]);
            return Ok(());
        }

        let items = match ctx.api.list(self.collection, project).await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!("Loading {} failed: {:#}", self.collection.label(), e);
                ctx.content
                    .set_body(vec![format!("Could not load {}.", self.collection.label())]);
                return Ok(());
            }
        };

        if items.is_empty() {
            ctx.content
                .set_body(vec![format!("No {} yet.", self.collection.label())]);
        } else {
            ctx.content.set_body(items.iter().map(describe).collect());
        }
        Ok(())
    }
}

impl View for CollectionView {
    fn render<'a>(&'a self, ctx: &'a ViewContext) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(self.render_into(ctx))
    }
}

/// One-line summary of a list item: `[STATUS] text`
fn describe(item: &Value) -> String {
    let text = TEXT_FIELDS
        .iter()
        .find_map(|field| item.get(field).and_then(Value::as_str).filter(|s| !s.is_empty()))
        .map(str::to_string)
        .unwrap_or_else(|| match item {
            Value::String(s) => s.clone(),
            Value::Object(_) => "Untitled".to_string(),
            other => other.to_string(),
        });
    let status = STATUS_FIELDS
        .iter()
        .find_map(|field| item.get(field).and_then(Value::as_str).filter(|s| !s.is_empty()));

    match status {
        Some(status) => format!("[{}] {}", status, text),
        None => text,
    }
}

/// Static landing view
pub struct IntakeView;

impl View for IntakeView {
    fn render<'a>(&'a self, ctx: &'a ViewContext) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            ctx.content.set_header(
                "INTAKE",
                "Paste text or provide file paths. Agents organize into threads, ideas, plans, objectives, reminders, checklists, reconciliation.",
            );
            let project = ctx
                .state
                .current_project_id
                .as_deref()
                .unwrap_or("none selected");
            ctx.content.set_body(vec![
                "Ready for intake.".to_string(),
                format!("Project: {}", project),
            ]);
            Ok(())
        })
    }
}

/// The full navigation, one renderer per `ViewKey`
pub fn standard_views() -> Vec<(ViewKey, Arc<dyn View>)> {
    let list = |title, subtitle, collection| -> Arc<dyn View> {
        Arc::new(CollectionView::new(title, subtitle, collection))
    };
    vec![
        (ViewKey::Intake, Arc::new(IntakeView) as Arc<dyn View>),
        (
            ViewKey::Threads,
            list(
                "THREADS",
                "Threads are named + created by the Thread Agent from intake clustering (topic + continuity + dates).",
                Collection::Threads,
            ),
        ),
        (
            ViewKey::Tickets,
            list(
                "TICKETS",
                "All tickets for the current project.",
                Collection::Tickets,
            ),
        ),
        (
            ViewKey::Resources,
            list(
                "RESOURCES",
                "Team members, capacity, and availability.",
                Collection::Resources,
            ),
        ),
        (
            ViewKey::Objectives,
            list(
                "OBJECTIVES",
                "Sprint objectives with coverage + unmapped tickets.",
                Collection::Objectives,
            ),
        ),
        (
            ViewKey::SprintHealth,
            list(
                "SPRINT HEALTH",
                "Sprint-by-sprint objective coverage, ticket breakdown, and risk signals.",
                Collection::Objectives,
            ),
        ),
        (
            ViewKey::Plans,
            list(
                "PLANS",
                "Phases generated from threads + milestones by the Plan Agent.",
                Collection::Phases,
            ),
        ),
        (
            ViewKey::Reminders,
            list(
                "REMINDERS",
                "Schedules extracted from intake + milestones.",
                Collection::Reminders,
            ),
        ),
        (
            ViewKey::Checklists,
            list(
                "CHECKLISTS",
                "ORR/release checklists generated from plan phases.",
                Collection::Checklists,
            ),
        ),
        (
            ViewKey::Reconcile,
            list(
                "RECONCILE",
                "Objectives \u{2194} milestones \u{2194} ticket dump alignment.",
                Collection::Reconciliations,
            ),
        ),
        (
            ViewKey::Blindspots,
            list(
                "BLINDSPOTS",
                "Risks, gaps, and issues detected by the Reconcile Agent.",
                Collection::Blindspots,
            ),
        ),
        (
            ViewKey::Links,
            list(
                "LINKHUB",
                "Important links organized by category.",
                Collection::Links,
            ),
        ),
        (
            ViewKey::Scheduler,
            list(
                "SCHEDULER",
                "Scheduled agent runs and execution history.",
                Collection::Schedules,
            ),
        ),
    ]
}
