//! REST client for the dashboard server
//!
//! Read-only: views, nav badges and the refresh path only ever list things.
//! Any non-2xx response is an error naming the method, path and status. A 204
//! or an empty body means "nothing here".

use anyhow::{Context, Result};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// Default timeout for every request
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

// ─────────────────────────────────────────────────────────────────────────────
// Collections
// ─────────────────────────────────────────────────────────────────────────────

/// List endpoints the dashboard reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    // Project-scoped: /api/projects/{id}/<segment>
    Threads,
    Tickets,
    Objectives,
    Phases,
    Checklists,
    Links,
    Reminders,
    Blindspots,
    Reconciliations,
    DeltaPacks,
    Memories,
    // Global: /api/<segment>
    Resources,
    Schedules,
    Sessions,
    Agents,
}

impl Collection {
    /// Last path segment
    pub fn segment(&self) -> &'static str {
        match self {
            Collection::Threads => "threads",
            Collection::Tickets => "tickets",
            Collection::Objectives => "objectives",
            Collection::Phases => "phases",
            Collection::Checklists => "checklists",
            Collection::Links => "links",
            Collection::Reminders => "reminders",
            Collection::Blindspots => "blindspots",
            Collection::Reconciliations => "reconciliations",
            Collection::DeltaPacks => "delta-packs",
            Collection::Memories => "memories",
            Collection::Resources => "resources",
            Collection::Schedules => "schedules",
            Collection::Sessions => "sessions",
            Collection::Agents => "agents",
        }
    }

    /// Human label used in headings and error text
    pub fn label(&self) -> &'static str {
        match self {
            Collection::Threads => "threads",
            Collection::Tickets => "tickets",
            Collection::Objectives => "objectives",
            Collection::Phases => "phases",
            Collection::Checklists => "checklists",
            Collection::Links => "links",
            Collection::Reminders => "reminders",
            Collection::Blindspots => "blindspots",
            Collection::Reconciliations => "reconciliations",
            Collection::DeltaPacks => "delta packs",
            Collection::Memories => "memories",
            Collection::Resources => "resources",
            Collection::Schedules => "schedules",
            Collection::Sessions => "sessions",
            Collection::Agents => "agents",
        }
    }

    pub fn is_project_scoped(&self) -> bool {
        !matches!(
            self,
            Collection::Resources | Collection::Schedules | Collection::Sessions | Collection::Agents
        )
    }

    fn path_segments<'a>(&self, project: Option<&'a str>) -> Result<Vec<&'a str>> {
        if self.is_project_scoped() {
            let project = project.with_context(|| format!("listing {} needs a project", self.label()))?;
            Ok(vec!["api", "projects", project, self.segment()])
        } else {
            Ok(vec!["api", self.segment()])
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Response types
// ─────────────────────────────────────────────────────────────────────────────

/// Entry of `GET /api/projects`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub project_id: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl ProjectSummary {
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.project_id)
    }
}

/// LLM usage counters behind the token status line
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LlmMetrics {
    pub recent_tokens: u64,
    pub total_interactions: u64,
    pub total_messages: u64,
    pub avg_duration_ms: Option<f64>,
}

impl LlmMetrics {
    pub fn status_line(&self) -> String {
        format!(
            "\u{1FA99} {} tok | {} msgs | {} calls | avg {}ms",
            self.recent_tokens,
            self.total_messages,
            self.total_interactions,
            self.avg_duration_ms.map(|ms| ms.round() as u64).unwrap_or(0)
        )
    }
}

/// Badge text when the server has no usable LLM provider
pub const NO_KEY: &str = "NO KEY";

#[derive(Debug, Clone, Default, Deserialize)]
struct ProviderInfo {
    #[serde(default)]
    provider: Option<String>,
}

/// Provider badge text. `None` means the lookup failed.
pub fn provider_badge(provider: Option<&str>) -> String {
    let provider = provider.map(str::trim).unwrap_or("");
    let lower = provider.to_lowercase();
    if provider.is_empty() || lower.contains("no api key") || lower.contains("none") {
        NO_KEY.to_string()
    } else {
        provider.to_string()
    }
}

/// Scheduled or running agent execution
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Execution {
    #[serde(default)]
    pub agent_id: Option<String>,
    #[serde(default)]
    pub scheduled_at: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base: Url,
}

impl ApiClient {
    pub fn new(base: &str, timeout: Duration) -> Result<Self> {
        let base = Url::parse(base).with_context(|| format!("Invalid server URL '{}'", base))?;
        if base.cannot_be_a_base() {
            anyhow::bail!("Server URL '{}' cannot be used as a base", base);
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// List a collection. Accepts a bare array or a paginated `{content: [...]}` page.
    pub async fn list(&self, collection: Collection, project: Option<&str>) -> Result<Vec<Value>> {
        let url = self.url(&collection.path_segments(project)?)?;
        let body = self.get_json(url).await?;
        into_items(body).with_context(|| format!("Unexpected {} response", collection.label()))
    }

    pub async fn projects(&self) -> Result<Vec<ProjectSummary>> {
        let url = self.url(&["api", "projects"])?;
        let items = into_items(self.get_json(url).await?)?;
        items
            .into_iter()
            .map(|item| serde_json::from_value(item).context("Malformed project entry"))
            .collect()
    }

    pub async fn metrics(&self) -> Result<LlmMetrics> {
        let url = self.url(&["api", "logs", "llm-interactions", "metrics"])?;
        match self.get_json(url).await? {
            Some(value) => serde_json::from_value(value).context("Malformed metrics response"),
            None => Ok(LlmMetrics::default()),
        }
    }

    /// Name of the LLM provider the server is configured with
    pub async fn provider(&self) -> Result<String> {
        let url = self.url(&["api", "config", "provider"])?;
        let info: ProviderInfo = match self.get_json(url).await? {
            Some(value) => serde_json::from_value(value).context("Malformed provider response")?,
            None => ProviderInfo::default(),
        };
        Ok(info.provider.unwrap_or_default())
    }

    /// Executions currently running, used to seed the activity tracker
    pub async fn running_executions(&self) -> Result<Vec<Execution>> {
        let mut url = self.url(&["api", "executions", "future"])?;
        url.query_pairs_mut().append_pair("execStatus", "RUNNING");
        into_items(self.get_json(url).await?)?
            .into_iter()
            .map(|item| serde_json::from_value(item).context("Malformed execution entry"))
            .collect()
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.set_query(None);
        url.set_fragment(None);
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("Server URL '{}' cannot be used as a base", self.base))?
            .clear()
            .extend(segments);
        Ok(url)
    }

    /// GET returning `None` for 204 or an empty body
    async fn get_json(&self, url: Url) -> Result<Option<Value>> {
        let path = url.path().to_string();
        tracing::trace!("GET {}", path);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("GET {} failed", path))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("GET {} -> {}", path, status.as_u16());
        }
        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let text = response
            .text()
            .await
            .with_context(|| format!("GET {}: failed to read body", path))?;
        if text.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&text)
            .map(Some)
            .with_context(|| format!("GET {}: invalid JSON", path))
    }
}

fn into_items(body: Option<Value>) -> Result<Vec<Value>> {
    match body {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items),
        Some(Value::Object(mut page)) => match page.remove("content") {
            Some(Value::Array(items)) => Ok(items),
            _ => anyhow::bail!("expected a list or a page with `content`"),
        },
        Some(_) => anyhow::bail!("expected a list or a page with `content`"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Path;
    use axum::http::StatusCode as HttpStatus;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;

    async fn serve(router: Router) -> ApiClient {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
        ApiClient::new(&format!("http://{}", addr), Duration::from_secs(5)).unwrap()
    }

    fn router() -> Router {
        Router::new()
            .route(
                "/api/projects",
                get(|| async {
                    Json(json!([
                        {"projectId": "p-1", "name": "Apollo"},
                        {"projectId": "p-2"}
                    ]))
                }),
            )
            .route(
                "/api/projects/:pid/tickets",
                get(|Path(pid): Path<String>| async move {
                    Json(json!([{"ticketId": "t-1", "projectId": pid}]))
                }),
            )
            .route(
                "/api/schedules",
                get(|| async { Json(json!({"content": [{"enabled": true}], "totalElements": 1})) }),
            )
            .route("/api/resources", get(|| async { HttpStatus::NO_CONTENT }))
            .route(
                "/api/agents",
                get(|| async { (HttpStatus::INTERNAL_SERVER_ERROR, "boom") }),
            )
            .route(
                "/api/logs/llm-interactions/metrics",
                get(|| async {
                    Json(json!({"recentTokens": 1200, "totalInteractions": 4, "totalMessages": 9, "avgDurationMs": 812.6}))
                }),
            )
            .route(
                "/api/config/provider",
                get(|| async { Json(json!({"provider": "Anthropic (claude-sonnet)"})) }),
            )
            .route(
                "/api/executions/future",
                get(|| async { Json(json!([{"agentId": "pm", "scheduledAt": "2026-01-01T00:00:00Z"}])) }),
            )
    }

    #[tokio::test]
    async fn test_projects_and_display_names() {
        let api = serve(router()).await;
        let projects = api.projects().await.unwrap();

        assert_eq!(projects.len(), 2);
        assert_eq!(projects[0].display_name(), "Apollo");
        assert_eq!(projects[1].display_name(), "p-2");
    }

    #[tokio::test]
    async fn test_project_scoped_list_encodes_id() {
        let api = serve(router()).await;
        let tickets = api.list(Collection::Tickets, Some("My Project")).await.unwrap();

        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0]["projectId"], "My Project");
    }

    #[tokio::test]
    async fn test_project_scoped_list_without_project_is_an_error() {
        let api = serve(router()).await;
        let err = api.list(Collection::Tickets, None).await.unwrap_err();
        assert!(err.to_string().contains("needs a project"));
    }

    #[tokio::test]
    async fn test_paginated_envelope_and_no_content() {
        let api = serve(router()).await;

        let schedules = api.list(Collection::Schedules, None).await.unwrap();
        assert_eq!(schedules, vec![json!({"enabled": true})]);

        let resources = api.list(Collection::Resources, None).await.unwrap();
        assert!(resources.is_empty());
    }

    #[tokio::test]
    async fn test_non_success_status_is_an_error() {
        let api = serve(router()).await;

        let err = api.list(Collection::Agents, None).await.unwrap_err();
        assert_eq!(err.to_string(), "GET /api/agents -> 500");

        let missing = api.list(Collection::Sessions, None).await.unwrap_err();
        assert_eq!(missing.to_string(), "GET /api/sessions -> 404");
    }

    #[tokio::test]
    async fn test_metrics_status_line() {
        let api = serve(router()).await;
        let metrics = api.metrics().await.unwrap();

        assert_eq!(metrics.recent_tokens, 1200);
        assert_eq!(
            metrics.status_line(),
            "\u{1FA99} 1200 tok | 9 msgs | 4 calls | avg 813ms"
        );
        assert_eq!(
            LlmMetrics::default().status_line(),
            "\u{1FA99} 0 tok | 0 msgs | 0 calls | avg 0ms"
        );
    }

    #[tokio::test]
    async fn test_running_executions() {
        let api = serve(router()).await;
        let running = api.running_executions().await.unwrap();
        assert_eq!(running[0].agent_id.as_deref(), Some("pm"));
    }

    #[tokio::test]
    async fn test_provider_badge() {
        let api = serve(router()).await;
        let provider = api.provider().await.unwrap();
        assert_eq!(provider_badge(Some(&provider)), "Anthropic (claude-sonnet)");

        let keyless = serve(Router::new().route(
            "/api/config/provider",
            get(|| async { Json(json!({"provider": "No API key configured"})) }),
        ))
        .await;
        let provider = keyless.provider().await.unwrap();
        assert_eq!(provider_badge(Some(&provider)), NO_KEY);

        let missing = serve(Router::new()).await;
        assert!(missing.provider().await.is_err());
        assert_eq!(provider_badge(None), NO_KEY);
    }

    #[test]
    fn test_provider_badge_text() {
        assert_eq!(provider_badge(Some("")), NO_KEY);
        assert_eq!(provider_badge(Some("None")), NO_KEY);
        assert_eq!(provider_badge(Some(" OpenAI ")), "OpenAI");
    }

    #[test]
    fn test_into_items_rejects_scalars() {
        assert!(into_items(Some(json!(3))).is_err());
        assert!(into_items(Some(json!({"items": []}))).is_err());
        assert!(into_items(Some(Value::Null)).unwrap().is_empty());
    }
}
