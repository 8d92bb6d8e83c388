//! View dispatch
//!
//! Maps the current `ViewKey` to a renderer and runs it against the shared
//! content region. A renderer that fails (returns `Err` or panics) never takes
//! the dashboard down: the failure is logged and the region shows
//! `Error rendering <view>: <message>` instead.

mod collection;
mod content;

pub use collection::{standard_views, CollectionView, IntakeView};
pub use content::{ContentRegion, ContentSnapshot};

use crate::api::ApiClient;
use crate::listeners::{panic_message, ListenerRegistry, Subscription};
use crate::state::{ChangeKind, StateStore, UiState, ViewKey};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, RwLock};

/// Everything a renderer gets to work with
pub struct ViewContext {
    /// State at the moment the render started
    pub state: UiState,
    pub content: ContentRegion,
    pub api: ApiClient,
}

/// Renders one view into the content region
pub trait View: Send + Sync {
    fn render<'a>(&'a self, ctx: &'a ViewContext) -> BoxFuture<'a, anyhow::Result<()>>;
}

pub struct ViewDispatcher {
    views: RwLock<HashMap<ViewKey, Arc<dyn View>>>,
    content: ContentRegion,
    api: ApiClient,
    // Renders run one at a time so a slow one can't land after a newer one
    render_lock: tokio::sync::Mutex<()>,
    rendered: ListenerRegistry<ContentSnapshot>,
}

impl ViewDispatcher {
    pub fn new(content: ContentRegion, api: ApiClient) -> Self {
        Self {
            views: RwLock::new(HashMap::new()),
            content,
            api,
            render_lock: tokio::sync::Mutex::new(()),
            rendered: ListenerRegistry::new("render"),
        }
    }

    /// Dispatcher with every built-in view registered
    pub fn with_standard_views(content: ContentRegion, api: ApiClient) -> Self {
        let dispatcher = Self::new(content, api);
        for (key, view) in standard_views() {
            dispatcher.register(key, view);
        }
        dispatcher
    }

    /// Register (or replace) the renderer for `key`
    pub fn register(&self, key: ViewKey, view: Arc<dyn View>) {
        self.views
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key, view);
    }

    pub fn content(&self) -> &ContentRegion {
        &self.content
    }

    /// Render whatever view the store currently points at
    pub async fn render_current(&self, store: &StateStore) {
        let _rendering = self.render_lock.lock().await;

        let state = store.get();
        let key = state.current_view;
        let view = self
            .views
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&key)
            .cloned();
        let Some(view) = view else {
            tracing::trace!("No renderer for view {}", key);
            return;
        };

        let ctx = ViewContext {
            state,
            content: self.content.clone(),
            api: self.api.clone(),
        };

        self.content.set_loading(true);
        // The call itself sits inside the caught future: a renderer may panic
        // before it ever hands back its future.
        let outcome = AssertUnwindSafe(async { view.render(&ctx).await })
            .catch_unwind()
            .await;
        let failure = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(format!("{:#}", e)),
            Err(panic) => Some(panic_message(panic.as_ref())),
        };
        if let Some(message) = failure {
            tracing::error!("View render error: {}: {}", key, message);
            self.content
                .set_error(format!("Error rendering {}: {}", key, message));
        }
        self.content.set_loading(false);
        self.rendered.emit(&self.content.snapshot());
    }

    /// Called with the finished content after every render, failed or not
    pub fn on_rendered(&self, f: impl Fn(&ContentSnapshot) + Send + Sync + 'static) -> Subscription {
        self.rendered.register(f)
    }

    /// Re-render on view and project changes
    pub fn attach(self: &Arc<Self>, store: &Arc<StateStore>) -> Subscription {
        let dispatcher = Arc::downgrade(self);
        let weak_store = Arc::downgrade(store);
        store.on_change(move |change| {
            if !matches!(change, ChangeKind::View | ChangeKind::Project) {
                return;
            }
            let (Some(dispatcher), Some(store)) = (dispatcher.upgrade(), weak_store.upgrade())
            else {
                return;
            };
            tokio::spawn(async move { dispatcher.render_current(&store).await });
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::MemoryStatePersistence;
    use std::time::Duration;
    use tokio::sync::mpsc;

    struct Failing;
    impl View for Failing {
        fn render<'a>(&'a self, _ctx: &'a ViewContext) -> BoxFuture<'a, anyhow::Result<()>> {
            Box::pin(async { anyhow::bail!("tickets endpoint exploded") })
        }
    }

    struct Panicking;
    impl View for Panicking {
        fn render<'a>(&'a self, _ctx: &'a ViewContext) -> BoxFuture<'a, anyhow::Result<()>> {
            Box::pin(async {
                let fail = true;
                if fail {
                    panic!("kaboom");
                }
                Ok(())
            })
        }
    }

    /// Panics while building its future, before anything is awaited
    struct PanicsOnCall;
    impl View for PanicsOnCall {
        fn render<'a>(&'a self, _ctx: &'a ViewContext) -> BoxFuture<'a, anyhow::Result<()>> {
            let empty: Vec<u32> = Vec::new();
            let first = empty[0];
            Box::pin(async move {
                tracing::trace!("unreachable {}", first);
                Ok(())
            })
        }
    }

    /// Records the view it rendered and whether loading was shown
    struct Probe(mpsc::UnboundedSender<(ViewKey, bool)>);
    impl View for Probe {
        fn render<'a>(&'a self, ctx: &'a ViewContext) -> BoxFuture<'a, anyhow::Result<()>> {
            Box::pin(async move {
                let loading = ctx.content.snapshot().loading;
                ctx.content.set_body(vec![format!("probe {}", ctx.state.current_view)]);
                let _ = self.0.send((ctx.state.current_view, loading));
                Ok(())
            })
        }
    }

    fn api() -> ApiClient {
        ApiClient::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap()
    }

    fn store(view: ViewKey) -> Arc<StateStore> {
        let state = UiState {
            current_view: view,
            ..UiState::default()
        };
        Arc::new(StateStore::new(state, Box::new(MemoryStatePersistence::default())))
    }

    #[tokio::test]
    async fn test_failed_render_shows_error_in_content() {
        let dispatcher = ViewDispatcher::new(ContentRegion::new(), api());
        dispatcher.register(ViewKey::Tickets, Arc::new(Failing));

        dispatcher.render_current(&store(ViewKey::Tickets)).await;

        let content = dispatcher.content().snapshot();
        assert_eq!(
            content.body,
            vec!["Error rendering tickets: tickets endpoint exploded".to_string()]
        );
        assert!(!content.loading);
    }

    #[tokio::test]
    async fn test_panicking_render_is_contained() {
        let dispatcher = ViewDispatcher::new(ContentRegion::new(), api());
        dispatcher.register(ViewKey::Blindspots, Arc::new(Panicking));

        dispatcher.render_current(&store(ViewKey::Blindspots)).await;

        let content = dispatcher.content().snapshot();
        assert_eq!(content.body, vec!["Error rendering blindspots: kaboom".to_string()]);
        assert!(!content.loading);
    }

    #[tokio::test]
    async fn test_render_call_that_panics_is_contained() {
        let dispatcher = Arc::new(ViewDispatcher::new(ContentRegion::new(), api()));
        dispatcher.register(ViewKey::Tickets, Arc::new(PanicsOnCall));
        let store = store(ViewKey::Intake);
        store.set_view(ViewKey::Tickets);

        let task = {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move { dispatcher.render_current(&store).await })
        };
        assert!(task.await.is_ok());

        let content = dispatcher.content().snapshot();
        assert!(!content.loading);
        assert_eq!(content.body.len(), 1);
        assert!(content.body[0].starts_with("Error rendering tickets: index out of bounds"));
    }

    #[tokio::test]
    async fn test_on_rendered_sees_final_content() {
        let dispatcher = ViewDispatcher::new(ContentRegion::new(), api());
        dispatcher.register(ViewKey::Tickets, Arc::new(Failing));
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen2 = seen.clone();
        dispatcher.on_rendered(move |content| seen2.lock().unwrap().push(content.clone()));

        dispatcher.render_current(&store(ViewKey::Tickets)).await;
        dispatcher.render_current(&store(ViewKey::Links)).await;

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(!seen[0].loading);
        assert!(seen[0].body[0].starts_with("Error rendering tickets"));
    }

    #[tokio::test]
    async fn test_unregistered_view_renders_nothing() {
        let content = ContentRegion::new();
        content.set_body(vec!["untouched".into()]);
        let dispatcher = ViewDispatcher::new(content, api());

        dispatcher.render_current(&store(ViewKey::Scheduler)).await;

        assert_eq!(dispatcher.content().snapshot().body, vec!["untouched".to_string()]);
    }

    #[tokio::test]
    async fn test_loading_flag_is_set_while_rendering() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let dispatcher = ViewDispatcher::new(ContentRegion::new(), api());
        dispatcher.register(ViewKey::Plans, Arc::new(Probe(tx)));

        dispatcher.render_current(&store(ViewKey::Plans)).await;

        assert_eq!(rx.recv().await, Some((ViewKey::Plans, true)));
        assert!(!dispatcher.content().snapshot().loading);
    }

    #[tokio::test]
    async fn test_attach_renders_on_view_and_project_changes_only() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let dispatcher = Arc::new(ViewDispatcher::new(ContentRegion::new(), api()));
        for key in ViewKey::ALL {
            dispatcher.register(key, Arc::new(Probe(tx.clone())));
        }
        let store = store(ViewKey::Intake);
        dispatcher.attach(&store);

        store.set_view(ViewKey::Tickets);
        let (view, _) = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(view, ViewKey::Tickets);

        store.increment_step();
        store.set_connected(true);
        store.set_project(Some("p-1".into()));
        let (view, _) = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(view, ViewKey::Tickets);

        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());
    }
}
