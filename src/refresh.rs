// Debounced refresher - coalesces bursts of data-change events into one refresh
//
// Every data event restarts a quiet-period timer. The refresh only runs once
// the stream has been quiet for the whole period. Anything that isn't a data
// event (status changes, acks, agent chatter) is ignored and leaves the timer
// alone.

use crate::events::SocketEvent;
use crate::listeners::Subscription;
use crate::socket::SocketClient;
use crate::timer::ReplaceableTimer;
use futures::future::BoxFuture;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Quiet period before a refresh fires
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(1500);

/// Whatever gets re-read when data changes
pub trait RefreshTarget: Send + Sync + 'static {
    fn refresh(&self) -> BoxFuture<'_, ()>;
}

struct Inner {
    target: Arc<dyn RefreshTarget>,
    quiet_period: Duration,
    timer: ReplaceableTimer,
    // Held for the whole refresh so two refreshes never overlap
    running: tokio::sync::Mutex<()>,
    refreshes: AtomicU64,
}

#[derive(Clone)]
pub struct DebouncedRefresher {
    inner: Arc<Inner>,
}

impl DebouncedRefresher {
    pub fn new(target: Arc<dyn RefreshTarget>, quiet_period: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                target,
                quiet_period,
                timer: ReplaceableTimer::new(),
                running: tokio::sync::Mutex::new(()),
                refreshes: AtomicU64::new(0),
            }),
        }
    }

    /// Feed every socket event through `handle_event`
    pub fn attach(&self, socket: &SocketClient) -> Subscription {
        let refresher = self.clone();
        socket.on_event(move |event| refresher.handle_event(event))
    }

    pub fn handle_event(&self, event: &SocketEvent) {
        let Some(domain) = event.domain_event() else {
            return;
        };
        if !domain.is_data_event() {
            return;
        }
        tracing::trace!(
            "{} received, refresh in {:?}",
            domain.event_type(),
            self.inner.quiet_period
        );
        self.schedule();
    }

    /// Number of refreshes started so far
    pub fn refresh_count(&self) -> u64 {
        self.inner.refreshes.load(Ordering::SeqCst)
    }

    /// Whether a refresh is waiting for the quiet period to end
    pub fn is_pending(&self) -> bool {
        self.inner.timer.is_pending()
    }

    pub fn cancel(&self) {
        self.inner.timer.cancel();
    }

    fn schedule(&self) {
        let inner = self.inner.clone();
        self.inner.timer.schedule(self.inner.quiet_period, move || async move {
            // Runs detached: a later event may abort the timer but never a
            // refresh that has already begun.
            tokio::spawn(async move {
                let _running = inner.running.lock().await;
                let n = inner.refreshes.fetch_add(1, Ordering::SeqCst) + 1;
                tracing::debug!("Refresh #{} after data change", n);
                inner.target.refresh().await;
            });
        });
    }
}
