// Listener registry - ordered observer list shared by the state store and socket
//
// Listeners are plain callbacks. They are called in registration order, one
// panicking listener never prevents the rest from running, and each
// registration hands back a `Subscription` that removes exactly that entry.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Entry<T> {
    id: u64,
    callback: Callback<T>,
}

struct Inner<T> {
    name: &'static str,
    next_id: AtomicU64,
    entries: Mutex<Vec<Entry<T>>>,
}

/// Insertion-ordered list of callbacks for values of type `T`
pub struct ListenerRegistry<T> {
    inner: Arc<Inner<T>>,
}

impl<T: 'static> ListenerRegistry<T> {
    /// Create an empty registry. `name` only shows up in logs.
    pub fn new(name: &'static str) -> Self {
        Self {
            inner: Arc::new(Inner {
                name,
                next_id: AtomicU64::new(1),
                entries: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Register a listener
    ///
    /// Registering the same closure twice creates two entries; both fire.
    pub fn register(&self, f: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock().push(Entry {
            id,
            callback: Arc::new(f),
        });

        let weak: Weak<Inner<T>> = Arc::downgrade(&self.inner);
        Subscription {
            remove: Mutex::new(Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    let mut entries = inner.entries.lock().unwrap_or_else(|e| e.into_inner());
                    entries.retain(|entry| entry.id != id);
                }
            }))),
        }
    }

    /// Deliver `value` to every registered listener
    ///
    /// The list is snapshotted first so listeners can register, unsubscribe or
    /// trigger nested emits without deadlocking.
    pub fn emit(&self, value: &T) {
        let snapshot: Vec<Callback<T>> = self
            .lock()
            .iter()
            .map(|entry| entry.callback.clone())
            .collect();

        for callback in snapshot {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| callback(value))) {
                tracing::error!(
                    "{} listener panicked: {}",
                    self.inner.name,
                    panic_message(panic.as_ref())
                );
            }
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Entry<T>>> {
        // A listener can't poison this lock (callbacks run unlocked), so
        // recovering the guard is always safe.
        self.inner
            .entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }
}

impl<T> Clone for ListenerRegistry<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// Handle returned by `register`
///
/// Dropping it keeps the listener registered; call `unsubscribe` to remove it.
pub struct Subscription {
    remove: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Subscription {
    /// Remove the listener this handle was returned for. Idempotent.
    pub fn unsubscribe(&self) {
        let remove = self
            .remove
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(remove) = remove {
            remove();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

/// Best-effort text of a panic payload
pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
