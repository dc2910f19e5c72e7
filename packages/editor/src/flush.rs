//! # Debounced Updates
//!
//! Form edits are pushed into the tree on a trailing-edge debounce: each
//! trigger replaces the pending value and restarts the timer, and only the
//! last value is delivered once the timer expires.
//!
//! A pending value must not be lost when the surrounding UI changes (a
//! panel closes, the selection moves). Every debounced update therefore
//! registers a flush function with the session's [`FlushRegistry`];
//! `flush_all` delivers whatever is still pending, synchronously.
//!
//! ```text
//! trigger(A) ──┐
//! trigger(B) ──┼─▶ pending = C ──(delay)──▶ callback(C)
//! trigger(C) ──┘        │
//!                       └── flush_all() ──▶ callback(C) now
//! ```
//!
//! Dropping a [`DebouncedUpdate`] unregisters it without flushing. Callers
//! that need the value must flush before letting it go.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

pub const DEFAULT_FLUSH_DELAY: Duration = Duration::from_millis(500);

pub type FlushFn = Arc<dyn Fn() + Send + Sync>;

/// Lock a mutex, recovering the data if a callback panicked while holding it
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Session-scoped set of flush functions keyed by id
#[derive(Clone, Default)]
pub struct FlushRegistry {
    entries: Arc<Mutex<HashMap<String, FlushFn>>>,
}

impl FlushRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a flush function; an existing entry with the same id is replaced
    pub fn register(&self, id: impl Into<String>, flush: impl Fn() + Send + Sync + 'static) {
        self.register_fn(id.into(), Arc::new(flush));
    }

    pub(crate) fn register_fn(&self, id: String, flush: FlushFn) {
        if lock(&self.entries).insert(id.clone(), flush).is_some() {
            trace!(id = %id, "Replaced flush function");
        }
    }

    pub fn unregister(&self, id: &str) -> bool {
        lock(&self.entries).remove(id).is_some()
    }

    /// Remove `id` only if it still maps to `flush`
    pub(crate) fn unregister_fn(&self, id: &str, flush: &FlushFn) -> bool {
        let mut entries = lock(&self.entries);
        match entries.get(id) {
            Some(current) if Arc::ptr_eq(current, flush) => {
                entries.remove(id);
                true
            }
            _ => false,
        }
    }

    /// Run every registered flush function; returns how many ran
    ///
    /// The functions are called outside the registry lock, so a flush may
    /// register or unregister entries.
    pub fn flush_all(&self) -> usize {
        let flushes: Vec<FlushFn> = lock(&self.entries).values().cloned().collect();
        for flush in &flushes {
            flush();
        }
        if !flushes.is_empty() {
            debug!(count = flushes.len(), "Flushed pending updates");
        }
        flushes.len()
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.entries).is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        lock(&self.entries).contains_key(id)
    }
}

impl fmt::Debug for FlushRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<String> = lock(&self.entries).keys().cloned().collect();
        ids.sort();
        f.debug_struct("FlushRegistry").field("ids", &ids).finish()
    }
}

struct PendingState<T> {
    pending: Option<T>,
    /// Bumped on every trigger, flush and cancel; a timer only fires if
    /// the generation it was started with is still current
    generation: u64,
    timer: Option<JoinHandle<()>>,
}

type Callback<T> = Arc<dyn Fn(T) + Send + Sync>;

/// Trailing-edge debounce around a callback
pub struct DebouncedUpdate<T: Send + 'static> {
    id: String,
    inner: Arc<Mutex<PendingState<T>>>,
    callback: Callback<T>,
    delay: Duration,
    registry: FlushRegistry,
    flush: FlushFn,
}

impl<T: Send + 'static> DebouncedUpdate<T> {
    pub fn new(
        id: impl Into<String>,
        delay: Duration,
        registry: &FlushRegistry,
        callback: impl Fn(T) + Send + Sync + 'static,
    ) -> Self {
        let id = id.into();
        let inner = Arc::new(Mutex::new(PendingState {
            pending: None,
            generation: 0,
            timer: None,
        }));
        let callback: Callback<T> = Arc::new(callback);

        let flush: FlushFn = {
            let inner = inner.clone();
            let callback = callback.clone();
            Arc::new(move || {
                fire(&inner, &callback);
            })
        };
        registry.register_fn(id.clone(), flush.clone());

        Self {
            id,
            inner,
            callback,
            delay,
            registry: registry.clone(),
            flush,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Replace the pending value and restart the timer
    ///
    /// Outside a tokio runtime no timer can be started; the value stays
    /// pending until [`execute_update`](Self::execute_update) or a registry
    /// flush delivers it.
    pub fn trigger(&self, value: T) {
        let mut state = lock(&self.inner);
        state.pending = Some(value);
        state.generation = state.generation.wrapping_add(1);
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }

        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!(id = %self.id, "No async runtime; update stays pending until flushed");
                return;
            }
        };

        let generation = state.generation;
        let inner = self.inner.clone();
        let callback = self.callback.clone();
        // Measured from the trigger, not from the task's first poll
        let deadline = tokio::time::Instant::now() + self.delay;

        state.timer = Some(handle.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let value = {
                let mut state = lock(&inner);
                if state.generation != generation {
                    return;
                }
                state.timer = None;
                state.pending.take()
            };
            if let Some(value) = value {
                callback(value);
            }
        }));
    }

    /// Deliver the pending value now; returns false if nothing was pending
    pub fn execute_update(&self) -> bool {
        fire(&self.inner, &self.callback)
    }

    pub fn has_pending(&self) -> bool {
        lock(&self.inner).pending.is_some()
    }

    /// Drop the pending value without delivering it
    pub fn cancel(&self) {
        let mut state = lock(&self.inner);
        state.pending = None;
        state.generation = state.generation.wrapping_add(1);
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
    }
}

fn fire<T>(inner: &Mutex<PendingState<T>>, callback: &Callback<T>) -> bool {
    let value = {
        let mut state = lock(inner);
        state.generation = state.generation.wrapping_add(1);
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        state.pending.take()
    };
    match value {
        Some(value) => {
            callback(value);
            true
        }
        None => false,
    }
}

impl<T: Send + 'static> Drop for DebouncedUpdate<T> {
    fn drop(&mut self) {
        self.registry.unregister_fn(&self.id, &self.flush);
        let mut state = lock(&self.inner);
        if state.pending.take().is_some() {
            debug!(id = %self.id, "Discarding unflushed update");
        }
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
    }
}

impl<T: Send + 'static> fmt::Debug for DebouncedUpdate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DebouncedUpdate")
            .field("id", &self.id)
            .field("delay", &self.delay)
            .field("pending", &self.has_pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(String) + Send + Sync + 'static) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = calls.clone();
        (calls, move |value: String| lock(&sink).push(value))
    }

    #[test]
    fn test_registry_register_and_flush() {
        let registry = FlushRegistry::new();
        let count = Arc::new(AtomicUsize::new(0));

        for id in ["a", "b"] {
            let count = count.clone();
            registry.register(id, move || {
                count.fetch_add(1, Ordering::SeqCst);
            });
        }

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.flush_all(), 2);
        assert_eq!(count.load(Ordering::SeqCst), 2);

        assert!(registry.unregister("a"));
        assert!(!registry.unregister("a"));
        assert!(!registry.contains("a"));
        assert!(registry.contains("b"));
    }

    #[test]
    fn test_without_runtime_value_stays_pending() {
        let registry = FlushRegistry::new();
        let (calls, callback) = recorder();
        let update = DebouncedUpdate::new("form", DEFAULT_FLUSH_DELAY, &registry, callback);

        update.trigger("A".to_string());
        update.trigger("B".to_string());
        assert!(update.has_pending());
        assert!(lock(&calls).is_empty());

        assert_eq!(registry.flush_all(), 1);
        assert_eq!(*lock(&calls), vec!["B".to_string()]);
        assert!(!update.has_pending());
    }

    #[test]
    fn test_execute_update_without_pending_is_a_no_op() {
        let registry = FlushRegistry::new();
        let (calls, callback) = recorder();
        let update = DebouncedUpdate::new("form", DEFAULT_FLUSH_DELAY, &registry, callback);

        assert!(!update.execute_update());
        assert!(lock(&calls).is_empty());
    }

    #[test]
    fn test_cancel_discards_value() {
        let registry = FlushRegistry::new();
        let (calls, callback) = recorder();
        let update = DebouncedUpdate::new("form", DEFAULT_FLUSH_DELAY, &registry, callback);

        update.trigger("A".to_string());
        update.cancel();
        registry.flush_all();

        assert!(lock(&calls).is_empty());
    }

    #[test]
    fn test_drop_unregisters_without_flushing() {
        let registry = FlushRegistry::new();
        let (calls, callback) = recorder();
        let update = DebouncedUpdate::new("form", DEFAULT_FLUSH_DELAY, &registry, callback);

        update.trigger("A".to_string());
        drop(update);

        assert!(registry.is_empty());
        assert_eq!(registry.flush_all(), 0);
        assert!(lock(&calls).is_empty());
    }

    #[test]
    fn test_dropping_replaced_update_keeps_new_registration() {
        let registry = FlushRegistry::new();
        let (_, first_cb) = recorder();
        let (calls, second_cb) = recorder();

        let first = DebouncedUpdate::new("form", DEFAULT_FLUSH_DELAY, &registry, first_cb);
        let second = DebouncedUpdate::new("form", DEFAULT_FLUSH_DELAY, &registry, second_cb);
        drop(first);

        assert!(registry.contains("form"));
        second.trigger("B".to_string());
        registry.flush_all();
        assert_eq!(*lock(&calls), vec!["B".to_string()]);
    }
}
