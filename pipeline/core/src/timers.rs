//! Timer Registry
//!
//! Every task the controller spawns (network calls, progress ticks, staged
//! labels, typing frames) is registered here. Teardown aborts all of them in a
//! single locked pass and marks the registry disposed, so a task registered
//! afterwards is aborted on arrival.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::AbortHandle;

static NEXT_TIMER_ID: AtomicU64 = AtomicU64::new(1);

/// Identifier of a registered task
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

impl TimerId {
    fn next() -> Self {
        Self(NEXT_TIMER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Default)]
struct Inner {
    handles: HashMap<TimerId, AbortHandle>,
    disposed: bool,
}

/// Shared disposal token for spawned tasks
#[derive(Clone, Default)]
pub struct TimerRegistry {
    inner: Arc<Mutex<Inner>>,
}

impl TimerRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a task and register it for cancellation
    pub fn spawn<F>(&self, future: F) -> TimerId
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let id = TimerId::next();
        let handle = tokio::spawn(future).abort_handle();

        let mut inner = self.inner.lock();
        if inner.disposed {
            handle.abort();
        } else {
            inner.handles.retain(|_, h| !h.is_finished());
            inner.handles.insert(id, handle);
        }
        id
    }

    /// Cancel one task; unknown or finished ids are a no-op
    pub fn cancel(&self, id: TimerId) {
        if let Some(handle) = self.inner.lock().handles.remove(&id) {
            handle.abort();
        }
    }

    /// Cancel everything and refuse further registrations
    pub fn dispose(&self) {
        let mut inner = self.inner.lock();
        inner.disposed = true;
        for (_, handle) in inner.handles.drain() {
            handle.abort();
        }
        tracing::debug!("Timer registry disposed");
    }

    /// Whether `dispose` has been called
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.inner.lock().disposed
    }

    /// Number of registered tasks that are still running
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.inner
            .lock()
            .handles
            .values()
            .filter(|h| !h.is_finished())
            .count()
    }
}

impl std::fmt::Debug for TimerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("TimerRegistry")
            .field("registered", &inner.handles.len())
            .field("disposed", &inner.disposed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::mpsc;

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_task() {
        let registry = TimerRegistry::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let id = registry.spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(100));
            loop {
                ticker.tick().await;
                if tx.send(()).is_err() {
                    break;
                }
            }
        });

        tokio::time::advance(Duration::from_millis(250)).await;
        tokio::task::yield_now().await;
        registry.cancel(id);
        tokio::task::yield_now().await;

        let mut seen = 0;
        while rx.try_recv().is_ok() {
            seen += 1;
        }
        assert!(seen >= 1);

        tokio::time::advance(Duration::from_millis(500)).await;
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());

        // Cancelling twice is harmless
        registry.cancel(id);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispose_aborts_everything_and_later_spawns() {
        let registry = TimerRegistry::new();
        let (tx, mut rx) = mpsc::unbounded_channel::<u32>();

        for n in 0..3 {
            let tx = tx.clone();
            registry.spawn(async move {
                tokio::time::sleep(Duration::from_secs(1)).await;
                let _ = tx.send(n);
            });
        }
        assert_eq!(registry.active_count(), 3);

        registry.dispose();
        assert!(registry.is_disposed());
        assert_eq!(registry.active_count(), 0);

        let late = tx.clone();
        registry.spawn(async move {
            let _ = late.send(99);
        });
        drop(tx);

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(rx.recv().await, None);
    }
}
