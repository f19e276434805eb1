//! Completion tracking for the effects spawned by one action.

use crate::StoreError;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::watch;

/// Awaitable view of the effects started by one [`Store::send`](crate::Store::send).
///
/// An effect counts as finished once the action it fed back has itself been
/// reduced, so after [`wait`](Self::wait) returns the state reflects it.
///
/// ```ignore
/// let mut handle = store.send(Action::Start).await?;
/// handle.wait_with_timeout(Duration::from_secs(5)).await?;
/// ```
#[derive(Clone)]
pub struct EffectHandle {
    in_flight: Arc<AtomicUsize>,
    idle: watch::Receiver<()>,
}

impl EffectHandle {
    /// A handle paired with the tracker the executor updates
    pub(crate) fn tracked() -> (Self, Tracker) {
        let tracker = Tracker::new();
        let handle = Self {
            in_flight: Arc::clone(&tracker.in_flight),
            idle: tracker.idle.subscribe(),
        };
        (handle, tracker)
    }

    /// A handle with nothing to wait for
    #[must_use]
    pub fn completed() -> Self {
        let (handle, tracker) = Self::tracked();
        tracker.idle.send_replace(());
        handle
    }

    /// Effects of this action that have not finished yet
    #[must_use]
    pub fn pending(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Resolve once every effect of this action has finished
    pub async fn wait(&mut self) {
        wait_idle(&self.in_flight, &mut self.idle).await;
    }

    /// [`wait`](Self::wait), bounded by `timeout`
    ///
    /// # Errors
    ///
    /// [`StoreError::Timeout`] if effects are still running at the deadline.
    pub async fn wait_with_timeout(&mut self, timeout: Duration) -> Result<(), StoreError> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| StoreError::Timeout)
    }
}

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("pending", &self.pending())
            .finish_non_exhaustive()
    }
}

/// Executor side of an [`EffectHandle`]
#[derive(Clone)]
pub(crate) struct Tracker {
    in_flight: Arc<AtomicUsize>,
    idle: Arc<watch::Sender<()>>,
}

impl Tracker {
    pub(crate) fn new() -> Self {
        let (idle, _) = watch::channel(());
        Self {
            in_flight: Arc::new(AtomicUsize::new(0)),
            idle: Arc::new(idle),
        }
    }

    /// Resolve once nothing registered on this tracker is running
    pub(crate) async fn settled(&self) {
        let mut idle = self.idle.subscribe();
        wait_idle(&self.in_flight, &mut idle).await;
    }

    fn enter(&self) {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
    }

    fn leave(&self) {
        if self.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.send_replace(());
        }
    }
}

async fn wait_idle(in_flight: &AtomicUsize, idle: &mut watch::Receiver<()>) {
    while in_flight.load(Ordering::SeqCst) > 0 {
        if idle.changed().await.is_err() {
            // sender dropped, nothing can finish anymore
            break;
        }
    }
}

/// Held by a spawned effect task; released even if the task panics.
///
/// The store-wide count drops before the per-action tracker, so a caller
/// woken by its handle never observes the effect as still pending globally.
pub(crate) struct EffectGuard {
    store_wide: Arc<AtomicUsize>,
    tracker: Tracker,
}

impl EffectGuard {
    pub(crate) fn enter(store_wide: &Arc<AtomicUsize>, tracker: &Tracker) -> Self {
        tracker.enter();
        store_wide.fetch_add(1, Ordering::SeqCst);
        Self {
            store_wide: Arc::clone(store_wide),
            tracker: tracker.clone(),
        }
    }
}

impl Drop for EffectGuard {
    fn drop(&mut self) {
        self.store_wide.fetch_sub(1, Ordering::SeqCst);
        self.tracker.leave();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_completed_handle_does_not_block() -> Result<(), StoreError> {
        let mut handle = EffectHandle::completed();
        assert_eq!(handle.pending(), 0);
        handle.wait_with_timeout(Duration::from_millis(10)).await
    }

    #[tokio::test]
    async fn test_guard_release_wakes_handle() -> Result<(), StoreError> {
        let store_wide = Arc::new(AtomicUsize::new(0));
        let (mut handle, tracker) = EffectHandle::tracked();

        let guard = EffectGuard::enter(&store_wide, &tracker);
        assert_eq!(handle.pending(), 1);
        assert_eq!(store_wide.load(Ordering::SeqCst), 1);

        let waiter = tokio::spawn(async move { handle.wait_with_timeout(Duration::from_secs(1)).await });
        drop(guard);

        assert_eq!(store_wide.load(Ordering::SeqCst), 0);
        waiter.await.map_err(|_| StoreError::ChannelClosed)?
    }

    #[tokio::test]
    async fn test_pending_handle_times_out() {
        let store_wide = Arc::new(AtomicUsize::new(0));
        let (mut handle, tracker) = EffectHandle::tracked();
        let _guard = EffectGuard::enter(&store_wide, &tracker);

        let result = handle.wait_with_timeout(Duration::from_millis(10)).await;
        assert!(matches!(result, Err(StoreError::Timeout)));
    }
}
