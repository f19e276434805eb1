//! The handle applications hold to drive a request lifecycle.

use crate::{
    FetchOperation, LifecycleConfig, RequestAction, RequestEnvironment, RequestPhase,
    RequestReducer, RequestState, RequestStatus,
};
use lifecycle_runtime::{EffectHandle, Store, StoreError};
use std::fmt::Debug;
use std::time::Duration;
use tokio::sync::broadcast;

/// Store running the request lifecycle reducer.
pub type RequestStore<T, E> =
    Store<RequestState<T, E>, RequestAction<T, E>, RequestEnvironment<T, E>, RequestReducer<T, E>>;

/// A request lifecycle around one fetch operation.
///
/// Starts Idle. [`fetch`](Self::fetch) is the only trigger; the state moves
/// to Success or Error when the operation completes. Clones share the same
/// state, so one clone can fetch while another observes.
///
/// # Example
///
/// ```no_run
/// use request_lifecycle::RequestLifecycle;
///
/// # async fn example() -> Result<(), lifecycle_runtime::StoreError> {
/// let lifecycle = RequestLifecycle::new(|| async { Err::<(), _>("Network error") });
///
/// let mut handle = lifecycle.fetch().await?;
/// handle.wait().await;
///
/// let phase = lifecycle.state().await;
/// assert_eq!(serde_json::to_string(&phase).unwrap(), r#"{"status":"error","error":"Network error"}"#);
/// # Ok(())
/// # }
/// ```
pub struct RequestLifecycle<T, E>
where
    T: Send + 'static,
    E: Send + Debug + 'static,
{
    store: RequestStore<T, E>,
}

impl<T, E> RequestLifecycle<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Debug + Send + Sync + 'static,
{
    /// Create an idle lifecycle with the default configuration and the wall clock.
    #[must_use]
    pub fn new<O>(operation: O) -> Self
    where
        O: FetchOperation<T, E> + 'static,
    {
        Self::with_config(operation, LifecycleConfig::default())
    }

    /// Create an idle lifecycle with the wall clock.
    #[must_use]
    pub fn with_config<O>(operation: O, config: LifecycleConfig) -> Self
    where
        O: FetchOperation<T, E> + 'static,
    {
        Self::with_environment(RequestEnvironment::with_system_clock(operation), config)
    }

    /// Create an idle lifecycle from a prepared environment.
    #[must_use]
    pub fn with_environment(environment: RequestEnvironment<T, E>, config: LifecycleConfig) -> Self {
        tracing::debug!(label = %config.label, "Creating request lifecycle");

        let store = Store::with_config(
            RequestState::new(),
            RequestReducer::with_label(config.label),
            environment,
            config.store,
        );

        Self { store }
    }

    /// Trigger a fetch.
    ///
    /// Starts the operation unless one is already in flight, in which case
    /// the trigger is ignored. A failing operation is not an error here; it
    /// shows up as the Error state. The returned handle completes once the
    /// started operation (if any) has been reduced into Success or Error.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after [`shutdown`](Self::shutdown).
    #[tracing::instrument(skip(self), name = "request_fetch")]
    pub async fn fetch(&self) -> Result<EffectHandle, StoreError> {
        self.store.send(RequestAction::Fetch).await
    }

    /// Trigger a fetch and wait until the lifecycle leaves Loading.
    ///
    /// If an operation was already in flight, waits for that one instead of
    /// starting another.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Timeout`]: still loading when the timeout expired
    /// - [`StoreError::ShutdownInProgress`]: the lifecycle is shutting down
    /// - [`StoreError::ChannelClosed`]: the signal channel closed
    pub async fn fetch_and_wait(&self, timeout: Duration) -> Result<RequestPhase<T, E>, StoreError> {
        // Subscribe first so a signal reduced right after the trigger is not missed
        let mut signals = self.store.subscribe_actions();
        self.fetch().await?;

        tokio::time::timeout(timeout, async {
            loop {
                let phase = self.state().await;
                if !matches!(phase, RequestPhase::Loading) {
                    return Ok(phase);
                }

                match signals.recv().await {
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {},
                    Err(broadcast::error::RecvError::Closed) => {
                        return Err(StoreError::ChannelClosed);
                    },
                }
            }
        })
        .await
        .map_err(|_| StoreError::Timeout)?
    }

    /// Current phase with its data or error.
    pub async fn state(&self) -> RequestPhase<T, E> {
        self.store.state(|s| s.phase().clone()).await
    }

    /// Full state, including generation, invocation count and timestamp.
    pub async fn snapshot(&self) -> RequestState<T, E> {
        self.store.state(Clone::clone).await
    }

    /// Tag of the current phase.
    pub async fn status(&self) -> RequestStatus {
        self.store.state(RequestState::status).await
    }

    /// Observe the completion signals of the operation, after they were reduced.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<RequestAction<T, E>> {
        self.store.subscribe_actions()
    }

    /// Stop accepting triggers and wait for the in-flight operation.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] if the operation is still
    /// running when the timeout expires.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
        self.store.shutdown(timeout).await
    }

    /// Shut down with the configured default timeout.
    ///
    /// # Errors
    ///
    /// See [`RequestLifecycle::shutdown`].
    pub async fn shutdown_default(&self) -> Result<(), StoreError> {
        self.store.shutdown_default().await
    }

    /// Whether shutdown has been initiated.
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.store.is_shutting_down()
    }
}

impl<T, E> Clone for RequestLifecycle<T, E>
where
    T: Send + 'static,
    E: Send + Debug + 'static,
{
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lifecycle_core::environment::Clock;
    use lifecycle_testing::{ControlledOperation, test_clock};

    fn controlled() -> (ControlledOperation<u32, String>, RequestLifecycle<u32, String>) {
        let operation = ControlledOperation::new();
        let calls = operation.clone();
        let environment = RequestEnvironment::new(move || calls.call(), test_clock());
        let lifecycle = RequestLifecycle::with_environment(environment, LifecycleConfig::default());
        (operation, lifecycle)
    }

    #[tokio::test]
    async fn test_new_lifecycle_is_idle() {
        let (operation, lifecycle) = controlled();

        assert_eq!(lifecycle.status().await, RequestStatus::Idle);
        assert_eq!(lifecycle.state().await, RequestPhase::Idle);
        assert_eq!(lifecycle.snapshot().await, RequestState::new());
        assert_eq!(operation.invocations(), 0);
    }

    #[tokio::test]
    async fn test_fetch_handle_completes_with_signal() -> Result<(), StoreError> {
        let (operation, lifecycle) = controlled();

        let mut handle = lifecycle.fetch().await?;
        assert_eq!(lifecycle.status().await, RequestStatus::Loading);
        assert_eq!(handle.pending(), 1);

        assert!(operation.complete(Ok(5)));
        handle.wait_with_timeout(Duration::from_secs(1)).await?;

        let snapshot = lifecycle.snapshot().await;
        assert_eq!(snapshot.data(), Some(&5));
        assert_eq!(snapshot.updated_at(), Some(test_clock().now()));
        Ok(())
    }

    #[tokio::test]
    async fn test_ignored_fetch_returns_completed_handle() -> Result<(), StoreError> {
        let (operation, lifecycle) = controlled();

        let _first = lifecycle.fetch().await?;
        let second = lifecycle.fetch().await?;

        assert_eq!(second.pending(), 0);
        assert_eq!(operation.invocations(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_and_wait_joins_in_flight_operation() -> Result<(), StoreError> {
        let (operation, lifecycle) = controlled();
        lifecycle.fetch().await?;

        // The waiter parks on the signal before the operation is released
        let (phase, released) = tokio::join!(
            lifecycle.fetch_and_wait(Duration::from_secs(1)),
            async { operation.complete(Err("Network error".to_string())) },
        );

        assert!(released);
        assert_eq!(phase?.status(), RequestStatus::Error);
        assert_eq!(operation.invocations(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_and_wait_times_out_while_loading() {
        let (_operation, lifecycle) = controlled();

        let result = lifecycle.fetch_and_wait(Duration::from_millis(20)).await;

        assert!(matches!(result, Err(StoreError::Timeout)));
        assert_eq!(lifecycle.status().await, RequestStatus::Loading);
    }
}
