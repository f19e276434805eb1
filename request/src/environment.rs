//! Environment for the request lifecycle reducer.

use futures::future::BoxFuture;
use lifecycle_core::environment::{Clock, SystemClock};
use std::future::Future;
use std::sync::Arc;

/// The asynchronous operation a lifecycle fetches with.
///
/// Each call starts one independent run of the operation. Any
/// `Fn() -> impl Future<Output = Result<T, E>>` closure is an operation:
///
/// ```
/// use request_lifecycle::FetchOperation;
///
/// fn assert_operation<O: FetchOperation<u32, String>>(_: O) {}
///
/// assert_operation(|| async { Ok::<u32, String>(7) });
/// ```
pub trait FetchOperation<T, E>: Send + Sync {
    /// Start one run of the operation.
    fn call(&self) -> BoxFuture<'static, Result<T, E>>;
}

impl<T, E, F, Fut> FetchOperation<T, E> for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    fn call(&self) -> BoxFuture<'static, Result<T, E>> {
        Box::pin(self())
    }
}

/// Dependencies injected into the request lifecycle reducer.
///
/// Production uses [`SystemClock`]; tests use a fixed clock.
pub struct RequestEnvironment<T, E> {
    operation: Arc<dyn FetchOperation<T, E>>,
    clock: Arc<dyn Clock>,
}

impl<T, E> RequestEnvironment<T, E> {
    /// Create an environment from an operation and a clock.
    #[must_use]
    pub fn new<O, C>(operation: O, clock: C) -> Self
    where
        O: FetchOperation<T, E> + 'static,
        C: Clock + 'static,
    {
        Self {
            operation: Arc::new(operation),
            clock: Arc::new(clock),
        }
    }

    /// Create an environment using the wall clock.
    #[must_use]
    pub fn with_system_clock<O>(operation: O) -> Self
    where
        O: FetchOperation<T, E> + 'static,
    {
        Self::new(operation, SystemClock)
    }

    /// The fetch operation.
    #[must_use]
    pub fn operation(&self) -> &dyn FetchOperation<T, E> {
        self.operation.as_ref()
    }

    /// Clock for stamping transitions.
    #[must_use]
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }
}

impl<T, E> Clone for RequestEnvironment<T, E> {
    fn clone(&self) -> Self {
        Self {
            operation: Arc::clone(&self.operation),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<T, E> std::fmt::Debug for RequestEnvironment<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestEnvironment").finish_non_exhaustive()
    }
}
