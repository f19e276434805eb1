//! # Lifecycle Testing
//!
//! Testing utilities and helpers for reducer-driven request lifecycles.
//!
//! This crate provides:
//! - Deterministic implementations of environment traits ([`FixedClock`])
//! - [`ControlledOperation`]: an async operation whose calls are counted and
//!   whose results are released by the test
//! - [`ReducerTest`]: Given-When-Then harness for reducers
//! - Effect assertion helpers
//!
//! ## Example
//!
//! ```ignore
//! use lifecycle_testing::{ControlledOperation, test_clock};
//!
//! #[tokio::test]
//! async fn test_fetch_once() {
//!     let op = ControlledOperation::<u32, String>::new();
//!     let lifecycle = build_lifecycle(op.clone(), test_clock());
//!
//!     lifecycle.fetch().await?;
//!     lifecycle.fetch().await?;
//!     assert_eq!(op.invocations(), 1);
//! }
//! ```

use chrono::{DateTime, Utc};
use lifecycle_core::environment::Clock;

mod reducer_test;

pub use reducer_test::{ReducerTest, assertions};

/// Mock implementations of environment traits and operations
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex, PoisonError};
    use std::time::Duration;
    use tokio::sync::{oneshot, watch};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use lifecycle_testing::mocks::FixedClock;
    /// use lifecycle_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(DateTime::<Utc>::UNIX_EPOCH + chrono::Duration::days(20_089))
    }

    /// An async operation driven by the test
    ///
    /// Every call is counted and parks until the test releases it with
    /// [`complete`](Self::complete). Calls are released oldest first. Clones
    /// share the same counters and queue.
    ///
    /// # Example
    ///
    /// ```
    /// use lifecycle_testing::ControlledOperation;
    ///
    /// # tokio_test::block_on(async {
    /// let op = ControlledOperation::<&str, String>::new();
    /// let call = op.call();
    /// assert_eq!(op.invocations(), 1);
    ///
    /// assert!(op.complete(Ok("done")));
    /// assert_eq!(call.await, Ok("done"));
    /// # });
    /// ```
    pub struct ControlledOperation<T, E> {
        inner: Arc<Inner<T, E>>,
    }

    struct Inner<T, E> {
        invocations: watch::Sender<usize>,
        pending: Mutex<VecDeque<oneshot::Sender<Result<T, E>>>>,
    }

    impl<T, E> ControlledOperation<T, E>
    where
        T: Send + 'static,
        E: Send + 'static,
    {
        /// Create an operation with no calls
        #[must_use]
        pub fn new() -> Self {
            let (invocations, _) = watch::channel(0);
            Self {
                inner: Arc::new(Inner {
                    invocations,
                    pending: Mutex::new(VecDeque::new()),
                }),
            }
        }

        /// Start one call of the operation
        ///
        /// The call is counted immediately, not when the future is first polled.
        /// A call whose result is never released stays pending forever.
        pub fn call(&self) -> impl Future<Output = Result<T, E>> + Send + use<T, E> {
            let (tx, rx) = oneshot::channel();
            self.inner
                .pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push_back(tx);
            self.inner.invocations.send_modify(|count| *count += 1);

            async move {
                match rx.await {
                    Ok(result) => result,
                    Err(_) => std::future::pending().await,
                }
            }
        }

        /// Number of calls started so far
        #[must_use]
        pub fn invocations(&self) -> usize {
            *self.inner.invocations.borrow()
        }

        /// Number of calls waiting for a result
        #[must_use]
        pub fn pending(&self) -> usize {
            self.inner
                .pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .len()
        }

        /// Release the oldest pending call with `result`
        ///
        /// Returns `false` if no call was waiting for a result.
        pub fn complete(&self, result: Result<T, E>) -> bool {
            let mut pending = self
                .inner
                .pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner);

            while let Some(tx) = pending.pop_front() {
                // A dropped caller no longer waits; release the next one instead
                if !tx.is_closed() {
                    return tx.send(result).is_ok();
                }
            }
            false
        }

        /// Wait until at least `count` calls were started
        ///
        /// Returns `false` if the timeout expired first.
        pub async fn wait_for_invocations(&self, count: usize, timeout: Duration) -> bool {
            let mut rx = self.inner.invocations.subscribe();
            tokio::time::timeout(timeout, rx.wait_for(|seen| *seen >= count))
                .await
                .is_ok_and(|result| result.is_ok())
        }
    }

    impl<T, E> Clone for ControlledOperation<T, E> {
        fn clone(&self) -> Self {
            Self {
                inner: Arc::clone(&self.inner),
            }
        }
    }

    impl<T, E> Default for ControlledOperation<T, E>
    where
        T: Send + 'static,
        E: Send + 'static,
    {
        fn default() -> Self {
            Self::new()
        }
    }

    impl<T, E> std::fmt::Debug for ControlledOperation<T, E>
    where
        T: Send + 'static,
        E: Send + 'static,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("ControlledOperation")
                .field("invocations", &self.invocations())
                .field("pending", &self.pending())
                .finish()
        }
    }
}

// Re-export commonly used items
pub use mocks::{ControlledOperation, FixedClock, test_clock};
