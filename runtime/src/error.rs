//! Errors returned by [`Store`](crate::Store) and [`EffectHandle`](crate::EffectHandle).

use thiserror::Error;

/// Failure modes of the store runtime
#[derive(Error, Debug)]
pub enum StoreError {
    /// `send` was called after shutdown began
    #[error("store is draining and rejects new actions")]
    ShutdownInProgress,

    /// Shutdown gave up while effects were still running
    #[error("shutdown deadline passed with {0} effect(s) in flight")]
    ShutdownTimeout(usize),

    /// A wait expired before the awaited condition held
    #[error("timed out while waiting on the store")]
    Timeout,

    /// The feedback broadcast closed under an observer
    #[error("feedback channel closed")]
    ChannelClosed,
}
