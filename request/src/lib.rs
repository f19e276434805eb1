//! # Request Lifecycle
//!
//! An asynchronous fetch operation modelled as a four-state machine:
//!
//! ```text
//! Idle    ── fetch ──────▶ Loading
//! Loading ── Succeeded ──▶ Success
//! Loading ── Failed ─────▶ Error
//! Success ── fetch ──────▶ Loading
//! Error   ── fetch ──────▶ Loading
//! ```
//!
//! A `fetch` while Loading is ignored. Every other `fetch` starts the
//! operation exactly once. The completion signal of an operation only counts
//! while the lifecycle is still loading *that* operation; anything else is
//! discarded as stale.
//!
//! The transition function is a [`Reducer`](lifecycle_core::reducer::Reducer)
//! executed by a [`Store`](lifecycle_runtime::Store); [`RequestLifecycle`] is
//! the handle applications hold.
//!
//! ## Example
//!
//! ```no_run
//! use request_lifecycle::{RequestLifecycle, RequestStatus};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), lifecycle_runtime::StoreError> {
//! let lifecycle = RequestLifecycle::new(|| async { Ok::<_, String>(42_u32) });
//! assert_eq!(lifecycle.status().await, RequestStatus::Idle);
//!
//! let phase = lifecycle.fetch_and_wait(Duration::from_secs(1)).await?;
//! assert_eq!(phase.data(), Some(&42));
//! # Ok(())
//! # }
//! ```

pub mod actions;
pub mod config;
pub mod environment;
pub mod error;
pub mod lifecycle;
pub mod reducer;
pub mod types;

pub use actions::RequestAction;
pub use config::{DemoConfig, LifecycleConfig};
pub use environment::{FetchOperation, RequestEnvironment};
pub use error::{ConfigError, FetchFailure};
pub use lifecycle::{RequestLifecycle, RequestStore};
pub use reducer::RequestReducer;
pub use types::{RequestPhase, RequestState, RequestStatus};
