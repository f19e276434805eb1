//! # Lifecycle Runtime
//!
//! Executes reducers from `lifecycle-core`.
//!
//! - [`Store`] owns the state, serializes reduction and spawns effects on
//!   tokio, reducing whatever action an effect produces.
//! - [`EffectHandle`] resolves when the effects of one action are done.
//! - [`metrics`] installs the Prometheus recorder the store reports to.
//!
//! ```ignore
//! use lifecycle_runtime::Store;
//!
//! let store = Store::new(initial_state, reducer, environment);
//! let mut handle = store.send(Action::Start).await?;
//! handle.wait().await;
//! let done = store.state(|s| s.done).await;
//! ```

mod config;
mod error;
mod handle;
pub mod metrics;
mod store;

pub use config::{DEFAULT_BROADCAST_CAPACITY, DEFAULT_SHUTDOWN_TIMEOUT, StoreConfig};
pub use error::StoreError;
pub use handle::EffectHandle;
pub use store::Store;
