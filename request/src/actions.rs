//! Actions for the request lifecycle.

use crate::error::FetchFailure;

/// Everything the request lifecycle reducer reacts to.
///
/// `Fetch` is the external trigger. `Succeeded` and `Failed` are fed back by
/// the fetch effect and carry the generation of the loading episode that
/// started the operation, so a signal from a superseded operation can be told
/// apart from the current one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestAction<T, E> {
    /// Start the operation, unless one is already in flight
    Fetch,

    /// The operation started in `generation` resolved
    Succeeded {
        /// Loading episode that started the operation
        generation: u64,
        /// Value produced by the operation
        data: T,
    },

    /// The operation started in `generation` failed
    Failed {
        /// Loading episode that started the operation
        generation: u64,
        /// Failure reported by the operation
        error: FetchFailure<E>,
    },
}

impl<T, E> RequestAction<T, E> {
    /// Generation carried by a completion signal; `None` for `Fetch`.
    #[must_use]
    pub const fn generation(&self) -> Option<u64> {
        match self {
            Self::Fetch => None,
            Self::Succeeded { generation, .. } | Self::Failed { generation, .. } => {
                Some(*generation)
            },
        }
    }
}
