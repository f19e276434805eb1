//! Error types for the request lifecycle.

use serde::Serialize;
use thiserror::Error;

/// Why a fetch ended in the Error state.
///
/// Never returned to the caller of `fetch()`; it is only observable through
/// [`RequestPhase::Error`](crate::RequestPhase::Error). Every failure can be
/// retried with another `fetch()`.
///
/// Serialises as the inner value, so an operation failing with
/// `"Network error"` renders as `"Network error"`.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FetchFailure<E> {
    /// The operation resolved with an error
    #[error("{0}")]
    Operation(E),

    /// The operation panicked
    #[error("fetch operation panicked: {0}")]
    Panicked(String),
}

impl<E> FetchFailure<E> {
    /// The operation's own error, if it returned one.
    #[must_use]
    pub const fn operation(&self) -> Option<&E> {
        match self {
            Self::Operation(error) => Some(error),
            Self::Panicked(_) => None,
        }
    }

    /// Whether the operation panicked instead of returning.
    #[must_use]
    pub const fn is_panic(&self) -> bool {
        matches!(self, Self::Panicked(_))
    }
}

/// Errors reading configuration from the environment.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable is set but its value cannot be used
    #[error("invalid value {value:?} for {variable}: {reason}")]
    InvalidValue {
        /// Name of the environment variable
        variable: &'static str,
        /// Value found
        value: String,
        /// What is wrong with it
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(
        variable: &'static str,
        value: impl Into<String>,
        reason: impl std::fmt::Display,
    ) -> Self {
        Self::InvalidValue {
            variable,
            value: value.into(),
            reason: reason.to_string(),
        }
    }
}
