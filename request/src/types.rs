//! Core types for the request lifecycle.

use crate::error::FetchFailure;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Bare tag of the active state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    /// Nothing fetched yet
    Idle,

    /// An operation is in flight
    Loading,

    /// The last operation succeeded
    Success,

    /// The last operation failed
    Error,
}

impl RequestStatus {
    /// Lower-case name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The active state together with the value it carries.
///
/// Only `Success` has data and only `Error` has an error, so both can never
/// be present at once. Serialises with a `status` tag:
///
/// ```
/// use request_lifecycle::{FetchFailure, RequestPhase};
///
/// let phase: RequestPhase<u8, &str> = RequestPhase::Error {
///     error: FetchFailure::Operation("Network error"),
/// };
/// assert_eq!(
///     serde_json::to_string(&phase).unwrap(),
///     r#"{"status":"error","error":"Network error"}"#
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RequestPhase<T, E> {
    /// Nothing fetched yet
    Idle,

    /// An operation is in flight
    Loading,

    /// The last operation resolved with `data`
    Success {
        /// Value produced by the operation
        data: T,
    },

    /// The last operation failed with `error`
    Error {
        /// Failure reported by the operation
        error: FetchFailure<E>,
    },
}

impl<T, E> RequestPhase<T, E> {
    /// Tag of this phase.
    #[must_use]
    pub const fn status(&self) -> RequestStatus {
        match self {
            Self::Idle => RequestStatus::Idle,
            Self::Loading => RequestStatus::Loading,
            Self::Success { .. } => RequestStatus::Success,
            Self::Error { .. } => RequestStatus::Error,
        }
    }

    /// Data of a successful fetch.
    #[must_use]
    pub const fn data(&self) -> Option<&T> {
        match self {
            Self::Success { data } => Some(data),
            _ => None,
        }
    }

    /// Failure of the last fetch.
    #[must_use]
    pub const fn error(&self) -> Option<&FetchFailure<E>> {
        match self {
            Self::Error { error } => Some(error),
            _ => None,
        }
    }
}

impl<T, E> Default for RequestPhase<T, E> {
    fn default() -> Self {
        Self::Idle
    }
}

/// State owned by the request lifecycle store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestState<T, E> {
    /// Active state
    pub(crate) phase: RequestPhase<T, E>,

    /// Loading episode the current (or last) operation belongs to
    pub(crate) generation: u64,

    /// Number of times the operation was started
    pub(crate) invocations: u64,

    /// When the phase last changed
    pub(crate) updated_at: Option<DateTime<Utc>>,
}

impl<T, E> RequestState<T, E> {
    /// Create an idle state.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            phase: RequestPhase::Idle,
            generation: 0,
            invocations: 0,
            updated_at: None,
        }
    }

    /// Active phase with its value.
    #[must_use]
    pub const fn phase(&self) -> &RequestPhase<T, E> {
        &self.phase
    }

    /// Tag of the active phase.
    #[must_use]
    pub const fn status(&self) -> RequestStatus {
        self.phase.status()
    }

    /// Data of the last successful fetch, if the lifecycle is in Success.
    #[must_use]
    pub const fn data(&self) -> Option<&T> {
        self.phase.data()
    }

    /// Failure of the last fetch, if the lifecycle is in Error.
    #[must_use]
    pub const fn error(&self) -> Option<&FetchFailure<E>> {
        self.phase.error()
    }

    /// Whether an operation is in flight.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self.phase, RequestPhase::Loading)
    }

    /// Current (or last) loading episode; zero before the first fetch.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// How many times the operation was started.
    #[must_use]
    pub const fn invocations(&self) -> u64 {
        self.invocations
    }

    /// When the phase last changed.
    #[must_use]
    pub const fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Replace the phase, stamping the change with `at`.
    pub(crate) fn enter(&mut self, phase: RequestPhase<T, E>, at: DateTime<Utc>) {
        self.phase = phase;
        self.updated_at = Some(at);
    }
}

impl<T, E> Default for RequestState<T, E> {
    fn default() -> Self {
        Self::new()
    }
}
