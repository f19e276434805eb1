//! Reducer for the request lifecycle.

use crate::{FetchFailure, RequestAction, RequestEnvironment, RequestPhase, RequestState};
use futures::FutureExt;
use futures::future::BoxFuture;
use lifecycle_core::{effect::Effect, reducer::Reducer};
use smallvec::{SmallVec, smallvec};
use std::any::Any;
use std::marker::PhantomData;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Label used in tracing fields when none is configured.
pub const DEFAULT_LABEL: &str = "request";

/// Transition function of the request lifecycle.
///
/// | Current | Action | Next |
/// |---|---|---|
/// | Idle, Success, Error | `Fetch` | Loading, operation started once |
/// | Loading | `Fetch` | Loading, trigger ignored |
/// | Loading | current `Succeeded` | Success |
/// | Loading | current `Failed` | Error |
/// | any | stale signal | unchanged |
///
/// Entering Loading clears the previous data or error. A signal is current
/// only while loading and only if it carries the generation being loaded.
pub struct RequestReducer<T, E> {
    label: Arc<str>,
    _marker: PhantomData<fn() -> (T, E)>,
}

impl<T, E> RequestReducer<T, E> {
    /// Create a reducer with the default label.
    #[must_use]
    pub fn new() -> Self {
        Self::with_label(DEFAULT_LABEL)
    }

    /// Create a reducer whose log events carry `label`.
    #[must_use]
    pub fn with_label(label: impl Into<Arc<str>>) -> Self {
        Self {
            label: label.into(),
            _marker: PhantomData,
        }
    }

    /// Label attached to log events.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl<T, E> Default for RequestReducer<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> Clone for RequestReducer<T, E> {
    fn clone(&self) -> Self {
        Self {
            label: Arc::clone(&self.label),
            _marker: PhantomData,
        }
    }
}

impl<T, E> std::fmt::Debug for RequestReducer<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestReducer")
            .field("label", &self.label)
            .finish()
    }
}

impl<T, E> Reducer for RequestReducer<T, E>
where
    T: Send + 'static,
    E: Send + std::fmt::Debug + 'static,
{
    type State = RequestState<T, E>;
    type Action = RequestAction<T, E>;
    type Environment = RequestEnvironment<T, E>;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            RequestAction::Fetch => {
                if state.is_loading() {
                    tracing::debug!(
                        label = %self.label,
                        generation = state.generation,
                        "Fetch ignored: operation already in flight"
                    );
                    metrics::counter!("request.fetch.ignored").increment(1);
                    return smallvec![Effect::None];
                }

                state.generation += 1;
                state.invocations += 1;
                state.enter(RequestPhase::Loading, env.clock().now());
                self.log_transition(state);
                metrics::counter!("request.fetch.started").increment(1);

                smallvec![fetch_effect(env, state.generation)]
            },

            RequestAction::Succeeded { generation, data } => {
                if !self.is_current(state, generation) {
                    return smallvec![Effect::None];
                }

                state.enter(RequestPhase::Success { data }, env.clock().now());
                self.log_transition(state);
                metrics::counter!("request.fetch.succeeded").increment(1);

                smallvec![Effect::None]
            },

            RequestAction::Failed { generation, error } => {
                if !self.is_current(state, generation) {
                    return smallvec![Effect::None];
                }

                tracing::debug!(label = %self.label, generation, ?error, "Fetch failed");
                state.enter(RequestPhase::Error { error }, env.clock().now());
                self.log_transition(state);
                metrics::counter!("request.fetch.failed").increment(1);

                smallvec![Effect::None]
            },
        }
    }
}

impl<T, E> RequestReducer<T, E> {
    /// Whether a signal from `generation` may complete the current episode.
    fn is_current(&self, state: &RequestState<T, E>, generation: u64) -> bool {
        if state.is_loading() && generation == state.generation {
            return true;
        }

        tracing::warn!(
            label = %self.label,
            signal_generation = generation,
            current_generation = state.generation,
            status = %state.status(),
            "Discarding stale completion signal"
        );
        metrics::counter!("request.signals.stale").increment(1);
        false
    }

    fn log_transition(&self, state: &RequestState<T, E>) {
        tracing::info!(
            label = %self.label,
            status = %state.status(),
            generation = state.generation,
            "State transition"
        );
    }
}

/// Start the operation and describe how its outcome feeds back.
///
/// A panic while starting or polling the operation becomes
/// [`FetchFailure::Panicked`], so the lifecycle always leaves Loading.
fn fetch_effect<T, E>(env: &RequestEnvironment<T, E>, generation: u64) -> Effect<RequestAction<T, E>>
where
    T: Send + 'static,
    E: Send + 'static,
{
    let started: Result<BoxFuture<'static, Result<T, E>>, _> =
        std::panic::catch_unwind(AssertUnwindSafe(|| env.operation().call()));

    Effect::future(async move {
        let outcome = match started {
            Ok(operation) => AssertUnwindSafe(operation).catch_unwind().await,
            Err(payload) => Err(payload),
        };

        let action = match outcome {
            Ok(Ok(data)) => RequestAction::Succeeded { generation, data },
            Ok(Err(error)) => RequestAction::Failed {
                generation,
                error: FetchFailure::Operation(error),
            },
            Err(payload) => RequestAction::Failed {
                generation,
                error: FetchFailure::Panicked(panic_message(payload.as_ref())),
            },
        };

        Some(action)
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
