//! # Lifecycle Core
//!
//! The vocabulary shared by every lifecycle state machine: a pure
//! [`Reducer`](reducer::Reducer) turns `(state, action, environment)` into a
//! new state plus [`Effect`](effect::Effect) values, and a runtime later
//! executes those effects and feeds the resulting actions back in.
//!
//! Dependencies a reducer needs at transition time, such as the
//! [`Clock`](environment::Clock), are passed in through its environment.
//!
//! ```ignore
//! use lifecycle_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
//!
//! #[derive(Clone, Debug, Default)]
//! struct Switch {
//!     on: bool,
//! }
//!
//! enum Flip {
//!     Toggle,
//! }
//!
//! struct SwitchReducer;
//!
//! impl Reducer for SwitchReducer {
//!     type State = Switch;
//!     type Action = Flip;
//!     type Environment = ();
//!
//!     fn reduce(&self, switch: &mut Switch, _flip: Flip, _env: &()) -> SmallVec<[Effect<Flip>; 4]> {
//!         switch.on = !switch.on;
//!         smallvec![]
//!     }
//! }
//! ```

pub use chrono::{DateTime, Utc};
pub use smallvec::{SmallVec, smallvec};

/// Transition functions.
pub mod reducer {
    use super::SmallVec;
    use super::effect::Effect;

    /// A deterministic state transition.
    ///
    /// `reduce` mutates the state in place and describes any I/O as effects;
    /// it never performs I/O itself. The effect list rarely holds more than
    /// one entry, hence the inline `SmallVec`.
    pub trait Reducer {
        /// State owned by the machine
        type State;

        /// Triggers and signals the machine reacts to
        type Action;

        /// Injected dependencies
        type Environment;

        /// Apply `action` to `state`, returning the effects to run next
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Descriptions of work for the runtime.
pub mod effect {
    use futures::future::BoxFuture;
    use std::future::Future;
    use std::time::Duration;

    /// Work returned by a reducer; nothing runs until a runtime executes it.
    pub enum Effect<Action> {
        /// Nothing to do
        None,

        /// Start all of these at once
        Parallel(Vec<Effect<Action>>),

        /// Run these one after another, each once the previous has settled
        Sequential(Vec<Effect<Action>>),

        /// Feed `action` back after `duration`
        Delay {
            /// Wait before feeding back
            duration: Duration,
            /// Fed back once the wait is over
            action: Box<Action>,
        },

        /// Await the future; `Some(action)` is fed back to the reducer
        Future(BoxFuture<'static, Option<Action>>),
    }

    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Self::None => f.write_str("Effect::None"),
                Self::Parallel(group) => f.debug_tuple("Effect::Parallel").field(group).finish(),
                Self::Sequential(group) => f.debug_tuple("Effect::Sequential").field(group).finish(),
                Self::Delay { duration, action } => f
                    .debug_struct("Effect::Delay")
                    .field("duration", duration)
                    .field("action", action)
                    .finish(),
                // futures are opaque
                Self::Future(_) => f.write_str("Effect::Future(<future>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Box `fut` into an [`Effect::Future`]
        pub fn future<F>(fut: F) -> Self
        where
            F: Future<Output = Option<Action>> + Send + 'static,
        {
            Self::Future(Box::pin(fut))
        }

        /// [`Effect::Parallel`] over `effects`
        #[must_use]
        pub const fn merge(effects: Vec<Self>) -> Self {
            Self::Parallel(effects)
        }

        /// [`Effect::Sequential`] over `effects`
        #[must_use]
        pub const fn chain(effects: Vec<Self>) -> Self {
            Self::Sequential(effects)
        }

        /// True when executing this effect would neither spawn work nor feed
        /// anything back, including groups made only of no-ops
        #[must_use]
        pub fn is_none(&self) -> bool {
            match self {
                Self::None => true,
                Self::Parallel(group) | Self::Sequential(group) => group.iter().all(Self::is_none),
                Self::Delay { .. } | Self::Future(_) => false,
            }
        }
    }
}

/// Dependencies injected through a reducer's environment.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Source of the current time; tests substitute a fixed one.
    pub trait Clock: Send + Sync {
        /// Current instant
        fn now(&self) -> DateTime<Utc>;
    }

    /// [`Clock`] reading the system time
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }

    impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
        fn now(&self) -> DateTime<Utc> {
            C::now(self)
        }
    }
}
