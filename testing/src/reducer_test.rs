//! Given-When-Then harness for reducers.
//!
//! Reducers are pure, so a test only needs a state, some actions and an
//! environment. The harness reduces the actions in order and then runs the
//! checks in the order they were declared.

#![allow(clippy::module_name_repetitions)] // ReducerTest is the natural name

use lifecycle_core::{effect::Effect, reducer::Reducer};

/// A deferred check, run after every action was reduced.
enum Check<S, A> {
    State(Box<dyn FnOnce(&S)>),
    Effects(Box<dyn FnOnce(&[Effect<A>])>),
}

/// Fluent Given-When-Then test for one reducer.
///
/// Several actions may be given; effect checks see the effects returned by
/// the last one.
///
/// # Example
///
/// ```ignore
/// use lifecycle_testing::{ReducerTest, assertions};
///
/// ReducerTest::new(RequestReducer::new())
///     .with_env(test_environment())
///     .given_state(RequestState::default())
///     .when_action(RequestAction::Fetch)
///     .then_state(|state| assert!(state.is_loading()))
///     .then_effects(assertions::assert_has_future_effect)
///     .run();
/// ```
pub struct ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    reducer: R,
    environment: Option<E>,
    given: Option<S>,
    actions: Vec<A>,
    checks: Vec<Check<S, A>>,
}

impl<R, S, A, E> ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    /// Start a test for `reducer`
    #[must_use]
    pub const fn new(reducer: R) -> Self {
        Self {
            reducer,
            environment: None,
            given: None,
            actions: Vec::new(),
            checks: Vec::new(),
        }
    }

    /// Environment passed to every reduction
    #[must_use]
    pub fn with_env(mut self, env: E) -> Self {
        self.environment = Some(env);
        self
    }

    /// Given: the state before the first action
    #[must_use]
    pub fn given_state(mut self, state: S) -> Self {
        self.given = Some(state);
        self
    }

    /// When: reduce `action` after the ones already added
    #[must_use]
    pub fn when_action(mut self, action: A) -> Self {
        self.actions.push(action);
        self
    }

    /// When: reduce every action of `actions`, in order
    #[must_use]
    pub fn when_actions(mut self, actions: impl IntoIterator<Item = A>) -> Self {
        self.actions.extend(actions);
        self
    }

    /// Then: check the final state
    #[must_use]
    pub fn then_state<F>(mut self, check: F) -> Self
    where
        F: FnOnce(&S) + 'static,
    {
        self.checks.push(Check::State(Box::new(check)));
        self
    }

    /// Then: check the effects returned by the last action
    #[must_use]
    pub fn then_effects<F>(mut self, check: F) -> Self
    where
        F: FnOnce(&[Effect<A>]) + 'static,
    {
        self.checks.push(Check::Effects(Box::new(check)));
        self
    }

    /// Reduce the actions and run the checks.
    ///
    /// # Panics
    ///
    /// Panics when the state, the environment or every action is missing,
    /// and whenever a check fails.
    #[allow(clippy::panic)] // Test code can panic
    #[allow(clippy::expect_used)] // Test code can use expect
    pub fn run(self) {
        let mut state = self.given.expect("ReducerTest: call given_state() first");
        let env = self.environment.expect("ReducerTest: call with_env() first");
        assert!(
            !self.actions.is_empty(),
            "ReducerTest: call when_action() or when_actions() first"
        );

        let effects = self
            .actions
            .into_iter()
            .fold(Vec::new(), |_, action| {
                self.reducer.reduce(&mut state, action, &env).into_vec()
            });

        for check in self.checks {
            match check {
                Check::State(check) => check(&state),
                Check::Effects(check) => check(&effects),
            }
        }
    }
}

/// Checks over the effects returned by a reducer
pub mod assertions {
    use lifecycle_core::effect::Effect;

    /// Number of `Future` effects, counting inside parallel and sequential groups
    #[must_use]
    pub fn count_future_effects<A>(effects: &[Effect<A>]) -> usize {
        effects
            .iter()
            .map(|effect| match effect {
                Effect::Future(_) => 1,
                Effect::Parallel(inner) | Effect::Sequential(inner) => count_future_effects(inner),
                Effect::None | Effect::Delay { .. } => 0,
            })
            .sum()
    }

    /// Every effect is a no-op.
    ///
    /// # Panics
    ///
    /// Panics if any effect would do something when executed.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_no_effects<A: std::fmt::Debug>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().all(Effect::is_none),
            "expected only no-op effects, got {effects:?}"
        );
    }

    /// Exactly `expected` top-level effects.
    ///
    /// # Panics
    ///
    /// Panics on any other count.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_effects_count<A>(effects: &[Effect<A>], expected: usize) {
        assert_eq!(
            effects.len(),
            expected,
            "expected {expected} effects, got {}",
            effects.len()
        );
    }

    /// At least one `Future` effect, possibly nested.
    ///
    /// # Panics
    ///
    /// Panics if no effect would run a future.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_has_future_effect<A>(effects: &[Effect<A>]) {
        assert!(
            count_future_effects(effects) > 0,
            "expected a future effect, got none of {} effects",
            effects.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lifecycle_core::{SmallVec, smallvec};

    #[derive(Clone, Debug, PartialEq)]
    enum Door {
        Closed,
        Open,
        Locked,
    }

    #[derive(Clone, Debug)]
    enum DoorAction {
        Open,
        Close,
        Lock,
        Knock,
    }

    struct DoorReducer;

    impl Reducer for DoorReducer {
        type State = Door;
        type Action = DoorAction;
        type Environment = ();

        fn reduce(
            &self,
            state: &mut Door,
            action: DoorAction,
            _env: &(),
        ) -> SmallVec<[Effect<DoorAction>; 4]> {
            match (state.clone(), action) {
                (Door::Closed, DoorAction::Open) => *state = Door::Open,
                (Door::Open, DoorAction::Close) => *state = Door::Closed,
                (Door::Closed, DoorAction::Lock) => *state = Door::Locked,
                (Door::Locked, DoorAction::Knock) => {
                    return smallvec![Effect::merge(vec![
                        Effect::future(async { None }),
                        Effect::None,
                    ])];
                },
                _ => {},
            }
            smallvec![Effect::None]
        }
    }

    #[test]
    fn test_single_action() {
        ReducerTest::new(DoorReducer)
            .with_env(())
            .given_state(Door::Closed)
            .when_action(DoorAction::Open)
            .then_state(|door| assert_eq!(*door, Door::Open))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_action_sequence_checks_last_effects() {
        ReducerTest::new(DoorReducer)
            .with_env(())
            .given_state(Door::Open)
            .when_actions([DoorAction::Close, DoorAction::Lock, DoorAction::Knock])
            .then_state(|door| assert_eq!(*door, Door::Locked))
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_future_effect(effects);
            })
            .run();
    }

    #[test]
    #[should_panic(expected = "call when_action()")]
    fn test_run_without_actions_panics() {
        ReducerTest::new(DoorReducer)
            .with_env(())
            .given_state(Door::Closed)
            .run();
    }

    #[test]
    fn test_count_future_effects_nested() {
        let effects = [
            Effect::future(async { Some(DoorAction::Open) }),
            Effect::chain(vec![
                Effect::future(async { None }),
                Effect::merge(vec![Effect::future(async { Some(DoorAction::Close) })]),
            ]),
            Effect::Delay {
                duration: std::time::Duration::from_millis(1),
                action: Box::new(DoorAction::Knock),
            },
        ];
        assert_eq!(assertions::count_future_effects(&effects), 3);
    }

    #[test]
    fn test_no_effects_accepts_empty_groups() {
        assertions::assert_no_effects::<DoorAction>(&[]);
        assertions::assert_no_effects::<DoorAction>(&[Effect::merge(vec![Effect::None])]);
    }

    #[test]
    #[should_panic(expected = "expected only no-op effects")]
    fn test_no_effects_rejects_future() {
        assertions::assert_no_effects(&[Effect::future(async { Some(DoorAction::Knock) })]);
    }
}
