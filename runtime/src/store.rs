//! The store: shared state, serialized reduction and effect execution.

use crate::handle::{EffectGuard, Tracker};
use crate::{EffectHandle, StoreConfig, StoreError};
use lifecycle_core::{effect::Effect, reducer::Reducer};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{RwLock, broadcast};

const SHUTDOWN_POLL: Duration = Duration::from_millis(10);

/// Runs one reducer over one piece of state.
///
/// Reduction happens under the state's write lock, so transitions are
/// applied one at a time even when many tasks send concurrently. Effects run
/// on spawned tokio tasks and any action they produce is reduced like an
/// outside action, then published to [`subscribe_actions`](Self::subscribe_actions).
///
/// Clones share state, environment and shutdown flag.
pub struct Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    state: Arc<RwLock<S>>,
    reducer: R,
    environment: E,
    closing: Arc<AtomicBool>,
    in_flight: Arc<AtomicUsize>,
    shutdown_timeout: Duration,
    feedback: broadcast::Sender<A>,
}

impl<S, A, E, R> Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E> + Clone + Send + Sync + 'static,
    A: Send + Clone + 'static,
    S: Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Store with [`StoreConfig::default`]
    #[must_use]
    pub fn new(state: S, reducer: R, environment: E) -> Self {
        Self::with_config(state, reducer, environment, StoreConfig::default())
    }

    /// Store with explicit settings
    #[must_use]
    pub fn with_config(state: S, reducer: R, environment: E, config: StoreConfig) -> Self {
        let (feedback, _) = broadcast::channel(config.broadcast_capacity.max(1));

        Self {
            state: Arc::new(RwLock::new(state)),
            reducer,
            environment,
            closing: Arc::new(AtomicBool::new(false)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            shutdown_timeout: config.default_shutdown_timeout,
            feedback,
        }
    }

    /// Reduce `action` and start the effects it returns.
    ///
    /// Returns as soon as the effects are spawned; the handle resolves when
    /// they are done.
    ///
    /// # Errors
    ///
    /// [`StoreError::ShutdownInProgress`] once [`shutdown`](Self::shutdown) was called.
    #[tracing::instrument(skip(self, action), name = "store_send")]
    pub async fn send(&self, action: A) -> Result<EffectHandle, StoreError> {
        if self.is_shutting_down() {
            tracing::warn!("Store is shutting down, action rejected");
            metrics::counter!("store.shutdown.rejected_actions").increment(1);
            return Err(StoreError::ShutdownInProgress);
        }

        Ok(self.dispatch(action).await)
    }

    /// Send `action`, then wait for the first fed-back action matching `predicate`.
    ///
    /// The subscription is taken before sending, and actions are published
    /// after their reduction, so the state already includes the returned
    /// action.
    ///
    /// # Errors
    ///
    /// - [`StoreError::ShutdownInProgress`] if the store is shutting down
    /// - [`StoreError::Timeout`] if nothing matched in time
    /// - [`StoreError::ChannelClosed`] if the broadcast closed
    pub async fn send_and_wait_for<F>(
        &self,
        action: A,
        predicate: F,
        timeout: Duration,
    ) -> Result<A, StoreError>
    where
        F: Fn(&A) -> bool,
    {
        let mut observed = self.feedback.subscribe();
        self.send(action).await?;

        let matching = async {
            loop {
                match observed.recv().await {
                    Ok(candidate) if predicate(&candidate) => break Ok(candidate),
                    Ok(_) => {},
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Observer fell behind the feedback broadcast");
                    },
                    Err(broadcast::error::RecvError::Closed) => break Err(StoreError::ChannelClosed),
                }
            }
        };

        tokio::time::timeout(timeout, matching)
            .await
            .unwrap_or(Err(StoreError::Timeout))
    }

    /// Receive every action fed back by an effect, after it was reduced.
    ///
    /// Actions passed to [`send`](Self::send) are not published.
    #[must_use]
    pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
        self.feedback.subscribe()
    }

    /// Project the current state through `f` under the read lock
    pub async fn state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&S) -> T,
    {
        f(&*self.state.read().await)
    }

    /// Whether shutdown has begun
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.closing.load(Ordering::Acquire)
    }

    /// Effects running across every action sent to this store
    #[must_use]
    pub fn pending_effects(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Stop accepting actions and wait for running effects to drain.
    ///
    /// Actions fed back by those effects are still reduced.
    ///
    /// # Errors
    ///
    /// [`StoreError::ShutdownTimeout`] with the number of effects still
    /// running when `timeout` elapsed.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
        tracing::info!(?timeout, "Shutting down store");
        metrics::counter!("store.shutdown.initiated").increment(1);
        self.closing.store(true, Ordering::Release);

        let deadline = Instant::now() + timeout;
        loop {
            let running = self.pending_effects();
            if running == 0 {
                tracing::info!("Store drained");
                metrics::counter!("store.shutdown.completed").increment(1);
                return Ok(());
            }
            if Instant::now() >= deadline {
                tracing::error!(running, "Store shutdown timed out");
                metrics::counter!("store.shutdown.timeout").increment(1);
                return Err(StoreError::ShutdownTimeout(running));
            }
            tokio::time::sleep(SHUTDOWN_POLL).await;
        }
    }

    /// [`shutdown`](Self::shutdown) with the configured timeout
    ///
    /// # Errors
    ///
    /// As for [`shutdown`](Self::shutdown).
    pub async fn shutdown_default(&self) -> Result<(), StoreError> {
        self.shutdown(self.shutdown_timeout).await
    }

    /// Reduce and spawn effects, bypassing the shutdown gate
    async fn dispatch(&self, action: A) -> EffectHandle {
        metrics::counter!("store.commands.total").increment(1);
        let (handle, tracker) = EffectHandle::tracked();

        let effects = {
            let mut state = self.state.write().await;
            let started = Instant::now();
            let effects = tracing::debug_span!("reducer_execution")
                .in_scope(|| self.reducer.reduce(&mut *state, action, &self.environment));
            metrics::histogram!("store.reducer.duration_seconds")
                .record(started.elapsed().as_secs_f64());
            effects
        };

        #[allow(clippy::cast_precision_loss)] // effect counts are tiny
        let count = effects.len() as f64;
        metrics::histogram!("store.effects.count").record(count);
        tracing::trace!(count = effects.len(), "Reduced action");

        for effect in effects {
            self.run_effect(effect, &tracker);
        }
        handle
    }

    async fn feed_back(&self, action: A) {
        self.dispatch(action.clone()).await;
        // no subscribers is fine
        let _ = self.feedback.send(action);
    }

    fn run_effect(&self, effect: Effect<A>, tracker: &Tracker) {
        match effect {
            Effect::None => {
                metrics::counter!("store.effects.executed", "type" => "none").increment(1);
            },
            Effect::Parallel(effects) => {
                metrics::counter!("store.effects.executed", "type" => "parallel").increment(1);
                for effect in effects {
                    self.run_effect(effect, tracker);
                }
            },
            Effect::Future(fut) => {
                metrics::counter!("store.effects.executed", "type" => "future").increment(1);
                self.spawn_tracked(tracker, |store| async move {
                    match fut.await {
                        Some(action) => store.feed_back(action).await,
                        None => tracing::trace!("Future effect produced no action"),
                    }
                });
            },
            Effect::Delay { duration, action } => {
                metrics::counter!("store.effects.executed", "type" => "delay").increment(1);
                self.spawn_tracked(tracker, move |store| async move {
                    tokio::time::sleep(duration).await;
                    store.feed_back(*action).await;
                });
            },
            Effect::Sequential(effects) => {
                metrics::counter!("store.effects.executed", "type" => "sequential").increment(1);
                self.spawn_tracked(tracker, |store| async move {
                    for effect in effects {
                        let step = Tracker::new();
                        store.run_effect(effect, &step);
                        step.settled().await;
                    }
                });
            },
        }
    }

    /// Spawn a task counted on `tracker` and on the store-wide counter.
    ///
    /// A panic inside the task only ends that task; the guard still releases
    /// both counts.
    fn spawn_tracked<F, Fut>(&self, tracker: &Tracker, task: F)
    where
        F: FnOnce(Self) -> Fut,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let guard = EffectGuard::enter(&self.in_flight, tracker);
        let body = task(self.clone());
        tokio::spawn(async move {
            let _guard = guard;
            body.await;
        });
    }
}

impl<S, A, E, R> Clone for Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E> + Clone,
    E: Clone,
{
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            reducer: self.reducer.clone(),
            environment: self.environment.clone(),
            closing: Arc::clone(&self.closing),
            in_flight: Arc::clone(&self.in_flight),
            shutdown_timeout: self.shutdown_timeout,
            feedback: self.feedback.clone(),
        }
    }
}
