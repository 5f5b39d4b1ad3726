//! State stores with serialized transitions
//!
//! A [`Store`] owns exactly one current state value and exposes it as a
//! replaying stream. It has no public way to change that value: transitions
//! are declared once, while the store is being defined, through a
//! [`StoreContext`]. Usually each transition is wired to an [`Action`] and
//! only the execute-only [`ActionHandle`](crate::ActionHandle) is handed out.
//!
//! # Example
//! ```
//! use polar_flux_core::{ActionHandle, Store};
//!
//! #[derive(Clone, Debug, PartialEq)]
//! struct Counter {
//!     value: i64,
//! }
//!
//! let (store, add) = Store::define(Counter { value: 1 }, |ctx| {
//!     ctx.create_reducer(|state: &Counter, n: &i64| Counter {
//!         value: state.value + n,
//!     })
//!     .handle()
//! });
//!
//! add.execute(5);
//! assert_eq!(store.state().value, 6);
//! ```

use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::action::Action;
use crate::error::UpdateError;
use crate::middleware::{Middleware, NoopMiddleware};
use crate::observable::Observable;
use crate::subject::BehaviorSubject;
use crate::subscription::Subscription;

const DEFAULT_NAME: &str = "store";

struct StoreInner<S> {
    name: Arc<str>,
    state: BehaviorSubject<S>,
    middleware: Arc<dyn Middleware<S>>,
}

/// Owner of one immutable state value.
///
/// `S` is treated as a value: transitions replace it wholesale, and
/// subscribers receive shared references to each published version.
/// Clones are handles to the same store.
pub struct Store<S> {
    inner: Arc<StoreInner<S>>,
}

impl<S: Send + Sync + 'static> Store<S> {
    /// Create a store with no transitions.
    pub fn new(initial: S) -> Self {
        Self::builder(initial).build()
    }

    /// Start configuring a store.
    pub fn builder(initial: S) -> StoreBuilder<S> {
        StoreBuilder::new(initial)
    }

    /// Create a store and declare its transitions.
    ///
    /// `define` runs exactly once, before the store is returned. Whatever it
    /// returns (typically the store's public action handles) is handed back
    /// alongside the store.
    pub fn define<T, F>(initial: S, define: F) -> (Self, T)
    where
        F: FnOnce(&StoreContext<S>) -> T,
    {
        Self::builder(initial).define(define)
    }

    /// Name used in logs.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Replaying view of the state: the current value first, then every
    /// later one.
    pub fn observe(&self) -> Observable<S> {
        self.inner.state.observe()
    }

    /// Listen to the state, starting with the current value.
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&S) + Send + Sync + 'static,
    {
        trace!(store = %self.inner.name, "subscribing to state");
        self.inner.state.subscribe(handler)
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> Arc<S> {
        self.inner.state.value()
    }

    /// Number of transitions published so far.
    pub fn version(&self) -> u64 {
        self.inner.state.version()
    }

    /// Number of state subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.state.subscriber_count()
    }
}

impl<S> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: fmt::Debug + Send + Sync + 'static> fmt::Debug for Store<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("name", &self.inner.name)
            .field("state", &self.state())
            .field("version", &self.version())
            .finish()
    }
}

/// Read access shared by [`Store`] and the concrete stores built on it.
///
/// A concrete store implements [`store`](Self::store) and gets the rest.
pub trait ObservableStore<S: Send + Sync + 'static> {
    /// The store holding the state.
    fn store(&self) -> &Store<S>;

    /// Replaying view of the state.
    fn observe(&self) -> Observable<S> {
        self.store().observe()
    }

    /// Listen to the state, starting with the current value.
    fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&S) + Send + Sync + 'static,
        Self: Sized,
    {
        self.store().subscribe(handler)
    }

    /// Snapshot of the current state.
    fn state(&self) -> Arc<S> {
        self.store().state()
    }
}

impl<S: Send + Sync + 'static> ObservableStore<S> for Store<S> {
    fn store(&self) -> &Store<S> {
        self
    }
}

// ============================================================================
// StoreContext
// ============================================================================

/// The privileged side of a store: state transitions and action wiring.
///
/// Only handed out by [`Store::define`] / [`StoreBuilder::define`]. Handlers
/// that need to change the state capture a clone of it.
pub struct StoreContext<S> {
    store: Store<S>,
}

impl<S> Clone for StoreContext<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: Send + Sync + 'static> StoreContext<S> {
    /// The store this context changes.
    pub fn store(&self) -> &Store<S> {
        &self.store
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> Arc<S> {
        self.store.state()
    }

    /// Replace the state with `transform(current)` and notify subscribers,
    /// as one indivisible step.
    ///
    /// Calls from other threads wait for the in-flight transition. Calls made
    /// from inside a subscriber or transform on the same thread are queued
    /// and applied after the current transition has reached every
    /// subscriber. If `transform` panics the previous state stays in place
    /// and the panic propagates.
    pub fn update_state<F>(&self, transform: F)
    where
        F: FnOnce(&S) -> S + Send + 'static,
    {
        let name = Arc::clone(&self.store.inner.name);
        let middleware = Arc::clone(&self.store.inner.middleware);
        self.store.inner.state.update(move |current| {
            middleware.before(&name, current);
            let next = transform(current);
            middleware.after(&name, current, &next);
            trace!(store = %name, "state transition");
            next
        });
    }

    /// Like [`update_state`](Self::update_state), but `transform` may refuse
    /// the transition, leaving the state untouched.
    ///
    /// Returns [`UpdateError::Deferred`] when called from inside a running
    /// transition on the same thread; the transform then runs later and a
    /// refusal is only logged.
    pub fn try_update_state<F, E>(&self, transform: F) -> Result<(), UpdateError<E>>
    where
        F: FnOnce(&S) -> Result<S, E> + Send + 'static,
        E: fmt::Debug + Send + 'static,
    {
        let name = Arc::clone(&self.store.inner.name);
        let middleware = Arc::clone(&self.store.inner.middleware);
        self.store.inner.state.try_update(move |current| {
            middleware.before(&name, current);
            let next = transform(current)?;
            middleware.after(&name, current, &next);
            trace!(store = %name, "state transition");
            Ok(next)
        })
    }

    /// Create a fresh, unwired action owned by this store.
    pub fn create_action<P: 'static>(&self) -> Action<P> {
        Action::named(format!("{}.action", self.store.inner.name))
    }

    /// Create a fresh, unwired action with a name used in logs.
    pub fn create_named_action<P: 'static>(&self, name: &str) -> Action<P> {
        Action::named(format!("{}.{}", self.store.inner.name, name))
    }

    /// Create an action and let `wire` attach its listeners.
    ///
    /// `wire` runs once, synchronously, before the action is returned, so
    /// nobody can execute the action before its handlers are in place.
    pub fn create_action_advanced<P, F>(&self, wire: F) -> Action<P>
    where
        P: 'static,
        F: FnOnce(&Action<P>),
    {
        let action = self.create_action();
        wire(&action);
        action
    }

    /// Create an action with exactly one listener, `handler`.
    pub fn create_action_and_subscribe<P, F>(&self, handler: F) -> Action<P>
    where
        P: 'static,
        F: Fn(&P) + Send + Sync + 'static,
    {
        self.create_action_advanced(|action| {
            action.subscribe(handler);
        })
    }

    /// Create an action whose every execution applies `reducer` to the state.
    ///
    /// Shorthand for wiring `update_state` by hand; the parameter is cloned
    /// into the queued transform.
    pub fn create_reducer<P, F>(&self, reducer: F) -> Action<P>
    where
        P: Clone + Send + 'static,
        F: Fn(&S, &P) -> S + Send + Sync + 'static,
    {
        let ctx = self.clone();
        let reducer = Arc::new(reducer);
        self.create_action_and_subscribe(move |parameter: &P| {
            let reducer = Arc::clone(&reducer);
            let parameter = parameter.clone();
            ctx.update_state(move |state| reducer(state, &parameter));
        })
    }
}

impl<S: fmt::Debug + Send + Sync + 'static> fmt::Debug for StoreContext<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StoreContext").field(&self.store).finish()
    }
}

// ============================================================================
// StoreBuilder
// ============================================================================

/// Configuration for a new [`Store`].
///
/// # Example
/// ```
/// use polar_flux_core::{LoggingMiddleware, Store};
///
/// let store = Store::builder(0u32)
///     .name("ticks")
///     .middleware(LoggingMiddleware::new())
///     .build();
/// assert_eq!(store.name(), "ticks");
/// ```
pub struct StoreBuilder<S> {
    initial: S,
    name: Arc<str>,
    middleware: Arc<dyn Middleware<S>>,
}

impl<S: Send + Sync + 'static> StoreBuilder<S> {
    /// Start from the initial state, with default name and no middleware.
    pub fn new(initial: S) -> Self {
        Self {
            initial,
            name: Arc::from(DEFAULT_NAME),
            middleware: Arc::new(NoopMiddleware),
        }
    }

    /// Name used in logs and as prefix for action names.
    pub fn name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Middleware called around every transition. Replaces any previous one;
    /// use [`ComposedMiddleware`](crate::ComposedMiddleware) for several.
    pub fn middleware<M: Middleware<S> + 'static>(mut self, middleware: M) -> Self {
        self.middleware = Arc::new(middleware);
        self
    }

    /// Create the store without declaring transitions.
    pub fn build(self) -> Store<S> {
        debug!(store = %self.name, "Creating store");
        Store {
            inner: Arc::new(StoreInner {
                name: self.name,
                state: BehaviorSubject::new(self.initial),
                middleware: self.middleware,
            }),
        }
    }

    /// Create the store and declare its transitions, see [`Store::define`].
    pub fn define<T, F>(self, define: F) -> (Store<S>, T)
    where
        F: FnOnce(&StoreContext<S>) -> T,
    {
        let store = self.build();
        let ctx = StoreContext {
            store: store.clone(),
        };
        let exposed = define(&ctx);
        (store, exposed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionHandle;
    use std::sync::Mutex;

    #[derive(Clone, Debug, PartialEq)]
    struct Counter {
        value: i64,
    }

    fn collect(store: &Store<Counter>) -> Arc<Mutex<Vec<i64>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        store.subscribe(move |s| sink.lock().unwrap().push(s.value));
        seen
    }

    #[test]
    fn test_replays_initial_state() {
        let store = Store::new(Counter { value: 1 });
        let seen = collect(&store);
        assert_eq!(*seen.lock().unwrap(), vec![1]);
        assert_eq!(store.version(), 0);
        assert_eq!(store.name(), "store");
    }

    #[test]
    fn test_sequential_updates_are_not_lost() {
        let (store, ctx) = Store::define(Counter { value: 1 }, |ctx| ctx.clone());
        let seen = collect(&store);

        ctx.update_state(|s| Counter { value: s.value + 1 });
        ctx.update_state(|s| Counter { value: s.value + 10 });

        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 12]);
        assert_eq!(store.state().value, 12);
        assert_eq!(store.version(), 2);
    }

    #[test]
    fn test_wire_runs_before_action_is_returned() {
        let wired_with = Arc::new(Mutex::new(None));
        let (_store, action) = Store::define(Counter { value: 0 }, |ctx| {
            let record = wired_with.clone();
            ctx.create_action_advanced::<i64, _>(|action| {
                *record.lock().unwrap() = Some(action.listener_count());
                let ctx = ctx.clone();
                action.subscribe(move |n| {
                    let n = *n;
                    ctx.update_state(move |s| Counter { value: s.value + n });
                });
            })
        });

        assert_eq!(*wired_with.lock().unwrap(), Some(0));
        assert_eq!(action.listener_count(), 1);
        assert_eq!(action.name(), "store.action");
    }

    #[test]
    fn test_create_action_and_subscribe() {
        let (store, increment) = Store::define(Counter { value: 1 }, |ctx| {
            let updater = ctx.clone();
            ctx.create_action_and_subscribe(move |_: &()| {
                updater.update_state(|s| Counter { value: s.value + 1 });
            })
            .handle()
        });
        let seen = collect(&store);

        increment.execute(());
        increment.execute(());
        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_reducer_action() {
        let (store, add): (_, ActionHandle<i64>) =
            Store::define(Counter { value: 1 }, |ctx| {
                ctx.create_reducer(|s: &Counter, n: &i64| Counter { value: s.value + n })
                    .handle()
            });
        let seen = collect(&store);

        add.execute(5);
        add.execute(-2);
        assert_eq!(*seen.lock().unwrap(), vec![1, 6, 4]);
    }

    #[test]
    fn test_try_update_state_rejection() {
        let (store, ctx) = Store::define(Counter { value: 3 }, |ctx| ctx.clone());
        let seen = collect(&store);

        let result = ctx.try_update_state(|s| {
            if s.value - 5 < 0 {
                Err("would go negative")
            } else {
                Ok(Counter { value: s.value - 5 })
            }
        });

        assert_eq!(result, Err(UpdateError::Rejected("would go negative")));
        assert_eq!(*seen.lock().unwrap(), vec![3]);
        assert_eq!(store.version(), 0);
    }

    #[test]
    fn test_subscriber_feedback_is_serialized() {
        let (store, ctx) = Store::define(Counter { value: 0 }, |ctx| ctx.clone());

        // A subscriber that reacts to odd values by bumping the counter again.
        let feedback = ctx.clone();
        store.subscribe(move |s| {
            if s.value % 2 == 1 {
                feedback.update_state(|s| Counter { value: s.value + 1 });
            }
        });
        let seen = collect(&store);

        ctx.update_state(|s| Counter { value: s.value + 1 });
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
    }

    struct Recording(Arc<Mutex<Vec<(i64, i64)>>>);

    impl Middleware<Counter> for Recording {
        fn before(&self, _store: &str, _current: &Counter) {}

        fn after(&self, _store: &str, previous: &Counter, next: &Counter) {
            self.0.lock().unwrap().push((previous.value, next.value));
        }
    }

    #[test]
    fn test_middleware_sees_each_transition() {
        let transitions = Arc::new(Mutex::new(Vec::new()));
        let (store, add) = Store::builder(Counter { value: 1 })
            .name("counter")
            .middleware(Recording(transitions.clone()))
            .define(|ctx| {
                ctx.create_reducer(|s: &Counter, n: &i64| Counter { value: s.value + n })
            });

        add.execute(1);
        add.execute(10);

        assert_eq!(store.name(), "counter");
        assert_eq!(add.name(), "counter.action");
        assert_eq!(*transitions.lock().unwrap(), vec![(1, 2), (2, 12)]);
    }

    #[test]
    fn test_middleware_skips_after_on_rejection() {
        let transitions = Arc::new(Mutex::new(Vec::new()));
        let (_store, ctx) = Store::builder(Counter { value: 1 })
            .middleware(Recording(transitions.clone()))
            .define(|ctx| ctx.clone());

        let _ = ctx.try_update_state(|_| Err::<Counter, _>(()));
        assert!(transitions.lock().unwrap().is_empty());
    }

    struct Wallet {
        store: Store<Counter>,
        deposit: ActionHandle<i64>,
    }

    impl ObservableStore<Counter> for Wallet {
        fn store(&self) -> &Store<Counter> {
            &self.store
        }
    }

    #[test]
    fn test_concrete_store_through_trait() {
        let (store, deposit) = Store::define(Counter { value: 0 }, |ctx| {
            ctx.create_reducer(|s: &Counter, n: &i64| Counter { value: s.value + n })
                .handle()
        });
        let wallet = Wallet { store, deposit };

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        wallet.subscribe(move |s| sink.lock().unwrap().push(s.value));

        wallet.deposit.execute(40);
        assert_eq!(*seen.lock().unwrap(), vec![0, 40]);
        assert_eq!(wallet.state().value, 40);
    }
}
