//! Core primitives for polar-flux
//!
//! This crate provides the building blocks for unidirectional data flow:
//! state lives in stores, and the only way to change it is to execute one
//! of the store's actions.
//!
//! # Core Concepts
//!
//! - **Action**: a typed trigger; executing it notifies its listeners in order
//! - **Store**: owner of one immutable state value, observable with replay of
//!   the latest value
//! - **StoreContext**: the privileged side of a store, used only while
//!   defining it, to declare transitions and wire actions to them
//! - **Subject / BehaviorSubject**: the multicast channels behind actions and
//!   stores
//! - **Subscription**: cancellable handle for a listener registration
//!
//! # Data flow
//!
//! `action.execute(p)` notifies the action's listeners → a listener calls
//! `update_state` with a pure transform → the store computes the new state,
//! replaces the old one and notifies its subscribers in subscription order.
//! All of it happens synchronously on the caller's thread.
//!
//! # Basic Example
//!
//! ```
//! use polar_flux_core::prelude::*;
//!
//! #[derive(Clone, Debug, PartialEq)]
//! struct CounterState {
//!     value: i64,
//! }
//!
//! struct CounterStore {
//!     store: Store<CounterState>,
//!     increment: ActionHandle<()>,
//!     add: ActionHandle<i64>,
//! }
//!
//! impl CounterStore {
//!     fn new() -> Self {
//!         let (store, (increment, add)) = Store::define(CounterState { value: 1 }, |ctx| {
//!             let updater = ctx.clone();
//!             let increment = ctx.create_action_and_subscribe(move |_: &()| {
//!                 updater.update_state(|s| CounterState { value: s.value + 1 });
//!             });
//!             let add = ctx.create_reducer(|s: &CounterState, n: &i64| CounterState {
//!                 value: s.value + n,
//!             });
//!             (increment.handle(), add.handle())
//!         });
//!         Self { store, increment, add }
//!     }
//! }
//!
//! impl ObservableStore<CounterState> for CounterStore {
//!     fn store(&self) -> &Store<CounterState> {
//!         &self.store
//!     }
//! }
//!
//! let counter = CounterStore::new();
//! let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
//! let sink = seen.clone();
//! counter.subscribe(move |s| sink.lock().unwrap().push(s.value));
//!
//! counter.increment.execute(());
//! counter.add.execute(5);
//! assert_eq!(*seen.lock().unwrap(), vec![1, 2, 7]);
//! ```
//!
//! # Threads
//!
//! Stores and actions are `Send + Sync`. Transitions on one store are
//! serialized: other threads wait for the in-flight transition, and
//! transitions requested from inside a subscriber on the same thread are
//! queued behind it. See [`subject`] for details.

pub mod action;
pub mod error;
pub mod middleware;
pub mod observable;
pub mod store;
#[cfg(feature = "stream")]
pub mod stream;
pub mod subject;
pub mod subscription;
pub mod testing;

// Action exports
pub use action::{Action, ActionHandle, Execute};

// Store exports
pub use store::{ObservableStore, Store, StoreBuilder, StoreContext};

// Middleware exports
pub use middleware::{ComposedMiddleware, LoggingMiddleware, Middleware, NoopMiddleware};

// Channel exports
pub use observable::Observable;
pub use subject::{BehaviorSubject, Handler, Subject};
pub use subscription::{Subscription, SubscriptionGuard, SubscriptionSet};

pub use error::UpdateError;

// Stream exports (requires "stream" feature)
#[cfg(feature = "stream")]
pub use stream::ObservableStream;

// Testing exports
pub use testing::Recorder;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::action::{Action, ActionHandle, Execute};
    pub use crate::error::UpdateError;
    pub use crate::middleware::{
        ComposedMiddleware, LoggingMiddleware, Middleware, NoopMiddleware,
    };
    pub use crate::observable::Observable;
    pub use crate::store::{ObservableStore, Store, StoreBuilder, StoreContext};
    pub use crate::subscription::{Subscription, SubscriptionGuard, SubscriptionSet};
}
