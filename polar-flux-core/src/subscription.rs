//! Cancellable handles for listener registrations
//!
//! Every `subscribe` call in this crate returns a [`Subscription`]. Dropping
//! the handle does not cancel it: registrations live until [`Subscription::cancel`]
//! is called, the same way a store keeps its wiring for its whole lifetime.
//! Use [`Subscription::into_guard`] or a [`SubscriptionSet`] to tie the
//! registration to a scope instead.
//!
//! # Example
//!
//! ```
//! use polar_flux_core::{Subject, SubscriptionSet};
//!
//! let ticks = Subject::<u32>::new();
//! let mut subs = SubscriptionSet::new();
//!
//! subs.add(ticks.subscribe(|n| println!("tick {n}")));
//! subs.add(ticks.subscribe(|n| println!("also tick {n}")));
//! assert_eq!(ticks.subscriber_count(), 2);
//!
//! subs.cancel_all();
//! assert_eq!(ticks.subscriber_count(), 0);
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

type Teardown = Box<dyn FnOnce() + Send>;

struct Inner {
    closed: AtomicBool,
    teardown: Mutex<Option<Teardown>>,
}

/// Handle representing one listener's registration on a channel.
///
/// Clones share the same registration, so a clone can be moved into the
/// listener itself and cancelled from inside the callback.
#[derive(Clone)]
pub struct Subscription {
    inner: Arc<Inner>,
}

impl Subscription {
    /// Create a subscription that runs `teardown` once, on the first cancel.
    pub fn new<F>(teardown: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            inner: Arc::new(Inner {
                closed: AtomicBool::new(false),
                teardown: Mutex::new(Some(Box::new(teardown))),
            }),
        }
    }

    /// A subscription that is already closed.
    pub fn empty() -> Self {
        Self {
            inner: Arc::new(Inner {
                closed: AtomicBool::new(true),
                teardown: Mutex::new(None),
            }),
        }
    }

    /// Stop delivering values to the listener.
    ///
    /// Idempotent. Safe to call from inside the listener while it is being
    /// notified; no value is delivered to it after this returns.
    pub fn cancel(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let teardown = self.inner.teardown.lock().take();
        if let Some(teardown) = teardown {
            teardown();
        }
    }

    /// Returns true once [`cancel`](Self::cancel) has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Convert into a guard that cancels the subscription when dropped.
    pub fn into_guard(self) -> SubscriptionGuard {
        SubscriptionGuard {
            subscription: self,
            armed: true,
        }
    }

    /// Cancel this subscription when `token` is cancelled.
    ///
    /// Spawns a watcher task, so this must be called from within a tokio
    /// runtime. The watcher is aborted if the subscription is cancelled first.
    pub fn cancel_on(&self, token: CancellationToken) {
        let subscription = self.clone();
        let handle = tokio::spawn(async move {
            token.cancelled().await;
            subscription.cancel();
        });
        let abort = handle.abort_handle();
        self.chain_teardown(move || abort.abort());
    }

    /// Append extra teardown work, running it immediately if already closed.
    fn chain_teardown<F>(&self, extra: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut slot = self.inner.teardown.lock();
        if self.inner.closed.load(Ordering::Acquire) {
            drop(slot);
            extra();
            return;
        }
        let previous = slot.take();
        *slot = Some(Box::new(move || {
            if let Some(previous) = previous {
                previous();
            }
            extra();
        }));
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// RAII wrapper that cancels its subscription on drop.
#[derive(Debug)]
#[must_use = "dropping the guard cancels the subscription immediately"]
pub struct SubscriptionGuard {
    subscription: Subscription,
    armed: bool,
}

impl SubscriptionGuard {
    /// Borrow the underlying subscription.
    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    /// Release the subscription without cancelling it.
    pub fn disarm(mut self) -> Subscription {
        self.armed = false;
        self.subscription.clone()
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        if self.armed {
            self.subscription.cancel();
        }
    }
}

/// Owns a group of subscriptions and cancels them together.
///
/// Useful for a view that listens to several stores and actions and wants
/// to detach from all of them at once. Everything still held is cancelled
/// on drop.
#[derive(Debug, Default)]
pub struct SubscriptionSet {
    subscriptions: Vec<Subscription>,
}

impl SubscriptionSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a subscription.
    pub fn add(&mut self, subscription: Subscription) -> &mut Self {
        self.subscriptions.retain(|s| !s.is_closed());
        self.subscriptions.push(subscription);
        self
    }

    /// Number of subscriptions that are still open.
    pub fn len(&self) -> usize {
        self.subscriptions.iter().filter(|s| !s.is_closed()).count()
    }

    /// Returns true if no open subscriptions remain.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cancel every subscription in the set.
    pub fn cancel_all(&mut self) {
        for subscription in self.subscriptions.drain(..) {
            subscription.cancel();
        }
    }
}

impl Drop for SubscriptionSet {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
