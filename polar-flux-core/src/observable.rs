//! Read-only, subscribable views over actions and stores
//!
//! An [`Observable`] is just a subscribe function. Stores hand them out from
//! `observe()`, actions do the same, and the operators here derive new views
//! without touching the source.
//!
//! # Example
//!
//! ```
//! use polar_flux_core::BehaviorSubject;
//! use std::sync::{Arc, Mutex};
//!
//! let celsius = BehaviorSubject::new(20);
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = seen.clone();
//!
//! celsius
//!     .observe()
//!     .map(|c| c * 9 / 5 + 32)
//!     .distinct_until_changed()
//!     .subscribe(move |f| sink.lock().unwrap().push(*f));
//!
//! celsius.next(20);
//! celsius.next(25);
//! assert_eq!(*seen.lock().unwrap(), vec![68, 77]);
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::subject::Handler;
use crate::subscription::Subscription;

type SubscribeFn<T> = dyn Fn(Handler<T>) -> Subscription + Send + Sync;

/// A subscribable stream of `T` values.
///
/// Whether a new subscriber first receives the latest value depends on the
/// source: store views replay it, action views do not.
pub struct Observable<T> {
    subscribe: Arc<SubscribeFn<T>>,
}

impl<T: 'static> Observable<T> {
    /// Build an observable from a subscribe function.
    pub fn new<F>(subscribe: F) -> Self
    where
        F: Fn(Handler<T>) -> Subscription + Send + Sync + 'static,
    {
        Self {
            subscribe: Arc::new(subscribe),
        }
    }

    /// Register `handler` and return the handle that cancels it.
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        (self.subscribe)(Arc::new(handler))
    }

    /// Project every value through `f`.
    pub fn map<U, F>(&self, f: F) -> Observable<U>
    where
        U: 'static,
        F: Fn(&T) -> U + Send + Sync + 'static,
    {
        let source = self.clone();
        let f = Arc::new(f);
        Observable::new(move |next: Handler<U>| {
            let f = Arc::clone(&f);
            source.subscribe(move |value| next(&f(value)))
        })
    }

    /// Only forward values for which `predicate` returns true.
    pub fn filter<F>(&self, predicate: F) -> Observable<T>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let source = self.clone();
        let predicate = Arc::new(predicate);
        Observable::new(move |next: Handler<T>| {
            let predicate = Arc::clone(&predicate);
            source.subscribe(move |value| {
                if predicate(value) {
                    next(value);
                }
            })
        })
    }

    /// Forward at most `count` values, then cancel the upstream registration.
    pub fn take(&self, count: usize) -> Observable<T> {
        let source = self.clone();
        Observable::new(move |next: Handler<T>| {
            if count == 0 {
                return Subscription::empty();
            }

            let remaining = Arc::new(AtomicUsize::new(count));
            let done = Arc::new(AtomicBool::new(false));
            let upstream: Arc<Mutex<Option<Subscription>>> = Arc::default();

            let subscription = source.subscribe({
                let remaining = Arc::clone(&remaining);
                let done = Arc::clone(&done);
                let upstream = Arc::clone(&upstream);
                move |value| {
                    let Ok(before) =
                        remaining.fetch_update(Ordering::AcqRel, Ordering::Acquire, |r| {
                            r.checked_sub(1)
                        })
                    else {
                        return;
                    };
                    next(value);
                    if before == 1 {
                        done.store(true, Ordering::Release);
                        let handle = upstream.lock().take();
                        if let Some(handle) = handle {
                            handle.cancel();
                        }
                    }
                }
            });

            // The limit can be hit during subscribe itself (replaying sources),
            // before the handle exists.
            *upstream.lock() = Some(subscription.clone());
            if done.load(Ordering::Acquire) {
                subscription.cancel();
            }
            subscription
        })
    }

    /// Forward only the first value.
    pub fn first(&self) -> Observable<T> {
        self.take(1)
    }
}

impl<T> Observable<T>
where
    T: PartialEq + Clone + Send + 'static,
{
    /// Drop values equal to the one forwarded just before.
    ///
    /// Each subscriber keeps its own memory of the last forwarded value.
    pub fn distinct_until_changed(&self) -> Observable<T> {
        let source = self.clone();
        Observable::new(move |next: Handler<T>| {
            let last: Mutex<Option<T>> = Mutex::new(None);
            source.subscribe(move |value| {
                {
                    let mut previous = last.lock();
                    if (*previous).as_ref() == Some(value) {
                        return;
                    }
                    *previous = Some(value.clone());
                }
                next(value);
            })
        })
    }
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            subscribe: Arc::clone(&self.subscribe),
        }
    }
}

impl<T> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable").finish_non_exhaustive()
    }
}
