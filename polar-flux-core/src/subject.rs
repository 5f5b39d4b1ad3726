//! Multicast channels backing actions and stores
//!
//! Two flavours, both with synchronous, in-order fan-out:
//!
//! - [`Subject`]: hot channel. Listeners only see values emitted after they
//!   subscribed. Backs [`Action`](crate::Action).
//! - [`BehaviorSubject`]: holds the latest value and replays it to every new
//!   listener before anything else. Backs [`Store`](crate::Store).
//!
//! # Serialization
//!
//! A `BehaviorSubject` serializes every publish behind a re-entrant lock.
//! Calls from other threads wait until the in-flight publish (including its
//! fan-out) has completed. Calls made on the publishing thread from inside a
//! listener or transform are queued and applied, in order, once the current
//! publish finishes. Every listener therefore sees the same gap-free
//! sequence of values.
//!
//! Listeners must not block on another thread that is itself publishing to
//! the same subject; that is a lock-order deadlock like any other.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard};
use tracing::{trace, warn};

use crate::error::UpdateError;
use crate::observable::Observable;
use crate::subscription::Subscription;

/// Shared listener callback.
pub type Handler<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Listener<T> {
    id: u64,
    active: AtomicBool,
    handler: Handler<T>,
}

impl<T> Listener<T> {
    fn call(&self, value: &T) {
        if self.active.load(Ordering::Acquire) {
            (self.handler)(value);
        }
    }
}

/// Registration-ordered listener list shared by both subject kinds.
struct Listeners<T> {
    next_id: AtomicU64,
    entries: Mutex<Vec<Arc<Listener<T>>>>,
}

impl<T: 'static> Listeners<T> {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            next_id: AtomicU64::new(0),
            entries: Mutex::new(Vec::new()),
        })
    }

    fn add(self: &Arc<Self>, handler: Handler<T>) -> Subscription {
        let listener = Arc::new(Listener {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            active: AtomicBool::new(true),
            handler,
        });
        self.entries.lock().push(listener.clone());

        let list: Weak<Self> = Arc::downgrade(self);
        Subscription::new(move || {
            listener.active.store(false, Ordering::Release);
            if let Some(list) = list.upgrade() {
                list.entries.lock().retain(|l| l.id != listener.id);
            }
        })
    }

    /// Notify the listeners registered right now, in registration order.
    fn emit(&self, value: &T) {
        let snapshot = self.entries.lock().clone();
        for listener in snapshot {
            listener.call(value);
        }
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

// ============================================================================
// Subject
// ============================================================================

/// Hot multicast channel with no memory of past values.
///
/// # Example
///
/// ```
/// use polar_flux_core::Subject;
/// use std::sync::{Arc, Mutex};
///
/// let subject = Subject::new();
/// subject.next(&1);
///
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let sink = seen.clone();
/// subject.subscribe(move |n: &i32| sink.lock().unwrap().push(*n));
///
/// subject.next(&2);
/// assert_eq!(*seen.lock().unwrap(), vec![2]);
/// ```
pub struct Subject<T> {
    listeners: Arc<Listeners<T>>,
}

impl<T: 'static> Subject<T> {
    /// Create a subject with no listeners.
    pub fn new() -> Self {
        Self {
            listeners: Listeners::new(),
        }
    }

    /// Deliver `value` to every current listener before returning.
    pub fn next(&self, value: &T) {
        self.listeners.emit(value);
    }

    /// Register a listener for values emitted from now on.
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.subscribe_handler(Arc::new(handler))
    }

    pub(crate) fn subscribe_handler(&self, handler: Handler<T>) -> Subscription {
        self.listeners.add(handler)
    }

    /// Read-only view of this subject.
    pub fn observe(&self) -> Observable<T> {
        let subject = self.clone();
        Observable::new(move |handler| subject.subscribe_handler(handler))
    }

    /// Number of registered listeners.
    pub fn subscriber_count(&self) -> usize {
        self.listeners.len()
    }
}

impl<T: 'static> Default for Subject<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Subject<T> {
    fn clone(&self) -> Self {
        Self {
            listeners: Arc::clone(&self.listeners),
        }
    }
}

impl<T: 'static> fmt::Debug for Subject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subject")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// BehaviorSubject
// ============================================================================

type Transform<T> = Box<dyn FnOnce(&T) -> Option<T> + Send>;

struct Slot<T> {
    current: Arc<T>,
    version: u64,
    draining: bool,
    pending: VecDeque<Transform<T>>,
}

struct BehaviorInner<T> {
    slot: ReentrantMutex<RefCell<Slot<T>>>,
    listeners: Arc<Listeners<T>>,
}

/// Replay-latest channel with serialized read-modify-publish.
///
/// # Example
///
/// ```
/// use polar_flux_core::BehaviorSubject;
/// use std::sync::{Arc, Mutex};
///
/// let count = BehaviorSubject::new(1);
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let sink = seen.clone();
/// count.subscribe(move |n: &i32| sink.lock().unwrap().push(*n));
///
/// count.update(|n| n + 1);
/// count.update(|n| n + 10);
///
/// assert_eq!(*seen.lock().unwrap(), vec![1, 2, 12]);
/// assert_eq!(count.version(), 2);
/// ```
pub struct BehaviorSubject<T> {
    inner: Arc<BehaviorInner<T>>,
}

enum Entry<'a, T> {
    /// This call owns the publish loop.
    Fresh(Drain<'a, T>),
    /// A publish is already running further up this thread's stack.
    Nested(ReentrantMutexGuard<'a, RefCell<Slot<T>>>),
}

/// Exclusive right to publish, held for the whole drain loop.
struct Drain<'a, T> {
    slot: ReentrantMutexGuard<'a, RefCell<Slot<T>>>,
    listeners: &'a Listeners<T>,
}

impl<T: Send + Sync + 'static> Drain<'_, T> {
    fn current(&self) -> Arc<T> {
        Arc::clone(&self.slot.borrow().current)
    }

    fn publish(&self, value: T) {
        let value = Arc::new(value);
        let version = {
            let mut slot = self.slot.borrow_mut();
            slot.current = Arc::clone(&value);
            slot.version += 1;
            slot.version
        };
        trace!(version, listeners = self.listeners.len(), "publishing value");
        self.listeners.emit(&value);
    }

    /// Apply everything queued by nested calls, oldest first.
    fn finish(self) {
        loop {
            let next = self.slot.borrow_mut().pending.pop_front();
            let Some(transform) = next else {
                break;
            };
            let current = self.current();
            if let Some(value) = transform(&current) {
                self.publish(value);
            }
        }
    }
}

impl<T> Drop for Drain<'_, T> {
    fn drop(&mut self) {
        // After `finish` the queue is already empty. When a transform or
        // listener panicked, whatever was still queued is discarded here.
        let discarded = {
            let mut slot = self.slot.borrow_mut();
            slot.draining = false;
            std::mem::take(&mut slot.pending)
        };
        drop(discarded);
    }
}

impl<T: Send + Sync + 'static> BehaviorSubject<T> {
    /// Create a subject holding `initial` as version 0.
    pub fn new(initial: T) -> Self {
        Self {
            inner: Arc::new(BehaviorInner {
                slot: ReentrantMutex::new(RefCell::new(Slot {
                    current: Arc::new(initial),
                    version: 0,
                    draining: false,
                    pending: VecDeque::new(),
                })),
                listeners: Listeners::new(),
            }),
        }
    }

    fn enter(&self) -> Entry<'_, T> {
        let slot = self.inner.slot.lock();
        if slot.borrow().draining {
            return Entry::Nested(slot);
        }
        slot.borrow_mut().draining = true;
        Entry::Fresh(Drain {
            slot,
            listeners: &self.inner.listeners,
        })
    }

    /// Snapshot of the latest value.
    pub fn value(&self) -> Arc<T> {
        Arc::clone(&self.inner.slot.lock().borrow().current)
    }

    /// Number of values published since construction.
    pub fn version(&self) -> u64 {
        self.inner.slot.lock().borrow().version
    }

    /// Replace the current value and notify listeners.
    pub fn next(&self, value: T) {
        match self.enter() {
            Entry::Fresh(drain) => {
                drain.publish(value);
                drain.finish();
            }
            Entry::Nested(slot) => {
                trace!("publish queued behind in-flight publish");
                slot.borrow_mut()
                    .pending
                    .push_back(Box::new(move |_| Some(value)));
            }
        }
    }

    /// Read the current value, compute its replacement and publish it as one
    /// indivisible step.
    ///
    /// If `transform` panics the current value is kept, anything queued by
    /// nested calls is dropped and the panic propagates to the caller.
    pub fn update<F>(&self, transform: F)
    where
        F: FnOnce(&T) -> T + Send + 'static,
    {
        match self.enter() {
            Entry::Fresh(drain) => {
                let current = drain.current();
                drain.publish(transform(&current));
                drain.finish();
            }
            Entry::Nested(slot) => {
                trace!("update queued behind in-flight publish");
                slot.borrow_mut()
                    .pending
                    .push_back(Box::new(move |current| Some(transform(current))));
            }
        }
    }

    /// Like [`update`](Self::update), but the transform may refuse the
    /// transition. A refusal leaves the current value untouched.
    ///
    /// Nested calls cannot report the outcome synchronously: they return
    /// [`UpdateError::Deferred`] and a later refusal is logged and dropped.
    pub fn try_update<F, E>(&self, transform: F) -> Result<(), UpdateError<E>>
    where
        F: FnOnce(&T) -> Result<T, E> + Send + 'static,
        E: fmt::Debug + Send + 'static,
    {
        match self.enter() {
            Entry::Fresh(drain) => {
                let current = drain.current();
                let outcome = match transform(&current) {
                    Ok(value) => {
                        drain.publish(value);
                        Ok(())
                    }
                    Err(err) => Err(UpdateError::Rejected(err)),
                };
                drain.finish();
                outcome
            }
            Entry::Nested(slot) => {
                slot.borrow_mut()
                    .pending
                    .push_back(Box::new(move |current| match transform(current) {
                        Ok(value) => Some(value),
                        Err(err) => {
                            warn!(error = ?err, "deferred update rejected");
                            None
                        }
                    }));
                Err(UpdateError::Deferred)
            }
        }
    }

    /// Register a listener. It receives the current value immediately, then
    /// every value published afterwards.
    ///
    /// The replay runs before the listener is registered, so a handler that
    /// panics on the current value is never attached.
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.subscribe_handler(Arc::new(handler))
    }

    pub(crate) fn subscribe_handler(&self, handler: Handler<T>) -> Subscription {
        match self.enter() {
            Entry::Fresh(drain) => {
                let current = drain.current();
                handler(&*current);
                let subscription = self.inner.listeners.add(handler);
                // Anything queued during the replay reaches the new listener.
                drain.finish();
                subscription
            }
            Entry::Nested(slot) => {
                let current = Arc::clone(&slot.borrow().current);
                handler(&*current);
                self.inner.listeners.add(handler)
            }
        }
    }

    /// Read-only replaying view of this subject.
    pub fn observe(&self) -> Observable<T> {
        let subject = self.clone();
        Observable::new(move |handler| subject.subscribe_handler(handler))
    }

    /// Number of registered listeners.
    pub fn subscriber_count(&self) -> usize {
        self.inner.listeners.len()
    }
}

impl<T> Clone for BehaviorSubject<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug + Send + Sync + 'static> fmt::Debug for BehaviorSubject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BehaviorSubject")
            .field("value", &self.value())
            .field("version", &self.version())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
